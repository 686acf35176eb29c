//! Dependency-aware load order
//!
//! Each queue is a persisted list of package names; index 0 has the highest
//! priority and is attached first. The default queue governs host
//! registration. Other queues are free for applications to use.

use std::collections::HashSet;
use std::path::PathBuf;

use plugin_fs::PluginPaths;

use crate::{ListStore, PackagePointer, Result};

/// Name of the queue used when attaching extensions to a host.
pub const DEFAULT_QUEUE: &str = "default";

#[derive(Debug, Clone, Copy)]
enum End {
    Top,
    Bottom,
}

/// Reads and rewrites load order queues.
#[derive(Debug, Clone)]
pub struct LoadOrderResolver {
    paths: PluginPaths,
    store: ListStore,
}

impl LoadOrderResolver {
    pub fn new(paths: PluginPaths, store: ListStore) -> Self {
        Self { paths, store }
    }

    /// List file of `queue`. Queue names must be a single path component;
    /// anything else is returned as an error without touching the disk.
    fn file(&self, queue: &str) -> Result<PathBuf> {
        Ok(self.paths.load_order_file(queue, DEFAULT_QUEUE)?)
    }

    /// Names of `queue`, highest priority first. A queue without a file is
    /// empty.
    pub fn order(&self, queue: &str) -> Result<Vec<String>> {
        let file = self.file(queue)?;
        if queue != DEFAULT_QUEUE && !file.exists() {
            return Ok(Vec::new());
        }
        self.store.load(&file)
    }

    /// Replace the order of `queue`.
    pub fn set_order<S: AsRef<str>>(&self, queue: &str, order: &[S]) -> Result<bool> {
        self.store.save(&self.file(queue)?, order)
    }

    pub fn contains(&self, queue: &str, name: &str) -> Result<bool> {
        Ok(self.order(queue)?.iter().any(|n| n == name))
    }

    /// Swap `name` with its predecessor.
    pub fn move_up(&self, queue: &str, name: &str) -> Result<bool> {
        let mut order = self.order(queue)?;
        match order.iter().position(|n| n == name) {
            Some(index) if index > 0 => {
                order.swap(index, index - 1);
                self.set_order(queue, &order)
            }
            _ => Ok(false),
        }
    }

    /// Swap `name` with its successor.
    pub fn move_down(&self, queue: &str, name: &str) -> Result<bool> {
        let mut order = self.order(queue)?;
        match order.iter().position(|n| n == name) {
            Some(index) if index + 1 < order.len() => {
                order.swap(index, index + 1);
                self.set_order(queue, &order)
            }
            _ => Ok(false),
        }
    }

    /// Move `name` to index 0. An absent name is only added when
    /// `insert_if_absent` is set.
    pub fn move_to_top(&self, queue: &str, name: &str, insert_if_absent: bool) -> Result<bool> {
        self.move_to_end(queue, name, insert_if_absent, End::Top)
    }

    /// Move `name` to the last index. An absent name is only added when
    /// `insert_if_absent` is set.
    pub fn move_to_bottom(&self, queue: &str, name: &str, insert_if_absent: bool) -> Result<bool> {
        self.move_to_end(queue, name, insert_if_absent, End::Bottom)
    }

    fn move_to_end(&self, queue: &str, name: &str, insert_if_absent: bool, end: End) -> Result<bool> {
        let mut order = self.order(queue)?;
        let before = order.len();
        order.retain(|n| n != name);
        if order.len() == before && !insert_if_absent {
            return Ok(false);
        }
        match end {
            End::Top => order.insert(0, name.to_string()),
            End::Bottom => order.push(name.to_string()),
        }
        self.set_order(queue, &order)
    }

    /// Append every candidate that is not yet in `queue`, in candidate order.
    pub fn append_missing<I, S>(&self, queue: &str, candidates: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut order = self.order(queue)?;
        let mut present: HashSet<String> = order.iter().cloned().collect();
        let mut changed = false;

        for candidate in candidates {
            let candidate = candidate.as_ref();
            if present.insert(candidate.to_string()) {
                order.push(candidate.to_string());
                changed = true;
            }
        }

        if !changed {
            return Ok(false);
        }
        self.set_order(queue, &order)
    }

    /// Move every package that depends on `changed` behind it.
    ///
    /// Dependents are re-appended in the order they appear in `packages`.
    /// Only direct dependents move; their own dependents are left alone.
    pub fn reprioritize(
        &self,
        queue: &str,
        changed: &str,
        packages: &[PackagePointer],
    ) -> Result<bool> {
        let dependents: Vec<&str> = packages
            .iter()
            .filter(|p| p.depends_on(changed))
            .map(PackagePointer::name)
            .collect();
        if dependents.is_empty() {
            return Ok(false);
        }

        let mut order = self.order(queue)?;
        order.retain(|n| !dependents.contains(&n.as_str()));
        for dependent in &dependents {
            if !order.iter().any(|n| n == dependent) {
                order.push(dependent.to_string());
            }
        }
        tracing::debug!(queue, changed, ?dependents, "Reprioritized dependents");
        self.set_order(queue, &order)
    }

    /// Sort `pointers` by their index in `queue`.
    ///
    /// The sort is stable. Packages missing from the queue go last and keep
    /// their relative input order.
    pub fn sort_by_order(
        &self,
        queue: &str,
        mut pointers: Vec<PackagePointer>,
    ) -> Result<Vec<PackagePointer>> {
        let order = self.order(queue)?;
        pointers.sort_by_key(|p| {
            order
                .iter()
                .position(|n| n == p.name())
                .unwrap_or(usize::MAX)
        });
        Ok(pointers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ErrorChannel, PackageVersion};
    use plugin_fs::Settings;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn resolver(dir: &std::path::Path) -> LoadOrderResolver {
        let paths = PluginPaths::new(dir.join("internal"), dir.join("plugins"), Settings::default());
        paths.ensure_internal_dirs().unwrap();
        paths
            .create_missing_lists(DEFAULT_QUEUE, Default::default())
            .unwrap();
        LoadOrderResolver::new(paths, ListStore::new(Arc::new(ErrorChannel::new())))
    }

    fn pointer(name: &str, deps: &[&str]) -> PackagePointer {
        PackagePointer::new(name, "", "", PackageVersion::default(), deps.iter().copied()).unwrap()
    }

    #[test]
    fn sort_by_order_puts_unknown_last() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver.set_order(DEFAULT_QUEUE, &["B", "A", "C"]).unwrap();

        let sorted = resolver
            .sort_by_order(
                DEFAULT_QUEUE,
                vec![pointer("A", &[]), pointer("D", &[]), pointer("B", &[]), pointer("C", &[])],
            )
            .unwrap();
        let names: Vec<&str> = sorted.iter().map(PackagePointer::name).collect();
        assert_eq!(names, vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn move_to_top_inserts_at_front() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver.set_order(DEFAULT_QUEUE, &["A", "B", "C"]).unwrap();

        assert!(resolver.move_to_top(DEFAULT_QUEUE, "C", false).unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["C", "A", "B"]);
    }

    #[test]
    fn move_to_top_absent_name() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver.set_order(DEFAULT_QUEUE, &["A", "B", "C"]).unwrap();

        assert!(!resolver.move_to_top(DEFAULT_QUEUE, "Z", false).unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["A", "B", "C"]);

        assert!(resolver.move_to_top(DEFAULT_QUEUE, "Z", true).unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["Z", "A", "B", "C"]);
    }

    #[test]
    fn move_to_bottom_appends() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver.set_order(DEFAULT_QUEUE, &["A", "B", "C"]).unwrap();

        assert!(resolver.move_to_bottom(DEFAULT_QUEUE, "A", false).unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["B", "C", "A"]);
        assert!(resolver.move_to_bottom(DEFAULT_QUEUE, "Z", true).unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["B", "C", "A", "Z"]);
    }

    #[test]
    fn move_up_and_down_respect_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver.set_order(DEFAULT_QUEUE, &["A", "B", "C"]).unwrap();

        assert!(!resolver.move_up(DEFAULT_QUEUE, "A").unwrap());
        assert!(!resolver.move_down(DEFAULT_QUEUE, "C").unwrap());
        assert!(!resolver.move_up(DEFAULT_QUEUE, "missing").unwrap());

        assert!(resolver.move_up(DEFAULT_QUEUE, "C").unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["A", "C", "B"]);
        assert!(resolver.move_down(DEFAULT_QUEUE, "A").unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["C", "A", "B"]);
    }

    #[test]
    fn append_missing_skips_present_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver.set_order(DEFAULT_QUEUE, &["A"]).unwrap();

        assert!(resolver.append_missing(DEFAULT_QUEUE, ["B", "A", "C", "B"]).unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["A", "B", "C"]);
        assert!(!resolver.append_missing(DEFAULT_QUEUE, ["C"]).unwrap());
    }

    #[test]
    fn reprioritize_moves_direct_dependents_only() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver.set_order(DEFAULT_QUEUE, &["B", "C", "A", "D"]).unwrap();

        let packages = [
            pointer("A", &[]),
            pointer("B", &["A"]),
            pointer("C", &["B"]),
            pointer("D", &[]),
        ];
        assert!(resolver.reprioritize(DEFAULT_QUEUE, "A", &packages).unwrap());
        assert_eq!(resolver.order(DEFAULT_QUEUE).unwrap(), vec!["C", "A", "D", "B"]);
    }

    #[test]
    fn named_queues_are_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        assert!(resolver.order("ui").unwrap().is_empty());

        resolver.set_order("ui", &["X"]).unwrap();
        assert_eq!(resolver.order("ui").unwrap(), vec!["X"]);
        assert!(!resolver.contains(DEFAULT_QUEUE, "X").unwrap());
        assert!(dir.path().join("internal/config/load-order.ui.ls").exists());
    }

    #[test]
    fn queue_names_cannot_leave_config_folder() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());

        for queue in ["../escape", "a/b", ".."] {
            assert!(matches!(
                resolver.set_order(queue, &["X"]),
                Err(Error::Fs(plugin_fs::Error::UnsafeName { .. }))
            ));
            assert!(resolver.order(queue).is_err());
        }
        assert!(!dir.path().join("internal/escape.ls").exists());
    }
}
