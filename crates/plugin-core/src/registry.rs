//! Persisted package sets
//!
//! The registry keeps the global list (every package ever installed), the
//! installed list (packages whose extensions are offered to hosts) and the
//! init queue consistent. Every query re-reads the files.

use std::path::{Path, PathBuf};

use plugin_fs::PluginPaths;

use crate::events::{Hooks, PackageEvent, RemovePackageEvent};
use crate::load_order::{DEFAULT_QUEUE, LoadOrderResolver};
use crate::{Error, ListStore, PackagePointer, Result};

/// One line of a pointer list.
enum Line {
    Pointer(PackagePointer),
    /// A record that failed to parse; saved back exactly as read.
    Unparsed(String),
}

/// The lines of a pointer list in file order.
#[derive(Default)]
struct Records {
    lines: Vec<Line>,
}

impl Records {
    fn pointers(&self) -> impl Iterator<Item = &PackagePointer> {
        self.lines.iter().filter_map(|line| match line {
            Line::Pointer(pointer) => Some(pointer),
            Line::Unparsed(_) => None,
        })
    }

    fn contains(&self, pointer: &PackagePointer) -> bool {
        self.pointers().any(|p| p == pointer)
    }

    fn push(&mut self, pointer: PackagePointer) {
        self.lines.push(Line::Pointer(pointer));
    }

    /// Keep the pointers for which `keep` holds. Unparsed lines always stay.
    fn retain_pointers(&mut self, mut keep: impl FnMut(&PackagePointer) -> bool) {
        self.lines.retain(|line| match line {
            Line::Pointer(pointer) => keep(pointer),
            Line::Unparsed(_) => true,
        });
    }

    fn into_pointers(self) -> Vec<PackagePointer> {
        self.lines
            .into_iter()
            .filter_map(|line| match line {
                Line::Pointer(pointer) => Some(pointer),
                Line::Unparsed(_) => None,
            })
            .collect()
    }

    fn to_lines(&self, separator: char) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| match line {
                Line::Pointer(pointer) => pointer.to_record(separator),
                Line::Unparsed(record) => record.clone(),
            })
            .collect()
    }
}

/// Operations on the global, installed and init lists.
#[derive(Debug, Clone)]
pub struct PackageRegistry {
    paths: PluginPaths,
    store: ListStore,
}

impl PackageRegistry {
    pub fn new(paths: PluginPaths, store: ListStore) -> Self {
        Self { paths, store }
    }

    fn separator(&self) -> char {
        self.paths.settings().separator
    }

    /// Every line of `file`. Corrupt records are reported and kept as
    /// unparsed lines.
    fn records(&self, file: &Path) -> Result<Records> {
        let mut records = Records::default();
        for record in self.store.load(file)? {
            match PackagePointer::from_record(&record, self.separator()) {
                Ok(pointer) => records.lines.push(Line::Pointer(pointer)),
                Err(err) => {
                    self.store.channel().report(err)?;
                    records.lines.push(Line::Unparsed(record));
                }
            }
        }
        Ok(records)
    }

    /// Every parseable record of `file`.
    fn pointers(&self, file: &Path) -> Result<Vec<PackagePointer>> {
        Ok(self.records(file)?.into_pointers())
    }

    fn save_records(&self, file: &Path, records: &Records) -> Result<bool> {
        self.store.save(file, &records.to_lines(self.separator()))
    }

    pub fn global_packages(&self) -> Result<Vec<PackagePointer>> {
        self.pointers(&self.paths.global_list_file())
    }

    /// Activated packages.
    pub fn installed_packages(&self) -> Result<Vec<PackagePointer>> {
        self.pointers(&self.paths.installed_list_file())
    }

    pub fn find_global_by_name(&self, name: &str) -> Result<Option<PackagePointer>> {
        Ok(self
            .global_packages()?
            .into_iter()
            .find(|p| p.name() == name))
    }

    pub fn find_installed_by_name(&self, name: &str) -> Result<Option<PackagePointer>> {
        Ok(self
            .installed_packages()?
            .into_iter()
            .find(|p| p.name() == name))
    }

    pub fn is_global(&self, name: &str) -> Result<bool> {
        Ok(self.find_global_by_name(name)?.is_some())
    }

    pub fn is_installed(&self, name: &str) -> Result<bool> {
        Ok(self.find_installed_by_name(name)?.is_some())
    }

    /// Add `pointer` to the global list.
    ///
    /// Returns `Some(true)` when it was added, `Some(false)` when an equal
    /// record already existed and `None` when saving failed and the failure
    /// was ignored.
    pub fn add_global(&self, pointer: &PackagePointer) -> Result<Option<bool>> {
        if let Err(err) = pointer.check_separator(self.separator()) {
            return self.store.channel().recover(err, None);
        }
        let file = self.paths.global_list_file();
        let mut records = self.records(&file)?;
        if records.contains(pointer) {
            return Ok(Some(false));
        }
        records.push(pointer.clone());
        if self.save_records(&file, &records)? {
            tracing::info!(package = %pointer, "Registered package");
            Ok(Some(true))
        } else {
            Ok(None)
        }
    }

    /// Remove the record equal to `pointer` from the global list.
    pub fn remove_global(
        &self,
        hooks: &mut Hooks,
        pointer: &PackagePointer,
        keep_archive: bool,
    ) -> Result<bool> {
        let file = self.paths.global_list_file();
        let mut records = self.records(&file)?;
        if !records.contains(pointer) {
            return Ok(false);
        }

        let event = RemovePackageEvent {
            pointer: pointer.clone(),
            keep_archive,
        };
        if !hooks.before_remove_package.fire(&event) {
            tracing::debug!(package = %pointer, "Package removal cancelled");
            return Ok(false);
        }

        records.retain_pointers(|p| p != pointer);
        if !self.save_records(&file, &records)? {
            return Ok(false);
        }
        tracing::info!(package = %pointer, "Unregistered package");
        hooks.after_remove_package.fire(&event);
        Ok(true)
    }

    /// Move the global package `name` into the installed list and push its
    /// dependents behind it in the default load order.
    pub fn activate(
        &self,
        hooks: &mut Hooks,
        load_order: &LoadOrderResolver,
        name: &str,
    ) -> Result<bool> {
        let globals = self.global_packages()?;
        let Some(pointer) = globals.iter().find(|p| p.name() == name).cloned() else {
            return Ok(false);
        };

        let file = self.paths.installed_list_file();
        let mut installed = self.records(&file)?;
        if installed.pointers().any(|p| p.same_package(&pointer)) {
            return Ok(false);
        }

        let event = PackageEvent { pointer };
        if !hooks.before_activate.fire(&event) {
            tracing::debug!(package = name, "Activation cancelled");
            return Ok(false);
        }

        installed.push(event.pointer.clone());
        if !self.save_records(&file, &installed)? {
            return Ok(false);
        }
        load_order.reprioritize(DEFAULT_QUEUE, name, &globals)?;

        tracing::info!(package = %event.pointer, "Activated package");
        hooks.after_activate.fire(&event);
        Ok(true)
    }

    /// Remove the package `name` from the installed list.
    pub fn deactivate(&self, hooks: &mut Hooks, name: &str) -> Result<bool> {
        let file = self.paths.installed_list_file();
        let mut installed = self.records(&file)?;
        let Some(pointer) = installed.pointers().find(|p| p.name() == name).cloned() else {
            return Ok(false);
        };

        let event = PackageEvent { pointer };
        if !hooks.before_deactivate.fire(&event) {
            tracing::debug!(package = name, "Deactivation cancelled");
            return Ok(false);
        }

        installed.retain_pointers(|p| p.name() != name);
        if !self.save_records(&file, &installed)? {
            return Ok(false);
        }

        tracing::info!(package = %event.pointer, "Deactivated package");
        hooks.after_deactivate.fire(&event);
        Ok(true)
    }

    /// Payload paths queued for early loading.
    pub fn init_queue(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .store
            .load(&self.paths.init_list_file())?
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    /// Queue a payload path for early loading. Duplicates are skipped.
    pub fn enqueue_init(&self, path: &Path) -> Result<bool> {
        if path.to_str().is_none_or(|p| p.contains(['\n', '\r'])) {
            return self.store.channel().recover(
                Error::ModuleLoad {
                    path: path.to_path_buf(),
                    reason: "path cannot be stored in a list file".to_string(),
                },
                false,
            );
        }
        self.store
            .append_unique(&self.paths.init_list_file(), &path.to_string_lossy())
    }
}
