//! Update checks for installed packages
//!
//! The [`UpdateManager`] hands a package to the first registered checker
//! that can handle its origin. Checkers either update the package in place
//! or ask the caller to install a newer package from a directory.

mod file_equality;
mod manifest;

pub use file_equality::FileEqualityChecker;
pub use manifest::ManifestUpdateChecker;

use std::path::PathBuf;

use crate::{PackagePointer, Result};

/// Asks the user whether to apply an update: `(message, title) -> accept`.
pub type ConfirmFn<'a> = dyn FnMut(&str, &str) -> bool + 'a;

/// Receives `(status, step, total)` while a check runs.
pub type ProgressFn<'a> = dyn FnMut(&str, usize, usize) + 'a;

/// Result of checking one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    UpToDate,
    /// A newer version exists but the user declined it.
    Declined,
    /// The checker replaced the installed payload itself.
    Replaced,
    /// A newer package should be installed from this source.
    InstallFrom(PathBuf),
}

/// Checks one kind of origin for updates.
pub trait UpdateChecker: Send {
    fn name(&self) -> &str;

    fn can_check(&self, pointer: &PackagePointer) -> bool;

    fn check_and_update(
        &self,
        pointer: &PackagePointer,
        confirm: &mut ConfirmFn<'_>,
        progress: &mut ProgressFn<'_>,
    ) -> Result<UpdateAction>;
}

/// Ordered list of update checkers.
#[derive(Default)]
pub struct UpdateManager {
    checkers: Vec<Box<dyn UpdateChecker>>,
}

impl std::fmt::Debug for UpdateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.checkers.iter().map(|c| c.name()).collect();
        f.debug_struct("UpdateManager").field("checkers", &names).finish()
    }
}

impl UpdateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a checker unless one with the same name exists.
    pub fn add_checker(&mut self, checker: Box<dyn UpdateChecker>) -> bool {
        if self.checkers.iter().any(|c| c.name() == checker.name()) {
            return false;
        }
        self.checkers.push(checker);
        true
    }

    pub fn remove_checker(&mut self, name: &str) -> bool {
        let before = self.checkers.len();
        self.checkers.retain(|c| c.name() != name);
        self.checkers.len() != before
    }

    pub fn checker_count(&self) -> usize {
        self.checkers.len()
    }

    /// Run the first capable checker. `None` when no checker handles the
    /// package's origin.
    pub fn check_and_update(
        &self,
        pointer: &PackagePointer,
        confirm: &mut ConfirmFn<'_>,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Option<UpdateAction>> {
        let Some(checker) = self.checkers.iter().find(|c| c.can_check(pointer)) else {
            return Ok(None);
        };
        tracing::info!(package = %pointer, checker = checker.name(), "Checking for updates");
        checker
            .check_and_update(pointer, confirm, progress)
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackageVersion;

    struct Fixed(&'static str, bool, UpdateAction);

    impl UpdateChecker for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn can_check(&self, _pointer: &PackagePointer) -> bool {
            self.1
        }

        fn check_and_update(
            &self,
            _pointer: &PackagePointer,
            _confirm: &mut ConfirmFn<'_>,
            _progress: &mut ProgressFn<'_>,
        ) -> Result<UpdateAction> {
            Ok(self.2.clone())
        }
    }

    fn pointer() -> PackagePointer {
        PackagePointer::new("demo", "demo.bin", "", PackageVersion::default(), Vec::<String>::new())
            .unwrap()
    }

    #[test]
    fn first_capable_checker_runs() {
        let mut manager = UpdateManager::new();
        manager.add_checker(Box::new(Fixed("skip", false, UpdateAction::Declined)));
        manager.add_checker(Box::new(Fixed("first", true, UpdateAction::Replaced)));
        manager.add_checker(Box::new(Fixed("second", true, UpdateAction::UpToDate)));

        let action = manager
            .check_and_update(&pointer(), &mut |_, _| true, &mut |_, _, _| {})
            .unwrap();
        assert_eq!(action, Some(UpdateAction::Replaced));
    }

    #[test]
    fn no_capable_checker_is_none() {
        let manager = UpdateManager::new();
        let action = manager
            .check_and_update(&pointer(), &mut |_, _| true, &mut |_, _, _| {})
            .unwrap();
        assert_eq!(action, None);
    }

    #[test]
    fn checkers_dedup_by_name() {
        let mut manager = UpdateManager::new();
        assert!(manager.add_checker(Box::new(Fixed("a", true, UpdateAction::UpToDate))));
        assert!(!manager.add_checker(Box::new(Fixed("a", true, UpdateAction::UpToDate))));
        assert!(manager.remove_checker("a"));
        assert_eq!(manager.checker_count(), 0);
    }
}
