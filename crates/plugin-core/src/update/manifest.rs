//! Updates announced by a package data file

use std::path::PathBuf;

use plugin_fs::{PluginPaths, io};

use super::{ConfirmFn, ProgressFn, UpdateAction, UpdateChecker};
use crate::{Error, OriginKind, PackagePointer, Result};

/// Handles packages whose origin is a package data file (`info.txt`).
///
/// The file's record is compared with the installed version. A newer
/// version, once confirmed, is installed from the directory holding the
/// data file.
#[derive(Debug, Clone)]
pub struct ManifestUpdateChecker {
    paths: PluginPaths,
}

impl ManifestUpdateChecker {
    pub fn new(paths: PluginPaths) -> Self {
        Self { paths }
    }

    fn manifest(&self, pointer: &PackagePointer) -> Option<PathBuf> {
        match pointer.origin_kind() {
            OriginKind::Path(path)
                if path.is_file()
                    && path.file_name().and_then(|n| n.to_str())
                        == Some(self.paths.settings().data_file_name.as_str()) =>
            {
                Some(path)
            }
            _ => None,
        }
    }
}

impl UpdateChecker for ManifestUpdateChecker {
    fn name(&self) -> &str {
        "manifest"
    }

    fn can_check(&self, pointer: &PackagePointer) -> bool {
        self.manifest(pointer).is_some()
    }

    fn check_and_update(
        &self,
        pointer: &PackagePointer,
        confirm: &mut ConfirmFn<'_>,
        progress: &mut ProgressFn<'_>,
    ) -> Result<UpdateAction> {
        let update_error = |reason: String| Error::Update {
            package: pointer.name().to_string(),
            reason,
        };
        let manifest = self
            .manifest(pointer)
            .ok_or_else(|| update_error("origin is not a package data file".to_string()))?;

        progress(&format!("[{}] Searching updates", pointer.name()), 0, 3);
        let content = io::read_text(&manifest).map_err(|e| update_error(e.to_string()))?;
        let record = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| update_error("data file is empty".to_string()))?;
        let latest = PackagePointer::from_record(record, self.paths.settings().separator)
            .map_err(|e| update_error(e.to_string()))?;

        if pointer.version() >= latest.version() {
            progress(&format!("[{}] Up to date", pointer.name()), 3, 3);
            return Ok(UpdateAction::UpToDate);
        }

        progress(&format!("[{}] Waiting for user input", pointer.name()), 1, 3);
        let message = format!(
            "Do you want to update {} : {} to {} : {}?",
            pointer.name(),
            pointer.version(),
            latest.name(),
            latest.version()
        );
        if !confirm(&message, &format!("Update: {}", latest.version())) {
            progress(&format!("[{}] Update declined", pointer.name()), 3, 3);
            return Ok(UpdateAction::Declined);
        }

        let source = manifest
            .parent()
            .map(PathBuf::from)
            .ok_or_else(|| update_error("data file has no parent directory".to_string()))?;
        progress(&format!("[{}] Installing update", pointer.name()), 2, 3);
        Ok(UpdateAction::InstallFrom(source))
    }
}
