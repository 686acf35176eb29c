//! Updates from a local copy of the payload

use std::fs;
use std::path::PathBuf;

use plugin_fs::{PluginPaths, checksum};

use super::{ConfirmFn, ProgressFn, UpdateAction, UpdateChecker};
use crate::{Error, OriginKind, PackagePointer, Result};

/// Handles packages whose origin is a local file with the payload's name.
///
/// When the origin's checksum differs from the installed payload and the
/// user confirms, the origin is copied over the payload.
#[derive(Debug, Clone)]
pub struct FileEqualityChecker {
    paths: PluginPaths,
}

impl FileEqualityChecker {
    pub fn new(paths: PluginPaths) -> Self {
        Self { paths }
    }

    fn origin_file(pointer: &PackagePointer) -> Option<PathBuf> {
        match pointer.origin_kind() {
            OriginKind::Path(path)
                if path.is_file()
                    && path.file_name().and_then(|n| n.to_str()) == Some(pointer.file()) =>
            {
                Some(path)
            }
            _ => None,
        }
    }
}

impl UpdateChecker for FileEqualityChecker {
    fn name(&self) -> &str {
        "file-equality"
    }

    fn can_check(&self, pointer: &PackagePointer) -> bool {
        !pointer.file().is_empty()
            && Self::origin_file(pointer).is_some()
            && self
                .paths
                .payload_file(pointer.name(), pointer.file())
                .is_file()
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
        let origin = Self::origin_file(pointer)
            .ok_or_else(|| update_error("origin is not a local payload file".to_string()))?;
        let payload = self.paths.payload_file(pointer.name(), pointer.file());

        progress(&format!("[{}] Comparing files", pointer.name()), 0, 2);
        let same = checksum::files_match(&origin, &payload).map_err(|e| update_error(e.to_string()))?;
        if same {
            progress(&format!("[{}] Up to date", pointer.name()), 2, 2);
            return Ok(UpdateAction::UpToDate);
        }

        let message = format!(
            "The file '{}' is a different version. Do you want to update?",
            origin.display()
        );
        if !confirm(&message, &format!("Update: {}", pointer.name())) {
            progress(&format!("[{}] Update declined", pointer.name()), 2, 2);
            return Ok(UpdateAction::Declined);
        }

        fs::copy(&origin, &payload).map_err(|e| update_error(e.to_string()))?;
        progress(&format!("[{}] Updated", pointer.name()), 2, 2);
        tracing::info!(package = %pointer, origin = %origin.display(), "Replaced payload");
        Ok(UpdateAction::Replaced)
    }
}
