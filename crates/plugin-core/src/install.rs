//! Multi-stage package install
//!
//! ```text
//! before_add_package -> unpack -> load data -> pointer_loaded
//!     -> add_global -> before_install -> install -> load order
//!     -> after_install -> after_add_package
//! ```
//!
//! Every before-event can cancel the remaining stages. Stages that already
//! ran stay applied: a package cancelled at `before_install` keeps its
//! global record.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use plugin_fs::PluginPaths;

use crate::events::{AddPackageEvent, Hooks, InstallEvent, PackageEvent};
use crate::formats::FormatRegistry;
use crate::load_order::{DEFAULT_QUEUE, LoadOrderResolver};
use crate::{Error, ErrorChannel, PackageRegistry, Result};

/// Name of the temp sub-directory that holds unpacked packages.
pub const INSTALL_PROCESS: &str = "install";

/// Where an install stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Unpacking,
    DataLoading,
    Registering,
    Installing,
    Complete,
    Cancelled,
    Failed,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unpacking => "unpacking",
            Self::DataLoading => "data-loading",
            Self::Registering => "registering",
            Self::Installing => "installing",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub stage: InstallStage,
    /// Package name, known once the data was loaded.
    pub name: Option<String>,
    /// Whether the global record was new, known once it was registered.
    pub is_new: Option<bool>,
    /// Directory the package was unpacked into.
    pub unpacked_dir: Option<PathBuf>,
}

impl InstallReport {
    fn stopped(stage: InstallStage) -> Self {
        Self {
            stage,
            name: None,
            is_new: None,
            unpacked_dir: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stage == InstallStage::Complete
    }
}

/// Borrowed collaborators of one install.
pub struct PackageInstallTransaction<'a> {
    pub paths: &'a PluginPaths,
    pub formats: &'a FormatRegistry,
    pub registry: &'a PackageRegistry,
    pub load_order: &'a LoadOrderResolver,
    pub channel: &'a ErrorChannel,
}

impl PackageInstallTransaction<'_> {
    /// Install the package at `source`.
    ///
    /// Returns `Err` only for escalated errors; ignored failures yield a
    /// report in the [`InstallStage::Failed`] stage.
    pub fn run(&self, hooks: &mut Hooks, source: &Path) -> Result<InstallReport> {
        tracing::info!(source = %source.display(), "Adding package");

        if !hooks.before_add_package.fire(&AddPackageEvent {
            source: source.to_path_buf(),
        }) {
            tracing::debug!(source = %source.display(), "Add package cancelled");
            return Ok(InstallReport::stopped(InstallStage::Cancelled));
        }

        let Some(packer) = self.formats.packer_for(source) else {
            return self.fail(
                InstallReport::stopped(InstallStage::Failed),
                Error::Packer {
                    path: source.to_path_buf(),
                },
            );
        };

        let mut report = InstallReport::stopped(InstallStage::Unpacking);
        let dir = self
            .paths
            .process_temp_dir(INSTALL_PROCESS)
            .join(uuid::Uuid::new_v4().simple().to_string());
        if let Err(e) = fs::create_dir_all(&dir) {
            return self.fail(report, Error::plugin_io(&dir, e));
        }
        report.unpacked_dir = Some(dir.clone());
        tracing::debug!(packer = packer.name(), dir = %dir.display(), "Unpacking package");
        if let Err(e) = packer.unpack(source, &dir) {
            return self.fail(report, e);
        }

        report.stage = InstallStage::DataLoading;
        let Some(format) = self.formats.data_format_for(&dir) else {
            return self.fail(
                report,
                Error::PackageData {
                    path: source.to_path_buf(),
                    reason: "unable to find a data format".to_string(),
                },
            );
        };
        let pointer = match format.load_data(&dir) {
            Ok(pointer) => pointer,
            Err(e) => return self.fail(report, e),
        };
        report.name = Some(pointer.name().to_string());

        if let Err(e) = self.paths.ensure_package_dirs(pointer.name()) {
            return self.fail(report, e.into());
        }
        if !hooks.pointer_loaded.fire(&PackageEvent {
            pointer: pointer.clone(),
        }) {
            tracing::debug!(package = %pointer, "Install cancelled after loading data");
            report.stage = InstallStage::Cancelled;
            return Ok(report);
        }

        report.stage = InstallStage::Registering;
        let Some(is_new) = self.registry.add_global(&pointer)? else {
            report.stage = InstallStage::Failed;
            return Ok(report);
        };
        report.is_new = Some(is_new);

        report.stage = InstallStage::Installing;
        let event = InstallEvent {
            is_new,
            pointer: pointer.clone(),
            unpacked_dir: dir.clone(),
        };
        if !hooks.before_install.fire(&event) {
            tracing::debug!(package = %pointer, "Install cancelled before copying files");
            report.stage = InstallStage::Cancelled;
            return Ok(report);
        }
        if let Err(e) = format.install(&pointer, &dir) {
            return self.fail(report, e);
        }

        self.load_order
            .append_missing(DEFAULT_QUEUE, [pointer.name()])?;
        hooks.after_install.fire(&event);
        hooks.after_add_package.fire(&PackageEvent {
            pointer: pointer.clone(),
        });

        tracing::info!(package = %pointer, is_new, "Installed package");
        report.stage = InstallStage::Complete;
        Ok(report)
    }

    fn fail(&self, mut report: InstallReport, error: Error) -> Result<InstallReport> {
        tracing::debug!(stage = %report.stage, "Install failed");
        report.stage = InstallStage::Failed;
        self.channel.recover(error, report)
    }
}
