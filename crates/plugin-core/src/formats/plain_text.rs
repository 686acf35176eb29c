//! Package metadata stored as a single record in a text file

use std::path::{Path, PathBuf};

use plugin_fs::{PluginPaths, RobustnessConfig, io};

use super::DataFormat;
use crate::{Error, PackagePointer, Result};

/// Reads the package record from the data file (`info.txt` by default) and
/// installs the package's `config/` and `bin/` folders.
#[derive(Debug, Clone)]
pub struct PlainTextFormat {
    paths: PluginPaths,
    robustness: RobustnessConfig,
}

impl PlainTextFormat {
    pub fn new(paths: PluginPaths) -> Self {
        Self {
            paths,
            robustness: RobustnessConfig::default(),
        }
    }

    fn data_file(&self, dir: &Path) -> PathBuf {
        dir.join(&self.paths.settings().data_file_name)
    }
}

impl DataFormat for PlainTextFormat {
    fn name(&self) -> &str {
        "plain-text"
    }

    fn can_load(&self, dir: &Path) -> bool {
        self.data_file(dir).is_file()
    }

    fn load_data(&self, dir: &Path) -> Result<PackagePointer> {
        let file = self.data_file(dir);
        let content = io::read_text(&file)?;
        let record = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| Error::PackageData {
                path: file.clone(),
                reason: "data file is empty".to_string(),
            })?;

        PackagePointer::from_record(record, self.paths.settings().separator).map_err(|e| {
            Error::PackageData {
                path: file,
                reason: e.to_string(),
            }
        })
    }

    fn save_data(&self, pointer: &PackagePointer, dir: &Path) -> Result<()> {
        let separator = self.paths.settings().separator;
        pointer.check_separator(separator)?;
        let record = pointer.to_record(separator);
        io::write_text(&self.data_file(dir), &record, self.robustness)?;
        Ok(())
    }

    fn install(&self, pointer: &PackagePointer, dir: &Path) -> Result<()> {
        let settings = self.paths.settings();
        let copies = [
            (
                dir.join(&settings.package_config_folder),
                self.paths.package_config_dir(pointer.name()),
            ),
            (
                dir.join(&settings.bin_folder),
                self.paths.package_bin_dir(pointer.name()),
            ),
        ];

        for (from, to) in copies {
            if from.is_dir() {
                let copied = io::copy_dir_all(&from, &to).map_err(|e| Error::plugin_io(&from, e))?;
                tracing::debug!(from = %from.display(), to = %to.display(), files = copied.len(), "Installed package folder");
            }
        }
        Ok(())
    }
}
