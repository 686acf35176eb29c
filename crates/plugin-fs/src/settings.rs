//! Configurable constants
//!
//! Folder names, list file names and the record separator are not hard-coded
//! anywhere else; they are read from a [`Settings`] value which can be
//! restored at startup from a settings file (see [`crate::ConfigStore`]).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Separator used between the dependency names of a record.
pub const DEPENDENCY_SEPARATOR: char = ';';

/// Constants that shape the on-disk layout and record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Field separator of a package record.
    pub separator: char,
    /// Extension (with leading dot) of every list file.
    pub list_extension: String,
    /// Folder under the config root holding the list files.
    pub config_folder: String,
    /// Folder under the config root used for scratch space.
    pub temp_folder: String,
    /// Name of the activated-packages list.
    pub installed_list_name: String,
    /// Name of the every-package-ever-installed list.
    pub global_list_name: String,
    /// Name of the early-load list.
    pub init_list_name: String,
    /// Name of the default load order list.
    pub load_order_list_name: String,
    /// Name of the error-kind ignore list.
    pub ignored_errors_name: String,
    /// Folder inside a package holding its payload.
    pub bin_folder: String,
    /// Folder inside a package holding its configuration.
    pub package_config_folder: String,
    /// File inside an unpacked package holding its record.
    pub data_file_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            separator: '|',
            list_extension: ".ls".to_string(),
            config_folder: "config".to_string(),
            temp_folder: "temp".to_string(),
            installed_list_name: "installed-packages".to_string(),
            global_list_name: "global-packages".to_string(),
            init_list_name: "init-packages".to_string(),
            load_order_list_name: "load-order".to_string(),
            ignored_errors_name: "ignored-errors".to_string(),
            bin_folder: "bin".to_string(),
            package_config_folder: "config".to_string(),
            data_file_name: "info.txt".to_string(),
        }
    }
}

impl Settings {
    /// Serialize into `key=value` lines.
    pub fn to_state(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect()
    }

    /// Parse `key=value` lines on top of the defaults.
    ///
    /// Unknown keys are skipped so older settings files keep loading.
    pub fn from_state(state: &str) -> Result<Self> {
        let mut settings = Self::default();

        for line in state.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::InvalidSetting {
                    entry: line.to_string(),
                    reason: "expected key=value".to_string(),
                });
            };
            settings.apply(key.trim(), value.trim())?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would corrupt the record format.
    pub fn validate(&self) -> Result<()> {
        if self.separator == DEPENDENCY_SEPARATOR || self.separator.is_whitespace() {
            return Err(Error::InvalidSetting {
                entry: format!("separator={}", self.separator),
                reason: "separator must not be whitespace or the dependency separator"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let field = match key {
            "separator" => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => self.separator = c,
                    _ => {
                        return Err(Error::InvalidSetting {
                            entry: format!("{key}={value}"),
                            reason: "separator must be a single character".to_string(),
                        });
                    }
                }
                return Ok(());
            }
            "list_extension" => &mut self.list_extension,
            "config_folder" => &mut self.config_folder,
            "temp_folder" => &mut self.temp_folder,
            "installed_list_name" => &mut self.installed_list_name,
            "global_list_name" => &mut self.global_list_name,
            "init_list_name" => &mut self.init_list_name,
            "load_order_list_name" => &mut self.load_order_list_name,
            "ignored_errors_name" => &mut self.ignored_errors_name,
            "bin_folder" => &mut self.bin_folder,
            "package_config_folder" => &mut self.package_config_folder,
            "data_file_name" => &mut self.data_file_name,
            _ => {
                tracing::debug!(key, "Skipping unknown setting");
                return Ok(());
            }
        };
        *field = value.to_string();
        Ok(())
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("separator", self.separator.to_string()),
            ("list_extension", self.list_extension.clone()),
            ("config_folder", self.config_folder.clone()),
            ("temp_folder", self.temp_folder.clone()),
            ("installed_list_name", self.installed_list_name.clone()),
            ("global_list_name", self.global_list_name.clone()),
            ("init_list_name", self.init_list_name.clone()),
            ("load_order_list_name", self.load_order_list_name.clone()),
            ("ignored_errors_name", self.ignored_errors_name.clone()),
            ("bin_folder", self.bin_folder.clone()),
            ("package_config_folder", self.package_config_folder.clone()),
            ("data_file_name", self.data_file_name.clone()),
        ]
    }
}
