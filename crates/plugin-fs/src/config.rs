//! Format-agnostic settings loading and saving

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result, Settings, io};

/// Format-agnostic configuration store.
///
/// Detects the format from the file extension: `.toml`, `.json`, `.yaml` /
/// `.yml` go through serde; anything else is treated as the plain
/// `key=value` settings state.
#[derive(Debug, Default)]
pub struct ConfigStore {
    robustness: io::RobustnessConfig,
}

impl ConfigStore {
    /// Create a new ConfigStore with default robustness settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new ConfigStore with custom robustness settings.
    pub fn with_robustness(robustness: io::RobustnessConfig) -> Self {
        Self { robustness }
    }

    /// Load [`Settings`] from a file.
    pub fn load_settings(&self, path: &Path) -> Result<Settings> {
        let settings = match serde_format(path) {
            Some(_) => self.load::<Settings>(path)?,
            None => Settings::from_state(&io::read_text(path)?)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Save [`Settings`] to a file in the format its extension implies.
    pub fn save_settings(&self, path: &Path, settings: &Settings) -> Result<()> {
        match serde_format(path) {
            Some(_) => self.save(path, settings),
            None => io::write_text(path, &settings.to_state(), self.robustness),
        }
    }

    /// Load a serde value from a `.toml`, `.json` or `.yaml` file.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = io::read_text(path)?;
        let parse_error = |format: &str, message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        match serde_format(path) {
            Some(Format::Toml) => {
                toml::from_str(&content).map_err(|e| parse_error("TOML", e.to_string()))
            }
            Some(Format::Json) => {
                serde_json::from_str(&content).map_err(|e| parse_error("JSON", e.to_string()))
            }
            Some(Format::Yaml) => {
                serde_yaml::from_str(&content).map_err(|e| parse_error("YAML", e.to_string()))
            }
            None => Err(parse_error("unknown", "unsupported extension".to_string())),
        }
    }

    /// Save a serde value; uses an atomic write.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let serialize_error = |format: &str, message: String| Error::ConfigSerialize {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        let content = match serde_format(path) {
            Some(Format::Toml) => toml::to_string_pretty(value)
                .map_err(|e| serialize_error("TOML", e.to_string()))?,
            Some(Format::Json) => serde_json::to_string_pretty(value)
                .map_err(|e| serialize_error("JSON", e.to_string()))?,
            Some(Format::Yaml) => serde_yaml::to_string(value)
                .map_err(|e| serialize_error("YAML", e.to_string()))?,
            None => {
                return Err(serialize_error(
                    "unknown",
                    "unsupported extension".to_string(),
                ));
            }
        };

        io::write_atomic(path, content.as_bytes(), self.robustness)
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Json,
    Yaml,
}

fn serde_format(path: &Path) -> Option<Format> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "toml" => Some(Format::Toml),
        "json" => Some(Format::Json),
        "yaml" | "yml" => Some(Format::Yaml),
        _ => None,
    }
}
