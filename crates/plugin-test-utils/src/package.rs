//! [`PackageSource`] builder for package install scenarios.

use std::fs;
use std::path::{Path, PathBuf};

/// Describes a package folder in the plain-text layout:
///
/// ```text
/// <name>/
///   info.txt        name|file|origin|version|deps
///   bin/<file>      payload
///   config/...      optional config files
/// ```
#[derive(Debug, Clone)]
pub struct PackageSource {
    name: String,
    file: String,
    origin: String,
    version: String,
    dependencies: Vec<String>,
    payload: Vec<u8>,
    config_files: Vec<(String, String)>,
}

impl PackageSource {
    /// A package with payload `<name>.bin` at version `1.0.0.0`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            file: format!("{name}.bin"),
            origin: String::new(),
            version: "1.0.0.0".to_string(),
            dependencies: Vec::new(),
            payload: format!("payload of {name}").into_bytes(),
            config_files: Vec::new(),
        }
    }

    pub fn file(mut self, file: &str) -> Self {
        self.file = file.to_string();
        self
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn config_file(mut self, name: &str, content: &str) -> Self {
        self.config_files.push((name.to_string(), content.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload_name(&self) -> &str {
        &self.file
    }

    /// The record written to `info.txt`, using `|` as separator.
    pub fn record(&self) -> String {
        let mut dependencies = self.dependencies.clone();
        dependencies.sort();
        dependencies.dedup();
        format!(
            "{}|{}|{}|{}|{}",
            self.name,
            self.file,
            self.origin,
            self.version,
            dependencies.join(";")
        )
    }

    /// Write the package folder as `<dir>/<name>` and return its path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let root = dir.join(&self.name);
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join("info.txt"), self.record()).unwrap();
        fs::write(root.join("bin").join(&self.file), &self.payload).unwrap();

        if !self.config_files.is_empty() {
            fs::create_dir_all(root.join("config")).unwrap();
            for (name, content) in &self.config_files {
                fs::write(root.join("config").join(name), content).unwrap();
            }
        }
        root
    }
}
