//! Temporary directory layout for plugin system tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary root holding an internal config root, a plugin directory and
/// a scratch area for package sources.
///
/// # Example
///
/// ```rust,no_run
/// use plugin_test_utils::TestSystemDirs;
///
/// let dirs = TestSystemDirs::new();
/// // PluginSystem::init(SystemOptions::new(dirs.config_root(), dirs.plugin_dir()))
/// dirs.assert_list_contains("global-packages", "demo|");
/// ```
pub struct TestSystemDirs {
    temp_dir: TempDir,
}

impl Default for TestSystemDirs {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSystemDirs {
    /// Create an empty temporary root.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root of the internal files.
    pub fn config_root(&self) -> PathBuf {
        self.root().join("internal")
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.root().join("plugins")
    }

    /// Directory for package sources, outside both system roots.
    pub fn sources_dir(&self) -> PathBuf {
        self.root().join("sources")
    }

    /// Path of a list file under the default layout.
    pub fn list_file(&self, name: &str) -> PathBuf {
        self.config_root().join("config").join(format!("{name}.ls"))
    }

    /// Non-blank lines of a list file. A missing file reads as empty.
    pub fn read_list(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.list_file(name))
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Overwrite a list file with `lines`.
    pub fn write_list(&self, name: &str, lines: &[&str]) {
        let path = self.list_file(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(path, content).unwrap();
    }

    /// Assert that some line of list `name` starts with `prefix`.
    ///
    /// # Panics
    /// Panics with the list contents if no line matches.
    pub fn assert_list_contains(&self, name: &str, prefix: &str) {
        let lines = self.read_list(name);
        assert!(
            lines.iter().any(|l| l.starts_with(prefix)),
            "Expected a line starting with '{prefix}' in {name}: {lines:?}"
        );
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }
}
