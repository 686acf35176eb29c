//! Directory layout of the plugin manager
//!
//! Two roots exist: the internal config root (list files, temp space) and the
//! plugin directory (one folder per package, each with a config and a bin
//! folder). Every other path is derived from these and the [`Settings`].

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::io::{self, RobustnessConfig};
use crate::{Error, Result, Settings, list};

/// Check that `name` is exactly one normal path component.
///
/// Package and queue names are joined onto the roots; a name such as `..`
/// or `a/b` would resolve outside them.
pub fn check_component(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single && !name.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(Error::UnsafeName {
            name: name.to_string(),
        })
    }
}

/// Resolves every path the plugin manager reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    config_root: PathBuf,
    plugin_dir: PathBuf,
    settings: Settings,
}

impl PluginPaths {
    /// Create a layout from its two roots.
    pub fn new(
        config_root: impl Into<PathBuf>,
        plugin_dir: impl Into<PathBuf>,
        settings: Settings,
    ) -> Self {
        Self {
            config_root: config_root.into(),
            plugin_dir: plugin_dir.into(),
            settings,
        }
    }

    /// Default roots for an application: `<base>/<app>-Internal` and
    /// `<base>/<app>-Plugins`.
    pub fn for_application(base: &Path, app_name: &str, settings: Settings) -> Self {
        Self::new(
            base.join(format!("{app_name}-Internal")),
            base.join(format!("{app_name}-Plugins")),
            settings,
        )
    }

    /// Canonicalize both roots, creating them first.
    pub fn canonicalized(self) -> Result<Self> {
        fs::create_dir_all(&self.config_root).map_err(|e| Error::io(&self.config_root, e))?;
        fs::create_dir_all(&self.plugin_dir).map_err(|e| Error::io(&self.plugin_dir, e))?;
        Ok(Self {
            config_root: dunce::canonicalize(&self.config_root)
                .map_err(|e| Error::io(&self.config_root, e))?,
            plugin_dir: dunce::canonicalize(&self.plugin_dir)
                .map_err(|e| Error::io(&self.plugin_dir, e))?,
            settings: self.settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_root(&self) -> &Path {
        &self.config_root
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Folder holding all list files.
    pub fn internal_config_dir(&self) -> PathBuf {
        self.config_root.join(&self.settings.config_folder)
    }

    fn list_file(&self, name: &str) -> PathBuf {
        self.internal_config_dir()
            .join(format!("{name}{}", self.settings.list_extension))
    }

    pub fn installed_list_file(&self) -> PathBuf {
        self.list_file(&self.settings.installed_list_name)
    }

    pub fn global_list_file(&self) -> PathBuf {
        self.list_file(&self.settings.global_list_name)
    }

    pub fn init_list_file(&self) -> PathBuf {
        self.list_file(&self.settings.init_list_name)
    }

    pub fn ignored_errors_file(&self) -> PathBuf {
        self.list_file(&self.settings.ignored_errors_name)
    }

    /// Load order file of a queue. The default queue uses the bare list
    /// name; other queues get a `.<queue>` suffix. The queue must pass
    /// [`check_component`].
    pub fn load_order_file(&self, queue: &str, default_queue: &str) -> Result<PathBuf> {
        check_component(queue)?;
        Ok(if queue == default_queue {
            self.list_file(&self.settings.load_order_list_name)
        } else {
            self.list_file(&format!("{}.{queue}", self.settings.load_order_list_name))
        })
    }

    pub fn system_temp_dir(&self) -> PathBuf {
        self.config_root.join(&self.settings.temp_folder)
    }

    /// Scratch directory for one system process, e.g. `install`.
    pub fn process_temp_dir(&self, process: &str) -> PathBuf {
        self.system_temp_dir().join(process)
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.plugin_dir.join(name)
    }

    pub fn package_config_dir(&self, name: &str) -> PathBuf {
        self.package_dir(name)
            .join(&self.settings.package_config_folder)
    }

    pub fn package_bin_dir(&self, name: &str) -> PathBuf {
        self.package_dir(name).join(&self.settings.bin_folder)
    }

    pub fn package_temp_dir(&self, name: &str) -> PathBuf {
        self.system_temp_dir().join(name)
    }

    /// Full path of a package's payload file.
    pub fn payload_file(&self, name: &str, file: &str) -> PathBuf {
        self.package_bin_dir(name).join(file)
    }

    /// Create the package, config, bin and temp directories of a package.
    pub fn ensure_package_dirs(&self, name: &str) -> Result<()> {
        check_component(name)?;
        for dir in [
            self.package_dir(name),
            self.package_config_dir(name),
            self.package_bin_dir(name),
            self.internal_config_dir(),
            self.package_temp_dir(name),
        ] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(())
    }

    /// Delete every directory of a package.
    pub fn remove_package_dirs(&self, name: &str) -> Result<()> {
        check_component(name)?;
        io::remove_dir_if_exists(&self.package_dir(name))?;
        io::remove_dir_if_exists(&self.package_temp_dir(name))?;
        Ok(())
    }

    /// Create the internal directories.
    pub fn ensure_internal_dirs(&self) -> Result<()> {
        for dir in [
            self.config_root.clone(),
            self.internal_config_dir(),
            self.system_temp_dir(),
            self.plugin_dir.clone(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(())
    }

    /// Create the persisted list files that do not exist yet.
    pub fn create_missing_lists(&self, default_queue: &str, config: RobustnessConfig) -> Result<()> {
        for file in [
            self.init_list_file(),
            self.load_order_file(default_queue, default_queue)?,
            self.installed_list_file(),
            self.global_list_file(),
            self.ignored_errors_file(),
        ] {
            if list::ensure_list(&file, config)? {
                tracing::debug!(path = %file.display(), "Created list file");
            }
        }
        Ok(())
    }
}
