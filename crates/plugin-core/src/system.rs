//! The plugin system context
//!
//! [`PluginSystem`] owns every component of one plugin manager instance:
//! the on-disk layout, the error channel, the hooks, the format and update
//! registries, the module loader and the host table. Create it with
//! [`PluginSystem::init`]; after [`PluginSystem::teardown`] every operation
//! fails with [`Error::NotInitialized`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugin_fs::{ConfigStore, PluginPaths, RobustnessConfig, Settings, io};

use crate::errors::IgnoreList;
use crate::events::{CleanTempEvent, HostEvent, Hooks};
use crate::formats::{FolderPacker, FormatRegistry, PlainTextFormat, TarGzPacker};
use crate::install::{InstallReport, PackageInstallTransaction};
use crate::lifecycle::{Extension, ExtensionHost, ExtensionLifecycleManager, MarkerRegistry};
use crate::load_order::{DEFAULT_QUEUE, LoadOrderResolver};
use crate::loader::{ModuleLoader, StaticModuleLoader};
use crate::update::{
    ConfirmFn, FileEqualityChecker, ManifestUpdateChecker, ProgressFn, UpdateAction, UpdateManager,
};
use crate::{Error, ErrorChannel, ListStore, PackagePointer, PackageRegistry, Result};

/// Where a plugin system keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemOptions {
    /// Root of the internal files (lists, temp space).
    pub config_root: PathBuf,
    /// Directory packages are installed into.
    pub plugin_dir: PathBuf,
    /// Optional settings file, loaded when it exists.
    pub settings_file: Option<PathBuf>,
    pub robustness: RobustnessConfig,
}

impl SystemOptions {
    pub fn new(config_root: impl Into<PathBuf>, plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_root: config_root.into(),
            plugin_dir: plugin_dir.into(),
            settings_file: None,
            robustness: RobustnessConfig::default(),
        }
    }

    /// Use the default `<app>-Internal` and `<app>-Plugins` roots under
    /// `base`.
    pub fn for_application(base: &Path, app_name: &str) -> Self {
        let paths = PluginPaths::for_application(base, app_name, Settings::default());
        Self::new(paths.config_root(), paths.plugin_dir())
    }

    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }
}

/// One plugin manager instance.
pub struct PluginSystem {
    initialized: bool,
    paths: PluginPaths,
    channel: Arc<ErrorChannel>,
    registry: PackageRegistry,
    load_order: LoadOrderResolver,
    lifecycle: ExtensionLifecycleManager,
    formats: FormatRegistry,
    updates: UpdateManager,
    loader: Box<dyn ModuleLoader>,
    hooks: Hooks,
}

impl std::fmt::Debug for PluginSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSystem")
            .field("initialized", &self.initialized)
            .field("paths", &self.paths)
            .field("lifecycle", &self.lifecycle)
            .field("formats", &self.formats)
            .field("updates", &self.updates)
            .finish()
    }
}

impl PluginSystem {
    /// Prepare the directory layout and load the persisted state.
    ///
    /// Creates missing directories and list files, reads the settings file
    /// when one is configured and exists, and installs the ignore list from
    /// `ignored-errors.ls` as the error policy.
    pub fn init(options: SystemOptions) -> Result<Self> {
        tracing::info!(
            config_root = %options.config_root.display(),
            plugin_dir = %options.plugin_dir.display(),
            "Initializing plugin system"
        );

        let settings = match &options.settings_file {
            Some(file) if file.exists() => {
                ConfigStore::with_robustness(options.robustness).load_settings(file)?
            }
            _ => Settings::default(),
        };

        let paths = PluginPaths::new(&options.config_root, &options.plugin_dir, settings)
            .canonicalized()?;
        paths.ensure_internal_dirs()?;
        paths.create_missing_lists(DEFAULT_QUEUE, options.robustness)?;

        let channel = Arc::new(ErrorChannel::new());
        IgnoreList::load(&paths.ignored_errors_file())?.install(&channel);

        let store = ListStore::with_robustness(Arc::clone(&channel), options.robustness);
        let mut formats = FormatRegistry::new();
        formats.add_packer(Box::new(FolderPacker));
        formats.add_packer(Box::new(TarGzPacker));
        formats.add_data_format(Box::new(PlainTextFormat::new(paths.clone())));

        let mut updates = UpdateManager::new();
        updates.add_checker(Box::new(FileEqualityChecker::new(paths.clone())));
        updates.add_checker(Box::new(ManifestUpdateChecker::new(paths.clone())));

        let system = Self {
            initialized: true,
            registry: PackageRegistry::new(paths.clone(), store.clone()),
            load_order: LoadOrderResolver::new(paths.clone(), store),
            lifecycle: ExtensionLifecycleManager::new(Arc::clone(&channel)),
            formats,
            updates,
            loader: Box::new(StaticModuleLoader::new()),
            hooks: Hooks::new(),
            channel,
            paths,
        };
        tracing::info!("Plugin system initialized");
        Ok(system)
    }

    /// Replace the module loader.
    pub fn with_module_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.set_module_loader(loader);
        self
    }

    pub fn set_module_loader(&mut self, loader: impl ModuleLoader + 'static) {
        self.loader = Box::new(loader);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    pub fn paths(&self) -> &PluginPaths {
        &self.paths
    }

    pub fn error_channel(&self) -> &Arc<ErrorChannel> {
        &self.channel
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn formats_mut(&mut self) -> &mut FormatRegistry {
        &mut self.formats
    }

    pub fn updates_mut(&mut self) -> &mut UpdateManager {
        &mut self.updates
    }

    pub fn markers_mut(&mut self) -> &mut MarkerRegistry {
        self.lifecycle.markers_mut()
    }

    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    pub fn load_order(&self) -> &LoadOrderResolver {
        &self.load_order
    }

    pub fn lifecycle(&self) -> &ExtensionLifecycleManager {
        &self.lifecycle
    }

    /// Install the package at `source` and report where the install
    /// stopped.
    pub fn install(&mut self, source: &Path) -> Result<InstallReport> {
        self.ensure_initialized()?;
        PackageInstallTransaction {
            paths: &self.paths,
            formats: &self.formats,
            registry: &self.registry,
            load_order: &self.load_order,
            channel: &self.channel,
        }
        .run(&mut self.hooks, source)
    }

    /// Install the package at `source`. Returns its name when the install
    /// completed.
    pub fn add_package(&mut self, source: &Path) -> Result<Option<String>> {
        let report = self.install(source)?;
        Ok(if report.is_complete() { report.name } else { None })
    }

    /// Remove the package `name` from the global list and delete its files.
    ///
    /// An activated package is deactivated first; if that is vetoed the
    /// package stays.
    pub fn remove_package(&mut self, name: &str, keep_archive: bool) -> Result<bool> {
        self.ensure_initialized()?;
        let Some(pointer) = self.registry.find_global_by_name(name)? else {
            return Ok(false);
        };
        if self.registry.is_installed(name)? && !self.registry.deactivate(&mut self.hooks, name)? {
            tracing::debug!(package = name, "Package stays activated; removal skipped");
            return Ok(false);
        }

        if !self
            .registry
            .remove_global(&mut self.hooks, &pointer, keep_archive)?
        {
            return Ok(false);
        }
        if let Err(e) = self.paths.remove_package_dirs(name) {
            self.channel.report(Error::plugin_io(self.paths.package_dir(name), e))?;
        }
        Ok(true)
    }

    /// Activate the global package `name`.
    ///
    /// With `add_to_existing_hosts` its extensions are also attached to
    /// every registered host.
    pub fn activate_package(&mut self, name: &str, add_to_existing_hosts: bool) -> Result<bool> {
        self.ensure_initialized()?;
        if !self
            .registry
            .activate(&mut self.hooks, &self.load_order, name)?
        {
            return Ok(false);
        }

        if add_to_existing_hosts {
            if let Some(pointer) = self.registry.find_installed_by_name(name)? {
                for host in self.lifecycle.host_names() {
                    self.load_into(&host, &pointer)?;
                }
            }
        }
        Ok(true)
    }

    /// Deactivate the package `name`. Attached extensions stay attached
    /// until their host is unregistered.
    pub fn deactivate_package(&mut self, name: &str) -> Result<bool> {
        self.ensure_initialized()?;
        self.registry.deactivate(&mut self.hooks, name)
    }

    /// Deactivate the package an attached extension was loaded from.
    pub fn deactivate_extension(&mut self, host: &str, extension: &str) -> Result<bool> {
        self.ensure_initialized()?;
        let name = self
            .lifecycle
            .binding(host, extension)
            .map(|b| b.pointer().name().to_string())
            .ok_or_else(|| Error::MissingBinding {
                host: host.to_string(),
                extension: extension.to_string(),
            })?;
        self.registry.deactivate(&mut self.hooks, &name)
    }

    /// Register `host` and, with `load_extensions`, attach the extensions of
    /// every activated package in load order.
    ///
    /// Returns `false` when a handler vetoed the registration.
    pub fn register_host(&mut self, host: Arc<dyn ExtensionHost>, load_extensions: bool) -> Result<bool> {
        self.ensure_initialized()?;
        let name = host.name().to_string();
        let known = self.lifecycle.is_registered(&name);
        if !self.lifecycle.register_host(&mut self.hooks, host) {
            return Ok(false);
        }
        if known && !load_extensions {
            return Ok(true);
        }

        if load_extensions {
            let installed = self.registry.installed_packages()?;
            let sorted = self.load_order.sort_by_order(DEFAULT_QUEUE, installed)?;
            let mut attached = 0;
            for pointer in &sorted {
                attached += self.load_into(&name, pointer)?;
            }
            tracing::info!(host = %name, packages = sorted.len(), extensions = attached, "Loaded extensions");
        }

        let globals: Vec<String> = self
            .registry
            .global_packages()?
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        self.load_order.append_missing(DEFAULT_QUEUE, &globals)?;

        self.hooks.after_register_host.fire(&HostEvent { host: name });
        Ok(true)
    }

    /// Ask the module loader for the extensions of `pointer` that target
    /// `host` and attach them. Returns how many were attached.
    fn load_into(&mut self, host: &str, pointer: &PackagePointer) -> Result<usize> {
        let Some(host_ref) = self.lifecycle.host(host) else {
            return Ok(0);
        };
        let payload = self.paths.payload_file(pointer.name(), pointer.file());
        let result = self.loader.load(&payload, pointer, host_ref.as_ref());
        for failure in result.failures {
            self.channel.report(failure)?;
        }

        let mut attached = 0;
        for extension in result.extensions {
            if self.lifecycle.attach(
                &mut self.hooks,
                &self.paths,
                host,
                extension,
                pointer.clone(),
            )? {
                attached += 1;
            }
        }
        Ok(attached)
    }

    /// Detach every extension of `host` and forget it.
    pub fn unregister_host(&mut self, host: &str) -> Result<bool> {
        self.ensure_initialized()?;
        Ok(self.lifecycle.unregister_host(&mut self.hooks, host))
    }

    /// Attach a single extension, registering `host` first when needed.
    pub fn attach(
        &mut self,
        host: Arc<dyn ExtensionHost>,
        extension: Box<dyn Extension>,
        pointer: PackagePointer,
    ) -> Result<bool> {
        self.ensure_initialized()?;
        let name = host.name().to_string();
        if !self.lifecycle.is_registered(&name) && !self.register_host(host, false)? {
            return Ok(false);
        }
        self.lifecycle
            .attach(&mut self.hooks, &self.paths, &name, extension, pointer)
    }

    pub fn detach(&mut self, host: &str, extension: &str) -> Result<bool> {
        self.ensure_initialized()?;
        Ok(self.lifecycle.detach(&mut self.hooks, host, extension))
    }

    /// Queue the payload of the global package `name` for early loading.
    pub fn queue_early_load(&mut self, name: &str) -> Result<bool> {
        self.ensure_initialized()?;
        let Some(pointer) = self.registry.find_global_by_name(name)? else {
            return Ok(false);
        };
        let payload = self.paths.payload_file(pointer.name(), pointer.file());
        self.registry.enqueue_init(&payload)
    }

    /// Delete the system temp directory, including unpacked installs.
    pub fn clean_temp_directory(&mut self) -> Result<bool> {
        self.ensure_initialized()?;
        let event = CleanTempEvent {
            dir: self.paths.system_temp_dir(),
        };
        if !self.hooks.before_clean_temp.fire(&event) {
            return Ok(false);
        }

        tracing::info!(dir = %event.dir.display(), "Cleaning temp directory");
        if let Err(e) = io::remove_dir_if_exists(&event.dir) {
            return self.channel.recover(Error::plugin_io(&event.dir, e), false);
        }
        self.hooks.after_clean_temp.fire(&event);
        Ok(true)
    }

    /// Run every activated package through the update checkers.
    ///
    /// Packages whose checker returns [`UpdateAction::InstallFrom`] are
    /// reinstalled from that source. Failed checks are reported to the
    /// error channel.
    pub fn check_updates(
        &mut self,
        confirm: &mut ConfirmFn<'_>,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Vec<(String, UpdateAction)>> {
        self.ensure_initialized()?;
        let mut actions = Vec::new();

        for pointer in self.registry.installed_packages()? {
            let action = match self.updates.check_and_update(&pointer, confirm, progress) {
                Ok(Some(action)) => action,
                Ok(None) => continue,
                Err(e) => {
                    self.channel.report(e)?;
                    continue;
                }
            };
            if let UpdateAction::InstallFrom(source) = &action {
                self.add_package(source)?;
            }
            actions.push((pointer.name().to_string(), action));
        }
        Ok(actions)
    }

    /// Unregister every host and shut the system down.
    pub fn teardown(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        for host in self.lifecycle.host_names().into_iter().rev() {
            self.lifecycle.unregister_host(&mut self.hooks, &host);
        }
        self.initialized = false;
        tracing::info!("Plugin system shut down");
        Ok(())
    }
}
