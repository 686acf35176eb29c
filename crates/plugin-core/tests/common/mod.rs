//! Shared helpers for plugin-core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use plugin_core::{
    AttachContext, Extension, ExtensionHost, PackagePointer, PluginSystem, StaticModuleLoader,
    SystemOptions,
};
use plugin_test_utils::{PackageSource, TestSystemDirs};

/// Ordered record of lifecycle callbacks.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::default()
}

pub fn entries(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub struct RecordingHost {
    name: String,
    log: EventLog,
}

impl RecordingHost {
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
        })
    }
}

impl ExtensionHost for RecordingHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[&str] {
        &["recording"]
    }

    fn on_extension_load(&self, extension: &dyn Extension, pointer: &PackagePointer) {
        self.log.lock().unwrap().push(format!(
            "{}:host-load:{}@{}",
            self.name,
            extension.name(),
            pointer.name()
        ));
    }

    fn on_extension_unload(&self, extension: &dyn Extension) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:host-unload:{}", self.name, extension.name()));
    }
}

pub struct RecordingExtension {
    name: String,
    log: EventLog,
    storage: bool,
}

impl RecordingExtension {
    pub fn boxed(name: &str, log: &EventLog) -> Box<dyn Extension> {
        Box::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            storage: false,
        })
    }

    pub fn with_storage(name: &str, log: &EventLog) -> Box<dyn Extension> {
        Box::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            storage: true,
        })
    }
}

impl Extension for RecordingExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[&str] {
        &["recorded"]
    }

    fn needs_storage(&self) -> bool {
        self.storage
    }

    fn on_load(&mut self, context: &AttachContext) {
        self.log
            .lock()
            .unwrap()
            .push(format!("load:{}@{}", self.name, context.host));
    }

    fn on_unload(&mut self) {
        self.log.lock().unwrap().push(format!("unload:{}", self.name));
    }
}

/// Module loader where payload `<name>.bin` provides one extension `<name>`.
pub fn loader_for(names: &[&str], log: &EventLog) -> StaticModuleLoader {
    let mut loader = StaticModuleLoader::new();
    for name in names {
        let name = name.to_string();
        let log = Arc::clone(log);
        loader.register(format!("{name}.bin"), name.clone(), move |_| {
            Ok(RecordingExtension::boxed(&name, &log))
        });
    }
    loader
}

pub struct Fixture {
    pub dirs: TestSystemDirs,
    pub system: PluginSystem,
    pub log: EventLog,
}

impl Fixture {
    /// A fresh system whose loader knows the payloads of `names`.
    pub fn new(names: &[&str]) -> Self {
        let dirs = TestSystemDirs::new();
        let log = new_log();
        let system = PluginSystem::init(SystemOptions::new(dirs.config_root(), dirs.plugin_dir()))
            .unwrap()
            .with_module_loader(loader_for(names, &log));
        Self { dirs, system, log }
    }

    /// Write `source` under the sources dir and install it.
    pub fn install(&mut self, source: &PackageSource) -> Option<String> {
        let path = source.write_to(&self.dirs.sources_dir());
        self.system.add_package(&path).unwrap()
    }

    /// Install and activate `source`.
    pub fn install_active(&mut self, source: &PackageSource) {
        let name = self.install(source).unwrap();
        assert!(self.system.activate_package(&name, false).unwrap());
    }
}
