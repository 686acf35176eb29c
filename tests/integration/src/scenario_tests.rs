//! End-to-end scenarios for an application embedding the plugin system.
//!
//! Each test drives a [`TestApp`] the way a host application would: install
//! packages from folders, activate them, register hosts and restart.

use std::sync::{Arc, Mutex};

use plugin_core::lifecycle::MarkerContext;
use plugin_core::{
    AttachContext, DEFAULT_QUEUE, Decision, Extension, ExtensionHost, Marker, MarkerHandler,
    PluginSystem, StaticModuleLoader, SystemOptions,
};
use plugin_test_utils::{PackageSource, TestSystemDirs};
use pretty_assertions::assert_eq;

// =============================================================================
// Test Infrastructure
// =============================================================================

type Journal = Arc<Mutex<Vec<String>>>;

struct Host {
    name: &'static str,
    capabilities: &'static [&'static str],
}

impl ExtensionHost for Host {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> &[&str] {
        self.capabilities
    }
}

/// A tool targeting one host, tagging its `run` member as a command.
struct Tool {
    name: String,
    target: &'static str,
    journal: Journal,
}

impl Extension for Tool {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[&str] {
        &["tool"]
    }

    fn needs_storage(&self) -> bool {
        true
    }

    fn satisfies_host(&self, host: &dyn ExtensionHost) -> bool {
        host.name() == self.target
    }

    fn on_load(&mut self, context: &AttachContext) {
        self.journal.lock().unwrap().push(format!(
            "{} loaded with config in {}",
            self.name,
            context.config_dir.display()
        ));
    }

    fn markers(&self) -> Vec<Marker> {
        vec![Marker::new("run", "command")]
    }
}

struct CommandCollector {
    commands: Journal,
}

impl MarkerHandler for CommandCollector {
    fn name(&self) -> &str {
        "commands"
    }

    fn tag(&self) -> &str {
        "command"
    }

    fn handle(&mut self, context: &MarkerContext<'_>) {
        self.commands.lock().unwrap().push(format!(
            "{}.{}@{}",
            context.extension.name(),
            context.marker.member,
            context.host
        ));
    }
}

/// Application harness over a persistent directory pair.
struct TestApp {
    dirs: TestSystemDirs,
    journal: Journal,
    commands: Journal,
}

impl TestApp {
    fn new() -> Self {
        Self {
            dirs: TestSystemDirs::new(),
            journal: Arc::default(),
            commands: Arc::default(),
        }
    }

    /// Start a system over the same directories. Payload `<name>.bin`
    /// provides tool `<name>` for host `editor`, or `viewer` when the name
    /// starts with `view`.
    fn start(&self, tools: &[&str]) -> PluginSystem {
        let mut loader = StaticModuleLoader::new();
        for tool in tools {
            let name = tool.to_string();
            let journal = Arc::clone(&self.journal);
            let target = if name.starts_with("view") { "viewer" } else { "editor" };
            loader.register(format!("{name}.bin"), name.clone(), move |_| {
                Ok(Box::new(Tool {
                    name: name.clone(),
                    target,
                    journal: Arc::clone(&journal),
                }) as Box<dyn Extension>)
            });
        }

        let mut system = PluginSystem::init(SystemOptions::new(
            self.dirs.config_root(),
            self.dirs.plugin_dir(),
        ))
        .unwrap()
        .with_module_loader(loader);
        system.markers_mut().add(Box::new(CommandCollector {
            commands: Arc::clone(&self.commands),
        }));
        system
    }

    fn publish(&self, source: &PackageSource) -> std::path::PathBuf {
        source.write_to(&self.dirs.sources_dir())
    }

    fn editor() -> Arc<Host> {
        Arc::new(Host {
            name: "editor",
            capabilities: &["editing", "commands"],
        })
    }

    fn viewer() -> Arc<Host> {
        Arc::new(Host {
            name: "viewer",
            capabilities: &["viewing"],
        })
    }
}

fn extension_names(system: &PluginSystem, host: &str) -> Vec<String> {
    system
        .lifecycle()
        .extensions(host)
        .iter()
        .map(|e| e.name().to_string())
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn install_activate_and_attach_across_hosts() {
    let app = TestApp::new();
    let mut system = app.start(&["format", "lint", "view-pdf"]);

    for name in ["format", "lint", "view-pdf"] {
        let source = app.publish(&PackageSource::new(name));
        assert_eq!(system.add_package(&source).unwrap(), Some(name.to_string()));
        assert!(system.activate_package(name, false).unwrap());
    }
    system.register_host(TestApp::editor(), true).unwrap();
    system.register_host(TestApp::viewer(), true).unwrap();

    assert_eq!(extension_names(&system, "editor"), vec!["format", "lint"]);
    assert_eq!(extension_names(&system, "viewer"), vec!["view-pdf"]);
    assert_eq!(system.lifecycle().extensions_with("tool").len(), 3);
    assert_eq!(
        system.lifecycle().host_extensions_with("viewer", "tool").len(),
        1
    );

    let commands: Vec<String> = system
        .lifecycle()
        .hosts_with("commands")
        .iter()
        .map(|h| h.name().to_string())
        .collect();
    assert_eq!(commands, vec!["editor"]);
    assert_eq!(
        *app.commands.lock().unwrap(),
        vec!["format.run@editor", "lint.run@editor", "view-pdf.run@viewer"]
    );
    app.dirs.assert_file_exists("plugins/format/config");
}

#[test]
fn state_survives_restart() {
    let app = TestApp::new();
    {
        let mut system = app.start(&[]);
        for name in ["alpha", "beta", "gamma"] {
            let source = app.publish(&PackageSource::new(name));
            system.add_package(&source).unwrap();
        }
        system.activate_package("alpha", false).unwrap();
        system.activate_package("gamma", false).unwrap();
        system
            .load_order()
            .move_to_top(DEFAULT_QUEUE, "gamma", false)
            .unwrap();
        system.teardown().unwrap();
    }

    let mut system = app.start(&["alpha", "beta", "gamma"]);
    assert_eq!(
        system.load_order().order(DEFAULT_QUEUE).unwrap(),
        vec!["gamma", "alpha", "beta"]
    );
    system.register_host(TestApp::editor(), true).unwrap();
    assert_eq!(extension_names(&system, "editor"), vec!["gamma", "alpha"]);
}

#[test]
fn dependent_loads_after_dependency() {
    let app = TestApp::new();
    let mut system = app.start(&["core", "plugin"]);

    let plugin = app.publish(&PackageSource::new("plugin").depends_on("core"));
    let core = app.publish(&PackageSource::new("core"));
    system.add_package(&plugin).unwrap();
    system.add_package(&core).unwrap();
    system.activate_package("plugin", false).unwrap();
    system.activate_package("core", false).unwrap();

    system.register_host(TestApp::editor(), true).unwrap();
    assert_eq!(extension_names(&system, "editor"), vec!["core", "plugin"]);
}

#[test]
fn named_queue_is_independent_of_default() {
    let app = TestApp::new();
    let system = app.start(&[]);
    let order = system.load_order();

    assert!(order.order("startup").unwrap().is_empty());
    order.move_to_bottom("startup", "late", true).unwrap();
    order.move_to_top("startup", "early", true).unwrap();

    assert_eq!(order.order("startup").unwrap(), vec!["early", "late"]);
    assert!(order.order(DEFAULT_QUEUE).unwrap().is_empty());
}

#[test]
fn upgrade_keeps_both_records_and_reloads_payload() {
    let app = TestApp::new();
    let mut system = app.start(&["tool"]);

    let v1 = app.publish(&PackageSource::new("tool"));
    system.add_package(&v1).unwrap();
    system.activate_package("tool", false).unwrap();

    let v2 = PackageSource::new("tool")
        .version("1.1.0.0")
        .payload("payload of tool 1.1");
    let v2_dir = v2.write_to(&app.dirs.root().join("next"));
    let report = system.install(&v2_dir).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.is_new, Some(true));
    assert_eq!(app.dirs.read_list("global-packages").len(), 2);
    assert_eq!(app.dirs.read_list("load-order"), vec!["tool"]);
    let payload = system.paths().payload_file("tool", "tool.bin");
    assert_eq!(
        std::fs::read_to_string(payload).unwrap(),
        "payload of tool 1.1"
    );
}

#[test]
fn host_can_veto_unwanted_packages() {
    let app = TestApp::new();
    let mut system = app.start(&["good", "evil"]);
    let vetoed = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&vetoed);
    system.hooks_mut().before_attach.subscribe(move |e| {
        if e.pointer.name() == "evil" {
            seen.lock().unwrap().push(e.extension.clone());
            Decision::Cancel
        } else {
            Decision::Proceed
        }
    });

    for name in ["good", "evil"] {
        let source = app.publish(&PackageSource::new(name));
        system.add_package(&source).unwrap();
        system.activate_package(name, false).unwrap();
    }
    system.register_host(TestApp::editor(), true).unwrap();

    assert_eq!(extension_names(&system, "editor"), vec!["good"]);
    assert_eq!(*vetoed.lock().unwrap(), vec!["evil"]);
    assert_eq!(*app.commands.lock().unwrap(), vec!["good.run@editor"]);
}

#[test]
fn removed_package_is_gone_after_restart() {
    let app = TestApp::new();
    {
        let mut system = app.start(&[]);
        let source = app.publish(&PackageSource::new("temp"));
        system.add_package(&source).unwrap();
        system.activate_package("temp", false).unwrap();
        assert!(system.remove_package("temp", false).unwrap());
        assert!(system.clean_temp_directory().unwrap());
    }

    let mut system = app.start(&["temp"]);
    system.register_host(TestApp::editor(), true).unwrap();
    assert!(extension_names(&system, "editor").is_empty());
    assert!(!system.registry().is_global("temp").unwrap());
    app.dirs.assert_file_not_exists("plugins/temp");
}
