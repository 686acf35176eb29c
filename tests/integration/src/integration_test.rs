//! Cross-crate checks: settings files written by plugin-fs drive the layout
//! used by plugin-core.

use plugin_core::{PluginSystem, SystemOptions};
use plugin_fs::{ConfigStore, Settings};
use plugin_test_utils::{PackageSource, TestSystemDirs};
use pretty_assertions::assert_eq;

fn custom_settings() -> Settings {
    Settings {
        installed_list_name: "active".to_string(),
        load_order_list_name: "order".to_string(),
        data_file_name: "info.txt".to_string(),
        ..Settings::default()
    }
}

#[test]
fn saved_settings_round_trip_through_init() {
    for file in ["settings.toml", "settings.json", "settings.yaml"] {
        let dirs = TestSystemDirs::new();
        let path = dirs.root().join(file);
        ConfigStore::new().save_settings(&path, &custom_settings()).unwrap();

        let mut system = PluginSystem::init(
            SystemOptions::new(dirs.config_root(), dirs.plugin_dir()).with_settings_file(&path),
        )
        .unwrap();
        assert_eq!(system.paths().settings(), &custom_settings(), "{file}");

        let source = PackageSource::new("demo").write_to(&dirs.sources_dir());
        system.add_package(&source).unwrap();
        system.activate_package("demo", false).unwrap();

        dirs.assert_list_contains("active", "demo|");
        assert_eq!(dirs.read_list("order"), vec!["demo"], "{file}");
    }
}

#[test]
fn json_settings_may_be_partial() {
    let dirs = TestSystemDirs::new();
    let path = dirs.root().join("settings.json");
    let partial = serde_json::json!({ "temp_folder": "scratch" });
    std::fs::write(&path, partial.to_string()).unwrap();

    let mut system = PluginSystem::init(
        SystemOptions::new(dirs.config_root(), dirs.plugin_dir()).with_settings_file(&path),
    )
    .unwrap();
    let source = PackageSource::new("demo").write_to(&dirs.sources_dir());
    system.add_package(&source).unwrap();

    dirs.assert_file_exists("internal/scratch/install");
    assert_eq!(system.paths().settings().global_list_name, "global-packages");
}

#[test]
fn application_layout_nests_under_base() {
    let dirs = TestSystemDirs::new();
    let system = PluginSystem::init(SystemOptions::for_application(dirs.root(), "editor")).unwrap();

    assert!(system.paths().config_root().ends_with("editor-Internal"));
    assert!(system.paths().plugin_dir().ends_with("editor-Plugins"));
    assert!(system.paths().installed_list_file().is_file());
}
