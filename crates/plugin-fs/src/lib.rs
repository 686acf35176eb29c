//! Filesystem layer for the plugin manager
//!
//! Provides atomic line-list persistence, the derived directory layout for
//! packages, and the configurable constants that shape both.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod list;
pub mod paths;
pub mod settings;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use paths::PluginPaths;
pub use settings::Settings;
