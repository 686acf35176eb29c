//! Package lifecycle and load-order engine
//!
//! This crate installs packages into a plugin directory, tracks which of
//! them are activated, orders them by their dependencies and attaches the
//! extensions they provide to running hosts. [`PluginSystem`] is the entry
//! point; the components it is built from are public for applications that
//! need finer control.

pub mod error;
pub mod errors;
pub mod events;
pub mod formats;
pub mod install;
pub mod lifecycle;
pub mod load_order;
pub mod loader;
pub mod logging;
pub mod pointer;
pub mod registry;
pub mod store;
pub mod system;
pub mod update;
pub mod version;

pub use error::{Error, Result};
pub use errors::{ErrorAction, ErrorChannel, IgnoreList};
pub use events::{Decision, Hooks};
pub use install::{InstallReport, InstallStage};
pub use lifecycle::{
    AttachContext, Extension, ExtensionHost, ExtensionLifecycleManager, Marker, MarkerHandler,
};
pub use load_order::{DEFAULT_QUEUE, LoadOrderResolver};
pub use loader::{ModuleLoader, StaticModuleLoader};
pub use pointer::{OriginKind, PackagePointer};
pub use registry::PackageRegistry;
pub use store::ListStore;
pub use system::{PluginSystem, SystemOptions};
pub use update::{UpdateAction, UpdateChecker};
pub use version::PackageVersion;
