//! Shared test utilities for the plugin-manager workspace.
//!
//! This crate provides filesystem fixtures used across crate test suites.
//! It is a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`dirs`]: [`dirs::TestSystemDirs`], a temporary config root and
//!   plugin directory pair
//! - [`package`]: [`package::PackageSource`] builder that writes package
//!   folders ready to be installed

pub mod dirs;
pub mod package;

pub use dirs::TestSystemDirs;
pub use package::PackageSource;
