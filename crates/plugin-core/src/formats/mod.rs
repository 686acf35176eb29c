//! Package container and metadata formats
//!
//! A [`Packer`] turns a package source (a folder, an archive) into an
//! unpacked directory. A [`DataFormat`] reads the package record out of that
//! directory and copies its files into place. The [`FormatRegistry`] picks
//! the first registered format that accepts an input.

mod archive;
mod folder;
mod plain_text;

pub use archive::TarGzPacker;
pub use folder::FolderPacker;
pub use plain_text::PlainTextFormat;

use std::path::{Path, PathBuf};

use crate::{PackagePointer, Result};

/// Packs and unpacks package containers.
pub trait Packer: Send {
    fn name(&self) -> &str;

    fn can_load(&self, path: &Path) -> bool;

    /// Pack `input` into `output`, returning the written files.
    fn pack(&self, input: &Path, output: &Path) -> Result<Vec<PathBuf>>;

    /// Unpack the container at `path` into the directory `output`.
    fn unpack(&self, path: &Path, output: &Path) -> Result<()>;
}

/// Reads, writes and installs the metadata of an unpacked package.
pub trait DataFormat: Send {
    fn name(&self) -> &str;

    fn can_load(&self, dir: &Path) -> bool;

    fn load_data(&self, dir: &Path) -> Result<PackagePointer>;

    fn save_data(&self, pointer: &PackagePointer, dir: &Path) -> Result<()>;

    /// Copy the unpacked package in `dir` into its permanent directories.
    fn install(&self, pointer: &PackagePointer, dir: &Path) -> Result<()>;
}

/// Registered packers and data formats, tried in registration order.
#[derive(Default)]
pub struct FormatRegistry {
    packers: Vec<Box<dyn Packer>>,
    data_formats: Vec<Box<dyn DataFormat>>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let packers: Vec<&str> = self.packers.iter().map(|p| p.name()).collect();
        let data_formats: Vec<&str> = self.data_formats.iter().map(|d| d.name()).collect();
        f.debug_struct("FormatRegistry")
            .field("packers", &packers)
            .field("data_formats", &data_formats)
            .finish()
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a packer unless one with the same name is registered.
    pub fn add_packer(&mut self, packer: Box<dyn Packer>) -> bool {
        if self.packers.iter().any(|p| p.name() == packer.name()) {
            return false;
        }
        tracing::debug!(packer = packer.name(), "Added packer");
        self.packers.push(packer);
        true
    }

    pub fn remove_packer(&mut self, name: &str) -> bool {
        let before = self.packers.len();
        self.packers.retain(|p| p.name() != name);
        self.packers.len() != before
    }

    /// Add a data format unless one with the same name is registered.
    pub fn add_data_format(&mut self, format: Box<dyn DataFormat>) -> bool {
        if self.data_formats.iter().any(|d| d.name() == format.name()) {
            return false;
        }
        tracing::debug!(format = format.name(), "Added data format");
        self.data_formats.push(format);
        true
    }

    pub fn remove_data_format(&mut self, name: &str) -> bool {
        let before = self.data_formats.len();
        self.data_formats.retain(|d| d.name() != name);
        self.data_formats.len() != before
    }

    pub fn packer_for(&self, path: &Path) -> Option<&dyn Packer> {
        self.packers
            .iter()
            .find(|p| p.can_load(path))
            .map(|p| p.as_ref())
    }

    pub fn data_format_for(&self, dir: &Path) -> Option<&dyn DataFormat> {
        self.data_formats
            .iter()
            .find(|d| d.can_load(dir))
            .map(|d| d.as_ref())
    }

    pub fn packer_count(&self) -> usize {
        self.packers.len()
    }

    pub fn data_format_count(&self) -> usize {
        self.data_formats.len()
    }
}
