//! Plain directories as packages

use std::path::{Path, PathBuf};

use plugin_fs::io;

use super::Packer;
use crate::{Error, Result};

/// A directory is its own container; packing and unpacking are copies.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderPacker;

impl Packer for FolderPacker {
    fn name(&self) -> &str {
        "folder"
    }

    fn can_load(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn pack(&self, input: &Path, output: &Path) -> Result<Vec<PathBuf>> {
        io::copy_dir_all(input, output).map_err(|e| Error::plugin_io(input, e))
    }

    fn unpack(&self, path: &Path, output: &Path) -> Result<()> {
        io::copy_dir_all(path, output)
            .map(|_| ())
            .map_err(|e| Error::plugin_io(path, e))
    }
}
