//! Gzip-compressed tarballs as packages

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder as TarBuilder};

use super::Packer;
use crate::{Error, Result};

/// Packs a package directory into a single `.tar.gz` (or `.tgz`) file.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarGzPacker;

impl TarGzPacker {
    fn is_archive_name(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| {
                let n = n.to_ascii_lowercase();
                n.ends_with(".tar.gz") || n.ends_with(".tgz")
            })
            .unwrap_or(false)
    }
}

impl Packer for TarGzPacker {
    fn name(&self) -> &str {
        "tar-gz"
    }

    fn can_load(&self, path: &Path) -> bool {
        path.is_file() && Self::is_archive_name(path)
    }

    fn pack(&self, input: &Path, output: &Path) -> Result<Vec<PathBuf>> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::plugin_io(parent, e))?;
        }
        let file = File::create(output).map_err(|e| Error::plugin_io(output, e))?;
        let mut tar = TarBuilder::new(GzEncoder::new(file, Compression::default()));
        tar.append_dir_all(".", input)
            .map_err(|e| Error::plugin_io(input, e))?;
        tar.into_inner()
            .and_then(|encoder| encoder.finish())
            .map_err(|e| Error::plugin_io(output, e))?;

        tracing::debug!(input = %input.display(), output = %output.display(), "Packed archive");
        Ok(vec![output.to_path_buf()])
    }

    fn unpack(&self, path: &Path, output: &Path) -> Result<()> {
        let file = File::open(path).map_err(|e| Error::plugin_io(path, e))?;
        // Entries with `..` components or absolute paths are skipped by tar.
        Archive::new(GzDecoder::new(file))
            .unpack(output)
            .map_err(|e| Error::plugin_io(path, e))
    }
}
