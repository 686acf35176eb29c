//! Persistent line lists routed through the error channel

use std::path::Path;
use std::sync::Arc;

use plugin_fs::{RobustnessConfig, list};

use crate::{Error, ErrorChannel, Result};

/// Reads and writes the persisted sets.
///
/// Failures are reported to the [`ErrorChannel`]. When the channel ignores
/// them, `load` yields an empty list and `save` yields `false`.
#[derive(Debug, Clone)]
pub struct ListStore {
    channel: Arc<ErrorChannel>,
    robustness: RobustnessConfig,
}

impl ListStore {
    pub fn new(channel: Arc<ErrorChannel>) -> Self {
        Self::with_robustness(channel, RobustnessConfig::default())
    }

    pub fn with_robustness(channel: Arc<ErrorChannel>, robustness: RobustnessConfig) -> Self {
        Self {
            channel,
            robustness,
        }
    }

    pub fn channel(&self) -> &Arc<ErrorChannel> {
        &self.channel
    }

    /// Every non-blank line of `path`.
    pub fn load(&self, path: &Path) -> Result<Vec<String>> {
        match list::read_lines(path) {
            Ok(lines) => {
                tracing::debug!(path = %path.display(), count = lines.len(), "Loaded list");
                Ok(lines)
            }
            Err(source) => self.channel.recover(
                Error::ListIo {
                    action: "read",
                    path: path.to_path_buf(),
                    source,
                },
                Vec::new(),
            ),
        }
    }

    /// Replace `path` with `lines`.
    pub fn save<S: AsRef<str>>(&self, path: &Path, lines: &[S]) -> Result<bool> {
        match list::write_lines(path, lines, self.robustness) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), count = lines.len(), "Saved list");
                Ok(true)
            }
            Err(source) => self.channel.recover(
                Error::ListIo {
                    action: "write",
                    path: path.to_path_buf(),
                    source,
                },
                false,
            ),
        }
    }

    /// Append `line` unless already present.
    pub fn append_unique(&self, path: &Path, line: &str) -> Result<bool> {
        let mut lines = self.load(path)?;
        if lines.iter().any(|l| l == line) {
            return Ok(false);
        }
        lines.push(line.to_string());
        self.save(path, &lines)
    }
}
