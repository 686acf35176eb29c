//! Line-oriented list files
//!
//! Every persisted set of the plugin manager is a UTF-8 text file with one
//! entry per line. Blank lines carry no meaning and are skipped on read.

use std::path::Path;

use crate::io::{self, RobustnessConfig};
use crate::Result;

/// Read every non-blank line of `path`.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = io::read_text(path)?;
    Ok(content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Replace the contents of `path` with `lines`, one per line.
pub fn write_lines<S: AsRef<str>>(
    path: &Path,
    lines: &[S],
    config: RobustnessConfig,
) -> Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    io::write_text(path, &content, config)
}

/// Create `path` as an empty list when it does not exist yet.
pub fn ensure_list(path: &Path, config: RobustnessConfig) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_lines::<&str>(path, &[], config)?;
    Ok(true)
}
