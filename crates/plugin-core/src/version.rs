//! Package version numbers
//!
//! Versions have two to four dot-separated numeric components
//! (`major.minor[.build[.revision]]`). An absent component is not the same
//! as zero: `1.0 < 1.0.0 < 1.0.0.0`.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A two to four component version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageVersion {
    major: u32,
    minor: u32,
    build: Option<u32>,
    revision: Option<u32>,
}

impl PackageVersion {
    /// A `major.minor` version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Add a build component.
    pub const fn with_build(mut self, build: u32) -> Self {
        self.build = Some(build);
        self
    }

    /// Add a revision component. Implies a build component of zero when none
    /// is set.
    pub const fn with_revision(mut self, revision: u32) -> Self {
        if self.build.is_none() {
            self.build = Some(0);
        }
        self.revision = Some(revision);
        self
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn build(&self) -> Option<u32> {
        self.build
    }

    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidVersion {
            version: input.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = input.trim().split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(invalid("expected two to four components"));
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in parts {
            let number = part
                .parse::<u32>()
                .map_err(|_| invalid("components must be unsigned integers"))?;
            numbers.push(number);
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            build: numbers.get(2).copied(),
            revision: numbers.get(3).copied(),
        })
    }
}

impl Default for PackageVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{revision}")?;
        }
        Ok(())
    }
}
