//! Package pointers and their record form
//!
//! A [`PackagePointer`] identifies one package: its name, the payload file to
//! load, where it came from, its version and the names of the packages it
//! depends on. Pointers are persisted as single-line records:
//!
//! ```text
//! name|file|origin|version|dep-a;dep-b
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use plugin_fs::settings::DEPENDENCY_SEPARATOR;

use crate::{Error, PackageVersion, Result};

/// Where a package was installed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginKind {
    /// No origin recorded.
    None,
    /// A local file or directory.
    Path(PathBuf),
    /// A remote location.
    Url(String),
}

/// Immutable description of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackagePointer {
    name: String,
    file: String,
    origin: String,
    version: PackageVersion,
    dependencies: BTreeSet<String>,
}

impl PackagePointer {
    /// Create a pointer. The name is checked with [`validate_name`] and the
    /// payload file with [`validate_file_name`].
    pub fn new<I, S>(
        name: impl Into<String>,
        file: impl Into<String>,
        origin: impl Into<String>,
        version: PackageVersion,
        dependencies: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        validate_name(&name)?;
        let file = file.into();
        validate_file_name(&name, &file)?;
        Ok(Self {
            name,
            file,
            origin: origin.into(),
            version,
            dependencies: dependencies
                .into_iter()
                .map(Into::into)
                .filter(|d: &String| !d.is_empty())
                .collect(),
        })
    }

    /// Parse a record line.
    ///
    /// A missing dependency field means no dependencies. Empty fields are
    /// kept in place. The name and payload file must pass the same checks as
    /// [`PackagePointer::new`], so a record can never point outside the
    /// plugin directory.
    pub fn from_record(record: &str, separator: char) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidRecord {
            record: record.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = record.trim_end_matches(['\r', '\n']).split(separator).collect();
        if fields.len() < 4 {
            return Err(invalid("expected at least name, file, origin and version"));
        }
        if fields.len() > 5 {
            return Err(invalid("too many fields"));
        }

        let name = fields[0].trim();
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        validate_name(name)
            .and_then(|()| validate_file_name(name, fields[1]))
            .map_err(|e| invalid(&e.to_string()))?;
        let version = PackageVersion::parse(fields[3]).map_err(|e| invalid(&e.to_string()))?;
        let dependencies = fields
            .get(4)
            .map(|deps| {
                deps.split(DEPENDENCY_SEPARATOR)
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            file: fields[1].to_string(),
            origin: fields[2].to_string(),
            version,
            dependencies,
        })
    }

    /// Serialize into a record line. Dependencies are written sorted.
    pub fn to_record(&self, separator: char) -> String {
        let dependencies = self
            .dependencies
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&DEPENDENCY_SEPARATOR.to_string());
        format!(
            "{name}{s}{file}{s}{origin}{s}{version}{s}{dependencies}",
            name = self.name,
            file = self.file,
            origin = self.origin,
            version = self.version,
            s = separator,
        )
    }

    /// Check that no field contains `separator`, so [`Self::to_record`]
    /// produces a record that parses back into this pointer.
    pub fn check_separator(&self, separator: char) -> Result<()> {
        let fields = [self.name.as_str(), self.file.as_str(), self.origin.as_str()];
        let clashes = fields.iter().any(|f| f.contains([separator, '\n', '\r']))
            || self.dependencies.iter().any(|d| d.contains(separator));
        if clashes {
            return Err(Error::InvalidRecord {
                record: self.to_record(separator),
                reason: format!("a field contains the separator '{separator}'"),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the payload inside the package's bin folder.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn version(&self) -> PackageVersion {
        self.version
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains(name)
    }

    /// Whether both pointers name the same package, regardless of version.
    pub fn same_package(&self, other: &PackagePointer) -> bool {
        self.name == other.name
    }

    /// Classify the origin string.
    pub fn origin_kind(&self) -> OriginKind {
        let origin = self.origin.trim();
        if origin.is_empty() {
            return OriginKind::None;
        }
        if let Some(path) = origin.strip_prefix("file://") {
            return OriginKind::Path(PathBuf::from(path));
        }
        if origin.contains("://") {
            return OriginKind::Url(origin.to_string());
        }
        OriginKind::Path(PathBuf::from(origin))
    }
}

impl fmt::Display for PackagePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Check that `name` can be stored in a record and used as a folder name.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.trim() != name {
        return Err(invalid("name has surrounding whitespace"));
    }
    if name.contains(['|', DEPENDENCY_SEPARATOR, '\n', '\r', '/', '\\']) {
        return Err(invalid("name contains a reserved character"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name is a relative path component"));
    }
    Ok(())
}

/// Check that a payload file name is empty or a single file name.
pub fn validate_file_name(package: &str, file: &str) -> Result<()> {
    if file.is_empty() {
        return Ok(());
    }
    if file.contains(['/', '\\', '\n', '\r']) || file == "." || file == ".." {
        return Err(Error::InvalidName {
            name: package.to_string(),
            reason: format!("payload file '{file}' is not a plain file name"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn pointer(name: &str, deps: &[&str]) -> PackagePointer {
        PackagePointer::new(
            name,
            format!("{name}.bin"),
            "",
            PackageVersion::new(1, 0),
            deps.iter().copied(),
        )
        .unwrap()
    }

    #[test]
    fn record_round_trip() {
        let original = pointer("alpha", &["beta", "gamma"]);
        let record = original.to_record('|');
        assert_eq!(record, "alpha|alpha.bin||1.0|beta;gamma");
        assert_eq!(PackagePointer::from_record(&record, '|').unwrap(), original);
    }

    #[test]
    fn missing_dependency_field_is_empty_set() {
        let parsed = PackagePointer::from_record("alpha|alpha.bin|/src|2.1.3", '|').unwrap();
        assert!(parsed.dependencies().is_empty());
        assert_eq!(parsed.origin(), "/src");
        assert_eq!(parsed.version().to_string(), "2.1.3");
    }

    #[test]
    fn empty_origin_keeps_field_positions() {
        let parsed = PackagePointer::from_record("alpha|a.bin||1.0|beta", '|').unwrap();
        assert_eq!(parsed.origin(), "");
        assert!(parsed.depends_on("beta"));
    }

    #[test]
    fn dependencies_serialize_sorted() {
        let p = pointer("alpha", &["zeta", "beta", "zeta"]);
        assert_eq!(p.to_record('|'), "alpha|alpha.bin||1.0|beta;zeta");
    }

    #[rstest]
    #[case("alpha|a.bin|origin")]
    #[case("|a.bin||1.0|")]
    #[case("alpha|a.bin||one.zero|")]
    #[case("alpha|a.bin||1.0|b|extra")]
    #[case("")]
    fn malformed_records_are_rejected(#[case] record: &str) {
        assert!(matches!(
            PackagePointer::from_record(record, '|'),
            Err(Error::InvalidRecord { .. })
        ));
    }

    #[test]
    fn custom_separator() {
        let p = pointer("alpha", &["beta"]);
        let record = p.to_record('#');
        assert_eq!(record, "alpha#alpha.bin##1.0#beta");
        assert_eq!(PackagePointer::from_record(&record, '#').unwrap(), p);
    }

    #[test]
    fn same_package_ignores_version() {
        let a = pointer("alpha", &[]);
        let b = PackagePointer::new("alpha", "x", "", PackageVersion::new(2, 0), Vec::<String>::new())
            .unwrap();
        assert!(a.same_package(&b));
        assert_ne!(a, b);
    }

    #[rstest]
    #[case("", OriginKind::None)]
    #[case("/opt/pkg", OriginKind::Path(PathBuf::from("/opt/pkg")))]
    #[case("file:///opt/pkg", OriginKind::Path(PathBuf::from("/opt/pkg")))]
    #[case("https://example.com/pkg", OriginKind::Url("https://example.com/pkg".into()))]
    fn origin_kinds(#[case] origin: &str, #[case] expected: OriginKind) {
        let p = PackagePointer::new("alpha", "a.bin", origin, PackageVersion::default(), Vec::<String>::new())
            .unwrap();
        assert_eq!(p.origin_kind(), expected);
    }

    #[rstest]
    #[case("../victim|x.bin||1.0|")]
    #[case("a/b|x.bin||1.0|")]
    #[case("..|x.bin||1.0|")]
    #[case("demo|../../escape.bin||1.0|")]
    fn records_with_path_names_are_rejected(#[case] record: &str) {
        assert!(matches!(
            PackagePointer::from_record(record, '|'),
            Err(Error::InvalidRecord { .. })
        ));
    }

    #[test]
    fn separator_clash_is_detected() {
        let p = PackagePointer::new("a#b", "a.bin", "", PackageVersion::default(), ["dep"]).unwrap();
        assert!(p.check_separator('|').is_ok());
        assert!(matches!(
            p.check_separator('#'),
            Err(Error::InvalidRecord { .. })
        ));

        let origin = PackagePointer::new("a", "a.bin", "/src#1", PackageVersion::default(), ["dep"])
            .unwrap();
        assert!(origin.check_separator('#').is_err());
    }

    #[rstest]
    #[case("")]
    #[case(" padded ")]
    #[case("a|b")]
    #[case("a;b")]
    #[case("nested/name")]
    #[case("..")]
    fn invalid_names(#[case] name: &str) {
        assert!(matches!(validate_name(name), Err(Error::InvalidName { .. })));
    }

    proptest! {
        #[test]
        fn round_trip_law(
            name in "[a-zA-Z0-9_.-]{1,16}",
            file in "[a-zA-Z0-9_.-]{0,16}",
            origin in "[a-zA-Z0-9_./:-]{0,24}",
            major in 0u32..100,
            minor in 0u32..100,
            deps in proptest::collection::btree_set("[a-z]{1,8}", 0..4),
        ) {
            prop_assume!(name != "." && name != "..");
            prop_assume!(file != "." && file != "..");
            let p = PackagePointer::new(name, file, origin, PackageVersion::new(major, minor), deps).unwrap();
            prop_assert_eq!(PackagePointer::from_record(&p.to_record('|'), '|').unwrap(), p);
        }
    }
}
