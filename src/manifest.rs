//! Manifest file classification and typed document parsing.
//!
//! A manifest tree (winget layout) holds one directory per package/version,
//! each containing YAML documents distinguished by file-name convention:
//! - `Foo.Bar.yaml` — version document (identifier, version, tags)
//! - `Foo.Bar.locale.en-US.yaml` — canonical English locale document
//! - `Foo.Bar.locale.pt-BR.yaml` — other locale document
//! - `Foo.Bar.installer.yaml` — installer document, ignored by this tool
//!
//! Parsing maps the raw YAML into the typed [`RawManifest`] schema rather
//! than probing an untyped value tree; every recognized field is optional
//! and unknown keys are ignored.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Role of a manifest file within its directory, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Neither locale- nor installer-marked. Source of identifier/version.
    Version,

    /// Locale-marked descriptive document. `en_us` is true for the canonical
    /// English (US) locale, preferred over any other locale.
    Locale { en_us: bool },

    /// Installer-marked document. Not consumed by this pipeline.
    Installer,
}

/// Returns true if `path` has a recognized manifest extension
/// (`.yaml` or `.yml`, case-insensitive).
pub fn is_manifest_file(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            ext == "yaml" || ext == "yml"
        }
        None => false,
    }
}

/// Classifies a manifest-like file by its name. Returns `None` for files
/// without a recognized manifest extension.
pub fn classify(path: &Path) -> Option<ManifestKind> {
    if !is_manifest_file(path) {
        return None;
    }
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.contains(".installer.") {
        Some(ManifestKind::Installer)
    } else if name.contains(".locale.") {
        Some(ManifestKind::Locale {
            en_us: name.contains(".locale.en-us"),
        })
    } else {
        Some(ManifestKind::Version)
    }
}

/// `PackageVersion` may appear as a quoted string or as a bare YAML scalar
/// (`1.2` parses as a number). Both normalize to their string form.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VersionField {
    Text(String),
    Scalar(serde_yaml::Number),
}

impl VersionField {
    pub fn as_string(&self) -> String {
        match self {
            VersionField::Text(s) => s.clone(),
            VersionField::Scalar(n) => n.to_string(),
        }
    }
}

/// Typed view of one manifest document. Field names follow the winget
/// PascalCase convention; all fields are optional at parse time and
/// extraction decides per field what "missing" means.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawManifest {
    pub package_identifier: Option<String>,
    pub package_name: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub publisher: Option<String>,
    pub package_version: Option<VersionField>,
    pub tags: Option<Vec<String>>,
    pub package_url: Option<String>,
    pub license: Option<String>,
}

impl RawManifest {
    /// Identifier with empty strings treated as missing.
    pub fn identifier(&self) -> Option<&str> {
        self.package_identifier
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Version string with empty strings treated as missing.
    pub fn version(&self) -> Option<String> {
        self.package_version
            .as_ref()
            .map(VersionField::as_string)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Errors raised while reading or parsing one manifest document.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Reads and parses one manifest document into [`RawManifest`].
///
/// The file handle is scoped to this call; it is released before returning
/// regardless of outcome.
pub fn parse_manifest(path: &Path) -> Result<RawManifest, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_name_markers() {
        assert_eq!(
            classify(Path::new("Foo.Bar.yaml")),
            Some(ManifestKind::Version)
        );
        assert_eq!(
            classify(Path::new("Foo.Bar.installer.yaml")),
            Some(ManifestKind::Installer)
        );
        assert_eq!(
            classify(Path::new("Foo.Bar.locale.en-US.yaml")),
            Some(ManifestKind::Locale { en_us: true })
        );
        assert_eq!(
            classify(Path::new("Foo.Bar.locale.pt-BR.yml")),
            Some(ManifestKind::Locale { en_us: false })
        );
        assert_eq!(classify(Path::new("readme.md")), None);
        assert_eq!(classify(Path::new("notes.txt")), None);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(
            classify(Path::new("Foo.Bar.Locale.EN-us.YAML")),
            Some(ManifestKind::Locale { en_us: true })
        );
        assert_eq!(
            classify(Path::new("Foo.Bar.INSTALLER.YML")),
            Some(ManifestKind::Installer)
        );
    }

    #[test]
    fn parses_recognized_fields_and_ignores_unknown_keys() {
        let doc = "\
PackageIdentifier: Foo.Bar
PackageVersion: \"2.0.0\"
ShortDescription: A tool
Tags:
  - cli
  - utility
ManifestType: version
ManifestVersion: 1.6.0
";
        let raw: RawManifest = serde_yaml::from_str(doc).unwrap();
        assert_eq!(raw.identifier(), Some("Foo.Bar"));
        assert_eq!(raw.version().as_deref(), Some("2.0.0"));
        assert_eq!(raw.short_description.as_deref(), Some("A tool"));
        assert_eq!(
            raw.tags,
            Some(vec!["cli".to_string(), "utility".to_string()])
        );
    }

    #[test]
    fn bare_scalar_version_normalizes_to_string() {
        let raw: RawManifest =
            serde_yaml::from_str("PackageIdentifier: Foo.Bar\nPackageVersion: 2026\n").unwrap();
        assert_eq!(raw.version().as_deref(), Some("2026"));
    }

    #[test]
    fn empty_identifier_counts_as_missing() {
        let raw: RawManifest = serde_yaml::from_str("PackageIdentifier: \"  \"\n").unwrap();
        assert_eq!(raw.identifier(), None);
        assert_eq!(raw.version(), None);
    }

    #[test]
    fn parse_manifest_reports_unreadable_file() {
        let err = parse_manifest(Path::new("/nonexistent/Foo.Bar.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}
