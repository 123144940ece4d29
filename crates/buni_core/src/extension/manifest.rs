//! Extension manifest declaration and parsing.
//!
//! # Responsibility
//! - Parse `plugin.json` / `theme.json` bytes into one validated manifest.
//! - Derive the extension id and entry reference without side effects.
//!
//! # Invariants
//! - A manifest without a usable id is rejected, never defaulted.
//! - `entry_ref` is a pure function of kind and id.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Manifest file name looked up in each plugin candidate.
pub const PLUGIN_MANIFEST_FILE: &str = "plugin.json";
/// Manifest file name looked up in each theme candidate.
pub const THEME_MANIFEST_FILE: &str = "theme.json";
/// Theme `type` used when the manifest does not declare one.
pub const DEFAULT_THEME_TYPE: &str = "client";

const NAMESPACE_SEPARATORS: &[char] = &['\\', ':', '.', '/'];
/// Autoload standards whose value is itself a namespace mapping.
const AUTOLOAD_STANDARDS: &[&str] = &["psr-4", "psr-0"];

/// The two supported extension kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Plugin,
    Theme,
}

impl ExtensionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Theme => "theme",
        }
    }

    /// Manifest file expected inside a candidate directory.
    pub fn manifest_file(self) -> &'static str {
        match self {
            Self::Plugin => PLUGIN_MANIFEST_FILE,
            Self::Theme => THEME_MANIFEST_FILE,
        }
    }

    /// Fixed suffix appended to the id to build the entry reference.
    pub fn entry_suffix(self) -> &'static str {
        match self {
            Self::Plugin => "Plugin",
            Self::Theme => "Theme",
        }
    }
}

impl Display for ExtensionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation metadata only themes carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeInfo {
    pub author: String,
    pub author_url: String,
    /// Theme audience, `client` unless declared otherwise.
    pub theme_type: String,
}

/// Parsed, validated description of one on-disk extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionManifest {
    /// Unique id within one discovery run.
    pub id: String,
    pub version: String,
    pub description: String,
    pub kind: ExtensionKind,
    /// Reference resolved by the factory registry, e.g. `acme.seo::Plugin`.
    pub entry_ref: String,
    /// Source entry (directory name) the manifest was read from.
    pub candidate: String,
    pub theme: Option<ThemeInfo>,
}

impl ExtensionManifest {
    /// Parses manifest bytes for `kind` read from `candidate`.
    pub fn parse(
        kind: ExtensionKind,
        candidate: &str,
        bytes: &[u8],
    ) -> Result<Self, ManifestError> {
        match kind {
            ExtensionKind::Plugin => parse_plugin_manifest(candidate, bytes),
            ExtensionKind::Theme => parse_theme_manifest(candidate, bytes),
        }
    }
}

/// Builds the entry reference for `id`.
pub fn derive_entry_ref(kind: ExtensionKind, id: &str) -> String {
    format!("{id}::{}", kind.entry_suffix())
}

#[derive(Debug, Deserialize)]
struct RawPluginManifest {
    #[serde(default)]
    autoload: Option<Map<String, Value>>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawThemeManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    author_url: Option<String>,
    #[serde(default, rename = "type")]
    theme_type: Option<String>,
}

fn parse_plugin_manifest(candidate: &str, bytes: &[u8]) -> Result<ExtensionManifest, ManifestError> {
    let raw: RawPluginManifest = serde_json::from_slice(bytes)
        .map_err(|err| ManifestError::Malformed(err.to_string()))?;

    // The first namespace mapping names the plugin.
    let namespace = raw
        .autoload
        .as_ref()
        .and_then(first_namespace)
        .ok_or(ManifestError::MissingId)?;
    let id = namespace.trim().trim_end_matches(NAMESPACE_SEPARATORS).trim();
    if id.is_empty() {
        return Err(ManifestError::EmptyId);
    }

    Ok(ExtensionManifest {
        id: id.to_string(),
        version: raw.version.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        kind: ExtensionKind::Plugin,
        entry_ref: derive_entry_ref(ExtensionKind::Plugin, id),
        candidate: candidate.to_string(),
        theme: None,
    })
}

/// First namespace key, looking inside a `psr-4`/`psr-0` section when the
/// mapping is grouped by standard.
fn first_namespace(autoload: &Map<String, Value>) -> Option<&String> {
    let standard = AUTOLOAD_STANDARDS
        .iter()
        .find_map(|standard| autoload.get(*standard).and_then(Value::as_object));
    match standard {
        Some(mapping) => mapping.keys().next(),
        None => autoload.keys().next(),
    }
}

fn parse_theme_manifest(candidate: &str, bytes: &[u8]) -> Result<ExtensionManifest, ManifestError> {
    let raw: RawThemeManifest = serde_json::from_slice(bytes)
        .map_err(|err| ManifestError::Malformed(err.to_string()))?;

    let id = match raw.name.as_deref() {
        Some(name) => name.trim().to_string(),
        None => candidate.trim().to_string(),
    };
    if id.is_empty() {
        return Err(ManifestError::EmptyId);
    }

    let theme_type = raw
        .theme_type
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_THEME_TYPE.to_string());

    Ok(ExtensionManifest {
        entry_ref: derive_entry_ref(ExtensionKind::Theme, &id),
        id,
        version: raw.version.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        kind: ExtensionKind::Theme,
        candidate: candidate.to_string(),
        theme: Some(ThemeInfo {
            author: raw.author.unwrap_or_default(),
            author_url: raw.author_url.unwrap_or_default(),
            theme_type,
        }),
    })
}

/// Manifest rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The kind-specific manifest file is absent.
    Missing(&'static str),
    /// The manifest file exists but could not be read.
    Unreadable(String),
    /// The manifest is not valid structured data for its kind.
    Malformed(String),
    /// No identity could be derived.
    MissingId,
    /// The declared identity is blank.
    EmptyId,
    /// Another candidate in the same run already claimed this id.
    DuplicateId(String),
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(file) => write!(f, "manifest file `{file}` not found"),
            Self::Unreadable(err) => write!(f, "manifest could not be read: {err}"),
            Self::Malformed(err) => write!(f, "manifest is malformed: {err}"),
            Self::MissingId => write!(f, "manifest does not declare an identity"),
            Self::EmptyId => write!(f, "manifest identity must not be empty"),
            Self::DuplicateId(id) => write!(f, "extension id already discovered: {id}"),
        }
    }
}

impl Error for ManifestError {}

#[cfg(test)]
mod tests {
    use super::{
        derive_entry_ref, ExtensionKind, ExtensionManifest, ManifestError, DEFAULT_THEME_TYPE,
    };

    #[test]
    fn plugin_id_comes_from_first_namespace_mapping() {
        let bytes = br#"{
            "description": "SEO tools",
            "version": "1.2.0",
            "autoload": { "Acme\\Seo\\": "src/", "Acme\\Seo\\Tests\\": "tests/" }
        }"#;
        let manifest =
            ExtensionManifest::parse(ExtensionKind::Plugin, "seo", bytes).expect("valid manifest");

        assert_eq!(manifest.id, "Acme\\Seo");
        assert_eq!(manifest.entry_ref, "Acme\\Seo::Plugin");
        assert_eq!(manifest.version, "1.2.0");
        assert_eq!(manifest.description, "SEO tools");
        assert_eq!(manifest.candidate, "seo");
        assert!(manifest.theme.is_none());
    }

    #[test]
    fn psr4_section_is_searched_for_the_namespace() {
        let bytes = br#"{"autoload": {"psr-4": {"Acme\\Seo\\": "src/"}}}"#;
        let manifest =
            ExtensionManifest::parse(ExtensionKind::Plugin, "seo", bytes).expect("valid manifest");
        assert_eq!(manifest.id, "Acme\\Seo");
        assert_eq!(manifest.entry_ref, "Acme\\Seo::Plugin");

        let grouped = br#"{"autoload": {"classmap": ["lib/"], "psr-0": {"Legacy_": "lib/"}}}"#;
        let manifest =
            ExtensionManifest::parse(ExtensionKind::Plugin, "legacy", grouped).expect("psr-0");
        assert_eq!(manifest.id, "Legacy_");
    }

    #[test]
    fn empty_psr4_section_has_no_id() {
        let bytes = br#"{"autoload": {"psr-4": {}}}"#;
        assert!(matches!(
            ExtensionManifest::parse(ExtensionKind::Plugin, "seo", bytes),
            Err(ManifestError::MissingId)
        ));
    }

    #[test]
    fn plugin_without_namespace_mapping_is_rejected() {
        let err = ExtensionManifest::parse(ExtensionKind::Plugin, "x", br#"{"version":"1.0.0"}"#)
            .expect_err("missing autoload must fail");
        assert_eq!(err, ManifestError::MissingId);

        let err = ExtensionManifest::parse(ExtensionKind::Plugin, "x", br#"{"autoload":{}}"#)
            .expect_err("empty autoload must fail");
        assert_eq!(err, ManifestError::MissingId);
    }

    #[test]
    fn plugin_with_blank_namespace_is_rejected() {
        let err = ExtensionManifest::parse(ExtensionKind::Plugin, "x", br#"{"autoload":{"\\":"src/"}}"#)
            .expect_err("blank namespace must fail");
        assert_eq!(err, ManifestError::EmptyId);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = ExtensionManifest::parse(ExtensionKind::Theme, "x", b"{ not json")
            .expect_err("malformed must fail");
        assert!(matches!(err, ManifestError::Malformed(_)));
    }

    #[test]
    fn theme_fields_fall_back_to_defaults() {
        let manifest = ExtensionManifest::parse(ExtensionKind::Theme, "aurora", b"{}")
            .expect("empty theme manifest is valid");
        assert_eq!(manifest.id, "aurora");
        assert_eq!(manifest.entry_ref, "aurora::Theme");
        assert_eq!(manifest.version, "");
        let info = manifest.theme.expect("theme info");
        assert_eq!(info.theme_type, DEFAULT_THEME_TYPE);
        assert_eq!(info.author, "");
    }

    #[test]
    fn theme_declared_fields_are_kept() {
        let bytes = br#"{
            "name": "dsccore",
            "description": "Corporate theme",
            "version": "2.0.0",
            "author": "DSC",
            "author_url": "https://example.com",
            "type": "admin"
        }"#;
        let manifest =
            ExtensionManifest::parse(ExtensionKind::Theme, "dir", bytes).expect("valid theme");
        assert_eq!(manifest.id, "dsccore");
        let info = manifest.theme.expect("theme info");
        assert_eq!(info.theme_type, "admin");
        assert_eq!(info.author_url, "https://example.com");
    }

    #[test]
    fn theme_with_blank_name_is_rejected() {
        let err = ExtensionManifest::parse(ExtensionKind::Theme, "dir", br#"{"name":"  "}"#)
            .expect_err("blank name must fail");
        assert_eq!(err, ManifestError::EmptyId);
    }

    #[test]
    fn entry_ref_is_deterministic() {
        assert_eq!(
            derive_entry_ref(ExtensionKind::Plugin, "sample"),
            derive_entry_ref(ExtensionKind::Plugin, "sample")
        );
        assert_ne!(
            derive_entry_ref(ExtensionKind::Plugin, "sample"),
            derive_entry_ref(ExtensionKind::Theme, "sample")
        );
    }
}
