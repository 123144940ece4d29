//! Writes manifests for new extensions.

use buni_core::extension::manifest::{PLUGIN_MANIFEST_FILE, THEME_MANIFEST_FILE};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ScaffoldError {
    InvalidName(String),
    AlreadyExists(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ScaffoldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid extension name `{name}`"),
            Self::AlreadyExists(path) => write!(f, "`{}` already exists", path.display()),
            Self::Io { path, source } => write!(f, "failed to write `{}`: {source}", path.display()),
        }
    }
}

impl Error for ScaffoldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidName(_) | Self::AlreadyExists(_) => None,
        }
    }
}

/// Creates `<root>/<id>/plugin.json` declaring `id` as its namespace.
pub fn new_plugin(
    root: &Path,
    id: &str,
    version: &str,
    description: &str,
) -> Result<PathBuf, ScaffoldError> {
    let id = checked_name(id)?;
    let mut autoload = Map::new();
    autoload.insert(format!("{id}\\"), json!("src/"));
    let manifest = json!({
        "autoload": autoload,
        "version": version,
        "description": description,
    });
    write_manifest(&root.join(id), PLUGIN_MANIFEST_FILE, &manifest)
}

/// Creates `<root>/<name>/theme.json`.
pub fn new_theme(
    root: &Path,
    name: &str,
    version: &str,
    description: &str,
    author: &str,
) -> Result<PathBuf, ScaffoldError> {
    let name = checked_name(name)?;
    let manifest = json!({
        "name": name,
        "version": version,
        "description": description,
        "author": author,
        "author_url": "",
        "type": "client",
    });
    write_manifest(&root.join(name), THEME_MANIFEST_FILE, &manifest)
}

fn checked_name(name: &str) -> Result<&str, ScaffoldError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', ':']);
    if invalid {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

fn write_manifest(dir: &Path, file_name: &str, manifest: &Value) -> Result<PathBuf, ScaffoldError> {
    let path = dir.join(file_name);
    if dir.exists() {
        return Err(ScaffoldError::AlreadyExists(dir.to_path_buf()));
    }
    std::fs::create_dir_all(dir).map_err(|source| ScaffoldError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut bytes = serde_json::to_vec_pretty(manifest).map_err(|err| ScaffoldError::Io {
        path: path.clone(),
        source: err.into(),
    })?;
    bytes.push(b'\n');
    std::fs::write(&path, bytes).map_err(|source| ScaffoldError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{new_plugin, new_theme, ScaffoldError};
    use buni_core::extension::manifest::{ExtensionKind, ExtensionManifest};
    use std::fs;

    #[test]
    fn plugin_manifest_parses_back_to_same_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = new_plugin(dir.path(), "Acme", "0.1.0", "demo").expect("scaffold");

        let bytes = fs::read(&path).expect("read manifest");
        let manifest =
            ExtensionManifest::parse(ExtensionKind::Plugin, "Acme", &bytes).expect("parse");
        assert_eq!(manifest.id, "Acme");
        assert_eq!(manifest.version, "0.1.0");
    }

    #[test]
    fn theme_manifest_defaults_to_client() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = new_theme(dir.path(), "aurora", "1.0.0", "", "Ada").expect("scaffold");

        let bytes = fs::read(&path).expect("read manifest");
        let manifest =
            ExtensionManifest::parse(ExtensionKind::Theme, "aurora", &bytes).expect("parse");
        assert_eq!(manifest.id, "aurora");
        let info = manifest.theme.expect("theme info");
        assert_eq!(info.theme_type, "client");
        assert_eq!(info.author, "Ada");
    }

    #[test]
    fn existing_directory_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        new_plugin(dir.path(), "Acme", "0.1.0", "").expect("first scaffold");
        let err = new_plugin(dir.path(), "Acme", "0.2.0", "").expect_err("second must fail");
        assert!(matches!(err, ScaffoldError::AlreadyExists(_)));
    }

    #[test]
    fn path_like_names_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["", "..", "a/b", "Acme\\"] {
            assert!(matches!(
                new_theme(dir.path(), name, "1.0.0", "", ""),
                Err(ScaffoldError::InvalidName(_))
            ));
        }
    }
}
