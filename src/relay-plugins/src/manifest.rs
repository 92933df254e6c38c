//! Plugin manifest parsing.
//!
//! A plugin announces itself through one of three files, checked in priority
//! order per candidate root:
//!
//! 1. `relay-plugin.json` — the primary manifest
//! 2. `plugin.json` — compat manifest from earlier releases
//! 3. `package.json` — a generic package descriptor, accepted only when it
//!    carries a recognized plugin hint (a `rendererEntry` field, an
//!    `extensions` array, or a `relay-plugin` keyword)

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};

/// Primary manifest filename.
pub const MANIFEST_FILE: &str = "relay-plugin.json";

/// Compat manifest filename.
pub const COMPAT_MANIFEST_FILE: &str = "plugin.json";

/// Generic package descriptor filename.
pub const PACKAGE_FILE: &str = "package.json";

/// Keyword that marks a generic package descriptor as a plugin.
pub const PLUGIN_KEYWORD: &str = "relay-plugin";

/// Which file a manifest was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSource {
    /// `relay-plugin.json`
    Primary,
    /// `plugin.json`
    Compat,
    /// `package.json` with plugin hints
    Package,
}

impl ManifestSource {
    /// The filename this source reads from.
    pub fn filename(&self) -> &'static str {
        match self {
            ManifestSource::Primary => MANIFEST_FILE,
            ManifestSource::Compat => COMPAT_MANIFEST_FILE,
            ManifestSource::Package => PACKAGE_FILE,
        }
    }
}

/// Parsed plugin manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin ID. Falls back to the plugin root directory name when absent.
    #[serde(default)]
    pub id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Version string.
    #[serde(default)]
    pub version: Option<String>,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Renderer entry point, relative to the plugin root unless absolute.
    /// `entry` and `main` are accepted as aliases.
    #[serde(
        default,
        rename = "rendererEntry",
        alias = "entry",
        alias = "main",
        skip_serializing_if = "Option::is_none"
    )]
    pub renderer_entry: Option<String>,
}

impl PluginManifest {
    /// Parse a manifest from JSON text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a generic package descriptor. Returns `Ok(None)` when the
    /// descriptor carries no plugin hints and should be ignored.
    pub fn parse_package_descriptor(content: &str) -> Result<Option<Self>> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if !has_plugin_hints(&value) {
            return Ok(None);
        }
        let manifest = Self {
            id: value
                .get("id")
                .or_else(|| value.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            name: value.get("name").and_then(|v| v.as_str()).map(str::to_string),
            version: value
                .get("version")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            description: value
                .get("description")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            renderer_entry: value
                .get("rendererEntry")
                .or_else(|| value.get("entry"))
                .or_else(|| value.get("main"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };
        Ok(Some(manifest))
    }

    /// Validate the manifest. Only structural problems are rejected; missing
    /// identity fields get filled from the plugin root during discovery.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(PluginError::invalid_manifest(
                    self.name.as_deref().unwrap_or("<unnamed>"),
                    "id must not be blank",
                ));
            }
        }
        if let Some(entry) = &self.renderer_entry {
            if entry.trim().is_empty() {
                return Err(PluginError::invalid_manifest(
                    self.id.as_deref().unwrap_or("<unnamed>"),
                    "rendererEntry must not be blank",
                ));
            }
        }
        Ok(())
    }
}

/// Whether a generic package descriptor should be treated as a plugin.
fn has_plugin_hints(value: &serde_json::Value) -> bool {
    if value.get("rendererEntry").and_then(|v| v.as_str()).is_some() {
        return true;
    }
    if value.get("extensions").and_then(|v| v.as_array()).is_some() {
        return true;
    }
    value
        .get("keywords")
        .and_then(|v| v.as_array())
        .is_some_and(|keywords| {
            keywords
                .iter()
                .any(|k| k.as_str() == Some(PLUGIN_KEYWORD))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primary_manifest() {
        let manifest = PluginManifest::parse(
            r#"{"id":"hello","name":"Hello","version":"1.0.0","rendererEntry":"dist/index.js"}"#,
        )
        .unwrap();
        assert_eq!(manifest.id.as_deref(), Some("hello"));
        assert_eq!(manifest.renderer_entry.as_deref(), Some("dist/index.js"));
        manifest.validate().unwrap();
    }

    #[test]
    fn test_entry_aliases() {
        let a = PluginManifest::parse(r#"{"entry":"a.js"}"#).unwrap();
        assert_eq!(a.renderer_entry.as_deref(), Some("a.js"));
        let b = PluginManifest::parse(r#"{"main":"b.js"}"#).unwrap();
        assert_eq!(b.renderer_entry.as_deref(), Some("b.js"));
    }

    #[test]
    fn test_package_descriptor_without_hints_is_ignored() {
        let result =
            PluginManifest::parse_package_descriptor(r#"{"name":"some-lib","version":"2.0.0"}"#)
                .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_package_descriptor_keyword_hint() {
        let manifest = PluginManifest::parse_package_descriptor(
            r#"{"name":"tool","keywords":["cli","relay-plugin"],"main":"index.js"}"#,
        )
        .unwrap()
        .expect("keyword hint should be recognized");
        assert_eq!(manifest.id.as_deref(), Some("tool"));
        assert_eq!(manifest.renderer_entry.as_deref(), Some("index.js"));
    }

    #[test]
    fn test_package_descriptor_extensions_hint() {
        let manifest = PluginManifest::parse_package_descriptor(
            r#"{"name":"ext","extensions":[{"kind":"panel"}]}"#,
        )
        .unwrap();
        assert!(manifest.is_some());
    }

    #[test]
    fn test_blank_entry_rejected() {
        let manifest = PluginManifest::parse(r#"{"id":"x","rendererEntry":"  "}"#).unwrap();
        assert!(manifest.validate().is_err());
    }
}
