// src/config.rs

//! Tracked-component manifest
//!
//! The manifest is a YAML document listing the components layered onto the
//! installation, in application order: the base game first, then each mod on
//! top of the file state left behind by everything before it. It is loaded
//! once at the start of a run, mutated in place (`version` and `password`
//! fields only), and rewritten after a fully successful run.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One trackable unit of content: the base game or a mod layered on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Display name; not required to be unique
    pub name: String,

    /// Locator of the full-replacement patch archive
    pub patch_url: String,

    /// Locator of the full install archive, for first-time setup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_url: Option<String>,

    /// Relative path whose absence means the component was never installed
    ///
    /// Only consulted when `install_url` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_marker: Option<String>,

    /// Locator of the remote plain-text version string
    ///
    /// `None` means no version tracking is possible for this component and
    /// its patch is re-applied on every run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_url: Option<String>,

    /// Last version successfully applied; absent until the first application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Password for encrypted archives; persisted after the first prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Component {
    /// Whether remote version tracking is available for this component
    pub fn has_version_tracking(&self) -> bool {
        self.version_url.is_some()
    }

    /// Recorded version, or the empty string if never applied
    pub fn recorded_version(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }
}

/// The ordered component list loaded from `updater.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    pub components: Vec<Component>,
}

impl UpdaterConfig {
    /// Load the manifest from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: UpdaterConfig = serde_yaml_ng::from_str(&text)
            .map_err(|e| Error::ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;

        debug!(
            "loaded manifest with {} components from {}",
            config.components.len(),
            path.display()
        );
        Ok(config)
    }

    /// Write the manifest back, preserving component order
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_yaml_ng::to_string(self)
            .map_err(|e| Error::ConfigError(format!("failed to serialize manifest: {}", e)))?;

        fs::write(path, text).map_err(|e| {
            Error::ConfigError(format!("failed to write {}: {}", path.display(), e))
        })?;

        debug!("wrote manifest to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UpdaterConfig {
        UpdaterConfig {
            components: vec![
                Component {
                    name: "Base Game".into(),
                    patch_url: "https://example.com/game/patch.zip".into(),
                    install_url: Some("https://example.com/game/full.7z".into()),
                    install_marker: Some("game.exe".into()),
                    version_url: Some("https://example.com/game/version.txt".into()),
                    version: Some("1.2.3".into()),
                    password: None,
                },
                Component {
                    name: "Texture Pack".into(),
                    patch_url: "https://example.com/mods/textures.zip".into(),
                    install_url: None,
                    install_marker: None,
                    version_url: None,
                    version: None,
                    password: None,
                },
            ],
        }
    }

    #[test]
    fn round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updater.yaml");

        let config = sample();
        config.save(&path).unwrap();
        let loaded = UpdaterConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn absent_optional_fields_are_not_serialized() {
        let text = serde_yaml_ng::to_string(&sample()).unwrap();
        // The texture pack has no version tracking and no password; those
        // keys must not appear as explicit nulls.
        assert!(!text.contains("version_url: null"));
        assert!(!text.contains("password: null"));
    }

    #[test]
    fn parses_minimal_component() {
        let yaml = "components:\n  - name: Mod\n    patch_url: https://example.com/m.zip\n";
        let config: UpdaterConfig = serde_yaml_ng::from_str(yaml).unwrap();

        let mod_entry = &config.components[0];
        assert!(!mod_entry.has_version_tracking());
        assert_eq!(mod_entry.recorded_version(), "");
    }

    #[test]
    fn order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updater.yaml");

        let config = sample();
        config.save(&path).unwrap();
        let loaded = UpdaterConfig::load(&path).unwrap();

        let names: Vec<_> = loaded.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Base Game", "Texture Pack"]);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = UpdaterConfig::load(Path::new("/nonexistent/updater.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
