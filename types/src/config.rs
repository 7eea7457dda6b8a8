//! Engine configuration shared by the core crate and the host tools.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where definitions live and how the engine behaves at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory containing the parameter, add-on and action folders
    pub mods_root: PathBuf,
    pub parameters_folder: String,
    pub addons_folder: String,
    pub actions_folder: String,

    /// Number of diagnostics kept for `take_diagnostics` before the oldest are dropped
    pub diagnostics_capacity: usize,

    /// Upper bound on actions executed by a single queue drain (None = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_drain_steps: Option<usize>,

    /// Reload definitions when files under `mods_root` change (host tools only)
    pub watch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mods_root: PathBuf::from("Mods"),
            parameters_folder: "Parameters".to_string(),
            addons_folder: "Addons".to_string(),
            actions_folder: "Actions".to_string(),
            diagnostics_capacity: 256,
            max_drain_steps: None,
            watch: true,
        }
    }
}

impl EngineConfig {
    /// Config rooted at a specific mods directory, defaults elsewhere.
    pub fn with_root(mods_root: impl Into<PathBuf>) -> Self {
        Self {
            mods_root: mods_root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn parameters_dir(&self) -> PathBuf {
        self.mods_root.join(&self.parameters_folder)
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.mods_root.join(&self.addons_folder)
    }

    pub fn actions_dir(&self) -> PathBuf {
        self.mods_root.join(&self.actions_folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
mods_root = "/srv/game/Mods"
actions_folder = "Triggers"
max_drain_steps = 500
"#,
        )
        .unwrap();

        assert_eq!(config.actions_dir(), PathBuf::from("/srv/game/Mods/Triggers"));
        assert_eq!(config.addons_dir(), PathBuf::from("/srv/game/Mods/Addons"));
        assert_eq!(config.max_drain_steps, Some(500));
        assert_eq!(config.diagnostics_capacity, 256);
    }
}
