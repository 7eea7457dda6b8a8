use std::path::{Path, PathBuf};

use loopmod_core::input::SharedInputBindings;
use loopmod_core::{Engine, EngineConfig, InputBindings, KeyboardSnapshot};
use tokio::task::JoinHandle;

use crate::host;

/// Everything the REPL and the watcher task share.
pub struct AppState {
    pub engine: Engine,
    pub config: EngineConfig,
    pub bindings: SharedInputBindings,
    pub keyboard: KeyboardSnapshot,
    /// Every output line printed so far
    pub transcript: Vec<String>,
    pub watcher_task: Option<JoinHandle<()>>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        let bindings = InputBindings::shared();

        let mut builder = Engine::builder()
            .config(config.clone())
            .with_builtin_handlers();
        for (name, handler) in InputBindings::handlers(&bindings) {
            builder = builder.handler_shared(name, handler);
        }
        for (name, handler) in host::host_handlers() {
            builder = builder.handler_shared(name, handler);
        }

        Self {
            engine: builder.build(),
            config,
            bindings,
            keyboard: KeyboardSnapshot::new(),
            transcript: Vec::new(),
            watcher_task: None,
        }
    }
}

/// `<config_dir>/loopmod/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("loopmod").join("config.toml"))
}

/// Load the config file, falling back to defaults when it cannot be read.
pub fn load_config(path: Option<&Path>) -> EngineConfig {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        tracing::warn!("No config directory available, using defaults");
        return EngineConfig::default();
    };

    match confy::load_path::<EngineConfig>(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Loaded config");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mods_root = \"/srv/mods\"\nmax_drain_steps = 50\n").unwrap();

        let config = load_config(Some(&path));

        assert_eq!(config.mods_root, PathBuf::from("/srv/mods"));
        assert_eq!(config.max_drain_steps, Some(50));
        assert_eq!(config.addons_folder, "Addons");
    }

    #[test]
    fn state_registers_all_handler_tables() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(EngineConfig::with_root(dir.path()));

        let names: Vec<_> = state.engine.registry().names().collect();
        for expected in ["PrintMessage", "BindInput", "UnbindInput", "TeleportPlayer", "DrawText", "ShowImage"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }
}
