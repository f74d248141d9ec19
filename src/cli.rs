// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigError, SceneConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "avatar-viewer")]
#[command(about = "Orbit viewer for a single glTF / VRM avatar", long_about = None)]
pub struct Cli {
    /// Model to load, overrides the config file
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Scene config (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Initial surface width in logical pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Initial surface height in logical pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,
}

impl Cli {
    /// Config file (or defaults) with `--model` applied on top
    pub fn scene_config(&self) -> Result<SceneConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SceneConfig::from_json_file(path)?,
            None => SceneConfig::default(),
        };
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        Ok(config)
    }

    /// Startup hint when the model to load does not exist
    pub fn missing_model_hint(config: &SceneConfig) -> Option<String> {
        if config.model_path.exists() {
            return None;
        }
        Some(format!(
            "Model {:?} not found; pass --model <PATH> to load a .vrm / .glb / .gltf file",
            config.model_path
        ))
    }
}
