// config.rs - Scene configuration, loadable from JSON
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_PATH: &str = "assets/models/avatar.vrm";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub look_at: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 1.0, 5.0],
            look_at: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub screen_space_panning: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    /// Unbounded when absent
    pub max_distance: Option<f32>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            screen_space_panning: true,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// 0xRRGGBB
    pub color: u32,
    pub intensity: f32,
    /// Normalized on use
    pub position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: PI,
            position: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: f32,
    pub divisions: u32,
    pub center_color: u32,
    pub line_color: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 10.0,
            divisions: 10,
            center_color: 0x444444,
            line_color: 0x888888,
        }
    }
}

/// Everything the scene host needs to know besides the display target and size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub model_path: PathBuf,
    /// 0xRRGGBB
    pub background: u32,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub light: LightConfig,
    pub grid: GridConfig,
    pub axes_size: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            background: 0x00ffff,
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            light: LightConfig::default(),
            grid: GridConfig::default(),
            axes_size: 5.0,
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded scene config from {:?}", path);
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_scene_setup() {
        let config = SceneConfig::default();
        assert_eq!(config.camera.fov_degrees, 75.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.camera.position, [0.0, 1.0, 5.0]);
        assert!(config.controls.screen_space_panning);
        assert_eq!(config.light.intensity, PI);
        assert_eq!(config.background, 0x00ffff);
        assert_eq!(config.grid.size, 10.0);
        assert_eq!(config.grid.divisions, 10);
        assert_eq!(config.axes_size, 5.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SceneConfig::from_json_str(
            r#"{ "model_path": "models/other.vrm", "camera": { "fov_degrees": 60.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/other.vrm"));
        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn test_controls_target_is_not_configurable() {
        let config = SceneConfig::from_json_str(r#"{ "controls": { "target": [3.0, 0.0, 0.0], "pan_speed": 2.0 } }"#)
            .unwrap();
        assert_eq!(config.controls.pan_speed, 2.0);
        assert_eq!(config.controls, ControlsConfig { pan_speed: 2.0, ..ControlsConfig::default() });
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = SceneConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SceneConfig::from_json_file("does/not/exist.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
