//! Run configuration.
//!
//! A [`SimConfig`] serializes to JSON. Every field has a default, so a config
//! file only needs the values it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::ProjectionMode;
use crate::error::SimulationError;
use crate::mesh::GroupTags;
use crate::state::{Parameters, Seeding};
use crate::topology::Extent;

/// Lattice generator settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Nodes per side, including the periodic image row and column.
    pub resolution: usize,
    pub extent: Extent,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            extent: Extent::default(),
        }
    }
}

/// Initial view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Rotation about the screen x axis [deg].
    pub orbit_x: f32,
    /// Rotation about the screen y axis [deg].
    pub orbit_y: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    /// Negative values move the lattice away from the viewer.
    pub pan_z: f32,
    /// Horizontal distance between the two eyes in binocular mode.
    pub eye_separation: f32,
    /// Half-width of a node's square in clip units.
    pub point_size: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            orbit_x: 0.0,
            orbit_y: 0.0,
            pan_x: 0.0,
            pan_y: 0.0,
            pan_z: -2.0,
            eye_separation: 0.06,
            point_size: 0.01,
        }
    }
}

/// Complete run configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub mesh: MeshConfig,
    pub tags: GroupTags,
    pub parameters: Parameters,
    pub seeding: Seeding,
    pub camera: CameraSettings,
    pub projection: ProjectionMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            title: "Spin bubbles".to_owned(),
            width: 800,
            height: 600,
            mesh: MeshConfig::default(),
            tags: GroupTags::default(),
            parameters: Parameters::default(),
            seeding: Seeding::default(),
            camera: CameraSettings::default(),
            projection: ProjectionMode::default(),
        }
    }
}

impl SimConfig {
    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimulationError> {
        let json = serde_json::to_string_pretty(self).map_err(config_error)?;
        fs::write(path, json).map_err(config_error)?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let json = fs::read_to_string(path).map_err(config_error)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(config_error)
    }
}

fn config_error(e: impl std::fmt::Display) -> SimulationError {
    SimulationError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = SimConfig::from_json("{}").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.parameters.max_rejections, 100);
        assert_eq!(config.camera.pan_z, -2.0);
        assert_eq!(config.tags.surface, 1);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "mesh": { "resolution": 16 },
            "parameters": { "temperature": 0.05 },
            "seeding": { "Fixed": 7 },
            "projection": "Binocular"
        }"#;
        let config = SimConfig::from_json(json).unwrap();
        assert_eq!(config.mesh.resolution, 16);
        assert_eq!(config.mesh.extent, Extent::default());
        assert_eq!(config.parameters.temperature, 0.05);
        assert_eq!(config.parameters.longitudinal_field, 0.8);
        assert_eq!(config.seeding, Seeding::Fixed(7));
        assert_eq!(config.projection, ProjectionMode::Binocular);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = SimConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join("spinbubble_config_test.json");
        let mut config = SimConfig::default();
        config.title = "saved".to_owned();
        config.seeding = Seeding::Fixed(3);
        config.save(&path).unwrap();

        let loaded = SimConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
