//! Configuration structs with defaults, validation, and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "terra.ron";

/// Top-level terrain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerraConfig {
    /// Tile grid layout and LOD resolutions.
    pub field: FieldConfig,
    /// Relief noise parameters used by the displacement kernel.
    pub noise: NoiseConfig,
    /// Compute dispatch settings.
    pub compute: ComputeConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Tile grid and level-of-detail configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    /// Tile footprint along X in world units.
    pub tile_width: f32,
    /// Tile footprint along Z in world units.
    pub tile_length: f32,
    /// Grid radius `k`; the field holds `(2k+1)^2` tiles.
    pub radius: u32,
    /// Y coordinate of every tile origin.
    pub base_elevation: f32,
    /// Quad side of the finest (default) mesh.
    pub fine_step: f32,
    /// Quad side of the medium mesh.
    pub medium_step: f32,
    /// Quad side of the coarsest mesh.
    pub coarse_step: f32,
    /// Camera distance at which the medium mesh replaces the fine one.
    pub medium_switch_distance: f32,
    /// Camera distance at which the coarse mesh replaces the medium one.
    pub coarse_switch_distance: f32,
}

/// Fractal noise parameters for terrain relief.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    /// Seed used to offset the noise domain.
    pub seed: u32,
    /// Number of simplex octaves summed per sample.
    pub octaves: u32,
    /// Frequency of the first octave (cycles per world unit).
    pub frequency: f32,
    /// Amplitude of the first octave in world units.
    pub amplitude: f32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f32,
    /// Amplitude multiplier between octaves.
    pub persistence: f32,
}

/// Compute dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComputeConfig {
    /// Workgroup width of the displacement kernel.
    pub thread_width: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            tile_width: 5000.0,
            tile_length: 5000.0,
            radius: 5,
            base_elevation: 0.0,
            fine_step: 100.0,
            medium_step: 200.0,
            coarse_step: 1000.0,
            medium_switch_distance: 15000.0,
            coarse_switch_distance: 30000.0,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 5,
            frequency: 0.0004,
            amplitude: 1200.0,
            lacunarity: 2.0,
            persistence: 0.5,
        }
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self { thread_width: 64 }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl FieldConfig {
    /// Largest accepted grid radius. Grid coordinates are `i32`, and a
    /// `(2k+1)^2` field this size already holds over four million tiles.
    pub const MAX_RADIUS: u32 = 1024;

    /// Number of tiles in the field: `(2k+1)^2`.
    pub fn tile_count(&self) -> usize {
        let side = 2 * self.radius as usize + 1;
        side * side
    }

    /// Quad sides for the fine, medium, and coarse meshes.
    pub fn steps(&self) -> [f32; 3] {
        [self.fine_step, self.medium_step, self.coarse_step]
    }
}

impl NoiseConfig {
    /// Domain offset derived from the seed.
    ///
    /// Kept below a few hundred units so the noise input stays in a range
    /// where f32 has sub-unit precision.
    pub fn seed_offset(&self) -> [f32; 2] {
        let s = self.seed.wrapping_mul(2_654_435_761);
        let x = (s & 0xffff) as f32 / 65536.0;
        let y = (s >> 16) as f32 / 65536.0;
        [x * 512.0, y * 512.0]
    }
}

// --- Validation ---

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive and finite, got {value}"),
        })
    }
}

impl TerraConfig {
    /// Check every value the generator depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = &self.field;
        if field.radius > FieldConfig::MAX_RADIUS {
            return Err(ConfigError::Invalid {
                field: "field.radius",
                reason: format!(
                    "must be at most {}, got {}",
                    FieldConfig::MAX_RADIUS,
                    field.radius
                ),
            });
        }
        positive("field.tile_width", field.tile_width)?;
        positive("field.tile_length", field.tile_length)?;
        positive("field.fine_step", field.fine_step)?;
        positive("field.medium_step", field.medium_step)?;
        positive("field.coarse_step", field.coarse_step)?;
        positive("field.medium_switch_distance", field.medium_switch_distance)?;
        positive("field.coarse_switch_distance", field.coarse_switch_distance)?;

        let extent = field.tile_width.min(field.tile_length);
        for (name, step) in [
            ("field.fine_step", field.fine_step),
            ("field.medium_step", field.medium_step),
            ("field.coarse_step", field.coarse_step),
        ] {
            if step > extent {
                return Err(ConfigError::Invalid {
                    field: name,
                    reason: format!("step {step} exceeds the tile extent {extent}"),
                });
            }
        }

        if field.coarse_switch_distance <= field.medium_switch_distance {
            return Err(ConfigError::Invalid {
                field: "field.coarse_switch_distance",
                reason: "must be greater than field.medium_switch_distance".to_string(),
            });
        }

        if self.noise.octaves == 0 || self.noise.octaves > 16 {
            return Err(ConfigError::Invalid {
                field: "noise.octaves",
                reason: format!("must be in 1..=16, got {}", self.noise.octaves),
            });
        }
        positive("noise.frequency", self.noise.frequency)?;
        positive("noise.lacunarity", self.noise.lacunarity)?;
        if !self.noise.amplitude.is_finite() || !self.noise.persistence.is_finite() {
            return Err(ConfigError::Invalid {
                field: "noise",
                reason: "amplitude and persistence must be finite".to_string(),
            });
        }

        if self.compute.thread_width == 0 {
            return Err(ConfigError::Invalid {
                field: "compute.thread_width",
                reason: "must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

// --- Load / Save / Reload ---

impl TerraConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: TerraConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = TerraConfig::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `terra.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-read the file: returns `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: TerraConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
