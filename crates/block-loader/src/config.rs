//! Configuration for the block loader.

use raster_io::ResamplingMethod;
use serde::{Deserialize, Serialize};

/// Helper for serde to skip NaN values.
fn is_nan_f32(v: &f32) -> bool {
    v.is_nan()
}

/// Default fill value (NaN).
fn default_fill_value() -> f32 {
    f32::NAN
}

/// Configuration for a block loading session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Resampling method used to map sources onto the reference grid.
    #[serde(default)]
    pub resampling: ResamplingMethod,

    /// Value written to pixels without valid data (stored as absent when NaN).
    #[serde(default = "default_fill_value", skip_serializing_if = "is_nan_f32")]
    pub fill_value: f32,

    /// Stop iterating after the first failed block.
    #[serde(default)]
    pub strict: bool,

    /// Maximum number of source handles an iterator keeps open.
    #[serde(default = "default_max_open_handles")]
    pub max_open_handles: usize,
}

fn default_max_open_handles() -> usize {
    1
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            resampling: ResamplingMethod::Nearest,
            fill_value: default_fill_value(),
            strict: false,
            max_open_handles: default_max_open_handles(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BLOCK_LOADER_RESAMPLING") {
            config.resampling = ResamplingMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("BLOCK_LOADER_FILL_VALUE") {
            if let Ok(value) = val.trim().parse() {
                config.fill_value = value;
            }
        }

        if let Ok(val) = std::env::var("BLOCK_LOADER_STRICT") {
            config.strict = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("BLOCK_LOADER_MAX_OPEN_HANDLES") {
            if let Ok(max) = val.parse() {
                config.max_open_handles = max;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_open_handles == 0 {
            return Err("max_open_handles must be > 0".to_string());
        }

        if self.fill_value.is_infinite() {
            return Err("fill_value must be finite or NaN".to_string());
        }

        Ok(())
    }
}
