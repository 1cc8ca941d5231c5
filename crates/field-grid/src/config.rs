//! Configuration for the grid layer.

use serde::{Deserialize, Serialize};

use crate::sample::BARNES_SHAPE;

/// Configuration for a [`Catalog`](crate::catalog::Catalog).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Slot count of the shared definition cache.
    pub definition_cache_capacity: usize,

    /// Default neighbour count for scattered-point linear sampling.
    pub sample_neighbors: usize,

    /// Shape constant of the Barnes weighting kernel.
    pub barnes_shape: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            definition_cache_capacity: 64,
            sample_neighbors: 4,
            barnes_shape: BARNES_SHAPE,
        }
    }
}

impl GridConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FIELD_DEFINITION_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.definition_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("FIELD_SAMPLE_NEIGHBORS") {
            if let Ok(neighbors) = val.parse() {
                config.sample_neighbors = neighbors;
            }
        }

        if let Ok(val) = std::env::var("FIELD_BARNES_SHAPE") {
            if let Ok(shape) = val.parse() {
                config.barnes_shape = shape;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.definition_cache_capacity == 0 {
            return Err("definition_cache_capacity must be > 0".to_string());
        }

        if self.sample_neighbors == 0 {
            return Err("sample_neighbors must be > 0".to_string());
        }

        if self.barnes_shape <= 0.0 {
            return Err("barnes_shape must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GridConfig::default();
        assert_eq!(config.definition_cache_capacity, 64);
        assert_eq!(config.sample_neighbors, 4);
        assert_eq!(config.barnes_shape, BARNES_SHAPE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = GridConfig::default();
        config.definition_cache_capacity = 0;
        assert!(config.validate().is_err());

        config = GridConfig::default();
        config.sample_neighbors = 0;
        assert!(config.validate().is_err());

        config = GridConfig::default();
        config.barnes_shape = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = GridConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: GridConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.definition_cache_capacity, config.definition_cache_capacity);
        assert_eq!(back.barnes_shape, config.barnes_shape);
    }
}
