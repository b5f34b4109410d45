use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::tile::MAX_TILE_VALUE;

/// Largest board edge a config may ask for.
pub const MAX_GRID_SIZE: usize = 64;

/// Tunables for a board. Every field falls back to the classic 4×4 rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub grid_size: usize,
    pub winning_value: u32,
    pub initial_tiles: usize,
    /// A spawned tile is a 4 with probability `1 / four_chance_denominator`.
    pub four_chance_denominator: u32,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 4,
            winning_value: 2048,
            initial_tiles: 2,
            four_chance_denominator: 10,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(ConfigError::Validation(format!(
                "grid_size must be between 2 and {}, got {}",
                MAX_GRID_SIZE, self.grid_size
            )));
        }
        if !(4..=MAX_TILE_VALUE).contains(&self.winning_value)
            || !self.winning_value.is_power_of_two()
        {
            return Err(ConfigError::Validation(format!(
                "winning_value must be a power of two between 4 and {}, got {}",
                MAX_TILE_VALUE, self.winning_value
            )));
        }
        let cells = self.grid_size.checked_mul(self.grid_size).ok_or_else(|| {
            ConfigError::Validation(format!("grid_size {} is too large", self.grid_size))
        })?;
        if self.initial_tiles == 0 || self.initial_tiles > cells {
            return Err(ConfigError::Validation(format!(
                "initial_tiles must be between 1 and {}, got {}",
                cells, self.initial_tiles
            )));
        }
        if self.four_chance_denominator == 0 {
            return Err(ConfigError::Validation(
                "four_chance_denominator must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

pub fn load_game_config(path: impl AsRef<Path>) -> Result<GameConfig, ConfigError> {
    let path_ref = path.as_ref();
    let path_str = path_ref.display().to_string();
    let data = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
        path: path_str.clone(),
        source,
    })?;
    let config: GameConfig = serde_json::from_str(&data).map_err(|source| ConfigError::Json {
        path: path_str,
        source,
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{ "grid_size": 5 }"#).unwrap();
        assert_eq!(config.grid_size, 5);
        assert_eq!(config.winning_value, 2048);
        assert_eq!(config.initial_tiles, 2);
    }

    #[test]
    fn rejects_non_power_of_two_goal() {
        let config = GameConfig {
            winning_value: 1000,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_goal_above_tile_ceiling() {
        let config = GameConfig {
            winning_value: MAX_TILE_VALUE * 2,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_oversized_grid() {
        for grid_size in [MAX_GRID_SIZE + 1, usize::MAX] {
            let config = GameConfig {
                grid_size,
                ..GameConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        }
        let largest = GameConfig {
            grid_size: MAX_GRID_SIZE,
            ..GameConfig::default()
        };
        largest.validate().unwrap();
    }

    #[test]
    fn oversized_grid_in_file_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, format!(r#"{{ "grid_size": {} }}"#, usize::MAX)).unwrap();
        let err = load_game_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_too_many_initial_tiles() {
        let config = GameConfig {
            grid_size: 2,
            initial_tiles: 5,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, r#"{ "winning_value": 128, "seed": 5 }"#).unwrap();
        let config = load_game_config(&path).unwrap();
        assert_eq!(config.winning_value, 128);
        assert_eq!(config.seed, Some(5));
    }

    #[test]
    fn reports_missing_file() {
        let err = load_game_config("./does/not/exist.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
