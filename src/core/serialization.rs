use std::collections::HashSet;
use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::tile::{is_tile_value, TileBundle, TileValue};
use crate::components::world::{CellPos, TileId};
use crate::core::error::GameError;
use crate::core::world::{IdAllocator, TileView};
use crate::simulation::grid::Grid;
use crate::simulation::state::{EndingScreen, GameState};

/// Everything needed to rebuild a game: score, end flags and the settled tiles.
/// Empty cells are implicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Savegame {
    #[serde(default = "default_save_version")]
    pub version: u32,
    pub score: u32,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub ending_screen: EndingScreen,
    pub tiles: Vec<SavedTile>,
}

fn default_save_version() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTile {
    pub x: usize,
    pub y: usize,
    pub value: u32,
}

impl Savegame {
    pub fn new(score: u32, tiles: Vec<SavedTile>) -> Self {
        Self {
            version: default_save_version(),
            score,
            won: false,
            ending_screen: EndingScreen::None,
            tiles,
        }
    }

    /// Check the savegame fits a board of `size` before touching any state.
    pub fn validate(&self, size: usize) -> Result<(), GameError> {
        if self.version != default_save_version() {
            return Err(GameError::InvalidSnapshot(format!(
                "unsupported save version {}",
                self.version
            )));
        }
        let mut seen = HashSet::new();
        for tile in &self.tiles {
            if tile.x >= size || tile.y >= size {
                return Err(GameError::InvalidSnapshot(format!(
                    "tile at ({}, {}) is outside a {}x{} board",
                    tile.x, tile.y, size, size
                )));
            }
            if !is_tile_value(tile.value) {
                return Err(GameError::InvalidSnapshot(format!(
                    "tile at ({}, {}) has invalid value {}",
                    tile.x, tile.y, tile.value
                )));
            }
            if !seen.insert((tile.x, tile.y)) {
                return Err(GameError::InvalidSnapshot(format!(
                    "two tiles share cell ({}, {})",
                    tile.x, tile.y
                )));
            }
        }
        if self.ending_screen == EndingScreen::Win && !self.won {
            return Err(GameError::InvalidSnapshot(
                "win screen recorded for a game that was not won".to_string(),
            ));
        }
        Ok(())
    }
}

/// Extract a serializable snapshot of the settled board.
pub fn extract_state_from_world(world: &World) -> Savegame {
    let state = world.resource::<GameState>();
    let grid = world.resource::<Grid>();

    let tiles = grid
        .occupied()
        .filter_map(|(pos, tile)| {
            world.get::<TileValue>(tile).map(|value| SavedTile {
                x: pos.x,
                y: pos.y,
                value: value.0,
            })
        })
        .collect();

    Savegame {
        version: default_save_version(),
        score: state.score,
        won: state.won,
        ending_screen: state.ending_screen,
        tiles,
    }
}

/// Recreate the saved tiles on an empty board. Ids are freshly allocated.
///
/// The caller clears the board first; score and flags are left to the caller too.
pub fn apply_state_to_world(state: &Savegame, world: &mut World) -> Result<Vec<TileView>, GameError> {
    let size = world.resource::<Grid>().size();
    state.validate(size)?;

    let mut spawned = Vec::with_capacity(state.tiles.len());
    for saved in &state.tiles {
        let pos = CellPos::new(saved.x, saved.y);
        let id = TileId(world.resource_mut::<IdAllocator>().alloc());
        let entity = world.spawn(TileBundle::new(id, saved.value, pos)).id();
        world.resource_mut::<Grid>().place(pos, entity);
        spawned.push(TileView {
            id,
            pos,
            value: saved.value,
        });
    }
    Ok(spawned)
}

/// Serialize a savegame into JSON for persistence.
pub fn save_state_to_json(state: &Savegame) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

/// Deserialize JSON back into a savegame.
pub fn load_state_from_json(data: &str) -> serde_json::Result<Savegame> {
    serde_json::from_str(data)
}

/// Write a savegame to a file path.
pub fn save_state_to_path<P: AsRef<Path>>(state: &Savegame, path: P) -> std::io::Result<()> {
    let json = save_state_to_json(state).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

/// Read a savegame from a file path.
pub fn load_state_from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Savegame> {
    let data = fs::read_to_string(&path)?;
    load_state_from_json(&data).map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Savegame {
        Savegame {
            version: 1,
            score: 88,
            won: true,
            ending_screen: EndingScreen::Win,
            tiles: vec![
                SavedTile { x: 0, y: 0, value: 2048 },
                SavedTile { x: 3, y: 2, value: 8 },
            ],
        }
    }

    #[test]
    fn json_uses_snake_case_ending_screen() {
        let json = save_state_to_json(&sample()).unwrap();
        assert!(json.contains("\"ending_screen\": \"win\""));
        assert_eq!(load_state_from_json(&json).unwrap(), sample());
    }

    #[test]
    fn older_json_without_flags_still_loads() {
        let state = load_state_from_json(r#"{ "score": 4, "tiles": [{ "x": 1, "y": 1, "value": 4 }] }"#)
            .unwrap();
        assert_eq!(state.version, 1);
        assert!(!state.won);
        assert_eq!(state.ending_screen, EndingScreen::None);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("savegame.json");
        save_state_to_path(&sample(), &path).unwrap();
        assert_eq!(load_state_from_path(&path).unwrap(), sample());
    }

    #[test]
    fn garbage_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("savegame.json");
        fs::write(&path, "not json").unwrap();
        assert!(load_state_from_path(&path).is_err());
    }

    #[test]
    fn validate_rejects_bad_tiles() {
        let mut state = sample();
        state.tiles.push(SavedTile { x: 4, y: 0, value: 2 });
        assert!(state.validate(4).is_err());

        let mut state = sample();
        state.tiles.push(SavedTile { x: 0, y: 0, value: 2 });
        assert!(state.validate(4).is_err());

        let mut state = sample();
        state.tiles.push(SavedTile { x: 1, y: 0, value: 3 });
        assert!(state.validate(4).is_err());

        let mut state = sample();
        state.won = false;
        assert!(state.validate(4).is_err());

        assert!(sample().validate(4).is_ok());
    }
}
