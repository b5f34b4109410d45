use bevy_ecs::prelude::*;

use crate::components::world::{CellPos, TileId};

/// Largest value a tile can reach. Tiles at the ceiling no longer merge.
pub const MAX_TILE_VALUE: u32 = 1 << 30;

/// Face value of a tile. Always a power of two between 2 and `MAX_TILE_VALUE`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileValue(pub u32);

impl TileValue {
    /// Double the value after absorbing an equal tile.
    pub fn promote(&mut self) {
        self.0 = self.0.saturating_mul(2).min(MAX_TILE_VALUE);
    }
}

/// Cell the tile is resting in, as far as the presentation layer knows.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentCell(pub CellPos);

/// Cell the tile is travelling to. Equals `CurrentCell` when the tile is not moving.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCell(pub CellPos);

/// Tile that was absorbed by a merge and only lives until its move is acknowledged.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumed {
    pub into: TileId,
}

#[derive(Bundle, Debug, Clone)]
pub struct TileBundle {
    pub id: TileId,
    pub value: TileValue,
    pub current: CurrentCell,
    pub target: TargetCell,
}

impl TileBundle {
    pub fn new(id: TileId, value: u32, pos: CellPos) -> Self {
        Self {
            id,
            value: TileValue(value),
            current: CurrentCell(pos),
            target: TargetCell(pos),
        }
    }
}

/// True for values a tile may legally carry.
pub fn is_tile_value(value: u32) -> bool {
    (2..=MAX_TILE_VALUE).contains(&value) && value.is_power_of_two()
}

/// True if two tiles of `value` may still merge.
pub fn can_merge(value: u32) -> bool {
    value < MAX_TILE_VALUE
}
