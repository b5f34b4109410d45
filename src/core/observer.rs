use crate::components::world::{CellPos, TileId};
use crate::simulation::barrier::MoveTicket;

/// Move instruction as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentView {
    pub ticket: MoveTicket,
    pub tile_id: TileId,
    pub from: CellPos,
    pub to: CellPos,
    pub merged_into: Option<TileId>,
}

/// Hooks the view layer implements to follow a game.
///
/// Every ticket passed to `on_intents` must come back exactly once through
/// `Game::notify_move_complete`, otherwise the round never finalizes.
pub trait GameObserver {
    fn on_intents(&mut self, _intents: &[IntentView]) {}
    fn on_tile_spawned(&mut self, _tile: TileId, _pos: CellPos, _value: u32) {}
    fn on_score_changed(&mut self, _score: u32, _best_score: u32) {}
    fn on_win(&mut self, _score: u32, _best_score: u32) {}
    fn on_game_over(&mut self, _score: u32, _best_score: u32) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl GameObserver for NullObserver {}
