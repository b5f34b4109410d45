// Re-export core modules for use by the binary or other consumers
pub mod components;
pub mod core;
pub mod data;
pub mod simulation;
pub mod store;

// Expose the main Game wrapper and types needed for interaction
pub use crate::components::world::{CellPos, TileId};
pub use crate::core::error::GameError;
pub use crate::core::observer::{GameObserver, IntentView, NullObserver};
pub use crate::core::serialization::{SavedTile, Savegame};
pub use crate::core::world::{BoardView, Game, RoundOutcome, ShiftReport, TileView};
pub use crate::data::config::{load_game_config, ConfigError, GameConfig};
pub use crate::simulation::barrier::MoveTicket;
pub use crate::simulation::direction::Direction;
pub use crate::simulation::state::{EndingScreen, GameState, RoundPhase};
