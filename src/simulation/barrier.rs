use bevy_ecs::prelude::*;
use bevy_utils::HashMap;
use serde::{Deserialize, Serialize};

use crate::components::world::TileId;
use crate::core::error::GameError;

/// Acknowledgment token issued for one move intent.
///
/// The presentation layer hands it back exactly once, when the tile has finished
/// travelling to its target cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveTicket {
    pub round: u64,
    pub tile: TileId,
}

/// Join point between the synchronous grid update and the asynchronous visuals.
#[derive(Resource, Debug, Default)]
pub struct CompletionBarrier {
    round: u64,
    pending: HashMap<TileId, MoveTicket>,
}

impl CompletionBarrier {
    /// Start a new round and issue one ticket per moving tile.
    pub fn issue<I>(&mut self, tiles: I) -> Vec<MoveTicket>
    where
        I: IntoIterator<Item = TileId>,
    {
        self.round += 1;
        let round = self.round;
        tiles
            .into_iter()
            .map(|tile| {
                let ticket = MoveTicket { round, tile };
                self.pending.insert(tile, ticket);
                ticket
            })
            .collect()
    }

    /// Consume a ticket. Stale or repeated tickets are rejected.
    pub fn acknowledge(&mut self, ticket: MoveTicket) -> Result<(), GameError> {
        match self.pending.get(&ticket.tile) {
            Some(issued) if *issued == ticket => {
                self.pending.remove(&ticket.tile);
                Ok(())
            }
            _ => Err(GameError::UnknownMoveTicket { tile: ticket.tile }),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_released(&self) -> bool {
        self.pending.is_empty()
    }

    /// Outstanding tickets, ordered by tile id.
    pub fn outstanding(&self) -> Vec<MoveTicket> {
        let mut tickets: Vec<MoveTicket> = self.pending.values().copied().collect();
        tickets.sort_by_key(|ticket| ticket.tile);
        tickets
    }

    /// Forget every outstanding ticket, e.g. when the board is rebuilt.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
