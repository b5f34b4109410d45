use std::path::Path;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, error, info, warn};

use crate::components::tile::{Consumed, CurrentCell, TargetCell, TileBundle, TileValue};
use crate::components::world::{CellPos, TileId};
use crate::core::ecs::create_world;
use crate::core::error::GameError;
use crate::core::observer::{GameObserver, IntentView, NullObserver};
use crate::core::serialization::{
    apply_state_to_world, extract_state_from_world, load_state_from_path, save_state_to_path, Savegame,
};
use crate::data::config::GameConfig;
use crate::simulation::barrier::{CompletionBarrier, MoveTicket};
use crate::simulation::direction::Direction;
use crate::simulation::grid::Grid;
use crate::simulation::resolver::resolve_shift;
use crate::simulation::spawn::{choose_spawn, SpawnRng};
use crate::simulation::state::{EndingScreen, GameState, RoundPhase};

/// Result of an accepted directional input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftReport {
    pub direction: Direction,
    pub intents: Vec<IntentView>,
    pub score_delta: u32,
    pub any_moved: bool,
}

/// How a round ended once every move was acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The input moved nothing; the board is untouched.
    NoMove,
    Continue { spawned: TileView },
    Won { score: u32, best_score: u32 },
    GameOver { score: u32, best_score: u32, spawned: TileView },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileView {
    pub id: TileId,
    pub pos: CellPos,
    pub value: u32,
}

/// Data snapshot returned to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub size: usize,
    /// Row-major tile values, 0 for empty cells.
    pub rows: Vec<Vec<u32>>,
    pub score: u32,
    pub best_score: u32,
    pub phase: RoundPhase,
    pub ending_screen: EndingScreen,
    pub pending_moves: usize,
}

/// Wrapper around the ECS world that drives rounds.
pub struct Game {
    world: World,
    config: GameConfig,
    observer: Box<dyn GameObserver>,
}

impl Game {
    /// Build a board from `config` and deal the opening tiles.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config
            .validate()
            .map_err(|err| GameError::InvalidConfiguration(err.to_string()))?;
        let world = create_world(&config)?;
        let mut game = Self {
            world,
            config,
            observer: Box::new(NullObserver),
        };
        game.new_game()?;
        Ok(game)
    }

    pub fn set_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.observer = observer;
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        self.world.resource::<GameState>()
    }

    pub fn unfinished_move_count(&self) -> usize {
        self.world.resource::<CompletionBarrier>().pending()
    }

    /// Clear the board, reset score and flags, and deal the opening tiles.
    pub fn new_game(&mut self) -> Result<(), GameError> {
        self.clear_board()?;
        self.world.resource_mut::<GameState>().reset_for_new_game();
        for _ in 0..self.config.initial_tiles {
            self.spawn_random_tile()?;
        }
        let (score, best) = self.scores();
        info!(best_score = best, "new game started");
        self.observer.on_score_changed(score, best);
        Ok(())
    }

    /// Shift every tile towards `direction`.
    ///
    /// Returns `None` when the input is dropped because a round is still in flight
    /// or the game is paused. The grid is updated immediately; the returned intents
    /// carry the tickets the presentation layer must acknowledge.
    pub fn apply_direction(&mut self, direction: Direction) -> Option<ShiftReport> {
        if !self.state().accepts_input() {
            debug!(?direction, phase = ?self.state().phase, "input ignored");
            return None;
        }
        self.world.resource_mut::<GameState>().phase = RoundPhase::Resolving;

        let resolution = self.world.resource_scope(|world: &mut World, mut grid: Mut<Grid>| {
            let world = &*world;
            resolve_shift(&mut grid, direction, |tile| {
                world.get::<TileValue>(tile).map(|value| value.0)
            })
        });

        if !resolution.any_moved {
            let mut state = self.world.resource_mut::<GameState>();
            state.phase = RoundPhase::Idle;
            state.ready_for_input = true;
            debug!(?direction, "shift moved nothing");
            return Some(ShiftReport {
                direction,
                intents: Vec::new(),
                score_delta: 0,
                any_moved: false,
            });
        }

        let mut moving = Vec::with_capacity(resolution.intents.len());
        for intent in &resolution.intents {
            let Some(tile_id) = self.world.get::<TileId>(intent.tile).copied() else {
                continue;
            };
            if let Some(mut target) = self.world.get_mut::<TargetCell>(intent.tile) {
                target.0 = intent.to;
            }
            let survivor_id = match intent.merged_into {
                Some(survivor) => {
                    if let Some(mut value) = self.world.get_mut::<TileValue>(survivor) {
                        value.promote();
                    }
                    let survivor_id = self.world.get::<TileId>(survivor).copied();
                    if let Some(into) = survivor_id {
                        self.world.entity_mut(intent.tile).insert(Consumed { into });
                    }
                    survivor_id
                }
                None => None,
            };
            moving.push((tile_id, survivor_id, intent.from, intent.to));
        }

        let tickets = self
            .world
            .resource_mut::<CompletionBarrier>()
            .issue(moving.iter().map(|(tile_id, ..)| *tile_id));
        let intents: Vec<IntentView> = moving
            .into_iter()
            .zip(tickets)
            .map(|((tile_id, merged_into, from, to), ticket)| IntentView {
                ticket,
                tile_id,
                from,
                to,
                merged_into,
            })
            .collect();

        {
            let mut state = self.world.resource_mut::<GameState>();
            state.move_made_this_round = true;
            state.ready_for_input = false;
            state.phase = RoundPhase::AwaitingCompletion;
            state.increase_score(resolution.score_delta);
        }
        debug!(
            ?direction,
            intents = intents.len(),
            score_delta = resolution.score_delta,
            "shift resolved"
        );

        if resolution.score_delta > 0 {
            let (score, best) = self.scores();
            self.observer.on_score_changed(score, best);
        }
        self.observer.on_intents(&intents);

        Some(ShiftReport {
            direction,
            intents,
            score_delta: resolution.score_delta,
            any_moved: true,
        })
    }

    /// Acknowledge that the tile behind `ticket` reached its target cell.
    ///
    /// Returns true once no acknowledgments are outstanding.
    pub fn notify_move_complete(&mut self, ticket: MoveTicket) -> Result<bool, GameError> {
        if let Err(err) = self.world.resource_mut::<CompletionBarrier>().acknowledge(ticket) {
            warn!(tile = %ticket.tile, round = ticket.round, "rejected move acknowledgment");
            return Err(err);
        }

        if let Some(entity) = self.find_tile(ticket.tile) {
            let consumed = self.world.get::<Consumed>(entity).is_some();
            if consumed {
                self.world.despawn(entity);
            } else if let Some(target) = self.world.get::<TargetCell>(entity).copied() {
                if let Some(mut current) = self.world.get_mut::<CurrentCell>(entity) {
                    current.0 = target.0;
                }
            }
        }

        Ok(self.world.resource::<CompletionBarrier>().is_released())
    }

    /// Acknowledge every outstanding ticket at once. Returns how many were settled.
    pub fn settle_pending_moves(&mut self) -> usize {
        let tickets = self.world.resource::<CompletionBarrier>().outstanding();
        let count = tickets.len();
        for ticket in tickets {
            if let Err(err) = self.notify_move_complete(ticket) {
                warn!(%err, tile = %ticket.tile, "outstanding ticket rejected");
            }
        }
        count
    }

    /// Close the current round: spawn a tile and check for win or loss.
    pub fn finalize_round(&mut self) -> Result<RoundOutcome, GameError> {
        let pending = self.unfinished_move_count();
        if pending > 0 {
            return Err(GameError::MovesPending { pending });
        }

        {
            let mut state = self.world.resource_mut::<GameState>();
            if !state.move_made_this_round {
                if !matches!(state.phase, RoundPhase::Won | RoundPhase::GameOver) {
                    state.phase = RoundPhase::Idle;
                    state.ready_for_input = true;
                }
                return Ok(RoundOutcome::NoMove);
            }
            state.phase = RoundPhase::Finalizing;
            state.move_made_this_round = false;
        }
        self.world.resource_mut::<Grid>().reset_merge_flags();

        if !self.state().won && self.has_winning_tile() {
            let (score, best_score) = {
                let mut state = self.world.resource_mut::<GameState>();
                state.won = true;
                state.paused = true;
                state.ending_screen = EndingScreen::Win;
                state.phase = RoundPhase::Won;
                (state.score, state.best_score)
            };
            info!(score, best_score, "winning tile reached");
            self.observer.on_win(score, best_score);
            return Ok(RoundOutcome::Won { score, best_score });
        }

        let spawned = self.spawn_random_tile()?;

        if !self.any_shift_possible() {
            let (score, best_score) = {
                let mut state = self.world.resource_mut::<GameState>();
                state.paused = true;
                state.ending_screen = EndingScreen::GameOver;
                state.phase = RoundPhase::GameOver;
                (state.score, state.best_score)
            };
            info!(score, best_score, "no shift possible, game over");
            self.observer.on_game_over(score, best_score);
            return Ok(RoundOutcome::GameOver {
                score,
                best_score,
                spawned,
            });
        }

        let mut state = self.world.resource_mut::<GameState>();
        state.phase = RoundPhase::Idle;
        state.ready_for_input = true;
        Ok(RoundOutcome::Continue { spawned })
    }

    /// Leave the win screen and keep playing the same board.
    pub fn continue_after_win(&mut self) -> Result<(), GameError> {
        let mut state = self.world.resource_mut::<GameState>();
        if state.phase != RoundPhase::Won {
            return Err(GameError::NotWon);
        }
        state.paused = false;
        state.ending_screen = EndingScreen::None;
        state.phase = RoundPhase::Idle;
        state.ready_for_input = true;
        Ok(())
    }

    /// True if any cell is empty or two orthogonal neighbors share a value.
    pub fn any_shift_possible(&self) -> bool {
        let world = &self.world;
        world
            .resource::<Grid>()
            .any_shift_possible(|tile| world.get::<TileValue>(tile).map(|value| value.0))
    }

    pub fn snapshot(&self) -> Savegame {
        extract_state_from_world(&self.world)
    }

    /// Replace the current game with `savegame`. Nothing changes if it is invalid.
    pub fn restore(&mut self, savegame: &Savegame) -> Result<(), GameError> {
        savegame.validate(self.config.grid_size)?;
        self.clear_board()?;
        let tiles = apply_state_to_world(savegame, &mut self.world)?;

        let (score, best) = {
            let mut state = self.world.resource_mut::<GameState>();
            state.reset_for_new_game();
            state.score = savegame.score;
            state.best_score = state.best_score.max(savegame.score);
            state.won = savegame.won;
            state.ending_screen = savegame.ending_screen;
            state.paused = savegame.ending_screen != EndingScreen::None;
            state.phase = RoundPhase::for_ending(savegame.ending_screen);
            state.ready_for_input = true;
            (state.score, state.best_score)
        };
        info!(score, tiles = tiles.len(), "savegame restored");

        for tile in &tiles {
            self.observer.on_tile_spawned(tile.id, tile.pos, tile.value);
        }
        self.observer.on_score_changed(score, best);
        Ok(())
    }

    /// Seed the high-water mark, e.g. from a score store.
    pub fn set_best_score(&mut self, best_score: u32) {
        let mut state = self.world.resource_mut::<GameState>();
        state.best_score = state.best_score.max(best_score).max(state.score);
    }

    /// Save the current board directly to a file path.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        save_state_to_path(&self.snapshot(), path)
    }

    /// Load a board directly from a file path.
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> std::io::Result<()> {
        let savegame = load_state_from_path(path)?;
        self.restore(&savegame)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    /// Settled tiles in row-major order.
    pub fn tiles(&self) -> Vec<TileView> {
        let grid = self.world.resource::<Grid>();
        grid.occupied()
            .filter_map(|(pos, entity)| {
                let id = *self.world.get::<TileId>(entity)?;
                let value = self.world.get::<TileValue>(entity)?.0;
                Some(TileView { id, pos, value })
            })
            .collect()
    }

    pub fn view(&self) -> BoardView {
        let size = self.world.resource::<Grid>().size();
        let mut rows = vec![vec![0; size]; size];
        for tile in self.tiles() {
            rows[tile.pos.y][tile.pos.x] = tile.value;
        }
        let state = self.state();
        BoardView {
            size,
            rows,
            score: state.score,
            best_score: state.best_score,
            phase: state.phase,
            ending_screen: state.ending_screen,
            pending_moves: self.unfinished_move_count(),
        }
    }

    fn scores(&self) -> (u32, u32) {
        let state = self.state();
        (state.score, state.best_score)
    }

    fn has_winning_tile(&self) -> bool {
        let goal = self.config.winning_value;
        self.tiles().iter().any(|tile| tile.value >= goal)
    }

    fn find_tile(&mut self, id: TileId) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &TileId)>();
        query
            .iter(&self.world)
            .find(|(_, tile_id)| **tile_id == id)
            .map(|(entity, _)| entity)
    }

    /// Despawn every tile, including ones still travelling, and empty the grid.
    fn clear_board(&mut self) -> Result<(), GameError> {
        let mut query = self.world.query_filtered::<Entity, With<TileId>>();
        let tiles: Vec<Entity> = query.iter(&self.world).collect();
        for tile in tiles {
            self.world.despawn(tile);
        }
        self.world.resource_mut::<CompletionBarrier>().clear();
        self.world.resource_mut::<Grid>().reset()
    }

    fn spawn_random_tile(&mut self) -> Result<TileView, GameError> {
        let empty = self.world.resource::<Grid>().empty_cells();
        let denominator = self.config.four_chance_denominator;
        let choice = {
            let mut rng = self.world.resource_mut::<SpawnRng>();
            choose_spawn(&empty, denominator, &mut rng.0)
        };
        let Some(choice) = choice else {
            error!("tile spawn requested on a full board");
            return Err(GameError::NoEmptyCell);
        };

        let id = TileId(self.world.resource_mut::<IdAllocator>().alloc());
        let entity = self.world.spawn(TileBundle::new(id, choice.value, choice.pos)).id();
        self.world.resource_mut::<Grid>().place(choice.pos, entity);
        self.observer.on_tile_spawned(id, choice.pos, choice.value);
        Ok(TileView {
            id,
            pos: choice.pos,
            value: choice.value,
        })
    }
}

#[derive(Resource, Debug)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn alloc(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}
