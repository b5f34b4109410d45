use bevy_ecs::prelude::*;

use crate::core::error::GameError;
use crate::core::world::IdAllocator;
use crate::data::config::GameConfig;
use crate::simulation::barrier::CompletionBarrier;
use crate::simulation::grid::Grid;
use crate::simulation::spawn::SpawnRng;
use crate::simulation::state::GameState;

/// Build the ECS world with baseline resources for an empty board.
pub fn create_world(config: &GameConfig) -> Result<World, GameError> {
    let mut world = World::new();
    world.insert_resource(Grid::new(config.grid_size)?);
    world.insert_resource(GameState::default());
    world.insert_resource(CompletionBarrier::default());
    world.insert_resource(IdAllocator::default());
    world.insert_resource(SpawnRng::new(config.seed));
    Ok(world)
}
