use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::components::world::CellPos;

/// Seedable randomness used for tile spawns.
#[derive(Resource, Debug)]
pub struct SpawnRng(pub StdRng);

impl SpawnRng {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_entropy()),
        }
    }
}

/// Placement and value chosen for a freshly spawned tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnChoice {
    pub pos: CellPos,
    pub value: u32,
}

/// Pick a uniformly random empty cell. A 4 appears with probability
/// `1 / four_chance_denominator`, a 2 otherwise.
pub fn choose_spawn<R: Rng + ?Sized>(
    empty: &[CellPos],
    four_chance_denominator: u32,
    rng: &mut R,
) -> Option<SpawnChoice> {
    if empty.is_empty() {
        return None;
    }
    let pos = empty[rng.gen_range(0..empty.len())];
    let value = if rng.gen_range(0..four_chance_denominator.max(1)) == 0 {
        4
    } else {
        2
    };
    Some(SpawnChoice { pos, value })
}
