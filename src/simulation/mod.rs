pub mod barrier;
pub mod direction;
pub mod grid;
pub mod resolver;
pub mod spawn;
pub mod state;
