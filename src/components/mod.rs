pub mod tile;
pub mod world;
