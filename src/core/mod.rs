pub mod ecs;
pub mod error;
pub mod observer;
pub mod serialization;
pub mod world;
