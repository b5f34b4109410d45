pub mod repository;
pub mod sqlite;

pub use crate::store::repository::ScoreRepository;
pub use crate::store::sqlite::{ScoreDb, StoreError};
