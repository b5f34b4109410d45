use crate::core::serialization::Savegame;
use crate::store::sqlite::StoreError;

/// Persistent home of the best score and the single savegame slot.
pub trait ScoreRepository {
    fn load_best_score(&self) -> Result<u32, StoreError>;
    /// Record `best_score` unless a higher one is already stored.
    fn save_best_score(&mut self, best_score: u32) -> Result<(), StoreError>;
    fn load_savegame(&self) -> Result<Option<Savegame>, StoreError>;
    fn save_savegame(&mut self, savegame: &Savegame) -> Result<(), StoreError>;
    fn clear_savegame(&mut self) -> Result<(), StoreError>;
}
