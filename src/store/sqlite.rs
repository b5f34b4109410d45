use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::core::serialization::{SavedTile, Savegame};
use crate::simulation::state::EndingScreen;
use crate::store::repository::ScoreRepository;

const STORE_SCHEMA_VERSION: i64 = 1;

const STORE_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS best_score (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  score INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS savegame (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  version INTEGER NOT NULL,
  score INTEGER NOT NULL,
  won INTEGER NOT NULL,
  ending_screen TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS savegame_tiles (
  x INTEGER NOT NULL,
  y INTEGER NOT NULL,
  value INTEGER NOT NULL,
  PRIMARY KEY (x, y)
);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    InvalidData(String),
}

fn ending_screen_to_str(screen: EndingScreen) -> &'static str {
    match screen {
        EndingScreen::None => "none",
        EndingScreen::Win => "win",
        EndingScreen::GameOver => "gameover",
    }
}

fn ending_screen_from_str(value: &str) -> Result<EndingScreen, StoreError> {
    match value {
        "none" => Ok(EndingScreen::None),
        "win" => Ok(EndingScreen::Win),
        "gameover" => Ok(EndingScreen::GameOver),
        _ => Err(StoreError::InvalidData(format!(
            "unknown ending screen: {}",
            value
        ))),
    }
}

/// SQLite-backed score store.
pub struct ScoreDb {
    conn: Connection,
}

impl ScoreDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        let mut db = Self { conn };
        db.conn.execute_batch(STORE_DB_SCHEMA)?;
        db.ensure_store_meta()?;
        Ok(db)
    }

    fn ensure_store_meta(&mut self) -> Result<(), StoreError> {
        let version = self
            .conn
            .query_row(
                "SELECT schema_version FROM store_meta WHERE id = 1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match version {
            Some(STORE_SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(StoreError::InvalidData(format!(
                "store_meta version mismatch (found {}, expected {})",
                other, STORE_SCHEMA_VERSION
            ))),
            None => {
                self.conn.execute(
                    "INSERT INTO store_meta (id, schema_version) VALUES (1, ?1)",
                    params![STORE_SCHEMA_VERSION],
                )?;
                Ok(())
            }
        }
    }

    fn load_tiles(&self) -> Result<Vec<SavedTile>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT x, y, value FROM savegame_tiles ORDER BY y, x")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut tiles = Vec::new();
        for row in rows {
            let (x, y, value) = row?;
            let (Ok(x), Ok(y), Ok(value)) = (usize::try_from(x), usize::try_from(y), u32::try_from(value))
            else {
                return Err(StoreError::InvalidData(format!(
                    "savegame tile out of range: ({}, {}) = {}",
                    x, y, value
                )));
            };
            tiles.push(SavedTile { x, y, value });
        }
        Ok(tiles)
    }
}

impl ScoreRepository for ScoreDb {
    fn load_best_score(&self) -> Result<u32, StoreError> {
        let score = self
            .conn
            .query_row("SELECT score FROM best_score WHERE id = 1", [], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        match score {
            None => Ok(0),
            Some(score) => u32::try_from(score)
                .map_err(|_| StoreError::InvalidData(format!("best score out of range: {}", score))),
        }
    }

    fn save_best_score(&mut self, best_score: u32) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO best_score (id, score) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET score = MAX(score, excluded.score)",
            params![best_score as i64],
        )?;
        Ok(())
    }

    fn load_savegame(&self) -> Result<Option<Savegame>, StoreError> {
        let header = self
            .conn
            .query_row(
                "SELECT version, score, won, ending_screen FROM savegame WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((version, score, won, ending_screen)) = header else {
            return Ok(None);
        };

        let (Ok(version), Ok(score)) = (u32::try_from(version), u32::try_from(score)) else {
            return Err(StoreError::InvalidData(format!(
                "savegame header out of range: version {}, score {}",
                version, score
            )));
        };

        Ok(Some(Savegame {
            version,
            score,
            won: won != 0,
            ending_screen: ending_screen_from_str(&ending_screen)?,
            tiles: self.load_tiles()?,
        }))
    }

    fn save_savegame(&mut self, savegame: &Savegame) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM savegame", [])?;
        tx.execute(
            "INSERT INTO savegame (id, version, score, won, ending_screen) VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                savegame.version as i64,
                savegame.score as i64,
                if savegame.won { 1 } else { 0 },
                ending_screen_to_str(savegame.ending_screen),
            ],
        )?;

        tx.execute("DELETE FROM savegame_tiles", [])?;
        for tile in &savegame.tiles {
            tx.execute(
                "INSERT INTO savegame_tiles (x, y, value) VALUES (?1, ?2, ?3)",
                params![tile.x as i64, tile.y as i64, tile.value as i64],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn clear_savegame(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM savegame", [])?;
        tx.execute("DELETE FROM savegame_tiles", [])?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Savegame {
        Savegame {
            version: 1,
            score: 1200,
            won: true,
            ending_screen: EndingScreen::None,
            tiles: vec![
                SavedTile { x: 0, y: 0, value: 2048 },
                SavedTile { x: 2, y: 1, value: 4 },
                SavedTile { x: 3, y: 3, value: 2 },
            ],
        }
    }

    #[test]
    fn empty_store_has_no_savegame_and_zero_best() {
        let db = ScoreDb::open_in_memory().unwrap();
        assert_eq!(db.load_best_score().unwrap(), 0);
        assert!(db.load_savegame().unwrap().is_none());
    }

    #[test]
    fn best_score_only_rises() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.save_best_score(500).unwrap();
        db.save_best_score(120).unwrap();
        assert_eq!(db.load_best_score().unwrap(), 500);
        db.save_best_score(640).unwrap();
        assert_eq!(db.load_best_score().unwrap(), 640);
    }

    #[test]
    fn savegame_round_trip_and_overwrite() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.save_savegame(&sample()).unwrap();
        assert_eq!(db.load_savegame().unwrap(), Some(sample()));

        let mut next = sample();
        next.tiles.truncate(1);
        next.ending_screen = EndingScreen::Win;
        db.save_savegame(&next).unwrap();
        assert_eq!(db.load_savegame().unwrap(), Some(next));

        db.clear_savegame().unwrap();
        assert!(db.load_savegame().unwrap().is_none());
    }

    #[test]
    fn reopening_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.db");
        {
            let mut db = ScoreDb::open(&path).unwrap();
            db.save_best_score(256).unwrap();
            db.save_savegame(&sample()).unwrap();
        }
        let db = ScoreDb::open(&path).unwrap();
        assert_eq!(db.load_best_score().unwrap(), 256);
        assert_eq!(db.load_savegame().unwrap(), Some(sample()));
    }

    #[test]
    fn out_of_range_rows_are_invalid_data() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.save_savegame(&sample()).unwrap();
        db.conn
            .execute("UPDATE savegame SET score = ?1 WHERE id = 1", params![i64::from(u32::MAX) + 1])
            .unwrap();
        assert!(matches!(db.load_savegame(), Err(StoreError::InvalidData(_))));

        db.conn
            .execute("UPDATE savegame SET score = 0, version = -1 WHERE id = 1", [])
            .unwrap();
        assert!(matches!(db.load_savegame(), Err(StoreError::InvalidData(_))));

        db.conn
            .execute("INSERT INTO best_score (id, score) VALUES (1, -5)", [])
            .unwrap();
        assert!(matches!(db.load_best_score(), Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.db");
        ScoreDb::open(&path).unwrap();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("UPDATE store_meta SET schema_version = 99 WHERE id = 1", [])
                .unwrap();
        }
        assert!(matches!(ScoreDb::open(&path), Err(StoreError::InvalidData(_))));
    }
}
