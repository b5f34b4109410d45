use bevy_ecs::prelude::*;

use crate::components::tile::can_merge;
use crate::components::world::CellPos;
use crate::simulation::direction::Direction;
use crate::simulation::grid::Grid;

/// Instruction for one tile produced by a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveIntent {
    pub tile: Entity,
    pub from: CellPos,
    pub to: CellPos,
    /// Survivor this tile is absorbed into, if the move ends in a merge.
    pub merged_into: Option<Entity>,
}

impl MoveIntent {
    pub fn is_merge(&self) -> bool {
        self.merged_into.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub intents: Vec<MoveIntent>,
    pub score_delta: u32,
    pub any_moved: bool,
}

impl Resolution {
    pub fn merges(&self) -> impl Iterator<Item = &MoveIntent> {
        self.intents.iter().filter(|intent| intent.is_merge())
    }
}

/// Slide every tile on `grid` towards `direction`, merging equal neighbors at most
/// once per cell.
///
/// Only the grid is mutated: consumed tiles are removed from their cells and every
/// moved tile ends up in its destination. Tile values are read through `value_of`
/// and never written; callers double the survivor of each merge intent.
pub fn resolve_shift<F>(grid: &mut Grid, direction: Direction, value_of: F) -> Resolution
where
    F: Fn(Entity) -> Option<u32>,
{
    let mut resolution = Resolution::default();

    for start in grid.traversal(direction) {
        let Some(tile) = grid.tile_at(start) else {
            continue;
        };
        let Some(value) = value_of(tile) else {
            continue;
        };

        let mut dest = start;
        let mut merged_into = None;
        // A tile can cross at most size - 1 cells.
        for _ in 0..grid.size() {
            let Some(next) = grid.neighbor_of(dest, direction) else {
                break;
            };
            let Some(neighbor) = grid.cell(next) else {
                break;
            };
            match neighbor.tile() {
                None => dest = next,
                Some(other)
                    if !neighbor.has_merged_this_round
                        && can_merge(value)
                        && value_of(other) == Some(value) =>
                {
                    dest = next;
                    merged_into = Some(other);
                    break;
                }
                Some(_) => break,
            }
        }

        if dest == start {
            continue;
        }

        grid.relocate(start, dest);
        if merged_into.is_some() {
            if let Some(cell) = grid.cell_mut(dest) {
                cell.has_merged_this_round = true;
            }
            resolution.score_delta = resolution.score_delta.saturating_add(value * 2);
        }
        resolution.intents.push(MoveIntent {
            tile,
            from: start,
            to: dest,
            merged_into,
        });
    }

    grid.collapse_merges();
    resolution.any_moved = !resolution.intents.is_empty();
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_utils::HashMap;

    struct Board {
        grid: Grid,
        values: HashMap<Entity, u32>,
    }

    impl Board {
        fn from_rows(rows: &[[u32; 4]; 4]) -> Self {
            let mut world = World::new();
            let mut grid = Grid::new(4).unwrap();
            let mut values = HashMap::default();
            for (y, row) in rows.iter().enumerate() {
                for (x, value) in row.iter().enumerate() {
                    if *value > 0 {
                        let tile = world.spawn_empty().id();
                        values.insert(tile, *value);
                        grid.place(CellPos::new(x, y), tile);
                    }
                }
            }
            Self { grid, values }
        }

        fn shift(&mut self, direction: Direction) -> Resolution {
            let values = self.values.clone();
            let resolution = resolve_shift(&mut self.grid, direction, |tile| values.get(&tile).copied());
            for intent in resolution.merges() {
                self.values.remove(&intent.tile);
                if let Some(value) = intent.merged_into.and_then(|s| self.values.get_mut(&s)) {
                    *value *= 2;
                }
            }
            self.grid.reset_merge_flags();
            resolution
        }

        fn rows(&self) -> [[u32; 4]; 4] {
            let mut rows = [[0; 4]; 4];
            for (pos, tile) in self.grid.occupied() {
                rows[pos.y][pos.x] = self.values[&tile];
            }
            rows
        }

        fn total(&self) -> u32 {
            self.grid.occupied().map(|(_, tile)| self.values[&tile]).sum()
        }
    }

    #[test]
    fn pair_merges_and_rest_slides_left() {
        let mut board = Board::from_rows(&[[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]]);
        let resolution = board.shift(Direction::Left);
        assert_eq!(board.rows()[0], [4, 4, 0, 0]);
        assert_eq!(resolution.score_delta, 4);
        assert!(resolution.any_moved);
    }

    #[test]
    fn four_equal_tiles_merge_pairwise_only() {
        let mut board = Board::from_rows(&[[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]);
        let resolution = board.shift(Direction::Left);
        assert_eq!(board.rows()[0], [4, 4, 0, 0]);
        assert_eq!(resolution.score_delta, 8);
        assert_eq!(resolution.merges().count(), 2);
    }

    #[test]
    fn merged_tile_does_not_merge_again() {
        // 2+2 becomes 4 but must not absorb the leading 4 in the same round.
        let mut board = Board::from_rows(&[[4, 2, 2, 0], [0; 4], [0; 4], [0; 4]]);
        board.shift(Direction::Left);
        assert_eq!(board.rows()[0], [4, 4, 0, 0]);
    }

    #[test]
    fn ceiling_tiles_only_slide() {
        let max = crate::components::tile::MAX_TILE_VALUE;
        let mut board = Board::from_rows(&[[0, max, max, 0], [0; 4], [0; 4], [0; 4]]);
        let resolution = board.shift(Direction::Left);
        assert_eq!(board.rows()[0], [max, max, 0, 0]);
        assert_eq!(resolution.score_delta, 0);
        assert_eq!(resolution.merges().count(), 0);
        assert!(resolution.any_moved);
    }

    #[test]
    fn shift_right_mirrors_left() {
        let mut board = Board::from_rows(&[[0, 4, 2, 2], [2, 2, 2, 0], [0; 4], [0; 4]]);
        let resolution = board.shift(Direction::Right);
        assert_eq!(board.rows()[0], [0, 0, 4, 4]);
        assert_eq!(board.rows()[1], [0, 0, 2, 4]);
        assert_eq!(resolution.score_delta, 8);
    }

    #[test]
    fn columns_shift_up_and_down() {
        let rows = [[2, 0, 0, 8], [2, 4, 0, 0], [0, 4, 0, 8], [4, 0, 2, 16]];
        let mut up = Board::from_rows(&rows);
        up.shift(Direction::Up);
        assert_eq!(up.rows(), [[4, 8, 2, 16], [4, 0, 0, 16], [0; 4], [0; 4]]);

        let mut down = Board::from_rows(&rows);
        down.shift(Direction::Down);
        assert_eq!(down.rows(), [[0; 4], [0; 4], [4, 0, 0, 16], [4, 8, 2, 16]]);
    }

    #[test]
    fn tiles_slide_across_several_empty_cells() {
        let mut board = Board::from_rows(&[[0, 0, 0, 8], [0; 4], [0; 4], [0; 4]]);
        let resolution = board.shift(Direction::Left);
        assert_eq!(board.rows()[0], [8, 0, 0, 0]);
        assert_eq!(resolution.intents.len(), 1);
        assert_eq!(resolution.intents[0].from, CellPos::new(3, 0));
        assert_eq!(resolution.intents[0].to, CellPos::new(0, 0));
        assert_eq!(resolution.score_delta, 0);
    }

    #[test]
    fn blocked_board_reports_no_move() {
        let rows = [[2, 4, 0, 0], [8, 0, 0, 0], [0; 4], [16, 32, 64, 128]];
        let mut board = Board::from_rows(&rows);
        let resolution = board.shift(Direction::Left);
        assert!(!resolution.any_moved);
        assert!(resolution.intents.is_empty());
        assert_eq!(resolution.score_delta, 0);
        assert_eq!(board.rows(), rows);
    }

    #[test]
    fn value_mass_is_conserved_for_every_direction() {
        let rows = [[2, 2, 4, 8], [2, 0, 4, 8], [16, 16, 0, 2], [2, 4, 4, 2]];
        for direction in Direction::ALL {
            let mut board = Board::from_rows(&rows);
            let before = board.total();
            board.shift(direction);
            assert_eq!(board.total(), before, "{:?}", direction);
            assert!(board.grid.cells().all(|cell| cell.tiles.len() <= 1));
        }
    }

    #[test]
    fn each_cell_takes_at_most_one_merge() {
        let rows = [[2, 2, 2, 2], [4, 4, 4, 4], [8, 8, 8, 8], [2, 2, 4, 4]];
        for direction in Direction::ALL {
            let mut board = Board::from_rows(&rows);
            let values = board.values.clone();
            let resolution = resolve_shift(&mut board.grid, direction, |tile| values.get(&tile).copied());
            let mut survivors: Vec<Entity> = resolution.merges().filter_map(|i| i.merged_into).collect();
            let merges = survivors.len();
            survivors.sort();
            survivors.dedup();
            assert_eq!(survivors.len(), merges, "{:?}", direction);
            // A survivor is never itself consumed.
            assert!(resolution.merges().all(|i| !survivors.contains(&i.tile)));
        }
    }
}
