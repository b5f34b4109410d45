use bevy_ecs::prelude::*;

use crate::components::tile::can_merge;
use crate::components::world::CellPos;
use crate::core::error::GameError;
use crate::simulation::direction::Direction;

/// One square of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub pos: CellPos,
    /// Survivor first. A second entry only exists while a merge is being resolved.
    pub tiles: Vec<Entity>,
    pub has_merged_this_round: bool,
}

impl Cell {
    pub fn new(pos: CellPos) -> Self {
        Self {
            pos,
            tiles: Vec::new(),
            has_merged_this_round: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self) -> Option<Entity> {
        self.tiles.first().copied()
    }
}

/// Resource holding the N×N board in row-major order.
#[derive(Resource, Debug, Clone)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size: usize) -> Result<Self, GameError> {
        let cells = (0..size * size)
            .map(|index| Cell::new(CellPos::new(index % size, index / size)))
            .collect();
        Self::from_cells(size, cells)
    }

    /// Build a grid from prepared cells, checking the layout matches `size`.
    pub fn from_cells(size: usize, cells: Vec<Cell>) -> Result<Self, GameError> {
        if size == 0 {
            return Err(GameError::InvalidConfiguration(
                "grid size must be positive".to_string(),
            ));
        }
        let grid = Self { size, cells };
        grid.check_layout()?;
        Ok(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Empty every cell and clear all merge flags.
    pub fn reset(&mut self) -> Result<(), GameError> {
        self.check_layout()?;
        for cell in self.cells.iter_mut() {
            cell.tiles.clear();
            cell.has_merged_this_round = false;
        }
        Ok(())
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        self.index(pos).map(|index| &self.cells[index])
    }

    pub fn cell_mut(&mut self, pos: CellPos) -> Option<&mut Cell> {
        self.index(pos).map(move |index| &mut self.cells[index])
    }

    pub fn tile_at(&self, pos: CellPos) -> Option<Entity> {
        self.cell(pos).and_then(Cell::tile)
    }

    /// Positions of all cells without a tile, row-major.
    pub fn empty_cells(&self) -> Vec<CellPos> {
        self.cells
            .iter()
            .filter(|cell| cell.is_empty())
            .map(|cell| cell.pos)
            .collect()
    }

    /// Occupied cells with their settled tile, row-major.
    pub fn occupied(&self) -> impl Iterator<Item = (CellPos, Entity)> + '_ {
        self.cells
            .iter()
            .filter_map(|cell| cell.tile().map(|tile| (cell.pos, tile)))
    }

    pub fn neighbor_of(&self, pos: CellPos, direction: Direction) -> Option<CellPos> {
        if !self.contains(pos) {
            return None;
        }
        let (dx, dy) = direction.delta();
        let x = pos.x.checked_add_signed(dx)?;
        let y = pos.y.checked_add_signed(dy)?;
        let next = CellPos::new(x, y);
        self.contains(next).then_some(next)
    }

    pub fn reset_merge_flags(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.has_merged_this_round = false;
        }
    }

    /// Put `tile` into the cell at `pos`. Returns false if `pos` is off the board.
    pub fn place(&mut self, pos: CellPos, tile: Entity) -> bool {
        match self.cell_mut(pos) {
            Some(cell) => {
                cell.tiles.push(tile);
                true
            }
            None => false,
        }
    }

    /// Move the settled tile of `from` on top of whatever `to` holds.
    pub(crate) fn relocate(&mut self, from: CellPos, to: CellPos) -> Option<Entity> {
        if from == to {
            return self.tile_at(from);
        }
        let tile = {
            let cell = self.cell_mut(from)?;
            if cell.tiles.is_empty() {
                return None;
            }
            cell.tiles.remove(0)
        };
        self.cell_mut(to)?.tiles.push(tile);
        Some(tile)
    }

    /// Drop every tile except the survivor from each cell.
    pub(crate) fn collapse_merges(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.tiles.truncate(1);
        }
    }

    /// Cells in the order a shift must resolve them: those closest to the edge
    /// tiles slide towards come first.
    pub fn traversal(&self, direction: Direction) -> Vec<CellPos> {
        let n = self.size;
        let mut order = Vec::with_capacity(n * n);
        for outer in 0..n {
            for inner in 0..n {
                let pos = match direction {
                    Direction::Up => CellPos::new(inner, outer),
                    Direction::Down => CellPos::new(inner, n - 1 - outer),
                    Direction::Left => CellPos::new(outer, inner),
                    Direction::Right => CellPos::new(n - 1 - outer, inner),
                };
                order.push(pos);
            }
        }
        order
    }

    /// True if any cell is empty or any two orthogonal neighbors hold equal values.
    pub fn any_shift_possible<F>(&self, value_of: F) -> bool
    where
        F: Fn(Entity) -> Option<u32>,
    {
        for cell in self.cells.iter() {
            let Some(value) = cell.tile().and_then(&value_of) else {
                return true;
            };
            if !can_merge(value) {
                continue;
            }
            // Right and Down cover every orthogonal pair once.
            for direction in [Direction::Right, Direction::Down] {
                let equal = self
                    .neighbor_of(cell.pos, direction)
                    .and_then(|next| self.tile_at(next))
                    .and_then(&value_of)
                    .is_some_and(|other| other == value);
                if equal {
                    return true;
                }
            }
        }
        false
    }

    fn index(&self, pos: CellPos) -> Option<usize> {
        self.contains(pos).then(|| pos.y * self.size + pos.x)
    }

    fn check_layout(&self) -> Result<(), GameError> {
        let expected = self.size * self.size;
        if self.cells.len() != expected {
            return Err(GameError::InvalidConfiguration(format!(
                "grid of size {} needs {} cells, found {}",
                self.size,
                expected,
                self.cells.len()
            )));
        }
        for (index, cell) in self.cells.iter().enumerate() {
            let expected = CellPos::new(index % self.size, index / self.size);
            if cell.pos != expected {
                return Err(GameError::InvalidConfiguration(format!(
                    "cell {} sits at {} but should be at {}",
                    index, cell.pos, expected
                )));
            }
        }
        Ok(())
    }
}
