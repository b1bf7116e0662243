use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({x}, {y}) are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Every access is bounds checked; out-of-range coordinates yield
/// [`GridError::OutOfBounds`] instead of being clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Creates a new grid with the specified dimensions, every cell set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![value; size],
        }
    }

    /// Overwrites every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T> Grid<T> {
    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Checks if the given position is within the grid boundaries.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn out_of_bounds(&self, x: i64, y: i64) -> GridError {
        GridError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    fn index_of(&self, pos: Position) -> Result<usize, GridError> {
        if self.contains(pos) {
            Ok(pos.y * self.width + pos.x)
        } else {
            Err(self.out_of_bounds(pos.x as i64, pos.y as i64))
        }
    }

    /// Gets an immutable reference to the cell at the given position.
    pub fn get(&self, pos: Position) -> Result<&T, GridError> {
        let index = self.index_of(pos)?;
        Ok(&self.cells[index])
    }

    /// Gets a mutable reference to the cell at the given position.
    pub fn get_mut(&mut self, pos: Position) -> Result<&mut T, GridError> {
        let index = self.index_of(pos)?;
        Ok(&mut self.cells[index])
    }

    /// Sets the value of the cell at the given position.
    pub fn set(&mut self, pos: Position, value: T) -> Result<(), GridError> {
        *self.get_mut(pos)? = value;
        Ok(())
    }

    /// Returns `pos` shifted by `(dx, dy)` if the result lies inside the grid.
    pub fn step(&self, pos: Position, dx: isize, dy: isize) -> Result<Position, GridError> {
        let target = pos.offset(dx, dy).filter(|target| self.contains(*target));
        target.ok_or_else(|| {
            self.out_of_bounds(pos.x as i64 + dx as i64, pos.y as i64 + dy as i64)
        })
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Position::new(index % width, index / width), cell))
    }
}

/// A single map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub blocked: bool,
    pub blocks_sight: bool,
    /// Set once the tile has been seen; never cleared.
    pub explored: bool,
}

impl Tile {
    /// A tile that blocks sight exactly when it blocks movement.
    pub const fn new(blocked: bool) -> Self {
        Tile::with_sight(blocked, blocked)
    }

    pub const fn with_sight(blocked: bool, blocks_sight: bool) -> Self {
        Tile {
            blocked,
            blocks_sight,
            explored: false,
        }
    }

    pub const fn wall() -> Self {
        Tile::new(true)
    }

    pub const fn floor() -> Self {
        Tile::new(false)
    }
}

/// The dungeon terrain: a fixed-size grid of [`Tile`]s.
///
/// Dimensions are fixed at construction. All tile mutation goes through the
/// setters below, which fail with [`GridError::OutOfBounds`] off the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    tiles: Grid<Tile>,
}

impl TileGrid {
    /// Creates a grid where every tile is a sight-blocking wall.
    pub fn new(width: usize, height: usize) -> Self {
        TileGrid::filled(width, height, Tile::wall())
    }

    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        TileGrid {
            tiles: Grid::filled(width, height, tile),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.tiles.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.tiles.height()
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        self.tiles.contains(pos)
    }

    pub fn get(&self, pos: Position) -> Result<Tile, GridError> {
        self.tiles.get(pos).copied()
    }

    pub fn is_blocked(&self, pos: Position) -> Result<bool, GridError> {
        Ok(self.tiles.get(pos)?.blocked)
    }

    pub fn blocks_sight(&self, pos: Position) -> Result<bool, GridError> {
        Ok(self.tiles.get(pos)?.blocks_sight)
    }

    pub fn set_blocked(&mut self, pos: Position, blocked: bool) -> Result<(), GridError> {
        self.tiles.get_mut(pos)?.blocked = blocked;
        Ok(())
    }

    pub fn set_blocks_sight(&mut self, pos: Position, blocks_sight: bool) -> Result<(), GridError> {
        self.tiles.get_mut(pos)?.blocks_sight = blocks_sight;
        Ok(())
    }

    pub fn set_explored(&mut self, pos: Position, explored: bool) -> Result<(), GridError> {
        self.tiles.get_mut(pos)?.explored = explored;
        Ok(())
    }

    /// Makes a tile passable and transparent.
    pub fn carve(&mut self, pos: Position) -> Result<(), GridError> {
        self.set_blocked(pos, false)?;
        self.set_blocks_sight(pos, false)
    }

    /// Bounds-checked single step from `pos`.
    pub fn step(&self, pos: Position, dx: isize, dy: isize) -> Result<Position, GridError> {
        self.tiles.step(pos, dx, dy)
    }

    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &Tile)> {
        self.tiles.enumerate()
    }
}
