//! Occupancy-grid observation built from decoded state frames.
//!
//! The observation is a square grid one cell wider than the server arena
//! on every side: the outer ring is a static wall border, and wire
//! coordinate (x, y) maps to grid cell (x + 1, y + 1). Everything inside
//! the border is recomputed from scratch on every rebuild; only the most
//! recent frame matters.

use crate::protocol::{Coord, Snapshot};
use std::io::{self, Write};

/// Cell code written into the observation grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CellCode {
    /// Nothing here
    #[default]
    Empty = 0,

    /// Static border ring
    Wall = 1,

    /// The apple
    Apple = 2,

    /// Our own snake's head
    Head = 3,

    /// Anything that kills on contact: tail segments and other snakes
    Collision = 4,
}

impl CellCode {
    /// Convert from u8 (for consumers holding raw grids)
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => CellCode::Wall,
            2 => CellCode::Apple,
            3 => CellCode::Head,
            4 => CellCode::Collision,
            _ => CellCode::Empty,
        }
    }

    /// Single character representation for rendering
    pub fn as_char(self) -> char {
        match self {
            CellCode::Empty => '.',
            CellCode::Wall => '#',
            CellCode::Apple => 'o',
            CellCode::Head => '@',
            CellCode::Collision => 'x',
        }
    }
}

/// Dense cell-code grid reconstructed from the latest snapshot
#[derive(Clone, Debug)]
pub struct ObservationGrid {
    size: usize,
    cells: Vec<CellCode>,
}

impl ObservationGrid {
    /// Create a grid for the given server arena size, with the wall
    /// border already in place.
    pub fn new(server_grid_size: usize) -> Self {
        let size = server_grid_size + 2;
        let mut grid = Self {
            size,
            cells: vec![CellCode::Empty; size * size],
        };
        for i in 0..size {
            grid.set(i, 0, CellCode::Wall);
            grid.set(i, size - 1, CellCode::Wall);
            grid.set(0, i, CellCode::Wall);
            grid.set(size - 1, i, CellCode::Wall);
        }
        grid
    }

    /// Grid side length (server arena + 2)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell code at grid position (x, y)
    pub fn get(&self, x: usize, y: usize) -> CellCode {
        self.cells[y * self.size + x]
    }

    fn set(&mut self, x: usize, y: usize, code: CellCode) {
        self.cells[y * self.size + x] = code;
    }

    /// Map a wire coordinate into the inner region. `None` when it falls
    /// on the border ring or outside the grid entirely.
    fn inner_cell(&self, coord: Coord) -> Option<(usize, usize)> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as usize + 1, coord.y as usize + 1);
        if x > self.size - 2 || y > self.size - 2 {
            return None;
        }
        Some((x, y))
    }

    /// Write a cell if the coordinate is inside the playable region.
    /// Out-of-range coordinates are silently dropped: frames can be
    /// transiently out of sync with the arena, and the wall border always
    /// takes precedence.
    fn write(&mut self, coord: Coord, code: CellCode) {
        if let Some((x, y)) = self.inner_cell(coord) {
            self.set(x, y, code);
        }
    }

    /// Recompute all non-border cells from a snapshot.
    ///
    /// Processing order is fixed so observations are reproducible: apple,
    /// then each player in index order (head first, then tail links in
    /// walk order). Later writes win.
    pub fn rebuild(&mut self, snapshot: &Snapshot) {
        for y in 1..self.size - 1 {
            for x in 1..self.size - 1 {
                self.set(x, y, CellCode::Empty);
            }
        }

        self.write(snapshot.apple, CellCode::Apple);

        for (index, player) in snapshot.players.iter().enumerate() {
            let head_code = if index == snapshot.own_index {
                CellCode::Head
            } else {
                CellCode::Collision
            };
            self.write(player.head, head_code);
            for link in player.tail_chain() {
                self.write(link, CellCode::Collision);
            }
        }
    }

    /// Render the grid as text, one row per line
    pub fn render(&self, sink: &mut impl Write) -> io::Result<()> {
        for y in 0..self.size {
            let row: String = (0..self.size).map(|x| self.get(x, y).as_char()).collect();
            writeln!(sink, "{}", row)?;
        }
        Ok(())
    }
}
