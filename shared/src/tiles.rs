//! Static tile grid and the world that owns it.

use std::sync::Arc;

/// What a lookup outside the grid reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfBounds {
    /// Outside cells never collide; bodies can leave the world.
    #[default]
    Empty,
    /// The world is walled in on every side.
    Solid,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TileGridError {
    #[error("tile layout is empty")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unexpected tile character {ch:?} at row {row}, column {column}")]
    BadCell { row: usize, column: usize, ch: char },
}

/// Fixed-size grid of solid/empty cells. There is no way to change a cell
/// once the grid is built.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    columns: usize,
    rows: usize,
    tile_size: f32,
    cells: Vec<bool>,
    out_of_bounds: OutOfBounds,
}

impl TileGrid {
    pub fn from_fn(
        columns: usize,
        rows: usize,
        tile_size: f32,
        mut solid: impl FnMut(usize, usize) -> bool,
    ) -> Self {
        let mut cells = Vec::with_capacity(columns * rows);
        for cy in 0..rows {
            for cx in 0..columns {
                cells.push(solid(cx, cy));
            }
        }
        Self {
            columns,
            rows,
            tile_size,
            cells,
            out_of_bounds: OutOfBounds::default(),
        }
    }

    pub fn empty(columns: usize, rows: usize, tile_size: f32) -> Self {
        Self::from_fn(columns, rows, tile_size, |_, _| false)
    }

    /// Grid whose bottom `floor_rows` rows are solid.
    pub fn with_floor(columns: usize, rows: usize, tile_size: f32, floor_rows: usize) -> Self {
        let first_solid = rows.saturating_sub(floor_rows);
        Self::from_fn(columns, rows, tile_size, |_, cy| cy >= first_solid)
    }

    /// Parses an ASCII layout, one line per row: `#` is solid, `.` is empty.
    /// Blank lines and surrounding whitespace are ignored.
    pub fn parse(layout: &str, tile_size: f32) -> Result<Self, TileGridError> {
        let lines: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let columns = lines.first().map(|l| l.chars().count()).ok_or(TileGridError::Empty)?;
        let mut cells = Vec::with_capacity(columns * lines.len());

        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != columns {
                return Err(TileGridError::RaggedRow {
                    row,
                    expected: columns,
                    found,
                });
            }
            for (column, ch) in line.chars().enumerate() {
                match ch {
                    '#' => cells.push(true),
                    '.' => cells.push(false),
                    _ => return Err(TileGridError::BadCell { row, column, ch }),
                }
            }
        }

        Ok(Self {
            columns,
            rows: lines.len(),
            tile_size,
            cells,
            out_of_bounds: OutOfBounds::default(),
        })
    }

    pub fn with_out_of_bounds(mut self, policy: OutOfBounds) -> Self {
        self.out_of_bounds = policy;
        self
    }

    pub fn is_solid(&self, cx: i32, cy: i32) -> bool {
        if cx < 0 || cy < 0 || cx as usize >= self.columns || cy as usize >= self.rows {
            return self.out_of_bounds == OutOfBounds::Solid;
        }
        self.cells[cy as usize * self.columns + cx as usize]
    }

    /// Cell containing the world point `(x, y)`.
    pub fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.tile_size).floor() as i32,
            (y / self.tile_size).floor() as i32,
        )
    }

    pub fn is_solid_at(&self, x: f32, y: f32) -> bool {
        let (cx, cy) = self.cell_of(x, y);
        self.is_solid(cx, cy)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn out_of_bounds(&self) -> OutOfBounds {
        self.out_of_bounds
    }

    pub fn world_width(&self) -> f32 {
        self.columns as f32 * self.tile_size
    }

    pub fn world_height(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    /// Iterates over the coordinates of every solid cell, row by row.
    pub fn solid_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, solid)| **solid)
            .map(move |(i, _)| (i % self.columns, i / self.columns))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldConfig {
    /// Keep bodies inside `[0, world size - body size]` after every step.
    pub clamp_to_bounds: bool,
}

/// Process-wide world state: the grid every simulator reads, plus world
/// options. Cloning shares the grid.
#[derive(Debug, Clone)]
pub struct World {
    grid: Arc<TileGrid>,
    config: WorldConfig,
}

impl World {
    /// An all-empty world of `width` x `height` cells.
    pub fn new(width: usize, height: usize, tile_size: f32) -> Self {
        Self::from_grid(TileGrid::empty(width, height, tile_size), WorldConfig::default())
    }

    pub fn from_grid(grid: TileGrid, config: WorldConfig) -> Self {
        Self {
            grid: Arc::new(grid),
            config,
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn shared_grid(&self) -> Arc<TileGrid> {
        Arc::clone(&self.grid)
    }

    pub fn config(&self) -> WorldConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grid() {
        let grid = TileGrid::empty(20, 12, 16.0);
        assert_eq!(grid.columns(), 20);
        assert_eq!(grid.rows(), 12);
        assert_eq!(grid.world_width(), 320.0);
        assert_eq!(grid.world_height(), 192.0);
        assert!(!grid.is_solid(0, 0));
        assert!(!grid.is_solid(19, 11));
    }

    #[test]
    fn test_floor_rows() {
        let grid = TileGrid::with_floor(20, 11, 16.0, 3);
        assert!(!grid.is_solid(0, 7));
        assert!(grid.is_solid(0, 8));
        assert!(grid.is_solid(19, 10));
        assert_eq!(grid.solid_cells().count(), 60);
    }

    #[test]
    fn test_out_of_bounds_policies() {
        let grid = TileGrid::with_floor(4, 4, 16.0, 1);
        assert!(!grid.is_solid(-1, 0));
        assert!(!grid.is_solid(4, 0));
        assert!(!grid.is_solid(0, 10));

        let walled = grid.with_out_of_bounds(OutOfBounds::Solid);
        assert!(walled.is_solid(-1, 0));
        assert!(walled.is_solid(4, 0));
        assert!(walled.is_solid(0, -3));
        assert!(!walled.is_solid(1, 1));
    }

    #[test]
    fn test_cell_of_uses_floor_division() {
        let grid = TileGrid::empty(4, 4, 16.0);
        assert_eq!(grid.cell_of(0.0, 0.0), (0, 0));
        assert_eq!(grid.cell_of(15.9, 16.0), (0, 1));
        assert_eq!(grid.cell_of(-0.1, 31.99), (-1, 1));
    }

    #[test]
    fn test_parse_layout() {
        let grid = TileGrid::parse(
            "
            ....
            .#..
            ####
            ",
            16.0,
        )
        .unwrap();

        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.rows(), 3);
        assert!(grid.is_solid(1, 1));
        assert!(!grid.is_solid(2, 1));
        assert!(grid.is_solid_at(50.0, 40.0));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(TileGrid::parse("  \n ", 16.0), Err(TileGridError::Empty));
        assert_eq!(
            TileGrid::parse("...\n..", 16.0),
            Err(TileGridError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            TileGrid::parse(".x.", 16.0),
            Err(TileGridError::BadCell {
                row: 0,
                column: 1,
                ch: 'x'
            })
        );
    }

    #[test]
    fn test_world_shares_grid() {
        let world = World::new(20, 12, 16.0);
        let copy = world.clone();
        assert!(Arc::ptr_eq(&world.shared_grid(), &copy.shared_grid()));
        assert!(!world.config().clamp_to_bounds);
    }
}
