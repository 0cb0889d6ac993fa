//! Dig-site grid: positions, cells, and row-major cell storage.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GameError, Result};

/// A cell address on the excavation grid. `(0, 0)` is the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
}

impl GridPosition {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One grid unit of the dig site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub position: GridPosition,
    pub excavated: bool,
    /// Digging progress, 0.0 = untouched, 1.0 = fully excavated.
    pub excavation_depth: f32,
    pub contains_artifact: bool,
}

impl GridCell {
    pub fn new(position: GridPosition) -> Self {
        Self {
            position,
            excavated: false,
            excavation_depth: 0.0,
            contains_artifact: false,
        }
    }

    pub fn is_fully_excavated(&self) -> bool {
        self.excavation_depth >= 1.0
    }

    /// Dig deeper by `increment`, clamped to [0, 1]. Depth never decreases.
    /// Returns the new depth.
    pub fn deepen(&mut self, increment: f32) -> f32 {
        let increment = if increment.is_finite() {
            increment.max(0.0)
        } else {
            0.0
        };
        self.excavation_depth = (self.excavation_depth + increment).clamp(0.0, 1.0);
        if self.excavation_depth > 0.0 {
            self.excavated = true;
        }
        self.excavation_depth
    }
}

/// Row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcavationGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<GridCell>,
}

impl ExcavationGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| GridCell::new(GridPosition::new(x, y))))
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    /// Build a grid and flag the cells that hold at least one artifact.
    pub fn with_artifacts(
        width: u32,
        height: u32,
        artifact_positions: impl IntoIterator<Item = GridPosition>,
    ) -> Self {
        let mut grid = Self::new(width, height);
        for pos in artifact_positions {
            if let Some(cell) = grid.cell_mut(pos) {
                cell.contains_artifact = true;
            }
        }
        grid
    }

    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: GridPosition) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, pos: GridPosition) -> Option<&GridCell> {
        let i = self.index(pos)?;
        self.cells.get(i)
    }

    pub fn cell_mut(&mut self, pos: GridPosition) -> Option<&mut GridCell> {
        let i = self.index(pos)?;
        self.cells.get_mut(i)
    }

    /// Like [`cell`](Self::cell) but reports out-of-bounds positions as an error.
    pub fn require_cell(&self, pos: GridPosition) -> Result<&GridCell> {
        self.cell(pos).ok_or(GameError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width: self.width,
            height: self.height,
        })
    }

    pub fn require_cell_mut(&mut self, pos: GridPosition) -> Result<&mut GridCell> {
        let (width, height) = (self.width, self.height);
        self.cell_mut(pos).ok_or(GameError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width,
            height,
        })
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn excavated_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.excavated).count()
    }

    /// Structural check used when a grid comes back from storage.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        let expected = self.width as usize * self.height as usize;
        if self.cells.len() != expected {
            return Err(format!(
                "grid {}x{} has {} cells, expected {}",
                self.width,
                self.height,
                self.cells.len(),
                expected
            ));
        }
        for (i, cell) in self.cells.iter().enumerate() {
            let expected_pos = GridPosition::new(
                (i % self.width as usize) as u32,
                (i / self.width as usize) as u32,
            );
            if cell.position != expected_pos {
                return Err(format!(
                    "cell {} is at {}, expected {}",
                    i, cell.position, expected_pos
                ));
            }
            if !cell.excavation_depth.is_finite() || !(0.0..=1.0).contains(&cell.excavation_depth)
            {
                return Err(format!(
                    "cell {} has depth {} outside [0, 1]",
                    cell.position, cell.excavation_depth
                ));
            }
            if cell.excavated != (cell.excavation_depth > 0.0) {
                return Err(format!(
                    "cell {} excavated flag disagrees with depth {}",
                    cell.position, cell.excavation_depth
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout_row_major() {
        let grid = ExcavationGrid::new(3, 2);
        assert_eq!(grid.total_cells(), 6);
        let positions: Vec<_> = grid.cells().map(|c| c.position).collect();
        assert_eq!(positions[0], GridPosition::new(0, 0));
        assert_eq!(positions[2], GridPosition::new(2, 0));
        assert_eq!(positions[3], GridPosition::new(0, 1));
        assert!(grid.check_consistency().is_ok());
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = ExcavationGrid::new(5, 5);
        assert!(grid.cell(GridPosition::new(5, 0)).is_none());
        assert!(grid.cell(GridPosition::new(0, 5)).is_none());
        assert!(matches!(
            grid.require_cell(GridPosition::new(7, 1)),
            Err(GameError::OutOfBounds { x: 7, y: 1, .. })
        ));
    }

    #[test]
    fn test_deepen_clamps_and_flags() {
        let mut cell = GridCell::new(GridPosition::new(0, 0));
        assert!(!cell.excavated);
        cell.deepen(0.6);
        assert!(cell.excavated);
        assert!((cell.excavation_depth - 0.6).abs() < 1e-6);
        cell.deepen(0.6);
        assert_eq!(cell.excavation_depth, 1.0);
        assert!(cell.is_fully_excavated());
    }

    #[test]
    fn test_deepen_never_decreases() {
        let mut cell = GridCell::new(GridPosition::new(0, 0));
        cell.deepen(0.3);
        cell.deepen(-0.5);
        cell.deepen(f32::NAN);
        assert!((cell.excavation_depth - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_zero_increment_leaves_cell_unexcavated() {
        let mut cell = GridCell::new(GridPosition::new(1, 1));
        cell.deepen(0.0);
        assert!(!cell.excavated);
    }

    #[test]
    fn test_with_artifacts_flags_cells() {
        let grid = ExcavationGrid::with_artifacts(
            4,
            4,
            [GridPosition::new(1, 2), GridPosition::new(9, 9)],
        );
        assert!(grid.cell(GridPosition::new(1, 2)).unwrap().contains_artifact);
        assert!(!grid.cell(GridPosition::new(2, 1)).unwrap().contains_artifact);
    }

    #[test]
    fn test_consistency_rejects_bad_depth() {
        let mut grid = ExcavationGrid::new(2, 2);
        grid.cell_mut(GridPosition::new(1, 1)).unwrap().excavation_depth = 1.5;
        assert!(grid.check_consistency().is_err());
    }

    #[test]
    fn test_excavated_count() {
        let mut grid = ExcavationGrid::new(3, 3);
        grid.cell_mut(GridPosition::new(0, 0)).unwrap().deepen(0.1);
        grid.cell_mut(GridPosition::new(2, 2)).unwrap().deepen(1.0);
        assert_eq!(grid.excavated_cells(), 2);
    }
}
