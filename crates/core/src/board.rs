//! Rectangular boards with a set of admissible cells.

use crate::{Error, Result};
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A `width x height` grid on which shapes are packed.
///
/// Admissible cells are stored as `(row, col)` pairs; only those cells may be
/// covered by a placed shape. A cell's linear index is `row * width + col`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Board {
    width: i32,
    height: i32,
    admissible: BTreeSet<(i32, i32)>,
}

impl Board {
    /// Creates a board on which every cell is admissible.
    pub fn new(width: i32, height: i32) -> Self {
        let admissible = (0..height.max(0))
            .flat_map(|row| (0..width.max(0)).map(move |col| (row, col)))
            .collect();
        Self {
            width,
            height,
            admissible,
        }
    }

    /// Creates a board restricted to the given `(row, col)` cells.
    pub fn with_admissible_cells(
        width: i32,
        height: i32,
        cells: impl IntoIterator<Item = (i32, i32)>,
    ) -> Self {
        Self {
            width,
            height,
            admissible: cells.into_iter().collect(),
        }
    }

    /// Creates a board with no admissible cell at all.
    pub fn blocked(width: i32, height: i32) -> Self {
        Self::with_admissible_cells(width, height, std::iter::empty())
    }

    /// Checks dimensions and that every admissible cell lies on the grid.
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::InvalidBoard(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if let Some(&(row, col)) = self
            .admissible
            .iter()
            .find(|&&(row, col)| !self.contains(col, row))
        {
            return Err(Error::InvalidBoard(format!(
                "admissible cell (row {}, col {}) lies outside the {}x{} board",
                row, col, self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// `(width, height)`.
    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Admissible cells as `(row, col)`.
    pub fn admissible_cells(&self) -> &BTreeSet<(i32, i32)> {
        &self.admissible
    }

    pub fn admissible_count(&self) -> u64 {
        self.admissible.len() as u64
    }

    pub fn has_admissible_cells(&self) -> bool {
        !self.admissible.is_empty()
    }

    /// Whether the column `x`, row `y` lies on the grid.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0..self.width).contains(&x) && (0..self.height).contains(&y)
    }

    /// Whether the column `x`, row `y` may be covered.
    pub fn is_admissible(&self, x: i32, y: i32) -> bool {
        self.admissible.contains(&(y, x))
    }

    /// Linear index of `(row, col)`.
    pub fn cell_index(&self, row: i32, col: i32) -> i64 {
        row as i64 * self.width as i64 + col as i64
    }

    /// Linear indices of all admissible cells.
    pub fn admissible_indices(&self) -> BTreeSet<i64> {
        self.admissible
            .iter()
            .map(|&(row, col)| self.cell_index(row, col))
            .collect()
    }
}
