//! Packing result representation.

use crate::board::Board;
use crate::shape::{Cell, PlacedShape};
use crate::{Error, Result};
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Terminal status of a packing solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PackingStatus {
    /// Proven optimal layout found.
    Optimal,
    /// Layout found, but optimality not proven.
    Feasible,
    /// No layout satisfies the constraints.
    Infeasible,
    /// The search ended before finding any layout or proving infeasibility.
    #[default]
    Unknown,
    /// The constraint engine rejected the model.
    ModelInvalid,
}

impl PackingStatus {
    /// Returns true for statuses that carry a layout.
    pub fn has_solution(&self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

impl std::fmt::Display for PackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal => write!(f, "Optimal"),
            Self::Feasible => write!(f, "Feasible"),
            Self::Infeasible => write!(f, "Infeasible"),
            Self::Unknown => write!(f, "Unknown"),
            Self::ModelInvalid => write!(f, "ModelInvalid"),
        }
    }
}

/// Result of one packing solve.
///
/// `placed_shapes` and `unplaced_shapes` together account for every requested
/// instance exactly once.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackingResult {
    /// Board `(width, height)`.
    pub board_size: (i32, i32),

    pub status: PackingStatus,

    /// Placements of the instances used in the layout.
    pub placed_shapes: Vec<PlacedShape>,

    /// Names of the instances left out, one entry per instance.
    pub unplaced_shapes: Vec<String>,

    /// Computation time in milliseconds.
    pub computation_time_ms: u64,

    /// Whether the search stopped on a perfect layout.
    pub perfect: bool,

    /// Name of the engine that searched the model.
    pub engine: Option<String>,
}

impl PackingResult {
    /// Creates an empty result with the given status.
    pub fn new(board_size: (i32, i32), status: PackingStatus) -> Self {
        Self {
            board_size,
            status,
            placed_shapes: Vec::new(),
            unplaced_shapes: Vec::new(),
            computation_time_ms: 0,
            perfect: false,
            engine: None,
        }
    }

    /// Creates a result with no placements and every instance unplaced.
    pub fn unsolved<I, S>(board_size: (i32, i32), status: PackingStatus, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result = Self::new(board_size, status);
        result.unplaced_shapes = names.into_iter().map(Into::into).collect();
        result
    }

    /// Creates an infeasible result with every instance unplaced.
    pub fn infeasible<I, S>(board_size: (i32, i32), names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::unsolved(board_size, PackingStatus::Infeasible, names)
    }

    /// Returns true if every requested instance was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced_shapes.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.placed_shapes.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced_shapes.len()
    }

    /// Total number of instances accounted for.
    pub fn total_count(&self) -> usize {
        self.placed_count() + self.unplaced_count()
    }

    /// Number of board cells covered by placed shapes.
    pub fn filled_area(&self) -> u64 {
        self.placed_shapes.iter().map(PlacedShape::area).sum()
    }

    /// Covered share of the board's admissible cells (0.0 - 1.0).
    pub fn utilization(&self, board: &Board) -> f64 {
        let capacity = board.admissible_count();
        if capacity == 0 {
            0.0
        } else {
            self.filled_area() as f64 / capacity as f64
        }
    }

    /// Returns utilization as a percentage string.
    pub fn utilization_percent(&self, board: &Board) -> String {
        format!("{:.1}%", self.utilization(board) * 100.0)
    }

    /// Verifies that every placed cell is on the board, admissible and not shared.
    pub fn check_layout(&self, board: &Board) -> Result<()> {
        let mut owner: HashMap<Cell, usize> = HashMap::new();
        for (i, placed) in self.placed_shapes.iter().enumerate() {
            for (x, y) in placed.cells() {
                if !board.contains(x, y) {
                    return Err(Error::LayoutViolation(format!(
                        "'{}' covers ({}, {}) outside the board",
                        placed.name, x, y
                    )));
                }
                if !board.is_admissible(x, y) {
                    return Err(Error::LayoutViolation(format!(
                        "'{}' covers non-admissible cell ({}, {})",
                        placed.name, x, y
                    )));
                }
                if let Some(&other) = owner.get(&(x, y)) {
                    return Err(Error::LayoutViolation(format!(
                        "'{}' and '{}' both cover ({}, {})",
                        self.placed_shapes[other].name, placed.name, x, y
                    )));
                }
                owner.insert((x, y), i);
            }
        }
        Ok(())
    }
}

/// Summary statistics for a packing result.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackingSummary {
    /// Total instances requested.
    pub total_requested: usize,
    /// Total instances placed.
    pub total_placed: usize,
    /// Covered cells.
    pub filled_area: u64,
    pub status: PackingStatus,
    /// Computation time in milliseconds.
    pub time_ms: u64,
    /// Engine used.
    pub engine: String,
}

impl From<&PackingResult> for PackingSummary {
    fn from(result: &PackingResult) -> Self {
        Self {
            total_requested: result.total_count(),
            total_placed: result.placed_count(),
            filled_area: result.filled_area(),
            status: result.status,
            time_ms: result.computation_time_ms,
            engine: result.engine.clone().unwrap_or_else(|| "none".to_string()),
        }
    }
}
