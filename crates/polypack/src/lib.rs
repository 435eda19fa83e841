//! # polypack
//!
//! Packs irregular polyomino shapes onto a grid, maximizing covered area.
//!
//! This umbrella crate re-exports the workspace crates:
//!
//! - [`core`]: shared types, configuration, the constraint model and engines
//! - [`grid`]: decomposition, model building, search driving and packing
//!
//! ## Example
//!
//! ```rust
//! use polypack::{Board, Config, GridPacker, PackingStatus, Shape};
//!
//! let bar = Shape::rectangle("bar", 3, 1, "green").unwrap();
//! let board = Board::new(3, 2);
//! let result = GridPacker::new(Config::new())
//!     .pack(&[bar.clone(), bar], &board, &[])
//!     .unwrap();
//! assert_eq!(result.status, PackingStatus::Optimal);
//! assert_eq!(result.filled_area(), 6);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support
//! - `milp`: Enable the HiGHS-backed [`MilpEngine`](grid::MilpEngine)

pub use polypack_core as core;
pub use polypack_grid as grid;

pub use polypack_core::{
    Board, Config, Error, PackingResult, PackingStatus, PlacedShape, Result, Shape, Solver,
};
pub use polypack_grid::{GridPacker, ShapeCatalog};
