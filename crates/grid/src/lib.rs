//! # polypack Grid
//!
//! Grid packing of polyomino-like shapes for the polypack solver.
//!
//! Shapes are sets of unit cells placed by translation onto a rectangular
//! board, and only admissible cells may be covered. The packer maximizes the
//! covered area within a time budget.
//!
//! ## Features
//!
//! - Greedy rectangle decomposition of shapes for non-overlap encoding
//! - Placement model with admissibility, pinning and symmetry breaking
//! - Incremental best-solution tracking with perfect-layout early stop
//! - Pluggable search engines (built-in branch-and-bound, optional MILP)
//! - Shape catalogs and `name=count` request parsing
//!
//! ## Quick Start
//!
//! ```rust
//! use polypack_grid::{Board, Config, GridPacker, PackingStatus, Shape, Solver};
//!
//! let square = Shape::rectangle("square", 2, 2, "red").unwrap();
//! let ell = Shape::new("L", vec![(0, 0), (0, 1), (0, 2), (1, 2)], "blue").unwrap();
//! let board = Board::new(9, 9);
//!
//! let packer = GridPacker::new(Config::new().with_time_limit(5_000));
//! let result = packer.solve(&[square, ell], &board, &[]).unwrap();
//!
//! assert_eq!(result.status, PackingStatus::Optimal);
//! assert!(result.all_placed());
//! println!("utilization: {}", result.utilization_percent(&board));
//! ```
//!
//! ## Shape Catalogs
//!
//! ```rust
//! use polypack_grid::{parse_shape_counts, Shape, ShapeCatalog};
//!
//! let catalog = ShapeCatalog::new()
//!     .with_shape(Shape::rectangle("bar", 3, 1, "green").unwrap());
//! let counts = parse_shape_counts("bar=3").unwrap();
//! let shapes = catalog.instantiate(counts).unwrap();
//! assert_eq!(shapes.len(), 3);
//! ```

pub mod catalog;
pub mod decomposition;
pub mod milp_solver;
pub mod model_builder;
pub mod packer;
pub mod tracker;

// Re-exports
pub use catalog::{parse_shape_counts, ShapeCatalog};
pub use decomposition::{decompose, DecompositionCache, Rectangle};
pub use milp_solver::{is_milp_available, MilpEngine};
pub use model_builder::{InstanceVars, ModelBuilder, ModelStats, PlacementModel};
pub use packer::{assemble, GridPacker};
pub use tracker::{IncrementalTracker, RetainedSolution, SearchPlan};

// Re-export core types
pub use polypack_core::{
    Board, BranchAndBound, Cell, Config, EngineResponse, EngineStatus, Error, PackingResult,
    PackingStatus, PackingSummary, PlacedShape, Result, SearchControl, SearchEngine,
    SearchParams, Shape, SolutionView, Solver,
};
