//! # polypack Core
//!
//! Core types and abstractions for the polypack grid packing solver.
//!
//! This crate holds everything the packer and its engines share: the shape,
//! board and result types, the error type, configuration, and the interface
//! through which a constraint engine is asked to search a model.
//!
//! ## Core Components
//!
//! - **Data model**: [`Shape`], [`PlacedShape`], [`Board`], [`PackingResult`], [`PackingStatus`]
//! - **Solver trait**: [`Solver`] with its [`Config`]
//! - **Constraint model**: [`CpModel`], [`LinearExpr`], [`Constraint`], [`OptionalBox`]
//! - **Engine interface**: [`SearchEngine`], [`SolutionView`], [`SearchControl`], [`EngineResponse`]
//! - **Built-in engine**: [`BranchAndBound`]
//!
//! ## Configuration
//!
//! ```rust
//! use polypack_core::Config;
//!
//! let config = Config::new()
//!     .with_time_limit(5_000)
//!     .with_threads(2)
//!     .with_symmetry_breaking(true);
//! assert_eq!(config.worker_count(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod board;
pub mod branch_bound;
pub mod engine;
pub mod error;
pub mod model;
pub mod result;
pub mod shape;
pub mod solver;

// Re-exports
pub use board::Board;
pub use branch_bound::BranchAndBound;
pub use engine::{
    EngineResponse, EngineStatus, SearchControl, SearchEngine, SearchParams, SolutionView,
};
pub use error::{Error, Result};
pub use model::{
    Constraint, CpModel, LinearExpr, OptionalBox, Relation, VarDecl, VarId, MAX_MAGNITUDE,
};
pub use result::{PackingResult, PackingStatus, PackingSummary};
pub use shape::{Cell, PlacedShape, Shape, ShapeBounds};
pub use solver::{
    clamp_time_limit_secs, default_worker_count, Config, Solver, MAX_CONFIG_TIME_LIMIT_MS,
    MAX_TIME_LIMIT_SECS, MIN_TIME_LIMIT_SECS,
};
