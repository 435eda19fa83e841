//! Grid packer: the end-to-end solve operation.
//!
//! [`GridPacker::pack`] validates its inputs, builds the placement model,
//! drives a [`SearchEngine`] with an [`IncrementalTracker`] as the solution
//! callback, and assembles the outcome into a [`PackingResult`].

use crate::decomposition::DecompositionCache;
use crate::model_builder::{validate_shapes, ModelBuilder};
use crate::tracker::{IncrementalTracker, RetainedSolution};
use polypack_core::{
    Board, BranchAndBound, Config, EngineStatus, PackingResult, PackingStatus, Result,
    SearchEngine, SearchParams, Shape, Solver,
};
use std::collections::HashSet;
use std::time::Instant;

/// Packs polyomino instances onto a grid by searching a constraint model.
#[derive(Debug, Clone)]
pub struct GridPacker<E = BranchAndBound> {
    config: Config,
    engine: E,
}

impl GridPacker<BranchAndBound> {
    /// Creates a packer using the built-in branch-and-bound engine.
    pub fn new(config: Config) -> Self {
        Self::with_engine(config, BranchAndBound::new())
    }

    /// Creates a packer with default configuration.
    pub fn default_config() -> Self {
        Self::new(Config::default())
    }
}

impl<E: SearchEngine> GridPacker<E> {
    /// Creates a packer searching with `engine`.
    pub fn with_engine(config: Config, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Packs `shapes` onto `board`, forcing instances named in `pinned` into
    /// the layout.
    pub fn pack(
        &self,
        shapes: &[Shape],
        board: &Board,
        pinned: &[String],
    ) -> Result<PackingResult> {
        let start = Instant::now();
        self.config.validate()?;
        board.validate()?;
        validate_shapes(shapes)?;
        warn_unknown_pins(shapes, pinned);

        if !board.has_admissible_cells() {
            log::info!(
                "board {}x{} has no admissible cells; {} instances left unplaced",
                board.width(),
                board.height(),
                shapes.len()
            );
            let mut result =
                PackingResult::infeasible(board.size(), shapes.iter().map(|s| s.name()));
            result.computation_time_ms = start.elapsed().as_millis() as u64;
            return Ok(result);
        }

        let mut cache = DecompositionCache::new();
        let placement = ModelBuilder::new(shapes, board)
            .with_pinned(pinned)
            .with_symmetry_breaking(self.config.symmetry_breaking)
            .build(&mut cache)?;

        let mut tracker =
            IncrementalTracker::new(shapes, &placement.instances, board.admissible_count())
                .with_early_stop(self.config.early_stop);

        let total_area: u64 = shapes.iter().map(Shape::area).sum();
        let params = SearchParams {
            time_limit: self.config.time_limit(),
            num_workers: self.config.worker_count(),
        };
        log::info!(
            "packing {} instances (area {}) into {} admissible cells: strategy {}",
            shapes.len(),
            total_area,
            board.admissible_count(),
            tracker.plan()
        );
        log::info!(
            "searching with {} (time limit {:?}, worker hint {})",
            self.engine.name(),
            params.time_limit,
            params.num_workers
        );

        let response = self
            .engine
            .search(&placement.model, &params, &mut |view| tracker.offer(view));

        if response.status == EngineStatus::Feasible || response.status == EngineStatus::Unknown {
            log::debug!("engine ended without proof: {}", response.message);
        }

        let perfect = tracker.perfect_found();
        let mut result = assemble(
            response.status,
            tracker.into_best(),
            perfect,
            shapes,
            board.size(),
        );
        result.engine = Some(self.engine.name().to_string());
        result.computation_time_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "packing finished: {} with {}/{} placed (area {}) in {}ms ({} nodes, {} solutions)",
            result.status,
            result.placed_count(),
            result.total_count(),
            result.filled_area(),
            result.computation_time_ms,
            response.nodes_explored,
            response.solutions_found
        );
        Ok(result)
    }
}

impl<E: SearchEngine> Solver for GridPacker<E> {
    fn solve(&self, shapes: &[Shape], board: &Board, pinned: &[String]) -> Result<PackingResult> {
        self.pack(shapes, board, pinned)
    }
}

/// Maps an engine's terminal status and the retained solution to a result.
///
/// A retained solution is always reported, as `Optimal` when the engine proved
/// it or when it is perfect, and `Feasible` otherwise. A perfect layout either
/// places every instance or fills every admissible cell, so no layout covers
/// more. Without a solution, every instance is unplaced and the engine status
/// carries over.
pub fn assemble(
    status: EngineStatus,
    retained: Option<RetainedSolution>,
    perfect: bool,
    shapes: &[Shape],
    board_size: (i32, i32),
) -> PackingResult {
    let names = shapes.iter().map(|s| s.name());
    match retained {
        Some(solution) => {
            let status = match status {
                EngineStatus::Optimal => PackingStatus::Optimal,
                _ if perfect => PackingStatus::Optimal,
                _ => PackingStatus::Feasible,
            };
            let mut result = PackingResult::new(board_size, status);
            result.perfect = perfect;
            result.placed_shapes = solution.placed_shapes;
            result.unplaced_shapes = solution.unplaced_shapes;
            result
        }
        None => {
            let status = match status {
                EngineStatus::Infeasible => PackingStatus::Infeasible,
                EngineStatus::ModelInvalid => PackingStatus::ModelInvalid,
                EngineStatus::Unknown => PackingStatus::Unknown,
                EngineStatus::Optimal | EngineStatus::Feasible => {
                    log::warn!("engine reported {} without offering a solution", status);
                    PackingStatus::Unknown
                }
            };
            PackingResult::unsolved(board_size, status, names)
        }
    }
}

fn warn_unknown_pins(shapes: &[Shape], pinned: &[String]) {
    let names: HashSet<&str> = shapes.iter().map(Shape::name).collect();
    for name in pinned {
        if !names.contains(name.as_str()) {
            log::warn!(
                "pinned shape '{}' is not among the requested instances",
                name
            );
        }
    }
}
