//! Solving-capability interface.
//!
//! A [`SearchEngine`] receives a [`CpModel`], a time budget and a worker-count
//! hint, reports every improving assignment it finds through a callback, and
//! finishes with an [`EngineResponse`]. The packer only depends on this trait;
//! how an engine searches is its own business.
//!
//! The callback is passed as `&mut dyn FnMut`, so an engine can never invoke it
//! from two threads at once. Engines that search in parallel must serialize
//! their calls. Returning [`SearchControl::Stop`] is the only way to end a
//! search early.

use crate::model::{CpModel, VarId};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Terminal status reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EngineStatus {
    /// Best solution is proven optimal.
    Optimal,
    /// A solution was found but optimality was not proven.
    Feasible,
    /// The model has no solution.
    Infeasible,
    /// The search ended without a solution or a proof.
    #[default]
    Unknown,
    /// The model was rejected before searching.
    ModelInvalid,
}

impl std::fmt::Display for EngineStatus {
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

/// Decision returned by the solution callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchControl {
    Continue,
    Stop,
}

/// Read access to the assignment an engine just found.
pub trait SolutionView {
    /// Value of `var` in the current assignment.
    fn value(&self, var: VarId) -> i64;

    /// Objective value of the current assignment.
    fn objective_value(&self) -> i64;

    /// Time since the search started.
    fn wall_time(&self) -> Duration;

    /// Value of a 0/1 variable.
    fn boolean_value(&self, var: VarId) -> bool {
        self.value(var) != 0
    }
}

/// Search parameters fixed at call start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Wall-clock budget (`None` = unlimited).
    pub time_limit: Option<Duration>,
    /// Worker-count hint; engines may use fewer workers.
    pub num_workers: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            time_limit: None,
            num_workers: 1,
        }
    }
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Sets the worker-count hint (at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.max(1);
        self
    }
}

/// Final report of an engine call.
#[derive(Debug, Clone, Default)]
pub struct EngineResponse {
    pub status: EngineStatus,

    /// Objective value of the best solution found.
    pub objective_value: Option<i64>,

    /// Best proven upper bound on the objective.
    pub best_bound: Option<i64>,

    /// Time spent searching.
    pub wall_time: Duration,

    /// Number of solutions reported through the callback.
    pub solutions_found: u64,

    /// Number of search nodes explored.
    pub nodes_explored: u64,

    /// Engine-specific status message.
    pub message: String,
}

impl EngineResponse {
    /// A proven optimal outcome.
    pub fn optimal(objective: i64) -> Self {
        Self {
            status: EngineStatus::Optimal,
            objective_value: Some(objective),
            best_bound: Some(objective),
            message: "Optimal solution found".to_string(),
            ..Default::default()
        }
    }

    /// A solution without optimality proof.
    pub fn feasible(objective: i64, bound: i64) -> Self {
        Self {
            status: EngineStatus::Feasible,
            objective_value: Some(objective),
            best_bound: Some(bound),
            message: format!(
                "Feasible solution found (objective {}, bound {})",
                objective, bound
            ),
            ..Default::default()
        }
    }

    /// The model has no solution.
    pub fn infeasible() -> Self {
        Self {
            status: EngineStatus::Infeasible,
            message: "Problem is infeasible".to_string(),
            ..Default::default()
        }
    }

    /// Nothing found before the search ended.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Unknown,
            message: message.into(),
            ..Default::default()
        }
    }

    /// The model was rejected.
    pub fn model_invalid(message: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::ModelInvalid,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Sets search statistics.
    pub fn with_stats(mut self, nodes: u64, solutions: u64) -> Self {
        self.nodes_explored = nodes;
        self.solutions_found = solutions;
        self
    }

    /// Sets the wall time.
    pub fn with_wall_time(mut self, wall_time: Duration) -> Self {
        self.wall_time = wall_time;
        self
    }
}

/// A constraint engine able to search a [`CpModel`].
pub trait SearchEngine {
    /// Short engine name used in logs and results.
    fn name(&self) -> &str;

    /// Searches `model`, calling `on_solution` for each improving assignment.
    fn search(
        &self,
        model: &CpModel,
        params: &SearchParams,
        on_solution: &mut dyn FnMut(&dyn SolutionView) -> SearchControl,
    ) -> EngineResponse;
}
