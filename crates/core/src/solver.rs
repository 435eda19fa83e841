//! Solver trait and configuration.

use crate::board::Board;
use crate::result::PackingResult;
use crate::shape::Shape;
use crate::{Error, Result};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shortest time limit accepted from a front end, in seconds.
pub const MIN_TIME_LIMIT_SECS: u64 = 10;

/// Longest time limit accepted from a front end, in seconds.
pub const MAX_TIME_LIMIT_SECS: u64 = 300;

/// Clamps a caller-supplied time limit into `[MIN_TIME_LIMIT_SECS, MAX_TIME_LIMIT_SECS]`.
pub fn clamp_time_limit_secs(secs: u64) -> u64 {
    secs.clamp(MIN_TIME_LIMIT_SECS, MAX_TIME_LIMIT_SECS)
}

/// Longest time limit a [`Config`] accepts, in milliseconds (five hours).
pub const MAX_CONFIG_TIME_LIMIT_MS: u64 = 5 * 60 * 60 * 1000;

/// Worker count used when none is configured: half the logical cores, at least one.
pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / 2).max(1)
}

/// Common configuration for packing solvers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Maximum computation time in milliseconds (0 = unlimited).
    pub time_limit_ms: u64,

    /// Number of search workers to request (0 = auto).
    pub threads: usize,

    /// Whether interchangeable instances are ordered by x coordinate.
    pub symmetry_breaking: bool,

    /// Whether the search stops as soon as a perfect layout is found.
    pub early_stop: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_limit_ms: 30_000,
            threads: 0,
            symmetry_breaking: true,
            early_stop: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the time limit in seconds, clamped to the front-end range.
    pub fn with_time_limit_secs(mut self, secs: u64) -> Self {
        self.time_limit_ms = clamp_time_limit_secs(secs) * 1000;
        self
    }

    /// Sets the number of search workers (0 = auto).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enables or disables symmetry breaking between identical instances.
    pub fn with_symmetry_breaking(mut self, enable: bool) -> Self {
        self.symmetry_breaking = enable;
        self
    }

    /// Enables or disables the perfect-layout early stop.
    pub fn with_early_stop(mut self, enable: bool) -> Self {
        self.early_stop = enable;
        self
    }

    /// Time limit as a duration, `None` when unlimited.
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit_ms > 0)
            .then(|| Duration::from_millis(self.time_limit_ms))
    }

    /// Worker-count hint passed to the engine.
    pub fn worker_count(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            default_worker_count()
        }
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit_ms > MAX_CONFIG_TIME_LIMIT_MS {
            return Err(Error::ConfigError(format!(
                "time limit of {}ms is unreasonably long",
                self.time_limit_ms
            )));
        }
        Ok(())
    }
}

/// Trait for packing solvers.
pub trait Solver {
    /// Packs `shapes` onto `board`, forcing every instance named in `pinned`
    /// into the layout.
    ///
    /// Returns `Err` only for invalid input; search outcomes are reported in
    /// [`PackingResult::status`].
    fn solve(&self, shapes: &[Shape], board: &Board, pinned: &[String]) -> Result<PackingResult>;
}
