//! Incremental best-solution tracking during a search.
//!
//! One [`IncrementalTracker`] lives for exactly one engine call. The engine
//! offers it every solution it finds; the tracker keeps the candidate with the
//! largest filled area and asks the engine to stop once a perfect layout has
//! been seen.

use crate::model_builder::InstanceVars;
use polypack_core::{PlacedShape, SearchControl, Shape, SolutionView};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What counts as a perfect layout for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchPlan {
    /// Every instance fits by area: perfect means every instance is placed.
    PackEverything,
    /// The request exceeds the board: perfect means every admissible cell is filled.
    FillBoard,
}

impl SearchPlan {
    /// Chooses the plan by comparing the requested area to the admissible area.
    pub fn classify(total_area: u64, admissible_count: u64) -> Self {
        if total_area <= admissible_count {
            Self::PackEverything
        } else {
            Self::FillBoard
        }
    }

    /// Whether a candidate with the given counts is perfect.
    pub fn is_perfect(
        self,
        placed_count: usize,
        instance_count: usize,
        filled_area: u64,
        admissible_count: u64,
    ) -> bool {
        match self {
            Self::PackEverything => placed_count == instance_count,
            Self::FillBoard => filled_area == admissible_count,
        }
    }
}

impl fmt::Display for SearchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PackEverything => write!(f, "P0 (pack everything)"),
            Self::FillBoard => write!(f, "P1 (fill the board)"),
        }
    }
}

/// A candidate layout materialized from an engine assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedSolution {
    pub placed_shapes: Vec<PlacedShape>,
    pub unplaced_shapes: Vec<String>,
    pub filled_area: u64,
}

/// Keeps the best-by-area solution offered during one search.
///
/// Offers must arrive one at a time, which the `&mut self` receiver and the
/// engine callback contract both guarantee.
#[derive(Debug)]
pub struct IncrementalTracker<'a> {
    shapes: &'a [Shape],
    instances: &'a [InstanceVars],
    plan: SearchPlan,
    admissible_count: u64,
    early_stop: bool,
    best: Option<RetainedSolution>,
    perfect: bool,
    offers: u64,
}

impl<'a> IncrementalTracker<'a> {
    /// Creates a tracker for `instances` over `shapes` on a board with
    /// `admissible_count` admissible cells.
    pub fn new(shapes: &'a [Shape], instances: &'a [InstanceVars], admissible_count: u64) -> Self {
        let total_area: u64 = instances.iter().map(|i| shapes[i.index].area()).sum();
        Self {
            shapes,
            instances,
            plan: SearchPlan::classify(total_area, admissible_count),
            admissible_count,
            early_stop: true,
            best: None,
            perfect: false,
            offers: 0,
        }
    }

    /// Enables or disables stopping on a perfect layout.
    pub fn with_early_stop(mut self, enable: bool) -> Self {
        self.early_stop = enable;
        self
    }

    pub fn plan(&self) -> SearchPlan {
        self.plan
    }

    /// Area of the retained solution.
    pub fn best_area(&self) -> Option<u64> {
        self.best.as_ref().map(|b| b.filled_area)
    }

    pub fn best(&self) -> Option<&RetainedSolution> {
        self.best.as_ref()
    }

    /// Whether a perfect layout stopped the search.
    pub fn perfect_found(&self) -> bool {
        self.perfect
    }

    /// Number of candidates offered so far.
    pub fn offers(&self) -> u64 {
        self.offers
    }

    /// Considers a candidate and tells the engine whether to go on.
    pub fn offer(&mut self, view: &dyn SolutionView) -> SearchControl {
        self.offers += 1;

        let mut placed_count = 0;
        let mut filled_area = 0;
        for inst in self.instances {
            if view.boolean_value(inst.is_used) {
                placed_count += 1;
                filled_area += self.shapes[inst.index].area();
            }
        }

        if self.best_area().map_or(true, |best| filled_area > best) {
            self.best = Some(self.materialize(view, filled_area));
            log::debug!(
                "retained layout: area {} with {}/{} instances placed after {:?}",
                filled_area,
                placed_count,
                self.instances.len(),
                view.wall_time()
            );
        }

        let perfect = self.plan.is_perfect(
            placed_count,
            self.instances.len(),
            filled_area,
            self.admissible_count,
        );
        if !(perfect && self.early_stop) {
            return SearchControl::Continue;
        }

        // A perfect candidate has the largest reachable area, so it is the one retained.
        let retained = self.best_area();
        debug_assert_eq!(retained, Some(filled_area));
        if retained != Some(filled_area) {
            log::error!(
                "perfect layout with area {} differs from retained area {:?}",
                filled_area,
                retained
            );
        }

        self.perfect = true;
        log::info!(
            "perfect layout under {} (area {}, {} placed); stopping search",
            self.plan,
            filled_area,
            placed_count
        );
        SearchControl::Stop
    }

    /// Consumes the tracker, returning the retained solution.
    pub fn into_best(self) -> Option<RetainedSolution> {
        self.best
    }

    fn materialize(&self, view: &dyn SolutionView, filled_area: u64) -> RetainedSolution {
        let mut placed_shapes = Vec::new();
        let mut unplaced_shapes = Vec::new();
        for inst in self.instances {
            let shape = &self.shapes[inst.index];
            if view.boolean_value(inst.is_used) {
                placed_shapes.push(PlacedShape::new(
                    shape,
                    view.value(inst.x) as i32,
                    view.value(inst.y) as i32,
                ));
            } else {
                unplaced_shapes.push(shape.name().to_string());
            }
        }
        RetainedSolution {
            placed_shapes,
            unplaced_shapes,
            filled_area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::DecompositionCache;
    use crate::model_builder::ModelBuilder;
    use polypack_core::{Board, VarId};
    use std::time::Duration;

    struct FixedView(Vec<i64>);

    impl SolutionView for FixedView {
        fn value(&self, var: VarId) -> i64 {
            self.0[var.index()]
        }

        fn objective_value(&self) -> i64 {
            0
        }

        fn wall_time(&self) -> Duration {
            Duration::ZERO
        }
    }

    fn dots(n: usize) -> Vec<Shape> {
        (0..n)
            .map(|_| Shape::new("dot", vec![(0, 0)], "black").unwrap())
            .collect()
    }

    fn instances(shapes: &[Shape], board: &Board) -> Vec<InstanceVars> {
        let mut cache = DecompositionCache::new();
        ModelBuilder::new(shapes, board)
            .build(&mut cache)
            .unwrap()
            .instances
    }

    #[test]
    fn test_plan_classification() {
        assert_eq!(SearchPlan::classify(4, 81), SearchPlan::PackEverything);
        assert_eq!(SearchPlan::classify(81, 81), SearchPlan::PackEverything);
        assert_eq!(SearchPlan::classify(82, 81), SearchPlan::FillBoard);
        assert!(SearchPlan::FillBoard.is_perfect(1, 2, 9, 9));
        assert!(!SearchPlan::PackEverything.is_perfect(1, 2, 9, 9));
    }

    #[test]
    fn test_retains_strict_improvements_only() {
        let shapes = dots(3);
        let board = Board::new(4, 4);
        let insts = instances(&shapes, &board);
        let mut tracker = IncrementalTracker::new(&shapes, &insts, board.admissible_count());

        // Layout per instance: is_used, x, y.
        let first = FixedView(vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
        let tie = FixedView(vec![0, 0, 0, 1, 3, 3, 0, 0, 0]);
        let better = FixedView(vec![1, 0, 0, 1, 1, 0, 0, 0, 0]);

        assert_eq!(tracker.offer(&first), SearchControl::Continue);
        assert_eq!(tracker.best_area(), Some(1));
        assert_eq!(tracker.offer(&tie), SearchControl::Continue);
        assert_eq!(tracker.best().unwrap().placed_shapes[0].x, 0);
        assert_eq!(tracker.offer(&better), SearchControl::Continue);
        assert_eq!(tracker.best_area(), Some(2));
        assert_eq!(tracker.offers(), 3);

        let best = tracker.into_best().unwrap();
        assert_eq!(best.placed_shapes.len(), 2);
        assert_eq!(best.unplaced_shapes, vec!["dot".to_string()]);
    }

    #[test]
    fn test_first_empty_candidate_is_retained() {
        let shapes = dots(1);
        let board = Board::new(2, 2);
        let insts = instances(&shapes, &board);
        let mut tracker = IncrementalTracker::new(&shapes, &insts, board.admissible_count());
        tracker.offer(&FixedView(vec![0, 0, 0]));
        assert_eq!(tracker.best_area(), Some(0));
        assert!(!tracker.perfect_found());
    }

    #[test]
    fn test_pack_everything_stops() {
        let shapes = dots(2);
        let board = Board::new(3, 3);
        let insts = instances(&shapes, &board);
        let mut tracker = IncrementalTracker::new(&shapes, &insts, board.admissible_count());
        assert_eq!(tracker.plan(), SearchPlan::PackEverything);

        let all = FixedView(vec![1, 0, 0, 1, 2, 2]);
        assert_eq!(tracker.offer(&all), SearchControl::Stop);
        assert!(tracker.perfect_found());
        assert_eq!(tracker.best_area(), Some(2));
    }

    #[test]
    fn test_fill_board_stops() {
        let shapes = dots(2);
        let board = Board::with_admissible_cells(3, 3, vec![(1, 1)]);
        let insts = instances(&shapes, &board);
        let mut tracker = IncrementalTracker::new(&shapes, &insts, board.admissible_count());
        assert_eq!(tracker.plan(), SearchPlan::FillBoard);

        let one = FixedView(vec![1, 1, 1, 0, 0, 0]);
        assert_eq!(tracker.offer(&one), SearchControl::Stop);
        let best = tracker.into_best().unwrap();
        let cells: Vec<_> = best.placed_shapes[0].cells().collect();
        assert_eq!(cells, vec![(1, 1)]);
    }

    #[test]
    fn test_early_stop_disabled() {
        let shapes = dots(1);
        let board = Board::new(2, 2);
        let insts = instances(&shapes, &board);
        let mut tracker = IncrementalTracker::new(&shapes, &insts, board.admissible_count())
            .with_early_stop(false);
        let control = tracker.offer(&FixedView(vec![1, 0, 0]));
        assert_eq!(control, SearchControl::Continue);
        assert!(!tracker.perfect_found());
    }
}
