//! Built-in depth-first branch-and-bound engine.
//!
//! Variables are branched in declaration order. Values are tried from the top
//! of the domain for variables with a positive objective coefficient and from
//! the bottom otherwise, so the first dive already produces a greedy solution.
//! A constraint is checked whenever one of its variables gets a value:
//!
//! - linear constraints by interval reasoning over the remaining domains,
//! - table constraints by looking for an allowed value in the expression range,
//! - no-overlap boxes pairwise once position and presence are known.
//!
//! A variable that neither the objective nor any active constraint depends on,
//! such as the position of a shape already left out, is fixed to its lower
//! bound instead of being branched on.
//!
//! Branches whose optimistic objective cannot beat the incumbent are cut, so
//! only strictly improving solutions reach the callback. The search runs on
//! the calling thread; the worker hint is only logged.

use crate::engine::{EngineResponse, SearchControl, SearchEngine, SearchParams, SolutionView};
use crate::model::{Constraint, CpModel, LinearExpr, OptionalBox, Relation, VarId};
use std::time::{Duration, Instant};

/// Depth-first branch-and-bound over a [`CpModel`].
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    check_interval: u64,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self { check_interval: 64 }
    }
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many nodes are explored between two deadline checks.
    pub fn with_check_interval(mut self, nodes: u64) -> Self {
        self.check_interval = nodes.max(1);
        self
    }
}

impl SearchEngine for BranchAndBound {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    fn search(
        &self,
        model: &CpModel,
        params: &SearchParams,
        on_solution: &mut dyn FnMut(&dyn SolutionView) -> SearchControl,
    ) -> EngineResponse {
        let start = Instant::now();

        if let Err(e) = model.validate() {
            log::error!("branch-and-bound rejected model: {}", e);
            return EngineResponse::model_invalid(e.to_string())
                .with_wall_time(start.elapsed());
        }
        if params.num_workers > 1 {
            log::debug!(
                "branch-and-bound searches on one thread (hint: {} workers)",
                params.num_workers
            );
        }

        let mut search = Search::new(model, params, start, self.check_interval, on_solution);
        if search.root_consistent() {
            search.dfs(0);
        }
        search.finish()
    }
}

/// Current state of a constraint's enforcement literals.
enum Enforcement {
    Active,
    Inactive,
    Pending,
}

struct AssignmentView<'v> {
    values: &'v [Option<i64>],
    objective: i64,
    elapsed: Duration,
}

impl SolutionView for AssignmentView<'_> {
    fn value(&self, var: VarId) -> i64 {
        self.values
            .get(var.index())
            .copied()
            .flatten()
            .unwrap_or_default()
    }

    fn objective_value(&self) -> i64 {
        self.objective
    }

    fn wall_time(&self) -> Duration {
        self.elapsed
    }
}

struct Search<'m, 'f> {
    model: &'m CpModel,
    values: Vec<Option<i64>>,
    /// Per variable: linear and table constraints mentioning it.
    watches: Vec<Vec<usize>>,
    /// Per variable: `(constraint, box)` pairs mentioning it.
    box_watches: Vec<Vec<(usize, usize)>>,
    objective_coef: Vec<i64>,
    /// Objective upper bound under the current partial assignment.
    optimistic: i64,
    /// Objective upper bound at the root.
    upper_bound: i64,
    best: Option<i64>,
    start: Instant,
    deadline: Option<Instant>,
    check_interval: u64,
    nodes: u64,
    solutions: u64,
    stop_requested: bool,
    timed_out: bool,
    proven: bool,
    on_solution: &'f mut dyn FnMut(&dyn SolutionView) -> SearchControl,
}

impl<'m, 'f> Search<'m, 'f> {
    fn new(
        model: &'m CpModel,
        params: &SearchParams,
        start: Instant,
        check_interval: u64,
        on_solution: &'f mut dyn FnMut(&dyn SolutionView) -> SearchControl,
    ) -> Self {
        let n = model.num_vars();
        let mut watches = vec![Vec::new(); n];
        let mut box_watches = vec![Vec::new(); n];

        for (ci, constraint) in model.constraints().iter().enumerate() {
            match constraint {
                Constraint::NoOverlap2D { boxes } => {
                    for (bi, b) in boxes.iter().enumerate() {
                        let mut vars: Vec<VarId> = b
                            .x_start
                            .vars()
                            .chain(b.y_start.vars())
                            .chain(std::iter::once(b.presence))
                            .collect();
                        vars.sort_unstable();
                        vars.dedup();
                        for v in vars {
                            box_watches[v.index()].push((ci, bi));
                        }
                    }
                }
                _ => {
                    for v in constraint.vars() {
                        watches[v.index()].push(ci);
                    }
                }
            }
        }

        let mut objective_coef = vec![0i64; n];
        let mut optimistic = 0;
        if let Some(objective) = model.objective() {
            for &(v, c) in &objective.terms {
                objective_coef[v.index()] += c;
            }
            optimistic = model.expr_bounds(objective).1;
        }

        Self {
            model,
            values: vec![None; n],
            watches,
            box_watches,
            objective_coef,
            optimistic,
            upper_bound: optimistic,
            best: None,
            start,
            deadline: params.time_limit.and_then(|d| start.checked_add(d)),
            check_interval,
            nodes: 0,
            solutions: 0,
            stop_requested: false,
            timed_out: false,
            proven: false,
            on_solution,
        }
    }

    /// Checks constraints that mention no variable at all.
    fn root_consistent(&self) -> bool {
        self.model
            .constraints()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.vars().is_empty())
            .all(|(ci, _)| self.check_constraint(ci))
    }

    fn halted(&self) -> bool {
        self.stop_requested || self.timed_out || self.proven
    }

    fn dfs(&mut self, depth: usize) {
        if depth == self.values.len() {
            self.on_leaf();
            return;
        }
        if let Some(best) = self.best {
            if self.optimistic <= best {
                return;
            }
        }

        let var = VarId::from_index(depth);
        let (lo, hi) = {
            let decl = self.model.var(var);
            (decl.lo, decl.hi)
        };
        // Every value of a free variable leads to the same subtree.
        let hi = if self.is_free(var) { lo } else { hi };
        let descending = self.objective_coef[depth] > 0;

        for k in 0..=(hi - lo) {
            if self.halted() {
                return;
            }
            self.nodes += 1;
            if self.nodes % self.check_interval == 0 && self.deadline_passed() {
                self.timed_out = true;
                return;
            }

            let value = if descending { hi - k } else { lo + k };
            self.assign(var, value);
            if self.consistent(var) {
                self.dfs(depth + 1);
            }
            self.unassign(var, value);
        }
    }

    /// Whether no objective term and no active constraint depends on `var`.
    fn is_free(&self, var: VarId) -> bool {
        let i = var.index();
        let constraints = self.model.constraints();
        self.objective_coef[i] == 0
            && self.watches[i].iter().all(|&ci| {
                matches!(
                    self.enforcement(constraints[ci].enforcement()),
                    Enforcement::Inactive
                )
            })
            && self.box_watches[i]
                .iter()
                .all(|&(ci, bi)| match &constraints[ci] {
                    Constraint::NoOverlap2D { boxes } => {
                        self.values[boxes[bi].presence.index()] == Some(0)
                    }
                    _ => true,
                })
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn assign(&mut self, var: VarId, value: i64) {
        let i = var.index();
        self.values[i] = Some(value);
        self.optimistic -= self.slack(i, value);
    }

    fn unassign(&mut self, var: VarId, value: i64) {
        let i = var.index();
        self.values[i] = None;
        self.optimistic += self.slack(i, value);
    }

    /// Objective loss of fixing variable `i` to `value` instead of its best bound.
    fn slack(&self, i: usize, value: i64) -> i64 {
        let c = self.objective_coef[i];
        if c == 0 {
            return 0;
        }
        let decl = &self.model.vars()[i];
        (c * decl.lo).max(c * decl.hi) - c * value
    }

    fn on_leaf(&mut self) {
        // Every variable is fixed, so the optimistic bound is the exact objective.
        let objective = self.optimistic;
        if self.best.is_some_and(|best| objective <= best) {
            return;
        }
        self.best = Some(objective);
        self.solutions += 1;

        let view = AssignmentView {
            values: &self.values,
            objective,
            elapsed: self.start.elapsed(),
        };
        if (self.on_solution)(&view) == SearchControl::Stop {
            self.stop_requested = true;
        }
        if objective >= self.upper_bound {
            self.proven = true;
        }
    }

    fn consistent(&self, var: VarId) -> bool {
        let i = var.index();
        self.watches[i].iter().all(|&ci| self.check_constraint(ci))
            && self.box_watches[i]
                .iter()
                .all(|&(ci, bi)| self.check_box(ci, bi))
    }

    fn enforcement(&self, literals: &[VarId]) -> Enforcement {
        let mut pending = false;
        for lit in literals {
            match self.values[lit.index()] {
                Some(0) => return Enforcement::Inactive,
                Some(_) => {}
                None => pending = true,
            }
        }
        if pending {
            Enforcement::Pending
        } else {
            Enforcement::Active
        }
    }

    /// Range of `expr` under the current partial assignment.
    fn current_bounds(&self, expr: &LinearExpr) -> (i64, i64) {
        let (mut lo, mut hi) = (expr.constant, expr.constant);
        for &(v, c) in &expr.terms {
            match self.values[v.index()] {
                Some(value) => {
                    lo += c * value;
                    hi += c * value;
                }
                None => {
                    let decl = self.model.var(v);
                    let (a, b) = (c * decl.lo, c * decl.hi);
                    lo += a.min(b);
                    hi += a.max(b);
                }
            }
        }
        (lo, hi)
    }

    fn check_constraint(&self, ci: usize) -> bool {
        match &self.model.constraints()[ci] {
            Constraint::Linear {
                expr,
                relation,
                rhs,
                enforce,
            } => {
                if !matches!(self.enforcement(enforce), Enforcement::Active) {
                    return true;
                }
                let (lo, hi) = self.current_bounds(expr);
                match relation {
                    Relation::Le => lo <= *rhs,
                    Relation::Ge => hi >= *rhs,
                    Relation::Eq => lo <= *rhs && hi >= *rhs,
                }
            }
            Constraint::AllowedValues {
                expr,
                allowed,
                enforce,
            } => {
                if !matches!(self.enforcement(enforce), Enforcement::Active) {
                    return true;
                }
                let (lo, hi) = self.current_bounds(expr);
                allowed.range(lo..=hi).next().is_some()
            }
            Constraint::NoOverlap2D { .. } => true,
        }
    }

    /// Position of a box that is present and fully placed.
    fn fixed_box(&self, b: &OptionalBox) -> Option<(i64, i64)> {
        if self.values[b.presence.index()]? == 0 {
            return None;
        }
        let (x, x_hi) = self.current_bounds(&b.x_start);
        let (y, y_hi) = self.current_bounds(&b.y_start);
        let fixed = |e: &LinearExpr| e.vars().all(|v| self.values[v.index()].is_some());
        if x != x_hi || y != y_hi || !fixed(&b.x_start) || !fixed(&b.y_start) {
            return None;
        }
        Some((x, y))
    }

    fn check_box(&self, ci: usize, bi: usize) -> bool {
        let Constraint::NoOverlap2D { boxes } = &self.model.constraints()[ci] else {
            return true;
        };
        let b = &boxes[bi];
        let Some((x, y)) = self.fixed_box(b) else {
            return true;
        };

        boxes.iter().enumerate().all(|(oi, other)| {
            if oi == bi {
                return true;
            }
            match self.fixed_box(other) {
                Some((ox, oy)) => {
                    let x_disjoint = x + b.width <= ox || ox + other.width <= x;
                    let y_disjoint = y + b.height <= oy || oy + other.height <= y;
                    x_disjoint || y_disjoint
                }
                None => true,
            }
        })
    }

    fn finish(self) -> EngineResponse {
        let wall_time = self.start.elapsed();
        let response = if self.proven {
            EngineResponse::optimal(self.best.unwrap_or(self.upper_bound))
        } else if self.stop_requested || self.timed_out {
            match self.best {
                Some(best) => EngineResponse::feasible(best, self.upper_bound),
                None => EngineResponse::unknown("time limit reached before any solution"),
            }
        } else {
            match self.best {
                Some(best) => EngineResponse::optimal(best),
                None => EngineResponse::infeasible(),
            }
        };

        log::debug!(
            "branch-and-bound finished: {} after {} nodes, {} solutions, {:?}",
            response.status,
            self.nodes,
            self.solutions,
            wall_time
        );
        response
            .with_stats(self.nodes, self.solutions)
            .with_wall_time(wall_time)
    }
}
