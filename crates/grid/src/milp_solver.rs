//! MILP search engine backed by `good_lp`.
//!
//! The constraint model is linearised and handed to the HiGHS solver:
//!
//! - enforced linear constraints get big-M slack on their enforcement literals,
//! - table constraints pick exactly one allowed value through selector binaries,
//! - each pair of optional boxes needs one of four separation binaries whenever
//!   both boxes are present.
//!
//! HiGHS is run to completion and its solution is reported through the callback
//! once. The time limit is not forwarded.

use polypack_core::{
    CpModel, EngineResponse, SearchControl, SearchEngine, SearchParams, SolutionView,
};

#[cfg(feature = "milp")]
use polypack_core::{Constraint, LinearExpr, OptionalBox, Relation, VarId};

#[cfg(feature = "milp")]
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};

#[cfg(feature = "milp")]
use std::time::{Duration, Instant};

/// Exact engine solving the linearised model with HiGHS.
#[derive(Debug, Clone, Default)]
pub struct MilpEngine;

impl MilpEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SearchEngine for MilpEngine {
    fn name(&self) -> &str {
        "milp"
    }

    #[cfg(feature = "milp")]
    fn search(
        &self,
        model: &CpModel,
        params: &SearchParams,
        on_solution: &mut dyn FnMut(&dyn SolutionView) -> SearchControl,
    ) -> EngineResponse {
        let start = Instant::now();
        if let Err(e) = model.validate() {
            log::error!("MILP engine rejected model: {}", e);
            return EngineResponse::model_invalid(e.to_string())
                .with_wall_time(start.elapsed());
        }
        if let Some(limit) = params.time_limit {
            log::debug!(
                "MILP engine runs to completion (requested limit {:?})",
                limit
            );
        }

        let mut translation = Translation::new(model);
        for c in model.constraints() {
            translation.add(c);
        }
        log::info!(
            "Solving MILP with {} model variables, {} rows, {} auxiliary binaries",
            model.num_vars(),
            translation.rows.len(),
            translation.auxiliary
        );

        let Translation {
            vars, lp, rows, ..
        } = translation;
        let objective = model
            .objective()
            .map_or_else(|| Expression::from(0.0), |o| to_expression(o, &lp));
        let mut problem = vars.maximise(objective).using(default_solver);
        for row in rows {
            problem = problem.with(row);
        }

        match problem.solve() {
            Ok(solution) => {
                let values: Vec<i64> = lp
                    .iter()
                    .map(|&v| solution.value(v).round() as i64)
                    .collect();
                let objective = model
                    .objective()
                    .map_or(0, |o| o.eval(|v| values[v.index()]));
                let view = MilpView {
                    values: &values,
                    objective,
                    elapsed: start.elapsed(),
                };
                // The search is already over; a stop request changes nothing.
                let _ = on_solution(&view);
                EngineResponse::optimal(objective)
                    .with_stats(0, 1)
                    .with_wall_time(start.elapsed())
            }
            Err(ResolutionError::Infeasible) => {
                EngineResponse::infeasible().with_wall_time(start.elapsed())
            }
            Err(e) => {
                log::error!("MILP solver error: {:?}", e);
                EngineResponse::unknown(format!("{:?}", e))
                    .with_wall_time(start.elapsed())
            }
        }
    }

    #[cfg(not(feature = "milp"))]
    fn search(
        &self,
        _model: &CpModel,
        _params: &SearchParams,
        _on_solution: &mut dyn FnMut(&dyn SolutionView) -> SearchControl,
    ) -> EngineResponse {
        log::warn!("MILP solver not available (compile with 'milp' feature)");
        EngineResponse::unknown("MILP solver not available")
    }
}

/// Returns true if MILP solving is compiled in.
pub fn is_milp_available() -> bool {
    cfg!(feature = "milp")
}

#[cfg(feature = "milp")]
struct MilpView<'v> {
    values: &'v [i64],
    objective: i64,
    elapsed: Duration,
}

#[cfg(feature = "milp")]
impl SolutionView for MilpView<'_> {
    fn value(&self, var: VarId) -> i64 {
        self.values.get(var.index()).copied().unwrap_or_default()
    }

    fn objective_value(&self) -> i64 {
        self.objective
    }

    fn wall_time(&self) -> Duration {
        self.elapsed
    }
}

/// Rows and auxiliary variables accumulated before the problem is created.
#[cfg(feature = "milp")]
struct Translation<'m> {
    model: &'m CpModel,
    vars: ProblemVariables,
    lp: Vec<Variable>,
    rows: Vec<good_lp::Constraint>,
    auxiliary: usize,
}

#[cfg(feature = "milp")]
impl<'m> Translation<'m> {
    fn new(model: &'m CpModel) -> Self {
        let mut vars = ProblemVariables::new();
        let lp = model
            .vars()
            .iter()
            .map(|decl| {
                if decl.is_bool {
                    vars.add(variable().binary().name(decl.name.clone()))
                } else {
                    vars.add(
                        variable()
                            .integer()
                            .min(decl.lo as f64)
                            .max(decl.hi as f64)
                            .name(decl.name.clone()),
                    )
                }
            })
            .collect();
        Self {
            model,
            vars,
            lp,
            rows: Vec::new(),
            auxiliary: 0,
        }
    }

    fn binary(&mut self) -> Variable {
        self.auxiliary += 1;
        self.vars.add(variable().binary())
    }

    fn expr(&self, e: &LinearExpr) -> Expression {
        to_expression(e, &self.lp)
    }

    /// `scale * (k - sum(enforce))`: zero when every literal holds.
    fn slack(&self, enforce: &[VarId], scale: f64) -> Expression {
        enforce.iter().fold(
            Expression::from(scale * enforce.len() as f64),
            |acc, v| acc - scale * self.lp[v.index()],
        )
    }

    fn add(&mut self, c: &Constraint) {
        match c {
            Constraint::Linear {
                expr,
                relation,
                rhs,
                enforce,
            } => self.add_linear(expr, *relation, *rhs, enforce),
            Constraint::AllowedValues {
                expr,
                allowed,
                enforce,
            } => {
                let (lo, hi) = self.model.expr_bounds(expr);
                let candidates: Vec<i64> = allowed.range(lo..=hi).copied().collect();
                self.add_table(expr, &candidates, enforce);
            }
            Constraint::NoOverlap2D { boxes } => {
                for (i, a) in boxes.iter().enumerate() {
                    for b in &boxes[i + 1..] {
                        self.add_box_pair(a, b);
                    }
                }
            }
        }
    }

    fn add_linear(&mut self, expr: &LinearExpr, relation: Relation, rhs: i64, enforce: &[VarId]) {
        let (lo, hi) = self.model.expr_bounds(expr);
        let e = self.expr(expr);
        let rhs_f = rhs as f64;
        if matches!(relation, Relation::Le | Relation::Eq) {
            let big_m = (hi - rhs).max(0) as f64;
            let slack = self.slack(enforce, big_m);
            self.rows.push(constraint!(e.clone() - slack <= rhs_f));
        }
        if matches!(relation, Relation::Ge | Relation::Eq) {
            let big_m = (rhs - lo).max(0) as f64;
            let slack = self.slack(enforce, big_m);
            self.rows.push(constraint!(e + slack >= rhs_f));
        }
    }

    fn add_table(&mut self, expr: &LinearExpr, candidates: &[i64], enforce: &[VarId]) {
        if candidates.is_empty() {
            // Only satisfiable by deactivating the constraint.
            let slack = self.slack(enforce, 1.0);
            self.rows.push(constraint!(slack >= 1.0));
            return;
        }

        let selectors: Vec<Variable> = candidates.iter().map(|_| self.binary()).collect();
        let chosen: Expression = selectors.iter().map(|&z| Expression::from(z)).sum();
        let picked: Expression = candidates
            .iter()
            .zip(&selectors)
            .map(|(&value, &z)| value as f64 * z)
            .sum();

        let (lo, hi) = self.model.expr_bounds(expr);
        let widest = candidates.iter().map(|v| v.abs()).max().unwrap_or(0);
        let big_m = (lo.abs().max(hi.abs()) + widest) as f64;
        let e = self.expr(expr);

        self.rows.push(constraint!(chosen.clone() <= 1.0));
        let active = self.slack(enforce, 1.0);
        self.rows.push(constraint!(chosen + active >= 1.0));
        let slack = self.slack(enforce, big_m);
        self.rows
            .push(constraint!(e.clone() - picked.clone() <= slack.clone()));
        self.rows.push(constraint!(picked - e <= slack));
    }

    fn add_box_pair(&mut self, a: &OptionalBox, b: &OptionalBox) {
        if a.presence == b.presence
            && a.x_start.same_terms(&b.x_start)
            && a.y_start.same_terms(&b.y_start)
        {
            // Boxes of one shape move together; their offsets decide once.
            let dx = b.x_start.constant - a.x_start.constant;
            let dy = b.y_start.constant - a.y_start.constant;
            let separated = dx >= a.width || -dx >= b.width || dy >= a.height || -dy >= b.height;
            if !separated {
                let presence = Expression::from(self.lp[a.presence.index()]);
                self.rows.push(constraint!(presence <= 0.0));
            }
            return;
        }

        let (ax_lo, ax_hi) = self.model.expr_bounds(&a.x_start);
        let (bx_lo, bx_hi) = self.model.expr_bounds(&b.x_start);
        let (ay_lo, ay_hi) = self.model.expr_bounds(&a.y_start);
        let (by_lo, by_hi) = self.model.expr_bounds(&b.y_start);

        let sides = [
            // a left of b, b left of a, a above b, b above a
            (&a.x_start, &b.x_start, a.width, (ax_hi + a.width - bx_lo).max(0)),
            (&b.x_start, &a.x_start, b.width, (bx_hi + b.width - ax_lo).max(0)),
            (&a.y_start, &b.y_start, a.height, (ay_hi + a.height - by_lo).max(0)),
            (&b.y_start, &a.y_start, b.height, (by_hi + b.height - ay_lo).max(0)),
        ];

        let mut any_side = Expression::from(0.0);
        for (first, second, size, big_m) in sides {
            let side = self.binary();
            let big_m = big_m as f64;
            let gap = self.expr(first) - self.expr(second) + size as f64;
            self.rows.push(constraint!(gap <= big_m - big_m * side));
            any_side = any_side + side;
        }

        let pa = self.lp[a.presence.index()];
        let pb = self.lp[b.presence.index()];
        self.rows.push(constraint!(any_side >= pa + pb - 1.0));
    }
}

#[cfg(feature = "milp")]
fn to_expression(expr: &LinearExpr, lp: &[Variable]) -> Expression {
    expr.terms
        .iter()
        .fold(Expression::from(expr.constant as f64), |acc, &(v, c)| {
            acc + c as f64 * lp[v.index()]
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_milp_available() {
        assert_eq!(is_milp_available(), cfg!(feature = "milp"));
    }

    #[test]
    #[cfg(feature = "milp")]
    fn test_milp_packs_squares() {
        use crate::GridPacker;
        use polypack_core::{Board, Config, PackingStatus, Shape};

        let square = Shape::rectangle("square", 2, 2, "red").unwrap();
        let shapes = vec![square.clone(), square.clone(), square];
        let board = Board::new(4, 3);
        let packer = GridPacker::with_engine(Config::new(), MilpEngine::new());
        let result = packer.pack(&shapes, &board, &[]).unwrap();

        assert_eq!(result.status, PackingStatus::Optimal);
        assert_eq!(result.placed_count(), 2);
        assert_eq!(result.unplaced_count(), 1);
        assert!(result.check_layout(&board).is_ok());
    }

    #[test]
    #[cfg(feature = "milp")]
    fn test_milp_pinned_infeasible() {
        use crate::GridPacker;
        use polypack_core::{Board, Config, PackingStatus, Shape};

        let bar = Shape::rectangle("bar", 3, 1, "blue").unwrap();
        let board = Board::with_admissible_cells(3, 3, vec![(0, 0), (0, 1), (1, 2)]);
        let packer = GridPacker::with_engine(Config::new(), MilpEngine::new());
        let result = packer.pack(&[bar], &board, &["bar".to_string()]).unwrap();
        assert_eq!(result.status, PackingStatus::Infeasible);
    }

    #[test]
    #[cfg(not(feature = "milp"))]
    fn test_milp_unavailable_reports_unknown() {
        let model = CpModel::new();
        let response = MilpEngine::new().search(&model, &SearchParams::new(), &mut |_| {
            SearchControl::Continue
        });
        assert_eq!(response.status, polypack_core::EngineStatus::Unknown);
    }
}
