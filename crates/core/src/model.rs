//! Integer constraint model handed to a [`SearchEngine`](crate::engine::SearchEngine).
//!
//! The model is deliberately small: boolean and bounded integer variables,
//! affine expressions, optionally enforced linear and table constraints, a
//! two-dimensional no-overlap constraint over optional boxes, and a single
//! linear objective to maximize. Any engine able to honor these primitives can
//! search it.
//!
//! # Example
//!
//! ```rust
//! use polypack_core::model::{CpModel, LinearExpr, Relation};
//!
//! let mut model = CpModel::new();
//! let used = model.new_bool_var("used");
//! let x = model.new_int_var(0, 5, "x");
//! model.add_linear(LinearExpr::from(x), Relation::Ge, 2).only_enforce_if(used);
//! model.maximize(LinearExpr::term(used, 3));
//! assert!(model.validate().is_ok());
//! ```

use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Largest magnitude a variable bound, box size or expression range may reach.
///
/// Keeping every quantity within a quarter of `i64` lets engines add and
/// subtract bounds without overflow.
pub const MAX_MAGNITUDE: i64 = i64::MAX / 4;

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of the variable in declaration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Declaration of an integer variable with an inclusive domain.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub lo: i64,
    pub hi: i64,
    pub is_bool: bool,
}

/// `sum(coef * var) + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, i64)>,
    pub constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// A single `coef * var` term.
    pub fn term(var: VarId, coef: i64) -> Self {
        Self {
            terms: vec![(var, coef)],
            constant: 0,
        }
    }

    /// Adds a `coef * var` term.
    pub fn with_term(mut self, var: VarId, coef: i64) -> Self {
        self.terms.push((var, coef));
        self
    }

    /// Adds to the constant part.
    pub fn plus(mut self, value: i64) -> Self {
        self.constant += value;
        self
    }

    /// Variables referenced by this expression.
    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.terms.iter().map(|&(v, _)| v)
    }

    /// Evaluates the expression under an assignment.
    pub fn eval(&self, value: impl Fn(VarId) -> i64) -> i64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(v, c)| acc + c * value(v))
    }

    /// Whether `other` differs from `self` only by its constant.
    pub fn same_terms(&self, other: &LinearExpr) -> bool {
        self.terms == other.terms
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self::term(var, 1)
    }
}

/// Comparison used by linear constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

impl Relation {
    /// Whether `lhs <relation> rhs` holds.
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// An axis-aligned box that takes part in a no-overlap constraint only when
/// its presence literal is true.
#[derive(Debug, Clone)]
pub struct OptionalBox {
    pub x_start: LinearExpr,
    pub width: i64,
    pub y_start: LinearExpr,
    pub height: i64,
    pub presence: VarId,
}

/// Constraint kinds understood by every engine.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// `expr <relation> rhs`, active only when all `enforce` literals are true.
    Linear {
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
        enforce: Vec<VarId>,
    },
    /// `expr` must take one of `allowed`, active only when all `enforce` literals are true.
    AllowedValues {
        expr: LinearExpr,
        allowed: Arc<BTreeSet<i64>>,
        enforce: Vec<VarId>,
    },
    /// Present boxes may not share area: for each pair, the x intervals or the
    /// y intervals are disjoint.
    NoOverlap2D { boxes: Vec<OptionalBox> },
}

impl Constraint {
    /// Enforcement literals, empty for unconditional constraints.
    pub fn enforcement(&self) -> &[VarId] {
        match self {
            Self::Linear { enforce, .. } | Self::AllowedValues { enforce, .. } => enforce,
            Self::NoOverlap2D { .. } => &[],
        }
    }

    /// Adds enforcement literals to a linear or table constraint.
    pub fn only_enforce_if(&mut self, literal: VarId) -> &mut Self {
        match self {
            Self::Linear { enforce, .. } | Self::AllowedValues { enforce, .. } => {
                enforce.push(literal)
            }
            Self::NoOverlap2D { .. } => {
                log::warn!("enforcement literals are ignored on NoOverlap2D");
            }
        }
        self
    }

    /// Every variable the constraint mentions.
    pub fn vars(&self) -> Vec<VarId> {
        let mut vars: Vec<VarId> = match self {
            Self::Linear { expr, enforce, .. } | Self::AllowedValues { expr, enforce, .. } => {
                expr.vars().chain(enforce.iter().copied()).collect()
            }
            Self::NoOverlap2D { boxes } => boxes
                .iter()
                .flat_map(|b| {
                    b.x_start
                        .vars()
                        .chain(b.y_start.vars())
                        .chain(std::iter::once(b.presence))
                })
                .collect(),
        };
        vars.sort_unstable();
        vars.dedup();
        vars
    }
}

/// A maximization model over integer variables.
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    vars: Vec<VarDecl>,
    constraints: Vec<Constraint>,
    objective: Option<LinearExpr>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a 0/1 variable.
    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), 0, 1, true)
    }

    /// Declares an integer variable with domain `[lo, hi]`.
    pub fn new_int_var(&mut self, lo: i64, hi: i64, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), lo, hi, false)
    }

    fn push_var(&mut self, name: String, lo: i64, hi: i64, is_bool: bool) -> VarId {
        self.vars.push(VarDecl {
            name,
            lo,
            hi,
            is_bool,
        });
        VarId(self.vars.len() - 1)
    }

    /// Adds `expr <relation> rhs`.
    pub fn add_linear(
        &mut self,
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
    ) -> &mut Constraint {
        self.add(Constraint::Linear {
            expr,
            relation,
            rhs,
            enforce: Vec::new(),
        })
    }

    /// Restricts `expr` to the values in `allowed`.
    pub fn add_allowed_values(
        &mut self,
        expr: LinearExpr,
        allowed: Arc<BTreeSet<i64>>,
    ) -> &mut Constraint {
        self.add(Constraint::AllowedValues {
            expr,
            allowed,
            enforce: Vec::new(),
        })
    }

    /// Forbids any two present boxes from overlapping.
    pub fn add_no_overlap_2d(&mut self, boxes: Vec<OptionalBox>) -> &mut Constraint {
        self.add(Constraint::NoOverlap2D { boxes })
    }

    /// Adds an arbitrary constraint.
    pub fn add(&mut self, constraint: Constraint) -> &mut Constraint {
        self.constraints.push(constraint);
        let last = self.constraints.len() - 1;
        &mut self.constraints[last]
    }

    /// Sets the objective to maximize.
    pub fn maximize(&mut self, objective: LinearExpr) {
        self.objective = Some(objective);
    }

    pub fn var(&self, id: VarId) -> &VarDecl {
        &self.vars[id.0]
    }

    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    /// Smallest and largest value `expr` can take over the declared domains.
    pub fn expr_bounds(&self, expr: &LinearExpr) -> (i64, i64) {
        expr.terms
            .iter()
            .fold((expr.constant, expr.constant), |(lo, hi), &(v, c)| {
                let decl = &self.vars[v.0];
                let (a, b) = (c * decl.lo, c * decl.hi);
                (lo + a.min(b), hi + a.max(b))
            })
    }

    /// Structural checks an engine performs before searching.
    pub fn validate(&self) -> Result<()> {
        for (i, decl) in self.vars.iter().enumerate() {
            if decl.lo > decl.hi {
                return Err(Error::InvalidModel(format!(
                    "variable {} ('{}') has empty domain [{}, {}]",
                    i, decl.name, decl.lo, decl.hi
                )));
            }
            if decl.lo < -MAX_MAGNITUDE || decl.hi > MAX_MAGNITUDE {
                return Err(Error::InvalidModel(format!(
                    "variable {} ('{}') has domain [{}, {}] beyond +/-{}",
                    i, decl.name, decl.lo, decl.hi, MAX_MAGNITUDE
                )));
            }
        }

        let check_ref = |v: VarId| -> Result<()> {
            if v.0 >= self.vars.len() {
                return Err(Error::InvalidModel(format!(
                    "reference to undeclared variable {}",
                    v.0
                )));
            }
            Ok(())
        };
        let check_expr = |expr: &LinearExpr| -> Result<()> {
            expr.vars().try_for_each(check_ref)?;
            if self.magnitude(expr) > i128::from(MAX_MAGNITUDE) {
                return Err(Error::InvalidModel(format!(
                    "expression over {} variables may exceed +/-{}",
                    expr.terms.len(),
                    MAX_MAGNITUDE
                )));
            }
            Ok(())
        };
        let check_literal = |v: VarId| -> Result<()> {
            check_ref(v)?;
            if !self.vars[v.0].is_bool {
                return Err(Error::InvalidModel(format!(
                    "variable '{}' used as a literal is not boolean",
                    self.vars[v.0].name
                )));
            }
            Ok(())
        };

        for (ci, constraint) in self.constraints.iter().enumerate() {
            for v in constraint.enforcement() {
                check_literal(*v)?;
            }
            match constraint {
                Constraint::Linear { expr, .. } => check_expr(expr)?,
                Constraint::AllowedValues { expr, allowed, .. } => {
                    check_expr(expr)?;
                    if allowed.is_empty() && constraint.enforcement().is_empty() {
                        return Err(Error::InvalidModel(format!(
                            "constraint {} has an empty unconditional value table",
                            ci
                        )));
                    }
                }
                Constraint::NoOverlap2D { boxes } => {
                    for b in boxes {
                        if b.width <= 0
                            || b.height <= 0
                            || b.width > MAX_MAGNITUDE
                            || b.height > MAX_MAGNITUDE
                        {
                            return Err(Error::InvalidModel(format!(
                                "constraint {} has a box of size {}x{}",
                                ci, b.width, b.height
                            )));
                        }
                        check_expr(&b.x_start)?;
                        check_expr(&b.y_start)?;
                        check_literal(b.presence)?;
                    }
                }
            }
        }

        if let Some(objective) = &self.objective {
            check_expr(objective)?;
        }
        Ok(())
    }

    /// Upper bound on `|expr|` over the variable domains.
    fn magnitude(&self, expr: &LinearExpr) -> i128 {
        expr.terms
            .iter()
            .fold(i128::from(expr.constant).abs(), |acc, &(v, c)| {
                let decl = &self.vars[v.0];
                let reach = i128::from(decl.lo).abs().max(i128::from(decl.hi).abs());
                let term = i128::from(c).abs().saturating_mul(reach);
                acc.saturating_add(term)
            })
    }
}
