//! Placement model construction.
//!
//! Every shape instance gets three variables, declared in this order:
//! `is_used_i`, `x_i`, `y_i`. The origin domains already keep every cell of the
//! shape on the board, so no explicit boundary constraints are emitted. The
//! remaining rules are:
//!
//! - admissibility: each absolute cell index `W * (y + dy) + (x + dx)` must be
//!   an admissible index when the instance is used,
//! - pinning: `is_used == 1` for instances whose name is pinned,
//! - non-overlap: one two-dimensional no-overlap constraint over the
//!   rectangles of every instance, each present only when its instance is used,
//! - symmetry breaking between consecutive instances of the same name,
//! - objective: maximize `sum(area_i * is_used_i)`.

use crate::decomposition::DecompositionCache;
use polypack_core::{
    Board, CpModel, Error, LinearExpr, OptionalBox, Relation, Result, Shape, VarId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Variables of one shape instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceVars {
    /// Position of the instance in the requested shape list.
    pub index: usize,
    pub is_used: VarId,
    pub x: VarId,
    pub y: VarId,
}

/// Size of a built placement model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelStats {
    pub instances: usize,
    /// Distinct shape names.
    pub distinct_shapes: usize,
    /// Boxes in the no-overlap constraint.
    pub rectangles: usize,
    pub admissibility_constraints: usize,
    pub pinned_instances: usize,
    pub symmetry_constraints: usize,
    /// Instances whose bounding box is larger than the board.
    pub oversized_instances: usize,
}

/// A model ready for a search engine, with the handles needed to read
/// solutions back.
#[derive(Debug, Clone)]
pub struct PlacementModel {
    pub model: CpModel,
    pub instances: Vec<InstanceVars>,
    pub stats: ModelStats,
}

/// Builds a [`PlacementModel`] for one packing request.
#[derive(Debug, Clone)]
pub struct ModelBuilder<'a> {
    shapes: &'a [Shape],
    board: &'a Board,
    pinned: HashSet<&'a str>,
    symmetry_breaking: bool,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(shapes: &'a [Shape], board: &'a Board) -> Self {
        Self {
            shapes,
            board,
            pinned: HashSet::new(),
            symmetry_breaking: true,
        }
    }

    /// Forces every instance whose name appears in `names` into the layout.
    pub fn with_pinned(mut self, names: &'a [String]) -> Self {
        self.pinned.extend(names.iter().map(String::as_str));
        self
    }

    /// Enables or disables ordering of interchangeable instances.
    pub fn with_symmetry_breaking(mut self, enable: bool) -> Self {
        self.symmetry_breaking = enable;
        self
    }

    /// Builds the model.
    ///
    /// The board must be valid and have at least one admissible cell: an empty
    /// admissible set is reported as infeasible by the caller without building
    /// anything. Instances sharing a name must share their cells.
    pub fn build(&self, cache: &mut DecompositionCache) -> Result<PlacementModel> {
        self.board.validate()?;
        validate_shapes(self.shapes)?;
        if !self.board.has_admissible_cells() {
            return Err(Error::InvalidBoard(
                "cannot build a placement model without admissible cells".to_string(),
            ));
        }

        let width = i64::from(self.board.width());
        let height = i64::from(self.board.height());
        let restricted = self.board.admissible_count() < (width * height) as u64;
        let allowed = Arc::new(self.board.admissible_indices());

        let mut model = CpModel::new();
        let mut instances = Vec::with_capacity(self.shapes.len());
        let mut boxes = Vec::new();
        let mut objective = LinearExpr::new();
        let mut stats = ModelStats {
            instances: self.shapes.len(),
            ..Default::default()
        };

        for (index, shape) in self.shapes.iter().enumerate() {
            let bounds = shape.bounds().ok_or_else(|| {
                Error::InvalidShape(format!("shape '{}' has no cells", shape.name()))
            })?;

            let x_lo = -i64::from(bounds.min_x);
            let x_hi = width - 1 - i64::from(bounds.max_x);
            let y_lo = -i64::from(bounds.min_y);
            let y_hi = height - 1 - i64::from(bounds.max_y);
            let fits = x_lo <= x_hi && y_lo <= y_hi;

            let is_used = model.new_bool_var(format!("is_used_{}", index));
            let x = model.new_int_var(x_lo, x_hi.max(x_lo), format!("x_{}", index));
            let y = model.new_int_var(y_lo, y_hi.max(y_lo), format!("y_{}", index));
            instances.push(InstanceVars {
                index,
                is_used,
                x,
                y,
            });

            if !fits {
                log::warn!(
                    "shape '{}' ({}x{}) is larger than the {}x{} board and cannot be placed",
                    shape.name(),
                    bounds.width(),
                    bounds.height(),
                    width,
                    height
                );
                model.add_linear(is_used.into(), Relation::Eq, 0);
                stats.oversized_instances += 1;
            }

            if self.pinned.contains(shape.name()) {
                model.add_linear(is_used.into(), Relation::Eq, 1);
                stats.pinned_instances += 1;
            }

            if fits && restricted {
                for &(dx, dy) in shape.points() {
                    let cell = LinearExpr::term(y, width)
                        .with_term(x, 1)
                        .plus(i64::from(dy) * width + i64::from(dx));
                    model
                        .add_allowed_values(cell, Arc::clone(&allowed))
                        .only_enforce_if(is_used);
                    stats.admissibility_constraints += 1;
                }
            }

            for rect in cache.get_or_compute(shape).iter() {
                boxes.push(OptionalBox {
                    x_start: LinearExpr::from(x).plus(i64::from(rect.dx)),
                    width: i64::from(rect.width),
                    y_start: LinearExpr::from(y).plus(i64::from(rect.dy)),
                    height: i64::from(rect.height),
                    presence: is_used,
                });
            }

            objective = objective.with_term(is_used, shape.area() as i64);
        }

        stats.rectangles = boxes.len();
        stats.distinct_shapes = self
            .shapes
            .iter()
            .map(Shape::name)
            .collect::<HashSet<_>>()
            .len();
        if boxes.len() > 1 {
            model.add_no_overlap_2d(boxes);
        }

        if self.symmetry_breaking {
            stats.symmetry_constraints = self.break_symmetry(&mut model, &instances);
        }

        model.maximize(objective);

        log::debug!(
            "placement model: {} instances ({} distinct), {} rectangles, {} tables, {} symmetry",
            stats.instances,
            stats.distinct_shapes,
            stats.rectangles,
            stats.admissibility_constraints,
            stats.symmetry_constraints
        );

        Ok(PlacementModel {
            model,
            instances,
            stats,
        })
    }

    /// Orders consecutive instances of the same name.
    ///
    /// Used instances of a name form a prefix of its occurrences, and among used
    /// instances `x` is non-decreasing. Returns the number of constraints added.
    fn break_symmetry(&self, model: &mut CpModel, instances: &[InstanceVars]) -> usize {
        let mut groups: HashMap<&str, Vec<InstanceVars>> = HashMap::new();
        let mut order = Vec::new();
        for inst in instances {
            let name = self.shapes[inst.index].name();
            groups
                .entry(name)
                .or_insert_with(|| {
                    order.push(name);
                    Vec::new()
                })
                .push(*inst);
        }

        let mut added = 0;
        for name in order {
            for pair in groups[name].windows(2) {
                let (a, b) = (pair[0], pair[1]);
                model.add_linear(
                    LinearExpr::from(a.is_used).with_term(b.is_used, -1),
                    Relation::Ge,
                    0,
                );
                model
                    .add_linear(LinearExpr::from(a.x).with_term(b.x, -1), Relation::Le, 0)
                    .only_enforce_if(a.is_used)
                    .only_enforce_if(b.is_used);
                added += 2;
            }
        }
        added
    }
}

/// Rejects invalid shapes and same-named instances with different cells.
pub(crate) fn validate_shapes(shapes: &[Shape]) -> Result<()> {
    let mut by_name: HashMap<&str, &Shape> = HashMap::new();
    for shape in shapes {
        shape.validate()?;
        if let Some(first) = by_name.insert(shape.name(), shape) {
            if first.points() != shape.points() {
                return Err(Error::InvalidShape(format!(
                    "instances named '{}' have different cells",
                    shape.name()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polypack_core::Constraint;

    fn square(name: &str) -> Shape {
        Shape::rectangle(name, 2, 2, "red").unwrap()
    }

    fn build(shapes: &[Shape], board: &Board, pinned: &[String]) -> PlacementModel {
        let mut cache = DecompositionCache::new();
        ModelBuilder::new(shapes, board)
            .with_pinned(pinned)
            .build(&mut cache)
            .unwrap()
    }

    #[test]
    fn test_domains_keep_shape_on_board() {
        let shapes = vec![Shape::rectangle("bar", 3, 1, "blue").unwrap()];
        let board = Board::new(5, 4);
        let built = build(&shapes, &board, &[]);

        let inst = built.instances[0];
        let x = built.model.var(inst.x);
        let y = built.model.var(inst.y);
        assert_eq!((x.lo, x.hi), (0, 2));
        assert_eq!((y.lo, y.hi), (0, 3));
        assert!(built.model.var(inst.is_used).is_bool);
        assert!(built.model.validate().is_ok());
    }

    #[test]
    fn test_variable_declaration_order() {
        let shapes = vec![square("a"), square("b")];
        let board = Board::new(4, 4);
        let built = build(&shapes, &board, &[]);
        let ids: Vec<usize> = built
            .instances
            .iter()
            .flat_map(|i| [i.is_used.index(), i.x.index(), i.y.index()])
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_full_board_has_no_admissibility_constraints() {
        let shapes = vec![square("a")];
        let board = Board::new(9, 9);
        let built = build(&shapes, &board, &[]);
        assert_eq!(built.stats.admissibility_constraints, 0);
        assert_eq!(built.stats.rectangles, 1);
    }

    #[test]
    fn test_admissibility_per_point() {
        let shapes = vec![square("a")];
        let cells = (0..4)
            .flat_map(|row| (0..4).map(move |col| (row, col)))
            .filter(|&cell| cell != (0, 0));
        let board = Board::with_admissible_cells(4, 4, cells);
        let built = build(&shapes, &board, &[]);
        assert_eq!(built.stats.admissibility_constraints, 4);

        let tables: Vec<&Constraint> = built
            .model
            .constraints()
            .iter()
            .filter(|c| matches!(c, Constraint::AllowedValues { .. }))
            .collect();
        assert_eq!(tables.len(), 4);
        for c in tables {
            assert_eq!(c.enforcement(), &[built.instances[0].is_used]);
        }
    }

    #[test]
    fn test_pinned_instances_forced() {
        let shapes = vec![square("a"), square("b"), square("a")];
        let board = Board::new(6, 6);
        let built = build(&shapes, &board, &["a".to_string()]);
        assert_eq!(built.stats.pinned_instances, 2);

        let forced: Vec<VarId> = built
            .model
            .constraints()
            .iter()
            .filter_map(|c| match c {
                Constraint::Linear {
                    expr,
                    relation: Relation::Eq,
                    rhs: 1,
                    ..
                } => expr.terms.first().map(|&(v, _)| v),
                _ => None,
            })
            .collect();
        assert_eq!(
            forced,
            vec![built.instances[0].is_used, built.instances[2].is_used]
        );
    }

    #[test]
    fn test_oversized_shape_is_disabled() {
        let shapes = vec![Shape::rectangle("wide", 5, 1, "green").unwrap()];
        let board = Board::new(3, 3);
        let built = build(&shapes, &board, &[]);
        assert_eq!(built.stats.oversized_instances, 1);
        assert!(built.model.validate().is_ok());
    }

    #[test]
    fn test_symmetry_constraints_for_duplicates() {
        let shapes = vec![square("a"), square("b"), square("a"), square("a")];
        let board = Board::new(8, 8);
        let built = build(&shapes, &board, &[]);
        assert_eq!(built.stats.symmetry_constraints, 4);

        let mut cache = DecompositionCache::new();
        let plain = ModelBuilder::new(&shapes, &board)
            .with_symmetry_breaking(false)
            .build(&mut cache)
            .unwrap();
        assert_eq!(plain.stats.symmetry_constraints, 0);
        assert_eq!(plain.stats.distinct_shapes, 2);
    }

    #[test]
    fn test_objective_weights_are_areas() {
        let shapes = vec![square("a"), Shape::new("dot", vec![(0, 0)], "").unwrap()];
        let board = Board::new(4, 4);
        let built = build(&shapes, &board, &[]);
        let objective = built.model.objective().unwrap();
        assert_eq!(
            objective.terms,
            vec![(built.instances[0].is_used, 4), (built.instances[1].is_used, 1)]
        );
    }

    #[test]
    fn test_empty_admissible_set_rejected() {
        let shapes = vec![square("a")];
        let board = Board::blocked(3, 3);
        let mut cache = DecompositionCache::new();
        let err = ModelBuilder::new(&shapes, &board).build(&mut cache);
        assert!(matches!(err, Err(Error::InvalidBoard(_))));
    }

    #[test]
    fn test_same_name_different_cells_rejected() {
        let shapes = vec![
            Shape::new("x", vec![(0, 0)], "").unwrap(),
            Shape::rectangle("x", 3, 1, "").unwrap(),
        ];
        let board = Board::new(3, 1);
        let mut cache = DecompositionCache::new();
        let err = ModelBuilder::new(&shapes, &board)
            .with_symmetry_breaking(false)
            .build(&mut cache);
        assert!(matches!(err, Err(Error::InvalidShape(_))));
    }

    #[test]
    fn test_off_grid_admissible_cell_rejected() {
        // (row 0, col 3) would alias index 3, which is (row 1, col 0).
        let shapes = vec![Shape::new("dot", vec![(0, 0)], "").unwrap()];
        let board = Board::with_admissible_cells(3, 2, vec![(0, 0), (0, 3)]);
        let mut cache = DecompositionCache::new();
        let err = ModelBuilder::new(&shapes, &board).build(&mut cache);
        assert!(matches!(err, Err(Error::InvalidBoard(_))));
    }
}
