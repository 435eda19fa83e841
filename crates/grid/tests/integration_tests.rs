//! Integration tests for polypack-grid.

use polypack_grid::{
    decompose, Board, BranchAndBound, Config, DecompositionCache, GridPacker, IncrementalTracker,
    ModelBuilder, PackingResult, PackingStatus, SearchEngine, SearchParams, Shape, ShapeCatalog,
    Solver,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::time::Duration;

/// Grows a random connected shape of up to `max_cells` cells.
fn random_shape(rng: &mut StdRng, name: &str, max_cells: usize) -> Shape {
    let target = rng.gen_range(1..=max_cells);
    let mut cells = BTreeSet::from([(0, 0)]);
    while cells.len() < target {
        let anchor: Vec<(i32, i32)> = cells.iter().copied().collect();
        let (x, y) = anchor[rng.gen_range(0..anchor.len())];
        let (dx, dy) = [(1, 0), (0, 1), (-1, 0), (0, -1)][rng.gen_range(0..4)];
        cells.insert((x + dx, y + dy));
    }
    Shape::new(name, cells, "gray").unwrap()
}

fn random_board(rng: &mut StdRng, width: i32, height: i32, density: f64) -> Board {
    let cells: Vec<(i32, i32)> = (0..height)
        .flat_map(|row| (0..width).map(move |col| (row, col)))
        .filter(|_| rng.gen_bool(density))
        .collect();
    Board::with_admissible_cells(width, height, cells)
}

/// Checks the invariants every result must satisfy.
fn assert_well_formed(result: &PackingResult, shapes: &[Shape], board: &Board) {
    assert_eq!(result.total_count(), shapes.len());

    let mut requested: Vec<&str> = shapes.iter().map(Shape::name).collect();
    let mut reported: Vec<&str> = result
        .placed_shapes
        .iter()
        .map(|p| p.name.as_str())
        .chain(result.unplaced_shapes.iter().map(String::as_str))
        .collect();
    requested.sort_unstable();
    reported.sort_unstable();
    assert_eq!(requested, reported);

    if result.status.has_solution() {
        result.check_layout(board).unwrap();
    } else {
        assert!(result.placed_shapes.is_empty());
    }
}

mod decomposition_tests {
    use super::*;

    #[test]
    fn test_random_shapes_partition() {
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..50 {
            let shape = random_shape(&mut rng, &format!("s{}", i), 12);
            let rects = decompose(shape.points());

            let mut covered = BTreeSet::new();
            for rect in &rects {
                for cell in rect.cells() {
                    assert!(covered.insert(cell), "cell {:?} covered twice", cell);
                }
            }
            assert_eq!(&covered, shape.points());
        }
    }

    #[test]
    fn test_decomposition_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(11);
        let shape = random_shape(&mut rng, "s", 10);
        assert_eq!(decompose(shape.points()), decompose(shape.points()));
    }
}

mod model_tests {
    use super::*;

    #[test]
    fn test_decomposition_shared_between_copies() {
        let points = vec![(0, 0), (0, 1), (0, 2), (1, 2)];
        let ell = Shape::new("L", points, "blue").unwrap();
        let shapes = vec![ell.clone(), ell.clone(), ell];
        let board = Board::new(6, 6);
        let mut cache = DecompositionCache::new();
        let built = ModelBuilder::new(&shapes, &board)
            .build(&mut cache)
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(built.stats.instances, 3);
        assert_eq!(built.stats.rectangles, 6);
        assert!(built.model.validate().is_ok());
    }

    #[test]
    fn test_retained_area_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(3);
        let shapes: Vec<Shape> = (0..5)
            .map(|i| random_shape(&mut rng, &format!("s{}", i), 4))
            .collect();
        let board = Board::new(4, 4);
        let mut cache = DecompositionCache::new();
        let built = ModelBuilder::new(&shapes, &board)
            .build(&mut cache)
            .unwrap();

        let admissible = board.admissible_count();
        let mut tracker = IncrementalTracker::new(&shapes, &built.instances, admissible)
            .with_early_stop(false);
        let mut history = Vec::new();
        let limit = Duration::from_millis(500);
        let params = SearchParams::new().with_time_limit(limit);
        BranchAndBound::new().search(&built.model, &params, &mut |view| {
            let control = tracker.offer(view);
            history.push(tracker.best_area().unwrap_or(0));
            control
        });

        assert!(!history.is_empty());
        assert!(history.windows(2).all(|w| w[0] <= w[1]), "{:?}", history);
    }
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_square_on_empty_board() {
        let square = Shape::rectangle("square", 2, 2, "red").unwrap();
        let board = Board::new(9, 9);
        let result = GridPacker::default_config()
            .solve(&[square.clone()], &board, &[])
            .unwrap();

        assert_eq!(result.status, PackingStatus::Optimal);
        assert_eq!(result.placed_count(), 1);
        assert_eq!(result.placed_shapes[0].area(), 4);
        assert_eq!(board.admissible_count() - result.filled_area(), 77);
        assert!(result.unplaced_shapes.is_empty());
        assert_well_formed(&result, &[square], &board);
    }

    #[test]
    fn test_no_admissible_cells() {
        let square = Shape::rectangle("square", 2, 2, "red").unwrap();
        let board = Board::blocked(5, 5);
        let result = GridPacker::default_config()
            .solve(&[square], &board, &[])
            .unwrap();

        assert_eq!(result.status, PackingStatus::Infeasible);
        assert_eq!(result.unplaced_shapes, vec!["square".to_string()]);
        assert!(result.engine.is_none());
    }

    #[test]
    fn test_single_cell_two_dots_places_first() {
        let first = Shape::new("dot", vec![(0, 0)], "first").unwrap();
        let second = Shape::new("dot", vec![(0, 0)], "second").unwrap();
        let shapes = vec![first, second];
        let board = Board::with_admissible_cells(3, 3, vec![(1, 1)]);
        let result = GridPacker::default_config()
            .solve(&shapes, &board, &[])
            .unwrap();

        assert!(matches!(
            result.status,
            PackingStatus::Optimal | PackingStatus::Feasible
        ));
        assert_eq!(result.placed_count(), 1);
        assert_eq!(result.unplaced_shapes, vec!["dot".to_string()]);
        assert_eq!(result.placed_shapes[0].color, "first");
        let placed = &result.placed_shapes[0];
        assert_eq!((placed.x, placed.y), (1, 1));
        assert!(result.perfect);
        assert_well_formed(&result, &shapes, &board);
    }

    #[test]
    fn test_pinned_shape_that_cannot_fit() {
        let bar = Shape::rectangle("bar", 3, 1, "green").unwrap();
        let dot = Shape::new("dot", vec![(0, 0)], "black").unwrap();
        let shapes = vec![bar, dot];
        // No row holds three consecutive admissible cells.
        let cells = vec![(0, 0), (0, 1), (1, 2), (1, 3), (2, 0)];
        let board = Board::with_admissible_cells(4, 3, cells);
        let result = GridPacker::default_config()
            .solve(&shapes, &board, &["bar".to_string()])
            .unwrap();

        assert_eq!(result.status, PackingStatus::Infeasible);
        assert!(result.placed_shapes.is_empty());
        assert_eq!(result.unplaced_count(), 2);
    }

    #[test]
    fn test_pinned_shape_larger_than_board() {
        let wide = Shape::rectangle("wide", 6, 1, "green").unwrap();
        let board = Board::new(4, 4);
        let result = GridPacker::default_config()
            .solve(&[wide], &board, &["wide".to_string()])
            .unwrap();
        assert_eq!(result.status, PackingStatus::Infeasible);
    }

    #[test]
    fn test_pin_overrides_objective() {
        // The bar alone would cover all 3 cells; the pinned dot blocks it.
        let bar = Shape::rectangle("bar", 3, 1, "green").unwrap();
        let dot = Shape::new("dot", vec![(0, 0)], "black").unwrap();
        let board = Board::new(3, 1);
        let shapes = vec![bar, dot];
        let result = GridPacker::default_config()
            .solve(&shapes, &board, &["dot".to_string()])
            .unwrap();

        assert!(result.status.has_solution());
        assert_eq!(result.filled_area(), 1);
        assert_eq!(result.unplaced_shapes, vec!["bar".to_string()]);
    }

    #[test]
    fn test_exact_fill_reports_perfect() {
        let bar = Shape::rectangle("bar", 3, 1, "green").unwrap();
        let shapes = vec![bar.clone(), bar.clone(), bar];
        let board = Board::new(3, 3);
        let result = GridPacker::default_config()
            .solve(&shapes, &board, &[])
            .unwrap();

        assert_eq!(result.status, PackingStatus::Optimal);
        assert!(result.all_placed());
        assert!(result.perfect);
        approx::assert_relative_eq!(result.utilization(&board), 1.0);
    }

    #[test]
    fn test_short_time_limit_never_infeasible() {
        let square = Shape::rectangle("square", 2, 2, "red").unwrap();
        let shapes: Vec<Shape> = std::iter::repeat(square).take(20).collect();
        let board = Board::new(7, 7);
        let result = GridPacker::new(Config::new().with_time_limit(1))
            .solve(&shapes, &board, &[])
            .unwrap();

        assert!(matches!(
            result.status,
            PackingStatus::Optimal | PackingStatus::Feasible | PackingStatus::Unknown
        ));
        assert_well_formed(&result, &shapes, &board);
    }

    #[test]
    fn test_catalog_request_with_pins() {
        let square = Shape::rectangle("square", 2, 2, "red").unwrap();
        let points = vec![(0, 0), (1, 0), (2, 0), (1, 1)];
        let tee = Shape::new("T", points, "purple").unwrap();
        let catalog = ShapeCatalog::new().with_shape(square).with_shape(tee);
        let counts = polypack_grid::parse_shape_counts("T=2, square=1").unwrap();
        let shapes = catalog.instantiate(counts).unwrap();
        let board = Board::new(5, 4);

        let result = GridPacker::new(Config::new().with_time_limit(2_000))
            .solve(&shapes, &board, &["T".to_string()])
            .unwrap();

        assert!(result.status.has_solution());
        let placed_t = result
            .placed_shapes
            .iter()
            .filter(|p| p.name == "T")
            .count();
        assert_eq!(placed_t, 2);
        assert_well_formed(&result, &shapes, &board);
    }
}

mod property_tests {
    use super::*;

    #[test]
    fn test_random_instances_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(42);
        let packer = GridPacker::new(Config::new().with_time_limit(500).with_threads(1));

        for round in 0..12 {
            let board = random_board(&mut rng, 6, 5, 0.8);
            let count = rng.gen_range(1..=6);
            let templates: Vec<Shape> = (0..3)
                .map(|i| random_shape(&mut rng, &format!("r{}_{}", round, i), 4))
                .collect();
            let shapes: Vec<Shape> = (0..count)
                .map(|_| templates[rng.gen_range(0..templates.len())].clone())
                .collect();

            let result = packer.solve(&shapes, &board, &[]).unwrap();
            assert_ne!(result.status, PackingStatus::ModelInvalid);
            assert_well_formed(&result, &shapes, &board);
        }
    }

    #[test]
    fn test_pins_are_honored() {
        let mut rng = StdRng::seed_from_u64(99);
        let packer = GridPacker::new(Config::new().with_time_limit(500).with_threads(1));

        for round in 0..8 {
            let board = Board::new(5, 5);
            let shapes: Vec<Shape> = (0..4)
                .map(|i| random_shape(&mut rng, &format!("p{}_{}", round, i), 4))
                .collect();
            let pinned = vec![shapes[0].name().to_string()];

            let result = packer.solve(&shapes, &board, &pinned).unwrap();
            assert_well_formed(&result, &shapes, &board);
            if result.status.has_solution() {
                assert!(result.placed_shapes.iter().any(|p| p.name == pinned[0]));
            }
        }
    }

    #[test]
    fn test_symmetry_breaking_keeps_optimum() {
        let bar = Shape::rectangle("bar", 2, 1, "green").unwrap();
        let shapes: Vec<Shape> = std::iter::repeat(bar).take(5).collect();
        let board = random_board(&mut StdRng::seed_from_u64(5), 4, 3, 0.75);

        let with = GridPacker::new(Config::new().with_time_limit(0))
            .solve(&shapes, &board, &[])
            .unwrap();
        let without = GridPacker::new(
            Config::new()
                .with_time_limit(0)
                .with_symmetry_breaking(false)
                .with_early_stop(false),
        )
        .solve(&shapes, &board, &[])
        .unwrap();

        assert_eq!(without.status, PackingStatus::Optimal);
        assert_eq!(with.filled_area(), without.filled_area());
    }
}
