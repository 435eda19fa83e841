//! Rectangle decomposition of unit-cell shapes.
//!
//! Non-overlap between shapes is expressed over axis-aligned rectangles, so
//! each shape is first partitioned into as few rectangles as a greedy scan
//! finds. The scan is deterministic: it always starts the next rectangle at
//! the remaining cell with the smallest `(y, x)`, grows it rightwards along
//! that row, then downwards one full row at a time.

use polypack_core::{Cell, Shape};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A `width x height` block of cells whose top-left cell is at `(dx, dy)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rectangle {
    pub dx: i32,
    pub dy: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(dx: i32, dy: i32, width: i32, height: i32) -> Self {
        Self {
            dx,
            dy,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Cells covered by the rectangle.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.dy..self.dy + self.height)
            .flat_map(move |y| (self.dx..self.dx + self.width).map(move |x| (x, y)))
    }
}

/// Partitions `points` into disjoint rectangles.
///
/// The union of the returned rectangles is exactly `points`.
pub fn decompose<'a>(points: impl IntoIterator<Item = &'a Cell>) -> Vec<Rectangle> {
    // Ordered by (y, x) so the first element is always the next origin.
    let mut remaining: BTreeSet<(i32, i32)> = points.into_iter().map(|&(x, y)| (y, x)).collect();
    let mut rectangles = Vec::new();

    while let Some(&(y, x)) = remaining.iter().next() {
        let mut width = 1;
        while remaining.contains(&(y, x + width)) {
            width += 1;
        }

        let mut height = 1;
        while (x..x + width).all(|cx| remaining.contains(&(y + height, cx))) {
            height += 1;
        }

        for ry in y..y + height {
            for rx in x..x + width {
                remaining.remove(&(ry, rx));
            }
        }
        rectangles.push(Rectangle::new(x, y, width, height));
    }

    rectangles
}

/// Per-call memo of decompositions keyed by cell set.
///
/// Instances with the same cells share one decomposition whatever their names.
#[derive(Debug, Default)]
pub struct DecompositionCache {
    entries: HashMap<BTreeSet<Cell>, Arc<Vec<Rectangle>>>,
}

impl DecompositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decomposition of `shape`, computing it on first request.
    pub fn get_or_compute(&mut self, shape: &Shape) -> Arc<Vec<Rectangle>> {
        if let Some(rects) = self.entries.get(shape.points()) {
            return Arc::clone(rects);
        }
        let rects = Arc::new(decompose(shape.points()));
        log::trace!(
            "decomposed '{}' ({} cells) into {} rectangles",
            shape.name(),
            shape.area(),
            rects.len()
        );
        self.entries
            .insert(shape.points().clone(), Arc::clone(&rects));
        rects
    }

    /// Number of distinct cell sets decomposed so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
