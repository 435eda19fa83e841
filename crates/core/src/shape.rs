//! Shapes made of integer unit cells.

use crate::{Error, Result};
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An integer `(x, y)` cell offset or coordinate.
pub type Cell = (i32, i32);

/// Axis-aligned bounds of a cell set, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl ShapeBounds {
    /// Number of columns spanned.
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    /// Number of rows spanned.
    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
}

/// A polyomino-like shape placed by translation only.
///
/// Several instances may share a name; each instance is placed independently.
/// The area is always the number of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    name: String,
    points: BTreeSet<Cell>,
    color: String,
}

impl Shape {
    /// Creates a shape from its cell offsets.
    ///
    /// Fails on an empty cell list or on repeated cells.
    pub fn new(
        name: impl Into<String>,
        points: impl IntoIterator<Item = Cell>,
        color: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let mut set = BTreeSet::new();
        for p in points {
            if !set.insert(p) {
                return Err(Error::InvalidShape(format!(
                    "shape '{}' lists cell ({}, {}) more than once",
                    name, p.0, p.1
                )));
            }
        }
        let shape = Self {
            name,
            points: set,
            color: color.into(),
        };
        shape.validate()?;
        Ok(shape)
    }

    /// Creates a shape and checks a separately supplied area against the cell count.
    pub fn with_area(
        name: impl Into<String>,
        points: impl IntoIterator<Item = Cell>,
        area: u64,
        color: impl Into<String>,
    ) -> Result<Self> {
        let shape = Self::new(name, points, color)?;
        if shape.area() != area {
            return Err(Error::InvalidShape(format!(
                "shape '{}' declares area {} but has {} cells",
                shape.name,
                area,
                shape.area()
            )));
        }
        Ok(shape)
    }

    /// Creates a solid `width x height` rectangle anchored at the origin.
    pub fn rectangle(
        name: impl Into<String>,
        width: i32,
        height: i32,
        color: impl Into<String>,
    ) -> Result<Self> {
        let points = (0..height).flat_map(|y| (0..width).map(move |x| (x, y)));
        Self::new(name, points, color)
    }

    /// Checks the shape invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidShape("shape name is empty".into()));
        }
        if self.points.is_empty() {
            return Err(Error::InvalidShape(format!(
                "shape '{}' has no cells",
                self.name
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell offsets from the local origin, ordered by `(x, y)`.
    pub fn points(&self) -> &BTreeSet<Cell> {
        &self.points
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Area in unit cells.
    pub fn area(&self) -> u64 {
        self.points.len() as u64
    }

    /// Bounding box of the cells, `None` only for an unvalidated empty shape.
    pub fn bounds(&self) -> Option<ShapeBounds> {
        let first = self.points.iter().next()?;
        let mut b = ShapeBounds {
            min_x: first.0,
            min_y: first.1,
            max_x: first.0,
            max_y: first.1,
        };
        for &(x, y) in &self.points {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }
}

/// A shape instance fixed at a board position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlacedShape {
    pub name: String,
    /// Column of the shape's local origin.
    pub x: i32,
    /// Row of the shape's local origin.
    pub y: i32,
    /// Offsets copied from the originating shape.
    pub points: Vec<Cell>,
    pub color: String,
}

impl PlacedShape {
    /// Places `shape` with its local origin at `(x, y)`.
    pub fn new(shape: &Shape, x: i32, y: i32) -> Self {
        Self {
            name: shape.name().to_string(),
            x,
            y,
            points: shape.points().iter().copied().collect(),
            color: shape.color().to_string(),
        }
    }

    /// Absolute `(x, y)` board cells covered by this placement.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.points
            .iter()
            .map(move |&(dx, dy)| (self.x + dx, self.y + dy))
    }

    pub fn area(&self) -> u64 {
        self.points.len() as u64
    }
}
