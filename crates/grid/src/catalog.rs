//! Named shape templates and request expansion.
//!
//! Front ends describe a request as "how many of each shape", for example
//! `"L=2,square=1"`. The catalog turns that into the flat instance list the
//! packer works on. Copies keep the template name, so pinning a name pins
//! every copy of it.

use polypack_core::{Error, Result, Shape};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use polypack_core::Cell;
#[cfg(feature = "serde")]
use serde::Deserialize;

/// A set of shape templates keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ShapeCatalog {
    templates: BTreeMap<String, Shape>,
}

impl ShapeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, builder style.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.insert(shape);
        self
    }

    /// Adds or replaces a template, returning the previous one.
    pub fn insert(&mut self, shape: Shape) -> Option<Shape> {
        self.templates.insert(shape.name().to_string(), shape)
    }

    pub fn get(&self, name: &str) -> Option<&Shape> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Expands `(name, count)` requests into instances, in request order.
    pub fn instantiate<I, S>(&self, counts: I) -> Result<Vec<Shape>>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: AsRef<str>,
    {
        let mut instances = Vec::new();
        for (name, count) in counts {
            let name = name.as_ref();
            let template = self
                .get(name)
                .ok_or_else(|| Error::UnknownShape(name.to_string()))?;
            instances.extend(std::iter::repeat(template).take(count).cloned());
        }
        log::debug!("expanded request into {} instances", instances.len());
        Ok(instances)
    }

    /// Loads templates from a JSON array of
    /// `{"name": .., "points": [[x, y], ..], "area": .., "color": ..}` records.
    ///
    /// `area` and `color` are optional; a supplied area must match the cell count.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<ShapeRecord> = serde_json::from_str(json)
            .map_err(|e| Error::SerializationError(e.to_string()))?;

        let mut catalog = Self::new();
        for record in records {
            let shape = match record.area {
                Some(area) => Shape::with_area(record.name, record.points, area, record.color)?,
                None => Shape::new(record.name, record.points, record.color)?,
            };
            if let Some(previous) = catalog.insert(shape) {
                return Err(Error::InvalidShape(format!(
                    "shape '{}' is defined more than once",
                    previous.name()
                )));
            }
        }
        Ok(catalog)
    }
}

#[cfg(feature = "serde")]
#[derive(Debug, Deserialize)]
struct ShapeRecord {
    name: String,
    points: Vec<Cell>,
    #[serde(default)]
    area: Option<u64>,
    #[serde(default)]
    color: String,
}

/// Parses a `name=count` list such as `"L=2, square=1"`.
///
/// Empty entries are skipped; counts must be non-negative integers.
pub fn parse_shape_counts(input: &str) -> Result<Vec<(String, usize)>> {
    let mut counts = Vec::new();
    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, count) = entry.split_once('=').ok_or_else(|| {
            Error::ConfigError(format!("expected 'name=count', got '{}'", entry))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::ConfigError(format!(
                "missing shape name in '{}'",
                entry
            )));
        }
        let count = count.trim().parse::<usize>().map_err(|e| {
            Error::ConfigError(format!("invalid count for '{}': {}", name, e))
        })?;
        counts.push((name.to_string(), count));
    }
    Ok(counts)
}
