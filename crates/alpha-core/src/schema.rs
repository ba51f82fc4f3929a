//! Dimension schema: which questionnaire items measure which construct.
//!
//! The schema is trusted configuration supplied at startup, never uploaded by
//! users. It is consumed by the validator (as the required item set) and by
//! the analyzer (as the per-dimension item subsets).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ItemId, SchemaError};

/// Name of the implicit dimension used by [`DimensionSchema::whole`].
pub const OVERALL: &str = "overall";

/// A named, fixed subset of items assumed to measure one underlying construct.
///
/// Item order is kept for display only; the coefficient does not depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
  pub name:  String,
  pub items: Vec<ItemId>,
}

impl Dimension {
  pub fn new<I, S>(name: impl Into<String>, items: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<ItemId>,
  {
    Self {
      name:  name.into(),
      items: items.into_iter().map(Into::into).collect(),
    }
  }
}

/// An ordered set of dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaConfig")]
pub struct DimensionSchema {
  dimensions: Vec<Dimension>,
}

/// Accepted configuration shapes: a flat item list (one implicit dimension)
/// or an explicit list of dimensions.
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaConfig {
  Partitioned { dimensions: Vec<Dimension> },
  Whole { items: Vec<ItemId> },
}

impl TryFrom<SchemaConfig> for DimensionSchema {
  type Error = SchemaError;

  fn try_from(config: SchemaConfig) -> Result<Self, Self::Error> {
    match config {
      SchemaConfig::Partitioned { dimensions } => Self::partitioned(dimensions),
      SchemaConfig::Whole { items } => {
        Self::partitioned([Dimension::new(OVERALL, items)])
      }
    }
  }
}

impl DimensionSchema {
  /// A single implicit dimension named [`OVERALL`] covering every item.
  /// Repeated items are kept once, at their first position.
  pub fn whole<I, S>(items: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<ItemId>,
  {
    let mut overall = Dimension::new(OVERALL, items);
    let mut seen: Vec<ItemId> = Vec::with_capacity(overall.items.len());
    overall.items.retain(|item| {
      let fresh = !seen.contains(item);
      if fresh {
        seen.push(item.clone());
      }
      fresh
    });
    Self { dimensions: vec![overall] }
  }

  /// An explicit partition: at least one dimension, every item belongs to
  /// exactly one dimension and dimension names are unique.
  pub fn partitioned(
    dimensions: impl IntoIterator<Item = Dimension>,
  ) -> Result<Self, SchemaError> {
    let dimensions: Vec<Dimension> = dimensions.into_iter().collect();
    if dimensions.is_empty() {
      return Err(SchemaError::NoDimensions);
    }
    let mut owner: HashMap<&str, &str> = HashMap::new();

    for (i, dim) in dimensions.iter().enumerate() {
      if dimensions[..i].iter().any(|d| d.name == dim.name) {
        return Err(SchemaError::DuplicateDimension(dim.name.clone()));
      }
      for item in &dim.items {
        match owner.insert(item.as_str(), dim.name.as_str()) {
          None => {}
          Some(first) if first == dim.name => {
            return Err(SchemaError::RepeatedItem {
              item:      item.clone(),
              dimension: dim.name.clone(),
            });
          }
          Some(first) => {
            return Err(SchemaError::ItemInMultipleDimensions {
              item:   item.clone(),
              first:  first.to_owned(),
              second: dim.name.clone(),
            });
          }
        }
      }
    }

    Ok(Self { dimensions })
  }

  pub fn dimensions(&self) -> &[Dimension] { &self.dimensions }

  /// The union of all items referenced by the schema, in first-seen order.
  pub fn required_items(&self) -> Vec<ItemId> {
    let mut items: Vec<ItemId> = Vec::new();
    for item in self.dimensions.iter().flat_map(|d| &d.items) {
      if !items.contains(item) {
        items.push(item.clone());
      }
    }
    items
  }
}
