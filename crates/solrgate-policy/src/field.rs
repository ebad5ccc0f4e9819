//! Retrievable fields and their static cost.

use std::collections::BTreeMap;

/// A retrievable document attribute with a fixed cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub weight: f64,
}

impl Field {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// How a requested field name resolved against the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldCost {
    Listed(f64),
    Unlisted { weight: f64, allowed: bool },
}

impl FieldCost {
    pub fn weight(self) -> f64 {
        match self {
            Self::Listed(w) => w,
            Self::Unlisted { weight, .. } => weight,
        }
    }
}

/// All listed fields of a profile plus the policy for everything else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldCatalog {
    fields: BTreeMap<String, Field>,
    unlisted_allowed: bool,
    unlisted_weight: f64,
    total_weight: f64,
}

impl FieldCatalog {
    pub fn new(fields: Vec<Field>, unlisted_allowed: bool, unlisted_weight: f64) -> Self {
        let total_weight = fields.iter().map(|f| f.weight).sum();
        Self {
            fields: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
            unlisted_allowed,
            unlisted_weight,
            total_weight,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn cost(&self, name: &str) -> FieldCost {
        match self.fields.get(name) {
            Some(field) => FieldCost::Listed(field.weight),
            None => FieldCost::Unlisted {
                weight: self.unlisted_weight,
                allowed: self.unlisted_allowed,
            },
        }
    }

    /// Cost of `*`: every listed field.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn unlisted_allowed(&self) -> bool {
        self.unlisted_allowed
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
