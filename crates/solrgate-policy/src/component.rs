//! A named group of params, one per query handler.

use std::collections::BTreeMap;

use crate::field::FieldCatalog;
use crate::param::{Param, ParamState};

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub default_enabled: bool,
    pub allowed: bool,
    pub weight_constant: f64,
    params: BTreeMap<String, Param>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_enabled: true,
            allowed: true,
            weight_constant: 0.0,
            params: BTreeMap::new(),
        }
    }

    pub fn with_weight_constant(mut self, weight: f64) -> Self {
        self.weight_constant = weight;
        self
    }

    pub fn with_default_enabled(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }

    pub fn with_allowed(mut self, allowed: bool) -> Self {
        self.allowed = allowed;
        self
    }

    /// Add a param, replacing any previous declaration of the same name.
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.insert(param.name.clone(), param);
        self
    }

    pub(crate) fn insert(&mut self, param: Param) -> Option<Param> {
        self.params.insert(param.name.clone(), param)
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.params.values()
    }

    /// Component weight: its constant when enabled plus every param's weight.
    ///
    /// `state` maps param names to their per-evaluation state; params absent
    /// from it are disabled.
    pub fn weight(
        &self,
        enabled: bool,
        state: &BTreeMap<String, ParamState>,
        catalog: &FieldCatalog,
    ) -> f64 {
        let own = if enabled { self.weight_constant } else { 0.0 };
        own + self
            .params
            .values()
            .filter_map(|p| state.get(&p.name).map(|s| p.weight(s, catalog)))
            .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_weight_sums_enabled_params() {
        let component = Component::new("select")
            .with_weight_constant(10.0)
            .with_param(Param::integer("rows").with_weights(1.0, 0.5))
            .with_param(Param::boolean("facet").with_weights(20.0, 0.0));
        let catalog = FieldCatalog::default();

        let mut reasons = Vec::new();
        let mut state = BTreeMap::new();
        let rows = component.param("rows").unwrap();
        state.insert(
            "rows".to_string(),
            rows.apply(&["20".to_string()], &catalog, &mut reasons),
        );

        assert_eq!(component.weight(true, &state, &catalog), 10.0 + 1.0 + 10.0);
        assert_eq!(component.weight(false, &state, &catalog), 11.0);
        assert_eq!(component.params().count(), 2);
    }
}
