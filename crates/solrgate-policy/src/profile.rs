//! The compiled, immutable policy tree.

use std::collections::{BTreeMap, BTreeSet};

use solrgate_config::{ComponentSettings, ParamSettings, PolicySettings};
use tracing::debug;

use crate::component::Component;
use crate::error::{PolicyError, ensure_non_negative};
use crate::field::{Field, FieldCatalog};
use crate::param::{FieldsRule, Param, ParamKind};

/// Policy for params a component does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnlistedParams {
    pub allowed: bool,
    pub weight: f64,
}

/// Root of the policy tree. Built once from configuration, never mutated;
/// reloads build a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub max_weight: f64,
    pub unlisted_params: UnlistedParams,
    catalog: FieldCatalog,
    components: BTreeMap<String, Component>,
}

impl Profile {
    pub fn new(max_weight: f64, catalog: FieldCatalog, unlisted_params: UnlistedParams) -> Self {
        Self {
            max_weight,
            unlisted_params,
            catalog,
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.insert(component.name.clone(), component);
        self
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Compile raw settings. Any error discards the whole profile.
    pub fn from_settings(settings: &PolicySettings) -> Result<Self, PolicyError> {
        ensure_non_negative("profile", "root", "max_weight", settings.max_weight)?;
        ensure_non_negative(
            "profile",
            "root",
            "unlisted_fields.weight",
            settings.unlisted_fields.weight,
        )?;
        ensure_non_negative(
            "profile",
            "root",
            "unlisted_params.weight",
            settings.unlisted_params.weight,
        )?;

        let mut fields = Vec::with_capacity(settings.fields.len());
        let mut seen = BTreeSet::new();
        for (index, raw) in settings.fields.iter().enumerate() {
            let name = raw
                .name
                .as_deref()
                .ok_or_else(|| PolicyError::missing("field", index, "name"))?;
            let weight = raw
                .weight
                .ok_or_else(|| PolicyError::missing("field", index, "weight"))?;
            ensure_non_negative("field", name, "weight", weight)?;
            if !seen.insert(name) {
                return Err(PolicyError::duplicate("field", name));
            }
            fields.push(Field::new(name, weight));
        }
        let catalog = FieldCatalog::new(
            fields,
            settings.unlisted_fields.allowed,
            settings.unlisted_fields.weight,
        );

        let mut profile = Profile::new(
            settings.max_weight,
            catalog,
            UnlistedParams {
                allowed: settings.unlisted_params.allowed,
                weight: settings.unlisted_params.weight,
            },
        );
        for (name, raw) in &settings.components {
            let component = compile_component(name, raw)?;
            profile.components.insert(name.clone(), component);
        }

        debug!(
            components = profile.components.len(),
            fields = profile.catalog.len(),
            max_weight = profile.max_weight,
            "Compiled policy profile"
        );
        Ok(profile)
    }
}

fn compile_component(name: &str, raw: &ComponentSettings) -> Result<Component, PolicyError> {
    ensure_non_negative("component", name, "weight_constant", raw.weight_constant)?;
    let mut component = Component::new(name)
        .with_weight_constant(raw.weight_constant)
        .with_default_enabled(raw.default_enabled)
        .with_allowed(raw.allowed);

    for (index, settings) in raw.params.iter().enumerate() {
        let param = compile_param(name, index, settings)?;
        let param_name = param.name.clone();
        if component.insert(param).is_some() {
            return Err(PolicyError::duplicate(
                "param",
                format!("{name}.{param_name}"),
            ));
        }
    }
    Ok(component)
}

fn compile_param(
    component: &str,
    index: usize,
    raw: &ParamSettings,
) -> Result<Param, PolicyError> {
    let name = raw
        .name
        .as_deref()
        .ok_or_else(|| PolicyError::missing("param", index, "name"))?;
    let kind_name = raw
        .kind
        .as_deref()
        .ok_or_else(|| PolicyError::missing("param", index, "type"))?;
    ensure_non_negative("param", name, "weight_constant", raw.weight_constant)?;
    ensure_non_negative("param", name, "weight_factor", raw.weight_factor)?;

    let kind = match ParamKind::parse(kind_name) {
        Some(ParamKind::String { .. }) => ParamKind::String {
            max_length: raw.max_length,
        },
        Some(ParamKind::Integer { .. }) => ParamKind::Integer {
            max_value: raw.max_value,
        },
        Some(ParamKind::Boolean) => ParamKind::Boolean,
        Some(ParamKind::Fields(_)) => ParamKind::Fields(FieldsRule {
            allowed_fields: raw
                .allowed_fields
                .as_ref()
                .map(|list| list.iter().cloned().collect()),
            denied_fields: raw.denied_fields.iter().cloned().collect(),
            supports_star: raw.supports_star,
        }),
        None => {
            return Err(PolicyError::UnknownParamType {
                component: component.to_string(),
                param: name.to_string(),
                kind: kind_name.to_string(),
            });
        }
    };

    Ok(Param::new(name, kind)
        .with_weights(raw.weight_constant, raw.weight_factor)
        .with_multi_value(raw.multi_value)
        .with_allowed(raw.allowed))
}
