use thiserror::Error;

/// Errors raised while compiling a policy definition into a profile.
///
/// All of them are fatal: a profile is either built completely or not at all.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("{entity} #{index} is missing mandatory attribute '{attribute}'")]
    MissingAttribute {
        entity: &'static str,
        index: usize,
        attribute: &'static str,
    },

    #[error("param '{param}' in component '{component}' has unknown type '{kind}'")]
    UnknownParamType {
        component: String,
        param: String,
        kind: String,
    },

    #[error("duplicate {entity} '{name}'")]
    Duplicate { entity: &'static str, name: String },

    #[error("{entity} '{name}' has negative {attribute} {value}")]
    NegativeWeight {
        entity: &'static str,
        name: String,
        attribute: &'static str,
        value: f64,
    },
}

impl PolicyError {
    pub fn missing(entity: &'static str, index: usize, attribute: &'static str) -> Self {
        Self::MissingAttribute {
            entity,
            index,
            attribute,
        }
    }

    pub fn duplicate(entity: &'static str, name: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            name: name.into(),
        }
    }
}

/// Reject negative weight settings; every weight contribution must be
/// non-decreasing in its input.
pub(crate) fn ensure_non_negative(
    entity: &'static str,
    name: &str,
    attribute: &'static str,
    value: f64,
) -> Result<(), PolicyError> {
    if value < 0.0 || value.is_nan() {
        return Err(PolicyError::NegativeWeight {
            entity,
            name: name.to_string(),
            attribute,
            value,
        });
    }
    Ok(())
}
