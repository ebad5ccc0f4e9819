//! Admission evaluation of a single request against a [`Profile`].
//!
//! Every call builds its own state table; the profile is shared read-only, so
//! one evaluator can serve any number of concurrent requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use solrgate_config::ParamMap;
use tracing::debug;

use crate::param::ParamState;
use crate::profile::Profile;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// No component is configured for the requested handler.
    UnknownHandler,
    /// At least one legality check failed.
    IllegalInput,
    /// Input is legal but the total weight exceeds the limit.
    Overweight,
}

/// Weight contributed by one component constant, declared param or unlisted
/// param.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub name: String,
    pub weight: f64,
}

/// Outcome of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub allowed: bool,
    pub weight: f64,
    pub max_weight: f64,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<Contribution>,
}

impl Decision {
    fn unknown_handler(handler: &str, max_weight: f64) -> Self {
        Self {
            allowed: false,
            weight: 0.0,
            max_weight,
            reasons: vec![format!("no policy component for handler '{handler}'")],
            rejection: Some(Rejection::UnknownHandler),
            breakdown: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    profile: Arc<Profile>,
}

impl Evaluator {
    pub fn new(profile: Arc<Profile>) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Score `params` for `handler`.
    ///
    /// `max_weight` overrides the profile's limit for this call only.
    pub fn evaluate(&self, handler: &str, params: &ParamMap, max_weight: Option<f64>) -> Decision {
        let profile = &*self.profile;
        let max_weight = max_weight.unwrap_or(profile.max_weight);

        let Some(component) = profile.component(handler) else {
            debug!(handler, "No policy component for handler");
            return Decision::unknown_handler(handler, max_weight);
        };
        let catalog = profile.catalog();

        let mut reasons = Vec::new();
        let mut states: BTreeMap<String, ParamState> = BTreeMap::new();
        let mut enabled = component.default_enabled;
        let mut unlisted = Vec::new();

        if !component.allowed {
            reasons.push(format!("handler '{handler}' is not allowed"));
        }

        for (name, values) in params {
            match component.param(name) {
                Some(param) => {
                    if !param.allowed {
                        reasons.push(format!("param '{name}' is not allowed"));
                    }
                    let state = param.apply(values, catalog, &mut reasons);
                    states.insert(name.clone(), state);
                    enabled = true;
                }
                None if profile.unlisted_params.allowed => {
                    unlisted.push(Contribution {
                        name: name.clone(),
                        weight: profile.unlisted_params.weight,
                    });
                }
                None => reasons.push(format!("param '{name}' is not listed")),
            }
        }

        let unlisted_weight: f64 = unlisted.iter().map(|c| c.weight).sum();
        let weight = component.weight(enabled, &states, catalog) + unlisted_weight;

        let mut breakdown = Vec::with_capacity(states.len() + unlisted.len() + 1);
        if enabled {
            breakdown.push(Contribution {
                name: component.name.clone(),
                weight: component.weight_constant,
            });
        }
        for name in params.keys() {
            if let (Some(param), Some(state)) = (component.param(name), states.get(name)) {
                breakdown.push(Contribution {
                    name: name.clone(),
                    weight: param.weight(state, catalog),
                });
            }
        }
        breakdown.extend(unlisted);

        let rejection = if !reasons.is_empty() {
            Some(Rejection::IllegalInput)
        } else if weight > max_weight {
            Some(Rejection::Overweight)
        } else {
            None
        };

        debug!(
            handler,
            weight,
            max_weight,
            violations = reasons.len(),
            "Evaluated request"
        );

        Decision {
            allowed: rejection.is_none(),
            weight,
            max_weight,
            reasons,
            rejection,
            breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::field::{Field, FieldCatalog};
    use crate::param::{FieldsRule, Param, ParamKind};
    use crate::profile::UnlistedParams;

    fn profile() -> Arc<Profile> {
        let catalog = FieldCatalog::new(
            vec![Field::new("id", 1.0), Field::new("title", 2.0)],
            false,
            3.0,
        );
        let select = Component::new("select")
            .with_weight_constant(10.0)
            .with_param(Param::string("q").with_weights(1.0, 0.1))
            .with_param(
                Param::new("rows", ParamKind::Integer { max_value: Some(100) })
                    .with_weights(0.0, 1.0),
            )
            .with_param(
                Param::fields(
                    "fl",
                    FieldsRule {
                        allowed_fields: Some(
                            ["id", "title"].iter().map(|s| s.to_string()).collect(),
                        ),
                        ..Default::default()
                    },
                )
                .with_weights(0.0, 1.0),
            )
            .with_param(Param::string("debugQuery").with_allowed(false));
        Arc::new(
            Profile::new(
                50.0,
                catalog,
                UnlistedParams {
                    allowed: true,
                    weight: 0.5,
                },
            )
            .with_component(select),
        )
    }

    fn params(pairs: &[(&str, &str)]) -> ParamMap {
        let mut map = ParamMap::new();
        for (k, v) in pairs {
            map.entry(k.to_string()).or_default().push(v.to_string());
        }
        map
    }

    #[test]
    fn test_allowed_request() {
        let evaluator = Evaluator::new(profile());
        let decision = evaluator.evaluate(
            "select",
            &params(&[("q", "abcdefghij"), ("rows", "10"), ("fl", "id,title"), ("wt", "json")]),
            None,
        );
        assert!(decision.allowed, "{:?}", decision.reasons);
        assert_eq!(decision.rejection, None);
        // 10 (component) + 2 (q) + 10 (rows) + 3 (fl) + 0.5 (unlisted wt)
        assert_eq!(decision.weight, 25.5);
        assert_eq!(decision.max_weight, 50.0);
        assert_eq!(decision.breakdown[0].name, "select");
        assert_eq!(decision.breakdown.last().unwrap().name, "wt");
    }

    #[test]
    fn test_unknown_handler() {
        let decision = Evaluator::new(profile()).evaluate("admin", &ParamMap::new(), None);
        assert!(!decision.allowed);
        assert_eq!(decision.rejection, Some(Rejection::UnknownHandler));
    }

    #[test]
    fn test_overweight_vs_illegal() {
        let evaluator = Evaluator::new(profile());
        let heavy = evaluator.evaluate("select", &params(&[("rows", "90")]), None);
        assert_eq!(heavy.rejection, Some(Rejection::Overweight));
        assert!(heavy.reasons.is_empty());

        let illegal = evaluator.evaluate("select", &params(&[("rows", "500")]), None);
        assert_eq!(illegal.rejection, Some(Rejection::IllegalInput));
        assert!(illegal.reasons[0].contains("500"));
        assert!(illegal.reasons[0].contains("100"));
    }

    #[test]
    fn test_huge_multi_value_integers_are_overweight() {
        let facet = Component::new("facet").with_param(
            Param::integer("facet.limit")
                .with_weights(0.0, 1.0)
                .with_multi_value(true),
        );
        let profile = Profile::new(
            50.0,
            FieldCatalog::new(Vec::new(), false, 0.0),
            UnlistedParams::default(),
        )
        .with_component(facet);
        let max = i64::MAX.to_string();
        let decision = Evaluator::new(Arc::new(profile)).evaluate(
            "facet",
            &params(&[("facet.limit", max.as_str()), ("facet.limit", max.as_str())]),
            None,
        );
        assert!(decision.weight > 0.0, "weight was {}", decision.weight);
        assert!(!decision.allowed);
        assert_eq!(decision.rejection, Some(Rejection::Overweight));
    }

    #[test]
    fn test_explicit_max_weight_overrides_profile() {
        let evaluator = Evaluator::new(profile());
        let decision = evaluator.evaluate("select", &params(&[("rows", "90")]), Some(200.0));
        assert!(decision.allowed);
        assert_eq!(decision.max_weight, 200.0);
    }

    #[test]
    fn test_disallowed_param_and_field() {
        let evaluator = Evaluator::new(profile());
        let decision = evaluator.evaluate(
            "select",
            &params(&[("debugQuery", "true"), ("fl", "id,secret")]),
            None,
        );
        assert_eq!(decision.rejection, Some(Rejection::IllegalInput));
        assert!(decision.reasons.iter().any(|r| r.contains("debugQuery")));
        assert!(decision.reasons.iter().any(|r| r.contains("secret")));
    }

    #[test]
    fn test_component_weight_is_monotone_in_rows() {
        let evaluator = Evaluator::new(profile());
        let mut last = f64::MIN;
        for rows in [0, 1, 5, 20, 40, 99] {
            let decision =
                evaluator.evaluate("select", &params(&[("rows", &rows.to_string())]), Some(1e9));
            assert!(decision.weight >= last);
            last = decision.weight;
        }
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let evaluator = Evaluator::new(profile());
        let request = params(&[("q", "hello"), ("rows", "7"), ("fl", "*")]);
        let first = evaluator.evaluate("select", &request, None);
        let second = evaluator.evaluate("select", &request, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_decision_serializes_camel_case() {
        let decision = Evaluator::new(profile()).evaluate("admin", &ParamMap::new(), None);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["maxWeight"], 50.0);
        assert_eq!(json["rejection"], "unknown_handler");
        assert!(json.get("breakdown").is_none());
    }
}
