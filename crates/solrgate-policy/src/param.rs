//! Declared request parameters: decoding, legality checks and weight formulas.
//!
//! A [`Param`] is immutable configuration. Everything a request does to it is
//! captured in a separate [`ParamState`] owned by the evaluation in progress.

use std::collections::BTreeSet;
use std::fmt;

use crate::field::{FieldCatalog, FieldCost};

/// The wildcard accepted by field-list params when `supports_star` is set.
pub const STAR: &str = "*";

/// Type-specific part of a param declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Free text. Cost grows with character count (or value count when
    /// multi-valued).
    String { max_length: Option<usize> },
    /// Integer. Cost grows with the numeric value.
    Integer { max_value: Option<i64> },
    /// Flag. Costs its constant only when true.
    Boolean,
    /// Field list such as `fl`. Cost grows with the weight of requested fields.
    Fields(FieldsRule),
}

impl ParamKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "string" => Some(Self::String { max_length: None }),
            "integer" => Some(Self::Integer { max_value: None }),
            "boolean" => Some(Self::Boolean),
            "fields" => Some(Self::Fields(FieldsRule::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Integer { .. } => "integer",
            Self::Boolean => "boolean",
            Self::Fields(_) => "fields",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Allow/deny rules for field-list params.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldsRule {
    pub allowed_fields: Option<BTreeSet<String>>,
    pub denied_fields: BTreeSet<String>,
    pub supports_star: bool,
}

/// Decoded value of a param for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(Vec<String>),
    Integer(Vec<i64>),
    Boolean(bool),
    Fields(Vec<String>),
}

/// Per-evaluation state of one param.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamState {
    pub enabled: bool,
    pub value: Option<TypedValue>,
}

/// A declared, weighted and validated request parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub allowed: bool,
    pub weight_constant: f64,
    pub weight_factor: f64,
    pub multi_value: bool,
    pub kind: ParamKind,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            allowed: true,
            weight_constant: 0.0,
            weight_factor: 0.0,
            multi_value: false,
            kind,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String { max_length: None })
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer { max_value: None })
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    pub fn fields(name: impl Into<String>, rule: FieldsRule) -> Self {
        Self::new(name, ParamKind::Fields(rule))
    }

    pub fn with_weights(mut self, constant: f64, factor: f64) -> Self {
        self.weight_constant = constant;
        self.weight_factor = factor;
        self
    }

    pub fn with_multi_value(mut self, multi_value: bool) -> Self {
        self.multi_value = multi_value;
        self
    }

    pub fn with_allowed(mut self, allowed: bool) -> Self {
        self.allowed = allowed;
        self
    }

    /// Decode `values`, validate them and return the resulting state.
    ///
    /// Legality problems are appended to `reasons`; they never abort decoding
    /// so that the weight of the request can still be reported.
    pub fn apply(
        &self,
        values: &[String],
        catalog: &FieldCatalog,
        reasons: &mut Vec<String>,
    ) -> ParamState {
        if !self.multi_value && values.len() > 1 {
            reasons.push(format!(
                "param '{}' accepts a single value but got {}",
                self.name,
                values.len()
            ));
        }
        let values = if self.multi_value {
            values
        } else {
            &values[..values.len().min(1)]
        };

        match &self.kind {
            ParamKind::String { max_length } => {
                let length = self.text_length(values);
                if let Some(max) = max_length
                    && length > *max
                {
                    let what = if self.multi_value { "value count" } else { "length" };
                    reasons.push(format!(
                        "param '{}' {what} {length} exceeds maxLength {max}",
                        self.name
                    ));
                }
                ParamState {
                    enabled: true,
                    value: Some(TypedValue::Text(values.to_vec())),
                }
            }
            ParamKind::Integer { max_value } => {
                let mut decoded = Vec::with_capacity(values.len());
                for raw in values {
                    match raw.trim().parse::<i64>() {
                        Ok(value) => {
                            if let Some(max) = max_value
                                && value > *max
                            {
                                reasons.push(format!(
                                    "param '{}' value {value} exceeds maxValue {max}",
                                    self.name
                                ));
                            }
                            decoded.push(value);
                        }
                        Err(_) => reasons.push(format!(
                            "param '{}': '{raw}' is not an integer",
                            self.name
                        )),
                    }
                }
                ParamState {
                    enabled: true,
                    value: Some(TypedValue::Integer(decoded)),
                }
            }
            ParamKind::Boolean => {
                let raw = values.first().map(String::as_str).unwrap_or("");
                match parse_bool(raw) {
                    Some(flag) => ParamState {
                        enabled: flag,
                        value: Some(TypedValue::Boolean(flag)),
                    },
                    None => {
                        reasons.push(format!("param '{}': '{raw}' is not a boolean", self.name));
                        ParamState {
                            enabled: false,
                            value: None,
                        }
                    }
                }
            }
            ParamKind::Fields(rule) => {
                let requested = split_field_list(values);
                for field in &requested {
                    self.check_field(rule, field, catalog, reasons);
                }
                ParamState {
                    enabled: true,
                    value: Some(TypedValue::Fields(requested)),
                }
            }
        }
    }

    /// Weight contributed by this param in the given state.
    pub fn weight(&self, state: &ParamState, catalog: &FieldCatalog) -> f64 {
        if !state.enabled {
            return 0.0;
        }
        match (&self.kind, &state.value) {
            (ParamKind::String { .. }, Some(TypedValue::Text(values))) => {
                self.weight_constant + self.weight_factor * self.text_length(values) as f64
            }
            (ParamKind::Integer { .. }, Some(TypedValue::Integer(values))) => {
                // Negative values cost nothing beyond the constant
                let total: f64 = values.iter().map(|v| (*v).max(0) as f64).sum();
                self.weight_constant + self.weight_factor * total
            }
            (ParamKind::Boolean, Some(TypedValue::Boolean(true))) => self.weight_constant,
            (ParamKind::Boolean, _) => 0.0,
            (ParamKind::Fields(_), Some(TypedValue::Fields(fields))) => {
                let total: f64 = fields
                    .iter()
                    .map(|f| {
                        if f == STAR {
                            catalog.total_weight()
                        } else {
                            catalog.cost(f).weight()
                        }
                    })
                    .sum();
                self.weight_constant + self.weight_factor * total
            }
            _ => self.weight_constant,
        }
    }

    fn text_length(&self, values: &[String]) -> usize {
        if self.multi_value {
            values.len()
        } else {
            values.first().map(|v| v.chars().count()).unwrap_or(0)
        }
    }

    fn check_field(
        &self,
        rule: &FieldsRule,
        field: &str,
        catalog: &FieldCatalog,
        reasons: &mut Vec<String>,
    ) {
        if field == STAR {
            if !rule.supports_star {
                reasons.push(format!("param '{}': '{STAR}' is not supported", self.name));
            }
            return;
        }
        if rule.denied_fields.contains(field) {
            reasons.push(format!("param '{}': field '{field}' is denied", self.name));
            return;
        }
        if let Some(allowed) = &rule.allowed_fields
            && !allowed.contains(field)
        {
            reasons.push(format!(
                "param '{}': field '{field}' is not in the allowed fields",
                self.name
            ));
            return;
        }
        if let FieldCost::Unlisted { allowed: false, .. } = catalog.cost(field) {
            reasons.push(format!(
                "param '{}': field '{field}' is not listed",
                self.name
            ));
        }
    }
}

/// Solr-style boolean decoding.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Split `fl`-style values on commas and whitespace, dropping empties and
/// duplicates while keeping first-seen order.
fn split_field_list(values: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .iter()
        .flat_map(|v| v.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|f| !f.is_empty())
        .filter(|f| seen.insert(f.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(
            vec![
                Field::new("id", 1.0),
                Field::new("title", 2.0),
                Field::new("fulltext", 10.0),
            ],
            false,
            5.0,
        )
    }

    fn vals(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_huge_multi_value_integers_do_not_wrap() {
        let param = Param::integer("rows")
            .with_weights(1.0, 1.0)
            .with_multi_value(true);
        let mut reasons = Vec::new();
        let max = i64::MAX.to_string();
        let state = param.apply(&vals(&[max.as_str(), max.as_str()]), &catalog(), &mut reasons);
        assert!(reasons.is_empty());
        let weight = param.weight(&state, &catalog());
        assert!(weight > i64::MAX as f64, "weight was {weight}");
    }

    #[test]
    fn test_string_weight_uses_char_count() {
        let param = Param::string("q").with_weights(1.0, 0.5);
        let mut reasons = Vec::new();
        let state = param.apply(&vals(&["ærø"]), &catalog(), &mut reasons);
        assert!(reasons.is_empty());
        assert_eq!(param.weight(&state, &catalog()), 1.0 + 0.5 * 3.0);
    }

    #[test]
    fn test_multi_value_string_uses_element_count() {
        let param = Param::new("fq", ParamKind::String { max_length: Some(2) })
            .with_weights(0.0, 4.0)
            .with_multi_value(true);
        let mut reasons = Vec::new();
        let state = param.apply(&vals(&["a:1", "b:2", "c:3"]), &catalog(), &mut reasons);
        assert_eq!(param.weight(&state, &catalog()), 12.0);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("value count 3 exceeds maxLength 2"));
    }

    #[test]
    fn test_single_value_param_rejects_repeats() {
        let param = Param::string("q");
        let mut reasons = Vec::new();
        param.apply(&vals(&["a", "b"]), &catalog(), &mut reasons);
        assert_eq!(reasons, vec!["param 'q' accepts a single value but got 2"]);
    }

    #[test]
    fn test_integer_over_max_cites_both_values() {
        let param = Param::new("rows", ParamKind::Integer { max_value: Some(100) })
            .with_weights(1.0, 0.1);
        let mut reasons = Vec::new();
        let state = param.apply(&vals(&["500"]), &catalog(), &mut reasons);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("500"));
        assert!(reasons[0].contains("maxValue 100"));
        assert_eq!(param.weight(&state, &catalog()), 51.0);
    }

    #[test]
    fn test_integer_not_a_number() {
        let param = Param::integer("rows").with_weights(1.0, 1.0);
        let mut reasons = Vec::new();
        let state = param.apply(&vals(&["ten"]), &catalog(), &mut reasons);
        assert_eq!(reasons, vec!["param 'rows': 'ten' is not an integer"]);
        assert_eq!(param.weight(&state, &catalog()), 1.0);
    }

    #[test]
    fn test_boolean_false_disables() {
        let param = Param::boolean("facet").with_weights(25.0, 0.0);
        let mut reasons = Vec::new();
        let on = param.apply(&vals(&["true"]), &catalog(), &mut reasons);
        let off = param.apply(&vals(&["off"]), &catalog(), &mut reasons);
        assert!(reasons.is_empty());
        assert_eq!(param.weight(&on, &catalog()), 25.0);
        assert!(!off.enabled);
        assert_eq!(param.weight(&off, &catalog()), 0.0);

        param.apply(&vals(&["maybe"]), &catalog(), &mut reasons);
        assert_eq!(reasons, vec!["param 'facet': 'maybe' is not a boolean"]);
    }

    #[test]
    fn test_fields_weight_sums_field_costs() {
        let param = Param::fields("fl", FieldsRule::default()).with_weights(2.0, 1.0);
        let mut reasons = Vec::new();
        let state = param.apply(&vals(&["id,title title"]), &catalog(), &mut reasons);
        assert!(reasons.is_empty());
        assert_eq!(
            state.value,
            Some(TypedValue::Fields(vals(&["id", "title"])))
        );
        assert_eq!(param.weight(&state, &catalog()), 2.0 + 3.0);
    }

    #[test]
    fn test_fields_star_requires_support() {
        let param = Param::fields("fl", FieldsRule::default()).with_weights(0.0, 1.0);
        let mut reasons = Vec::new();
        param.apply(&vals(&["*"]), &catalog(), &mut reasons);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("'fl'"));
        assert!(reasons[0].contains("'*'"));

        let starry = Param::fields(
            "fl",
            FieldsRule {
                supports_star: true,
                ..Default::default()
            },
        )
        .with_weights(0.0, 1.0);
        let mut reasons = Vec::new();
        let state = starry.apply(&vals(&["*"]), &catalog(), &mut reasons);
        assert!(reasons.is_empty());
        assert_eq!(starry.weight(&state, &catalog()), 13.0);
    }

    #[test]
    fn test_fields_allow_and_deny_lists() {
        let rule = FieldsRule {
            allowed_fields: Some(["title", "id"].iter().map(|s| s.to_string()).collect()),
            denied_fields: ["fulltext"].iter().map(|s| s.to_string()).collect(),
            supports_star: false,
        };
        let param = Param::fields("fl", rule);
        let mut reasons = Vec::new();
        param.apply(&vals(&["title,id,secret,fulltext"]), &catalog(), &mut reasons);
        assert_eq!(
            reasons,
            vec![
                "param 'fl': field 'secret' is not in the allowed fields",
                "param 'fl': field 'fulltext' is denied",
            ]
        );
    }

    #[test]
    fn test_unlisted_field_cost_and_gate() {
        let param = Param::fields("fl", FieldsRule::default()).with_weights(0.0, 1.0);
        let mut reasons = Vec::new();
        let state = param.apply(&vals(&["mystery"]), &catalog(), &mut reasons);
        assert_eq!(reasons, vec!["param 'fl': field 'mystery' is not listed"]);
        assert_eq!(param.weight(&state, &catalog()), 5.0);

        let permissive = FieldCatalog::new(vec![], true, 5.0);
        let mut reasons = Vec::new();
        param.apply(&vals(&["mystery"]), &permissive, &mut reasons);
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_disabled_param_weighs_nothing() {
        let param = Param::integer("rows").with_weights(3.0, 1.0);
        assert_eq!(param.weight(&ParamState::default(), &catalog()), 0.0);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(ParamKind::parse("boolean"), Some(ParamKind::Boolean));
        assert_eq!(ParamKind::parse("integer").unwrap().name(), "integer");
        assert!(ParamKind::parse("date").is_none());
    }
}
