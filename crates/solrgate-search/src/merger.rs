//! Outgoing parameter construction.
//!
//! A [`ParamMerger`] starts from a handler's default values, takes user
//! writes, and applies the handler's forced values exactly once, on the first
//! read. After that the merger is frozen and rejects writes until cleared.
//!
//! Forced values for cumulative keys (filter queries by default) are appended
//! to whatever the user or the defaults supplied, since their values AND
//! together. Forced values for every other key win outright.

use std::collections::BTreeSet;

use solrgate_config::ParamMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergerError {
    #[error("parameter '{key}' written after the merger was frozen")]
    Frozen { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Frozen,
}

#[derive(Debug, Clone)]
pub struct ParamMerger {
    defaults: ParamMap,
    forced: ParamMap,
    cumulative: BTreeSet<String>,
    values: ParamMap,
    phase: Phase,
}

impl ParamMerger {
    pub fn new(defaults: ParamMap, forced: ParamMap) -> Self {
        Self {
            values: defaults.clone(),
            defaults,
            forced,
            cumulative: BTreeSet::from(["fq".to_string()]),
            phase: Phase::Open,
        }
    }

    /// Replace the set of keys whose values are unioned with forced values.
    pub fn with_cumulative<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cumulative = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.phase == Phase::Frozen
    }

    pub fn put(&mut self, key: &str, value: impl Into<String>) -> Result<(), MergerError> {
        self.put_all(key, [value])
    }

    /// Overwrite every current value of `key`.
    pub fn put_all<I, S>(&mut self, key: &str, values: I) -> Result<(), MergerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_open(key)?;
        self.values
            .insert(key.to_string(), values.into_iter().map(Into::into).collect());
        Ok(())
    }

    pub fn add(&mut self, key: &str, value: impl Into<String>) -> Result<(), MergerError> {
        self.add_all(key, [value])
    }

    /// Append to the current values of `key`.
    pub fn add_all<I, S>(&mut self, key: &str, values: I) -> Result<(), MergerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_open(key)?;
        self.values
            .entry(key.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        Ok(())
    }

    /// Drop user and default values of `key`. Forced values still apply.
    pub fn remove(&mut self, key: &str) -> Result<(), MergerError> {
        self.ensure_open(key)?;
        self.values.shift_remove(key);
        Ok(())
    }

    /// Merged values of `key`. Freezes the merger.
    pub fn get(&mut self, key: &str) -> Option<&[String]> {
        self.freeze();
        self.values.get(key).map(Vec::as_slice)
    }

    /// The complete merged map. Freezes the merger.
    pub fn params(&mut self) -> &ParamMap {
        self.freeze();
        &self.values
    }

    pub fn into_params(mut self) -> ParamMap {
        self.freeze();
        self.values
    }

    /// Flattened `(key, value)` pairs in map order, ready for a query string.
    pub fn to_query_pairs(&mut self) -> Vec<(String, String)> {
        self.params()
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.clone(), v.clone())))
            .collect()
    }

    /// Reset to empty, or to the defaults when `keep_defaults` is set, and
    /// reopen for writes.
    pub fn clear(&mut self, keep_defaults: bool) {
        self.values = if keep_defaults {
            self.defaults.clone()
        } else {
            ParamMap::new()
        };
        self.phase = Phase::Open;
    }

    fn ensure_open(&self, key: &str) -> Result<(), MergerError> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Frozen => Err(MergerError::Frozen {
                key: key.to_string(),
            }),
        }
    }

    fn freeze(&mut self) {
        if self.phase == Phase::Frozen {
            return;
        }
        for (key, forced) in &self.forced {
            if self.cumulative.contains(key) {
                self.values
                    .entry(key.clone())
                    .or_default()
                    .extend(forced.iter().cloned());
            } else {
                self.values.insert(key.clone(), forced.clone());
            }
        }
        self.phase = Phase::Frozen;
    }
}
