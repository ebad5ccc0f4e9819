//! Hot-swappable policy profile.
//!
//! Holds the current [`Profile`] behind an `ArcSwap`. Readers take a snapshot
//! with a single atomic load and keep using it for the whole request, while a
//! reload publishes a freshly compiled profile without blocking them.

use arc_swap::ArcSwap;
use solrgate_config::PolicySettings;
use std::sync::Arc;
use tracing::info;

use crate::error::PolicyError;
use crate::evaluator::Evaluator;
use crate::profile::Profile;

#[derive(Clone)]
pub struct ReloadablePolicy {
    inner: Arc<ArcSwap<Profile>>,
}

impl ReloadablePolicy {
    pub fn new(profile: Profile) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(profile)),
        }
    }

    /// Compile `settings` and wrap the result.
    pub fn from_settings(settings: &PolicySettings) -> Result<Self, PolicyError> {
        Ok(Self::new(Profile::from_settings(settings)?))
    }

    /// Snapshot of the current profile.
    pub fn profile(&self) -> Arc<Profile> {
        self.inner.load_full()
    }

    /// Evaluator bound to the current snapshot.
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.profile())
    }

    /// Atomically publish a new profile. Evaluations already holding the old
    /// snapshot finish against it.
    pub fn replace(&self, profile: Profile) {
        self.inner.store(Arc::new(profile));
    }

    /// Compile and publish `settings`. On error the current profile stays.
    pub fn reload(&self, settings: &PolicySettings) -> Result<(), PolicyError> {
        let profile = Profile::from_settings(settings)?;
        info!(
            components = profile.component_names().count(),
            "Policy profile reloaded"
        );
        self.replace(profile);
        Ok(())
    }
}

impl std::fmt::Debug for ReloadablePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let profile = self.inner.load();
        f.debug_struct("ReloadablePolicy")
            .field("max_weight", &profile.max_weight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solrgate_config::{ComponentSettings, FieldSettings};

    fn settings(max_weight: f64) -> PolicySettings {
        let mut settings = PolicySettings {
            max_weight,
            ..Default::default()
        };
        settings
            .components
            .insert("select".into(), ComponentSettings::default());
        settings
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let policy = ReloadablePolicy::from_settings(&settings(10.0)).unwrap();
        let before = policy.profile();
        policy.reload(&settings(20.0)).unwrap();
        assert_eq!(before.max_weight, 10.0);
        assert_eq!(policy.profile().max_weight, 20.0);
        assert_eq!(policy.evaluator().profile().max_weight, 20.0);
    }

    #[test]
    fn test_failed_reload_keeps_current() {
        let policy = ReloadablePolicy::from_settings(&settings(10.0)).unwrap();
        let mut broken = settings(30.0);
        broken.fields.push(FieldSettings {
            name: None,
            weight: Some(1.0),
        });
        assert!(policy.reload(&broken).is_err());
        assert_eq!(policy.profile().max_weight, 10.0);
    }
}
