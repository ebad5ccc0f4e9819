//! Weight-based admission control for search requests.
//!
//! A [`Profile`] is compiled once from [`solrgate_config::PolicySettings`] and
//! then only read. The [`Evaluator`] scores a request's raw parameters
//! against it and returns a [`Decision`] carrying the weight, the limit and
//! every legality problem found.
//!
//! ```ignore
//! let policy = ReloadablePolicy::from_settings(&config.policy)?;
//! let decision = policy.evaluator().evaluate("select", &params, None);
//! if !decision.allowed {
//!     // decision.rejection tells which way it failed
//! }
//! ```

pub mod component;
pub mod error;
pub mod evaluator;
pub mod field;
pub mod param;
pub mod profile;
pub mod reloadable;

pub use component::Component;
pub use error::PolicyError;
pub use evaluator::{Contribution, Decision, Evaluator, Rejection};
pub use field::{Field, FieldCatalog, FieldCost};
pub use param::{FieldsRule, Param, ParamKind, ParamState, TypedValue};
pub use profile::{Profile, UnlistedParams};
pub use reloadable::ReloadablePolicy;
