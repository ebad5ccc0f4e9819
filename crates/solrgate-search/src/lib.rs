//! Backend plumbing for the solrgate gateway.
//!
//! - [`merger`] builds the outgoing parameter map from defaults, user input
//!   and forced values
//! - [`client`] talks to Solr
//! - [`entitlement`] resolves a caller's access filter
//! - [`access_filter`] re-validates autosuggest candidates under that filter
//! - [`strip`] removes the gateway's filter from echoed params

pub mod access_filter;
pub mod client;
pub mod entitlement;
pub mod merger;
pub mod response;
pub mod strip;

pub use access_filter::{AccessFilterSession, FilterError, ParallelAccessFilter, Probe, SolrProbe};
pub use client::{RawResponse, SolrClient, SolrError};
pub use entitlement::{
    AccessFilter, AccessFilterSupplier, CallerDescriptor, EntitlementError, HttpEntitlementClient,
    Unrestricted, supplier_from_config,
};
pub use merger::{MergerError, ParamMerger};
pub use response::{SearchResponse, SuggestResponse, SuggestResult, Suggestion};
pub use strip::{ACCESS_MARKER, ResponseFormat, StripError, strip_access_filters, tag_filter};
