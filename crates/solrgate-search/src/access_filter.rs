//! Access-filtered autosuggest.
//!
//! Suggestion candidates come straight from the suggester, which knows
//! nothing about entitlements. Each candidate is re-checked by probing the
//! search index for its title under the caller's access filter; only titles
//! with at least one visible match survive.
//!
//! Probing is one network round trip per candidate, so the candidate list is
//! split recursively across a parallelism budget. Every branch of one
//! filtering call shares a single [`AccessFilterSession`], which fetches the
//! caller's filter at most once no matter how many branches ask for it.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, try_join};
use solrgate_config::{ParamMap, SuggestConfig};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, trace};

use crate::client::{SolrClient, SolrError};
use crate::entitlement::{AccessFilter, AccessFilterSupplier, CallerDescriptor, EntitlementError};
use crate::response::Suggestion;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    #[error("probe failed: {0}")]
    Probe(#[from] SolrError),
}

/// Existence check for one title under an access filter.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Number of documents matching `title` that `filter` lets through.
    async fn count(&self, filter: &AccessFilter, title: &str) -> Result<u64, FilterError>;
}

/// One caller's access filter, fetched lazily and at most once.
pub struct AccessFilterSession {
    supplier: Arc<dyn AccessFilterSupplier>,
    caller: CallerDescriptor,
    filter: OnceCell<AccessFilter>,
}

impl AccessFilterSession {
    pub fn new(supplier: Arc<dyn AccessFilterSupplier>, caller: CallerDescriptor) -> Self {
        Self {
            supplier,
            caller,
            filter: OnceCell::new(),
        }
    }

    /// The caller's filter. Concurrent first callers wait on a single fetch;
    /// a failed fetch leaves the cell empty and is reported to every waiter
    /// that attempted it.
    pub async fn filter(&self) -> Result<&AccessFilter, FilterError> {
        let filter = self
            .filter
            .get_or_try_init(|| async {
                debug!(user = ?self.caller.user, "Fetching access filter");
                self.supplier.fetch(&self.caller).await
            })
            .await?;
        Ok(filter)
    }
}

/// Splits candidates across up to `parallelism` concurrent probe branches.
pub struct ParallelAccessFilter<P> {
    probe: P,
    parallelism: usize,
}

impl<P: Probe> ParallelAccessFilter<P> {
    pub fn new(probe: P, parallelism: usize) -> Self {
        Self {
            probe,
            parallelism: parallelism.max(1),
        }
    }

    /// Keep the candidates visible under the session's filter, in input
    /// order, up to `wanted` of them.
    ///
    /// Each leaf stops probing once it alone has kept `wanted` candidates;
    /// sibling leaves do not signal each other, so more probes than strictly
    /// needed may run.
    #[instrument(skip_all, fields(candidates = candidates.len(), wanted = wanted, parallelism = self.parallelism))]
    pub async fn filter(
        &self,
        session: &AccessFilterSession,
        candidates: &[Suggestion],
        wanted: usize,
    ) -> Result<Vec<Suggestion>, FilterError> {
        if wanted == 0 || candidates.is_empty() {
            return Ok(Vec::new());
        }
        let mut kept = self
            .branch(session, candidates, wanted, self.parallelism)
            .await?;
        kept.truncate(wanted);
        debug!(kept = kept.len(), "Access filtering finished");
        Ok(kept)
    }

    fn branch<'a>(
        &'a self,
        session: &'a AccessFilterSession,
        candidates: &'a [Suggestion],
        wanted: usize,
        budget: usize,
    ) -> BoxFuture<'a, Result<Vec<Suggestion>, FilterError>> {
        async move {
            if budget <= 1 || candidates.len() < 2 {
                return self.leaf(session, candidates, wanted).await;
            }
            let (left, right) = candidates.split_at(candidates.len() / 2);
            let left_budget = budget / 2;
            let (mut head, tail) = try_join(
                self.branch(session, left, wanted, left_budget),
                self.branch(session, right, wanted, budget - left_budget),
            )
            .await?;
            head.extend(tail);
            Ok(head)
        }
        .boxed()
    }

    async fn leaf(
        &self,
        session: &AccessFilterSession,
        candidates: &[Suggestion],
        wanted: usize,
    ) -> Result<Vec<Suggestion>, FilterError> {
        let filter = session.filter().await?;
        let mut kept = Vec::new();
        for candidate in candidates {
            if kept.len() >= wanted {
                break;
            }
            let matches = self.probe.count(filter, &candidate.term).await?;
            trace!(term = %candidate.term, matches, "Probed candidate");
            if matches > 0 {
                kept.push(candidate.clone());
            }
        }
        Ok(kept)
    }
}

/// Probe backed by a `rows=0` Solr search on the title field.
#[derive(Debug, Clone)]
pub struct SolrProbe {
    client: SolrClient,
    handler: String,
    title_field: String,
}

impl SolrProbe {
    pub fn new(client: SolrClient, config: &SuggestConfig) -> Self {
        Self {
            client,
            handler: config.probe_handler.clone(),
            title_field: config.title_field.clone(),
        }
    }

    /// Query parameters for one probe.
    pub fn params(&self, filter: &AccessFilter, title: &str) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert(
            "q".into(),
            vec![format!("{}:\"{}\"", self.title_field, escape_phrase(title))],
        );
        params.insert("rows".into(), vec!["0".into()]);
        if !filter.is_empty() {
            params.insert("fq".into(), filter.tagged_clauses());
        }
        params.insert("facet".into(), vec!["false".into()]);
        params.insert("hl".into(), vec!["false".into()]);
        params
    }
}

#[async_trait]
impl Probe for SolrProbe {
    async fn count(&self, filter: &AccessFilter, title: &str) -> Result<u64, FilterError> {
        let response = self
            .client
            .search(&self.handler, &self.params(filter, title))
            .await?;
        Ok(response.response.num_found)
    }
}

/// Escape a term for use inside a double-quoted Solr phrase.
fn escape_phrase(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
