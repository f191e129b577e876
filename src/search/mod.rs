//! Keyword search engine: case-variant full-text search with deduplication.
//!
//! The server's `SEARCH TEXT` may or may not fold case, so one query is
//! issued per case variant and the results are unioned. Redundant when the
//! server is already case-insensitive; the union makes that harmless.

pub mod variants;

use tracing::{debug, error, info};

use crate::error::SearchVariantError;
use crate::mail::transport::text_criterion;
use crate::mail::{MailSession, MailTransport};
use crate::model::message_id::MessageIdSet;

pub use variants::keyword_variants;

/// Result of [`search`]: the matched ids and any variant queries that failed.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Deduplicated ids matched by at least one variant.
    pub ids: MessageIdSet,
    /// Variants that were queried, in order.
    pub variants: Vec<String>,
    /// Variant queries that failed and contributed nothing.
    pub failures: Vec<SearchVariantError>,
}

impl SearchOutcome {
    /// `true` when every variant query failed (as opposed to matching nothing).
    pub fn all_failed(&self) -> bool {
        !self.variants.is_empty() && self.failures.len() == self.variants.len()
    }
}

/// Find every message whose subject, body, or headers contain any case
/// variant of `keyword`.
///
/// Variants are queried in a fixed order. A failing variant is skipped and
/// recorded; the remaining variants still run. Never fails.
pub fn search<T: MailTransport>(session: &mut MailSession<T>, keyword: &str) -> SearchOutcome {
    let mut outcome = SearchOutcome {
        variants: keyword_variants(keyword),
        ..SearchOutcome::default()
    };
    if outcome.variants.is_empty() {
        debug!("Empty keyword, nothing to search");
        return outcome;
    }

    for variant in &outcome.variants {
        let result = session
            .transport()
            .and_then(|transport| transport.text_search(&text_criterion(variant)));
        match result {
            Ok(ids) => {
                debug!(variant = %variant, matches = ids.len(), "Variant searched");
                outcome.ids.extend(ids);
            }
            Err(source) => {
                error!(variant = %variant, error = %source, "Variant search failed, skipping");
                outcome.failures.push(SearchVariantError {
                    variant: variant.clone(),
                    source,
                });
            }
        }
    }

    info!(
        keyword = %keyword.trim(),
        matches = outcome.ids.len(),
        failed_variants = outcome.failures.len(),
        "Search finished"
    );
    outcome
}
