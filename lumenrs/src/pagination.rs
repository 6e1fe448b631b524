//! Cursor-based pagination utilities.
//!
//! Cursors are stateless: they carry the next row offset and a hash of the
//! query they belong to, encoded as URL-safe base64 JSON.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{LumenError, Result};
use crate::metric_query::CompiledMetricQuery;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Row offset of the next page.
    pub offset: u64,
    /// Hash of the query the cursor was issued for.
    pub query_hash: u64,
}

impl Cursor {
    pub fn new(offset: u64, query_hash: u64) -> Self {
        Self { offset, query_hash }
    }

    /// Encode cursor to a URL-safe base64 string.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| LumenError::Execution(format!("failed to serialize cursor: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }

    /// Decode cursor from a base64 string.
    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| LumenError::Parameter(format!("invalid cursor encoding: {e}")))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| LumenError::Parameter(format!("invalid cursor UTF-8: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| LumenError::Parameter(format!("invalid cursor format: {e}")))
    }

    /// Validate that this cursor matches the given query hash.
    pub fn validate_query_hash(&self, expected_hash: u64) -> Result<()> {
        if self.query_hash != expected_hash {
            return Err(LumenError::Parameter(
                "cursor does not match current query - the query parameters may have changed"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Hash of everything that defines a query's result set.
///
/// Cursors can only be used with the query they were created for.
pub fn compute_query_hash(query: &CompiledMetricQuery) -> u64 {
    let mut hasher = DefaultHasher::new();

    query.explore_name.hash(&mut hasher);
    query.dimensions.hash(&mut hasher);
    query.metrics.hash(&mut hasher);
    query.limit.hash(&mut hasher);

    for part in [
        serde_json::to_string(&query.filters),
        serde_json::to_string(&query.sorts),
        serde_json::to_string(&query.custom_dimensions),
        serde_json::to_string(&query.compiled_table_calculations),
        serde_json::to_string(&query.compiled_additional_metrics),
    ]
    .into_iter()
    .flatten()
    {
        part.hash(&mut hasher);
    }

    hasher.finish()
}

/// Wrap a compiled statement so only one page of it is returned.
///
/// A subquery's ORDER BY does not survive the wrapping on every warehouse, so
/// the statement's sort is repeated on the outer query.
pub fn paginate_sql(sql: &str, order_by: Option<&str>, page_size: u64, offset: u64) -> String {
    let order = order_by
        .map(|orders| format!("\nORDER BY {orders}"))
        .unwrap_or_default();
    format!(
        "SELECT * FROM (\n{sql}\n) AS paginated_query{order}\nLIMIT {page_size} OFFSET {offset}"
    )
}
