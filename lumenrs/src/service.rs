//! Query service: limit policy, compilation and result retrieval for
//! registered explores.

use serde::Serialize;

use crate::attributes::{IntrinsicUserAttributes, UserAttributeValueMap};
use crate::config::LumenConfig;
use crate::dialect::WarehouseDialect;
use crate::error::{LumenError, Result};
use crate::executor::{Executor, PaginatedResult, ResultRow, ResultStreamer};
use crate::metric_query::CompiledMetricQuery;
use crate::pagination::{compute_query_hash, Cursor};
use crate::pivot::{pivot_results, PivotConfig};
use crate::query_builder::{CompiledQuery, SqlBuilder};
use crate::registry::ExploreRegistry;

/// Who is asking: attribute values used for row-level security.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_attributes: UserAttributeValueMap,
    pub intrinsic_attributes: IntrinsicUserAttributes,
}

/// Fully retrieved (and optionally pivoted) results of a query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    pub compiled: CompiledQuery,
    pub rows: Vec<ResultRow>,
    /// Page size in effect after any reductions.
    pub page_size: u64,
}

pub struct QueryService {
    registry: ExploreRegistry,
    config: LumenConfig,
    dialect: Box<dyn WarehouseDialect + Send + Sync>,
    builder: SqlBuilder,
}

impl QueryService {
    /// Service with default configuration.
    pub fn new(registry: ExploreRegistry) -> Self {
        Self::with_config(registry, LumenConfig::default())
    }

    pub fn with_config(registry: ExploreRegistry, config: LumenConfig) -> Self {
        let dialect = config.warehouse.dialect();
        Self {
            registry,
            config,
            dialect,
            builder: SqlBuilder::default(),
        }
    }

    pub fn registry(&self) -> &ExploreRegistry {
        &self.registry
    }

    pub fn config(&self) -> &LumenConfig {
        &self.config
    }

    /// Effective row limit for a requested one; 0 means the configured default.
    pub fn validate_limit(&self, limit: u64) -> Result<u64> {
        let max = self.config.query.max_limit;
        if limit > max {
            return Err(LumenError::Parameter(format!(
                "Limit cannot be greater than {max}"
            )));
        }
        if limit == 0 {
            return Ok(self.config.query.default_limit);
        }
        Ok(limit)
    }

    /// Compile a query against its explore with the limit policy applied.
    pub fn compile(
        &self,
        query: &CompiledMetricQuery,
        user: &UserContext,
    ) -> Result<CompiledQuery> {
        let query = self.prepare(query)?;
        self.compile_prepared(&query, user)
    }

    /// Fetch one page of results; `cursor` comes from a previous page.
    pub async fn fetch_page(
        &self,
        query: &CompiledMetricQuery,
        user: &UserContext,
        executor: &dyn Executor,
        cursor: Option<&str>,
    ) -> Result<PaginatedResult> {
        let query = self.prepare(query)?;
        let compiled = self.compile_prepared(&query, user)?;
        let cursor = cursor.map(Cursor::decode).transpose()?;
        let mut streamer = self.streamer(executor, &compiled, &query);
        streamer.fetch_page(cursor.as_ref()).await
    }

    /// Compile, retrieve every page and apply the pivot when one is given.
    pub async fn run(
        &self,
        query: &CompiledMetricQuery,
        user: &UserContext,
        executor: &dyn Executor,
        pivot: Option<&PivotConfig>,
    ) -> Result<QueryResults> {
        let query = self.prepare(query)?;
        let compiled = self.compile_prepared(&query, user)?;

        let mut streamer = self.streamer(executor, &compiled, &query);
        let mut rows = Vec::new();
        let mut cursor: Option<Cursor> = None;
        loop {
            let page = streamer.fetch_page(cursor.as_ref()).await?;
            rows.extend(page.page.rows);
            match page.next_cursor {
                Some(encoded) => cursor = Some(Cursor::decode(&encoded)?),
                None => break,
            }
        }
        tracing::debug!(explore = %query.explore_name, rows = rows.len(), "query finished");

        let rows = match pivot {
            Some(config) => pivot_results(rows, config),
            None => rows,
        };
        Ok(QueryResults {
            compiled,
            rows,
            page_size: streamer.page_size(),
        })
    }

    fn prepare(&self, query: &CompiledMetricQuery) -> Result<CompiledMetricQuery> {
        let mut query = query.clone();
        query.limit = self.validate_limit(query.limit)?;
        Ok(query)
    }

    fn compile_prepared(
        &self,
        query: &CompiledMetricQuery,
        user: &UserContext,
    ) -> Result<CompiledQuery> {
        let explore = self.registry.get_explore(&query.explore_name).ok_or_else(|| {
            LumenError::FieldReference(format!("Explore \"{}\" does not exist", query.explore_name))
        })?;
        let compiled = self.builder.build_query(
            explore,
            query,
            self.dialect.as_ref(),
            &user.user_attributes,
            &user.intrinsic_attributes,
        )?;
        tracing::debug!(
            explore = %explore.name,
            dimensions = query.dimensions.len(),
            metrics = query.metrics.len(),
            limit = query.limit,
            "compiled query"
        );
        tracing::trace!(sql = %compiled.query, "compiled sql");
        Ok(compiled)
    }

    fn streamer<'e>(
        &self,
        executor: &'e dyn Executor,
        compiled: &CompiledQuery,
        query: &CompiledMetricQuery,
    ) -> ResultStreamer<'e> {
        ResultStreamer::new(
            executor,
            compiled.query.clone(),
            compute_query_hash(query),
            self.config.pagination.page_size,
            self.config.pagination.max_page_size,
        )
        .with_order_by(compiled.order_by.clone())
    }
}
