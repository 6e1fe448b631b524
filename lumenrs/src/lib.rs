pub mod attributes;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod explore;
pub mod metric_query;
pub mod pagination;
pub mod pivot;
pub mod query_builder;
pub mod registry;
pub mod service;
pub mod sql_ast;
pub mod time_frames;
pub mod validation;

use std::path::Path;

use crate::error::Result;

/// Load explores from disk and wrap them in a query service configured from
/// the default config locations.
pub fn load_service<P: AsRef<Path>>(explore_dir: P) -> Result<QueryService> {
    let registry = ExploreRegistry::load_from_dir(explore_dir)?;
    Ok(QueryService::with_config(registry, LumenConfig::load_default()))
}

pub use attributes::{IntrinsicUserAttributes, UserAttributeValueMap};
pub use config::LumenConfig;
pub use dialect::{AdapterType, WarehouseDialect, WeekDay};
pub use error::LumenError;
pub use executor::{Executor, ResultPage, ResultStreamer};
pub use explore::Explore;
pub use metric_query::CompiledMetricQuery;
pub use pivot::{pivot_results, PivotConfig};
pub use query_builder::{CompiledQuery, SqlBuilder};
pub use registry::ExploreRegistry;
pub use service::{QueryService, UserContext};
