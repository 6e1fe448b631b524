use serde::{Deserialize, Serialize};

use crate::attributes::{IntrinsicUserAttributes, UserAttributeValueMap};
use crate::dialect::WarehouseDialect;
use crate::error::Result;
use crate::explore::Explore;
use crate::metric_query::{CompiledMetricQuery, ItemsMap};

mod components;
mod custom_dimensions;
mod filters;
mod joins;
mod plan;
mod planner;
mod resolve;

pub use custom_dimensions::{compile_custom_dimensions, CustomDimensionSql};
pub use filters::{render_filter_group, render_filter_rule};
pub use joins::resolve_joined_tables;
pub use plan::{FlatPlan, LayeredPlan, QueryPlan};
pub use resolve::{resolve_dimension, resolve_metric};

pub(crate) use joins::sql_on_references;

use components::BuildContext;

/// Output of a compile call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuery {
    pub query: String,
    /// Set when a selected metric is an auto-generated placeholder.
    pub has_example_metric: bool,
    pub fields: ItemsMap,
    /// Sort of the statement's output columns, repeated when it is paged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

pub struct SqlBuilder;

impl Default for SqlBuilder {
    fn default() -> Self {
        Self
    }
}

impl SqlBuilder {
    /// Compile `query` against `explore` for the given warehouse and user.
    ///
    /// Pure and deterministic: the same inputs always produce the same SQL.
    pub fn build_query(
        &self,
        explore: &Explore,
        query: &CompiledMetricQuery,
        dialect: &dyn WarehouseDialect,
        user_attributes: &UserAttributeValueMap,
        intrinsic_attributes: &IntrinsicUserAttributes,
    ) -> Result<CompiledQuery> {
        planner::build_query(&BuildContext {
            explore,
            query,
            dialect,
            user_attributes,
            intrinsic_attributes,
        })
    }
}
