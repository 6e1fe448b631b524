use crate::dialect::{AdapterType, WeekDay};
use crate::error::{LumenError, Result};
use crate::explore::{CompiledDimension, CompiledMetric, DimensionType, Explore};
use crate::metric_query::CompiledMetricQuery;
use crate::time_frames::{parse_date_dimension, sql_for_truncated_date};

/// Resolve a dimension id, decomposing `<base>_<timeFrame>` ids of date
/// dimensions when no exact match exists.
pub fn resolve_dimension(
    field_id: &str,
    explore: &Explore,
    adapter: AdapterType,
    start_of_week: Option<WeekDay>,
) -> Result<CompiledDimension> {
    if let Some(dimension) = explore.find_dimension(field_id) {
        return Ok(dimension.clone());
    }

    if let Some((base_id, frame)) = parse_date_dimension(field_id) {
        let base = resolve_dimension(base_id, explore, adapter, start_of_week)
            .ok()
            .filter(|d| matches!(d.dimension_type, DimensionType::Date | DimensionType::Timestamp));
        if let Some(base) = base {
            let compiled_sql = sql_for_truncated_date(
                adapter,
                frame,
                &base.compiled_sql,
                base.dimension_type,
                start_of_week,
            );
            return Ok(CompiledDimension {
                compiled_sql,
                time_interval: Some(frame),
                ..base
            });
        }
    }

    Err(LumenError::FieldReference(format!(
        "Tried to reference dimension with unknown field id: {field_id}"
    )))
}

/// Resolve a metric id against the explore and the query's additional metrics.
pub fn resolve_metric(
    field_id: &str,
    explore: &Explore,
    query: &CompiledMetricQuery,
) -> Result<CompiledMetric> {
    explore
        .find_metric(field_id)
        .or_else(|| {
            query
                .compiled_additional_metrics
                .iter()
                .find(|m| m.field_id() == field_id)
        })
        .cloned()
        .ok_or_else(|| {
            LumenError::FieldReference(format!(
                "Tried to reference metric with unknown field id: {field_id}"
            ))
        })
}
