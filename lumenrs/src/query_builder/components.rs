//! Resolved query components collected from a metric query.
//!
//! This is the intermediate representation between the raw
//! [`CompiledMetricQuery`] and the query plan: every field is resolved,
//! access checked and rendered to SQL fragments here.

use std::collections::BTreeSet;

use crate::attributes::{
    assert_valid_required_attributes, replace_user_attributes, IntrinsicUserAttributes,
    UserAttributeValueMap,
};
use crate::dialect::WarehouseDialect;
use crate::error::{LumenError, Result};
use crate::explore::{CompiledDimension, CompiledMetric, Explore};
use crate::metric_query::{
    filter_rules, CompiledMetricQuery, CompiledTableCalculation, FilterRule, Item, ItemsMap,
};
use crate::sql_ast::{Cte, Join, OrderItem, SelectItem, TableRef};

use super::custom_dimensions::compile_custom_dimensions;
use super::filters::{infer_value_kind, render_filter_group, render_filter_rule};
use super::joins::{joins_to_emit, resolve_joined_tables};
use super::resolve::{resolve_dimension, resolve_metric};

/// Everything a compile call needs, borrowed for its duration.
pub(crate) struct BuildContext<'a> {
    pub explore: &'a Explore,
    pub query: &'a CompiledMetricQuery,
    pub dialect: &'a dyn WarehouseDialect,
    pub user_attributes: &'a UserAttributeValueMap,
    pub intrinsic_attributes: &'a IntrinsicUserAttributes,
}

#[derive(Debug, Clone)]
pub(crate) struct QueryComponents {
    pub from: TableRef,
    /// Dimension selects followed by custom dimension selects.
    pub group_selects: Vec<SelectItem>,
    /// Requested metrics followed by metrics only referenced by metric filters.
    pub metric_selects: Vec<SelectItem>,
    pub custom_ctes: Vec<Cte>,
    pub cross_joins: Vec<String>,
    pub joins: Vec<Join>,
    pub where_filters: Vec<String>,
    pub metric_filter: Option<String>,
    pub table_calculation_filter: Option<String>,
    pub table_calculation_selects: Vec<SelectItem>,
    pub order_by: Vec<OrderItem>,
    pub limit: u64,
    pub has_example_metric: bool,
    pub fields: ItemsMap,
}

pub(crate) fn resolve_components(ctx: &BuildContext<'_>) -> Result<QueryComponents> {
    let BuildContext {
        explore,
        query,
        dialect,
        user_attributes,
        intrinsic_attributes,
    } = *ctx;
    let adapter = dialect.adapter_type();
    let start_of_week = dialect.start_of_week();

    let base = explore.base().ok_or_else(|| {
        LumenError::Validation(format!(
            "explore {} base table {} not found",
            explore.name, explore.base_table
        ))
    })?;

    let mut fields = ItemsMap::new();

    let mut dimensions: Vec<CompiledDimension> = Vec::with_capacity(query.dimensions.len());
    for id in &query.dimensions {
        let dimension = resolve_dimension(id, explore, adapter, start_of_week)?;
        assert_valid_required_attributes(
            dimension.required_attributes.as_ref(),
            user_attributes,
            &format!("dimension: \"{id}\""),
        )?;
        fields.insert(id.clone(), Item::Dimension(dimension.clone()));
        dimensions.push(dimension);
    }

    let custom = compile_custom_dimensions(dialect, explore, query, user_attributes, &query.sorts)?
        .unwrap_or_default();
    for custom_dimension in &query.custom_dimensions {
        fields.insert(
            custom_dimension.id.clone(),
            Item::CustomDimension(custom_dimension.clone()),
        );
    }

    let mut has_example_metric = false;
    let mut metrics: Vec<CompiledMetric> = Vec::with_capacity(query.metrics.len());
    for id in &query.metrics {
        let metric = resolve_metric(id, explore, query)?;
        assert_valid_required_attributes(
            metric.required_attributes.as_ref(),
            user_attributes,
            &format!("metric: \"{id}\""),
        )?;
        if metric.is_auto_generated {
            has_example_metric = true;
        }
        fields.insert(id.clone(), Item::Metric(metric.clone()));
        metrics.push(metric);
    }

    for additional in &query.additional_metrics {
        let Some(dimension_id) = additional.base_dimension_id() else {
            continue;
        };
        if !query.metrics.contains(&additional.field_id()) {
            continue;
        }
        let dimension = resolve_dimension(&dimension_id, explore, adapter, start_of_week)?;
        assert_valid_required_attributes(
            dimension.required_attributes.as_ref(),
            user_attributes,
            &format!("custom metric: \"{}\"", additional.name),
        )?;
    }

    let dimension_rules = filter_rules(query.filters.dimensions.as_ref());
    let metric_rules = filter_rules(query.filters.metrics.as_ref());

    let mut seeds: BTreeSet<String> = BTreeSet::new();
    for metric in &metrics {
        seeds.extend(metric.table_references());
    }
    for dimension in &dimensions {
        seeds.extend(dimension.table_references());
    }
    seeds.extend(custom.tables.iter().cloned());
    for rule in &dimension_rules {
        let dimension = resolve_dimension(&rule.target.field_id, explore, adapter, start_of_week)?;
        seeds.extend(dimension.table_references());
    }
    for rule in &metric_rules {
        seeds.extend(resolve_metric(&rule.target.field_id, explore, query)?.table_references());
    }
    let joined_tables = resolve_joined_tables(explore, &seeds);

    let mut joins = Vec::new();
    for join in joins_to_emit(explore, &joined_tables) {
        let table = explore.tables.get(&join.table).ok_or_else(|| {
            LumenError::Validation(format!(
                "explore {} joins unknown table {}",
                explore.name, join.table
            ))
        })?;
        let on = replace_user_attributes(
            &join.compiled_sql_on,
            intrinsic_attributes,
            user_attributes,
            dialect,
            "sql_on",
        )?;
        joins.push(Join {
            join_type: join.join_type(),
            table: TableRef::aliased(table.sql_table.clone(), join.table.clone()),
            on,
        });
    }

    let mut group_selects: Vec<SelectItem> = query
        .dimensions
        .iter()
        .zip(&dimensions)
        .map(|(id, dimension)| SelectItem::aliased(dimension.compiled_sql.clone(), id.clone()))
        .collect();
    group_selects.extend(custom.selects.iter().cloned());

    let mut metric_selects: Vec<SelectItem> = query
        .metrics
        .iter()
        .zip(&metrics)
        .map(|(id, metric)| SelectItem::aliased(metric.compiled_sql.clone(), id.clone()))
        .collect();
    let requested = metric_selects.len();
    for rule in &metric_rules {
        if query.metrics.contains(&rule.target.field_id) {
            continue;
        }
        let metric = resolve_metric(&rule.target.field_id, explore, query)?;
        let item = SelectItem::aliased(metric.compiled_sql, rule.target.field_id.clone());
        if !metric_selects[requested..].contains(&item) {
            metric_selects.push(item);
        }
    }

    let mut where_filters = Vec::new();
    if let Some(sql_where) = &base.sql_where {
        where_filters.push(replace_user_attributes(
            sql_where,
            intrinsic_attributes,
            user_attributes,
            dialect,
            "sql_filter",
        )?);
    }
    let render_dimension_rule = |rule: &FilterRule| {
        let dimension = resolve_dimension(&rule.target.field_id, explore, adapter, start_of_week)?;
        render_filter_rule(
            rule,
            &dimension.compiled_sql,
            dimension.dimension_type.value_kind(),
            dialect,
        )
    };
    let dimension_filter =
        render_filter_group(query.filters.dimensions.as_ref(), &render_dimension_rule)?;
    where_filters.extend(dimension_filter);

    let metric_filter = render_filter_group(query.filters.metrics.as_ref(), &|rule: &FilterRule| {
        let metric = resolve_metric(&rule.target.field_id, explore, query)?;
        render_filter_rule(
            rule,
            &dialect.quote_field(&rule.target.field_id),
            metric.metric_type.value_kind(),
            dialect,
        )
    })?;

    let table_calculation_filter =
        render_filter_group(query.filters.table_calculations.as_ref(), &|rule: &FilterRule| {
            let calculation = find_table_calculation(query, &rule.target.field_id)?;
            let kind = calculation
                .calculation_type
                .map(|t| t.value_kind())
                .unwrap_or_else(|| infer_value_kind(&rule.values));
            render_filter_rule(rule, &dialect.quote_field(&calculation.name), kind, dialect)
        })?;

    let table_calculation_selects = query
        .compiled_table_calculations
        .iter()
        .map(|tc| {
            fields.insert(tc.name.clone(), Item::TableCalculation(tc.clone()));
            SelectItem::aliased(tc.compiled_sql.clone(), tc.name.clone())
        })
        .collect();

    let order_by = query
        .sorts
        .iter()
        .map(|sort| {
            if !fields.contains_key(&sort.field_id) {
                return Err(LumenError::FieldReference(format!(
                    "Tried to sort by a field that is not selected: {}",
                    sort.field_id
                )));
            }
            Ok(OrderItem {
                column: if query.find_custom_dimension(&sort.field_id).is_some() {
                    format!("{}_order", sort.field_id)
                } else {
                    sort.field_id.clone()
                },
                descending: sort.descending,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QueryComponents {
        from: TableRef::aliased(base.sql_table.clone(), explore.base_table.clone()),
        group_selects,
        metric_selects,
        custom_ctes: custom.ctes,
        cross_joins: custom.joins,
        joins,
        where_filters,
        metric_filter,
        table_calculation_filter,
        table_calculation_selects,
        order_by,
        limit: query.limit,
        has_example_metric,
        fields,
    })
}

fn find_table_calculation<'q>(
    query: &'q CompiledMetricQuery,
    field_id: &str,
) -> Result<&'q CompiledTableCalculation> {
    query
        .compiled_table_calculations
        .iter()
        .find(|tc| field_id == format!("table_calculation_{}", tc.name) || field_id == tc.name)
        .ok_or_else(|| {
            LumenError::FieldReference(format!(
                "Filter has a reference to an unknown table calculation: {field_id}"
            ))
        })
}
