use crate::error::Result;
use crate::sql_ast::SqlRenderer;

use super::components::{resolve_components, BuildContext, QueryComponents};
use super::plan::{FlatPlan, LayeredPlan, QueryPlan};
use super::CompiledQuery;

/// Compile a metric query into a complete SQL statement.
pub(crate) fn build_query(ctx: &BuildContext<'_>) -> Result<CompiledQuery> {
    let components = resolve_components(ctx)?;
    let has_example_metric = components.has_example_metric;
    let fields = components.fields.clone();

    let renderer = SqlRenderer::new(ctx.dialect);
    let order_by = renderer.render_order_by(&components.order_by);
    let select = plan_query(components).to_select_query(&renderer);

    Ok(CompiledQuery {
        query: renderer.render_select(&select),
        has_example_metric,
        fields,
        order_by,
    })
}

/// Choose the statement shape. Table calculations and metric filters need
/// the aggregate materialized first, so they force the layered form.
pub(crate) fn plan_query(components: QueryComponents) -> QueryPlan {
    let QueryComponents {
        from,
        group_selects,
        metric_selects,
        custom_ctes,
        cross_joins,
        joins,
        where_filters,
        metric_filter,
        table_calculation_filter,
        table_calculation_selects,
        order_by,
        limit,
        ..
    } = components;

    let mut aggregate = FlatPlan::new(from);
    aggregate.group_by = (1..=group_selects.len()).collect();
    aggregate.select = group_selects;
    aggregate.select.extend(metric_selects);
    aggregate.ctes = custom_ctes;
    aggregate.joins = joins;
    aggregate.cross_joins = cross_joins;
    aggregate.filters = where_filters;

    if table_calculation_selects.is_empty() && metric_filter.is_none() {
        aggregate.order_by = order_by;
        aggregate.limit = Some(limit);
        return QueryPlan::Flat(aggregate);
    }

    QueryPlan::Layered(LayeredPlan {
        metrics: aggregate,
        table_calculations: table_calculation_selects,
        metric_filter,
        table_calculation_filter,
        order_by,
        limit: Some(limit),
    })
}
