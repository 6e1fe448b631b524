//! Query plan intermediate representation.
//!
//! The plan fixes the statement shape before rendering: a flat aggregate
//! SELECT, or a layered statement where the aggregate runs in a `metrics`
//! CTE and metric filters and table calculations are applied on top of it.

use crate::sql_ast::{Cte, Join, OrderItem, SelectItem, SelectQuery, SqlRenderer, TableRef};

pub(crate) const METRICS_CTE: &str = "metrics";
pub(crate) const TABLE_CALCULATIONS_CTE: &str = "table_calculations";

#[derive(Debug, Clone)]
pub enum QueryPlan {
    /// Single aggregate SELECT.
    Flat(FlatPlan),
    /// Aggregate in a CTE, post-aggregation layers on top.
    Layered(LayeredPlan),
}

/// The aggregate SELECT shared by both plan shapes.
#[derive(Debug, Clone)]
pub struct FlatPlan {
    pub ctes: Vec<Cte>,
    pub from: TableRef,
    pub select: Vec<SelectItem>,
    pub joins: Vec<Join>,
    pub cross_joins: Vec<String>,
    pub filters: Vec<String>,
    pub group_by: Vec<usize>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LayeredPlan {
    /// Aggregate query; its own `ctes` are hoisted into the outer WITH.
    pub metrics: FlatPlan,
    pub table_calculations: Vec<SelectItem>,
    pub metric_filter: Option<String>,
    pub table_calculation_filter: Option<String>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

impl QueryPlan {
    /// Convert the plan to a SelectQuery for rendering.
    pub fn to_select_query(self, renderer: &SqlRenderer<'_>) -> SelectQuery {
        match self {
            QueryPlan::Flat(flat) => flat.to_select_query(),
            QueryPlan::Layered(layered) => layered.to_select_query(renderer),
        }
    }
}

impl FlatPlan {
    pub fn new(from: TableRef) -> Self {
        Self {
            ctes: Vec::new(),
            from,
            select: Vec::new(),
            joins: Vec::new(),
            cross_joins: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn to_select_query(self) -> SelectQuery {
        SelectQuery {
            ctes: self.ctes,
            select: self.select,
            from: self.from,
            joins: self.joins,
            cross_joins: self.cross_joins,
            filters: self.filters,
            group_by: self.group_by,
            order_by: self.order_by,
            limit: self.limit,
        }
    }
}

impl LayeredPlan {
    pub fn to_select_query(self, renderer: &SqlRenderer<'_>) -> SelectQuery {
        let mut metrics = self.metrics;
        let mut ctes = std::mem::take(&mut metrics.ctes);
        metrics.order_by.clear();
        metrics.limit = None;
        ctes.push(Cte {
            name: METRICS_CTE.to_string(),
            body: renderer.render_select(&metrics.to_select_query()),
        });

        let mut select = vec![SelectItem::star()];
        select.extend(self.table_calculations);
        let calculations = SelectQuery {
            select,
            from: TableRef::named(METRICS_CTE),
            filters: self.metric_filter.into_iter().collect(),
            ..Default::default()
        };

        let mut outer = match self.table_calculation_filter {
            Some(filter) => {
                ctes.push(Cte {
                    name: TABLE_CALCULATIONS_CTE.to_string(),
                    body: renderer.render_select(&calculations),
                });
                SelectQuery {
                    select: vec![SelectItem::star()],
                    from: TableRef::named(TABLE_CALCULATIONS_CTE),
                    filters: vec![filter],
                    ..Default::default()
                }
            }
            None => calculations,
        };

        outer.ctes = ctes;
        outer.order_by = self.order_by;
        outer.limit = self.limit;
        outer
    }
}
