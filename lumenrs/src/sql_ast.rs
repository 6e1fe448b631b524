//! Minimal SELECT statement model and its renderer.
//!
//! Expressions are carried as already-rendered SQL fragments (compiled field
//! SQL, substituted join conditions). The model only fixes statement layout:
//! one clause per line, select items indented by two spaces.

use crate::dialect::WarehouseDialect;
use crate::explore::JoinType;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: String,
    pub alias: Option<String>,
    /// Render the alias through the dialect's identifier quoting.
    pub quote_alias: bool,
}

impl SelectItem {
    /// `<expr> AS "<alias>"`
    pub fn aliased(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
            quote_alias: true,
        }
    }

    /// `<expr> AS <alias>` with the alias left unquoted.
    pub fn bare(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
            quote_alias: false,
        }
    }

    pub fn star() -> Self {
        Self {
            expr: "*".to_string(),
            alias: None,
            quote_alias: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRef {
    /// Physical table or CTE name, emitted verbatim.
    pub sql_table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn aliased(sql_table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            sql_table: sql_table.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            sql_table: name.into(),
            alias: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// Output column the statement is ordered by.
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub ctes: Vec<Cte>,
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    /// Relations cross joined after the regular joins.
    pub cross_joins: Vec<String>,
    /// Predicates AND-ed together in WHERE.
    pub filters: Vec<String>,
    /// 1-based positions of the grouped select items.
    pub group_by: Vec<usize>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn WarehouseDialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn WarehouseDialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let mut lines: Vec<String> = Vec::new();

        if !query.ctes.is_empty() {
            let ctes: Vec<String> = query
                .ctes
                .iter()
                .map(|cte| format!("{} AS (\n{}\n)", cte.name, cte.body))
                .collect();
            lines.push(format!("WITH {}", ctes.join(",\n")));
        }

        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| format!("  {}", self.render_select_item(item)))
            .collect();
        lines.push(format!("SELECT\n{}", select_items.join(",\n")));
        lines.push(format!("FROM {}", self.render_table_ref(&query.from)));

        for join in &query.joins {
            lines.push(format!(
                "{} {}\n  ON {}",
                join.join_type.sql_keyword(),
                self.render_table_ref(&join.table),
                join.on
            ));
        }

        if !query.cross_joins.is_empty() {
            lines.push(format!("CROSS JOIN {}", query.cross_joins.join(",\n")));
        }

        if !query.filters.is_empty() {
            lines.push(format!("WHERE {}", query.filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let positions: Vec<String> = query.group_by.iter().map(|p| p.to_string()).collect();
            lines.push(format!("GROUP BY {}", positions.join(",")));
        }

        if let Some(orders) = self.render_order_by(&query.order_by) {
            lines.push(format!("ORDER BY {orders}"));
        }

        if let Some(limit) = query.limit {
            lines.push(format!("LIMIT {limit}"));
        }

        lines.join("\n")
    }

    /// Comma-separated ORDER BY list, `None` when there is nothing to sort by.
    pub fn render_order_by(&self, order_by: &[OrderItem]) -> Option<String> {
        if order_by.is_empty() {
            return None;
        }
        let orders: Vec<String> = order_by
            .iter()
            .map(|o| {
                let column = self.dialect.quote_field(&o.column);
                if o.descending {
                    format!("{column} DESC")
                } else {
                    column
                }
            })
            .collect();
        Some(orders.join(", "))
    }

    fn render_select_item(&self, item: &SelectItem) -> String {
        match &item.alias {
            Some(alias) if item.quote_alias => {
                format!("{} AS {}", item.expr, self.dialect.quote_field(alias))
            }
            Some(alias) => format!("{} AS {alias}", item.expr),
            None => item.expr.clone(),
        }
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        match &table.alias {
            Some(alias) => format!("{} AS {}", table.sql_table, self.dialect.quote_field(alias)),
            None => table.sql_table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{BigQueryDialect, PostgresDialect};

    #[test]
    fn renders_clauses_on_separate_lines() {
        let query = SelectQuery {
            select: vec![
                SelectItem::aliased("\"orders\".status", "orders_status"),
                SelectItem::aliased("COUNT(*)", "orders_order_count"),
            ],
            from: TableRef::aliased("\"public\".\"orders\"", "orders"),
            joins: vec![Join {
                join_type: JoinType::Left,
                table: TableRef::aliased("\"public\".\"customers\"", "customers"),
                on: "(\"orders\".customer_id) = (\"customers\".id)".to_string(),
            }],
            filters: vec!["(\"orders\".amount > 0)".to_string()],
            group_by: vec![1],
            order_by: vec![OrderItem {
                column: "orders_order_count".to_string(),
                descending: true,
            }],
            limit: Some(10),
            ..Default::default()
        };

        let sql = SqlRenderer::new(&PostgresDialect::default()).render_select(&query);
        assert_eq!(
            sql,
            "SELECT\n  \"orders\".status AS \"orders_status\",\n  COUNT(*) AS \"orders_order_count\"\n\
             FROM \"public\".\"orders\" AS \"orders\"\n\
             LEFT OUTER JOIN \"public\".\"customers\" AS \"customers\"\n  ON (\"orders\".customer_id) = (\"customers\".id)\n\
             WHERE (\"orders\".amount > 0)\n\
             GROUP BY 1\n\
             ORDER BY \"orders_order_count\" DESC\n\
             LIMIT 10"
        );
    }

    #[test]
    fn renders_ctes_and_cross_joins() {
        let query = SelectQuery {
            ctes: vec![Cte {
                name: "bins_cte".to_string(),
                body: "SELECT 1".to_string(),
            }],
            select: vec![SelectItem::star(), SelectItem::bare("1", "one")],
            from: TableRef::named("metrics"),
            cross_joins: vec!["bins_cte".to_string()],
            ..Default::default()
        };
        let sql = SqlRenderer::new(&BigQueryDialect::default()).render_select(&query);
        assert_eq!(
            sql,
            "WITH bins_cte AS (\nSELECT 1\n)\nSELECT\n  *,\n  1 AS one\nFROM metrics\nCROSS JOIN bins_cte"
        );
    }
}
