//! Custom dimensions: numeric dimensions bucketed into labelled bins.
//!
//! `FIXED_WIDTH` and `CUSTOM_RANGE` bins are pure expressions over the base
//! dimension. `FIXED_NUMBER` bins need the dimension's range, computed in a
//! `<id>_cte` CTE that the main query cross joins.

use crate::attributes::{assert_valid_required_attributes, UserAttributeValueMap};
use crate::dialect::WarehouseDialect;
use crate::error::{LumenError, Result};
use crate::explore::Explore;
use crate::metric_query::{BinRange, BinType, CompiledMetricQuery, CustomDimension, SortField};
use crate::sql_ast::{Cte, SelectItem, SelectQuery, SqlRenderer, TableRef};

use super::resolve::resolve_dimension;

/// SQL fragments contributed by a query's custom dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomDimensionSql {
    pub ctes: Vec<Cte>,
    /// CTE names to cross join into the main query.
    pub joins: Vec<String>,
    /// Tables the custom dimensions read from, first occurrence order.
    pub tables: Vec<String>,
    pub selects: Vec<SelectItem>,
}

fn cte_name(custom_dimension: &CustomDimension) -> String {
    format!("{}_cte", custom_dimension.id)
}

fn is_sorted_by(sorts: &[SortField], id: &str) -> bool {
    sorts.iter().any(|s| s.field_id == id)
}

fn order_alias(custom_dimension: &CustomDimension) -> String {
    format!("{}_order", custom_dimension.id)
}

pub fn compile_custom_dimensions(
    dialect: &dyn WarehouseDialect,
    explore: &Explore,
    query: &CompiledMetricQuery,
    user_attributes: &UserAttributeValueMap,
    sorts: &[SortField],
) -> Result<Option<CustomDimensionSql>> {
    if query.custom_dimensions.is_empty() {
        return Ok(None);
    }

    let adapter = dialect.adapter_type();
    let start_of_week = dialect.start_of_week();
    let mut out = CustomDimensionSql::default();

    for custom_dimension in &query.custom_dimensions {
        let dimension = resolve_dimension(
            &custom_dimension.dimension_id,
            explore,
            adapter,
            start_of_week,
        )?;
        assert_valid_required_attributes(
            dimension.required_attributes.as_ref(),
            user_attributes,
            &format!("custom dimension: \"{}\"", custom_dimension.name),
        )?;

        if custom_dimension.table != dimension.table {
            return Err(LumenError::InvalidCustomDimension(format!(
                "Custom dimension \"{}\" is bound to table {} but its dimension {} belongs to {}",
                custom_dimension.name,
                custom_dimension.table,
                custom_dimension.dimension_id,
                dimension.table
            )));
        }
        for table in dimension.table_references() {
            if !out.tables.contains(&table) {
                out.tables.push(table);
            }
        }

        let is_sorted = is_sorted_by(sorts, &custom_dimension.id);
        let sql = dimension.compiled_sql.as_str();

        match custom_dimension.bin_type {
            BinType::FixedWidth => {
                let width = custom_dimension
                    .bin_width
                    .filter(|w| *w != 0.0)
                    .ok_or_else(|| undefined_parameter("binWidth", custom_dimension))?;
                out.selects
                    .extend(fixed_width_selects(dialect, custom_dimension, sql, width, is_sorted));
            }
            BinType::FixedNumber => {
                let bins = custom_dimension
                    .bin_number
                    .filter(|n| *n > 0)
                    .ok_or_else(|| undefined_parameter("binNumber", custom_dimension))?;
                out.ctes
                    .push(fixed_number_cte(dialect, explore, custom_dimension, sql, bins)?);
                out.joins.push(cte_name(custom_dimension));
                out.selects
                    .extend(fixed_number_selects(dialect, custom_dimension, sql, bins, is_sorted));
            }
            BinType::CustomRange => {
                let ranges = custom_dimension
                    .custom_range
                    .as_deref()
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| undefined_parameter("customRange", custom_dimension))?;
                out.selects.extend(custom_range_selects(
                    dialect,
                    custom_dimension,
                    sql,
                    ranges,
                    is_sorted,
                )?);
            }
        }
    }

    Ok(Some(out))
}

fn undefined_parameter(parameter: &str, custom_dimension: &CustomDimension) -> LumenError {
    LumenError::InvalidCustomDimension(format!(
        "Undefined {parameter} for custom dimension \"{}\"",
        custom_dimension.name
    ))
}

fn case_expr(arms: &[String]) -> String {
    format!("CASE\n    {}\n  END", arms.join("\n    "))
}

fn fixed_width_selects(
    dialect: &dyn WarehouseDialect,
    custom_dimension: &CustomDimension,
    sql: &str,
    width: f64,
    is_sorted: bool,
) -> Vec<SelectItem> {
    let q = dialect.string_quote_char();
    let dash = format!("{q} - {q}");
    let lower = format!("FLOOR({sql} / {width}) * {width}");
    let upper = format!("(FLOOR({sql} / {width}) + 1) * {width} - 1");

    let mut selects = vec![SelectItem::aliased(
        dialect.concat_string(&[lower.as_str(), dash.as_str(), upper.as_str()]),
        custom_dimension.id.clone(),
    )];
    if is_sorted {
        selects.push(SelectItem::aliased(lower, order_alias(custom_dimension)));
    }
    selects
}

fn fixed_number_cte(
    dialect: &dyn WarehouseDialect,
    explore: &Explore,
    custom_dimension: &CustomDimension,
    sql: &str,
    bins: u32,
) -> Result<Cte> {
    let table = explore.tables.get(&custom_dimension.table).ok_or_else(|| {
        LumenError::FieldReference(format!(
            "Custom dimension \"{}\" references unknown table {}",
            custom_dimension.name, custom_dimension.table
        ))
    })?;

    let body = SelectQuery {
        select: vec![
            SelectItem::bare(format!("FLOOR(MIN({sql}))"), "min_id"),
            SelectItem::bare(format!("CEIL(MAX({sql}))"), "max_id"),
            SelectItem::bare(format!("FLOOR((MAX({sql}) - MIN({sql})) / {bins})"), "bin_width"),
        ],
        from: TableRef::aliased(table.sql_table.clone(), custom_dimension.table.clone()),
        ..Default::default()
    };

    Ok(Cte {
        name: cte_name(custom_dimension),
        body: SqlRenderer::new(dialect).render_select(&body),
    })
}

fn fixed_number_selects(
    dialect: &dyn WarehouseDialect,
    custom_dimension: &CustomDimension,
    sql: &str,
    bins: u32,
    is_sorted: bool,
) -> Vec<SelectItem> {
    let q = dialect.string_quote_char();
    let dash = format!("{q} - {q}");
    let cte = cte_name(custom_dimension);
    let min_id = format!("{cte}.min_id");
    let max_id = format!("{cte}.max_id");

    if bins <= 1 {
        // a single bucket spans the whole range
        let mut selects = vec![SelectItem::aliased(
            dialect.concat_string(&[min_id.as_str(), dash.as_str(), max_id.as_str()]),
            custom_dimension.id.clone(),
        )];
        if is_sorted {
            selects.push(SelectItem::aliased(min_id, order_alias(custom_dimension)));
        }
        return selects;
    }

    let from = |i: u32| format!("{cte}.min_id + {cte}.bin_width * {i}");
    let to = |i: u32| format!("{cte}.min_id + {cte}.bin_width * {}", i + 1);
    let last = bins - 1;

    let label_arms: Vec<String> = (0..bins)
        .map(|i| {
            if i == last {
                let label =
                    dialect.concat_string(&[from(i).as_str(), dash.as_str(), max_id.as_str()]);
                format!("ELSE {label}")
            } else {
                format!(
                    "WHEN {sql} >= {} AND {sql} < {} THEN {}",
                    from(i),
                    to(i),
                    dialect.concat_string(&[from(i).as_str(), dash.as_str(), to(i).as_str()])
                )
            }
        })
        .collect();

    let mut selects = vec![SelectItem::aliased(
        case_expr(&label_arms),
        custom_dimension.id.clone(),
    )];

    if is_sorted {
        let order_arms: Vec<String> = (0..bins)
            .map(|i| {
                if i == last {
                    format!("ELSE {i}")
                } else {
                    format!("WHEN {sql} >= {} AND {sql} < {} THEN {i}", from(i), to(i))
                }
            })
            .collect();
        selects.push(SelectItem::aliased(
            case_expr(&order_arms),
            order_alias(custom_dimension),
        ));
    }
    selects
}

fn custom_range_selects(
    dialect: &dyn WarehouseDialect,
    custom_dimension: &CustomDimension,
    sql: &str,
    ranges: &[BinRange],
    is_sorted: bool,
) -> Result<Vec<SelectItem>> {
    let q = dialect.string_quote_char();
    let below = format!("{q}<{q}");
    let at_least = format!("{q}≥{q}");
    let dash = format!("{q}-{q}");

    let last = ranges.len() - 1;
    for (i, range) in ranges.iter().enumerate() {
        if (range.from.is_none() && i != 0) || (range.to.is_none() && i != last) {
            return Err(LumenError::InvalidCustomDimension(format!(
                "Range {i} of custom dimension \"{}\" is open-ended but is not the first or last range",
                custom_dimension.name
            )));
        }
    }

    let mut label_arms = Vec::with_capacity(ranges.len());
    let mut order_arms = Vec::with_capacity(ranges.len());
    for (i, range) in ranges.iter().enumerate() {
        match (range.from, range.to) {
            (None, Some(to)) => {
                let to = to.to_string();
                label_arms.push(format!(
                    "WHEN {sql} < {to} THEN {}",
                    dialect.concat_string(&[below.as_str(), to.as_str()])
                ));
                order_arms.push(format!("WHEN {sql} < {to} THEN {i}"));
            }
            (Some(from), None) => {
                let from = from.to_string();
                let label = dialect.concat_string(&[at_least.as_str(), from.as_str()]);
                label_arms.push(format!("ELSE {label}"));
                order_arms.push(format!("ELSE {i}"));
            }
            (Some(from), Some(to)) => {
                let (from, to) = (from.to_string(), to.to_string());
                label_arms.push(format!(
                    "WHEN {sql} >= {from} AND {sql} < {to} THEN {}",
                    dialect.concat_string(&[from.as_str(), dash.as_str(), to.as_str()])
                ));
                order_arms.push(format!("WHEN {sql} >= {from} AND {sql} < {to} THEN {i}"));
            }
            (None, None) => {
                return Err(LumenError::InvalidCustomDimension(format!(
                    "Range {i} of custom dimension \"{}\" has no bounds",
                    custom_dimension.name
                )))
            }
        }
    }

    let mut selects = vec![SelectItem::aliased(
        case_expr(&label_arms),
        custom_dimension.id.clone(),
    )];
    if is_sorted {
        selects.push(SelectItem::aliased(
            case_expr(&order_arms),
            order_alias(custom_dimension),
        ));
    }
    Ok(selects)
}
