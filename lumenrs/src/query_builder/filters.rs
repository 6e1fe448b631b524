use serde_json::Value;

use crate::dialect::WarehouseDialect;
use crate::error::{LumenError, Result};
use crate::explore::ValueKind;
use crate::metric_query::{FilterGroup, FilterGroupItem, FilterOperator, FilterRule};

/// Render a filter tree. Groups with no renderable rules disappear, so the
/// result is `None` when nothing is left to filter on.
pub fn render_filter_group<F>(
    group: Option<&FilterGroup>,
    render_rule: &F,
) -> Result<Option<String>>
where
    F: Fn(&FilterRule) -> Result<String>,
{
    let Some(group) = group else {
        return Ok(None);
    };

    let mut parts = Vec::new();
    for item in group.items() {
        match item {
            FilterGroupItem::Group(inner) => {
                if let Some(sql) = render_filter_group(Some(inner), render_rule)? {
                    parts.push(sql);
                }
            }
            FilterGroupItem::Rule(rule) if rule.disabled => {}
            FilterGroupItem::Rule(rule) => {
                parts.push(format!("(\n  {}\n)", render_rule(rule)?));
            }
        }
    }

    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!(
        "({})",
        parts.join(&format!(" {} ", group.keyword()))
    )))
}

/// Render one rule against `field_sql`, typing its values by `kind`.
pub fn render_filter_rule(
    rule: &FilterRule,
    field_sql: &str,
    kind: ValueKind,
    dialect: &dyn WarehouseDialect,
) -> Result<String> {
    use FilterOperator::*;

    match rule.operator {
        IsNull => return Ok(format!("({field_sql}) IS NULL")),
        NotNull => return Ok(format!("({field_sql}) IS NOT NULL")),
        _ => {}
    }
    if rule.values.is_empty() {
        return Ok("true".to_string());
    }

    let literals = rule
        .values
        .iter()
        .map(|v| render_value(v, kind, dialect))
        .collect::<Result<Vec<_>>>()?;

    match (rule.operator, kind) {
        (Equals, _) => Ok(if literals.len() == 1 {
            format!("({field_sql}) = {}", literals[0])
        } else {
            format!("({field_sql}) IN ({})", literals.join(","))
        }),
        (NotEquals, _) => Ok(if literals.len() == 1 {
            format!("(({field_sql}) != {} OR ({field_sql}) IS NULL)", literals[0])
        } else {
            format!(
                "(({field_sql}) NOT IN ({}) OR ({field_sql}) IS NULL)",
                literals.join(",")
            )
        }),
        (StartsWith | EndsWith | Include | DoesNotInclude, ValueKind::String) => {
            let patterns: Vec<String> = rule
                .values
                .iter()
                .map(|v| {
                    let text = value_text(v);
                    match rule.operator {
                        StartsWith => format!(
                            "({field_sql}) LIKE {}",
                            dialect.quote_string(&format!("{text}%"))
                        ),
                        EndsWith => format!(
                            "({field_sql}) LIKE {}",
                            dialect.quote_string(&format!("%{text}"))
                        ),
                        Include => format!(
                            "LOWER({field_sql}) LIKE LOWER({})",
                            dialect.quote_string(&format!("%{text}%"))
                        ),
                        _ => format!(
                            "LOWER({field_sql}) NOT LIKE LOWER({})",
                            dialect.quote_string(&format!("%{text}%"))
                        ),
                    }
                })
                .collect();
            let joiner = if rule.operator == DoesNotInclude {
                "\n  AND\n  "
            } else {
                "\n  OR\n  "
            };
            Ok(patterns.join(joiner))
        }
        (LessThan, ValueKind::Number | ValueKind::Date | ValueKind::Timestamp) => {
            Ok(format!("({field_sql}) < {}", literals[0]))
        }
        (LessThanOrEqual, ValueKind::Number | ValueKind::Date | ValueKind::Timestamp) => {
            Ok(format!("({field_sql}) <= {}", literals[0]))
        }
        (GreaterThan, ValueKind::Number | ValueKind::Date | ValueKind::Timestamp) => {
            Ok(format!("({field_sql}) > {}", literals[0]))
        }
        (GreaterThanOrEqual, ValueKind::Number | ValueKind::Date | ValueKind::Timestamp) => {
            Ok(format!("({field_sql}) >= {}", literals[0]))
        }
        (InBetween | NotInBetween, ValueKind::Number | ValueKind::Date | ValueKind::Timestamp) => {
            let [low, high] = match literals.as_slice() {
                [low, high, ..] => [low, high],
                _ => return Ok("true".to_string()),
            };
            Ok(if rule.operator == InBetween {
                format!("(({field_sql}) >= {low} AND ({field_sql}) <= {high})")
            } else {
                format!("(({field_sql}) < {low} OR ({field_sql}) > {high})")
            })
        }
        (operator, kind) => Err(LumenError::Parameter(format!(
            "filter operator {operator:?} is not supported on {kind:?} field {}",
            rule.target.field_id
        ))),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_value(value: &Value, kind: ValueKind, dialect: &dyn WarehouseDialect) -> Result<String> {
    match kind {
        ValueKind::Number => match value {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|n| n.to_string())
                .ok_or_else(|| {
                    LumenError::Parameter(format!("filter value {s:?} is not a number"))
                }),
            other => Err(LumenError::Parameter(format!(
                "filter value {other} is not a number"
            ))),
        },
        ValueKind::Boolean => match value {
            Value::Bool(b) => Ok(b.to_string()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok("true".to_string()),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok("false".to_string()),
            other => Err(LumenError::Parameter(format!(
                "filter value {other} is not a boolean"
            ))),
        },
        ValueKind::String | ValueKind::Date | ValueKind::Timestamp => {
            Ok(dialect.quote_string(&value_text(value)))
        }
    }
}

/// Value kind for a field without a declared type, from its first value.
pub(crate) fn infer_value_kind(values: &[Value]) -> ValueKind {
    match values.first() {
        Some(Value::String(_)) => ValueKind::String,
        Some(Value::Bool(_)) => ValueKind::Boolean,
        _ => ValueKind::Number,
    }
}
