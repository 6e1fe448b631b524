//! Reshapes flat result rows into a pivoted table for charting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::executor::ResultRow;

/// Which columns stay as rows (`index`), which spread into columns (`on`) and
/// which are moved into the spread columns (`values`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    pub index: Vec<String>,
    pub on: Vec<String>,
    pub values: Vec<String>,
}

impl PivotConfig {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Pivot `rows` per `config`.
///
/// Output rows are grouped by the `index` columns in first-seen order. Every
/// `values` column lands in a column named `<value>_<on1>_<on2>...` built
/// from that row's `on` values. When two rows share an index and an `on`
/// combination the later row wins.
pub fn pivot_results(rows: Vec<ResultRow>, config: &PivotConfig) -> Vec<ResultRow> {
    if config.is_empty() {
        return rows;
    }

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut pivoted: Vec<ResultRow> = Vec::new();

    for row in rows {
        let key: Vec<Value> = config
            .index
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
            .collect();

        let position = *positions
            .entry(Value::Array(key.clone()).to_string())
            .or_insert_with(|| {
                let mut out = ResultRow::new();
                for (column, value) in config.index.iter().zip(&key) {
                    out.insert(column.clone(), value.clone());
                }
                pivoted.push(out);
                pivoted.len() - 1
            });

        let suffix: String = config
            .on
            .iter()
            .map(|column| format!("_{}", cell_label(row.get(column))))
            .collect();
        for value_column in &config.values {
            let cell = row.get(value_column).cloned().unwrap_or(Value::Null);
            pivoted[position].insert(format!("{value_column}{suffix}"), cell);
        }
    }

    pivoted
}

fn cell_label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> ResultRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn config(index: &[&str], on: &[&str], values: &[&str]) -> PivotConfig {
        let owned = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
        PivotConfig {
            index: owned(index),
            on: owned(on),
            values: owned(values),
        }
    }

    #[test]
    fn spreads_values_across_on_columns() {
        let rows = vec![
            row(json!({"month": "2024-01", "status": "open", "count": 3})),
            row(json!({"month": "2024-01", "status": "closed", "count": 5})),
            row(json!({"month": "2024-02", "status": "open", "count": 1})),
        ];
        let out = pivot_results(rows, &config(&["month"], &["status"], &["count"]));

        assert_eq!(out.len(), 2);
        assert_eq!(
            Value::Object(out[0].clone()),
            json!({"month": "2024-01", "count_open": 3, "count_closed": 5})
        );
        assert_eq!(
            Value::Object(out[1].clone()),
            json!({"month": "2024-02", "count_open": 1})
        );
    }

    #[test]
    fn joins_multiple_on_columns_and_formats_non_strings() {
        let rows = vec![row(json!({"k": 1, "a": "x", "b": 2, "v": 10}))];
        let out = pivot_results(rows, &config(&["k"], &["a", "b"], &["v"]));
        assert_eq!(out[0].get("v_x_2"), Some(&json!(10)));
    }

    #[test]
    fn later_duplicate_wins() {
        let rows = vec![
            row(json!({"k": 1, "a": "x", "v": 1})),
            row(json!({"k": 1, "a": "x", "v": 2})),
        ];
        let out = pivot_results(rows, &config(&["k"], &["a"], &["v"]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("v_x"), Some(&json!(2)));
    }

    #[test]
    fn interleaved_keys_keep_first_seen_order() {
        let rows = vec![
            row(json!({"k": "b", "a": "x", "v": 1})),
            row(json!({"k": "a", "a": "x", "v": 2})),
            row(json!({"k": "b", "a": "y", "v": 3})),
            row(json!({"k": 1, "a": "x", "v": 4})),
            row(json!({"k": "a", "a": "y", "v": 5})),
        ];
        let out = pivot_results(rows, &config(&["k"], &["a"], &["v"]));
        assert_eq!(out.len(), 3);
        assert_eq!(
            Value::Object(out[0].clone()),
            json!({"k": "b", "v_x": 1, "v_y": 3})
        );
        assert_eq!(
            Value::Object(out[1].clone()),
            json!({"k": "a", "v_x": 2, "v_y": 5})
        );
        // a number and a string with the same text are different keys
        assert_eq!(Value::Object(out[2].clone()), json!({"k": 1, "v_x": 4}));
    }

    #[test]
    fn empty_index_is_passthrough() {
        let rows = vec![row(json!({"a": 1})), row(json!({"a": 2}))];
        let out = pivot_results(rows.clone(), &PivotConfig::default());
        assert_eq!(out, rows);
    }
}
