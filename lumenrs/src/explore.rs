//! Compiled semantic model: explores, their tables, joins and fields.
//!
//! An [`Explore`] is produced upstream (from the project's semantic layer
//! definitions) and is read-only for the compiler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::time_frames::TimeFrame;

pub type FieldId = String;

/// Build the stable `<table>_<name>` identifier of a field.
pub fn field_id(table: &str, name: &str) -> FieldId {
    format!("{table}_{name}")
}

/// One or many string values of a user attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    One(String),
    Many(Vec<String>),
}

impl AttributeValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            AttributeValue::One(v) => vec![v.as_str()],
            AttributeValue::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::One(v) => v.is_empty(),
            AttributeValue::Many(vs) => vs.is_empty(),
        }
    }
}

/// Attribute name -> value (or any of the values) the user must hold.
pub type RequiredAttributes = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Left => "LEFT OUTER JOIN",
            JoinType::Right => "RIGHT OUTER JOIN",
        }
    }
}

/// How literal values compare against a field in generated filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Date,
    Timestamp,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    String,
    Number,
    Timestamp,
    Date,
    Boolean,
}

impl DimensionType {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            DimensionType::String => ValueKind::String,
            DimensionType::Number => ValueKind::Number,
            DimensionType::Timestamp => ValueKind::Timestamp,
            DimensionType::Date => ValueKind::Date,
            DimensionType::Boolean => ValueKind::Boolean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Percentile,
    Average,
    Count,
    CountDistinct,
    Sum,
    Min,
    Max,
    Median,
    Number,
    String,
    Date,
    Timestamp,
    Boolean,
}

impl MetricType {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            MetricType::String => ValueKind::String,
            MetricType::Date => ValueKind::Date,
            MetricType::Timestamp => ValueKind::Timestamp,
            MetricType::Boolean => ValueKind::Boolean,
            MetricType::Percentile
            | MetricType::Average
            | MetricType::Count
            | MetricType::CountDistinct
            | MetricType::Sum
            | MetricType::Min
            | MetricType::Max
            | MetricType::Median
            | MetricType::Number => ValueKind::Number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledDimension {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    #[serde(default)]
    pub sql: String,
    pub compiled_sql: String,
    #[serde(default)]
    pub tables_references: Option<Vec<String>>,
    #[serde(default)]
    pub required_attributes: Option<RequiredAttributes>,
    #[serde(default)]
    pub time_interval: Option<TimeFrame>,
    #[serde(default)]
    pub hidden: bool,
}

impl CompiledDimension {
    pub fn field_id(&self) -> FieldId {
        field_id(&self.table, &self.name)
    }

    /// Tables this dimension's SQL touches.
    pub fn table_references(&self) -> Vec<String> {
        match &self.tables_references {
            Some(refs) => refs.clone(),
            None => vec![self.table.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledMetric {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    #[serde(default)]
    pub sql: String,
    pub compiled_sql: String,
    #[serde(default)]
    pub tables_references: Option<Vec<String>>,
    #[serde(default)]
    pub required_attributes: Option<RequiredAttributes>,
    /// Placeholder metric generated by the system rather than defined by a user.
    #[serde(default)]
    pub is_auto_generated: bool,
}

impl CompiledMetric {
    pub fn field_id(&self) -> FieldId {
        field_id(&self.table, &self.name)
    }

    pub fn table_references(&self) -> Vec<String> {
        match &self.tables_references {
            Some(refs) => refs.clone(),
            None => vec![self.table.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTable {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Physical table reference, already quoted for the warehouse.
    pub sql_table: String,
    /// Row-level filter applied whenever this table is the explore's base table.
    #[serde(default)]
    pub sql_where: Option<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, CompiledDimension>,
    #[serde(default)]
    pub metrics: BTreeMap<String, CompiledMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreJoin {
    pub table: String,
    /// Raw condition with `${table.field}` references.
    pub sql_on: String,
    /// Rendered condition, may still hold `${ld.attribute.*}` placeholders.
    pub compiled_sql_on: String,
    #[serde(default, rename = "type")]
    pub join_type: Option<JoinType>,
    #[serde(default)]
    pub always: bool,
}

impl ExploreJoin {
    pub fn join_type(&self) -> JoinType {
        self.join_type.unwrap_or(JoinType::Left)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explore {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub base_table: String,
    #[serde(default)]
    pub joined_tables: Vec<ExploreJoin>,
    pub tables: BTreeMap<String, CompiledTable>,
}

impl Explore {
    pub fn dimensions(&self) -> impl Iterator<Item = &CompiledDimension> {
        self.tables.values().flat_map(|t| t.dimensions.values())
    }

    pub fn metrics(&self) -> impl Iterator<Item = &CompiledMetric> {
        self.tables.values().flat_map(|t| t.metrics.values())
    }

    pub fn find_dimension(&self, id: &str) -> Option<&CompiledDimension> {
        self.dimensions().find(|d| d.field_id() == id)
    }

    pub fn find_metric(&self, id: &str) -> Option<&CompiledMetric> {
        self.metrics().find(|m| m.field_id() == id)
    }

    pub fn base(&self) -> Option<&CompiledTable> {
        self.tables.get(&self.base_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_type_defaults_to_left() {
        let join: ExploreJoin = serde_json::from_value(serde_json::json!({
            "table": "customers",
            "sqlOn": "${orders.customer_id} = ${customers.id}",
            "compiledSqlOn": "(\"orders\".customer_id) = (\"customers\".id)"
        }))
        .unwrap();
        assert_eq!(join.join_type(), JoinType::Left);
        assert!(!join.always);
        assert_eq!(join.join_type().sql_keyword(), "LEFT OUTER JOIN");
    }

    #[test]
    fn unknown_join_type_is_rejected() {
        let parsed: std::result::Result<ExploreJoin, _> = serde_json::from_value(serde_json::json!({
            "table": "customers",
            "sqlOn": "",
            "compiledSqlOn": "",
            "type": "cross"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn attribute_value_accepts_scalar_and_list() {
        let one: AttributeValue = serde_json::from_str("\"US\"").unwrap();
        let many: AttributeValue = serde_json::from_str("[\"US\", \"UK\"]").unwrap();
        assert_eq!(one.values(), vec!["US"]);
        assert_eq!(many.values(), vec!["US", "UK"]);
        assert!(AttributeValue::Many(vec![]).is_empty());
    }

    #[test]
    fn table_references_fall_back_to_owner() {
        let dim = CompiledDimension {
            name: "status".to_string(),
            table: "orders".to_string(),
            label: None,
            dimension_type: DimensionType::String,
            sql: String::new(),
            compiled_sql: "\"orders\".status".to_string(),
            tables_references: None,
            required_attributes: None,
            time_interval: None,
            hidden: false,
        };
        assert_eq!(dim.field_id(), "orders_status");
        assert_eq!(dim.table_references(), vec!["orders".to_string()]);
    }
}
