//! The structured query a user runs against an explore.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::explore::{field_id, CompiledDimension, CompiledMetric, FieldId, MetricType, ValueKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledMetricQuery {
    pub explore_name: String,
    #[serde(default)]
    pub dimensions: Vec<FieldId>,
    #[serde(default)]
    pub metrics: Vec<FieldId>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub sorts: Vec<SortField>,
    /// Row limit; 0 means "use the configured default".
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub table_calculations: Vec<TableCalculation>,
    #[serde(default)]
    pub compiled_table_calculations: Vec<CompiledTableCalculation>,
    #[serde(default)]
    pub additional_metrics: Vec<AdditionalMetric>,
    #[serde(default)]
    pub compiled_additional_metrics: Vec<CompiledMetric>,
    #[serde(default)]
    pub custom_dimensions: Vec<CustomDimension>,
    /// Carried for the caller; the compiler does not convert timezones.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl CompiledMetricQuery {
    pub fn new(explore_name: impl Into<String>) -> Self {
        Self {
            explore_name: explore_name.into(),
            dimensions: Vec::new(),
            metrics: Vec::new(),
            filters: Filters::default(),
            sorts: Vec::new(),
            limit: 0,
            table_calculations: Vec::new(),
            compiled_table_calculations: Vec::new(),
            additional_metrics: Vec::new(),
            compiled_additional_metrics: Vec::new(),
            custom_dimensions: Vec::new(),
            timezone: None,
        }
    }

    pub fn find_custom_dimension(&self, id: &str) -> Option<&CustomDimension> {
        self.custom_dimensions.iter().find(|cd| cd.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinType {
    FixedNumber,
    FixedWidth,
    CustomRange,
}

/// One bucket of a custom range. `from` is absent on the first bucket and
/// `to` on the last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinRange {
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
}

/// A numeric dimension bucketed into labelled bins at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDimension {
    pub id: String,
    pub name: String,
    pub dimension_id: FieldId,
    pub table: String,
    pub bin_type: BinType,
    #[serde(default)]
    pub bin_number: Option<u32>,
    #[serde(default)]
    pub bin_width: Option<f64>,
    #[serde(default)]
    pub custom_range: Option<Vec<BinRange>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalMetric {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    #[serde(default)]
    pub sql: String,
    /// Dimension the metric aggregates, when it was built from one.
    #[serde(default)]
    pub base_dimension_name: Option<String>,
}

impl AdditionalMetric {
    pub fn field_id(&self) -> FieldId {
        field_id(&self.table, &self.name)
    }

    pub fn base_dimension_id(&self) -> Option<FieldId> {
        self.base_dimension_name
            .as_deref()
            .map(|name| field_id(&self.table, name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCalculation {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub sql: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableCalculationType {
    Number,
    String,
    Date,
    Timestamp,
    Boolean,
}

impl TableCalculationType {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            TableCalculationType::Number => ValueKind::Number,
            TableCalculationType::String => ValueKind::String,
            TableCalculationType::Date => ValueKind::Date,
            TableCalculationType::Timestamp => ValueKind::Timestamp,
            TableCalculationType::Boolean => ValueKind::Boolean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTableCalculation {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub sql: String,
    pub compiled_sql: String,
    #[serde(default, rename = "type")]
    pub calculation_type: Option<TableCalculationType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field_id: FieldId,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<FilterGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<FilterGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_calculations: Option<FilterGroup>,
}

/// A boolean combination of filter rules and nested groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterGroup {
    And { id: String, and: Vec<FilterGroupItem> },
    Or { id: String, or: Vec<FilterGroupItem> },
}

impl FilterGroup {
    pub fn items(&self) -> &[FilterGroupItem] {
        match self {
            FilterGroup::And { and, .. } => and,
            FilterGroup::Or { or, .. } => or,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            FilterGroup::And { .. } => "AND",
            FilterGroup::Or { .. } => "OR",
        }
    }

    /// All rules in the tree, depth first.
    pub fn rules(&self) -> Vec<&FilterRule> {
        let mut out = Vec::new();
        collect_rules(self, &mut out);
        out
    }
}

fn collect_rules<'a>(group: &'a FilterGroup, out: &mut Vec<&'a FilterRule>) {
    for item in group.items() {
        match item {
            FilterGroupItem::Group(inner) => collect_rules(inner, out),
            FilterGroupItem::Rule(rule) => out.push(rule),
        }
    }
}

/// Rules of an optional group; an absent group has none.
pub fn filter_rules(group: Option<&FilterGroup>) -> Vec<&FilterRule> {
    group.map(FilterGroup::rules).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterGroupItem {
    Group(FilterGroup),
    Rule(FilterRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTarget {
    pub field_id: FieldId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    pub id: String,
    pub target: FilterTarget,
    pub operator: FilterOperator,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    IsNull,
    NotNull,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    Include,
    DoesNotInclude,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InBetween,
    NotInBetween,
}

/// Anything a compiled query can return a column for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Dimension(CompiledDimension),
    Metric(CompiledMetric),
    CustomDimension(CustomDimension),
    TableCalculation(CompiledTableCalculation),
}

/// Column id -> the item that produces it.
pub type ItemsMap = BTreeMap<String, Item>;
