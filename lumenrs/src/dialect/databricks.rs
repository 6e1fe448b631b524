//! Databricks dialect implementation.

use super::{AdapterType, WarehouseDialect, WeekDay};

#[derive(Debug, Default, Clone, Copy)]
pub struct DatabricksDialect {
    start_of_week: Option<WeekDay>,
}

impl DatabricksDialect {
    pub fn with_start_of_week(mut self, day: Option<WeekDay>) -> Self {
        self.start_of_week = day;
        self
    }
}

impl WarehouseDialect for DatabricksDialect {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Databricks
    }

    fn start_of_week(&self) -> Option<WeekDay> {
        self.start_of_week
    }

    fn escape_string_quote_char(&self) -> char {
        '\\'
    }

    fn concat_string(&self, args: &[&str]) -> String {
        format!("CONCAT({})", args.join(", "))
    }
}
