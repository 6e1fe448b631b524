//! Snowflake dialect implementation.

use super::{AdapterType, WarehouseDialect, WeekDay};

#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeDialect {
    start_of_week: Option<WeekDay>,
}

impl SnowflakeDialect {
    pub fn with_start_of_week(mut self, day: Option<WeekDay>) -> Self {
        self.start_of_week = day;
        self
    }
}

impl WarehouseDialect for SnowflakeDialect {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Snowflake
    }

    fn start_of_week(&self) -> Option<WeekDay> {
        self.start_of_week
    }

    fn concat_string(&self, args: &[&str]) -> String {
        format!("CONCAT({})", args.join(", "))
    }
}
