//! Trino dialect implementation.

use super::{AdapterType, WarehouseDialect, WeekDay};

#[derive(Debug, Default, Clone, Copy)]
pub struct TrinoDialect {
    start_of_week: Option<WeekDay>,
}

impl TrinoDialect {
    pub fn with_start_of_week(mut self, day: Option<WeekDay>) -> Self {
        self.start_of_week = day;
        self
    }
}

impl WarehouseDialect for TrinoDialect {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Trino
    }

    fn start_of_week(&self) -> Option<WeekDay> {
        self.start_of_week
    }
}
