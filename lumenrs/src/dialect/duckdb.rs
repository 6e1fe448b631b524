//! DuckDB dialect implementation.

use super::{AdapterType, WarehouseDialect, WeekDay};

#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect {
    start_of_week: Option<WeekDay>,
}

impl DuckDbDialect {
    pub fn with_start_of_week(mut self, day: Option<WeekDay>) -> Self {
        self.start_of_week = day;
        self
    }
}

impl WarehouseDialect for DuckDbDialect {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::DuckDb
    }

    fn start_of_week(&self) -> Option<WeekDay> {
        self.start_of_week
    }
}
