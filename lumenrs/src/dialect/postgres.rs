//! PostgreSQL dialect implementation (also used for Redshift).

use super::{AdapterType, WarehouseDialect, WeekDay};

#[derive(Debug, Clone, Copy)]
pub struct PostgresDialect {
    adapter: AdapterType,
    start_of_week: Option<WeekDay>,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self {
            adapter: AdapterType::Postgres,
            start_of_week: None,
        }
    }
}

impl PostgresDialect {
    /// Redshift shares PostgreSQL's quoting and concatenation rules.
    pub fn redshift() -> Self {
        Self {
            adapter: AdapterType::Redshift,
            start_of_week: None,
        }
    }

    pub fn with_start_of_week(mut self, day: Option<WeekDay>) -> Self {
        self.start_of_week = day;
        self
    }
}

impl WarehouseDialect for PostgresDialect {
    fn adapter_type(&self) -> AdapterType {
        self.adapter
    }

    fn start_of_week(&self) -> Option<WeekDay> {
        self.start_of_week
    }
}
