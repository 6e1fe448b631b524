//! BigQuery dialect implementation.

use super::{AdapterType, WarehouseDialect, WeekDay};

#[derive(Debug, Default, Clone, Copy)]
pub struct BigQueryDialect {
    start_of_week: Option<WeekDay>,
}

impl BigQueryDialect {
    pub fn with_start_of_week(mut self, day: Option<WeekDay>) -> Self {
        self.start_of_week = day;
        self
    }
}

impl WarehouseDialect for BigQueryDialect {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::BigQuery
    }

    fn start_of_week(&self) -> Option<WeekDay> {
        self.start_of_week
    }

    fn escape_string_quote_char(&self) -> char {
        // BigQuery escapes quotes with a backslash
        '\\'
    }

    fn concat_string(&self, args: &[&str]) -> String {
        // CONCAT only accepts strings, numeric bin bounds need a cast
        let quote = self.string_quote_char();
        let rendered: Vec<String> = args
            .iter()
            .map(|arg| {
                if arg.starts_with(quote) {
                    arg.to_string()
                } else {
                    format!("CAST({arg} AS STRING)")
                }
            })
            .collect();
        format!("CONCAT({})", rendered.join(", "))
    }
}
