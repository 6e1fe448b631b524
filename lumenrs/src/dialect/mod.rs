//! Warehouse dialect capabilities consumed by the compiler.
//!
//! Each dialect is implemented in its own file. Dialects only supply quoting
//! characters and small SQL fragments; query assembly lives in the query builder.

use serde::{Deserialize, Serialize};

mod bigquery;
mod databricks;
mod duckdb;
mod postgres;
mod snowflake;
mod trino;

pub use bigquery::BigQueryDialect;
pub use databricks::DatabricksDialect;
pub use duckdb::DuckDbDialect;
pub use postgres::PostgresDialect;
pub use snowflake::SnowflakeDialect;
pub use trino::TrinoDialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterType {
    #[serde(rename = "bigquery")]
    BigQuery,
    Databricks,
    Snowflake,
    Redshift,
    Postgres,
    Trino,
    #[serde(rename = "duckdb")]
    DuckDb,
}

impl AdapterType {
    /// Identifier quote character for the warehouse credentials type.
    pub fn field_quote_char(&self) -> char {
        match self {
            AdapterType::BigQuery | AdapterType::Databricks => '`',
            AdapterType::Snowflake
            | AdapterType::Redshift
            | AdapterType::Postgres
            | AdapterType::Trino
            | AdapterType::DuckDb => '"',
        }
    }
}

/// First day of the week, Monday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekDay {
    pub fn index(&self) -> u32 {
        match self {
            WeekDay::Monday => 0,
            WeekDay::Tuesday => 1,
            WeekDay::Wednesday => 2,
            WeekDay::Thursday => 3,
            WeekDay::Friday => 4,
            WeekDay::Saturday => 5,
            WeekDay::Sunday => 6,
        }
    }

    pub fn upper_name(&self) -> &'static str {
        match self {
            WeekDay::Monday => "MONDAY",
            WeekDay::Tuesday => "TUESDAY",
            WeekDay::Wednesday => "WEDNESDAY",
            WeekDay::Thursday => "THURSDAY",
            WeekDay::Friday => "FRIDAY",
            WeekDay::Saturday => "SATURDAY",
            WeekDay::Sunday => "SUNDAY",
        }
    }
}

/// Warehouse capability the compiler is parameterized by.
pub trait WarehouseDialect {
    fn adapter_type(&self) -> AdapterType;

    fn start_of_week(&self) -> Option<WeekDay> {
        None
    }

    fn string_quote_char(&self) -> char {
        '\''
    }

    /// Character placed before an embedded string quote to escape it.
    fn escape_string_quote_char(&self) -> char {
        '\''
    }

    fn field_quote_char(&self) -> char {
        self.adapter_type().field_quote_char()
    }

    fn concat_string(&self, args: &[&str]) -> String {
        format!("({})", args.join(" || "))
    }

    fn quote_field(&self, ident: &str) -> String {
        let q = self.field_quote_char();
        format!("{q}{ident}{q}")
    }

    /// Render a string literal, escaping embedded quote characters.
    fn quote_string(&self, value: &str) -> String {
        let q = self.string_quote_char();
        let escaped = escape_string(value, q, self.escape_string_quote_char());
        format!("{q}{escaped}{q}")
    }
}

pub(crate) fn escape_string(value: &str, quote: char, escape: char) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == escape && escape != quote {
            out.push(escape);
        }
        if ch == quote {
            out.push(escape);
        }
        out.push(ch);
    }
    out
}
