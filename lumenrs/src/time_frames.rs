//! Time-frame decomposition of date dimensions.
//!
//! A dimension id such as `orders_created_month` is resolved as the base
//! dimension `orders_created` truncated to `MONTH`. The SQL for each frame
//! depends on the warehouse.

use serde::{Deserialize, Serialize};

use crate::dialect::{AdapterType, WeekDay};
use crate::explore::DimensionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeFrame {
    Raw,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
    DayOfWeekIndex,
    DayOfWeekName,
    DayOfMonthNum,
    DayOfYearNum,
    WeekNum,
    MonthNum,
    MonthName,
    QuarterNum,
    YearNum,
    HourOfDayNum,
    MinuteOfHourNum,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 21] = [
        TimeFrame::Raw,
        TimeFrame::Millisecond,
        TimeFrame::Second,
        TimeFrame::Minute,
        TimeFrame::Hour,
        TimeFrame::Day,
        TimeFrame::Week,
        TimeFrame::Month,
        TimeFrame::Quarter,
        TimeFrame::Year,
        TimeFrame::DayOfWeekIndex,
        TimeFrame::DayOfWeekName,
        TimeFrame::DayOfMonthNum,
        TimeFrame::DayOfYearNum,
        TimeFrame::WeekNum,
        TimeFrame::MonthNum,
        TimeFrame::MonthName,
        TimeFrame::QuarterNum,
        TimeFrame::YearNum,
        TimeFrame::HourOfDayNum,
        TimeFrame::MinuteOfHourNum,
    ];

    /// Suffix appended to a base dimension id, without the leading underscore.
    pub fn suffix(&self) -> &'static str {
        match self {
            TimeFrame::Raw => "raw",
            TimeFrame::Millisecond => "millisecond",
            TimeFrame::Second => "second",
            TimeFrame::Minute => "minute",
            TimeFrame::Hour => "hour",
            TimeFrame::Day => "day",
            TimeFrame::Week => "week",
            TimeFrame::Month => "month",
            TimeFrame::Quarter => "quarter",
            TimeFrame::Year => "year",
            TimeFrame::DayOfWeekIndex => "day_of_week_index",
            TimeFrame::DayOfWeekName => "day_of_week_name",
            TimeFrame::DayOfMonthNum => "day_of_month_num",
            TimeFrame::DayOfYearNum => "day_of_year_num",
            TimeFrame::WeekNum => "week_num",
            TimeFrame::MonthNum => "month_num",
            TimeFrame::MonthName => "month_name",
            TimeFrame::QuarterNum => "quarter_num",
            TimeFrame::YearNum => "year_num",
            TimeFrame::HourOfDayNum => "hour_of_day_num",
            TimeFrame::MinuteOfHourNum => "minute_of_hour_num",
        }
    }

    fn truncation_unit(&self) -> Option<&'static str> {
        match self {
            TimeFrame::Millisecond => Some("MILLISECOND"),
            TimeFrame::Second => Some("SECOND"),
            TimeFrame::Minute => Some("MINUTE"),
            TimeFrame::Hour => Some("HOUR"),
            TimeFrame::Day => Some("DAY"),
            TimeFrame::Week => Some("WEEK"),
            TimeFrame::Month => Some("MONTH"),
            TimeFrame::Quarter => Some("QUARTER"),
            TimeFrame::Year => Some("YEAR"),
            _ => None,
        }
    }
}

/// Split `<base>_<frame>` into the base dimension id and its frame.
///
/// The longest matching suffix wins, so `x_day_of_week_index` never resolves
/// as a shorter frame.
pub fn parse_date_dimension(id: &str) -> Option<(&str, TimeFrame)> {
    let mut frames = TimeFrame::ALL.to_vec();
    frames.sort_by_key(|f| std::cmp::Reverse(f.suffix().len()));
    frames.into_iter().find_map(|frame| {
        let base = id.strip_suffix(frame.suffix())?.strip_suffix('_')?;
        if base.is_empty() {
            None
        } else {
            Some((base, frame))
        }
    })
}

/// SQL for `sql` truncated to, or decomposed into, `frame`.
pub fn sql_for_truncated_date(
    adapter: AdapterType,
    frame: TimeFrame,
    sql: &str,
    dimension_type: DimensionType,
    start_of_week: Option<WeekDay>,
) -> String {
    match frame {
        TimeFrame::Raw => sql.to_string(),
        TimeFrame::DayOfWeekIndex => day_of_week_index(adapter, sql, start_of_week),
        TimeFrame::DayOfWeekName => day_of_week_name(adapter, sql),
        TimeFrame::MonthName => month_name(adapter, sql),
        TimeFrame::DayOfMonthNum => extract("DAY", sql),
        TimeFrame::DayOfYearNum => extract(day_of_year_part(adapter), sql),
        TimeFrame::WeekNum => extract("WEEK", sql),
        TimeFrame::MonthNum => extract("MONTH", sql),
        TimeFrame::QuarterNum => extract("QUARTER", sql),
        TimeFrame::YearNum => extract("YEAR", sql),
        TimeFrame::HourOfDayNum => extract("HOUR", sql),
        TimeFrame::MinuteOfHourNum => extract("MINUTE", sql),
        TimeFrame::Week => match start_of_week {
            Some(day) => week_with_start(adapter, sql, dimension_type, day),
            None => truncate(adapter, "WEEK", sql, dimension_type),
        },
        TimeFrame::Millisecond
        | TimeFrame::Second
        | TimeFrame::Minute
        | TimeFrame::Hour
        | TimeFrame::Day
        | TimeFrame::Month
        | TimeFrame::Quarter
        | TimeFrame::Year => {
            let unit = frame.truncation_unit().unwrap_or("DAY");
            truncate(adapter, unit, sql, dimension_type)
        }
    }
}

fn truncate(adapter: AdapterType, unit: &str, sql: &str, dimension_type: DimensionType) -> String {
    match adapter {
        AdapterType::BigQuery => {
            if dimension_type == DimensionType::Timestamp {
                format!("TIMESTAMP_TRUNC({sql}, {unit})")
            } else {
                format!("DATE_TRUNC({sql}, {unit})")
            }
        }
        AdapterType::Trino => format!("DATE_TRUNC('{}', {sql})", unit.to_lowercase()),
        AdapterType::Databricks
        | AdapterType::Snowflake
        | AdapterType::Redshift
        | AdapterType::Postgres
        | AdapterType::DuckDb => format!("DATE_TRUNC('{unit}', {sql})"),
    }
}

fn week_with_start(
    adapter: AdapterType,
    sql: &str,
    dimension_type: DimensionType,
    day: WeekDay,
) -> String {
    let offset = day.index();
    match adapter {
        AdapterType::BigQuery => {
            let unit = format!("WEEK({})", day.upper_name());
            truncate(adapter, &unit, sql, dimension_type)
        }
        AdapterType::Snowflake | AdapterType::Databricks => format!(
            "DATEADD(DAY, {offset}, DATE_TRUNC('WEEK', DATEADD(DAY, -{offset}, {sql})))"
        ),
        AdapterType::Postgres | AdapterType::Redshift | AdapterType::DuckDb => format!(
            "(DATE_TRUNC('WEEK', ({sql} - INTERVAL '{offset} days')) + INTERVAL '{offset} days')"
        ),
        AdapterType::Trino => format!(
            "(DATE_TRUNC('week', ({sql} - INTERVAL '{offset}' DAY)) + INTERVAL '{offset}' DAY)"
        ),
    }
}

fn day_of_year_part(adapter: AdapterType) -> &'static str {
    match adapter {
        AdapterType::BigQuery | AdapterType::Snowflake => "DAYOFYEAR",
        _ => "DOY",
    }
}

fn extract(part: &str, sql: &str) -> String {
    format!("EXTRACT({part} FROM {sql})")
}

/// Day of week with Sunday = 0.
fn sunday_based_day_of_week(adapter: AdapterType, sql: &str) -> String {
    match adapter {
        AdapterType::BigQuery => format!("(EXTRACT(DAYOFWEEK FROM {sql}) - 1)"),
        AdapterType::Databricks => format!("(DAYOFWEEK({sql}) - 1)"),
        AdapterType::Snowflake => format!("DAYOFWEEK({sql})"),
        AdapterType::Trino => format!("MOD(DAY_OF_WEEK({sql}), 7)"),
        AdapterType::Postgres | AdapterType::Redshift | AdapterType::DuckDb => {
            format!("EXTRACT(DOW FROM {sql})")
        }
    }
}

fn day_of_week_index(adapter: AdapterType, sql: &str, start_of_week: Option<WeekDay>) -> String {
    let dow = sunday_based_day_of_week(adapter, sql);
    match start_of_week {
        Some(day) => {
            let start = (day.index() + 1) % 7;
            format!("MOD({dow} - {start} + 7, 7)")
        }
        None => dow,
    }
}

fn day_of_week_name(adapter: AdapterType, sql: &str) -> String {
    match adapter {
        AdapterType::BigQuery => format!("FORMAT_DATETIME('%A', DATETIME({sql}))"),
        AdapterType::Snowflake | AdapterType::DuckDb => format!("DAYNAME({sql})"),
        AdapterType::Postgres | AdapterType::Redshift => format!("TO_CHAR({sql}, 'FMDay')"),
        AdapterType::Databricks => format!("DATE_FORMAT({sql}, 'EEEE')"),
        AdapterType::Trino => format!("DATE_FORMAT({sql}, '%W')"),
    }
}

fn month_name(adapter: AdapterType, sql: &str) -> String {
    match adapter {
        AdapterType::BigQuery => format!("FORMAT_DATETIME('%B', DATETIME({sql}))"),
        AdapterType::Snowflake | AdapterType::DuckDb => format!("MONTHNAME({sql})"),
        AdapterType::Postgres | AdapterType::Redshift => format!("TO_CHAR({sql}, 'FMMonth')"),
        AdapterType::Databricks => format!("DATE_FORMAT({sql}, 'MMMM')"),
        AdapterType::Trino => format!("DATE_FORMAT({sql}, '%M')"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_longest_suffix() {
        assert_eq!(
            parse_date_dimension("orders_created_day_of_week_index"),
            Some(("orders_created", TimeFrame::DayOfWeekIndex))
        );
        assert_eq!(
            parse_date_dimension("orders_created_month"),
            Some(("orders_created", TimeFrame::Month))
        );
        assert_eq!(parse_date_dimension("orders_status"), None);
        assert_eq!(parse_date_dimension("day"), None);
    }

    #[test]
    fn truncates_per_adapter() {
        let pg = sql_for_truncated_date(
            AdapterType::Postgres,
            TimeFrame::Month,
            "\"orders\".created",
            DimensionType::Timestamp,
            None,
        );
        assert_eq!(pg, "DATE_TRUNC('MONTH', \"orders\".created)");

        let bq = sql_for_truncated_date(
            AdapterType::BigQuery,
            TimeFrame::Day,
            "`orders`.created",
            DimensionType::Date,
            None,
        );
        assert_eq!(bq, "DATE_TRUNC(`orders`.created, DAY)");

        let raw = sql_for_truncated_date(
            AdapterType::Trino,
            TimeFrame::Raw,
            "x",
            DimensionType::Timestamp,
            None,
        );
        assert_eq!(raw, "x");
    }

    #[test]
    fn week_start_shifts_truncation() {
        let pg = sql_for_truncated_date(
            AdapterType::Postgres,
            TimeFrame::Week,
            "x",
            DimensionType::Date,
            Some(WeekDay::Sunday),
        );
        assert_eq!(
            pg,
            "(DATE_TRUNC('WEEK', (x - INTERVAL '6 days')) + INTERVAL '6 days')"
        );

        let bq = sql_for_truncated_date(
            AdapterType::BigQuery,
            TimeFrame::Week,
            "x",
            DimensionType::Timestamp,
            Some(WeekDay::Sunday),
        );
        assert_eq!(bq, "TIMESTAMP_TRUNC(x, WEEK(SUNDAY))");
    }

    #[test]
    fn day_of_week_index_respects_start() {
        let sql = sql_for_truncated_date(
            AdapterType::DuckDb,
            TimeFrame::DayOfWeekIndex,
            "x",
            DimensionType::Date,
            Some(WeekDay::Monday),
        );
        assert_eq!(sql, "MOD(EXTRACT(DOW FROM x) - 1 + 7, 7)");
    }
}
