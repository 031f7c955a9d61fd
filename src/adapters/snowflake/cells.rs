use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::Deserialize;

use crate::domain::result_table::Cell;

/// Column description from the `rowtype` array of a query response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub scale: Option<i64>,
    #[serde(default)]
    pub precision: Option<i64>,
    #[serde(default)]
    pub nullable: bool,
}

/// Lower-cases names Snowflake reports for unquoted (case-insensitive) identifiers.
///
/// Quoted identifiers that carry lowercase letters or characters outside
/// `[A-Z0-9_$]` are kept as returned.
///
/// ```
/// use snowflake_to_sheets::adapters::snowflake::cells::normalize_column_name;
/// assert_eq!(normalize_column_name("AMOUNT"), "amount");
/// assert_eq!(normalize_column_name("Amount"), "Amount");
/// assert_eq!(normalize_column_name("TOTAL USD"), "TOTAL USD");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    let mut chars = name.chars();
    let unquoted = match chars.next() {
        Some(first) if first.is_ascii_uppercase() || first == '_' => chars
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '$'),
        _ => false,
    };

    if unquoted {
        name.to_ascii_lowercase()
    } else {
        name.to_string()
    }
}

/// Converts one JSON rowset value to a [`Cell`] according to its column type.
///
/// Values that do not parse as their declared type are kept as text.
pub fn to_cell(row_type: &RowType, value: Option<&str>) -> Cell {
    let Some(value) = value else {
        return Cell::Null;
    };

    let converted = match row_type.r#type.to_ascii_lowercase().as_str() {
        "fixed" if row_type.scale.unwrap_or(0) == 0 => value.parse().ok().map(Cell::Int),
        "fixed" | "real" => value.parse().ok().map(Cell::Float),
        "boolean" => parse_bool(value).map(Cell::Bool),
        "date" => parse_date(value).map(Cell::Text),
        "time" => parse_time(value).map(Cell::Text),
        "timestamp" | "timestamp_ntz" | "timestamp_ltz" => {
            parse_timestamp(value, None).map(Cell::Text)
        }
        "timestamp_tz" => parse_timestamp_tz(value).map(Cell::Text),
        _ => None,
    };

    converted.unwrap_or_else(|| Cell::Text(value.to_string()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

// Days since the Unix epoch.
fn parse_date(value: &str) -> Option<String> {
    let days: i64 = value.parse().ok()?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    epoch
        .checked_add_signed(Duration::days(days))
        .map(|date| date.format("%Y-%m-%d").to_string())
}

// Seconds since midnight with an optional fraction.
fn parse_time(value: &str) -> Option<String> {
    let (secs, nanos) = split_seconds(value)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(secs).ok()?, nanos)?;
    Some(format_time(time, nanos))
}

// Epoch seconds with an optional fraction, rendered in `offset` (UTC if none).
fn parse_timestamp(value: &str, offset: Option<FixedOffset>) -> Option<String> {
    let (secs, nanos) = split_seconds(value)?;
    let utc = DateTime::from_timestamp(secs, nanos)?;
    let offset = match offset {
        Some(offset) => offset,
        None => FixedOffset::east_opt(0)?,
    };
    let local = utc.with_timezone(&offset).naive_local();
    Some(format!(
        "{} {}",
        local.date().format("%Y-%m-%d"),
        format_time(local.time(), nanos)
    ))
}

// `<epoch seconds> <offset minutes + 1440>`
fn parse_timestamp_tz(value: &str) -> Option<String> {
    let (timestamp, offset) = value.split_once(' ')?;
    let minutes: i32 = offset.trim().parse().ok()?;
    let offset = FixedOffset::east_opt((minutes - 1440) * 60)?;
    parse_timestamp(timestamp, Some(offset))
}

fn split_seconds(value: &str) -> Option<(i64, u32)> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };
    let secs: i64 = whole.parse().ok()?;
    if fraction.is_empty() {
        return Some((secs, 0));
    }
    if fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let nanos: u32 = format!("{:0<9}", fraction).parse().ok()?;
    // Negative epochs carry the fraction towards zero.
    if whole.starts_with('-') {
        if nanos == 0 {
            return Some((secs, 0));
        }
        return Some((secs - 1, 1_000_000_000 - nanos));
    }
    Some((secs, nanos))
}

fn format_time(time: NaiveTime, nanos: u32) -> String {
    let base = format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second());
    if nanos == 0 {
        return base;
    }
    let fraction = format!("{:09}", nanos);
    format!("{}.{}", base, fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_type(r#type: &str, scale: Option<i64>) -> RowType {
        RowType {
            name: "C".to_string(),
            r#type: r#type.to_string(),
            scale,
            precision: None,
            nullable: true,
        }
    }

    #[test]
    fn test_null_is_null_for_every_type() {
        for t in ["fixed", "text", "date", "boolean"] {
            assert_eq!(to_cell(&row_type(t, None), None), Cell::Null);
        }
    }

    #[test]
    fn test_fixed_without_scale_is_integer() {
        assert_eq!(to_cell(&row_type("fixed", Some(0)), Some("42")), Cell::Int(42));
        assert_eq!(to_cell(&row_type("fixed", None), Some("-7")), Cell::Int(-7));
    }

    #[test]
    fn test_fixed_overflowing_i64_is_kept_as_text() {
        let huge = "123456789012345678901234567890";
        assert_eq!(
            to_cell(&row_type("fixed", Some(0)), Some(huge)),
            Cell::Text(huge.to_string())
        );
    }

    #[test]
    fn test_fixed_with_scale_and_real_are_floats() {
        assert_eq!(
            to_cell(&row_type("fixed", Some(2)), Some("10.25")),
            Cell::Float(10.25)
        );
        assert_eq!(to_cell(&row_type("real", None), Some("0.5")), Cell::Float(0.5));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(to_cell(&row_type("boolean", None), Some("1")), Cell::Bool(true));
        assert_eq!(
            to_cell(&row_type("boolean", None), Some("false")),
            Cell::Bool(false)
        );
    }

    #[test]
    fn test_date_from_epoch_days() {
        assert_eq!(
            to_cell(&row_type("date", None), Some("19723")),
            Cell::Text("2024-01-01".to_string())
        );
        assert_eq!(
            to_cell(&row_type("date", None), Some("-1")),
            Cell::Text("1969-12-31".to_string())
        );
    }

    #[test]
    fn test_time_from_seconds() {
        assert_eq!(
            to_cell(&row_type("time", None), Some("45296.500000000")),
            Cell::Text("12:34:56.5".to_string())
        );
        assert_eq!(
            to_cell(&row_type("time", None), Some("0")),
            Cell::Text("00:00:00".to_string())
        );
    }

    #[test]
    fn test_timestamp_ntz() {
        assert_eq!(
            to_cell(&row_type("timestamp_ntz", None), Some("1704110400.000000000")),
            Cell::Text("2024-01-01 12:00:00".to_string())
        );
        assert_eq!(
            to_cell(&row_type("timestamp_ltz", None), Some("1704110400.123000000")),
            Cell::Text("2024-01-01 12:00:00.123".to_string())
        );
    }

    #[test]
    fn test_negative_timestamp_fraction() {
        assert_eq!(
            to_cell(&row_type("timestamp_ntz", None), Some("-0.500000000")),
            Cell::Text("1969-12-31 23:59:59.5".to_string())
        );
    }

    #[test]
    fn test_timestamp_tz_applies_offset() {
        // +02:00 is encoded as 1440 + 120
        assert_eq!(
            to_cell(&row_type("timestamp_tz", None), Some("1704110400.000000000 1560")),
            Cell::Text("2024-01-01 14:00:00".to_string())
        );
    }

    #[test]
    fn test_unparseable_value_is_kept_as_text() {
        assert_eq!(
            to_cell(&row_type("date", None), Some("not-a-date")),
            Cell::Text("not-a-date".to_string())
        );
    }

    #[test]
    fn test_text_and_variant_are_text() {
        assert_eq!(
            to_cell(&row_type("text", None), Some("hello")),
            Cell::Text("hello".to_string())
        );
        assert_eq!(
            to_cell(&row_type("variant", None), Some("{\"a\":1}")),
            Cell::Text("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("ID"), "id");
        assert_eq!(normalize_column_name("UPDATE_DATE"), "update_date");
        assert_eq!(normalize_column_name("COL$1"), "col$1");
        assert_eq!(normalize_column_name("1ST"), "1ST");
        assert_eq!(normalize_column_name("already_lower"), "already_lower");
        assert_eq!(normalize_column_name(""), "");
    }
}
