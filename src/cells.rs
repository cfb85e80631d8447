use std::fmt;

use chrono::{
    naive::{NaiveDate, NaiveDateTime, NaiveTime},
    DateTime, Duration, Local, TimeZone,
};

/// Column type tag as reported in a result's `rowtype`
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawCell {
    Fixed,
    Real,
    Text,
    Binary,
    Boolean,
    Date,
    Time,
    TimestampLtz,
    TimestampNtz,
    TimestampTz,
    Variant,
    Object,
    Array,
    #[serde(other)]
    Unknown,
}

impl RawCell {
    /// Convert a raw string value into a Cell.
    ///
    /// - Number columns become `Int` when the value is integral, otherwise `Float`,
    ///   so a NUMBER column can hold mixed variants.
    /// - Anything that fails to parse is kept as `Varchar` with the original text;
    ///   nothing is dropped or panics.
    pub fn to_cell(&self, value: &Option<String>) -> Cell {
        let value = if let Some(value) = value {
            value
        } else {
            return Cell::Null;
        };
        self.parse(value)
            .unwrap_or_else(|| Cell::Varchar(value.to_owned()))
    }

    fn parse(&self, value: &str) -> Option<Cell> {
        Some(match self {
            RawCell::Fixed => match value.parse::<i128>() {
                Ok(value) => Cell::Int(value),
                Err(_) => {
                    let float: f64 = value.parse().ok()?;
                    if float.fract() == 0.0 && float.abs() < 1e18 {
                        Cell::Int(float as i128)
                    } else {
                        Cell::Float(float)
                    }
                }
            },
            RawCell::Real => Cell::Float(value.parse().ok()?),
            RawCell::Text | RawCell::Unknown => Cell::Varchar(value.to_owned()),
            RawCell::Variant | RawCell::Object | RawCell::Array => {
                Cell::Variant(serde_json::from_str(value).ok()?)
            }
            RawCell::Binary => Cell::Binary(hex::decode(value).ok()?),
            RawCell::Boolean => Cell::Boolean(match value {
                "1" => true,
                "0" => false,
                other => other.to_ascii_lowercase().parse().ok()?,
            }),
            RawCell::Date => Cell::Date(
                NaiveDate::from_ymd_opt(1970, 1, 1)? + Duration::days(value.parse().ok()?),
            ),
            RawCell::Time => {
                let (seconds, nanos) = split_seconds(value)?;
                Cell::Time(NaiveTime::from_num_seconds_from_midnight_opt(
                    u32::try_from(seconds).ok()?,
                    nanos,
                )?)
            }
            RawCell::TimestampLtz => {
                let (seconds, nanos) = split_seconds(value)?;
                Cell::TimestampLtz(Local.timestamp_opt(seconds, nanos).single()?)
            }
            RawCell::TimestampNtz => {
                let (seconds, nanos) = split_seconds(value)?;
                Cell::TimestampNtz(DateTime::from_timestamp(seconds, nanos)?.naive_utc())
            }
            RawCell::TimestampTz => {
                // "<epoch seconds> <offset minutes + 1440>"
                let (epoch, _offset) = value.split_once(' ')?;
                let (seconds, nanos) = split_seconds(epoch)?;
                Cell::TimestampTz(DateTime::from_timestamp(seconds, nanos)?.naive_utc())
            }
        })
    }
}

/// Split "1672534861.123000000" into whole seconds and nanoseconds
fn split_seconds(value: &str) -> Option<(i64, u32)> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, "0"));
    let seconds: i64 = whole.parse().ok()?;
    let mut digits: String = fraction.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    Some((seconds, digits.parse().ok()?))
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Int(i128),
    Float(f64),
    Varchar(String),
    Binary(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    TimestampLtz(DateTime<Local>),
    TimestampNtz(NaiveDateTime),
    /// Stored in UTC; the original offset is not kept
    TimestampTz(NaiveDateTime),
    Variant(serde_json::Value),
}

impl Cell {
    /// Numeric view of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(value) => Some(*value as f64),
            Cell::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Varchar(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Cell::*;
        match self {
            Null => f.write_str("None"),
            Int(value) => write!(f, "{value}"),
            Float(value) => write!(f, "{value}"),
            Varchar(value) => write!(f, "'{value}'"),
            Binary(value) => write!(f, "b'{}'", hex::encode(value)),
            Boolean(value) => write!(f, "{value}"),
            Date(value) => write!(f, "{value}"),
            Time(value) => write!(f, "{value}"),
            TimestampLtz(value) => write!(f, "{value}"),
            TimestampNtz(value) | TimestampTz(value) => write!(f, "{value}"),
            Variant(value) => write!(f, "{value}"),
        }
    }
}

impl From<Cell> for serde_json::Value {
    fn from(cell: Cell) -> Self {
        use serde_json::json;
        use Cell::*;
        match cell {
            Null => json!(null),
            Int(value) => json!(value),
            Float(value) => json!(value),
            Varchar(value) => json!(value),
            Binary(value) => json!(hex::encode(value)),
            Boolean(value) => json!(value),
            Date(value) => json!(value),
            Time(value) => json!(value),
            TimestampLtz(value) => json!(value),
            TimestampNtz(value) | TimestampTz(value) => json!(value),
            Variant(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    fn cell(raw: RawCell, value: &str) -> Cell {
        raw.to_cell(&Some(value.to_owned()))
    }

    #[test]
    fn numbers() {
        assert_eq!(cell(RawCell::Fixed, "5"), Cell::Int(5));
        assert_eq!(cell(RawCell::Fixed, "21.0000"), Cell::Int(21));
        assert_eq!(cell(RawCell::Fixed, "12.5000"), Cell::Float(12.5));
        assert_eq!(cell(RawCell::Real, "1.1"), Cell::Float(1.1));
        assert_eq!(RawCell::Fixed.to_cell(&None), Cell::Null);
    }

    #[test]
    fn dates_and_times() {
        assert!(matches!(cell(RawCell::Date, "19358"),
            Cell::Date(d) if d.year() == 2023 && d.month() == 1 && d.day() == 1));
        assert!(matches!(cell(RawCell::Time, "3661.5"),
            Cell::Time(t) if t.hour() == 1 && t.minute() == 1 && t.second() == 1
                && t.nanosecond() == 500_000_000));
        assert!(matches!(cell(RawCell::TimestampNtz, "1672534861.000000000"),
            Cell::TimestampNtz(t) if t.year() == 2023 && t.hour() == 1 && t.second() == 1));
        assert!(matches!(cell(RawCell::TimestampTz, "1672534861.000000000 1440"),
            Cell::TimestampTz(t) if t.minute() == 1));
    }

    #[test]
    fn other_types() {
        assert_eq!(cell(RawCell::Binary, "666f6f"), Cell::Binary(b"foo".to_vec()));
        assert_eq!(cell(RawCell::Boolean, "true"), Cell::Boolean(true));
        assert_eq!(cell(RawCell::Boolean, "0"), Cell::Boolean(false));
        assert_eq!(
            cell(RawCell::Variant, r#"{"a": 1}"#),
            Cell::Variant(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn unparsable_values_keep_their_text() {
        assert_eq!(
            cell(RawCell::Fixed, "not a number"),
            Cell::Varchar("not a number".into())
        );
        assert_eq!(cell(RawCell::Binary, "zz"), Cell::Varchar("zz".into()));
    }

    #[test]
    fn unknown_types_deserialize() {
        let raw: RawCell = serde_json::from_str(r#""geography""#).unwrap();
        assert_eq!(raw, RawCell::Unknown);
        let raw: RawCell = serde_json::from_str(r#""timestamp_ltz""#).unwrap();
        assert_eq!(raw, RawCell::TimestampLtz);
    }

    #[test]
    fn display_reads_like_a_tuple_element() {
        assert_eq!(Cell::Varchar("Snack".into()).to_string(), "'Snack'");
        assert_eq!(Cell::Int(5).to_string(), "5");
        assert_eq!(Cell::Null.to_string(), "None");
    }
}
