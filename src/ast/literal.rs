use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::model::DataType;

/// A geographic point with an optional elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "POINT({:?} {:?} {:?})", self.x, self.y, z),
            None => write!(f, "POINT({:?} {:?})", self.x, self.y),
        }
    }
}

/// Constant value embedded in a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null` or `NULL`
    Null,

    /// `true` or `false`
    Boolean(bool),

    /// Integer without suffix
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Int32(i32),

    /// Integer with the `L` suffix
    ///
    /// # Example
    /// ```text
    /// 42L
    /// ```
    Int64(i64),

    /// Number with the `f` suffix
    ///
    /// # Example
    /// ```text
    /// 3.5f
    /// ```
    Single(f32),

    /// Number with a fraction or exponent, or the `d` suffix
    ///
    /// # Examples
    /// ```text
    /// 7.0
    /// 1e10
    /// 2d
    /// ```
    Double(f64),

    /// Number with the `m` suffix
    ///
    /// # Example
    /// ```text
    /// 10.25m
    /// ```
    Decimal(Decimal),

    /// Quoted string
    String(String),

    /// `datetime'…'`
    DateTime(NaiveDateTime),

    /// `POINT(x y)` or `POINT(x y z)`
    Point(Point),
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Null => DataType::Null,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Int32(_) => DataType::Int32,
            Literal::Int64(_) => DataType::Int64,
            Literal::Single(_) => DataType::Single,
            Literal::Double(_) => DataType::Double,
            Literal::Decimal(_) => DataType::Decimal,
            Literal::String(_) => DataType::String,
            Literal::DateTime(_) => DataType::DateTime,
            Literal::Point(_) => DataType::Point,
        }
    }

    /// Numeric literal as a double, used for point coordinates.
    pub fn as_f64(&self) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            Literal::Int32(n) => Some(f64::from(*n)),
            Literal::Int64(n) => Some(*n as f64),
            Literal::Single(n) => Some(f64::from(*n)),
            Literal::Double(n) => Some(*n),
            Literal::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Int32(n) => write!(f, "{}", n),
            Literal::Int64(n) => write!(f, "{}L", n),
            Literal::Single(n) => write!(f, "{:?}f", n),
            Literal::Double(n) => write!(f, "{:?}", n),
            Literal::Decimal(d) => write!(f, "{}m", d),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::DateTime(dt) => write!(f, "datetime'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Literal::Point(p) => write!(f, "{}", p),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse the text of a `datetime'…'` literal.
///
/// Accepts RFC 3339 (converted to UTC), ISO 8601 without offset, and a bare date at midnight.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_datetime_formats() {
        let dt = parse_datetime("2024-01-31T12:30:05").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 31));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (12, 30, 5));

        let utc = parse_datetime("2024-01-31T12:30:05+02:00").unwrap();
        assert_eq!(utc.hour(), 10);

        let midnight = parse_datetime("2024-02-29").unwrap();
        assert_eq!(midnight.hour(), 0);

        assert!(parse_datetime("not a date").is_err());
        assert!(parse_datetime("2023-02-29").is_err());
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Int64(42).to_string(), "42L");
        assert_eq!(Literal::Double(7.0).to_string(), "7.0");
        assert_eq!(Literal::Single(3.5).to_string(), "3.5f");
        assert_eq!(Literal::String("it's".into()).to_string(), "'it''s'");
        assert_eq!(Literal::Decimal(Decimal::new(1025, 2)).to_string(), "10.25m");
    }
}
