use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    ast::{Literal, Point},
    evaluator::EvalError,
    model::DataType,
};

/// A runtime value produced while evaluating a compiled filter.
///
/// This mirrors [`Literal`] and adds the shapes that only appear at runtime:
/// complex property values and the current content marker.
///
/// # Examples
///
/// ```
/// use odata_filter::Value;
/// use odata_filter::model::DataType;
///
/// let text = Value::String("2024-01-31".to_string());
/// let date = text.cast(&DataType::DateTime).unwrap();
/// assert!(matches!(date, Value::DateTime(_)));
///
/// assert_eq!(Value::Int32(7).cast(&DataType::Int64).unwrap(), Value::Int64(7));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    DateTime(NaiveDateTime),
    Point(Point),

    /// Complex property value navigable by name
    Object(BTreeMap<String, Value>),

    /// The content the predicate is evaluated against
    CurrentContent,
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Int32(n) => Value::Int32(*n),
            Literal::Int64(n) => Value::Int64(*n),
            Literal::Single(n) => Value::Single(*n),
            Literal::Double(n) => Value::Double(*n),
            Literal::Decimal(d) => Value::Decimal(*d),
            Literal::String(s) => Value::String(s.clone()),
            Literal::DateTime(dt) => Value::DateTime(*dt),
            Literal::Point(p) => Value::Point(*p),
        }
    }
}

/// Numeric operand after promotion to a common type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
}

impl Numeric {
    fn rank(self) -> u8 {
        match self {
            Numeric::Int32(_) => 0,
            Numeric::Int64(_) => 1,
            Numeric::Single(_) => 2,
            Numeric::Double(_) => 3,
            Numeric::Decimal(_) => 4,
        }
    }

    fn widen(self, rank: u8) -> Option<Numeric> {
        if self.rank() == rank {
            return Some(self);
        }
        let widened = match (self, rank) {
            (Numeric::Int32(n), 1) => Numeric::Int64(i64::from(n)),
            (Numeric::Int32(n), 2) => Numeric::Single(n as f32),
            (Numeric::Int32(n), 3) => Numeric::Double(f64::from(n)),
            (Numeric::Int32(n), 4) => Numeric::Decimal(Decimal::from(n)),
            (Numeric::Int64(n), 2) => Numeric::Single(n as f32),
            (Numeric::Int64(n), 3) => Numeric::Double(n as f64),
            (Numeric::Int64(n), 4) => Numeric::Decimal(Decimal::from(n)),
            (Numeric::Single(n), 3) => Numeric::Double(f64::from(n)),
            (Numeric::Single(n), 4) => Numeric::Decimal(Decimal::from_f32(n)?),
            (Numeric::Double(n), 4) => Numeric::Decimal(Decimal::from_f64(n)?),
            _ => return None,
        };
        Some(widened)
    }

    /// Bring both operands to the wider of their two types.
    pub(crate) fn promote(left: Numeric, right: Numeric) -> Option<(Numeric, Numeric)> {
        let rank = left.rank().max(right.rank());
        Some((left.widen(rank)?, right.widen(rank)?))
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Numeric::Int32(n) => Value::Int32(n),
            Numeric::Int64(n) => Value::Int64(n),
            Numeric::Single(n) => Value::Single(n),
            Numeric::Double(n) => Value::Double(n),
            Numeric::Decimal(d) => Value::Decimal(d),
        }
    }

    fn partial_cmp(self, other: Numeric) -> Option<Ordering> {
        match Numeric::promote(self, other)? {
            (Numeric::Int32(a), Numeric::Int32(b)) => Some(a.cmp(&b)),
            (Numeric::Int64(a), Numeric::Int64(b)) => Some(a.cmp(&b)),
            (Numeric::Single(a), Numeric::Single(b)) => a.partial_cmp(&b),
            (Numeric::Double(a), Numeric::Double(b)) => a.partial_cmp(&b),
            (Numeric::Decimal(a), Numeric::Decimal(b)) => Some(a.cmp(&b)),
            _ => None,
        }
    }
}

impl Value {
    /// Human-readable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Int32(_) => "int",
            Value::Int64(_) => "long",
            Value::Single(_) => "float",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Point(_) => "point",
            Value::Object(_) => "object",
            Value::CurrentContent => "content",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub(crate) fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Value::Int32(n) => Some(Numeric::Int32(*n)),
            Value::Int64(n) => Some(Numeric::Int64(*n)),
            Value::Single(n) => Some(Numeric::Single(*n)),
            Value::Double(n) => Some(Numeric::Double(*n)),
            Value::Decimal(d) => Some(Numeric::Decimal(*d)),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as double
    pub fn as_f64(&self) -> Option<f64> {
        match self.as_numeric()? {
            Numeric::Int32(n) => Some(f64::from(n)),
            Numeric::Int64(n) => Some(n as f64),
            Numeric::Single(n) => Some(f64::from(n)),
            Numeric::Double(n) => Some(n),
            Numeric::Decimal(d) => d.to_f64(),
        }
    }

    /// Get as 64-bit integer, rejecting fractions
    pub fn as_i64(&self) -> Option<i64> {
        match self.as_numeric()? {
            Numeric::Int32(n) => Some(i64::from(n)),
            Numeric::Int64(n) => Some(n),
            Numeric::Single(n) => whole_to_i64(f64::from(n)),
            Numeric::Double(n) => whole_to_i64(n),
            Numeric::Decimal(d) if d.is_integer() => d.to_i64(),
            _ => None,
        }
    }

    /// Equality as used by `eq`/`ne`: numbers compare by value across types,
    /// null equals only null, values of unrelated types are unequal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_numeric(), other.as_numeric()) {
            return a.partial_cmp(b) == Some(Ordering::Equal);
        }
        self == other
    }

    /// Ordering as used by `lt`/`gt`/`le`/`ge`.
    ///
    /// Returns `Ok(None)` when either side is null.
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, EvalError> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(None),
            (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
            (Value::DateTime(a), Value::DateTime(b)) => Ok(Some(a.cmp(b))),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Some(a.cmp(b))),
            (a, b) => match (a.as_numeric(), b.as_numeric()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(y)),
                _ => Err(EvalError::TypeError(format!(
                    "Cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                ))),
            },
        }
    }

    /// Convert to the declared type of a field.
    pub fn cast(&self, target: &DataType) -> Result<Value, EvalError> {
        let invalid = || EvalError::InvalidCast {
            from: self.type_name().to_string(),
            to: target.to_string(),
        };

        let value = match (self, target) {
            (Value::Null, _) => Value::Null,
            (_, DataType::Any | DataType::Object(_) | DataType::Content) => self.clone(),
            (Value::Boolean(b), DataType::Boolean) => Value::Boolean(*b),
            (Value::String(s), DataType::Boolean) => match s.to_ascii_lowercase().as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                _ => return Err(invalid()),
            },
            (Value::String(s), DataType::String) => Value::String(s.clone()),
            (Value::String(s), DataType::DateTime) => {
                Value::DateTime(crate::ast::literal::parse_datetime(s).map_err(|_| invalid())?)
            }
            (Value::String(s), DataType::Decimal) => {
                Value::Decimal(s.trim().parse::<Decimal>().map_err(|_| invalid())?)
            }
            (Value::DateTime(dt), DataType::DateTime) => Value::DateTime(*dt),
            (Value::Point(p), DataType::Point) => Value::Point(*p),
            (v, DataType::Int32) => {
                let n = v.as_i64().ok_or_else(invalid)?;
                Value::Int32(i32::try_from(n).map_err(|_| invalid())?)
            }
            (v, DataType::Int64) => Value::Int64(v.as_i64().ok_or_else(invalid)?),
            (v, DataType::Single) => Value::Single(v.as_f64().ok_or_else(invalid)? as f32),
            (v, DataType::Double) => Value::Double(v.as_f64().ok_or_else(invalid)?),
            (v, DataType::Decimal) => match v.as_numeric().ok_or_else(invalid)? {
                Numeric::Decimal(d) => Value::Decimal(d),
                n => n.widen(4).ok_or_else(invalid)?.into_value(),
            },
            _ => return Err(invalid()),
        };
        Ok(value)
    }
}

/// A whole float inside the `long` range; `as` alone would saturate.
fn whole_to_i64(n: f64) -> Option<i64> {
    let in_range = (-9.223_372_036_854_775_808e18..9.223_372_036_854_775_808e18).contains(&n);
    (in_range && n.fract() == 0.0).then_some(n as i64)
}
