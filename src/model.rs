//! Interfaces to the content model a filter is compiled and evaluated against.
//!
//! Compilation only needs the schema side ([`ContentModel`], [`AspectStore`]); evaluation
//! needs a [`Content`] instance. Hosts implement these traits; [`crate::json`] ships a
//! configuration-driven implementation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Declared type of a field, property or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    DateTime,
    Point,
    /// The content item itself
    Content,
    /// Type of the `null` literal
    Null,
    /// Statically unknown
    Any,
    /// Named complex type navigable by static properties
    Object(String),
}

impl DataType {
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Int32 => Some(0),
            DataType::Int64 => Some(1),
            DataType::Single => Some(2),
            DataType::Double => Some(3),
            DataType::Decimal => Some(4),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Whether a value of type `actual` can be passed where `self` is expected.
    pub fn accepts(&self, actual: &DataType) -> bool {
        if self == actual || *self == DataType::Any {
            return true;
        }
        match (self, actual) {
            (_, DataType::Null | DataType::Any) => true,
            (DataType::Int64, DataType::Int32) => true,
            (DataType::Single, DataType::Int32 | DataType::Int64) => true,
            (DataType::Double, DataType::Int32 | DataType::Int64 | DataType::Single) => true,
            (DataType::Decimal, DataType::Int32 | DataType::Int64) => true,
            _ => false,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, DataType::Null | DataType::Any)
    }

    /// Result type of an arithmetic operation, `None` when an operand can never be a number.
    ///
    /// A `null` operand takes the other side's type; an `any` operand makes the result `any`.
    pub fn promote(left: &DataType, right: &DataType) -> Option<DataType> {
        match (left, right) {
            (DataType::Any, other) | (other, DataType::Any)
                if other.is_numeric() || other.is_unknown() =>
            {
                Some(DataType::Any)
            }
            (DataType::Null, other) | (other, DataType::Null)
                if other.is_numeric() || other.is_unknown() =>
            {
                Some(other.clone())
            }
            _ => match (left.numeric_rank()?, right.numeric_rank()?) {
                (l, r) if l >= r => Some(left.clone()),
                _ => Some(right.clone()),
            },
        }
    }

    /// Whether `eq`/`ne` between the two types can ever hold.
    pub fn comparable(left: &DataType, right: &DataType) -> bool {
        left.is_unknown()
            || right.is_unknown()
            || left == right
            || (left.is_numeric() && right.is_numeric())
    }

    /// Whether values of this type have an order for `lt`/`gt`/`le`/`ge`.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric()
            || self.is_unknown()
            || matches!(self, DataType::Boolean | DataType::String | DataType::DateTime)
    }

    /// Name used to look up static members of this type.
    pub fn type_name(&self) -> String {
        match self {
            DataType::Object(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "bool",
            DataType::Int32 => "int",
            DataType::Int64 => "long",
            DataType::Single => "float",
            DataType::Double => "double",
            DataType::Decimal => "decimal",
            DataType::String => "string",
            DataType::DateTime => "datetime",
            DataType::Point => "point",
            DataType::Content => "content",
            DataType::Null => "null",
            DataType::Any => "any",
            DataType::Object(name) => name,
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data_type = match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => DataType::Boolean,
            "int" | "int32" | "integer" => DataType::Int32,
            "long" | "int64" => DataType::Int64,
            "float" | "single" => DataType::Single,
            "double" | "number" => DataType::Double,
            "decimal" | "currency" => DataType::Decimal,
            "string" | "text" => DataType::String,
            "datetime" | "date" => DataType::DateTime,
            "point" => DataType::Point,
            "content" | "reference" => DataType::Content,
            "any" => DataType::Any,
            "" => return Err("empty type name".to_string()),
            _ if s.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_') => {
                DataType::Object(s.to_string())
            }
            _ => return Err(format!("invalid type name: {}", s)),
        };
        Ok(data_type)
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}

/// Schema side of the content model, consulted while compiling member paths.
pub trait ContentModel {
    /// Type of the current content (where bare member paths start).
    fn root_type(&self) -> &str;

    /// Resolve a type qualifier such as `Sys.Folder`.
    fn resolve_type(&self, name: &str) -> Option<String>;

    /// Static member `name` of `type_name`.
    fn static_member(&self, type_name: &str, name: &str) -> Option<DataType>;

    /// Declared type of the dynamic field `name` on `type_name`, if declared.
    fn dynamic_field_type(&self, type_name: &str, name: &str) -> Option<DataType>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSetting {
    pub name: String,
    pub data_type: DataType,
}

/// A named bag of extra fields attachable to content.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectDefinition {
    pub name: String,
    pub field_settings: Vec<FieldSetting>,
}

impl AspectDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldSetting> {
        self.field_settings.iter().find(|f| f.name == name)
    }
}

pub trait AspectStore {
    fn load_aspect_by_name(&self, name: &str) -> Option<AspectDefinition>;
}

/// An aspect store with no aspects.
pub struct NoAspects;

impl AspectStore for NoAspects {
    fn load_aspect_by_name(&self, _name: &str) -> Option<AspectDefinition> {
        None
    }
}

/// A content item a compiled predicate is evaluated against.
pub trait Content {
    fn type_name(&self) -> &str;

    /// Whether the content is of the given (possibly namespace-qualified) type.
    fn is_of(&self, type_name: &str) -> bool {
        let own = self.type_name();
        type_name.eq_ignore_ascii_case(own)
            || type_name
                .rsplit_once('.')
                .is_some_and(|(_, short)| short.eq_ignore_ascii_case(own))
    }

    /// Value of a static property.
    fn property(&self, name: &str) -> Option<Value>;

    /// Raw value of a dynamic or aspect field (`Aspect.Field`).
    fn field(&self, name: &str) -> Option<Value>;
}
