//! The global function registry.
//!
//! The parser only accepts names from [`FUNCTION_NAMES`] as function calls; the
//! registry then picks the overload matching the static argument types.
//! [`StandardFunctions`] implements the whole catalogue plus the `Point` constructor
//! used by `POINT(…)` literals.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_decimal::Decimal;

use crate::{
    ast::Point,
    evaluator::EvalError,
    model::{Content, DataType},
    value::Value,
};

/// Names the parser recognises as function calls (compared lower-cased).
pub const FUNCTION_NAMES: &[&str] = &[
    // String functions
    "substringof",
    "endswith",
    "startswith",
    "length",
    "indexof",
    "replace",
    "substring",
    "tolower",
    "toupper",
    "trim",
    "concat",
    // Date functions
    "day",
    "hour",
    "minute",
    "month",
    "second",
    "year",
    // Math functions
    "round",
    "floor",
    "ceiling",
    // Type functions
    "isof",
];

pub fn is_function_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    FUNCTION_NAMES.contains(&lower.as_str())
}

pub type Callable = Arc<dyn Fn(&[Value], &dyn Content) -> Result<Value, EvalError> + Send + Sync>;

/// A resolved function overload.
#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<DataType>,
    pub returns: DataType,
    call: Callable,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        params: Vec<DataType>,
        returns: DataType,
        call: impl Fn(&[Value], &dyn Content) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Function {
            name: name.into(),
            params,
            returns,
            call: Arc::new(call),
        }
    }

    /// Whether arguments of the given static types can be passed to this overload.
    pub fn accepts(&self, arg_types: &[DataType]) -> bool {
        self.params.len() == arg_types.len()
            && self.params.iter().zip(arg_types).all(|(p, a)| p.accepts(a))
    }

    fn is_exact(&self, arg_types: &[DataType]) -> bool {
        self.params.as_slice() == arg_types
    }

    pub fn call(&self, args: &[Value], content: &dyn Content) -> Result<Value, EvalError> {
        (self.call)(args, content)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params && self.returns == other.returns
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        write!(f, "{}({}) -> {}", self.name, params.join(", "), self.returns)
    }
}

pub trait FunctionRegistry {
    /// Find the overload of `name` callable with arguments of `arg_types`.
    fn resolve(&self, name: &str, arg_types: &[DataType]) -> Option<Function>;
}

/// Registry with the standard string, date, math and type functions.
///
/// # Examples
///
/// ```
/// use odata_filter::functions::{FunctionRegistry, StandardFunctions};
/// use odata_filter::model::DataType;
///
/// let functions = StandardFunctions::new();
/// let f = functions
///     .resolve("startswith", &[DataType::String, DataType::String])
///     .unwrap();
/// assert_eq!(f.returns, DataType::Boolean);
/// assert!(functions.resolve("startswith", &[DataType::Int32]).is_none());
/// ```
pub struct StandardFunctions {
    functions: Vec<Function>,
}

impl Default for StandardFunctions {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry for StandardFunctions {
    fn resolve(&self, name: &str, arg_types: &[DataType]) -> Option<Function> {
        let candidates = || {
            self.functions
                .iter()
                .filter(|f| f.name.eq_ignore_ascii_case(name))
        };
        candidates()
            .find(|f| f.is_exact(arg_types))
            .or_else(|| candidates().find(|f| f.accepts(arg_types)))
            .cloned()
    }
}

/// Null in, null out for string functions.
fn string_arg<'v>(name: &str, args: &'v [Value], index: usize) -> Result<Option<&'v str>, EvalError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(EvalError::Function {
            name: name.to_string(),
            message: format!("argument {} must be a string, got {}", index + 1, other.type_name()),
        }),
    }
}

fn int_arg(name: &str, args: &[Value], index: usize) -> Result<Option<i64>, EvalError> {
    match args.get(index) {
        Some(Value::Null) | None => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| EvalError::Function {
            name: name.to_string(),
            message: format!("argument {} must be an integer, got {}", index + 1, v.type_name()),
        }),
    }
}

/// Character-based substring; positions past the end are an error like in .NET.
fn substring(s: &str, start: i64, length: Option<i64>) -> Result<String, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    let out_of_range = || EvalError::Function {
        name: "substring".to_string(),
        message: format!("index {} out of range for string of length {}", start, chars.len()),
    };
    let start = usize::try_from(start).map_err(|_| out_of_range())?;
    if start > chars.len() {
        return Err(out_of_range());
    }
    let end = match length {
        Some(len) => {
            let len = usize::try_from(len).map_err(|_| out_of_range())?;
            start.checked_add(len).filter(|e| *e <= chars.len()).ok_or_else(out_of_range)?
        }
        None => chars.len(),
    };
    Ok(chars[start..end].iter().collect())
}

impl StandardFunctions {
    pub fn new() -> Self {
        let mut registry = StandardFunctions { functions: Vec::new() };
        registry.register_string_functions();
        registry.register_date_functions();
        registry.register_math_functions();
        registry.register_type_functions();
        registry
    }

    pub fn register(&mut self, function: Function) {
        self.functions.push(function);
    }

    fn string_predicate(&mut self, name: &'static str, test: fn(&str, &str) -> bool) {
        self.register(Function::new(
            name,
            vec![DataType::String, DataType::String],
            DataType::Boolean,
            move |args, _| {
                Ok(match (string_arg(name, args, 0)?, string_arg(name, args, 1)?) {
                    (Some(a), Some(b)) => Value::Boolean(test(a, b)),
                    _ => Value::Null,
                })
            },
        ));
    }

    fn string_map(&mut self, name: &'static str, map: fn(&str) -> String) {
        self.register(Function::new(
            name,
            vec![DataType::String],
            DataType::String,
            move |args, _| {
                Ok(string_arg(name, args, 0)?
                    .map(|s| Value::String(map(s)))
                    .unwrap_or(Value::Null))
            },
        ));
    }

    fn register_string_functions(&mut self) {
        // substringof(needle, haystack)
        self.string_predicate("substringof", |needle, haystack| haystack.contains(needle));
        self.string_predicate("endswith", |s, suffix| s.ends_with(suffix));
        self.string_predicate("startswith", |s, prefix| s.starts_with(prefix));

        self.register(Function::new(
            "length",
            vec![DataType::String],
            DataType::Int32,
            |args, _| {
                Ok(match string_arg("length", args, 0)? {
                    Some(s) => Value::Int32(i32::try_from(s.chars().count()).unwrap_or(i32::MAX)),
                    None => Value::Null,
                })
            },
        ));

        self.register(Function::new(
            "indexof",
            vec![DataType::String, DataType::String],
            DataType::Int32,
            |args, _| {
                Ok(
                    match (string_arg("indexof", args, 0)?, string_arg("indexof", args, 1)?) {
                        (Some(s), Some(search)) => Value::Int32(
                            s.find(search)
                                .map(|byte| s[..byte].chars().count() as i32)
                                .unwrap_or(-1),
                        ),
                        _ => Value::Null,
                    },
                )
            },
        ));

        self.register(Function::new(
            "replace",
            vec![DataType::String, DataType::String, DataType::String],
            DataType::String,
            |args, _| {
                let s = string_arg("replace", args, 0)?;
                let from = string_arg("replace", args, 1)?;
                let to = string_arg("replace", args, 2)?.unwrap_or("");
                Ok(match (s, from) {
                    (Some(s), Some(from)) if !from.is_empty() => Value::String(s.replace(from, to)),
                    (Some(s), _) => Value::String(s.to_string()),
                    _ => Value::Null,
                })
            },
        ));

        self.register(Function::new(
            "substring",
            vec![DataType::String, DataType::Int32],
            DataType::String,
            |args, _| {
                match (string_arg("substring", args, 0)?, int_arg("substring", args, 1)?) {
                    (Some(s), Some(start)) => Ok(Value::String(substring(s, start, None)?)),
                    _ => Ok(Value::Null),
                }
            },
        ));

        self.register(Function::new(
            "substring",
            vec![DataType::String, DataType::Int32, DataType::Int32],
            DataType::String,
            |args, _| {
                match (
                    string_arg("substring", args, 0)?,
                    int_arg("substring", args, 1)?,
                    int_arg("substring", args, 2)?,
                ) {
                    (Some(s), Some(start), Some(len)) => {
                        Ok(Value::String(substring(s, start, Some(len))?))
                    }
                    _ => Ok(Value::Null),
                }
            },
        ));

        self.string_map("tolower", |s| s.to_lowercase());
        self.string_map("toupper", |s| s.to_uppercase());
        self.string_map("trim", |s| s.trim().to_string());

        self.register(Function::new(
            "concat",
            vec![DataType::String, DataType::String],
            DataType::String,
            |args, _| {
                let a = string_arg("concat", args, 0)?.unwrap_or("");
                let b = string_arg("concat", args, 1)?.unwrap_or("");
                Ok(Value::String(format!("{}{}", a, b)))
            },
        ));
    }

    fn register_date_functions(&mut self) {
        let parts: [(&'static str, fn(&NaiveDateTime) -> u32); 6] = [
            ("day", |dt: &NaiveDateTime| dt.day()),
            ("hour", |dt: &NaiveDateTime| dt.hour()),
            ("minute", |dt: &NaiveDateTime| dt.minute()),
            ("month", |dt: &NaiveDateTime| dt.month()),
            ("second", |dt: &NaiveDateTime| dt.second()),
            ("year", |dt: &NaiveDateTime| dt.year() as u32),
        ];

        for (name, part) in parts {
            self.register(Function::new(
                name,
                vec![DataType::DateTime],
                DataType::Int32,
                move |args, _| match args.first() {
                    Some(Value::DateTime(dt)) => Ok(Value::Int32(part(dt) as i32)),
                    Some(Value::Null) | None => Ok(Value::Null),
                    Some(other) => Err(EvalError::Function {
                        name: name.to_string(),
                        message: format!("expected datetime, got {}", other.type_name()),
                    }),
                },
            ));
        }
    }

    fn register_math_functions(&mut self) {
        let ops: [(&'static str, fn(f64) -> f64, fn(Decimal) -> Decimal); 3] = [
            ("round", f64::round_ties_even, |d: Decimal| d.round()),
            ("floor", f64::floor, |d: Decimal| d.floor()),
            ("ceiling", f64::ceil, |d: Decimal| d.ceil()),
        ];

        for (name, double_op, decimal_op) in ops {
            self.register(Function::new(
                name,
                vec![DataType::Double],
                DataType::Double,
                move |args, _| match args.first() {
                    Some(Value::Null) | None => Ok(Value::Null),
                    Some(v) => v.as_f64().map(|n| Value::Double(double_op(n))).ok_or_else(|| {
                        EvalError::Function {
                            name: name.to_string(),
                            message: format!("expected number, got {}", v.type_name()),
                        }
                    }),
                },
            ));
            self.register(Function::new(
                name,
                vec![DataType::Decimal],
                DataType::Decimal,
                move |args, _| match args.first() {
                    Some(Value::Decimal(d)) => Ok(Value::Decimal(decimal_op(*d))),
                    Some(Value::Null) | None => Ok(Value::Null),
                    Some(other) => Err(EvalError::Function {
                        name: name.to_string(),
                        message: format!("expected decimal, got {}", other.type_name()),
                    }),
                },
            ));
        }
    }

    fn register_type_functions(&mut self) {
        // isof('Type') is compiled as isof($it, 'Type')
        self.register(Function::new(
            "isof",
            vec![DataType::Content, DataType::String],
            DataType::Boolean,
            |args, content| match string_arg("isof", args, 1)? {
                Some(type_name) => Ok(Value::Boolean(content.is_of(type_name))),
                None => Ok(Value::Boolean(false)),
            },
        ));

        let point = |args: &[Value], _: &dyn Content| -> Result<Value, EvalError> {
            let coordinate = |index: usize| {
                args.get(index)
                    .and_then(Value::as_f64)
                    .ok_or_else(|| EvalError::Function {
                        name: "Point".to_string(),
                        message: format!("coordinate {} must be a number", index + 1),
                    })
            };
            let z = if args.len() > 2 { Some(coordinate(2)?) } else { None };
            Ok(Value::Point(Point {
                x: coordinate(0)?,
                y: coordinate(1)?,
                z,
            }))
        };
        self.register(Function::new(
            "Point",
            vec![DataType::Double, DataType::Double],
            DataType::Point,
            point,
        ));
        self.register(Function::new(
            "Point",
            vec![DataType::Double, DataType::Double, DataType::Double],
            DataType::Point,
            point,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Folder;

    impl Content for Folder {
        fn type_name(&self) -> &str {
            "Folder"
        }
        fn property(&self, _name: &str) -> Option<Value> {
            None
        }
        fn field(&self, _name: &str) -> Option<Value> {
            None
        }
    }

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let types: Vec<DataType> = args
            .iter()
            .map(|v| match v {
                Value::String(_) => DataType::String,
                Value::Int32(_) => DataType::Int32,
                Value::Double(_) => DataType::Double,
                Value::Decimal(_) => DataType::Decimal,
                Value::DateTime(_) => DataType::DateTime,
                Value::CurrentContent => DataType::Content,
                _ => DataType::Null,
            })
            .collect();
        let function = StandardFunctions::new()
            .resolve(name, &types)
            .unwrap_or_else(|| panic!("no overload for {}", name));
        function.call(&args, &Folder)
    }

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("substringof", vec![s("ell"), s("hello")]).unwrap(), Value::Boolean(true));
        assert_eq!(call("startswith", vec![s("hello"), s("he")]).unwrap(), Value::Boolean(true));
        assert_eq!(call("endswith", vec![s("hello"), s("he")]).unwrap(), Value::Boolean(false));
        assert_eq!(call("length", vec![s("héllo")]).unwrap(), Value::Int32(5));
        assert_eq!(call("indexof", vec![s("héllo"), s("l")]).unwrap(), Value::Int32(2));
        assert_eq!(call("indexof", vec![s("abc"), s("z")]).unwrap(), Value::Int32(-1));
        assert_eq!(call("replace", vec![s("a-b-c"), s("-"), s("+")]).unwrap(), s("a+b+c"));
        assert_eq!(call("substring", vec![s("hello"), Value::Int32(1)]).unwrap(), s("ello"));
        assert_eq!(
            call("substring", vec![s("hello"), Value::Int32(1), Value::Int32(3)]).unwrap(),
            s("ell")
        );
        assert!(call("substring", vec![s("hello"), Value::Int32(9)]).is_err());
        assert_eq!(call("toupper", vec![s("abc")]).unwrap(), s("ABC"));
        assert_eq!(call("trim", vec![s("  x ")]).unwrap(), s("x"));
        assert_eq!(call("concat", vec![s("a"), s("b")]).unwrap(), s("ab"));
        assert_eq!(call("tolower", vec![Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_math_functions_use_bankers_rounding() {
        assert_eq!(call("round", vec![Value::Double(2.5)]).unwrap(), Value::Double(2.0));
        assert_eq!(call("round", vec![Value::Double(3.5)]).unwrap(), Value::Double(4.0));
        assert_eq!(
            call("round", vec![Value::Decimal(Decimal::new(25, 1))]).unwrap(),
            Value::Decimal(Decimal::new(2, 0))
        );
        assert_eq!(call("floor", vec![Value::Double(-1.5)]).unwrap(), Value::Double(-2.0));
        assert_eq!(call("ceiling", vec![Value::Double(1.2)]).unwrap(), Value::Double(2.0));
    }

    #[test]
    fn test_date_functions() {
        let dt = crate::ast::literal::parse_datetime("2024-03-09T17:45:30").unwrap();
        assert_eq!(call("year", vec![Value::DateTime(dt)]).unwrap(), Value::Int32(2024));
        assert_eq!(call("month", vec![Value::DateTime(dt)]).unwrap(), Value::Int32(3));
        assert_eq!(call("second", vec![Value::DateTime(dt)]).unwrap(), Value::Int32(30));
    }

    #[test]
    fn test_isof_uses_current_content() {
        assert_eq!(
            call("isof", vec![Value::CurrentContent, s("Folder")]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            call("isof", vec![Value::CurrentContent, s("File")]).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_overload_resolution() {
        let functions = StandardFunctions::new();
        let round = functions.resolve("round", &[DataType::Int32]).unwrap();
        assert_eq!(round.returns, DataType::Double);
        let round = functions.resolve("round", &[DataType::Decimal]).unwrap();
        assert_eq!(round.returns, DataType::Decimal);
        assert!(functions.resolve("point", &[DataType::Int32, DataType::Int32]).is_some());
        assert!(functions.resolve("length", &[DataType::Int32]).is_none());
    }

    #[test]
    fn test_is_function_name_ignores_case() {
        assert!(is_function_name("StartsWith"));
        assert!(!is_function_name("Name"));
    }
}
