use std::cmp::Ordering;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, MemberPath, MemberStep, UnaryOp},
    model::Content,
    value::{Numeric, Value},
};

/// Errors that can occur while evaluating a compiled filter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Member access on a value that has no members
    #[error("Access error: {0}")]
    AccessError(String),

    /// A field value does not convert to its declared type
    #[error("Cannot cast {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// A function rejected its arguments
    #[error("Function {name} failed: {message}")]
    Function { name: String, message: String },
}

/// A compiled filter: one boolean function of the current content.
///
/// # Examples
///
/// ```
/// use odata_filter::{compile, Environment, JsonContent, JsonSchema, StandardFunctions};
///
/// let schema = JsonSchema::default();
/// let functions = StandardFunctions::new();
/// let env = Environment::new(&schema, &schema, &functions);
/// let predicate = compile(Some("ContentType eq 'Folder'"), &env).unwrap().unwrap();
///
/// let folder = serde_json::json!({ "ContentType": { "Name": "Folder" } });
/// let file = serde_json::json!({ "ContentType": { "Name": "File" } });
/// assert!(predicate.evaluate(&JsonContent::new(folder.as_object().unwrap())).unwrap());
/// assert!(!predicate.evaluate(&JsonContent::new(file.as_object().unwrap())).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    root: Expr,
}

impl Predicate {
    pub fn new(root: Expr) -> Self {
        Predicate { root }
    }

    pub fn expr(&self) -> &Expr {
        &self.root
    }

    /// Evaluate against one content item. A null result counts as false.
    pub fn evaluate(&self, content: &dyn Content) -> Result<bool, EvalError> {
        match Evaluator::new(content).eval(&self.root)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(EvalError::TypeError(format!(
                "Filter evaluated to {} instead of bool",
                other.type_name()
            ))),
        }
    }
}

/// Evaluates expression trees against a single content item.
pub struct Evaluator<'c> {
    content: &'c dyn Content,
}

fn overflow(op: BinOp) -> EvalError {
    EvalError::Overflow(format!("'{}' result out of range", op))
}

impl<'c> Evaluator<'c> {
    pub fn new(content: &'c dyn Content) -> Self {
        Evaluator { content }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Constant(literal) => Ok(Value::from(literal)),
            Expr::CurrentContent => Ok(Value::CurrentContent),
            Expr::MemberAccess(path) => self.eval_member(path),
            Expr::UnaryOp { op, operand } => {
                let value = self.eval(operand)?;
                self.apply_unary(*op, value)
            }
            Expr::BinaryOp { op, left, right } => match op {
                BinOp::And | BinOp::Or => self.eval_logical(*op, left, right),
                _ => {
                    let left_val = self.eval(left)?;
                    let right_val = self.eval(right)?;
                    self.apply_binop(*op, &left_val, &right_val)
                }
            },
            Expr::Call { args, function, .. } => {
                let mut values = Vec::with_capacity(args.len());
                for (arg, param) in args.iter().zip(&function.params) {
                    values.push(self.eval(arg)?.cast(param)?);
                }
                function.call(&values, self.content)
            }
        }
    }

    fn eval_member(&self, path: &MemberPath) -> Result<Value, EvalError> {
        if let Some(type_name) = &path.type_name
            && !self.content.is_of(type_name)
        {
            return Ok(Value::Null);
        }

        let mut current: Option<Value> = None;
        for step in &path.steps {
            let raw = match (&current, step) {
                (None, MemberStep::Property(name)) => self.content.property(name),
                (None, MemberStep::Field { name, .. }) => self.content.field(name),
                (Some(Value::Object(map)), step) => map.get(step.name()).cloned(),
                (Some(Value::Null), _) => return Ok(Value::Null),
                (Some(other), step) => {
                    return Err(EvalError::AccessError(format!(
                        "Cannot access '{}' on {}",
                        step.name(),
                        other.type_name()
                    )));
                }
            };
            let value = raw.unwrap_or(Value::Null);
            current = Some(match step {
                MemberStep::Field { data_type, .. } => value.cast(data_type)?,
                MemberStep::Property(_) => value,
            });
        }
        match current {
            Some(value) => value.cast(&path.data_type),
            None => Ok(Value::CurrentContent),
        }
    }

    /// Short-circuit `and`/`or`, walking a chain of the same operator down its right spine.
    fn eval_logical(&self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        let (mut left, mut right) = (left, right);
        loop {
            let left_val = self.truth(self.eval(left)?, op)?;
            match (op, left_val) {
                (BinOp::And, false) => return Ok(Value::Boolean(false)),
                (BinOp::Or, true) => return Ok(Value::Boolean(true)),
                _ => {}
            }
            match right {
                Expr::BinaryOp {
                    op: next,
                    left: next_left,
                    right: next_right,
                } if *next == op => {
                    left = next_left.as_ref();
                    right = next_right.as_ref();
                }
                _ => return Ok(Value::Boolean(self.truth(self.eval(right)?, op)?)),
            }
        }
    }

    fn truth(&self, value: Value, op: BinOp) -> Result<bool, EvalError> {
        match value {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(EvalError::TypeError(format!(
                "'{}' requires bool operands, got {}",
                op,
                other.type_name()
            ))),
        }
    }

    fn apply_unary(&self, op: UnaryOp, value: Value) -> Result<Value, EvalError> {
        match (op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (UnaryOp::Plus, v) if v.as_numeric().is_some() => Ok(v),
            (UnaryOp::Negate, v) => match v.as_numeric() {
                Some(Numeric::Int32(n)) => n.checked_neg().map(Value::Int32).ok_or_else(|| {
                    EvalError::Overflow("negation result out of range".to_string())
                }),
                Some(Numeric::Int64(n)) => n.checked_neg().map(Value::Int64).ok_or_else(|| {
                    EvalError::Overflow("negation result out of range".to_string())
                }),
                Some(Numeric::Single(n)) => Ok(Value::Single(-n)),
                Some(Numeric::Double(n)) => Ok(Value::Double(-n)),
                Some(Numeric::Decimal(d)) => Ok(Value::Decimal(-d)),
                None => Err(EvalError::TypeError(format!(
                    "Cannot negate {}",
                    v.type_name()
                ))),
            },
            (op, v) => Err(EvalError::TypeError(format!(
                "Operator {:?} cannot be applied to {}",
                op,
                v.type_name()
            ))),
        }
    }

    fn apply_binop(&self, op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match op {
            BinOp::Equal => Ok(Value::Boolean(left.loose_eq(right))),
            BinOp::NotEqual => Ok(Value::Boolean(!left.loose_eq(right))),
            BinOp::LessThan => self.apply_ordering(left, right, Ordering::is_lt),
            BinOp::GreaterThan => self.apply_ordering(left, right, Ordering::is_gt),
            BinOp::LessEqual => self.apply_ordering(left, right, Ordering::is_le),
            BinOp::GreaterEqual => self.apply_ordering(left, right, Ordering::is_ge),
            BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
                self.apply_arithmetic(op, left, right)
            }
            BinOp::And | BinOp::Or => unreachable!("logical operators are evaluated lazily"),
        }
    }

    fn apply_ordering(
        &self,
        left: &Value,
        right: &Value,
        test: fn(Ordering) -> bool,
    ) -> Result<Value, EvalError> {
        Ok(Value::Boolean(left.compare(right)?.is_some_and(test)))
    }

    fn apply_arithmetic(&self, op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        let (Some(a), Some(b)) = (left.as_numeric(), right.as_numeric()) else {
            return Err(EvalError::TypeError(format!(
                "Cannot apply '{}' to {} and {}",
                op,
                left.type_name(),
                right.type_name()
            )));
        };
        let Some(operands) = Numeric::promote(a, b) else {
            return Err(EvalError::TypeError(format!(
                "Cannot combine {} and {} in '{}'",
                left.type_name(),
                right.type_name(),
                op
            )));
        };

        let result = match operands {
            (Numeric::Int32(a), Numeric::Int32(b)) => Numeric::Int32(int_op(op, a, b)?),
            (Numeric::Int64(a), Numeric::Int64(b)) => Numeric::Int64(int_op(op, a, b)?),
            (Numeric::Single(a), Numeric::Single(b)) => Numeric::Single(match op {
                BinOp::Add => a + b,
                BinOp::Subtract => a - b,
                BinOp::Multiply => a * b,
                BinOp::Divide => a / b,
                _ => a % b,
            }),
            (Numeric::Double(a), Numeric::Double(b)) => Numeric::Double(match op {
                BinOp::Add => a + b,
                BinOp::Subtract => a - b,
                BinOp::Multiply => a * b,
                BinOp::Divide => a / b,
                _ => a % b,
            }),
            (Numeric::Decimal(a), Numeric::Decimal(b)) => Numeric::Decimal(decimal_op(op, a, b)?),
            _ => unreachable!("promote returns operands of one kind"),
        };
        Ok(result.into_value())
    }
}

/// Checked integer arithmetic shared by `int` and `long`.
fn int_op<T>(op: BinOp, a: T, b: T) -> Result<T, EvalError>
where
    T: num_like::CheckedInt,
{
    if matches!(op, BinOp::Divide | BinOp::Modulo) && b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result.ok_or_else(|| overflow(op))
}

fn decimal_op(op: BinOp, a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    if matches!(op, BinOp::Divide | BinOp::Modulo) && b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result.ok_or_else(|| overflow(op))
}

mod num_like {
    pub trait CheckedInt: Copy {
        fn is_zero(self) -> bool;
        fn checked_add(self, other: Self) -> Option<Self>;
        fn checked_sub(self, other: Self) -> Option<Self>;
        fn checked_mul(self, other: Self) -> Option<Self>;
        fn checked_div(self, other: Self) -> Option<Self>;
        fn checked_rem(self, other: Self) -> Option<Self>;
    }

    macro_rules! impl_checked_int {
        ($($t:ty),*) => {$(
            impl CheckedInt for $t {
                fn is_zero(self) -> bool { self == 0 }
                fn checked_add(self, other: Self) -> Option<Self> { <$t>::checked_add(self, other) }
                fn checked_sub(self, other: Self) -> Option<Self> { <$t>::checked_sub(self, other) }
                fn checked_mul(self, other: Self) -> Option<Self> { <$t>::checked_mul(self, other) }
                fn checked_div(self, other: Self) -> Option<Self> { <$t>::checked_div(self, other) }
                fn checked_rem(self, other: Self) -> Option<Self> { <$t>::checked_rem(self, other) }
            }
        )*};
    }

    impl_checked_int!(i32, i64);
}
