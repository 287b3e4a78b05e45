use std::fmt;

use crate::ast::{BinOp, Literal, UnaryOp};
use crate::functions::Function;
use crate::model::DataType;

/// Compiled filter expression.
///
/// Nodes are built bottom-up by the parser and never change afterwards. Every node
/// carries enough type information to answer [`Expr::data_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'hello'
    /// datetime'2024-01-31'
    /// ```
    Constant(Literal),

    /// The content the predicate is evaluated against
    ///
    /// Never written in a filter; `isof(…)` receives it as an implicit first argument.
    CurrentContent,

    /// Resolved member path
    ///
    /// # Examples
    /// ```text
    /// Index
    /// ContentType/Name
    /// Seo/Keywords
    /// ```
    MemberAccess(MemberPath),

    /// Unary operation (`not`, `-`, `+`)
    UnaryOp { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation (comparison, arithmetic, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Call of a resolved global function
    ///
    /// # Examples
    /// ```text
    /// startswith(Name, 'A')
    /// year(CreationDate)
    /// ```
    Call {
        name: String,
        args: Vec<Expr>,
        function: Function,
    },
}

impl Expr {
    /// Static type of the value this node evaluates to.
    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Constant(literal) => literal.data_type(),
            Expr::CurrentContent => DataType::Content,
            Expr::MemberAccess(path) => path.data_type.clone(),
            Expr::UnaryOp { op: UnaryOp::Not, .. } => DataType::Boolean,
            Expr::UnaryOp { operand, .. } => operand.data_type(),
            Expr::BinaryOp { op, left, right } => {
                if op.is_comparison() || op.is_logical() {
                    DataType::Boolean
                } else {
                    DataType::promote(&left.data_type(), &right.data_type())
                        .unwrap_or(DataType::Any)
                }
            }
            Expr::Call { function, .. } => function.returns.clone(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(literal) => write!(f, "{}", literal),
            Expr::CurrentContent => write!(f, "$it"),
            Expr::MemberAccess(path) => write!(f, "{}", path),
            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "(not {})", operand),
                UnaryOp::Negate => write!(f, "-{}", operand),
                UnaryOp::Plus => write!(f, "+{}", operand),
            },
            Expr::BinaryOp { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One resolved step of a member path.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberStep {
    /// Static property of the current type
    Property(String),

    /// Indexed field access cast to the declared type
    ///
    /// Aspect fields use the qualified name `Aspect.Field`.
    Field { name: String, data_type: DataType },
}

impl MemberStep {
    pub fn name(&self) -> &str {
        match self {
            MemberStep::Property(name) => name,
            MemberStep::Field { name, .. } => name,
        }
    }
}

/// A member path resolved against the content model.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPath {
    /// Type qualifier (`Namespace.Type/…`), if any
    pub type_name: Option<String>,
    /// The names as written, after `ContentType` expansion
    pub names: Vec<String>,
    pub steps: Vec<MemberStep>,
    pub data_type: DataType,
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(type_name) = &self.type_name {
            write!(f, "{}/", type_name)?;
        }
        write!(f, "{}", self.names.join("/"))
    }
}
