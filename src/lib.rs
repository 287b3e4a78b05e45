pub mod ast;
pub mod builder;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod functions;
pub mod json;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, Literal, Token, UnaryOp};
pub use builder::ExpressionBuilder;
pub use error::{BuildError, ErrorKind, FilterError};
pub use evaluator::{EvalError, Evaluator, Predicate};
pub use filter::{CompileOptions, Environment, compile, compile_with, parse_filter};
pub use functions::{Function, FunctionRegistry, StandardFunctions};
pub use json::{JsonContent, JsonSchema};
pub use lexer::{Lexer, Position};
pub use model::{AspectStore, Content, ContentModel, DataType};
pub use parser::Parser;
pub use value::Value;
