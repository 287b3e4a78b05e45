//! Entry points: compile filter text into a [`Predicate`].

use tracing::{debug, trace};

use crate::{
    builder::ExpressionBuilder,
    error::{ErrorKind, FilterError},
    evaluator::Predicate,
    functions::FunctionRegistry,
    lexer::{Lexer, Position},
    model::{AspectStore, ContentModel, DataType},
    parser::Parser,
    ast::Expr,
};

/// Maximum expression nesting accepted by default.
///
/// Each level of parentheses costs a dozen parser frames, and the deepest accepted
/// filter must still compile on a 2 MiB thread stack in an unoptimized build.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Deepest nesting before compilation is refused.
    ///
    /// The whole filter, every parenthesized group and function argument, and every
    /// unary operator open one level. Operator chains such as `a or b or c` do not.
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The collaborators a filter is compiled against.
///
/// All three are only read; one environment can serve any number of compilations.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub model: &'a dyn ContentModel,
    pub aspects: &'a dyn AspectStore,
    pub functions: &'a dyn FunctionRegistry,
}

impl<'a> Environment<'a> {
    pub fn new(
        model: &'a dyn ContentModel,
        aspects: &'a dyn AspectStore,
        functions: &'a dyn FunctionRegistry,
    ) -> Self {
        Environment {
            model,
            aspects,
            functions,
        }
    }
}

/// Parse and resolve `text` into an expression tree without the boolean check.
pub fn parse_filter(
    text: &str,
    env: &Environment<'_>,
    options: CompileOptions,
) -> Result<Expr, FilterError> {
    let lexer = Lexer::new(text);
    let mut parser = Parser::new(lexer, ExpressionBuilder::new(*env))?.with_max_depth(options.max_depth);
    parser.parse()
}

/// Compile a `$filter` body with default options.
///
/// Absent or blank input means "no filter" and yields `Ok(None)`.
///
/// # Examples
///
/// ```
/// use odata_filter::{compile, Environment, JsonContent, JsonSchema, StandardFunctions};
///
/// let schema = JsonSchema::default();
/// let functions = StandardFunctions::new();
/// let env = Environment::new(&schema, &schema, &functions);
///
/// let predicate = compile(Some("Index gt 3 and startswith(Name, 'A')"), &env)
///     .unwrap()
///     .unwrap();
///
/// let doc = serde_json::json!({ "Name": "Alpha", "Index": 5 });
/// let content = JsonContent::new(doc.as_object().unwrap());
/// assert!(predicate.evaluate(&content).unwrap());
///
/// assert!(compile(Some("  "), &env).unwrap().is_none());
/// ```
pub fn compile(text: Option<&str>, env: &Environment<'_>) -> Result<Option<Predicate>, FilterError> {
    compile_with(text, env, CompileOptions::default())
}

pub fn compile_with(
    text: Option<&str>,
    env: &Environment<'_>,
    options: CompileOptions,
) -> Result<Option<Predicate>, FilterError> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };

    debug!(filter = text, "compiling filter");
    let expr = match parse_filter(text, env, options) {
        Ok(expr) => expr,
        Err(e) => {
            debug!(error = %e, "filter compilation failed");
            return Err(e);
        }
    };

    let data_type = expr.data_type();
    if !DataType::Boolean.accepts(&data_type) {
        let source: Vec<char> = text.chars().collect();
        let start = Position {
            line: 1,
            column: 1,
            offset: 0,
        };
        return Err(FilterError::new(
            ErrorKind::Semantic,
            &source,
            start,
            format!("Filter must be a boolean expression, found {}.", data_type),
            None,
        ));
    }

    debug!("filter compiled");
    trace!(expr = %expr, "compiled filter");
    Ok(Some(Predicate::new(expr)))
}
