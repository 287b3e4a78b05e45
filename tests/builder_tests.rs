// tests/builder_tests.rs

use odata_filter::ast::{Expr, Literal, MemberStep};
use odata_filter::builder::ExpressionBuilder;
use odata_filter::functions::Function;
use odata_filter::model::{DataType, NoAspects};
use odata_filter::{
    BuildError, CompileOptions, Environment, ErrorKind, FilterError, FunctionRegistry, JsonSchema,
    StandardFunctions, compile, compile_with, parse_filter,
};

fn schema() -> JsonSchema {
    JsonSchema::default()
        .with_field("Price", DataType::Decimal)
        .with_aspect("Review", [("Rating", DataType::Int32), ("Note", DataType::String)])
}

fn parse(text: &str) -> Result<Expr, FilterError> {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);
    parse_filter(text, &env, CompileOptions::default())
}

fn steps(text: &str) -> (Vec<MemberStep>, DataType) {
    match parse(text).unwrap() {
        Expr::MemberAccess(path) => (path.steps, path.data_type),
        other => panic!("Expected member access, got {}", other),
    }
}

/// A registry that knows no functions at all.
struct NoFunctions;

impl FunctionRegistry for NoFunctions {
    fn resolve(&self, _name: &str, _arg_types: &[DataType]) -> Option<Function> {
        None
    }
}

// ============================================================================
// Member resolution
// ============================================================================

#[test]
fn test_static_properties() {
    let (steps, data_type) = steps("ContentType/Name");
    assert_eq!(
        steps,
        vec![
            MemberStep::Property("ContentType".to_string()),
            MemberStep::Property("Name".to_string()),
        ]
    );
    assert_eq!(data_type, DataType::String);
}

#[test]
fn test_dynamic_field() {
    let (steps, data_type) = steps("Price");
    assert_eq!(
        steps,
        vec![MemberStep::Field {
            name: "Price".to_string(),
            data_type: DataType::Decimal,
        }]
    );
    assert_eq!(data_type, DataType::Decimal);
}

#[test]
fn test_aspect_field_is_qualified() {
    let (steps, data_type) = steps("Review/Rating");
    assert_eq!(
        steps,
        vec![MemberStep::Field {
            name: "Review.Rating".to_string(),
            data_type: DataType::Int32,
        }]
    );
    assert_eq!(data_type, DataType::Int32);
}

#[test]
fn test_unknown_field() {
    let err = parse("Missing eq 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.reason(), "Field not found: Missing");
    assert_eq!((err.line(), err.column()), (1, 1));
}

#[test]
fn test_unknown_aspect_field() {
    let err = parse("Index gt 1 and Review/Stars gt 3").unwrap_err();
    assert_eq!(err.reason(), "Field not found: Review.Stars");
    assert_eq!(err.column(), 16);
}

#[test]
fn test_aspect_without_field() {
    let err = parse("Review eq 1").unwrap_err();
    assert_eq!(err.reason(), "Field not found: Review");
}

#[test]
fn test_unknown_type_qualifier() {
    let err = parse("Sys.Car/Name eq 'x'").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.reason(), "Type not found: Sys.Car");
}

// ============================================================================
// Function resolution
// ============================================================================

#[test]
fn test_overload_by_argument_types() {
    match parse("substring(Name, 1, 2) eq 'x'").unwrap() {
        Expr::BinaryOp { left, .. } => match *left {
            Expr::Call { function, .. } => {
                assert_eq!(
                    function.params,
                    vec![DataType::String, DataType::Int32, DataType::Int32]
                );
                assert_eq!(function.returns, DataType::String);
            }
            other => panic!("Expected call, got {}", other),
        },
        other => panic!("Expected comparison, got {}", other),
    }
}

#[test]
fn test_widening_in_arguments() {
    let expr = parse("round(Index) eq 2").unwrap();
    assert_eq!(expr.data_type(), DataType::Boolean);
}

#[test]
fn test_unknown_overload() {
    let err = parse("length(1) eq 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.reason(), "Unknown function: length (int)");
    let cause = std::error::Error::source(&err).unwrap();
    assert_eq!(cause.to_string(), "Unknown function: length (int)");
}

#[test]
fn test_point_needs_constructor() {
    let schema = schema();
    let env = Environment::new(&schema, &NoAspects, &NoFunctions);
    let err = parse_filter("POINT(1 2)", &env, CompileOptions::default()).unwrap_err();
    assert_eq!(err.reason(), "Unknown function: Point (double, double)");
}

// ============================================================================
// Direct builder use
// ============================================================================

#[test]
fn test_build_simple_binary() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let builder = ExpressionBuilder::new(Environment::new(&schema, &schema, &functions));
    let expr = builder
        .build_simple_binary(
            "add",
            builder.build_constant(Literal::Int32(1)),
            builder.build_constant(Literal::Int64(2)),
        )
        .unwrap();
    assert_eq!(expr.to_string(), "(1 add 2L)");
    assert_eq!(expr.data_type(), DataType::Int64);

    let err = builder
        .build_simple_binary(
            "mul",
            builder.build_constant(Literal::String("x".to_string())),
            builder.build_constant(Literal::Int32(2)),
        )
        .unwrap_err();
    assert_eq!(
        err,
        BuildError::InvalidOperands {
            op: "mul".to_string(),
            operands: "string and int".to_string(),
        }
    );
}

#[test]
#[should_panic(expected = "unknown binary operator keyword")]
fn test_build_simple_binary_rejects_unknown_keyword() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let builder = ExpressionBuilder::new(Environment::new(&schema, &schema, &functions));
    let _ = builder.build_simple_binary(
        "xor",
        builder.build_constant(Literal::Boolean(true)),
        builder.build_constant(Literal::Boolean(false)),
    );
}

#[test]
fn test_build_member_path_with_type() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let builder = ExpressionBuilder::new(Environment::new(&schema, &schema, &functions));
    let expr = builder
        .build_member_path(Some("Folder"), &["Name".to_string()])
        .unwrap();
    assert_eq!(expr.to_string(), "Folder/Name");

    let err = builder
        .build_member_path(None, &["Nothing".to_string()])
        .unwrap_err();
    assert_eq!(err, BuildError::FieldNotFound("Nothing".to_string()));
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn test_blank_filter_is_no_filter() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);
    assert!(compile(None, &env).unwrap().is_none());
    assert!(compile(Some(""), &env).unwrap().is_none());
    assert!(compile(Some(" \n\t"), &env).unwrap().is_none());
}

#[test]
fn test_filter_must_be_boolean() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);
    let err = compile(Some("Index add 1"), &env).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.reason(), "Filter must be a boolean expression, found int.");
    assert_eq!((err.line(), err.column()), (1, 1));
}

#[test]
fn test_depth_limit() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);

    let deep = format!("{}true{}", "(".repeat(150), ")".repeat(150));
    let err = compile(Some(deep.as_str()), &env).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(
        err.reason(),
        "Expression nesting exceeds the maximum depth of 32."
    );

    let shallow = format!("{}true{}", "(".repeat(10), ")".repeat(10));
    assert!(compile(Some(shallow.as_str()), &env).unwrap().is_some());

    let options = CompileOptions { max_depth: 5 };
    assert!(compile_with(Some(shallow.as_str()), &env, options).is_err());
}

#[test]
fn test_unary_operators_open_levels() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);
    let options = CompileOptions { max_depth: 4 };

    assert!(compile_with(Some("not not true"), &env, options).is_ok());
    let err = compile_with(Some("not not not not true"), &env, options).unwrap_err();
    assert_eq!(err.reason(), "Expression nesting exceeds the maximum depth of 4.");
}

#[test]
fn test_deepest_nesting_fits_small_stack() {
    let worker = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(|| {
            let schema = schema();
            let functions = StandardFunctions::new();
            let env = Environment::new(&schema, &schema, &functions);
            let levels = odata_filter::filter::DEFAULT_MAX_DEPTH - 1;

            let deepest = format!("{}Index gt 1{}", "(".repeat(levels), ")".repeat(levels));
            let accepted = compile(Some(deepest.as_str()), &env).map(|p| p.is_some());

            let args = format!("{}Name{}", "trim(".repeat(levels), ")".repeat(levels));
            let call = compile(Some(format!("{} eq 'x'", args).as_str()), &env).map(|p| p.is_some());

            let too_deep = format!("{}true{}", "(".repeat(10_000), ")".repeat(10_000));
            let refused = compile(Some(too_deep.as_str()), &env).map(|p| p.is_some());

            (accepted, call, refused)
        })
        .unwrap();

    let (accepted, call, refused) = worker.join().unwrap();
    assert!(accepted.unwrap());
    assert!(call.unwrap());
    assert_eq!(refused.unwrap_err().kind(), ErrorKind::Syntax);
}

#[test]
fn test_operator_chains_do_not_count_as_nesting() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);

    let terms: Vec<String> = (0..500).map(|i| format!("Id eq {}", i)).collect();
    let chain = terms.join(" or ");
    assert!(compile(Some(chain.as_str()), &env).unwrap().is_some());

    let sum = vec!["1"; 200].join(" add ");
    let expr = parse(&format!("{} eq 200", sum)).unwrap();
    assert_eq!(expr.data_type(), DataType::Boolean);
}

// ============================================================================
// Operand types
// ============================================================================

fn type_error(text: &str) -> FilterError {
    let err = parse(text).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Semantic, "Failed for input: {}", text);
    err
}

#[test]
fn test_arithmetic_needs_numbers() {
    let err = type_error("Name add 1 eq 2");
    assert_eq!(err.reason(), "Operator 'add' cannot be applied to string and int");
    assert_eq!((err.line(), err.column()), (1, 1));

    let err = type_error("Index eq 1 and Index mul CreationDate eq 2");
    assert_eq!(
        err.reason(),
        "Operator 'mul' cannot be applied to int and datetime"
    );
    assert_eq!(err.column(), 16);

    assert!(parse("Price add null eq 1").is_ok());
    assert!(parse("Index add Review/Rating gt 3").is_ok());
}

#[test]
fn test_arithmetic_result_cannot_be_the_filter() {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);

    let err = compile(Some("Name add 1"), &env).unwrap_err();
    assert_eq!(err.reason(), "Operator 'add' cannot be applied to string and int");
    let err = compile(Some("null add 1"), &env).unwrap_err();
    assert_eq!(err.reason(), "Filter must be a boolean expression, found int.");
}

#[test]
fn test_comparison_needs_related_types() {
    let err = type_error("Name gt 3");
    assert_eq!(err.reason(), "Operator 'gt' cannot be applied to string and int");

    let err = type_error("CreationDate eq 'abc'");
    assert_eq!(
        err.reason(),
        "Operator 'eq' cannot be applied to datetime and string"
    );

    let err = type_error("POINT(1 2) lt POINT(3 4)");
    assert_eq!(err.reason(), "Operator 'lt' cannot be applied to point and point");

    assert!(parse("POINT(1 2) eq POINT(1 2)").is_ok());
    assert!(parse("Price ge 3").is_ok());
    assert!(parse("Name eq null").is_ok());
    assert!(parse("CreationDate lt datetime'2024-01-01'").is_ok());
}

#[test]
fn test_logical_and_not_need_booleans() {
    let err = type_error("Index and true");
    assert_eq!(err.reason(), "Operator 'and' cannot be applied to int and bool");

    let err = type_error("Index gt 1 or not Name");
    assert_eq!(err.reason(), "Operator 'not' cannot be applied to string");
    assert_eq!(err.column(), 15);

    let err = type_error("-Name eq 'x'");
    assert_eq!(err.reason(), "Operator '-' cannot be applied to string");

    assert!(parse("not (Index gt 1) or null").is_ok());
}
