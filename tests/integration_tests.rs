use odata_filter::model::DataType;
use odata_filter::{
    Environment, EvalError, Evaluator, JsonContent, JsonSchema, Predicate, StandardFunctions,
    Value, compile,
};
use serde_json::json;

fn schema() -> JsonSchema {
    JsonSchema::default()
        .with_field("Price", DataType::Decimal)
        .with_field("Published", DataType::DateTime)
        .with_field("Archived", DataType::Boolean)
        .with_field("Big", DataType::Int64)
        .with_aspect("Review", [("Rating", DataType::Int32)])
}

fn predicate(filter: &str) -> Predicate {
    let schema = schema();
    let functions = StandardFunctions::new();
    let env = Environment::new(&schema, &schema, &functions);
    compile(Some(filter), &env)
        .unwrap_or_else(|e| panic!("{}", e))
        .unwrap()
}

fn eval_filter(filter: &str, doc: serde_json::Value) -> Result<bool, EvalError> {
    let object = doc.as_object().unwrap();
    predicate(filter).evaluate(&JsonContent::new(object))
}

fn matches(filter: &str, doc: serde_json::Value) -> bool {
    eval_filter(filter, doc).unwrap()
}

fn folder() -> serde_json::Value {
    json!({
        "Id": 12,
        "Name": "Reports",
        "DisplayName": "Quarterly Reports",
        "Path": "/Root/Sites/Reports",
        "Index": 3,
        "CreationDate": "2024-01-15T08:30:00",
        "ContentType": { "Name": "Folder" },
        "Price": "19.99",
        "Review": { "Rating": 4 },
        "Published": null
    })
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_simple_property_comparison() {
    assert!(matches("Name eq 'Reports'", folder()));
    assert!(!matches("Name eq 'reports'", folder()));
    assert!(matches("Index gt 2 and Index le 3", folder()));
    assert!(matches("Id ne 13", folder()));
}

#[test]
fn test_content_type_shorthand() {
    assert!(matches("ContentType eq 'Folder'", folder()));
    assert!(matches("ContentType/Name eq 'Folder'", folder()));
    assert!(!matches("ContentType eq 'File'", folder()));
}

#[test]
fn test_numeric_promotion() {
    assert!(matches("Index eq 3L", folder()));
    assert!(matches("Index eq 3.0", folder()));
    assert!(matches("Index lt 3.5f", folder()));
    assert!(matches("Price gt 19.5m", folder()));
    assert!(matches("Price mul 2 eq 39.98m", folder()));
}

#[test]
fn test_datetime_comparison() {
    assert!(matches("CreationDate gt datetime'2024-01-01'", folder()));
    assert!(matches("year(CreationDate) eq 2024", folder()));
    assert!(matches("month(CreationDate) eq 1 and hour(CreationDate) eq 8", folder()));
}

// ============================================================================
// Null handling
// ============================================================================

#[test]
fn test_null_comparisons() {
    assert!(matches("Published eq null", folder()));
    assert!(!matches("Published gt datetime'2020-01-01'", folder()));
    assert!(!matches("Published lt datetime'2020-01-01'", folder()));
    assert!(matches("Name eq null", json!({})));
}

#[test]
fn test_not_null_is_false() {
    assert!(!matches("Archived", folder()));
    assert!(!matches("not Archived", folder()));
    assert!(matches("not Archived eq null", folder()));
    assert!(matches("not Archived", json!({ "Archived": false })));
}

// ============================================================================
// Logic
// ============================================================================

#[test]
fn test_short_circuit_skips_errors() {
    // 1 div 0 would fail, but the left side decides
    assert!(!matches("Index eq 0 and 1 div 0 eq 1", folder()));
    assert!(matches("Index eq 3 or 1 div 0 eq 1", folder()));
}

#[test]
fn test_division_by_zero() {
    let err = eval_filter("Index div 0 eq 1", folder()).unwrap_err();
    assert_eq!(err, EvalError::DivisionByZero);
}

#[test]
fn test_integer_overflow() {
    let err = eval_filter("2147483647 add Index gt 0", folder()).unwrap_err();
    assert!(matches!(err, EvalError::Overflow(_)));
    assert!(matches("2147483647L add Index gt 0", folder()));
}

#[test]
fn test_integer_division_truncates() {
    assert!(matches("7 div 2 eq 3", folder()));
    assert!(matches("7 mod 2 eq 1", folder()));
    assert!(matches("7.0 div 2 eq 3.5", folder()));
}

#[test]
fn test_symbolic_arithmetic() {
    assert!(matches("Index-1 eq 2", folder()));
    assert!(matches("-Index eq -3", folder()));
}

// ============================================================================
// Functions, aspects and types
// ============================================================================

#[test]
fn test_string_functions() {
    assert!(matches("startswith(Name, 'Rep')", folder()));
    assert!(matches("endswith(Path, '/Reports')", folder()));
    assert!(matches("substringof('arter', DisplayName)", folder()));
    assert!(matches("length(Name) eq 7", folder()));
    assert!(matches("tolower(Name) eq 'reports'", folder()));
    assert!(matches("indexof(Name, 'p') eq 2", folder()));
    assert!(matches("concat(Name, '!') eq 'Reports!'", folder()));
}

#[test]
fn test_function_names_ignore_case() {
    assert!(matches("ToUpper(Name) eq 'REPORTS'", folder()));
}

#[test]
fn test_aspect_fields() {
    assert!(matches("Review/Rating ge 4", folder()));

    let flat = json!({ "Review.Rating": 2 });
    assert!(!matches("Review/Rating ge 4", flat));
}

#[test]
fn test_isof_and_type_qualified_paths() {
    assert!(matches("isof('Folder')", folder()));
    assert!(matches("isof('Sys.Folder')", folder()));
    assert!(!matches("isof('File')", folder()));

    assert!(matches("Sys.Folder/Name eq 'Reports'", folder()));
    // Path on another type reads as null
    assert!(!matches("File/Name eq 'Reports'", folder()));
    assert!(matches("File/Name eq null", folder()));
}

#[test]
fn test_invalid_field_value() {
    let doc = json!({ "Price": "cheap" });
    let err = eval_filter("Price gt 1m", doc).unwrap_err();
    assert_eq!(
        err,
        EvalError::InvalidCast {
            from: "string".to_string(),
            to: "decimal".to_string(),
        }
    );
}

#[test]
fn test_long_field_out_of_range() {
    let err = eval_filter("Big eq 9223372036854775807L", json!({ "Big": 1e30 })).unwrap_err();
    assert_eq!(
        err,
        EvalError::InvalidCast {
            from: "double".to_string(),
            to: "long".to_string(),
        }
    );
    assert!(matches("Big eq 4000000000L", json!({ "Big": 4.0e9 })));
}

#[test]
fn test_long_or_chain() {
    let terms: Vec<String> = (0..2000).map(|i| format!("Id eq {}", i)).collect();
    let chain = terms.join(" or ");
    assert!(matches(&chain, json!({ "Id": 1999 })));
    assert!(!matches(&chain, json!({ "Id": 5000 })));

    let all = vec!["Id gt 0"; 2000].join(" and ");
    assert!(matches(&all, json!({ "Id": 7 })));
}

#[test]
fn test_evaluator_directly() {
    let doc = folder();
    let content = JsonContent::new(doc.as_object().unwrap());
    let predicate = predicate("Index add 1 eq 4");
    let evaluator = Evaluator::new(&content);
    assert_eq!(evaluator.eval(predicate.expr()).unwrap(), Value::Boolean(true));
}
