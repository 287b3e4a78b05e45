//! Compile filters and run them against JSON input

use std::path::Path;

use tracing::debug;

use super::CliError;
use crate::{
    CompileOptions, Environment, Expr, JsonContent, JsonSchema, StandardFunctions, compile_with,
    parse_filter,
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The filter to compile
    pub filter: String,
    /// JSON input string: one object or an array of objects
    pub input: Option<String>,
    /// Only compile, don't evaluate
    pub compile_only: bool,
    pub compile: CompileOptions,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// The filter compiled; nothing was evaluated
    Compiled,
    /// The input items the filter matched, in input order
    Matches(Vec<serde_json::Value>),
}

/// Load a schema file, or the default schema when no path is given.
pub fn load_schema(path: Option<&Path>) -> Result<JsonSchema, CliError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading schema");
            let text = std::fs::read_to_string(path)?;
            Ok(JsonSchema::from_json(&text)?)
        }
        None => Ok(JsonSchema::default()),
    }
}

/// Compile the filter and, unless `compile_only` is set, evaluate it against every input item.
///
/// An empty filter matches everything.
pub fn execute_check(options: &CheckOptions, schema: &JsonSchema) -> Result<CheckResult, CliError> {
    let functions = StandardFunctions::new();
    let env = Environment::new(schema, schema, &functions);
    let predicate = compile_with(Some(options.filter.as_str()), &env, options.compile)?;

    if options.compile_only {
        return Ok(CheckResult::Compiled);
    }

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let json_value: serde_json::Value = serde_json::from_str(json_str)?;

    let items = match json_value {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        other => {
            return Err(CliError::InvalidInput(format!(
                "expected an object or an array, found {}",
                other
            )));
        }
    };

    let mut matches = Vec::new();
    for item in items {
        let Some(object) = item.as_object() else {
            return Err(CliError::InvalidInput(format!(
                "expected an object, found {}",
                item
            )));
        };
        let keep = match &predicate {
            Some(predicate) => predicate.evaluate(&JsonContent::new(object))?,
            None => true,
        };
        if keep {
            matches.push(item);
        }
    }
    debug!(matched = matches.len(), "filter evaluated");
    Ok(CheckResult::Matches(matches))
}

/// Compile the filter and return its resolved tree.
pub fn explain(filter: &str, schema: &JsonSchema) -> Result<Expr, CliError> {
    let functions = StandardFunctions::new();
    let env = Environment::new(schema, schema, &functions);
    Ok(parse_filter(filter, &env, CompileOptions::default())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(filter: &str, input: &str) -> CheckOptions {
        CheckOptions {
            filter: filter.to_string(),
            input: Some(input.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_check_filters_array() {
        let schema = JsonSchema::default();
        let input = r#"[{"Name": "Alpha", "Index": 1}, {"Name": "Beta", "Index": 5}]"#;
        let result = execute_check(&options("Index gt 2", input), &schema).unwrap();

        match result {
            CheckResult::Matches(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0]["Name"], "Beta");
            }
            CheckResult::Compiled => panic!("Expected matches"),
        }
    }

    #[test]
    fn test_check_compile_only_needs_no_input() {
        let schema = JsonSchema::default();
        let opts = CheckOptions {
            filter: "Name eq 'A'".to_string(),
            compile_only: true,
            ..Default::default()
        };
        assert!(matches!(
            execute_check(&opts, &schema),
            Ok(CheckResult::Compiled)
        ));
    }

    #[test]
    fn test_check_reports_missing_input() {
        let schema = JsonSchema::default();
        let opts = CheckOptions {
            filter: "Name eq 'A'".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            execute_check(&opts, &schema),
            Err(CliError::NoInput)
        ));
    }

    #[test]
    fn test_check_rejects_scalar_input() {
        let schema = JsonSchema::default();
        let result = execute_check(&options("Name eq 'A'", "42"), &schema);
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_explain_renders_tree() {
        let schema = JsonSchema::default();
        let expr = explain("Index gt 3 and Name eq 'A'", &schema).unwrap();
        assert_eq!(expr.to_string(), "((Index gt 3) and (Name eq 'A'))");
    }
}
