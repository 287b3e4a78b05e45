//! Semantic actions invoked by the parser.
//!
//! The builder turns operator keywords into typed nodes, literal values into constants,
//! and resolves member paths and function calls against the injected content model,
//! aspect store and function registry.

use tracing::debug;

use crate::{
    ast::{BinOp, Expr, Literal, MemberPath, MemberStep, UnaryOp},
    error::BuildError,
    filter::Environment,
    model::{AspectDefinition, DataType},
    value::Value,
};

pub struct ExpressionBuilder<'a> {
    env: Environment<'a>,
}

impl<'a> ExpressionBuilder<'a> {
    pub fn new(env: Environment<'a>) -> Self {
        ExpressionBuilder { env }
    }

    /// Build a binary node from its operator keyword, checking the operand types.
    ///
    /// Logical operators need boolean operands, arithmetic needs numbers, and both sides
    /// of a comparison must be comparable. `null` and statically unknown operands pass.
    ///
    /// # Panics
    ///
    /// If `op` is not one of the binary operator keywords; the parser only passes known ones.
    pub fn build_simple_binary(
        &self,
        op: &str,
        left: Expr,
        right: Expr,
    ) -> Result<Expr, BuildError> {
        let op = BinOp::from_keyword(op)
            .unwrap_or_else(|| panic!("unknown binary operator keyword: {}", op));
        let (left_type, right_type) = (left.data_type(), right.data_type());

        let valid = if op.is_logical() {
            DataType::Boolean.accepts(&left_type) && DataType::Boolean.accepts(&right_type)
        } else if op.is_comparison() {
            let ordering = !matches!(op, BinOp::Equal | BinOp::NotEqual);
            DataType::comparable(&left_type, &right_type)
                && (!ordering || (left_type.is_ordered() && right_type.is_ordered()))
        } else {
            DataType::promote(&left_type, &right_type).is_some()
        };
        if !valid {
            return Err(BuildError::InvalidOperands {
                op: op.to_string(),
                operands: format!("{} and {}", left_type, right_type),
            });
        }

        Ok(Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Build a unary node from `not`, `minus` or `plus`.
    ///
    /// # Panics
    ///
    /// If `op` is none of those.
    pub fn build_unary(&self, op: &str, operand: Expr) -> Result<Expr, BuildError> {
        let op = UnaryOp::from_keyword(op)
            .unwrap_or_else(|| panic!("unknown unary operator keyword: {}", op));
        let operand_type = operand.data_type();

        let numeric = DataType::promote(&operand_type, &DataType::Null).is_some();
        let (symbol, valid) = match op {
            UnaryOp::Not => ("not", DataType::Boolean.accepts(&operand_type)),
            UnaryOp::Negate => ("-", numeric),
            UnaryOp::Plus => ("+", numeric),
        };
        if !valid {
            return Err(BuildError::InvalidOperands {
                op: symbol.to_string(),
                operands: operand_type.to_string(),
            });
        }

        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn build_constant(&self, value: Literal) -> Expr {
        Expr::Constant(value)
    }

    /// Resolve the `Point` constructor by arity and fold it into a constant.
    pub fn build_point_constant(&self, x: f64, y: f64, z: Option<f64>) -> Result<Expr, BuildError> {
        let mut coordinates = vec![x, y];
        coordinates.extend(z);
        let arg_types = vec![DataType::Double; coordinates.len()];

        let constructor = self
            .env
            .functions
            .resolve("Point", &arg_types)
            .ok_or_else(|| BuildError::UnknownFunction {
                name: "Point".to_string(),
                arg_types: join_types(&arg_types),
            })?;

        let args: Vec<Value> = coordinates.into_iter().map(Value::Double).collect();
        match constructor.call(&args, &NoContent) {
            Ok(Value::Point(point)) => Ok(Expr::Constant(Literal::Point(point))),
            Ok(other) => Err(BuildError::InvalidPoint(format!(
                "constructor returned {}",
                other.type_name()
            ))),
            Err(e) => Err(BuildError::InvalidPoint(e.to_string())),
        }
    }

    /// Resolve `name` with the static types of `args` in the function registry.
    pub fn build_global_call(&self, name: &str, args: Vec<Expr>) -> Result<Expr, BuildError> {
        let arg_types: Vec<DataType> = args.iter().map(Expr::data_type).collect();
        let function = self
            .env
            .functions
            .resolve(name, &arg_types)
            .ok_or_else(|| BuildError::UnknownFunction {
                name: name.to_string(),
                arg_types: join_types(&arg_types),
            })?;
        Ok(Expr::Call {
            name: name.to_string(),
            args,
            function,
        })
    }

    /// Resolve a member path step by step.
    ///
    /// Each step is tried as a static property of the current type, then as a declared
    /// dynamic field, then as the name of an aspect whose field is the next step.
    pub fn build_member_path(
        &self,
        type_name: Option<&str>,
        names: &[String],
    ) -> Result<Expr, BuildError> {
        let model = self.env.model;

        let mut current = match type_name {
            Some(name) => DataType::Object(
                model
                    .resolve_type(name)
                    .ok_or_else(|| BuildError::TypeNotFound(name.to_string()))?,
            ),
            None => DataType::Object(model.root_type().to_string()),
        };
        let mut steps = Vec::with_capacity(names.len());
        let mut aspect: Option<AspectDefinition> = None;

        for name in names {
            if let Some(definition) = aspect.take() {
                let setting = definition.field(name).ok_or_else(|| {
                    BuildError::FieldNotFound(format!("{}.{}", definition.name, name))
                })?;
                let qualified = format!("{}.{}", definition.name, setting.name);
                debug!(field = %qualified, data_type = %setting.data_type, "resolved aspect field");
                current = setting.data_type.clone();
                steps.push(MemberStep::Field {
                    name: qualified,
                    data_type: setting.data_type.clone(),
                });
                continue;
            }

            let owner = match &current {
                DataType::Content => model.root_type().to_string(),
                other => other.type_name(),
            };

            if let Some(data_type) = model.static_member(&owner, name) {
                current = data_type;
                steps.push(MemberStep::Property(name.clone()));
            } else if let Some(data_type) = model.dynamic_field_type(&owner, name) {
                current = data_type.clone();
                steps.push(MemberStep::Field {
                    name: name.clone(),
                    data_type,
                });
            } else if let Some(definition) = self.env.aspects.load_aspect_by_name(name) {
                debug!(aspect = %definition.name, "member path enters aspect");
                aspect = Some(definition);
            } else {
                return Err(BuildError::FieldNotFound(name.clone()));
            }
        }

        if let Some(definition) = aspect {
            return Err(BuildError::FieldNotFound(definition.name));
        }

        Ok(Expr::MemberAccess(MemberPath {
            type_name: type_name.map(str::to_string),
            names: names.to_vec(),
            steps,
            data_type: current,
        }))
    }
}

fn join_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stand-in content for calls folded at compile time.
struct NoContent;

impl crate::model::Content for NoContent {
    fn type_name(&self) -> &str {
        ""
    }

    fn property(&self, _name: &str) -> Option<Value> {
        None
    }

    fn field(&self, _name: &str) -> Option<Value> {
        None
    }
}
