//! Input and leaf coercion against the schema model.
//!
//! Literals from the request document and JSON values from the variables go
//! through the same rules: non-null positions reject null, a single value is
//! accepted where a list is expected, enums must name a declared value,
//! scalars go through their [`ScalarCoercion`](crate::ScalarCoercion) and
//! input objects are checked field by field.

use crate::error::CoercionError;
use crate::model::{EnumType, InputObjectType, SchemaModel, Type, TypeRef};
use graphex_syntax::ast;
use serde_json::{Map, Number, Value};

/// Coerces a document literal to `ty`.
///
/// Variables are read through `lookup`. `Ok(None)` means the literal was a
/// variable with no value, which callers treat as an absent argument or field.
pub(crate) fn coerce_literal(
    model: &SchemaModel,
    ty: &TypeRef,
    literal: &ast::Value,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Result<Option<Value>, CoercionError> {
    if let ast::Value::Variable(name) = literal {
        return match lookup(name.as_str()) {
            Some(Value::Null) if ty.is_non_null() => Err(CoercionError::new(format!(
                "Variable '${}' is null in non-null position of type {ty}",
                name.value
            ))),
            value => Ok(value),
        };
    }

    match ty {
        TypeRef::NonNull(inner) => {
            if matches!(literal, ast::Value::Null(_)) {
                return Err(null_in_non_null(ty));
            }
            match coerce_literal(model, inner, literal, lookup)? {
                Some(Value::Null) => Err(null_in_non_null(ty)),
                value => Ok(value),
            }
        }
        TypeRef::List(inner) => match literal {
            ast::Value::Null(_) => Ok(Some(Value::Null)),
            ast::Value::List(items, _) => items
                .iter()
                .map(|item| Ok(coerce_literal(model, inner, item, lookup)?.unwrap_or(Value::Null)))
                .collect::<Result<Vec<_>, _>>()
                .map(|items| Some(Value::Array(items))),
            single => Ok(coerce_literal(model, inner, single, lookup)?
                .map(|value| Value::Array(vec![value]))),
        },
        TypeRef::Named(name) => {
            if matches!(literal, ast::Value::Null(_)) {
                return Ok(Some(Value::Null));
            }
            match model.get(name) {
                Some(Type::Scalar(scalar)) => {
                    let raw = literal_to_json(literal).ok_or_else(|| {
                        CoercionError::new(format!("{name} cannot represent value: {literal}"))
                    })?;
                    scalar.coercion.deserialize(&raw).map(Some)
                }
                Some(Type::Enum(enum_type)) => enum_literal(enum_type, literal).map(Some),
                Some(Type::InputObject(input)) => input_object_literal(model, input, literal, lookup),
                _ => Err(not_input_type(name)),
            }
        }
    }
}

fn enum_literal(enum_type: &EnumType, literal: &ast::Value) -> Result<Value, CoercionError> {
    match literal {
        ast::Value::Enum(value) if enum_type.values.contains_key(value.as_str()) => {
            Ok(Value::String(value.value.clone()))
        }
        ast::Value::Enum(value) => Err(CoercionError::new(format!(
            "Invalid enum {} value '{}'. Expected one of [{}]",
            enum_type.name,
            value.value,
            enum_values(enum_type)
        ))),
        ast::Value::String(..) => Err(CoercionError::new(format!(
            "String literal '{literal}' is invalid value for enum type {}",
            enum_type.name
        ))),
        other => Err(CoercionError::new(format!(
            "Literal '{other}' is invalid value for enum type {}",
            enum_type.name
        ))),
    }
}

fn input_object_literal(
    model: &SchemaModel,
    input: &InputObjectType,
    literal: &ast::Value,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Result<Option<Value>, CoercionError> {
    let ast::Value::Object(fields, _) = literal else {
        return Err(CoercionError::new(format!(
            "Expected input object of type {}, found {literal}",
            input.name
        )));
    };
    if let Some((unknown, _)) = fields
        .iter()
        .find(|(name, _)| !input.fields.contains_key(name.as_str()))
    {
        return Err(unknown_input_field(&input.name, unknown.as_str()));
    }

    let mut object = Map::new();
    for (name, definition) in &input.fields {
        let provided = match fields.iter().find(|(field, _)| field.as_str() == name) {
            Some((_, value)) => coerce_literal(model, &definition.ty, value, lookup)?,
            None => None,
        };
        match provided {
            Some(value) => {
                object.insert(name.clone(), value);
            }
            None => {
                if let Some(value) = input_field_default(model, &input.name, definition)? {
                    object.insert(name.clone(), value);
                }
            }
        }
    }
    Ok(Some(Value::Object(object)))
}

/// Coerces a JSON input value (a variable or a default) to `ty`.
pub(crate) fn coerce_input_value(
    model: &SchemaModel,
    ty: &TypeRef,
    value: &Value,
) -> Result<Value, CoercionError> {
    match ty {
        TypeRef::NonNull(inner) => match value {
            Value::Null => Err(null_in_non_null(ty)),
            value => coerce_input_value(model, inner, value),
        },
        TypeRef::List(inner) => match value {
            Value::Null => Ok(Value::Null),
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_input_value(model, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_input_value(model, inner, single)?])),
        },
        TypeRef::Named(name) => {
            if value.is_null() {
                return Ok(Value::Null);
            }
            match model.get(name) {
                Some(Type::Scalar(scalar)) => scalar.coercion.deserialize(value),
                Some(Type::Enum(enum_type)) => match value.as_str() {
                    Some(symbol) if enum_type.values.contains_key(symbol) => Ok(value.clone()),
                    _ => Err(CoercionError::new(format!(
                        "Value {value} is not a valid value for enum type {name}. Expected one of [{}]",
                        enum_values(enum_type)
                    ))),
                },
                Some(Type::InputObject(input)) => input_object_value(model, input, value),
                _ => Err(not_input_type(name)),
            }
        }
    }
}

fn input_object_value(
    model: &SchemaModel,
    input: &InputObjectType,
    value: &Value,
) -> Result<Value, CoercionError> {
    let Value::Object(fields) = value else {
        return Err(CoercionError::new(format!(
            "Expected input object of type {}, found {value}",
            input.name
        )));
    };
    if let Some(unknown) = fields.keys().find(|key| !input.fields.contains_key(*key)) {
        return Err(unknown_input_field(&input.name, unknown));
    }

    let mut object = Map::new();
    for (name, definition) in &input.fields {
        let value = match fields.get(name) {
            Some(value) => Some(coerce_input_value(model, &definition.ty, value)?),
            None => input_field_default(model, &input.name, definition)?,
        };
        if let Some(value) = value {
            object.insert(name.clone(), value);
        }
    }
    Ok(Value::Object(object))
}

/// Value of an input field the caller did not provide.
fn input_field_default(
    model: &SchemaModel,
    type_name: &str,
    definition: &crate::model::InputValueDef,
) -> Result<Option<Value>, CoercionError> {
    match &definition.default_value {
        Some(default) => coerce_input_value(model, &definition.ty, default).map(Some),
        None if definition.ty.is_non_null() => Err(CoercionError::new(format!(
            "Missing value for non-nullable field '{}' of input type {type_name}",
            definition.name
        ))),
        None => Ok(None),
    }
}

/// Serializes a resolved value of a scalar or enum type.
pub(crate) fn serialize_leaf(
    model: &SchemaModel,
    type_name: &str,
    value: &Value,
) -> Result<Value, CoercionError> {
    match model.get(type_name) {
        Some(Type::Scalar(scalar)) => scalar.coercion.serialize(value),
        Some(Type::Enum(enum_type)) => match value.as_str() {
            Some(symbol) if enum_type.values.contains_key(symbol) => Ok(value.clone()),
            _ => Err(CoercionError::new(format!(
                "Enum {type_name} cannot represent value: {value}"
            ))),
        },
        _ => Err(CoercionError::new(format!("Type {type_name} is not a leaf type"))),
    }
}

/// Converts a constant scalar literal to JSON.
fn literal_to_json(literal: &ast::Value) -> Option<Value> {
    match literal {
        ast::Value::Int(value, _) => Some(Value::Number((*value).into())),
        ast::Value::Float(value, _) => Number::from_f64(*value).map(Value::Number),
        ast::Value::String(value, _) => Some(Value::String(value.clone())),
        ast::Value::Boolean(value, _) => Some(Value::Bool(*value)),
        ast::Value::Null(_) => Some(Value::Null),
        _ => None,
    }
}

fn enum_values(enum_type: &EnumType) -> String {
    enum_type
        .values
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn null_in_non_null(ty: &TypeRef) -> CoercionError {
    CoercionError::new(format!("Expected non-null value of type {ty}, found null"))
}

fn not_input_type(name: &str) -> CoercionError {
    CoercionError::new(format!("Type {name} is not an input type"))
}

fn unknown_input_field(type_name: &str, field: &str) -> CoercionError {
    CoercionError::new(format!(
        "Field '{field}' is not defined by input type {type_name}"
    ))
}
