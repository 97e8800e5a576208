//! Request variables.

use crate::coercion::coerce_input_value;
use crate::error::{CoercionError, RequestError};
use crate::model::{SchemaModel, TypeRef};
use crate::plan::VariableDef;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Reserved variable naming the operation to run.
pub const OPERATION_NAME: &str = "operationName";

/// Variables supplied with a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Variables {
    #[default]
    Empty,
    Defined(Map<String, Value>),
}

impl Variables {
    /// Parses the variables JSON text. Missing, blank or `null` text means no
    /// variables; anything but a JSON object is an error.
    pub fn parse(text: Option<&str>) -> Result<Self, RequestError> {
        let Some(text) = text.filter(|text| !text.trim().is_empty()) else {
            return Ok(Self::Empty);
        };
        let value: Value = serde_json::from_str(text)
            .map_err(|error| RequestError::InvalidVariables(error.to_string()))?;
        Self::from_value(value)
    }

    /// Wraps an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::Object(map) => Ok(Self::Defined(map)),
            other => Err(RequestError::InvalidVariables(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }

    /// Looks up `name` and coerces it to `expected`.
    ///
    /// `Ok(None)` means the variable was not supplied. An explicit `null` is
    /// returned as `Some(Value::Null)`.
    pub fn get(
        &self,
        model: &SchemaModel,
        name: &str,
        expected: &TypeRef,
    ) -> Result<Option<Value>, CoercionError> {
        let Self::Defined(map) = self else {
            return Ok(None);
        };
        map.get(name)
            .map(|value| {
                coerce_input_value(model, expected, value).map_err(|error| {
                    CoercionError::new(format!(
                        "Variable '${name}' got invalid value {value}; {error}"
                    ))
                })
            })
            .transpose()
    }

    /// The `operationName` value, if supplied.
    pub fn operation_name(&self, model: &SchemaModel) -> Result<Option<String>, CoercionError> {
        let value = self.get(model, OPERATION_NAME, &TypeRef::named("String"))?;
        Ok(value.and_then(|value| value.as_str().map(str::to_owned)))
    }

    /// Coerces the declared variables of an operation, applying defaults.
    pub(crate) fn coerce(
        &self,
        model: &SchemaModel,
        definitions: &IndexMap<String, VariableDef>,
    ) -> Result<IndexMap<String, Value>, CoercionError> {
        let mut values = IndexMap::with_capacity(definitions.len());
        for (name, definition) in definitions {
            match self.get(model, name, &definition.ty)? {
                Some(value) => {
                    values.insert(name.clone(), value);
                }
                None => match &definition.default {
                    Some(default) => {
                        values.insert(name.clone(), default.clone());
                    }
                    None if definition.ty.is_non_null() => {
                        return Err(CoercionError::new(format!(
                            "Variable '${name}' of required type '{}' was not provided",
                            definition.ty
                        )));
                    }
                    None => {}
                },
            }
        }
        Ok(values)
    }
}

impl From<Map<String, Value>> for Variables {
    fn from(map: Map<String, Value>) -> Self {
        Self::Defined(map)
    }
}
