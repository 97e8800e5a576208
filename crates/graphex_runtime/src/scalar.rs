//! Scalar coercion.
//!
//! Every scalar carries a [`ScalarCoercion`] that converts resolver output into
//! its response representation (`serialize`) and request input into the value
//! resolvers receive (`deserialize`). Custom scalars are declared with a
//! [`ScalarDefinition`] and must provide both halves.

use crate::error::{CoercionError, SchemaError};
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// The raw representation a scalar uses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Long,
    Short,
    Float,
    Float32,
    String,
    Boolean,
    Id,
}

impl ScalarKind {
    /// Checks and normalizes a raw value of this kind.
    pub fn coerce(self, value: &Value) -> Result<Value, CoercionError> {
        match self {
            Self::Int => integer(value, i64::from(i32::MIN), i64::from(i32::MAX), "Int"),
            Self::Long => integer(value, i64::MIN, i64::MAX, "Long"),
            Self::Short => integer(value, i64::from(i16::MIN), i64::from(i16::MAX), "Short"),
            Self::Float => float(value, false),
            Self::Float32 => float(value, true),
            Self::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(cannot_represent("String", value)),
            },
            Self::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(cannot_represent("Boolean", value)),
            },
            Self::Id => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
                _ => Err(cannot_represent("ID", value)),
            },
        }
    }
}

fn cannot_represent(kind: &str, value: &Value) -> CoercionError {
    CoercionError::new(format!("{kind} cannot represent value: {value}"))
}

fn integer(value: &Value, min: i64, max: i64, kind: &str) -> Result<Value, CoercionError> {
    let int = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        _ => None,
    };
    match int {
        Some(int) if (min..=max).contains(&int) => Ok(Value::Number(int.into())),
        _ => Err(cannot_represent(kind, value)),
    }
}

fn float(value: &Value, single: bool) -> Result<Value, CoercionError> {
    let Some(mut float) = value.as_f64().filter(|_| value.is_number()) else {
        return Err(cannot_represent("Float", value));
    };
    if single {
        float = f64::from(float as f32);
    }
    Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(|| cannot_represent("Float", value))
}

/// Serialize/deserialize contract of a scalar type.
pub trait ScalarCoercion: Send + Sync {
    /// The raw representation of this scalar.
    fn kind(&self) -> ScalarKind;

    /// Converts a resolved value into its response representation.
    fn serialize(&self, value: &Value) -> Result<Value, CoercionError>;

    /// Converts a literal or variable value into the value resolvers receive.
    fn deserialize(&self, raw: &Value) -> Result<Value, CoercionError>;
}

/// Coercion of the built-in scalars.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinCoercion(pub ScalarKind);

impl ScalarCoercion for BuiltinCoercion {
    fn kind(&self) -> ScalarKind {
        self.0
    }

    fn serialize(&self, value: &Value) -> Result<Value, CoercionError> {
        match (self.0, value) {
            // Resolvers commonly hand back numbers and booleans for String fields.
            (ScalarKind::String, Value::Number(_) | Value::Bool(_)) => {
                Ok(Value::String(value.to_string()))
            }
            (kind, value) => kind.coerce(value),
        }
    }

    fn deserialize(&self, raw: &Value) -> Result<Value, CoercionError> {
        self.0.coerce(raw)
    }
}

/// A coercion function of a custom scalar.
pub type CoercionFn = Arc<dyn Fn(&Value) -> Result<Value, CoercionError> + Send + Sync>;

/// Custom scalar built from a pair of functions.
///
/// Serialized output and deserialized input are checked against the raw
/// `kind` by the built-in coercion.
struct FnCoercion {
    kind: ScalarKind,
    serialize: CoercionFn,
    deserialize: CoercionFn,
}

impl ScalarCoercion for FnCoercion {
    fn kind(&self) -> ScalarKind {
        self.kind
    }

    fn serialize(&self, value: &Value) -> Result<Value, CoercionError> {
        let raw = (self.serialize)(value)?;
        BuiltinCoercion(self.kind).serialize(&raw)
    }

    fn deserialize(&self, raw: &Value) -> Result<Value, CoercionError> {
        let raw = self.kind.coerce(raw)?;
        (self.deserialize)(&raw)
    }
}

/// Declaration of a custom scalar.
pub struct ScalarDefinition {
    pub name: String,
    pub description: Option<String>,
    pub native: Option<String>,
    pub kind: ScalarKind,
    pub introspected: bool,
    serialize: Option<CoercionFn>,
    deserialize: Option<CoercionFn>,
    coercion: Option<Arc<dyn ScalarCoercion>>,
}

impl ScalarDefinition {
    /// Declares a scalar with the given raw representation.
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            native: None,
            kind,
            introspected: true,
            serialize: None,
            deserialize: None,
            coercion: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Binds the scalar to a native type identifier.
    #[must_use]
    pub fn native(mut self, id: impl Into<String>) -> Self {
        self.native = Some(id.into());
        self
    }

    /// Hides the scalar from `__schema { types }`.
    #[must_use]
    pub fn not_introspected(mut self) -> Self {
        self.introspected = false;
        self
    }

    #[must_use]
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CoercionError> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CoercionError> + Send + Sync + 'static,
    {
        self.deserialize = Some(Arc::new(f));
        self
    }

    /// Uses a complete coercion implementation instead of a function pair.
    #[must_use]
    pub fn coercion(mut self, coercion: impl ScalarCoercion + 'static) -> Self {
        self.kind = coercion.kind();
        self.coercion = Some(Arc::new(coercion));
        self
    }

    /// Produces the coercion, failing if either half is missing.
    pub(crate) fn into_coercion(self) -> Result<Arc<dyn ScalarCoercion>, SchemaError> {
        if let Some(coercion) = self.coercion {
            return Ok(coercion);
        }
        match (self.serialize, self.deserialize) {
            (Some(serialize), Some(deserialize)) => Ok(Arc::new(FnCoercion {
                kind: self.kind,
                serialize,
                deserialize,
            })),
            _ => Err(SchemaError::MissingCoercion(self.name)),
        }
    }
}

impl fmt::Debug for ScalarDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("native", &self.native)
            .field("has_serialize", &self.serialize.is_some())
            .field("has_deserialize", &self.deserialize.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_ranges() {
        let int = BuiltinCoercion(ScalarKind::Int);
        assert_eq!(int.deserialize(&json!(42)).unwrap(), json!(42));
        assert!(int.deserialize(&json!(3_000_000_000_i64)).is_err());
        assert!(int.deserialize(&json!("42")).is_err());
        assert_eq!(int.serialize(&json!(7.0)).unwrap(), json!(7));

        let short = BuiltinCoercion(ScalarKind::Short);
        assert!(short.deserialize(&json!(40_000)).is_err());
        assert_eq!(short.deserialize(&json!(-5)).unwrap(), json!(-5));

        let long = BuiltinCoercion(ScalarKind::Long);
        assert_eq!(long.deserialize(&json!(i64::MAX)).unwrap(), json!(i64::MAX));
    }

    #[test]
    fn test_float_precision() {
        let double = BuiltinCoercion(ScalarKind::Float);
        assert_eq!(double.deserialize(&json!(1)).unwrap(), json!(1.0));
        assert_eq!(double.serialize(&json!(0.1)).unwrap(), json!(0.1));

        let single = BuiltinCoercion(ScalarKind::Float32);
        assert_eq!(
            single.serialize(&json!(0.1)).unwrap(),
            json!(f64::from(0.1_f32))
        );
        assert!(single.deserialize(&json!(true)).is_err());
    }

    #[test]
    fn test_string_and_id() {
        let string = BuiltinCoercion(ScalarKind::String);
        assert_eq!(string.serialize(&json!(12)).unwrap(), json!("12"));
        assert!(string.deserialize(&json!(12)).is_err());

        let id = BuiltinCoercion(ScalarKind::Id);
        assert_eq!(id.deserialize(&json!(12)).unwrap(), json!("12"));
        assert_eq!(id.deserialize(&json!("a1")).unwrap(), json!("a1"));
        assert!(id.deserialize(&json!(1.5)).is_err());
    }

    #[test]
    fn test_missing_coercion_half() {
        let definition =
            ScalarDefinition::new("Rank", ScalarKind::Short).serialize(|value| Ok(value.clone()));
        let error = definition.into_coercion().err().unwrap();
        insta::assert_snapshot!(error.to_string(), @"Please specify serialize and deserialize coercion for scalar type 'Rank'");
    }

    #[test]
    fn test_function_coercion_checks_kind() {
        let coercion = ScalarDefinition::new("Rank", ScalarKind::Short)
            .serialize(|value| Ok(json!(value["rank"])))
            .deserialize(|raw| Ok(json!({ "rank": raw })))
            .into_coercion()
            .unwrap();

        assert_eq!(coercion.serialize(&json!({"rank": 3})).unwrap(), json!(3));
        assert!(coercion.serialize(&json!({"rank": 70_000})).is_err());
        assert_eq!(coercion.deserialize(&json!(4)).unwrap(), json!({"rank": 4}));
        assert!(coercion.deserialize(&json!("4")).is_err());
    }
}
