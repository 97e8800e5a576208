//! Error types for schema construction, request handling and execution.

use graphex_syntax::ParseError;
use thiserror::Error;

/// A configuration error found while building the schema model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Please specify serialize and deserialize coercion for scalar type '{0}'")]
    MissingCoercion(String),

    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),

    #[error("Native type '{native}' is bound to both '{first}' and '{second}'")]
    DuplicateNativeType {
        native: String,
        first: String,
        second: String,
    },

    #[error("Unknown type '{name}' used by {location}")]
    UnknownType { name: String, location: String },

    #[error("Type '{name}' used by {location} is not an input type")]
    NotInputType { name: String, location: String },

    #[error("Type '{name}' used by {location} is not an output type")]
    NotOutputType { name: String, location: String },

    #[error("Union '{union}' member '{member}' is not an object type")]
    InvalidUnionMember { union: String, member: String },

    #[error("Type '{object}' implements '{interface}', which is not an interface")]
    NotAnInterface { object: String, interface: String },

    #[error("Type '{object}' must define field '{field}' of interface '{interface}'")]
    MissingInterfaceField {
        object: String,
        interface: String,
        field: String,
    },

    #[error("Type '{0}' must define at least one field")]
    EmptyType(String),

    #[error("Invalid default value for {location}: {message}")]
    InvalidDefaultValue { location: String, message: String },
}

/// A value that cannot be coerced to the expected input or output type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CoercionError {
    pub message: String,
}

impl CoercionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An error binding an operation to the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Property '{field}' on '{parent}' does not exist")]
    UnknownField { parent: String, field: String },

    #[error("Property '{field}' on '{parent}' does not accept argument '{argument}'")]
    UnknownArgument {
        parent: String,
        field: String,
        argument: String,
    },

    #[error("Missing value for non-nullable argument '{argument}' on '{parent}.{field}'")]
    MissingArgument {
        parent: String,
        field: String,
        argument: String,
    },

    #[error(transparent)]
    InvalidValue(#[from] CoercionError),

    #[error("Missing selection set on property '{field}' of type '{ty}'")]
    MissingSelectionSet { field: String, ty: String },

    #[error("Property '{field}' of type '{ty}' is a leaf and cannot have a selection set")]
    UnexpectedSelectionSet { field: String, ty: String },

    #[error("Fragment '{0}' is not defined")]
    UnknownFragment(String),

    #[error("Fragment '{0}' cannot spread itself")]
    FragmentCycle(String),

    #[error("Unknown type '{0}' in type condition")]
    UnknownTypeCondition(String),

    #[error("Type condition '{0}' must be an object, interface or union type")]
    InvalidTypeCondition(String),

    #[error("Fragment on '{condition}' can never apply to '{parent}'")]
    ImpossibleTypeCondition { condition: String, parent: String },

    #[error("Directive '@{0}' is not defined")]
    UnknownDirective(String),

    #[error("Directive '@{directive}' may not be used on {location}")]
    MisplacedDirective { directive: String, location: String },

    #[error("Directive '@{0}' requires a Boolean 'if' argument")]
    InvalidCondition(String),

    #[error("Variable '${0}' is not defined")]
    UndefinedVariable(String),

    #[error("Variable '${name}' cannot be of non-input type '{ty}'")]
    InvalidVariableType { name: String, ty: String },

    #[error("Invalid default value for variable '${name}': {message}")]
    InvalidVariableDefault { name: String, message: String },

    #[error("Mutations are not supported by this schema")]
    NoMutationType,

    #[error("Subscriptions are not supported by this schema")]
    SubscriptionNotSupported,
}

/// A request-level failure. The whole request fails with `data: null`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Must provide any operation")]
    NoOperation,

    #[error("anonymous operation must be the only defined operation")]
    AnonymousOperation,

    #[error("Must provide an operation name from: [{}]", .available.join(", "))]
    MissingOperationName { available: Vec<String> },

    #[error("Must provide an operation name from: [{}], found {found}", .available.join(", "))]
    UnknownOperationName {
        available: Vec<String>,
        found: String,
    },

    #[error("Invalid variables: {0}")]
    InvalidVariables(String),

    #[error(transparent)]
    Variable(#[from] CoercionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Failure of an entry point. Everything else is reported inside the response.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Request was cancelled")]
    Cancelled,

    #[error("Blocking execution was called from inside an async runtime, use execute_async")]
    InsideRuntime,

    #[error("Failed to start the execution runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Failed to serialize the response: {0}")]
    Serialize(#[from] serde_json::Error),
}
