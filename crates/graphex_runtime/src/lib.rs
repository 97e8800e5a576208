//! Runtime for graphex.
//!
//! This crate provides the GraphQL execution runtime:
//! - `scalar`: Scalar kinds and coercion contracts
//! - `model`: The immutable schema model and its lookup contract
//! - `builder`: Schema construction and validation
//! - `introspection`: The `__schema` / `__type` meta schema
//! - `variables`: Request variables
//! - `plan`: Binding operations to the schema (execution plans)
//! - `executor`: Concurrent plan execution with null propagation
//! - `schema`: The façade tying parsing, planning and execution together

pub mod builder;
mod coercion;
pub mod config;
pub mod error;
pub mod executor;
mod introspection;
pub mod model;
pub mod plan;
pub mod resolver;
pub mod response;
pub mod scalar;
pub mod schema;
pub mod scope;
pub mod variables;

pub use builder::SchemaBuilder;
pub use config::{ExecutorConfig, SchemaConfiguration};
pub use error::{CoercionError, ExecutionError, PlanError, RequestError, SchemaError};
pub use executor::RequestExecutor;
pub use model::{
    DirectiveDef, DirectiveLocation, EnumType, EnumValueDef, FieldDef, InputObjectType,
    InputValueDef, InterfaceType, ObjectType, SchemaLookup, SchemaModel, Type, TypeKind, TypeRef,
    UnionType,
};
pub use plan::{ExecutionPlan, RequestInterpreter};
pub use resolver::{
    AsyncFnResolver, Context, DefaultResolver, FnResolver, Resolver, ResolverArgs,
    ResolverContext, ResolverError, ResolverFuture, ResolverResult,
};
pub use response::{FieldError, PathSegment, Response};
pub use scalar::{BuiltinCoercion, ScalarCoercion, ScalarDefinition, ScalarKind};
pub use schema::Schema;
pub use scope::ExecutionScope;
pub use variables::{Variables, OPERATION_NAME};

pub use graphex_syntax::{DocumentParser, OperationType, ParseError};
