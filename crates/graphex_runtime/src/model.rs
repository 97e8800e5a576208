//! Schema model.
//!
//! The model is the immutable type registry the plan builder and executor
//! read from. It is produced by [`SchemaBuilder`](crate::SchemaBuilder) and
//! shared as `Arc<SchemaModel>`.

use crate::resolver::{
    AsyncFnResolver, FnResolver, Resolver, ResolverArgs, ResolverContext, ResolverResult,
};
use crate::scalar::ScalarCoercion;
use graphex_syntax::ast;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type reference with list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    #[must_use]
    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Shorthand for `Name!`.
    pub fn required(name: impl Into<String>) -> Self {
        Self::non_null(Self::named(name))
    }

    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Name of the innermost named type.
    #[must_use]
    pub fn inner_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.inner_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl From<&ast::Type> for TypeRef {
    fn from(ty: &ast::Type) -> Self {
        match ty {
            ast::Type::Named(name) => Self::Named(name.value.clone()),
            ast::Type::List(inner, _) => Self::list(Self::from(inner.as_ref())),
            ast::Type::NonNull(inner, _) => Self::non_null(Self::from(inner.as_ref())),
        }
    }
}

/// Argument or input field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Output field definition.
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, InputValueDef>,
    pub deprecation_reason: Option<String>,
    /// Resolver of the field. Fields without one read the parent property.
    pub resolver: Option<Arc<dyn Resolver>>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: IndexMap::new(),
            deprecation_reason: None,
            resolver: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: InputValueDef) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Resolves the field with a synchronous function.
    #[must_use]
    pub fn resolve_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &ResolverContext) -> ResolverResult + Send + Sync + 'static,
    {
        self.resolver(FnResolver::new(f))
    }

    /// Resolves the field with an async function.
    #[must_use]
    pub fn resolve_async<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Value, ResolverArgs, ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.resolver(AsyncFnResolver::new(f))
    }

    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason.is_some()
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("deprecation_reason", &self.deprecation_reason)
            .field("has_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

/// Picks the concrete object type of an abstract value.
pub type TypeResolver = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Reads the `__typename` key of the value.
fn typename_key(value: &Value) -> Option<String> {
    value
        .get("__typename")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Object type.
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub interfaces: Vec<String>,
    pub native: Option<String>,
    pub introspected: bool,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            interfaces: Vec::new(),
            native: None,
            introspected: true,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Binds the type to a native type identifier.
    #[must_use]
    pub fn native(mut self, id: impl Into<String>) -> Self {
        self.native = Some(id.into());
        self
    }

    /// Hides the type from `__schema { types }`.
    #[must_use]
    pub fn not_introspected(mut self) -> Self {
        self.introspected = false;
        self
    }
}

/// Interface type.
#[derive(Clone)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub native: Option<String>,
    pub type_resolver: TypeResolver,
    pub introspected: bool,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            native: None,
            type_resolver: Arc::new(typename_key),
            introspected: true,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn native(mut self, id: impl Into<String>) -> Self {
        self.native = Some(id.into());
        self
    }

    #[must_use]
    pub fn resolve_type<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.type_resolver = Arc::new(f);
        self
    }

    #[must_use]
    pub fn not_introspected(mut self) -> Self {
        self.introspected = false;
        self
    }
}

impl fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}

/// Union type.
#[derive(Clone)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
    pub native: Option<String>,
    pub type_resolver: TypeResolver,
    pub introspected: bool,
}

impl UnionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            members: Vec::new(),
            native: None,
            type_resolver: Arc::new(typename_key),
            introspected: true,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.members.push(name.into());
        self
    }

    #[must_use]
    pub fn native(mut self, id: impl Into<String>) -> Self {
        self.native = Some(id.into());
        self
    }

    #[must_use]
    pub fn resolve_type<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.type_resolver = Arc::new(f);
        self
    }

    #[must_use]
    pub fn not_introspected(mut self) -> Self {
        self.introspected = false;
        self
    }
}

impl fmt::Debug for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionType")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}

/// Enum value definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

impl EnumValueDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation_reason: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }
}

/// Enum type. Values travel as their names.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: IndexMap<String, EnumValueDef>,
    pub native: Option<String>,
    pub introspected: bool,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values: IndexMap::new(),
            native: None,
            introspected: true,
        }
    }

    /// Creates an enum with plain values.
    pub fn with_values<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .fold(Self::new(name), |ty, value| ty.value(EnumValueDef::new(value)))
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: EnumValueDef) -> Self {
        self.values.insert(value.name.clone(), value);
        self
    }

    #[must_use]
    pub fn native(mut self, id: impl Into<String>) -> Self {
        self.native = Some(id.into());
        self
    }

    #[must_use]
    pub fn not_introspected(mut self) -> Self {
        self.introspected = false;
        self
    }
}

/// Scalar type with its coercion.
#[derive(Clone)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub coercion: Arc<dyn ScalarCoercion>,
    pub native: Option<String>,
    /// Public scalar this one is exposed as.
    pub duplicate_of: Option<String>,
    pub introspected: bool,
}

impl fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarType")
            .field("name", &self.name)
            .field("kind", &self.coercion.kind())
            .field("native", &self.native)
            .field("duplicate_of", &self.duplicate_of)
            .finish_non_exhaustive()
    }
}

/// Input object type.
#[derive(Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputValueDef>,
    pub native: Option<String>,
    pub introspected: bool,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            native: None,
            introspected: true,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: InputValueDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn native(mut self, id: impl Into<String>) -> Self {
        self.native = Some(id.into());
        self
    }

    #[must_use]
    pub fn not_introspected(mut self) -> Self {
        self.introspected = false;
        self
    }
}

/// Introspection kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

impl TypeKind {
    pub const ALL: [TypeKind; 8] = [
        Self::Scalar,
        Self::Object,
        Self::Interface,
        Self::Union,
        Self::Enum,
        Self::InputObject,
        Self::List,
        Self::NonNull,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::InputObject => "INPUT_OBJECT",
            Self::List => "LIST",
            Self::NonNull => "NON_NULL",
        }
    }
}

/// A named schema type.
#[derive(Debug, Clone)]
pub enum Type {
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    Scalar(ScalarType),
    InputObject(InputObjectType),
}

impl Type {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Object(ty) => &ty.name,
            Self::Interface(ty) => &ty.name,
            Self::Union(ty) => &ty.name,
            Self::Enum(ty) => &ty.name,
            Self::Scalar(ty) => &ty.name,
            Self::InputObject(ty) => &ty.name,
        }
    }

    /// Name used by introspection.
    #[must_use]
    pub fn public_name(&self) -> &str {
        match self {
            Self::Scalar(ScalarType {
                duplicate_of: Some(public),
                ..
            }) => public,
            _ => self.name(),
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Object(ty) => ty.description.as_deref(),
            Self::Interface(ty) => ty.description.as_deref(),
            Self::Union(ty) => ty.description.as_deref(),
            Self::Enum(ty) => ty.description.as_deref(),
            Self::Scalar(ty) => ty.description.as_deref(),
            Self::InputObject(ty) => ty.description.as_deref(),
        }
    }

    #[must_use]
    pub fn native(&self) -> Option<&str> {
        match self {
            Self::Object(ty) => ty.native.as_deref(),
            Self::Interface(ty) => ty.native.as_deref(),
            Self::Union(ty) => ty.native.as_deref(),
            Self::Enum(ty) => ty.native.as_deref(),
            Self::Scalar(ty) => ty.native.as_deref(),
            Self::InputObject(ty) => ty.native.as_deref(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Object(_) => TypeKind::Object,
            Self::Interface(_) => TypeKind::Interface,
            Self::Union(_) => TypeKind::Union,
            Self::Enum(_) => TypeKind::Enum,
            Self::Scalar(_) => TypeKind::Scalar,
            Self::InputObject(_) => TypeKind::InputObject,
        }
    }

    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_))
    }

    #[must_use]
    pub fn is_output(&self) -> bool {
        !matches!(self, Self::InputObject(_))
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_))
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// Output fields of objects and interfaces.
    #[must_use]
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            Self::Object(ty) => Some(&ty.fields),
            Self::Interface(ty) => Some(&ty.fields),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(ty) => Some(ty),
            _ => None,
        }
    }

    pub(crate) fn is_introspected(&self) -> bool {
        match self {
            Self::Object(ty) => ty.introspected,
            Self::Interface(ty) => ty.introspected,
            Self::Union(ty) => ty.introspected,
            Self::Enum(ty) => ty.introspected,
            Self::InputObject(ty) => ty.introspected,
            Self::Scalar(ty) => ty.introspected && ty.duplicate_of.is_none(),
        }
    }
}

/// Where a directive may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    FieldDefinition,
    ArgumentDefinition,
    InputFieldDefinition,
    EnumValue,
}

impl DirectiveLocation {
    pub const ALL: [DirectiveLocation; 11] = [
        Self::Query,
        Self::Mutation,
        Self::Subscription,
        Self::Field,
        Self::FragmentDefinition,
        Self::FragmentSpread,
        Self::InlineFragment,
        Self::FieldDefinition,
        Self::ArgumentDefinition,
        Self::InputFieldDefinition,
        Self::EnumValue,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentDefinition => "FRAGMENT_DEFINITION",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
            Self::FieldDefinition => "FIELD_DEFINITION",
            Self::ArgumentDefinition => "ARGUMENT_DEFINITION",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
            Self::EnumValue => "ENUM_VALUE",
        }
    }
}

impl fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directive definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveDef {
    pub name: String,
    pub description: Option<String>,
    pub locations: Vec<DirectiveLocation>,
    pub arguments: IndexMap<String, InputValueDef>,
}

impl DirectiveDef {
    pub fn new(name: impl Into<String>, locations: &[DirectiveLocation]) -> Self {
        Self {
            name: name.into(),
            description: None,
            locations: locations.to_vec(),
            arguments: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: InputValueDef) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }
}

/// Read contract of a built schema.
pub trait SchemaLookup {
    /// Type usable in output position.
    fn type_by_name(&self, name: &str) -> Option<&Type>;

    /// Type usable in input position.
    fn input_type_by_name(&self, name: &str) -> Option<&Type>;

    /// Output type bound to a native type identifier.
    fn type_by_native_id(&self, id: &str) -> Option<&Type>;

    /// Input type bound to a native type identifier.
    fn input_type_by_native_id(&self, id: &str) -> Option<&Type>;

    fn all_types(&self) -> &IndexMap<String, Type>;

    /// Types listed by `__schema { types }`.
    fn introspected_types(&self) -> Vec<&Type>;

    fn directives(&self) -> &IndexMap<String, DirectiveDef>;

    fn query_type(&self) -> &ObjectType;

    fn mutation_type(&self) -> Option<&ObjectType>;

    /// Always `None`; subscriptions are not executed.
    fn subscription_type(&self) -> Option<&ObjectType>;

    /// Concrete object types of an object, interface or union.
    fn possible_types(&self, name: &str) -> Vec<&ObjectType>;
}

/// Immutable schema model.
#[derive(Debug)]
pub struct SchemaModel {
    pub(crate) types: IndexMap<String, Type>,
    pub(crate) query: String,
    pub(crate) mutation: Option<String>,
    pub(crate) enums: Vec<String>,
    pub(crate) scalars: Vec<String>,
    pub(crate) unions: Vec<String>,
    pub(crate) output_natives: FxHashMap<String, String>,
    pub(crate) input_natives: FxHashMap<String, String>,
    pub(crate) directives: IndexMap<String, DirectiveDef>,
    pub(crate) implementations: FxHashMap<String, Vec<String>>,
    pub(crate) introspected: Vec<String>,
    pub(crate) meta_fields: IndexMap<String, FieldDef>,
}

impl SchemaModel {
    /// Looks up any type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.iter().filter_map(|name| match self.types.get(name) {
            Some(Type::Enum(ty)) => Some(ty),
            _ => None,
        })
    }

    pub fn scalars(&self) -> impl Iterator<Item = &ScalarType> {
        self.scalars.iter().filter_map(|name| match self.types.get(name) {
            Some(Type::Scalar(ty)) => Some(ty),
            _ => None,
        })
    }

    pub fn unions(&self) -> impl Iterator<Item = &UnionType> {
        self.unions.iter().filter_map(|name| match self.types.get(name) {
            Some(Type::Union(ty)) => Some(ty),
            _ => None,
        })
    }

    /// Query-root-only meta fields (`__schema`, `__type`).
    pub(crate) fn meta_field(&self, name: &str) -> Option<&FieldDef> {
        self.meta_fields.get(name)
    }

    /// Checks whether `object` is one of the possible types of `abstract_type`.
    #[must_use]
    pub fn is_possible_type(&self, abstract_type: &str, object: &str) -> bool {
        self.possible_types(abstract_type)
            .iter()
            .any(|ty| ty.name == object)
    }

    fn object(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name).and_then(Type::as_object)
    }
}

impl SchemaLookup for SchemaModel {
    fn type_by_name(&self, name: &str) -> Option<&Type> {
        self.types.get(name).filter(|ty| ty.is_output())
    }

    fn input_type_by_name(&self, name: &str) -> Option<&Type> {
        self.types.get(name).filter(|ty| ty.is_input())
    }

    fn type_by_native_id(&self, id: &str) -> Option<&Type> {
        self.output_natives
            .get(id)
            .and_then(|name| self.types.get(name))
    }

    fn input_type_by_native_id(&self, id: &str) -> Option<&Type> {
        self.input_natives
            .get(id)
            .and_then(|name| self.types.get(name))
    }

    fn all_types(&self) -> &IndexMap<String, Type> {
        &self.types
    }

    fn introspected_types(&self) -> Vec<&Type> {
        self.introspected
            .iter()
            .filter_map(|name| self.types.get(name))
            .collect()
    }

    fn directives(&self) -> &IndexMap<String, DirectiveDef> {
        &self.directives
    }

    fn query_type(&self) -> &ObjectType {
        match self.types.get(&self.query) {
            Some(Type::Object(ty)) => ty,
            _ => unreachable!("query root is registered as an object type"),
        }
    }

    fn mutation_type(&self) -> Option<&ObjectType> {
        self.mutation.as_deref().and_then(|name| self.object(name))
    }

    fn subscription_type(&self) -> Option<&ObjectType> {
        None
    }

    fn possible_types(&self, name: &str) -> Vec<&ObjectType> {
        match self.types.get(name) {
            Some(Type::Object(ty)) => vec![ty],
            Some(Type::Interface(_)) => self
                .implementations
                .get(name)
                .map(|names| names.iter().filter_map(|n| self.object(n)).collect())
                .unwrap_or_default(),
            Some(Type::Union(ty)) => ty.members.iter().filter_map(|n| self.object(n)).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphex_core::Span;

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::required("Film")));
        assert_eq!(ty.to_string(), "[Film!]!");
        assert_eq!(ty.inner_name(), "Film");
        assert!(ty.is_non_null());
    }

    #[test]
    fn test_type_ref_from_ast() {
        let span = Span::default();
        let ast_ty = ast::Type::NonNull(
            Box::new(ast::Type::List(
                Box::new(ast::Type::Named(ast::Name::new("Int", span))),
                span,
            )),
            span,
        );
        assert_eq!(
            TypeRef::from(&ast_ty),
            TypeRef::non_null(TypeRef::list(TypeRef::named("Int")))
        );
    }

    #[test]
    fn test_type_predicates() {
        let input = Type::InputObject(InputObjectType::new("ActorInput"));
        assert!(input.is_input());
        assert!(!input.is_output());

        let film = Type::Object(ObjectType::new("Film").native("Film"));
        assert!(film.is_composite());
        assert!(!film.is_leaf());
        assert_eq!(film.kind().as_str(), "OBJECT");
        assert_eq!(film.native(), Some("Film"));

        let coolness = Type::Enum(EnumType::with_values("Coolness", ["NOT_COOL", "COOL"]));
        assert!(coolness.is_input() && coolness.is_output() && coolness.is_leaf());
    }

    #[test]
    fn test_default_type_resolver_reads_typename() {
        let union = UnionType::new("Favourite").member("Actor");
        let value = serde_json::json!({"__typename": "Actor", "name": "Brad"});
        assert_eq!((union.type_resolver)(&value).as_deref(), Some("Actor"));
        assert_eq!((union.type_resolver)(&serde_json::json!({})), None);
    }
}
