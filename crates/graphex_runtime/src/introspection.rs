//! Introspection types and the `__schema` / `__type` meta fields.
//!
//! Introspection values are plain JSON objects. A `__Type` value carries its
//! `kind`, `name` and `ofType`; the remaining `__Type` fields are resolved on
//! demand from the schema model by looking the type up by name.

use crate::model::{
    DirectiveDef, DirectiveLocation, EnumType, EnumValueDef, FieldDef, InputValueDef,
    ObjectType, SchemaLookup, SchemaModel, Type, TypeKind, TypeRef,
};
use crate::resolver::{ResolverArgs, ResolverContext, ResolverResult};
use indexmap::IndexMap;
use serde_json::{json, Value};

/// `__Type` value of a named type.
pub(crate) fn named_ref(ty: &Type) -> Value {
    json!({ "kind": ty.kind().as_str(), "name": ty.public_name() })
}

/// `__Type` value of a possibly wrapped type reference.
pub(crate) fn type_ref(model: &SchemaModel, ty: &TypeRef) -> Value {
    match ty {
        TypeRef::Named(name) => model.get(name).map_or(Value::Null, named_ref),
        TypeRef::List(inner) => wrapper(TypeKind::List, type_ref(model, inner)),
        TypeRef::NonNull(inner) => wrapper(TypeKind::NonNull, type_ref(model, inner)),
    }
}

fn wrapper(kind: TypeKind, of_type: Value) -> Value {
    json!({ "kind": kind.as_str(), "name": null, "ofType": of_type })
}

/// Writes an input value back as a GraphQL literal.
pub(crate) fn graphql_literal(model: &SchemaModel, ty: &TypeRef, value: &Value) -> String {
    match (ty, value) {
        (TypeRef::NonNull(inner), _) => graphql_literal(model, inner, value),
        (TypeRef::List(inner), Value::Array(items)) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| graphql_literal(model, inner, item))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        (TypeRef::List(inner), _) => graphql_literal(model, inner, value),
        (TypeRef::Named(name), Value::String(symbol))
            if matches!(model.get(name), Some(Type::Enum(_))) =>
        {
            symbol.clone()
        }
        (TypeRef::Named(name), Value::Object(fields)) => {
            let definitions = match model.get(name) {
                Some(Type::InputObject(input)) => Some(&input.fields),
                _ => None,
            };
            let fields = fields
                .iter()
                .map(|(key, value)| match definitions.and_then(|defs| defs.get(key)) {
                    Some(definition) => {
                        format!("{key}: {}", graphql_literal(model, &definition.ty, value))
                    }
                    None => format!("{key}: {value}"),
                })
                .collect::<Vec<_>>();
            format!("{{{}}}", fields.join(", "))
        }
        (_, value) => value.to_string(),
    }
}

fn input_value(model: &SchemaModel, value: &InputValueDef) -> Value {
    json!({
        "name": value.name,
        "description": value.description,
        "type": type_ref(model, &value.ty),
        "defaultValue": value
            .default_value
            .as_ref()
            .map(|default| graphql_literal(model, &value.ty, default)),
    })
}

fn field(model: &SchemaModel, field: &FieldDef) -> Value {
    json!({
        "name": field.name,
        "description": field.description,
        "args": field
            .arguments
            .values()
            .map(|argument| input_value(model, argument))
            .collect::<Vec<_>>(),
        "type": type_ref(model, &field.ty),
        "isDeprecated": field.is_deprecated(),
        "deprecationReason": field.deprecation_reason,
    })
}

fn enum_value(value: &EnumValueDef) -> Value {
    json!({
        "name": value.name,
        "description": value.description,
        "isDeprecated": value.deprecation_reason.is_some(),
        "deprecationReason": value.deprecation_reason,
    })
}

fn directive(model: &SchemaModel, directive: &DirectiveDef) -> Value {
    json!({
        "name": directive.name,
        "description": directive.description,
        "locations": directive
            .locations
            .iter()
            .map(|location| location.as_str())
            .collect::<Vec<_>>(),
        "args": directive
            .arguments
            .values()
            .map(|argument| input_value(model, argument))
            .collect::<Vec<_>>(),
        "isRepeatable": false,
    })
}

/// The `__Schema` value of a model.
pub(crate) fn schema_value(model: &SchemaModel) -> Value {
    json!({
        "description": null,
        "types": model
            .introspected_types()
            .into_iter()
            .map(named_ref)
            .collect::<Vec<_>>(),
        "queryType": { "kind": TypeKind::Object.as_str(), "name": model.query_type().name },
        "mutationType": model
            .mutation
            .as_deref()
            .and_then(|name| model.get(name))
            .map_or(Value::Null, named_ref),
        "subscriptionType": null,
        "directives": model
            .directives()
            .values()
            .map(|definition| directive(model, definition))
            .collect::<Vec<_>>(),
    })
}

/// Resolves a `__Type` field from the type named by the parent value.
fn with_type(
    ctx: &ResolverContext,
    parent: &Value,
    f: impl FnOnce(&SchemaModel, &Type) -> Value,
) -> ResolverResult {
    let schema: &SchemaModel = ctx.schema();
    Ok(parent
        .get("name")
        .and_then(Value::as_str)
        .and_then(|name| schema.get(name))
        .map_or(Value::Null, |ty| f(schema, ty)))
}

fn include_deprecated(args: &ResolverArgs) -> bool {
    args.get_as::<bool>("includeDeprecated").unwrap_or(false)
}

fn type_fields(parent: &Value, args: &ResolverArgs, ctx: &ResolverContext) -> ResolverResult {
    let include_deprecated = include_deprecated(args);
    with_type(ctx, parent, |model, ty| match ty.fields() {
        Some(fields) => Value::Array(
            fields
                .values()
                .filter(|definition| include_deprecated || !definition.is_deprecated())
                .map(|definition| field(model, definition))
                .collect(),
        ),
        None => Value::Null,
    })
}

fn type_interfaces(parent: &Value, _args: &ResolverArgs, ctx: &ResolverContext) -> ResolverResult {
    with_type(ctx, parent, |model, ty| match ty {
        Type::Object(object) => Value::Array(
            object
                .interfaces
                .iter()
                .filter_map(|name| model.get(name))
                .map(named_ref)
                .collect(),
        ),
        Type::Interface(_) => Value::Array(Vec::new()),
        _ => Value::Null,
    })
}

fn type_possible_types(parent: &Value, _args: &ResolverArgs, ctx: &ResolverContext) -> ResolverResult {
    with_type(ctx, parent, |model, ty| match ty {
        Type::Interface(_) | Type::Union(_) => Value::Array(
            model
                .possible_types(ty.name())
                .into_iter()
                .map(|object| json!({ "kind": TypeKind::Object.as_str(), "name": object.name }))
                .collect(),
        ),
        _ => Value::Null,
    })
}

fn type_enum_values(parent: &Value, args: &ResolverArgs, ctx: &ResolverContext) -> ResolverResult {
    let include_deprecated = include_deprecated(args);
    with_type(ctx, parent, |_, ty| match ty {
        Type::Enum(enum_type) => Value::Array(
            enum_type
                .values
                .values()
                .filter(|value| include_deprecated || value.deprecation_reason.is_none())
                .map(enum_value)
                .collect(),
        ),
        _ => Value::Null,
    })
}

fn type_input_fields(parent: &Value, _args: &ResolverArgs, ctx: &ResolverContext) -> ResolverResult {
    with_type(ctx, parent, |model, ty| match ty {
        Type::InputObject(input) => Value::Array(
            input
                .fields
                .values()
                .map(|definition| input_value(model, definition))
                .collect(),
        ),
        _ => Value::Null,
    })
}

fn type_description(parent: &Value, _args: &ResolverArgs, ctx: &ResolverContext) -> ResolverResult {
    with_type(ctx, parent, |_, ty| json!(ty.description()))
}

fn include_deprecated_argument() -> InputValueDef {
    InputValueDef::new("includeDeprecated", TypeRef::named("Boolean")).default_value(json!(false))
}

fn list_of(name: &str) -> TypeRef {
    TypeRef::list(TypeRef::required(name))
}

fn required_list_of(name: &str) -> TypeRef {
    TypeRef::non_null(list_of(name))
}

/// The introspection meta types. None of them is listed by `__schema`.
pub(crate) fn meta_types() -> Vec<Type> {
    let string = || TypeRef::named("String");

    let schema = ObjectType::new("__Schema")
        .not_introspected()
        .field(FieldDef::new("description", string()))
        .field(FieldDef::new("types", required_list_of("__Type")))
        .field(FieldDef::new("queryType", TypeRef::required("__Type")))
        .field(FieldDef::new("mutationType", TypeRef::named("__Type")))
        .field(FieldDef::new("subscriptionType", TypeRef::named("__Type")))
        .field(FieldDef::new("directives", required_list_of("__Directive")));

    let ty = ObjectType::new("__Type")
        .not_introspected()
        .field(FieldDef::new("kind", TypeRef::required("__TypeKind")))
        .field(FieldDef::new("name", string()))
        .field(FieldDef::new("description", string()).resolve_fn(type_description))
        .field(
            FieldDef::new("fields", list_of("__Field"))
                .argument(include_deprecated_argument())
                .resolve_fn(type_fields),
        )
        .field(FieldDef::new("interfaces", list_of("__Type")).resolve_fn(type_interfaces))
        .field(FieldDef::new("possibleTypes", list_of("__Type")).resolve_fn(type_possible_types))
        .field(
            FieldDef::new("enumValues", list_of("__EnumValue"))
                .argument(include_deprecated_argument())
                .resolve_fn(type_enum_values),
        )
        .field(FieldDef::new("inputFields", list_of("__InputValue")).resolve_fn(type_input_fields))
        .field(FieldDef::new("ofType", TypeRef::named("__Type")))
        .field(FieldDef::new("specifiedByURL", string()));

    let field = ObjectType::new("__Field")
        .not_introspected()
        .field(FieldDef::new("name", TypeRef::required("String")))
        .field(FieldDef::new("description", string()))
        .field(FieldDef::new("args", required_list_of("__InputValue")))
        .field(FieldDef::new("type", TypeRef::required("__Type")))
        .field(FieldDef::new("isDeprecated", TypeRef::required("Boolean")))
        .field(FieldDef::new("deprecationReason", string()));

    let input_value = ObjectType::new("__InputValue")
        .not_introspected()
        .field(FieldDef::new("name", TypeRef::required("String")))
        .field(FieldDef::new("description", string()))
        .field(FieldDef::new("type", TypeRef::required("__Type")))
        .field(FieldDef::new("defaultValue", string()));

    let enum_value = ObjectType::new("__EnumValue")
        .not_introspected()
        .field(FieldDef::new("name", TypeRef::required("String")))
        .field(FieldDef::new("description", string()))
        .field(FieldDef::new("isDeprecated", TypeRef::required("Boolean")))
        .field(FieldDef::new("deprecationReason", string()));

    let directive = ObjectType::new("__Directive")
        .not_introspected()
        .field(FieldDef::new("name", TypeRef::required("String")))
        .field(FieldDef::new("description", string()))
        .field(FieldDef::new("locations", required_list_of("__DirectiveLocation")))
        .field(FieldDef::new("args", required_list_of("__InputValue")))
        .field(FieldDef::new("isRepeatable", TypeRef::required("Boolean")));

    let type_kind =
        EnumType::with_values("__TypeKind", TypeKind::ALL.map(TypeKind::as_str)).not_introspected();
    let directive_location = EnumType::with_values(
        "__DirectiveLocation",
        DirectiveLocation::ALL.map(DirectiveLocation::as_str),
    )
    .not_introspected();

    vec![
        Type::Object(schema),
        Type::Object(ty),
        Type::Object(field),
        Type::Object(input_value),
        Type::Object(enum_value),
        Type::Object(directive),
        Type::Enum(type_kind),
        Type::Enum(directive_location),
    ]
}

/// The `__schema` and `__type` fields of the query root.
pub(crate) fn meta_fields() -> IndexMap<String, FieldDef> {
    let schema = FieldDef::new("__schema", TypeRef::required("__Schema"))
        .description("Access the current type schema of this server.")
        .resolve_fn(|_, _, ctx| Ok(schema_value(ctx.schema())));
    let ty = FieldDef::new("__type", TypeRef::named("__Type"))
        .description("Request the type information of a single type.")
        .argument(InputValueDef::new("name", TypeRef::required("String")))
        .resolve_fn(|_, args, ctx| {
            let name: String = args.require("name")?;
            Ok(ctx.schema().get(&name).map_or(Value::Null, named_ref))
        });

    [schema, ty]
        .into_iter()
        .map(|field| (field.name.clone(), field))
        .collect()
}
