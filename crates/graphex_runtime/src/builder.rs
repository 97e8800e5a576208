//! Schema builder.
//!
//! Collects type definitions, registers the built-in scalars, directives and
//! introspection types, and validates the result into an immutable
//! [`SchemaModel`].

use crate::coercion::coerce_input_value;
use crate::error::SchemaError;
use crate::introspection;
use crate::model::{
    DirectiveDef, DirectiveLocation, EnumType, FieldDef, InputObjectType, InputValueDef,
    InterfaceType, ObjectType, ScalarType, SchemaModel, Type, TypeRef, UnionType,
};
use crate::scalar::{BuiltinCoercion, ScalarDefinition, ScalarKind};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Built-in scalars: name, raw kind, native identifier, public duplicate.
const BUILTIN_SCALARS: [(&str, ScalarKind, Option<&str>, Option<&str>); 8] = [
    ("Int", ScalarKind::Int, Some("i32"), None),
    ("Long", ScalarKind::Long, Some("i64"), None),
    ("Short", ScalarKind::Short, Some("i16"), None),
    ("Float", ScalarKind::Float, Some("f64"), None),
    ("Float32", ScalarKind::Float32, Some("f32"), Some("Float")),
    ("String", ScalarKind::String, Some("String"), None),
    ("Boolean", ScalarKind::Boolean, Some("bool"), None),
    ("ID", ScalarKind::Id, None, None),
];

/// Schema builder.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: Vec<Type>,
    scalars: Vec<ScalarDefinition>,
    query: Option<ObjectType>,
    query_fields: Vec<FieldDef>,
    mutation: Option<ObjectType>,
    mutation_fields: Vec<FieldDef>,
    directives: Vec<DirectiveDef>,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query root type. Fields added with [`query`](Self::query)
    /// are appended to it.
    #[must_use]
    pub fn query_type(mut self, ty: ObjectType) -> Self {
        self.query = Some(ty);
        self
    }

    /// Adds a query root field.
    #[must_use]
    pub fn query(mut self, field: FieldDef) -> Self {
        self.query_fields.push(field);
        self
    }

    /// Sets the mutation root type.
    #[must_use]
    pub fn mutation_type(mut self, ty: ObjectType) -> Self {
        self.mutation = Some(ty);
        self
    }

    /// Adds a mutation root field.
    #[must_use]
    pub fn mutation(mut self, field: FieldDef) -> Self {
        self.mutation_fields.push(field);
        self
    }

    #[must_use]
    pub fn object(mut self, ty: ObjectType) -> Self {
        self.types.push(Type::Object(ty));
        self
    }

    #[must_use]
    pub fn interface(mut self, ty: InterfaceType) -> Self {
        self.types.push(Type::Interface(ty));
        self
    }

    #[must_use]
    pub fn union(mut self, ty: UnionType) -> Self {
        self.types.push(Type::Union(ty));
        self
    }

    #[must_use]
    pub fn enum_type(mut self, ty: EnumType) -> Self {
        self.types.push(Type::Enum(ty));
        self
    }

    #[must_use]
    pub fn input_object(mut self, ty: InputObjectType) -> Self {
        self.types.push(Type::InputObject(ty));
        self
    }

    #[must_use]
    pub fn scalar(mut self, definition: ScalarDefinition) -> Self {
        self.scalars.push(definition);
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: DirectiveDef) -> Self {
        self.directives.push(directive);
        self
    }

    /// Validates the definitions and builds the model.
    pub fn build(self) -> Result<SchemaModel, SchemaError> {
        let mut types: IndexMap<String, Type> = IndexMap::new();
        let mut register = |ty: Type| -> Result<(), SchemaError> {
            if types.contains_key(ty.name()) {
                return Err(SchemaError::DuplicateType(ty.name().to_string()));
            }
            types.insert(ty.name().to_string(), ty);
            Ok(())
        };

        for (name, kind, native, duplicate_of) in BUILTIN_SCALARS {
            register(Type::Scalar(ScalarType {
                name: name.to_string(),
                description: None,
                coercion: Arc::new(BuiltinCoercion(kind)),
                native: native.map(str::to_owned),
                duplicate_of: duplicate_of.map(str::to_owned),
                introspected: true,
            }))?;
        }
        for definition in self.scalars {
            let name = definition.name.clone();
            let description = definition.description.clone();
            let native = definition.native.clone();
            let introspected = definition.introspected;
            register(Type::Scalar(ScalarType {
                name,
                description,
                coercion: definition.into_coercion()?,
                native,
                duplicate_of: None,
                introspected,
            }))?;
        }
        for ty in self.types {
            register(ty)?;
        }
        for ty in introspection::meta_types() {
            register(ty)?;
        }

        let query = root_type(self.query, "Query", self.query_fields)
            .ok_or_else(|| SchemaError::EmptyType("Query".to_string()))?;
        let query_name = query.name.clone();
        if query.fields.is_empty() {
            return Err(SchemaError::EmptyType(query_name));
        }
        register(Type::Object(query))?;

        let mutation_name = match root_type(self.mutation, "Mutation", self.mutation_fields) {
            Some(mutation) if mutation.fields.is_empty() => {
                return Err(SchemaError::EmptyType(mutation.name));
            }
            Some(mutation) => {
                let name = mutation.name.clone();
                register(Type::Object(mutation))?;
                Some(name)
            }
            None => None,
        };

        let mut directives: IndexMap<String, DirectiveDef> = IndexMap::new();
        for directive in builtin_directives().into_iter().chain(self.directives) {
            if directives.contains_key(&directive.name) {
                return Err(SchemaError::DuplicateType(format!("@{}", directive.name)));
            }
            directives.insert(directive.name.clone(), directive);
        }

        validate_references(&types, &directives)?;
        let (output_natives, input_natives) = native_indices(&types)?;

        let mut implementations: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for ty in types.values() {
            if let Type::Object(object) = ty {
                for interface in &object.interfaces {
                    implementations
                        .entry(interface.clone())
                        .or_default()
                        .push(object.name.clone());
                }
            }
        }

        let names_of = |predicate: fn(&Type) -> bool| -> Vec<String> {
            types
                .values()
                .filter(|ty| predicate(ty))
                .map(|ty| ty.name().to_string())
                .collect()
        };
        let enums = names_of(|ty| matches!(ty, Type::Enum(_)));
        let scalars = names_of(|ty| matches!(ty, Type::Scalar(_)));
        let unions = names_of(|ty| matches!(ty, Type::Union(_)));

        let mut introspected: Vec<String> = types
            .values()
            .filter(|ty| ty.is_introspected())
            .map(|ty| ty.name().to_string())
            .collect();
        for root in mutation_name.iter().chain(std::iter::once(&query_name)) {
            if !introspected.contains(root) {
                introspected.push(root.clone());
            }
        }

        let model = SchemaModel {
            types,
            query: query_name,
            mutation: mutation_name,
            enums,
            scalars,
            unions,
            output_natives,
            input_natives,
            directives,
            implementations,
            introspected,
            meta_fields: introspection::meta_fields(),
        };
        validate_defaults(&model)?;

        tracing::debug!(
            types = model.types.len(),
            directives = model.directives.len(),
            "built schema model"
        );
        Ok(model)
    }
}

/// Merges root fields into the declared root type, or a default one.
fn root_type(declared: Option<ObjectType>, name: &str, fields: Vec<FieldDef>) -> Option<ObjectType> {
    if declared.is_none() && fields.is_empty() {
        return None;
    }
    let root = declared.unwrap_or_else(|| ObjectType::new(name));
    Some(fields.into_iter().fold(root, ObjectType::field))
}

fn builtin_directives() -> Vec<DirectiveDef> {
    use DirectiveLocation::{EnumValue, Field, FieldDefinition, FragmentSpread, InlineFragment};

    let condition = |name: &str, description: &str| {
        DirectiveDef::new(name, &[Field, FragmentSpread, InlineFragment])
            .description(description)
            .argument(InputValueDef::new("if", TypeRef::required("Boolean")))
    };
    vec![
        condition(
            "include",
            "Directs the executor to include this field or fragment only when the `if` argument is true.",
        ),
        condition(
            "skip",
            "Directs the executor to skip this field or fragment when the `if` argument is true.",
        ),
        DirectiveDef::new("deprecated", &[FieldDefinition, EnumValue])
            .description("Marks an element of a GraphQL schema as no longer supported.")
            .argument(
                InputValueDef::new("reason", TypeRef::named("String"))
                    .default_value(serde_json::json!("No longer supported")),
            ),
    ]
}

fn check_output(types: &IndexMap<String, Type>, ty: &TypeRef, location: String) -> Result<(), SchemaError> {
    match types.get(ty.inner_name()) {
        None => Err(SchemaError::UnknownType {
            name: ty.inner_name().to_string(),
            location,
        }),
        Some(found) if !found.is_output() => Err(SchemaError::NotOutputType {
            name: found.name().to_string(),
            location,
        }),
        Some(_) => Ok(()),
    }
}

fn check_input(types: &IndexMap<String, Type>, ty: &TypeRef, location: String) -> Result<(), SchemaError> {
    match types.get(ty.inner_name()) {
        None => Err(SchemaError::UnknownType {
            name: ty.inner_name().to_string(),
            location,
        }),
        Some(found) if !found.is_input() => Err(SchemaError::NotInputType {
            name: found.name().to_string(),
            location,
        }),
        Some(_) => Ok(()),
    }
}

fn check_fields(
    types: &IndexMap<String, Type>,
    owner: &str,
    fields: &IndexMap<String, FieldDef>,
) -> Result<(), SchemaError> {
    for field in fields.values() {
        check_output(types, &field.ty, format!("field '{owner}.{}'", field.name))?;
        for argument in field.arguments.values() {
            check_input(
                types,
                &argument.ty,
                format!("argument '{owner}.{}({})'", field.name, argument.name),
            )?;
        }
    }
    Ok(())
}

fn validate_references(
    types: &IndexMap<String, Type>,
    directives: &IndexMap<String, DirectiveDef>,
) -> Result<(), SchemaError> {
    for ty in types.values() {
        match ty {
            Type::Object(object) => {
                check_fields(types, &object.name, &object.fields)?;
                for interface in &object.interfaces {
                    let Some(Type::Interface(interface)) = types.get(interface) else {
                        return Err(SchemaError::NotAnInterface {
                            object: object.name.clone(),
                            interface: interface.clone(),
                        });
                    };
                    if let Some(missing) = interface
                        .fields
                        .keys()
                        .find(|name| !object.fields.contains_key(*name))
                    {
                        return Err(SchemaError::MissingInterfaceField {
                            object: object.name.clone(),
                            interface: interface.name.clone(),
                            field: missing.clone(),
                        });
                    }
                }
            }
            Type::Interface(interface) => {
                if interface.fields.is_empty() {
                    return Err(SchemaError::EmptyType(interface.name.clone()));
                }
                check_fields(types, &interface.name, &interface.fields)?;
            }
            Type::Union(union) => {
                if union.members.is_empty() {
                    return Err(SchemaError::EmptyType(union.name.clone()));
                }
                for member in &union.members {
                    if !matches!(types.get(member), Some(Type::Object(_))) {
                        return Err(SchemaError::InvalidUnionMember {
                            union: union.name.clone(),
                            member: member.clone(),
                        });
                    }
                }
            }
            Type::Enum(enum_type) if enum_type.values.is_empty() => {
                return Err(SchemaError::EmptyType(enum_type.name.clone()));
            }
            Type::InputObject(input) => {
                for field in input.fields.values() {
                    check_input(types, &field.ty, format!("input field '{}.{}'", input.name, field.name))?;
                }
            }
            Type::Enum(_) | Type::Scalar(_) => {}
        }
    }

    for directive in directives.values() {
        for argument in directive.arguments.values() {
            check_input(
                types,
                &argument.ty,
                format!("argument '@{}({})'", directive.name, argument.name),
            )?;
        }
    }
    Ok(())
}

type NativeIndex = FxHashMap<String, String>;

/// Builds the output and input native-identity indices.
fn native_indices(types: &IndexMap<String, Type>) -> Result<(NativeIndex, NativeIndex), SchemaError> {
    fn bind(index: &mut NativeIndex, native: &str, name: &str) -> Result<(), SchemaError> {
        if let Some(first) = index.get(native) {
            return Err(SchemaError::DuplicateNativeType {
                native: native.to_string(),
                first: first.clone(),
                second: name.to_string(),
            });
        }
        index.insert(native.to_string(), name.to_string());
        Ok(())
    }

    let mut output = NativeIndex::default();
    let mut input = NativeIndex::default();
    for ty in types.values() {
        let Some(native) = ty.native() else { continue };
        if ty.is_output() {
            bind(&mut output, native, ty.name())?;
        }
        if ty.is_input() {
            bind(&mut input, native, ty.name())?;
        }
    }
    Ok((output, input))
}

/// Checks every declared default value against its type.
fn validate_defaults(model: &SchemaModel) -> Result<(), SchemaError> {
    let check = |value: &InputValueDef, location: String| -> Result<(), SchemaError> {
        match &value.default_value {
            Some(default) => coerce_input_value(model, &value.ty, default)
                .map(|_| ())
                .map_err(|error| SchemaError::InvalidDefaultValue {
                    location,
                    message: error.message,
                }),
            None => Ok(()),
        }
    };

    for ty in model.types.values() {
        if let Some(fields) = ty.fields() {
            for field in fields.values() {
                for argument in field.arguments.values() {
                    check(
                        argument,
                        format!("argument '{}.{}({})'", ty.name(), field.name, argument.name),
                    )?;
                }
            }
        }
        if let Type::InputObject(input) = ty {
            for field in input.fields.values() {
                check(field, format!("input field '{}.{}'", input.name, field.name))?;
            }
        }
    }
    for directive in model.directives.values() {
        for argument in directive.arguments.values() {
            check(argument, format!("argument '@{}({})'", directive.name, argument.name))?;
        }
    }
    Ok(())
}
