//! Execution planning.
//!
//! The [`RequestInterpreter`] binds one parsed [`Operation`] to the schema
//! model. Fields are checked against their parent types, fragments are
//! inlined, constant arguments are coerced, and selections on abstract types
//! are expanded into one branch per possible object type. Anything that
//! depends on variables is kept for the executor.

use crate::coercion::{coerce_input_value, coerce_literal};
use crate::error::PlanError;
use crate::model::{DirectiveLocation, FieldDef, SchemaLookup, SchemaModel, Type, TypeRef};
use crate::resolver::Resolver;
use graphex_syntax::ast::{self, OperationType};
use graphex_syntax::{Fragments, Operation};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Bound form of one operation.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub operation_name: Option<String>,
    pub kind: OperationType,
    pub root_type: String,
    pub variables: IndexMap<String, VariableDef>,
    pub selection: SelectionPlan,
}

/// A declared operation variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub ty: TypeRef,
    /// Coerced default value.
    pub default: Option<Value>,
}

/// Selections of one selection set, grouped by concrete object type.
#[derive(Debug, Clone, Default)]
pub struct SelectionPlan {
    pub branches: IndexMap<String, Vec<ExecutionNode>>,
}

impl SelectionPlan {
    /// Nodes that apply when the parent value is of `type_name`.
    pub fn nodes(&self, type_name: &str) -> &[ExecutionNode] {
        self.branches.get(type_name).map_or(&[], Vec::as_slice)
    }
}

/// One field to resolve.
#[derive(Debug, Clone)]
pub struct ExecutionNode {
    pub response_key: String,
    pub field_name: String,
    pub alias: Option<String>,
    pub parent_type: String,
    pub kind: NodeKind,
    pub return_type: TypeRef,
    /// Arguments in definition order.
    pub arguments: Vec<(String, ArgumentValue)>,
    /// Variable conditions. All must hold for the field to run.
    pub conditions: Vec<Condition>,
    pub children: Option<SelectionPlan>,
}

#[derive(Clone)]
pub enum NodeKind {
    Field { resolver: Option<Arc<dyn Resolver>> },
    TypeName,
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { resolver } => f
                .debug_struct("Field")
                .field("has_resolver", &resolver.is_some())
                .finish(),
            Self::TypeName => f.write_str("TypeName"),
        }
    }
}

/// Argument value of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Bound(Value),
    /// A literal referencing variables, coerced once they are known.
    Deferred {
        literal: ast::Value,
        ty: TypeRef,
        default: Option<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Skip,
    Include,
}

/// `@skip(if: $var)` or `@include(if: $var)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub variable: String,
}

impl Condition {
    /// Whether the field runs given the variable's value.
    #[must_use]
    pub fn holds(&self, value: Option<&Value>) -> bool {
        let flag = value.and_then(Value::as_bool).unwrap_or(false);
        match self.kind {
            ConditionKind::Skip => !flag,
            ConditionKind::Include => flag,
        }
    }
}

/// Builds execution plans for a schema.
#[derive(Debug, Clone)]
pub struct RequestInterpreter {
    model: Arc<SchemaModel>,
}

impl RequestInterpreter {
    pub fn new(model: Arc<SchemaModel>) -> Self {
        Self { model }
    }

    /// Binds `operation` to the schema. Never calls resolvers.
    pub fn create_execution_plan(&self, operation: &Operation) -> Result<ExecutionPlan, PlanError> {
        let model = self.model.as_ref();
        let (root, location) = match operation.kind {
            OperationType::Query => (model.query_type(), DirectiveLocation::Query),
            OperationType::Mutation => (
                model.mutation_type().ok_or(PlanError::NoMutationType)?,
                DirectiveLocation::Mutation,
            ),
            OperationType::Subscription => return Err(PlanError::SubscriptionNotSupported),
        };

        let mut variables = IndexMap::new();
        for definition in &operation.variables {
            let name = definition.name.value.clone();
            let ty = TypeRef::from(&definition.ty);
            if model.input_type_by_name(ty.inner_name()).is_none() {
                return Err(PlanError::InvalidVariableType {
                    name,
                    ty: ty.to_string(),
                });
            }
            let default = match &definition.default_value {
                Some(literal) => coerce_literal(model, &ty, literal, &|_: &str| None)
                    .map_err(|error| PlanError::InvalidVariableDefault {
                        name: name.clone(),
                        message: error.message,
                    })?,
                None => None,
            };
            variables.insert(name, VariableDef { ty, default });
        }

        let mut builder = PlanBuilder {
            model,
            fragments: &operation.fragments,
            variables: &variables,
            visiting: Vec::new(),
        };
        builder.check_directives(&operation.directives, location)?;
        let selection = builder.selection_set(&root.name, &operation.selection_set)?;

        tracing::debug!(
            operation = operation.display_name(),
            kind = %operation.kind,
            "built execution plan"
        );
        Ok(ExecutionPlan {
            operation_name: operation.name.clone(),
            kind: operation.kind,
            root_type: root.name.clone(),
            variables,
            selection,
        })
    }
}

struct PlanBuilder<'a> {
    model: &'a SchemaModel,
    fragments: &'a Fragments,
    variables: &'a IndexMap<String, VariableDef>,
    /// Fragments currently being inlined.
    visiting: Vec<String>,
}

impl<'a> PlanBuilder<'a> {
    fn selection_set(
        &mut self,
        scope: &str,
        set: &ast::SelectionSet,
    ) -> Result<SelectionPlan, PlanError> {
        let targets: Vec<String> = self
            .model
            .possible_types(scope)
            .into_iter()
            .map(|ty| ty.name.clone())
            .collect();
        let mut plan = SelectionPlan {
            branches: targets.iter().map(|name| (name.clone(), Vec::new())).collect(),
        };
        self.collect(scope, &targets, &mut plan, set, &[])?;
        Ok(plan)
    }

    /// Adds the selections of `set`, validated against `scope`, to the
    /// branches of every type in `targets`.
    fn collect(
        &mut self,
        scope: &str,
        targets: &[String],
        plan: &mut SelectionPlan,
        set: &ast::SelectionSet,
        conditions: &[Condition],
    ) -> Result<(), PlanError> {
        for selection in &set.selections {
            let location = match selection {
                ast::Selection::Field(_) => DirectiveLocation::Field,
                ast::Selection::FragmentSpread(_) => DirectiveLocation::FragmentSpread,
                ast::Selection::InlineFragment(_) => DirectiveLocation::InlineFragment,
            };
            let Some(local) = self.conditions(selection.directives(), location)? else {
                continue;
            };
            let mut merged = conditions.to_vec();
            merged.extend(local);
            let local = merged;

            match selection {
                ast::Selection::Field(field) => {
                    self.field(scope, targets, plan, field, local)?;
                }
                ast::Selection::FragmentSpread(spread) => {
                    let name = spread.name.as_str();
                    let fragments: &'a Fragments = self.fragments;
                    let fragment = fragments
                        .get(name)
                        .ok_or_else(|| PlanError::UnknownFragment(name.to_string()))?;
                    if self.visiting.iter().any(|visiting| visiting == name) {
                        return Err(PlanError::FragmentCycle(name.to_string()));
                    }
                    self.check_directives(&fragment.directives, DirectiveLocation::FragmentDefinition)?;

                    self.visiting.push(name.to_string());
                    let result = self.fragment(
                        scope,
                        targets,
                        plan,
                        Some(&fragment.type_condition),
                        &fragment.selection_set,
                        &local,
                    );
                    self.visiting.pop();
                    result?;
                }
                ast::Selection::InlineFragment(inline) => {
                    self.fragment(
                        scope,
                        targets,
                        plan,
                        inline.type_condition.as_ref(),
                        &inline.selection_set,
                        &local,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn fragment(
        &mut self,
        scope: &str,
        targets: &[String],
        plan: &mut SelectionPlan,
        condition: Option<&ast::Name>,
        set: &ast::SelectionSet,
        conditions: &[Condition],
    ) -> Result<(), PlanError> {
        let Some(condition) = condition else {
            return self.collect(scope, targets, plan, set, conditions);
        };
        let model: &'a SchemaModel = self.model;
        let name = condition.as_str();
        let ty = model
            .get(name)
            .ok_or_else(|| PlanError::UnknownTypeCondition(name.to_string()))?;
        if !ty.is_composite() {
            return Err(PlanError::InvalidTypeCondition(name.to_string()));
        }

        let possible = model.possible_types(name);
        let narrowed: Vec<String> = targets
            .iter()
            .filter(|target| possible.iter().any(|ty| &ty.name == *target))
            .cloned()
            .collect();
        if narrowed.is_empty() {
            return Err(PlanError::ImpossibleTypeCondition {
                condition: name.to_string(),
                parent: scope.to_string(),
            });
        }
        self.collect(ty.name(), &narrowed, plan, set, conditions)
    }

    fn field(
        &mut self,
        scope: &str,
        targets: &[String],
        plan: &mut SelectionPlan,
        field: &ast::Field,
        conditions: Vec<Condition>,
    ) -> Result<(), PlanError> {
        let name = field.name.as_str();
        let alias = field.alias.as_ref().map(|alias| alias.value.clone());

        if name == "__typename" {
            if field.selection_set.is_some() {
                return Err(PlanError::UnexpectedSelectionSet {
                    field: name.to_string(),
                    ty: "String!".to_string(),
                });
            }
            for target in targets {
                let node = ExecutionNode {
                    response_key: field.response_key().to_string(),
                    field_name: name.to_string(),
                    alias: alias.clone(),
                    parent_type: target.clone(),
                    kind: NodeKind::TypeName,
                    return_type: TypeRef::required("String"),
                    arguments: Vec::new(),
                    conditions: conditions.clone(),
                    children: None,
                };
                plan.branches.entry(target.clone()).or_default().push(node);
            }
            return Ok(());
        }

        let definition = self.field_definition(scope, name)?;
        let arguments = self.arguments(scope, definition, field)?;
        let model: &'a SchemaModel = self.model;
        let return_type = model.get(definition.ty.inner_name());
        let children = match (return_type.map(Type::is_composite), &field.selection_set) {
            (Some(true), Some(set)) => Some(self.selection_set(definition.ty.inner_name(), set)?),
            (Some(true), None) => {
                return Err(PlanError::MissingSelectionSet {
                    field: name.to_string(),
                    ty: definition.ty.to_string(),
                })
            }
            (_, Some(_)) => {
                return Err(PlanError::UnexpectedSelectionSet {
                    field: name.to_string(),
                    ty: definition.ty.to_string(),
                })
            }
            (_, None) => None,
        };

        for target in targets {
            // Concrete types carry the resolvers; interfaces only declare fields.
            let resolver = self
                .field_definition(target, name)
                .ok()
                .and_then(|concrete| concrete.resolver.clone())
                .or_else(|| definition.resolver.clone());
            let node = ExecutionNode {
                response_key: field.response_key().to_string(),
                field_name: name.to_string(),
                alias: alias.clone(),
                parent_type: target.clone(),
                kind: NodeKind::Field { resolver },
                return_type: definition.ty.clone(),
                arguments: arguments.clone(),
                conditions: conditions.clone(),
                children: children.clone(),
            };
            plan.branches.entry(target.clone()).or_default().push(node);
        }
        Ok(())
    }

    fn field_definition(&self, scope: &str, name: &str) -> Result<&'a FieldDef, PlanError> {
        let model: &'a SchemaModel = self.model;
        let unknown = || PlanError::UnknownField {
            parent: scope.to_string(),
            field: name.to_string(),
        };
        if scope == model.query_type().name {
            if let Some(meta) = model.meta_field(name) {
                return Ok(meta);
            }
        }
        model
            .get(scope)
            .and_then(Type::fields)
            .and_then(|fields| fields.get(name))
            .ok_or_else(unknown)
    }

    fn arguments(
        &self,
        parent: &str,
        definition: &FieldDef,
        field: &ast::Field,
    ) -> Result<Vec<(String, ArgumentValue)>, PlanError> {
        if let Some(unknown) = field
            .arguments
            .iter()
            .find(|argument| !definition.arguments.contains_key(argument.name.as_str()))
        {
            return Err(PlanError::UnknownArgument {
                parent: parent.to_string(),
                field: definition.name.clone(),
                argument: unknown.name.value.clone(),
            });
        }

        let mut arguments = Vec::with_capacity(definition.arguments.len());
        for (name, input) in &definition.arguments {
            let provided = field
                .arguments
                .iter()
                .find(|argument| argument.name.as_str() == name);
            match provided {
                Some(argument) if argument.value.has_variables() => {
                    self.check_variables(&argument.value)?;
                    arguments.push((
                        name.clone(),
                        ArgumentValue::Deferred {
                            literal: argument.value.clone(),
                            ty: input.ty.clone(),
                            default: input.default_value.clone(),
                        },
                    ));
                }
                Some(argument) => {
                    if let Some(value) =
                        coerce_literal(self.model, &input.ty, &argument.value, &|_: &str| None)?
                    {
                        arguments.push((name.clone(), ArgumentValue::Bound(value)));
                    }
                }
                None => match &input.default_value {
                    Some(default) => {
                        let value = coerce_input_value(self.model, &input.ty, default)?;
                        arguments.push((name.clone(), ArgumentValue::Bound(value)));
                    }
                    None if input.ty.is_non_null() => {
                        return Err(PlanError::MissingArgument {
                            parent: parent.to_string(),
                            field: definition.name.clone(),
                            argument: name.clone(),
                        });
                    }
                    None => {}
                },
            }
        }
        Ok(arguments)
    }

    /// Every variable referenced by `value` must be declared.
    fn check_variables(&self, value: &ast::Value) -> Result<(), PlanError> {
        match value {
            ast::Value::Variable(name) if !self.variables.contains_key(name.as_str()) => {
                Err(PlanError::UndefinedVariable(name.value.clone()))
            }
            ast::Value::List(items, _) => items.iter().try_for_each(|item| self.check_variables(item)),
            ast::Value::Object(fields, _) => fields
                .iter()
                .try_for_each(|(_, value)| self.check_variables(value)),
            _ => Ok(()),
        }
    }

    fn check_directives(
        &self,
        directives: &[ast::Directive],
        location: DirectiveLocation,
    ) -> Result<(), PlanError> {
        for directive in directives {
            let name = directive.name.as_str();
            let definition = self
                .model
                .directives()
                .get(name)
                .ok_or_else(|| PlanError::UnknownDirective(name.to_string()))?;
            if !definition.locations.contains(&location) {
                return Err(PlanError::MisplacedDirective {
                    directive: name.to_string(),
                    location: location.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Reads `@skip` / `@include`. `None` means a constant condition removed
    /// the selection.
    fn conditions(
        &self,
        directives: &[ast::Directive],
        location: DirectiveLocation,
    ) -> Result<Option<Vec<Condition>>, PlanError> {
        self.check_directives(directives, location)?;

        let mut conditions = Vec::new();
        for directive in directives {
            let kind = match directive.name.as_str() {
                "skip" => ConditionKind::Skip,
                "include" => ConditionKind::Include,
                _ => continue,
            };
            let value = directive
                .arguments
                .iter()
                .find(|argument| argument.name.as_str() == "if")
                .map(|argument| &argument.value);
            match value {
                Some(ast::Value::Boolean(flag, _)) => {
                    let keep = match kind {
                        ConditionKind::Skip => !flag,
                        ConditionKind::Include => *flag,
                    };
                    if !keep {
                        return Ok(None);
                    }
                }
                Some(ast::Value::Variable(variable)) => {
                    self.check_variables(&ast::Value::Variable(variable.clone()))?;
                    conditions.push(Condition {
                        kind,
                        variable: variable.value.clone(),
                    });
                }
                _ => return Err(PlanError::InvalidCondition(directive.name.value.clone())),
            }
        }
        Ok(Some(conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SchemaBuilder;
    use crate::model::{EnumType, InputValueDef, InterfaceType, ObjectType, UnionType};
    use graphex_syntax::parse_document;
    use serde_json::json;

    fn interpreter() -> RequestInterpreter {
        let model = SchemaBuilder::new()
            .enum_type(EnumType::with_values("Coolness", ["NOT_COOL", "COOL"]))
            .interface(InterfaceType::new("Person").field(FieldDef::new("name", TypeRef::required("String"))))
            .object(
                ObjectType::new("Actor")
                    .implements("Person")
                    .field(FieldDef::new("name", TypeRef::required("String")))
                    .field(FieldDef::new("age", TypeRef::named("Int"))),
            )
            .object(
                ObjectType::new("Director")
                    .implements("Person")
                    .field(FieldDef::new("name", TypeRef::required("String")))
                    .field(FieldDef::new("films", TypeRef::list(TypeRef::named("String")))),
            )
            .object(ObjectType::new("Scenario").field(FieldDef::new("content", TypeRef::named("String"))))
            .union(UnionType::new("Favourite").member("Actor").member("Scenario"))
            .query(
                FieldDef::new("cool", TypeRef::named("Coolness"))
                    .argument(InputValueDef::new("cool", TypeRef::required("Coolness"))),
            )
            .query(
                FieldDef::new("people", TypeRef::list(TypeRef::named("Person")))
                    .argument(InputValueDef::new("limit", TypeRef::named("Int")).default_value(json!(10))),
            )
            .query(FieldDef::new("favourite", TypeRef::named("Favourite")))
            .build()
            .unwrap();
        RequestInterpreter::new(Arc::new(model))
    }

    fn plan(query: &str) -> Result<ExecutionPlan, PlanError> {
        let operations = parse_document(query).unwrap();
        interpreter().create_execution_plan(&operations[0])
    }

    fn error(query: &str) -> String {
        plan(query).unwrap_err().to_string()
    }

    #[test]
    fn test_enum_argument_binding() {
        let plan = plan("{ cool(cool: COOL) }").unwrap();
        let node = &plan.selection.nodes("Query")[0];
        assert_eq!(node.arguments, [("cool".to_string(), ArgumentValue::Bound(json!("COOL")))]);

        insta::assert_snapshot!(
            error(r#"{ cool(cool: "COOL") }"#),
            @r#"String literal '"COOL"' is invalid value for enum type Coolness"#
        );
        insta::assert_snapshot!(
            error("{ cool }"),
            @"Missing value for non-nullable argument 'cool' on 'Query.cool'"
        );
    }

    #[test]
    fn test_defaults_and_deferred_arguments() {
        let plan = plan("query($limit: Int) { people(limit: $limit) { name } a: people { name } }").unwrap();
        let nodes = plan.selection.nodes("Query");
        assert!(matches!(nodes[0].arguments[0].1, ArgumentValue::Deferred { .. }));
        assert_eq!(nodes[1].arguments[0].1, ArgumentValue::Bound(json!(10)));
        assert_eq!(nodes[1].response_key, "a");
        assert_eq!(nodes[1].alias.as_deref(), Some("a"));
        assert_eq!(plan.variables["limit"].ty, TypeRef::named("Int"));
    }

    #[test]
    fn test_interface_branches() {
        let plan = plan("{ people { name ... on Director { films } ... on Actor { age } } }").unwrap();
        let children = plan.selection.nodes("Query")[0].children.as_ref().unwrap();
        let actor: Vec<_> = children.nodes("Actor").iter().map(|n| n.field_name.as_str()).collect();
        let director: Vec<_> = children.nodes("Director").iter().map(|n| n.field_name.as_str()).collect();
        assert_eq!(actor, ["name", "age"]);
        assert_eq!(director, ["name", "films"]);
    }

    #[test]
    fn test_union_fields() {
        let plan = plan("{ favourite { __typename ... on Scenario { content } } }").unwrap();
        let children = plan.selection.nodes("Query")[0].children.as_ref().unwrap();
        assert_eq!(children.nodes("Actor").len(), 1);
        assert!(matches!(children.nodes("Actor")[0].kind, NodeKind::TypeName));
        assert_eq!(children.nodes("Scenario").len(), 2);

        insta::assert_snapshot!(
            error("{ favourite { content } }"),
            @"Property 'content' on 'Favourite' does not exist"
        );
        insta::assert_snapshot!(
            error("{ favourite { ... on Director { name } } }"),
            @"Fragment on 'Director' can never apply to 'Favourite'"
        );
    }

    #[test]
    fn test_fragments() {
        let plan = plan("{ people { ...Names } } fragment Names on Person { name }").unwrap();
        let children = plan.selection.nodes("Query")[0].children.as_ref().unwrap();
        assert_eq!(children.nodes("Actor")[0].field_name, "name");

        insta::assert_snapshot!(error("{ people { ...Missing } }"), @"Fragment 'Missing' is not defined");
        insta::assert_snapshot!(
            error("{ people { ...A } } fragment A on Person { ...B } fragment B on Person { ...A }"),
            @"Fragment 'A' cannot spread itself"
        );
        insta::assert_snapshot!(
            error("{ people { ... on Coolness { name } } }"),
            @"Type condition 'Coolness' must be an object, interface or union type"
        );
    }

    #[test]
    fn test_conditions() {
        let plan = plan(
            "query($show: Boolean!) { cool(cool: COOL) @skip(if: true) people @include(if: $show) { name } }",
        )
        .unwrap();
        let nodes = plan.selection.nodes("Query");
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].conditions,
            [Condition {
                kind: ConditionKind::Include,
                variable: "show".to_string()
            }]
        );
        assert!(!nodes[0].conditions[0].holds(None));
        assert!(nodes[0].conditions[0].holds(Some(&json!(true))));

        insta::assert_snapshot!(error("{ cool(cool: COOL) @live }"), @"Directive '@live' is not defined");
        insta::assert_snapshot!(
            error("{ people @skip(if: $hide) { name } }"),
            @"Variable '$hide' is not defined"
        );
    }

    #[test]
    fn test_selection_set_shape() {
        insta::assert_snapshot!(
            error("{ people }"),
            @"Missing selection set on property 'people' of type '[Person]'"
        );
        insta::assert_snapshot!(
            error("{ cool(cool: COOL) { name } }"),
            @"Property 'cool' of type 'Coolness' is a leaf and cannot have a selection set"
        );
        insta::assert_snapshot!(
            error("{ people(first: 1) { name } }"),
            @"Property 'people' on 'Query' does not accept argument 'first'"
        );
    }

    #[test]
    fn test_roots() {
        assert_eq!(
            plan("mutation { cool(cool: COOL) }").unwrap_err(),
            PlanError::NoMutationType
        );
        assert_eq!(
            plan("subscription { cool(cool: COOL) }").unwrap_err(),
            PlanError::SubscriptionNotSupported
        );
    }

    #[test]
    fn test_variable_defaults() {
        let plan = plan("query($c: Coolness = COOL) { cool(cool: $c) }").unwrap();
        assert_eq!(plan.variables["c"].default, Some(json!("COOL")));

        insta::assert_snapshot!(
            error("query($c: Coolness = WARM) { cool(cool: $c) }"),
            @"Invalid default value for variable '$c': Invalid enum Coolness value 'WARM'. Expected one of [NOT_COOL, COOL]"
        );
        insta::assert_snapshot!(
            error("query($p: Person) { cool(cool: COOL) }"),
            @"Variable '$p' cannot be of non-input type 'Person'"
        );
    }

    #[test]
    fn test_meta_fields_on_query_root() {
        let plan = plan("{ __typename __schema { queryType { name } } }").unwrap();
        let nodes = plan.selection.nodes("Query");
        assert!(matches!(nodes[0].kind, NodeKind::TypeName));
        assert_eq!(nodes[1].field_name, "__schema");

        insta::assert_snapshot!(
            error("{ favourite { ... on Actor { __schema { queryType { name } } } } }"),
            @"Property '__schema' on 'Actor' does not exist"
        );
    }
}
