//! Plan execution.
//!
//! The fields of one selection set are resolved concurrently by joining their
//! futures in the caller's task, and the result map is assembled in selection
//! order. Failed fields record an error and become null. A null in a non-null
//! position bubbles up to the nearest nullable ancestor.

use crate::coercion::{coerce_literal, serialize_leaf};
use crate::config::ExecutorConfig;
use crate::error::{CoercionError, ExecutionError};
use crate::model::{SchemaModel, Type, TypeRef};
use crate::plan::{ArgumentValue, ExecutionNode, ExecutionPlan, NodeKind, SelectionPlan};
use crate::resolver::{
    Context, DefaultResolver, RequestScope, Resolver, ResolverArgs, ResolverContext,
};
use crate::response::{FieldError, PathSegment, Response};
use crate::scope::ExecutionScope;
use crate::variables::Variables;
use futures::future::{join_all, BoxFuture};
use futures::stream::{self, StreamExt};
use graphex_syntax::OperationType;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

static DEFAULT_RESOLVER: DefaultResolver = DefaultResolver;

/// Executes plans against a schema model.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    model: Arc<SchemaModel>,
    config: ExecutorConfig,
}

impl RequestExecutor {
    pub fn new(model: Arc<SchemaModel>, config: ExecutorConfig) -> Self {
        Self { model, config }
    }

    /// Runs `plan` to completion or until `scope` is cancelled.
    ///
    /// Variable coercion failures are request errors and come back as a
    /// response with `data: null`.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        context: Context,
        scope: &ExecutionScope,
    ) -> Result<Response, ExecutionError> {
        if scope.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let values = match variables.coerce(&self.model, &plan.variables) {
            Ok(values) => values,
            Err(error) => {
                tracing::debug!(%error, "variable coercion failed");
                return Ok(Response::request_error(&error));
            }
        };

        let ctx = ExecutionContext {
            model: &self.model,
            config: &self.config,
            request: Arc::new(RequestScope {
                context,
                scope_name: scope.name().map(str::to_owned),
                schema: Arc::clone(&self.model),
            }),
            variables: values,
            errors: Mutex::new(Vec::new()),
        };

        let serial = plan.kind == OperationType::Mutation && self.config.serial_mutations;
        let root = Value::Null;
        let data = {
            let run = ctx.execute_selection(
                &plan.root_type,
                &root,
                vec![&plan.selection],
                Vec::new(),
                serial,
            );
            tokio::select! {
                biased;
                () = scope.cancellation().cancelled() => return Err(ExecutionError::Cancelled),
                data = run => data,
            }
        };

        Ok(Response::new(
            data.unwrap_or(Value::Null),
            ctx.errors.into_inner(),
        ))
    }
}

/// A null reached a non-null position. Its error is already recorded.
#[derive(Debug, Clone, Copy)]
struct NullBubble;

type Completion<'s> = BoxFuture<'s, Result<Value, NullBubble>>;
type FieldCompletion<'s> = BoxFuture<'s, (&'s str, Result<Value, NullBubble>)>;

struct ExecutionContext<'e> {
    model: &'e SchemaModel,
    config: &'e ExecutorConfig,
    request: Arc<RequestScope>,
    variables: IndexMap<String, Value>,
    errors: Mutex<Vec<FieldError>>,
}

impl ExecutionContext<'_> {
    fn execute_selection<'s>(
        &'s self,
        type_name: &'s str,
        parent: &'s Value,
        plans: Vec<&'s SelectionPlan>,
        path: Vec<PathSegment>,
        serial: bool,
    ) -> Completion<'s> {
        Box::pin(async move {
            // Fields sharing a response key are merged, first one wins.
            let mut groups: IndexMap<&'s str, Vec<&'s ExecutionNode>> = IndexMap::new();
            for &plan in &plans {
                for node in plan.nodes(type_name) {
                    if self.is_included(node) {
                        groups.entry(node.response_key.as_str()).or_default().push(node);
                    }
                }
            }

            let results = if serial {
                let mut results = Vec::with_capacity(groups.len());
                for (key, nodes) in groups {
                    let value = self.execute_field(nodes, parent, path.clone()).await;
                    results.push((key, value));
                }
                results
            } else {
                let mut fields: Vec<FieldCompletion<'s>> = Vec::with_capacity(groups.len());
                for (key, nodes) in groups {
                    let field = self.execute_field(nodes, parent, path.clone());
                    fields.push(Box::pin(async move { (key, field.await) }));
                }
                match self.config.max_concurrent_fields {
                    Some(limit) => {
                        stream::iter(fields)
                            .buffered(limit.max(1))
                            .collect::<Vec<_>>()
                            .await
                    }
                    None => join_all(fields).await,
                }
            };

            let mut map = Map::with_capacity(results.len());
            for (key, value) in results {
                map.insert(key.to_string(), value?);
            }
            Ok(Value::Object(map))
        })
    }

    fn execute_field<'s>(
        &'s self,
        nodes: Vec<&'s ExecutionNode>,
        parent: &'s Value,
        mut path: Vec<PathSegment>,
    ) -> Completion<'s> {
        Box::pin(async move {
            let node = nodes[0];
            path.push(PathSegment::Field(node.response_key.clone()));

            let resolver: &dyn Resolver = match &node.kind {
                NodeKind::TypeName => return Ok(Value::String(node.parent_type.clone())),
                NodeKind::Field { resolver } => resolver.as_deref().unwrap_or(&DEFAULT_RESOLVER),
            };

            let args = match self.bind_arguments(node) {
                Ok(args) => args,
                Err(error) => return self.fail(&node.return_type, path, error.message),
            };
            let ctx = ResolverContext::new(
                Arc::clone(&self.request),
                node.field_name.clone(),
                node.parent_type.clone(),
                path.clone(),
            );
            let value = match resolver.resolve(parent, &args, &ctx).await {
                Ok(value) => value,
                Err(error) => return self.fail(&node.return_type, path, error.to_string()),
            };

            let children: Vec<&SelectionPlan> =
                nodes.iter().filter_map(|node| node.children.as_ref()).collect();
            self.complete_value(node, &node.return_type, &value, children, path)
                .await
        })
    }

    /// Completes `value` for a position of type `ty`.
    fn complete_value<'s>(
        &'s self,
        node: &'s ExecutionNode,
        ty: &'s TypeRef,
        value: &'s Value,
        children: Vec<&'s SelectionPlan>,
        path: Vec<PathSegment>,
    ) -> Completion<'s> {
        Box::pin(async move {
            match ty {
                TypeRef::NonNull(inner) => {
                    if value.is_null() {
                        self.record(
                            format!(
                                "Cannot return null for non-nullable field {}.{}",
                                node.parent_type, node.field_name
                            ),
                            path,
                        );
                        return Err(NullBubble);
                    }
                    self.complete_inner(node, inner, value, children, path).await
                }
                _ if value.is_null() => Ok(Value::Null),
                _ => Ok(self
                    .complete_inner(node, ty, value, children, path)
                    .await
                    .unwrap_or(Value::Null)),
            }
        })
    }

    /// Completes a non-null `value`. Bubbles are not caught here.
    fn complete_inner<'s>(
        &'s self,
        node: &'s ExecutionNode,
        ty: &'s TypeRef,
        value: &'s Value,
        children: Vec<&'s SelectionPlan>,
        path: Vec<PathSegment>,
    ) -> Completion<'s> {
        Box::pin(async move {
            let name = match ty {
                TypeRef::NonNull(_) => {
                    return self.complete_value(node, ty, value, children, path).await
                }
                TypeRef::List(item) => {
                    let Value::Array(items) = value else {
                        self.record(
                            format!(
                                "Expected a list for field {}.{}, found {value}",
                                node.parent_type, node.field_name
                            ),
                            path,
                        );
                        return Err(NullBubble);
                    };
                    let mut elements: Vec<Completion<'s>> = Vec::with_capacity(items.len());
                    for (index, element) in items.iter().enumerate() {
                        let mut path = path.clone();
                        path.push(PathSegment::Index(index));
                        elements.push(self.complete_value(node, item, element, children.clone(), path));
                    }
                    let completed = join_all(elements).await;
                    return completed
                        .into_iter()
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Array);
                }
                TypeRef::Named(name) => name,
            };

            let concrete = match self.model.get(name) {
                Some(leaf) if leaf.is_leaf() => {
                    return serialize_leaf(self.model, name, value)
                        .map_err(|error| self.record(error.message, path));
                }
                Some(Type::Object(object)) => object.name.clone(),
                Some(Type::Interface(interface)) => (interface.type_resolver)(value)
                    .filter(|object| self.model.is_possible_type(name, object))
                    .ok_or_else(|| self.abstract_type_error(name, node, path.clone()))?,
                Some(Type::Union(union)) => (union.type_resolver)(value)
                    .filter(|object| self.model.is_possible_type(name, object))
                    .ok_or_else(|| self.abstract_type_error(name, node, path.clone()))?,
                _ => {
                    self.record(format!("Type {name} is not an output type"), path);
                    return Err(NullBubble);
                }
            };
            self.execute_selection(&concrete, value, children, path, false)
                .await
        })
    }

    fn is_included(&self, node: &ExecutionNode) -> bool {
        node.conditions
            .iter()
            .all(|condition| condition.holds(self.variables.get(&condition.variable)))
    }

    /// Binds deferred arguments to the coerced variable values.
    fn bind_arguments(&self, node: &ExecutionNode) -> Result<ResolverArgs, CoercionError> {
        let lookup = |variable: &str| self.variables.get(variable).cloned();
        let mut pairs = Vec::with_capacity(node.arguments.len());
        for (name, argument) in &node.arguments {
            match argument {
                ArgumentValue::Bound(value) => pairs.push((name.clone(), value.clone())),
                ArgumentValue::Deferred {
                    literal,
                    ty,
                    default,
                } => match coerce_literal(self.model, ty, literal, &lookup)? {
                    Some(value) => pairs.push((name.clone(), value)),
                    None => match default {
                        Some(default) => pairs.push((name.clone(), default.clone())),
                        None if ty.is_non_null() => {
                            return Err(CoercionError::new(format!(
                                "Missing value for non-nullable argument '{name}' on '{}.{}'",
                                node.parent_type, node.field_name
                            )));
                        }
                        None => {}
                    },
                },
            }
        }
        Ok(ResolverArgs::from_pairs(pairs))
    }

    /// Records a field failure and nulls the field, or bubbles if it is non-null.
    fn fail(
        &self,
        ty: &TypeRef,
        path: Vec<PathSegment>,
        message: String,
    ) -> Result<Value, NullBubble> {
        self.record(message, path);
        if ty.is_non_null() {
            Err(NullBubble)
        } else {
            Ok(Value::Null)
        }
    }

    fn abstract_type_error(
        &self,
        name: &str,
        node: &ExecutionNode,
        path: Vec<PathSegment>,
    ) -> NullBubble {
        self.record(
            format!(
                "Abstract type {name} must resolve to an Object type at runtime for field {}.{}",
                node.parent_type, node.field_name
            ),
            path,
        )
    }

    fn record(&self, message: String, path: Vec<PathSegment>) -> NullBubble {
        tracing::warn!(path = ?path, %message, "field error");
        self.errors
            .lock()
            .push(FieldError::new(message).with_path(path));
        NullBubble
    }
}
