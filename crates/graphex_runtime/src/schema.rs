//! The schema façade.
//!
//! [`Schema`] ties the pieces of a request together: the document parser,
//! operation selection, the plan builder and the executor. It also answers the
//! [`SchemaLookup`] contract by forwarding to its model.

use crate::builder::SchemaBuilder;
use crate::config::SchemaConfiguration;
use crate::error::{ExecutionError, RequestError, SchemaError};
use crate::executor::RequestExecutor;
use crate::model::{DirectiveDef, ObjectType, SchemaLookup, SchemaModel, Type};
use crate::plan::{ExecutionPlan, RequestInterpreter};
use crate::resolver::Context;
use crate::response::Response;
use crate::scope::ExecutionScope;
use crate::variables::Variables;
use graphex_syntax::{DocumentParser, Operation};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::Instrument;

/// An executable schema.
#[derive(Debug)]
pub struct Schema {
    model: Arc<SchemaModel>,
    configuration: SchemaConfiguration,
    parser: DocumentParser,
    interpreter: RequestInterpreter,
    executor: RequestExecutor,
}

impl Schema {
    pub fn new(model: SchemaModel, configuration: SchemaConfiguration) -> Self {
        let model = Arc::new(model);
        let parser = DocumentParser::new(
            configuration.use_caching_document_parser,
            configuration.document_parser_cache_maximum_size,
        );
        Self {
            interpreter: RequestInterpreter::new(Arc::clone(&model)),
            executor: RequestExecutor::new(Arc::clone(&model), configuration.executor.clone()),
            model,
            configuration,
            parser,
        }
    }

    /// Builds the model from `builder` and wraps it.
    pub fn build(
        builder: SchemaBuilder,
        configuration: SchemaConfiguration,
    ) -> Result<Self, SchemaError> {
        Ok(Self::new(builder.build()?, configuration))
    }

    pub fn model(&self) -> &Arc<SchemaModel> {
        &self.model
    }

    pub fn configuration(&self) -> &SchemaConfiguration {
        &self.configuration
    }

    pub fn parser(&self) -> &DocumentParser {
        &self.parser
    }

    /// Executes a request and returns the JSON response text.
    ///
    /// Blocks the current thread on a fresh single-threaded runtime. Inside an
    /// async runtime it fails with [`ExecutionError::InsideRuntime`].
    pub fn execute(
        &self,
        request: &str,
        variables: Option<&str>,
        context: Context,
    ) -> Result<String, ExecutionError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ExecutionError::InsideRuntime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.execute_async(request, variables, context, &ExecutionScope::new()))
    }

    /// Executes a request in `scope` and returns the JSON response text.
    pub async fn execute_async(
        &self,
        request: &str,
        variables: Option<&str>,
        context: Context,
        scope: &ExecutionScope,
    ) -> Result<String, ExecutionError> {
        let response = self
            .execute_request(request, variables, context, scope)
            .await?;
        Ok(response.to_json(self.configuration.pretty_print)?)
    }

    /// Executes a request in `scope`.
    ///
    /// Parse, selection, planning and variable errors come back as a response
    /// with `data: null` and a single error. `Err` is reserved for
    /// cancellation.
    pub async fn execute_request(
        &self,
        request: &str,
        variables: Option<&str>,
        context: Context,
        scope: &ExecutionScope,
    ) -> Result<Response, ExecutionError> {
        let span = tracing::info_span!("graphql.request", scope = scope.name().unwrap_or_default());
        async move {
            if scope.is_cancelled() {
                return Err(ExecutionError::Cancelled);
            }
            let (plan, variables) = match self.prepare(request, variables) {
                Ok(prepared) => prepared,
                Err(error) => {
                    tracing::debug!(%error, "request failed");
                    return Ok(Response::request_error(&error));
                }
            };
            self.executor
                .execute(&plan, &variables, context, scope)
                .await
        }
        .instrument(span)
        .await
    }

    /// Parses the request, selects the operation and builds its plan.
    pub fn prepare(
        &self,
        request: &str,
        variables: Option<&str>,
    ) -> Result<(ExecutionPlan, Variables), RequestError> {
        let variables = Variables::parse(variables)?;
        let operations = self.parser.parse_document(request)?;
        let operation = select_operation(&operations, || {
            Ok(variables.operation_name(&self.model)?)
        })?;
        let plan = self.interpreter.create_execution_plan(operation)?;
        Ok((plan, variables))
    }
}

/// Picks the operation to run.
///
/// A single operation is always selected. With several, none may be anonymous
/// and `operation_name` must name one of them. It is only read in that case.
fn select_operation<'a>(
    operations: &'a [Operation],
    operation_name: impl FnOnce() -> Result<Option<String>, RequestError>,
) -> Result<&'a Operation, RequestError> {
    match operations {
        [] => Err(RequestError::NoOperation),
        [operation] => Ok(operation),
        _ if operations.iter().any(|operation| operation.name.is_none()) => {
            Err(RequestError::AnonymousOperation)
        }
        _ => {
            let available = || {
                operations
                    .iter()
                    .filter_map(|operation| operation.name.clone())
                    .collect::<Vec<_>>()
            };
            let name = operation_name()?.ok_or_else(|| RequestError::MissingOperationName {
                available: available(),
            })?;
            operations
                .iter()
                .find(|operation| operation.name.as_deref() == Some(name.as_str()))
                .ok_or_else(|| RequestError::UnknownOperationName {
                    available: available(),
                    found: name,
                })
        }
    }
}

impl SchemaLookup for Schema {
    fn type_by_name(&self, name: &str) -> Option<&Type> {
        self.model.type_by_name(name)
    }

    fn input_type_by_name(&self, name: &str) -> Option<&Type> {
        self.model.input_type_by_name(name)
    }

    fn type_by_native_id(&self, id: &str) -> Option<&Type> {
        self.model.type_by_native_id(id)
    }

    fn input_type_by_native_id(&self, id: &str) -> Option<&Type> {
        self.model.input_type_by_native_id(id)
    }

    fn all_types(&self) -> &IndexMap<String, Type> {
        self.model.all_types()
    }

    fn introspected_types(&self) -> Vec<&Type> {
        self.model.introspected_types()
    }

    fn directives(&self) -> &IndexMap<String, DirectiveDef> {
        self.model.directives()
    }

    fn query_type(&self) -> &ObjectType {
        self.model.query_type()
    }

    fn mutation_type(&self) -> Option<&ObjectType> {
        self.model.mutation_type()
    }

    fn subscription_type(&self) -> Option<&ObjectType> {
        self.model.subscription_type()
    }

    fn possible_types(&self, name: &str) -> Vec<&ObjectType> {
        self.model.possible_types(name)
    }
}
