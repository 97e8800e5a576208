//! Film schema shared by the integration tests.

#![allow(dead_code)]

use graphex_runtime::{
    Context, EnumType, FieldDef, InputObjectType, InputValueDef, InterfaceType, ObjectType,
    ResolverError, Schema, SchemaBuilder, SchemaConfiguration, TypeRef, UnionType,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Mutation calls in completion order, stored as a context extension.
#[derive(Debug, Default, Clone)]
pub struct MutationLog(pub Arc<Mutex<Vec<String>>>);

pub fn director() -> Value {
    json!({
        "__typename": "Director",
        "name": "Christopher Nolan",
        "age": 51,
        "favActors": [
            {"__typename": "Actor", "name": "Michael Caine", "age": 88},
            {"__typename": "Actor", "name": "Christian Bale", "age": 47}
        ]
    })
}

pub fn film() -> Value {
    json!({
        "title": "Prestige",
        "year": 2006,
        "type": "FULL_LENGTH",
        "director": director(),
        "release_date": "2006-10-20"
    })
}

pub fn builder() -> SchemaBuilder {
    SchemaBuilder::new()
        .enum_type(
            EnumType::with_values("FilmType", ["FULL_LENGTH", "SHORT_LENGTH"])
                .description("Length of a film"),
        )
        .enum_type(EnumType::with_values("Coolness", ["NOT_COOL", "COOL", "TOTALLY_COOL"]))
        .interface(
            InterfaceType::new("Person")
                .field(FieldDef::new("name", TypeRef::required("String")))
                .field(FieldDef::new("age", TypeRef::named("Int"))),
        )
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
                .field(FieldDef::new("age", TypeRef::named("Int")))
                .field(FieldDef::new("favActors", TypeRef::list(TypeRef::named("Actor"))))
                .field(FieldDef::new("scope", TypeRef::named("String")).resolve_async(
                    |_, _, ctx| async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok(json!(ctx.scope_name()))
                    },
                )),
        )
        .object(
            ObjectType::new("Film")
                .field(FieldDef::new("title", TypeRef::required("String")))
                .field(FieldDef::new("year", TypeRef::named("Int")))
                .field(FieldDef::new("type", TypeRef::named("FilmType")))
                .field(FieldDef::new("director", TypeRef::named("Director")))
                .field(FieldDef::new("releaseDate", TypeRef::named("String")))
                .field(
                    FieldDef::new("oldTitle", TypeRef::named("String"))
                        .deprecated("Use title instead"),
                ),
        )
        .object(ObjectType::new("Scenario").field(FieldDef::new("content", TypeRef::named("String"))))
        .union(
            UnionType::new("Favourite")
                .member("Actor")
                .member("Scenario")
                .resolve_type(|value| {
                    let name = if value.get("content").is_some() { "Scenario" } else { "Actor" };
                    Some(name.to_string())
                }),
        )
        .input_object(
            InputObjectType::new("ActorInput")
                .field(InputValueDef::new("name", TypeRef::required("String")))
                .field(InputValueDef::new("age", TypeRef::named("Int")).default_value(json!(30))),
        )
        .query(FieldDef::new("film", TypeRef::named("Film")).resolve_fn(|_, _, _| Ok(film())))
        .query(
            FieldDef::new("films", TypeRef::non_null(TypeRef::list(TypeRef::required("Film"))))
                .argument(InputValueDef::new("type", TypeRef::named("FilmType")))
                .resolve_fn(|_, args, _| {
                    let short = json!({"title": "Doodlebug", "year": 1997, "type": "SHORT_LENGTH"});
                    Ok(match args.get_as::<String>("type").as_deref() {
                        Some("SHORT_LENGTH") => json!([short]),
                        Some(_) => json!([film()]),
                        None => json!([film(), short]),
                    })
                }),
        )
        .query(
            FieldDef::new("people", TypeRef::list(TypeRef::named("Person")))
                .resolve_fn(|_, _, _| Ok(json!([director(), director()["favActors"][0]]))),
        )
        .query(
            FieldDef::new("favourites", TypeRef::list(TypeRef::named("Favourite"))).resolve_fn(
                |_, _, _| {
                    Ok(json!([
                        {"name": "Tom Hardy", "age": 42},
                        {"content": "DUMB"}
                    ]))
                },
            ),
        )
        .query(
            FieldDef::new("cool", TypeRef::named("Coolness"))
                .argument(InputValueDef::new("cool", TypeRef::required("Coolness")))
                .resolve_fn(|_, args, _| Ok(args.get("cool").cloned().unwrap_or(Value::Null))),
        )
        .query(
            FieldDef::new("number", TypeRef::named("Int"))
                .argument(InputValueDef::new("big", TypeRef::required("Boolean")))
                .resolve_fn(|_, args, _| {
                    let big: bool = args.require("big")?;
                    Ok(json!(if big { 10000 } else { 0 }))
                }),
        )
        .query(
            FieldDef::new("delayed", TypeRef::named("Int"))
                .argument(InputValueDef::new("ms", TypeRef::required("Int")))
                .resolve_async(|_, args, _| async move {
                    let ms = args.get_as::<u64>("ms").unwrap_or_default();
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(json!(ms))
                }),
        )
        .query(
            FieldDef::new("greeting", TypeRef::named("String")).resolve_fn(|_, _, ctx| {
                let user = ctx
                    .context()
                    .get::<String>("user")
                    .ok_or_else(|| ResolverError::custom("No user in context"))?;
                Ok(json!(format!("Hello, {user}")))
            }),
        )
        .query(
            FieldDef::new("brokenDirector", TypeRef::named("Director"))
                .resolve_fn(|_, _, _| Ok(json!({"name": null, "age": 3}))),
        )
        .query(
            FieldDef::new("requiredTitle", TypeRef::required("String"))
                .resolve_fn(|_, _, _| Err(ResolverError::custom("title is unavailable"))),
        )
        .mutation(
            FieldDef::new("createActor", TypeRef::named("Actor"))
                .argument(InputValueDef::new("input", TypeRef::required("ActorInput")))
                .argument(InputValueDef::new("delay", TypeRef::named("Int")).default_value(json!(0)))
                .resolve_async(|_, args, ctx| async move {
                    let delay = args.get_as::<u64>("delay").unwrap_or_default();
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    let input = args.get("input").cloned().unwrap_or(Value::Null);
                    if let Some(log) = ctx.context().extension::<MutationLog>() {
                        log.0.lock().push(input["name"].as_str().unwrap_or_default().to_string());
                    }
                    Ok(input)
                }),
        )
}

pub fn schema() -> Schema {
    schema_with(SchemaConfiguration::default())
}

pub fn schema_with(configuration: SchemaConfiguration) -> Schema {
    Schema::build(builder(), configuration).unwrap()
}

/// Runs `query` and parses the JSON response.
pub async fn execute(schema: &Schema, query: &str, variables: Option<&str>) -> Value {
    execute_in(schema, query, variables, Context::new()).await
}

pub async fn execute_in(
    schema: &Schema,
    query: &str,
    variables: Option<&str>,
    context: Context,
) -> Value {
    let text = schema
        .execute_async(query, variables, context, &graphex_runtime::ExecutionScope::new())
        .await
        .unwrap();
    serde_json::from_str(&text).unwrap()
}

/// The message of the single error of a failed request.
pub async fn request_error(schema: &Schema, query: &str, variables: Option<&str>) -> String {
    let response = execute(schema, query, variables).await;
    assert_eq!(response["data"], Value::Null, "{response}");
    assert_eq!(response["errors"].as_array().map(Vec::len), Some(1), "{response}");
    response["errors"][0]["message"].as_str().unwrap().to_string()
}
