//! End-to-end execution against the film schema.

mod common;

use common::{execute, execute_in, schema, schema_with, MutationLog};
use graphex_runtime::{
    Context, ExecutionError, ExecutionScope, ExecutorConfig, SchemaConfiguration,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_nested_query() {
    let schema = schema();
    let response = execute(
        &schema,
        "{ film { title year type director { name favActors { name } } } }",
        None,
    )
    .await;
    assert_eq!(
        response,
        json!({
            "data": {
                "film": {
                    "title": "Prestige",
                    "year": 2006,
                    "type": "FULL_LENGTH",
                    "director": {
                        "name": "Christopher Nolan",
                        "favActors": [{"name": "Michael Caine"}, {"name": "Christian Bale"}]
                    }
                }
            }
        })
    );
}

#[tokio::test]
async fn test_default_resolver_falls_back_to_snake_case() {
    let schema = schema();
    let response = execute(&schema, "{ film { releaseDate oldTitle } }", None).await;
    assert_eq!(
        response,
        json!({"data": {"film": {"releaseDate": "2006-10-20", "oldTitle": null}}})
    );
}

#[tokio::test]
async fn test_aliases_and_merged_fields() {
    let schema = schema();
    let response = execute(
        &schema,
        "{ first: film { title } film { title } film { year } }",
        None,
    )
    .await;
    assert_eq!(
        response["data"],
        json!({"first": {"title": "Prestige"}, "film": {"title": "Prestige", "year": 2006}})
    );
}

#[tokio::test]
async fn test_enum_arguments() {
    let schema = schema();
    assert_eq!(
        execute(&schema, "{ cool(cool: COOL) }", None).await,
        json!({"data": {"cool": "COOL"}})
    );
    assert_eq!(
        execute(&schema, "{ films(type: SHORT_LENGTH) { title } }", None).await,
        json!({"data": {"films": [{"title": "Doodlebug"}]}})
    );
}

#[tokio::test]
async fn test_enum_variable() {
    let schema = schema();
    let response = execute(
        &schema,
        "query($type: FilmType) { films(type: $type) { title } }",
        Some(r#"{"type": "FULL_LENGTH"}"#),
    )
    .await;
    assert_eq!(response, json!({"data": {"films": [{"title": "Prestige"}]}}));
}

#[tokio::test]
async fn test_interface_and_fragments() {
    let schema = schema();
    let response = execute(
        &schema,
        r"
        {
            people {
                __typename
                ...PersonName
                ... on Director { favActors { age } }
            }
        }
        fragment PersonName on Person { name }
        ",
        None,
    )
    .await;
    assert_eq!(
        response["data"]["people"],
        json!([
            {
                "__typename": "Director",
                "name": "Christopher Nolan",
                "favActors": [{"age": 88}, {"age": 47}]
            },
            {"__typename": "Actor", "name": "Michael Caine"}
        ])
    );
}

#[tokio::test]
async fn test_union_branches() {
    let schema = schema();
    let response = execute(
        &schema,
        "{ favourites { __typename ... on Actor { name } ... on Scenario { content } } }",
        None,
    )
    .await;
    assert_eq!(
        response["data"]["favourites"],
        json!([
            {"__typename": "Actor", "name": "Tom Hardy"},
            {"__typename": "Scenario", "content": "DUMB"}
        ])
    );
}

#[tokio::test]
async fn test_skip_and_include() {
    let schema = schema();
    let query = r"
        query($withYear: Boolean!, $hideTitle: Boolean = false) {
            film {
                title @skip(if: $hideTitle)
                year @include(if: $withYear)
                type @include(if: false)
            }
        }
    ";
    assert_eq!(
        execute(&schema, query, Some(r#"{"withYear": true}"#)).await["data"],
        json!({"film": {"title": "Prestige", "year": 2006}})
    );
    assert_eq!(
        execute(&schema, query, Some(r#"{"withYear": false, "hideTitle": true}"#)).await["data"],
        json!({"film": {}})
    );
}

#[tokio::test]
async fn test_variables_absent_and_null() {
    let schema = schema();
    let query = "query($big: Boolean!) { number(big: $big) }";
    assert_eq!(
        execute(&schema, query, Some(r#"{"big": true}"#)).await,
        json!({"data": {"number": 10000}})
    );
    insta::assert_snapshot!(
        common::request_error(&schema, query, None).await,
        @"Variable '$big' of required type 'Boolean!' was not provided"
    );
    insta::assert_snapshot!(
        common::request_error(&schema, query, Some(r#"{"big": null}"#)).await,
        @"Variable '$big' got invalid value null; Expected non-null value of type Boolean!, found null"
    );
}

#[tokio::test]
async fn test_input_object_defaults() {
    let schema = schema();
    let response = execute(
        &schema,
        r#"mutation { createActor(input: {name: "Tom Hardy"}) { name age } }"#,
        None,
    )
    .await;
    assert_eq!(
        response,
        json!({"data": {"createActor": {"name": "Tom Hardy", "age": 30}}})
    );
}

#[tokio::test]
async fn test_mutations_run_serially() {
    let schema = schema();
    let log = MutationLog::default();
    let mut context = Context::new();
    context.insert(log.clone());

    let response = execute_in(
        &schema,
        r#"
        mutation {
            slow: createActor(input: {name: "Slow"}, delay: 30) { name }
            fast: createActor(input: {name: "Fast"}) { name }
        }
        "#,
        None,
        context,
    )
    .await;
    assert_eq!(
        response["data"],
        json!({"slow": {"name": "Slow"}, "fast": {"name": "Fast"}})
    );
    assert_eq!(*log.0.lock(), ["Slow", "Fast"]);
}

#[tokio::test]
async fn test_concurrent_mutations_keep_selection_order() {
    let configuration = SchemaConfiguration::default()
        .with_executor(ExecutorConfig::default().with_serial_mutations(false));
    let schema = schema_with(configuration);
    let log = MutationLog::default();
    let mut context = Context::new();
    context.insert(log.clone());

    let response = execute_in(
        &schema,
        r#"
        mutation {
            slow: createActor(input: {name: "Slow"}, delay: 30) { name }
            fast: createActor(input: {name: "Fast"}) { name }
        }
        "#,
        None,
        context,
    )
    .await;
    let keys: Vec<_> = response["data"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["slow", "fast"]);
    assert_eq!(*log.0.lock(), ["Fast", "Slow"]);
}

#[tokio::test]
async fn test_output_order_under_reversed_completion() {
    let schema = schema();
    let response = execute(
        &schema,
        "{ a: delayed(ms: 40) b: delayed(ms: 20) c: delayed(ms: 1) }",
        None,
    )
    .await;
    assert_eq!(
        serde_json::to_string(&response["data"]).unwrap(),
        r#"{"a":40,"b":20,"c":1}"#
    );
}

#[tokio::test]
async fn test_scope_name_visible_in_nested_async_resolver() {
    let schema = schema();
    let text = schema
        .execute_async(
            "{ film { director { scope } } }",
            None,
            Context::new(),
            &ExecutionScope::named("A Fancy name"),
        )
        .await
        .unwrap();
    assert_eq!(
        text,
        r#"{"data":{"film":{"director":{"scope":"A Fancy name"}}}}"#
    );
}

#[tokio::test]
async fn test_context_values() {
    let schema = schema();
    let context = Context::new().with("user", "Ada");
    assert_eq!(
        execute_in(&schema, "{ greeting }", None, context).await,
        json!({"data": {"greeting": "Hello, Ada"}})
    );

    let response = execute(&schema, "{ greeting film { year } }", None).await;
    assert_eq!(response["data"], json!({"greeting": null, "film": {"year": 2006}}));
    assert_eq!(
        response["errors"],
        json!([{"message": "No user in context", "path": ["greeting"]}])
    );
}

#[tokio::test]
async fn test_null_bubbles_to_nearest_nullable_ancestor() {
    let schema = schema();
    let response = execute(&schema, "{ brokenDirector { name age } film { title } }", None).await;
    assert_eq!(
        response,
        json!({
            "data": {"brokenDirector": null, "film": {"title": "Prestige"}},
            "errors": [{
                "message": "Cannot return null for non-nullable field Director.name",
                "path": ["brokenDirector", "name"]
            }]
        })
    );
}

#[tokio::test]
async fn test_non_null_root_failure_nulls_data() {
    let schema = schema();
    let response = execute(&schema, "{ film { title } requiredTitle }", None).await;
    assert_eq!(
        response,
        json!({
            "data": null,
            "errors": [{"message": "title is unavailable", "path": ["requiredTitle"]}]
        })
    );
}

#[tokio::test]
async fn test_list_items_bubble_to_the_list() {
    let builder = common::builder().query(
        graphex_runtime::FieldDef::new(
            "titles",
            graphex_runtime::TypeRef::list(graphex_runtime::TypeRef::required("String")),
        )
        .resolve_fn(|_, _, _| Ok(json!(["Memento", null, "Tenet"]))),
    );
    let schema = graphex_runtime::Schema::build(builder, SchemaConfiguration::default()).unwrap();
    let response = execute(&schema, "{ titles }", None).await;
    assert_eq!(response["data"], json!({"titles": null}));
    assert_eq!(response["errors"][0]["path"], json!(["titles", 1]));
}

#[tokio::test]
async fn test_cancellation() {
    let schema = schema();
    let scope = ExecutionScope::named("cancelled");
    let canceller = scope.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let result = schema
        .execute_async("{ delayed(ms: 10000) }", None, Context::new(), &scope)
        .await;
    assert!(matches!(result, Err(ExecutionError::Cancelled)));

    let result = schema
        .execute_async("{ film { title } }", None, Context::new(), &scope)
        .await;
    assert!(matches!(result, Err(ExecutionError::Cancelled)));
}

#[tokio::test]
async fn test_concurrency_limit() {
    let configuration = SchemaConfiguration::default()
        .with_executor(ExecutorConfig::default().with_max_concurrent_fields(2));
    let schema = schema_with(configuration);
    let response = execute(
        &schema,
        "{ a: delayed(ms: 10) b: delayed(ms: 5) c: delayed(ms: 1) }",
        None,
    )
    .await;
    assert_eq!(response, json!({"data": {"a": 10, "b": 5, "c": 1}}));
}

#[tokio::test]
async fn test_execution_on_spawned_task() {
    let unbounded = Arc::new(schema());
    let bounded = Arc::new(schema_with(
        SchemaConfiguration::default()
            .with_executor(ExecutorConfig::default().with_max_concurrent_fields(1)),
    ));
    let tasks = [unbounded, bounded].map(|schema| {
        tokio::spawn(async move {
            let scope = ExecutionScope::new();
            schema
                .execute_async(
                    "{ a: delayed(ms: 5) films { title } }",
                    None,
                    Context::new(),
                    &scope,
                )
                .await
        })
    });
    for task in tasks {
        let text = task.await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["data"]["a"], 5);
        assert!(value["data"]["films"].is_array(), "{text}");
    }
}

#[test]
fn test_blocking_execute_with_pretty_print() {
    let schema = schema_with(SchemaConfiguration::default().with_pretty_print(true));
    let text = schema
        .execute("{ film { year } }", None, Context::new())
        .unwrap();
    insta::assert_snapshot!(text, @r#"
    {
      "data": {
        "film": {
          "year": 2006
        }
      }
    }
    "#);
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["data"]["film"]["year"], 2006);
}
