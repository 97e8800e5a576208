//! Request-level failures: operation selection, parsing, planning and variables.

mod common;

use common::{execute, request_error, schema};
use graphex_runtime::{RequestError, Schema, SchemaConfiguration};
use serde_json::json;

#[tokio::test]
async fn test_empty_request() {
    let schema = schema();
    insta::assert_snapshot!(request_error(&schema, "", None).await, @"Must provide any operation");
    insta::assert_snapshot!(request_error(&schema, "   ", None).await, @"Must provide any operation");
}

#[tokio::test]
async fn test_anonymous_operation_must_be_alone() {
    let schema = schema();
    insta::assert_snapshot!(
        request_error(&schema, "{ film { title } } query Named { film { year } }", None).await,
        @"anonymous operation must be the only defined operation"
    );
}

#[tokio::test]
async fn test_operation_name_selection() {
    let schema = schema();
    let document = r"
        query FilmQuery { film { title } }
        query CoolQuery { cool(cool: COOL) }
    ";
    insta::assert_snapshot!(
        request_error(&schema, document, None).await,
        @"Must provide an operation name from: [FilmQuery, CoolQuery]"
    );
    insta::assert_snapshot!(
        request_error(&schema, document, Some(r#"{"operationName": "Other"}"#)).await,
        @"Must provide an operation name from: [FilmQuery, CoolQuery], found Other"
    );
    assert_eq!(
        execute(&schema, document, Some(r#"{"operationName": "CoolQuery"}"#)).await,
        json!({"data": {"cool": "COOL"}})
    );
}

#[tokio::test]
async fn test_single_operation_ignores_operation_name() {
    let schema = schema();
    assert_eq!(
        execute(&schema, "query Only { cool(cool: COOL) }", Some(r#"{"operationName": "Other"}"#)).await,
        json!({"data": {"cool": "COOL"}})
    );
}

#[tokio::test]
async fn test_single_operation_ignores_invalid_operation_name() {
    let schema = schema();
    assert_eq!(
        execute(&schema, "query Only { cool(cool: COOL) }", Some(r#"{"operationName": 5}"#)).await,
        json!({"data": {"cool": "COOL"}})
    );
    insta::assert_snapshot!(
        request_error(
            &schema,
            "query One { cool(cool: COOL) } query Two { cool(cool: COOL) }",
            Some(r#"{"operationName": 5}"#)
        )
        .await,
        @"Variable '$operationName' got invalid value 5; String cannot represent value: 5"
    );
}

#[tokio::test]
async fn test_enum_string_literal() {
    let schema = schema();
    insta::assert_snapshot!(
        request_error(&schema, r#"{cool(cool: "COOL")}"#, None).await,
        @r#"String literal '"COOL"' is invalid value for enum type Coolness"#
    );
    insta::assert_snapshot!(
        request_error(&schema, "{cool(cool: WARM)}", None).await,
        @"Invalid enum Coolness value 'WARM'. Expected one of [NOT_COOL, COOL, TOTALLY_COOL]"
    );
}

#[tokio::test]
async fn test_plan_errors() {
    let schema = schema();
    insta::assert_snapshot!(
        request_error(&schema, "{ film { budget } }", None).await,
        @"Property 'budget' on 'Film' does not exist"
    );
    insta::assert_snapshot!(
        request_error(&schema, "{ film }", None).await,
        @"Missing selection set on property 'film' of type 'Film'"
    );
    insta::assert_snapshot!(
        request_error(&schema, "{ number }", None).await,
        @"Missing value for non-nullable argument 'big' on 'Query.number'"
    );
    insta::assert_snapshot!(
        request_error(&schema, r#"mutation { createActor(input: {name: "A", height: 2}) { name } }"#, None).await,
        @"Field 'height' is not defined by input type ActorInput"
    );
    insta::assert_snapshot!(
        request_error(&schema, "subscription { film { title } }", None).await,
        @"Subscriptions are not supported by this schema"
    );
}

#[tokio::test]
async fn test_syntax_error() {
    let schema = schema();
    let message = request_error(&schema, "{ film { title }", None).await;
    assert!(message.starts_with("Syntax error at "), "{message}");
}

#[tokio::test]
async fn test_invalid_variables_json() {
    let schema = schema();
    let message = request_error(&schema, "{ film { title } }", Some("[1, 2]")).await;
    insta::assert_snapshot!(message, @"Invalid variables: expected a JSON object, found [1,2]");
}

#[test]
fn test_prepare_reports_typed_errors() {
    let schema = Schema::build(common::builder(), SchemaConfiguration::default()).unwrap();
    assert_eq!(
        schema.prepare("", None).unwrap_err(),
        RequestError::NoOperation
    );
    assert!(matches!(
        schema.prepare("{ film { budget } }", None),
        Err(RequestError::Plan(_))
    ));
    let (plan, _) = schema
        .prepare("query Films { films { title } }", None)
        .unwrap();
    assert_eq!(plan.operation_name.as_deref(), Some("Films"));
    assert_eq!(plan.root_type, "Query");
}

#[tokio::test]
async fn test_document_cache_bound() {
    let schema = common::schema_with(SchemaConfiguration::default().with_document_cache_size(2));
    for year in ["{ film { year } }", "{ film { title } }", "{ film { type } }", "{ film { year } }"] {
        let response = execute(&schema, year, None).await;
        assert!(response.get("errors").is_none(), "{response}");
    }
    let graphex_runtime::DocumentParser::Caching(parser) = schema.parser() else {
        panic!("caching parser expected");
    };
    assert_eq!(parser.len(), 2);
    assert_eq!(parser.capacity(), 2);

    let plain = common::schema_with(SchemaConfiguration::default().with_caching_document_parser(false));
    assert!(matches!(plain.parser(), graphex_runtime::DocumentParser::Plain));
}
