//! Tests for the JSON-API error reporting
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error documents carry the fixed details and `meta.infos`
//! - Query validation errors reach the client unchanged

mod common;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{JSON_API_MIME, create_test_server, url};
use eureka::core::error::{AggregatorError, ParseError, ValidationError};
use eureka::prelude::*;
use serde_json::Value;

fn first_error(body: &Value) -> &Value {
    &body["errors"][0]
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_parse_error_returns_400() {
        let err: EurekaError = ParseError::InvalidLimit {
            value: "-1".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_aggregator_error_returns_400() {
        let err: EurekaError = AggregatorError::UnknownProperty {
            model: "Generic".to_string(),
            path: "nope".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unique_violation_returns_409() {
        let err: EurekaError = StoreError::UniqueViolation {
            model: "User".to_string(),
            property: "email".to_string(),
            value: "user1@test.com".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.detail(), "email is taken");
    }

    #[test]
    fn test_backend_failure_returns_500_without_details() {
        let err: EurekaError = StoreError::Backend {
            message: "connection reset".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "internal server error");
        assert!(err.infos().is_none());
    }

    #[test]
    fn test_into_response_sets_media_type() {
        let err: EurekaError = ValidationError::MalformedPayload { infos: None }.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            JSON_API_MIME
        );
    }
}

// =============================================================================
// Query Errors over HTTP
// =============================================================================

mod query_error_tests {
    use super::*;

    async fn get_error(query: &[(&str, &str)]) -> Value {
        let (server, _) = create_test_server().await;
        let mut request = server.get(&url("/generics"));
        for (key, value) in query {
            request = request.add_query_param(key, value);
        }
        let response = request.await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.header("content-type").to_str().unwrap(),
            JSON_API_MIME
        );
        first_error(&response.json()).clone()
    }

    #[tokio::test]
    async fn test_unknown_filter_property() {
        let error = get_error(&[("filter[unknwonField]", "3")]).await;
        assert_eq!(error["status"], 400);
        assert_eq!(error["title"], "Bad Request");
        assert_eq!(error["detail"], "ValidationError: malformed query");
        assert_eq!(
            error["meta"]["infos"],
            "unknown property \"unknwonField\" on model \"Generic\""
        );
    }

    #[tokio::test]
    async fn test_bad_operator() {
        let error = get_error(&[("filter[integer][$arf]", "3")]).await;
        assert_eq!(error["detail"], "ValidationError: malformed query");
        assert_eq!(error["meta"]["infos"], "unknown operator \"$arf\"");
    }

    #[tokio::test]
    async fn test_bad_type_reports_first_failure() {
        let error = get_error(&[("filter[integer]", "bla"), ("filter[boolean]", "arf")]).await;
        assert_eq!(error["detail"], "ValidationError: malformed query");
        assert_eq!(error["meta"]["infos"], "\"integer\" must be a number");
    }

    #[tokio::test]
    async fn test_bad_relation_type() {
        let error = get_error(&[("filter[relation.related]", "bla")]).await;
        assert_eq!(error["detail"], "ValidationError: malformed query");
        assert_eq!(error["meta"]["infos"], "\"related\" must be a boolean");
    }

    #[tokio::test]
    async fn test_ordering_operator_on_boolean() {
        let error = get_error(&[("filter[boolean][$gt]", "true")]).await;
        assert_eq!(error["detail"], "ValidationError: malformed query");
    }

    #[tokio::test]
    async fn test_bad_field_in_array() {
        let error = get_error(&[("fields", r#"["boolean","unknownProperty"]"#)]).await;
        assert_eq!(error["detail"], "ValidationError: malformed options");
        assert_eq!(
            error["meta"]["infos"],
            "unknown property \"unknownProperty\" on model \"Generic\""
        );
    }

    #[tokio::test]
    async fn test_bad_field_as_string() {
        let error = get_error(&[("fields", "boolean,unknownProperty")]).await;
        assert_eq!(error["detail"], "ValidationError: malformed options");
        assert_eq!(
            error["meta"]["infos"],
            "unknown property \"unknownProperty\" on model \"Generic\""
        );
    }

    #[tokio::test]
    async fn test_sort_unknown_property_as_array() {
        let error = get_error(&[("sort", r#"["boolean","unknownProperty"]"#)]).await;
        assert_eq!(error["detail"], "ValidationError: malformed options");
        assert_eq!(
            error["meta"]["infos"],
            "unknown property \"unknownProperty\" on model \"Generic\""
        );
    }

    #[tokio::test]
    async fn test_sort_unknown_property_as_string() {
        let error = get_error(&[("sort", "boolean,unknownProperty")]).await;
        assert_eq!(error["detail"], "ValidationError: malformed options");
        assert_eq!(
            error["meta"]["infos"],
            "unknown property \"unknownProperty\" on model \"Generic\""
        );
    }

    #[tokio::test]
    async fn test_include_non_relation() {
        let error = get_error(&[("include", "text")]).await;
        assert_eq!(error["detail"], "ValidationError: malformed options");
    }

    #[tokio::test]
    async fn test_malformed_array_literal() {
        let error = get_error(&[("filter[integer][$in]", "[2,4")]).await;
        assert_eq!(error["detail"], "ParseError: malformed query");
    }

    #[tokio::test]
    async fn test_invalid_limit() {
        let error = get_error(&[("limit", "-3")]).await;
        assert_eq!(error["detail"], "ParseError: malformed query");
    }
}

// =============================================================================
// Routing Errors
// =============================================================================

mod routing_error_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_resource() {
        let (server, _) = create_test_server().await;

        let response = server.get(&url("/nothings")).await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: Value = response.json();
        assert_eq!(first_error(&body)["detail"], "unknown resource \"nothings\"");
    }

    #[tokio::test]
    async fn test_unmatched_path_is_json_api_404() {
        let (server, _) = create_test_server().await;

        let response = server.get("/elsewhere/a/b/c/d/e").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.header("content-type").to_str().unwrap(),
            JSON_API_MIME
        );
        assert_eq!(first_error(&response.json())["status"], 404);
    }

    #[tokio::test]
    async fn test_unsupported_method_on_document_is_json_api_404() {
        let (server, _) = create_test_server().await;

        let response = server
            .post(&url("/generics/generic12"))
            .json(&serde_json::json!({ "data": { "id": "generic12", "type": "Generic" } }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.header("content-type").to_str().unwrap(),
            JSON_API_MIME
        );

        let body: Value = response.json();
        assert_eq!(first_error(&body)["status"], 404);
        assert_eq!(first_error(&body)["title"], "Not Found");
    }

    #[tokio::test]
    async fn test_unsupported_method_on_collection_is_json_api_404() {
        let (server, _) = create_test_server().await;

        let response = server.delete(&url("/generics")).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.header("content-type").to_str().unwrap(),
            JSON_API_MIME
        );
        assert_eq!(first_error(&response.json())["status"], 404);
    }

    #[tokio::test]
    async fn test_health() {
        let (server, _) = create_test_server().await;

        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");
    }
}
