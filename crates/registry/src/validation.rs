// Request extractors that reject with the registry error envelope.
//
// - `ValidatedJson<T>`: content-type check + serde + size enforcement.
// - `ValidatedQuery<T>`: query-string decoding for list and lookup endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, RegistryError};

/// Maximum REST request body in bytes (1 MiB).
pub const MAX_REST_BODY_BYTES: usize = 1024 * 1024;

// ── ValidatedJson extractor ────────────────────────────────────────

/// A JSON body extractor that returns a structured `RegistryError` on failure.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => {
                let (code, message, details) = classify_json_rejection(&rejection);
                Err(RegistryError::new(code, message).with_details(details).into_response())
            }
        }
    }
}

fn classify_json_rejection(rejection: &JsonRejection) -> (ErrorCode, String, serde_json::Value) {
    match rejection {
        JsonRejection::JsonDataError(e) => (
            ErrorCode::ValidationFailed,
            format!("invalid JSON payload: {e}"),
            serde_json::json!({ "kind": "data_error" }),
        ),
        JsonRejection::JsonSyntaxError(e) => (
            ErrorCode::ValidationFailed,
            format!("malformed JSON: {e}"),
            serde_json::json!({ "kind": "syntax_error" }),
        ),
        JsonRejection::MissingJsonContentType(_) => (
            ErrorCode::ValidationFailed,
            "expected Content-Type: application/json".to_string(),
            serde_json::json!({ "kind": "missing_content_type" }),
        ),
        JsonRejection::BytesRejection(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => (
            ErrorCode::PayloadTooLarge,
            format!("request body too large: {e}"),
            serde_json::json!({ "kind": "too_large" }),
        ),
        JsonRejection::BytesRejection(e) => (
            ErrorCode::ValidationFailed,
            format!("request body error: {e}"),
            serde_json::json!({ "kind": "body_error" }),
        ),
        other => (
            ErrorCode::ValidationFailed,
            format!("request body error: {other}"),
            serde_json::json!({ "kind": "unknown" }),
        ),
    }
}

// ── ValidatedQuery extractor ───────────────────────────────────────

/// Query-string extractor with the same error envelope as [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ValidatedQuery(value)),
            Err(rejection) => Err(query_rejection(&rejection).into_response()),
        }
    }
}

fn query_rejection(rejection: &QueryRejection) -> RegistryError {
    RegistryError::new(ErrorCode::ValidationFailed, format!("invalid query string: {rejection}"))
        .with_details(serde_json::json!({ "kind": "query_error" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::DefaultBodyLimit,
        http::{Method, Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct TestPayload {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct TestQuery {
        #[serde(rename = "page[after]")]
        page_after: Option<i64>,
    }

    async fn echo_handler(ValidatedJson(payload): ValidatedJson<TestPayload>) -> impl IntoResponse {
        (StatusCode::OK, payload.name)
    }

    async fn page_handler(ValidatedQuery(query): ValidatedQuery<TestQuery>) -> impl IntoResponse {
        (StatusCode::OK, query.page_after.unwrap_or(1).to_string())
    }

    fn test_app() -> Router {
        Router::new()
            .route("/test", post(echo_handler))
            .route("/page", get(page_handler))
            .layer(DefaultBodyLimit::max(64))
    }

    async fn error_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/test")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn validated_json_accepts_valid_payload() {
        let response = test_app().oneshot(post_json(r#"{"name":"alice"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"alice");
    }

    #[tokio::test]
    async fn validated_json_rejects_missing_content_type() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/test")
                    .body(Body::from(r#"{"name":"alice"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let parsed = error_body(response).await;
        assert_eq!(parsed["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(parsed["error"]["details"]["kind"], "missing_content_type");
    }

    #[tokio::test]
    async fn validated_json_rejects_malformed_json() {
        let response = test_app().oneshot(post_json("not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let parsed = error_body(response).await;
        assert_eq!(parsed["error"]["details"]["kind"], "syntax_error");
    }

    #[tokio::test]
    async fn validated_json_rejects_missing_field() {
        let response = test_app().oneshot(post_json(r#"{"age": 42}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let parsed = error_body(response).await;
        assert_eq!(parsed["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(parsed["error"]["details"]["kind"], "data_error");
    }

    #[tokio::test]
    async fn validated_json_rejects_oversized_body() {
        let name = "x".repeat(128);
        let response =
            test_app().oneshot(post_json(format!(r#"{{"name":"{name}"}}"#))).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let parsed = error_body(response).await;
        assert_eq!(parsed["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn validated_query_parses_bracketed_keys() {
        let response = test_app()
            .oneshot(Request::builder().uri("/page?page%5Bafter%5D=3").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"3");
    }

    #[tokio::test]
    async fn validated_query_rejects_non_numeric_page() {
        let response = test_app()
            .oneshot(Request::builder().uri("/page?page%5Bafter%5D=two").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let parsed = error_body(response).await;
        assert_eq!(parsed["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(parsed["error"]["details"]["kind"], "query_error");
    }
}
