//! JSON-API response wrapper

use crate::document::JSON_API_MEDIA_TYPE;
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Serialize `T` as the response body with the `application/vnd.api+json`
/// content type
#[derive(Debug, Clone)]
pub struct JsonApi<T>(pub T);

/// [`JsonApi`] answered with `201 Created`
#[derive(Debug, Clone)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, JSON_API_MEDIA_TYPE)],
            Json(self.0),
        )
            .into_response()
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, JsonApi(self.0)).into_response()
    }
}
