//! Typed error handling for eureka
//!
//! Every failure on the request path ends up as an [`EurekaError`], which
//! renders itself as a JSON-API errors document:
//!
//! ```json
//! {
//!   "errors": [{
//!     "status": 400,
//!     "title": "Bad Request",
//!     "detail": "ValidationError: malformed query",
//!     "meta": { "infos": "unknown operator \"$arf\"" }
//!   }]
//! }
//! ```
//!
//! # Error Categories
//!
//! - [`ParseError`]: the query string could not be read at all
//! - [`ValidationError`]: the query or payload does not fit the schema
//! - [`AggregatorError`]: the group-by path or its filter is invalid
//! - conflicts, missing records and internal failures, mostly coming from
//!   the [`Store`](crate::core::store::Store) through [`StoreError`]

use crate::core::store::StoreError;
use crate::document::{Document, ErrorMeta, ErrorObject, JSON_API_MEDIA_TYPE};
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::fmt;
use thiserror::Error;

/// The main error type of the request path
#[derive(Debug)]
pub enum EurekaError {
    /// Query string could not be parsed
    Parse(ParseError),

    /// Query or payload rejected by the schema
    Validation(ValidationError),

    /// Group-by request rejected
    Aggregator(AggregatorError),

    /// A unique property is already taken
    Conflict { message: String },

    /// Record does not exist
    NotFound { model: String, id: String },

    /// No model is exposed under this collection name
    UnknownResource { plural: String },

    /// Relation not declared on the model
    UnknownRelation { model: String, relation: String },

    /// Anything else; the message is logged, never sent to clients
    Internal(String),
}

impl fmt::Display for EurekaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EurekaError::Parse(e) => write!(f, "{}", e),
            EurekaError::Validation(e) => write!(f, "{}", e),
            EurekaError::Aggregator(e) => write!(f, "{}", e),
            EurekaError::Conflict { message } => write!(f, "{}", message),
            EurekaError::NotFound { model, id } => write!(f, "{} \"{}\" not found", model, id),
            EurekaError::UnknownResource { plural } => {
                write!(f, "unknown resource \"{}\"", plural)
            }
            EurekaError::UnknownRelation { model, relation } => {
                write!(f, "unknown relation \"{}\" on model \"{}\"", relation, model)
            }
            EurekaError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for EurekaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EurekaError::Parse(e) => Some(e),
            EurekaError::Validation(e) => Some(e),
            EurekaError::Aggregator(e) => Some(e),
            _ => None,
        }
    }
}

impl EurekaError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            EurekaError::Parse(_) | EurekaError::Validation(_) | EurekaError::Aggregator(_) => {
                StatusCode::BAD_REQUEST
            }
            EurekaError::Conflict { .. } => StatusCode::CONFLICT,
            EurekaError::NotFound { .. }
            | EurekaError::UnknownResource { .. }
            | EurekaError::UnknownRelation { .. } => StatusCode::NOT_FOUND,
            EurekaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            EurekaError::Parse(_) => "PARSE_ERROR",
            EurekaError::Validation(e) => e.error_code(),
            EurekaError::Aggregator(_) => "AGGREGATOR_ERROR",
            EurekaError::Conflict { .. } => "CONFLICT",
            EurekaError::NotFound { .. } => "NOT_FOUND",
            EurekaError::UnknownResource { .. } => "UNKNOWN_RESOURCE",
            EurekaError::UnknownRelation { .. } => "UNKNOWN_RELATION",
            EurekaError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing summary of the failure
    pub fn detail(&self) -> String {
        match self {
            EurekaError::Parse(_) => "ParseError: malformed query".to_string(),
            EurekaError::Validation(e) => e.detail(),
            EurekaError::Aggregator(e) => e.detail().to_string(),
            EurekaError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Explanation attached under `meta.infos`
    pub fn infos(&self) -> Option<String> {
        match self {
            EurekaError::Parse(e) => Some(e.to_string()),
            EurekaError::Validation(e) => e.infos(),
            EurekaError::Aggregator(e) => Some(e.infos()),
            _ => None,
        }
    }

    /// Convert to a JSON-API error object
    pub fn to_error_object(&self) -> ErrorObject {
        let status = self.status_code();
        ErrorObject {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            detail: self.detail(),
            meta: self.infos().map(|infos| ErrorMeta { infos }),
        }
    }
}

impl IntoResponse for EurekaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            EurekaError::Internal(msg) => tracing::error!(error = %msg, "request failed"),
            other => tracing::warn!(code = other.error_code(), error = %other, "request rejected"),
        }

        let body = Json(Document::errors(vec![self.to_error_object()]));
        (status, [(header::CONTENT_TYPE, JSON_API_MEDIA_TYPE)], body).into_response()
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// The raw query string is unreadable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed filter \"{key}\"")]
    InvalidFilterKey { key: String },

    #[error("\"{parameter}\" is not a valid array: {message}")]
    InvalidArray { parameter: String, message: String },

    #[error("\"limit\" must be a positive integer, got \"{value}\"")]
    InvalidLimit { value: String },

    #[error("{message}")]
    QueryString { message: String },
}

impl From<ParseError> for EurekaError {
    fn from(err: ParseError) -> Self {
        EurekaError::Parse(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Query or payload does not fit the schema
///
/// `infos` carries the single reason shown to the client, for instance
/// `unknown property "unknwonField" on model "Generic"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A filter condition was rejected
    #[error("malformed query: {infos}")]
    MalformedQuery { infos: String },

    /// A fields, sort or include entry was rejected
    #[error("malformed options: {infos}")]
    MalformedOptions { infos: String },

    /// Request body is not a usable JSON-API document
    #[error("malformed payload")]
    MalformedPayload { infos: Option<String> },

    /// Payload names a property the model does not declare
    #[error("unknown property \"{property}\" on model \"{model}\"")]
    SchemaViolation { model: String, property: String },
}

impl ValidationError {
    pub fn detail(&self) -> String {
        match self {
            ValidationError::MalformedQuery { .. } => "ValidationError: malformed query".to_string(),
            ValidationError::MalformedOptions { .. } => {
                "ValidationError: malformed options".to_string()
            }
            ValidationError::MalformedPayload { .. } => "malformed payload".to_string(),
            ValidationError::SchemaViolation { .. } => format!("ValidationError: {}", self),
        }
    }

    pub fn infos(&self) -> Option<String> {
        match self {
            ValidationError::MalformedQuery { infos }
            | ValidationError::MalformedOptions { infos } => Some(infos.clone()),
            ValidationError::MalformedPayload { infos } => infos.clone(),
            ValidationError::SchemaViolation { .. } => Some(self.to_string()),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::MalformedQuery { .. } => "MALFORMED_QUERY",
            ValidationError::MalformedOptions { .. } => "MALFORMED_OPTIONS",
            ValidationError::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            ValidationError::SchemaViolation { .. } => "SCHEMA_VIOLATION",
        }
    }
}

impl From<ValidationError> for EurekaError {
    fn from(err: ValidationError) -> Self {
        EurekaError::Validation(err)
    }
}

// =============================================================================
// Aggregator Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("unknown property aggregator \"{path}\" on model \"{model}\"")]
    UnknownProperty { model: String, path: String },

    #[error("cannot group by multi-valued property \"{path}\" on model \"{model}\"")]
    MultiValued { model: String, path: String },

    /// The accompanying filter failed validation
    #[error("groupBy: malformed query: {infos}")]
    MalformedQuery { infos: String },
}

impl AggregatorError {
    pub fn detail(&self) -> &'static str {
        match self {
            AggregatorError::UnknownProperty { .. } | AggregatorError::MultiValued { .. } => {
                "malformed aggregator"
            }
            AggregatorError::MalformedQuery { .. } => "groupBy: malformed query",
        }
    }

    pub fn infos(&self) -> String {
        match self {
            AggregatorError::MalformedQuery { infos } => infos.clone(),
            other => other.to_string(),
        }
    }
}

impl From<AggregatorError> for EurekaError {
    fn from(err: AggregatorError) -> Self {
        EurekaError::Aggregator(err)
    }
}

// =============================================================================
// Conversions from store errors
// =============================================================================

impl From<StoreError> for EurekaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { .. } => EurekaError::Conflict {
                message: err.to_string(),
            },
            StoreError::NotFound { model, id } => EurekaError::NotFound { model, id },
            StoreError::Backend { message } => EurekaError::Internal(message),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for request handling
pub type EurekaResult<T> = Result<T, EurekaError>;

// =============================================================================
// Tests
// =============================================================================
