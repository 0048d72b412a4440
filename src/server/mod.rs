//! HTTP surface: one set of JSON-API routes serving every declared model
//!
//! This module provides a `ServerBuilder` that mounts:
//! - collection, record and relationship routes for all models
//! - the group-by aggregation route
//! - a health check

pub mod builder;
pub mod handlers;
pub mod host;
pub mod jsonapi;
pub mod router;

pub use builder::ServerBuilder;
pub use host::ServerHost;
pub use jsonapi::{Created, JsonApi};
