//! Router builder for resource routes

use super::handlers::{
    create, find, find_one, group_by, related, relationship, update, update_relationship,
};
use super::host::ServerHost;
use axum::{Router, routing::get};
use std::sync::Arc;

/// Build the resource routes shared by every model
///
/// These routes are generic and work for all declared models:
/// - GET   /{plural} - Query a collection
/// - POST  /{plural} - Create a record
/// - GET   /{plural}/i/group-by/{property} - Count records per value
/// - GET   /{plural}/{id} - Fetch one record
/// - PATCH /{plural}/{id} - Update attributes and relationships
/// - GET   /{plural}/{id}/relationships/{relation} - Relationship linkage
/// - PATCH /{plural}/{id}/relationships/{relation} - Replace a relationship
/// - GET   /{plural}/{id}/{relation} - Related resource(s)
pub fn build_resource_routes(host: Arc<ServerHost>) -> Router {
    Router::new()
        .route("/{plural}", get(find).post(create))
        .route("/{plural}/i/group-by/{property}", get(group_by))
        .route("/{plural}/{id}", get(find_one).patch(update))
        .route(
            "/{plural}/{id}/relationships/{relation}",
            get(relationship).patch(update_relationship),
        )
        .route("/{plural}/{id}/{relation}", get(related))
        .with_state(host)
}
