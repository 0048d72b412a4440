//! Server host shared by every handler
//!
//! The host owns the immutable [`SchemaRegistry`] and the [`Store`]; handlers
//! receive it as `State<Arc<ServerHost>>` and build per-request validators,
//! executors and serializers on top of it.

use crate::core::error::{EurekaError, EurekaResult};
use crate::core::schema::{Schema, SchemaRegistry};
use crate::core::store::Store;
use std::sync::Arc;

pub struct ServerHost {
    /// Declared models, built once at startup
    pub registry: Arc<SchemaRegistry>,

    /// Record storage
    pub store: Arc<dyn Store>,

    /// Path prefix every resource route lives under, e.g. `/api/1`
    pub api_root_prefix: String,
}

impl ServerHost {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn Store>,
        api_root_prefix: impl Into<String>,
    ) -> Self {
        let api_root_prefix: String = api_root_prefix.into();
        Self {
            registry,
            store,
            api_root_prefix: api_root_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Schema exposed under the collection name `plural`
    pub fn schema_for(&self, plural: &str) -> EurekaResult<&Schema> {
        self.registry
            .by_plural(plural)
            .ok_or_else(|| EurekaError::UnknownResource {
                plural: plural.to_string(),
            })
    }

    /// Model names of every exposed collection
    pub fn models(&self) -> Vec<&str> {
        self.registry.models().map(|schema| schema.name()).collect()
    }
}
