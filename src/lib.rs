//! # Eureka
//!
//! A schema-driven JSON-API query engine for building REST resources in Rust.
//!
//! ## Features
//!
//! - **Schema-Driven**: Models declared once (in code or YAML) drive parsing, validation and output
//! - **Rich Filters**: `filter[integer][$gt]=3`, `$in` sets, dotted relation paths
//! - **Relation Semi-Joins**: `filter[relation.text]=relation 1` across any number of hops
//! - **Compound Documents**: `include` side-loads related resources without duplicates
//! - **Group-By**: `/{plural}/i/group-by/{property}` counts records per value
//! - **Store-Agnostic**: Anything implementing [`Store`](core::store::Store) can back the API
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eureka::prelude::*;
//!
//! let registry = SchemaRegistry::builder()
//!     .register(
//!         Schema::new("Generic")
//!             .property("text", PropertyType::String)
//!             .relation("relation", "GenericRelation"),
//!     )
//!     .register(Schema::new("GenericRelation").property("text", PropertyType::String))
//!     .build()?;
//!
//! ServerBuilder::new()
//!     .with_registry(registry)
//!     .with_api_root_prefix("/api/1")
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod document;
pub mod engine;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Schema ===
    pub use crate::core::schema::{
        Multiplicity, PropertyDef, PropertyType, Schema, SchemaError, SchemaRegistry,
    };

    // === Records and Store ===
    pub use crate::core::{
        field::FieldValue,
        record::{PropertyValue, Record, Reference},
        store::{Criteria, FindOptions, Predicate, Store, StoreError, StoreResult},
    };

    // === Queries ===
    pub use crate::core::query::{Condition, QueryParser, QueryPlan, SortKey};
    pub use crate::core::validation::{PayloadValidator, QueryValidator, ValidatedQuery};
    pub use crate::engine::{Aggregator, Executor, GroupCount};

    // === Documents and Errors ===
    pub use crate::core::error::{EurekaError, EurekaResult};
    pub use crate::document::{Document, serializer::DocumentSerializer};

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::{EurekaConfig, ModelConfig, PropertyConfig};

    // === Server ===
    pub use crate::server::{JsonApi, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        routing::{get, patch, post},
    };
}
