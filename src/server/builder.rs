//! ServerBuilder for fluent API to build HTTP servers

use super::host::ServerHost;
use super::router::build_resource_routes;
use crate::config::EurekaConfig;
use crate::core::error::EurekaError;
use crate::core::schema::SchemaRegistry;
use crate::core::store::Store;
use crate::storage::InMemoryStore;
use anyhow::Result;
use axum::extract::OriginalUri;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for creating HTTP servers with resource routes for every model
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(&EurekaConfig::from_yaml_file("eureka.yaml")?)?
///     .with_store(InMemoryStore::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    registry: Option<SchemaRegistry>,
    store: Option<Arc<dyn Store>>,
    api_root_prefix: String,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            registry: None,
            store: None,
            api_root_prefix: String::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Take the models and the route prefix from a configuration
    pub fn with_config(mut self, config: &EurekaConfig) -> Result<Self> {
        self.registry = Some(config.schema_registry()?);
        self.api_root_prefix = config.api_root_prefix.clone();
        Ok(self)
    }

    /// Set the schema registry (required unless set through a config)
    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the record store
    ///
    /// Defaults to an [`InMemoryStore`] honoring the registry's unique
    /// properties.
    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set a store that is also used outside the server, e.g. for fixtures
    pub fn with_shared_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Mount every resource route under `prefix`, e.g. `/api/1`
    pub fn with_api_root_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_root_prefix = prefix.into();
        self
    }

    /// Add custom routes to the server
    ///
    /// They are merged at the root, next to `/health`, outside the resource
    /// prefix.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the host shared by every handler
    pub fn build_host(mut self) -> Result<ServerHost> {
        let registry = self
            .registry
            .take()
            .ok_or_else(|| anyhow::anyhow!("SchemaRegistry is required. Call .with_registry()"))?;

        let store = match self.store.take() {
            Some(store) => store,
            None => Arc::new(InMemoryStore::for_registry(&registry)) as Arc<dyn Store>,
        };

        Ok(ServerHost::new(
            Arc::new(registry),
            store,
            self.api_root_prefix.clone(),
        ))
    }

    /// Build the final router
    ///
    /// This generates:
    /// - Health check route
    /// - Resource routes for all models, under the prefix
    /// - Custom routes
    /// - A JSON-API 404 for everything else, including unsupported methods
    ///   on known paths
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        let resources = build_resource_routes(host.clone());

        let mut app = Router::new().route("/health", get(health_check));
        app = if host.api_root_prefix.is_empty() {
            app.merge(resources)
        } else {
            app.nest(&host.api_root_prefix, resources)
        };

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        tracing::debug!(
            prefix = %host.api_root_prefix,
            models = ?host.models(),
            "resource routes registered"
        );

        Ok(app
            .method_not_allowed_fallback(not_found)
            .fallback(not_found)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "eureka"
    }))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> EurekaError {
    EurekaError::UnknownResource {
        plural: uri.path().to_string(),
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{PropertyType, Schema};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .register(Schema::new("Generic").property("text", PropertyType::String))
            .build()
            .expect("registry should build")
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ServerBuilder::new();
        assert!(builder.registry.is_none());
        assert!(builder.store.is_none());
        assert!(builder.api_root_prefix.is_empty());
        assert!(builder.custom_routes.is_empty());
    }

    #[test]
    fn test_with_custom_routes_appends_router() {
        let builder = ServerBuilder::new()
            .with_custom_routes(Router::new())
            .with_custom_routes(Router::new());
        assert_eq!(builder.custom_routes.len(), 2);
    }

    #[test]
    fn test_build_host_without_registry_fails() {
        let result = ServerBuilder::new().build_host();
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(
            err_msg.contains("SchemaRegistry is required"),
            "error should mention SchemaRegistry: {}",
            err_msg
        );
    }

    #[test]
    fn test_build_host_defaults_to_in_memory_store() {
        let host = ServerBuilder::new()
            .with_registry(registry())
            .with_api_root_prefix("/api/1")
            .build_host()
            .expect("build_host should succeed");
        assert_eq!(host.api_root_prefix, "/api/1");
        assert!(host.schema_for("generics").is_ok());
    }

    #[test]
    fn test_with_config_sets_registry_and_prefix() {
        let config = EurekaConfig::from_yaml_str(
            r#"
api_root_prefix: /api/2
models:
  Generic:
    properties:
      text: string
"#,
        )
        .expect("config should parse");
        let host = ServerBuilder::new()
            .with_config(&config)
            .expect("config should convert")
            .build_host()
            .expect("build_host should succeed");
        assert_eq!(host.api_root_prefix, "/api/2");
        assert!(host.schema_for("generics").is_ok());
    }

    #[test]
    fn test_build_with_empty_prefix() {
        let router = ServerBuilder::new()
            .with_registry(registry())
            .with_custom_routes(Router::new().route("/custom", get(|| async { "ok" })))
            .build();
        assert!(router.is_ok(), "build should succeed without a prefix");
    }

    #[test]
    fn test_build_without_registry_fails() {
        assert!(ServerBuilder::new().build().is_err());
    }

    #[tokio::test]
    async fn test_built_router_serves_prefix_and_fallback() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
        use tower::ServiceExt;

        let router = ServerBuilder::new()
            .with_registry(registry())
            .with_api_root_prefix("/api/1")
            .build()
            .expect("build should succeed");

        let response = router
            .clone()
            .oneshot(Request::get("/api/1/generics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            crate::document::JSON_API_MEDIA_TYPE
        );

        let response = router
            .clone()
            .oneshot(Request::get("/generics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(Request::delete("/api/1/generics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            crate::document::JSON_API_MEDIA_TYPE
        );
    }
}
