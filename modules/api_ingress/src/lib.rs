//! HTTP ingress: owns the listening socket, the global middleware stack and the
//! merged OpenAPI document that REST modules contribute to.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{middleware::from_fn, routing::get, Router};
use modkit::api::OpenApiRegistry;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
mod openapi;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// REST host module. Providers register their routes and OpenAPI fragments
/// during the REST phase; the server itself only starts in `start`.
pub struct ApiIngress {
    config: RwLock<ApiIngressConfig>,
    openapi: Mutex<utoipa::openapi::OpenApi>,
    // Router kept from the REST phase for `start`
    final_router: Mutex<Option<Router>>,
    server: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: RwLock::new(config),
            openapi: Mutex::new(openapi::base_document()),
            final_router: Mutex::new(None),
            server: Mutex::new(None),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        self.config.read().clone()
    }

    /// Current merged OpenAPI document as JSON.
    pub fn openapi_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&*self.openapi.lock())?)
    }

    /// Wraps `router` in the global middleware stack.
    ///
    /// Outermost to innermost: SetRequestId, PropagateRequestId, Trace,
    /// push_req_id_to_extensions, Timeout, CORS, BodyLimit.
    pub fn apply_middleware(&self, router: Router) -> Router {
        let cfg = self.get_config();
        let x_request_id = request_id::header();

        let mut router = router.layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes));
        if cfg.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        router
            .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs)))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    fn host_routes(router: Router) -> Router {
        router
            .route("/health", get(web::health_check))
            .route("/healthz", get(|| async { "ok" }))
    }

    async fn serve(listener: tokio::net::TcpListener, router: Router, cancel: CancellationToken) -> Result<()> {
        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>();
        tracing::debug!(
            module = "api_ingress",
            bind_addr = %cfg.bind_addr,
            enable_docs = cfg.enable_docs,
            "Module initialized"
        );
        *self.config.write() = cfg;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl modkit::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &modkit::ModuleCtx, router: Router) -> Result<Router> {
        tracing::debug!("REST host prepared base router with health checks");
        Ok(Self::host_routes(router))
    }

    fn rest_finalize(&self, _ctx: &modkit::ModuleCtx, mut router: Router) -> Result<Router> {
        if self.get_config().enable_docs {
            let doc = Arc::new(self.openapi_json()?);
            let paths = doc
                .get("paths")
                .and_then(|p| p.as_object())
                .map_or(0, |p| p.len());
            tracing::info!(paths, "rest_finalize: serving OpenAPI document");

            router = router
                .route(
                    "/openapi.json",
                    get({
                        use axum::{http::header, response::IntoResponse};
                        move || {
                            let doc = doc.clone();
                            async move {
                                let json = axum::Json((*doc).clone());
                                ([(header::CACHE_CONTROL, "no-store")], json).into_response()
                            }
                        }
                    }),
                )
                .route("/docs", get(web::serve_docs));
        }

        let router = self.apply_middleware(router);
        *self.final_router.lock() = Some(router.clone());

        tracing::debug!("REST host finalized router");
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_openapi(&self, module: &str, doc: utoipa::openapi::OpenApi) {
        let mut base = self.openapi.lock();
        let incoming = doc.paths.paths.len();
        let skipped = openapi::merge_into(&mut base, doc);
        for path in &skipped {
            tracing::error!(
                module,
                path = %path,
                "Duplicate OpenAPI path detected; keeping the first registration"
            );
        }
        tracing::debug!(
            module,
            registered = incoming - skipped.len(),
            total = base.paths.paths.len(),
            "Registered OpenAPI paths"
        );
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl modkit::StatefulModule for ApiIngress {
    /// Binds the listener before returning so that address errors fail startup.
    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cfg.bind_addr, e))?;

        let stored = { self.final_router.lock().take() };
        let router = match stored {
            Some(r) => r,
            None => {
                tracing::debug!("No router from REST phase, serving host routes only");
                self.apply_middleware(Self::host_routes(Router::new()))
            }
        };

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server bound on {}", addr);

        let handle = tokio::spawn(Self::serve(listener, router, cancel));
        *self.server.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self, cancel: CancellationToken) -> Result<()> {
        cancel.cancel();
        let handle = { self.server.lock().take() };
        let Some(handle) = handle else {
            return Ok(());
        };
        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(Ok(res)) => res,
            Ok(Err(join)) => Err(anyhow::anyhow!("HTTP server task failed: {join}")),
            Err(_) => {
                tracing::warn!("HTTP server did not stop within {:?}", STOP_TIMEOUT);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit::{Module, ModuleCtxBuilder, RestHostModule, StatefulModule};

    struct Cfg(serde_json::Value);
    impl modkit::ConfigProvider for Cfg {
        fn get_module_config(&self, name: &str) -> Option<&serde_json::Value> {
            (name == "api_ingress").then_some(&self.0)
        }
    }

    #[tokio::test]
    async fn init_reads_module_section() {
        let ingress = ApiIngress::default();
        let ctx = ModuleCtxBuilder::new(CancellationToken::new())
            .with_config_provider(Arc::new(Cfg(serde_json::json!({
                "bind_addr": "0.0.0.0:9000",
                "enable_docs": true
            }))))
            .build()
            .for_module("api_ingress");
        ingress.init(&ctx).await.unwrap();

        let cfg = ingress.get_config();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert!(cfg.enable_docs);
        assert_eq!(cfg.request_timeout_secs, 30);
    }

    #[tokio::test]
    async fn start_rejects_invalid_bind_addr() {
        let ingress = ApiIngress::new(ApiIngressConfig {
            bind_addr: "not-an-address".into(),
            ..Default::default()
        });
        let err = ingress.start(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid bind address"));
    }

    #[tokio::test]
    async fn serves_until_cancelled() {
        let ingress = ApiIngress::new(ApiIngressConfig {
            bind_addr: "127.0.0.1:0".into(),
            ..Default::default()
        });
        let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
        let router = ingress.rest_prepare(&ctx, Router::new()).unwrap();
        ingress.rest_finalize(&ctx, router).unwrap();

        let cancel = CancellationToken::new();
        ingress.start(cancel.clone()).await.unwrap();
        ingress.stop(cancel).await.unwrap();
    }
}
