use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use modkit::{
    ModuleCtx, ModuleCtxBuilder, ModuleEntry, ModuleRegistry, OpenApiRegistry, RestfulModule,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

use api_ingress::{ApiIngress, ApiIngressConfig};

/// Minimal REST provider: one route plus its OpenAPI fragment.
struct TestRoomsModule {
    path: &'static str,
}

#[async_trait::async_trait]
impl modkit::Module for TestRoomsModule {
    async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RestfulModule for TestRoomsModule {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<Router> {
        let doc: utoipa::openapi::OpenApi = serde_json::from_value(serde_json::json!({
            "openapi": "3.1.0",
            "info": { "title": "rooms", "version": "0" },
            "paths": { (self.path): { "get": { "operationId": "list_rooms", "responses": {} } } }
        }))?;
        openapi.register_openapi("rooms", doc);
        Ok(router.route(self.path, get(|| async { Json(serde_json::json!(["Studio A"])) })))
    }
}

fn registry(ingress: Arc<ApiIngress>) -> ModuleRegistry {
    let rooms = Arc::new(TestRoomsModule { path: "/api/rooms" });
    ModuleRegistry::builder()
        .module(
            ModuleEntry::new("api_ingress", ingress.clone())
                .rest_host(ingress.clone())
                .stateful(ingress),
        )
        .module(
            ModuleEntry::new("rooms", rooms.clone())
                .deps(&["api_ingress"])
                .rest(rooms),
        )
        .build()
        .expect("registry")
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn rest_phase_mounts_provider_routes_and_openapi() {
    let ingress = Arc::new(ApiIngress::new(ApiIngressConfig {
        enable_docs: true,
        ..Default::default()
    }));
    let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
    let router = registry(ingress)
        .run_rest_phase(&ctx, Router::new())
        .expect("rest phase");

    let (status, rooms) = get_json(&router, "/api/rooms").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rooms[0], "Studio A");

    let (status, health) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (status, doc) = get_json(&router, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "Academy API");
    assert!(doc["paths"]["/api/rooms"]["get"].is_object());
}

#[tokio::test]
async fn docs_are_hidden_unless_enabled() {
    let ingress = Arc::new(ApiIngress::default());
    let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
    let router = registry(ingress)
        .run_rest_phase(&ctx, Router::new())
        .expect("rest phase");

    let (status, _) = get_json(&router, "/openapi.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_openapi_paths_keep_first_registration() {
    let ingress = ApiIngress::default();
    let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();

    let first = TestRoomsModule { path: "/api/rooms" };
    let router = first
        .register_rest(&ctx, Router::new(), &ingress)
        .expect("first registration");
    let second = TestRoomsModule { path: "/api/rooms/{id}" };
    second
        .register_rest(&ctx, router, &ingress)
        .expect("second registration");
    // Same OpenAPI path again: ignored by the registry
    let _ = first.register_rest(&ctx, Router::new(), &ingress);

    let doc = ingress.openapi_json().unwrap();
    let paths = doc["paths"].as_object().unwrap();
    assert_eq!(paths.len(), 2);
}
