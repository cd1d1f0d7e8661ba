//! HTTP-facing building blocks shared by REST modules: RFC 9457 problems and
//! the OpenAPI registry that the REST host exposes to providers.

pub mod problem;

use utoipa::openapi::OpenApi;

/// Collects OpenAPI fragments from REST providers into the single served document.
pub trait OpenApiRegistry: Send + Sync {
    /// Merge one module's paths and components. Paths already present are kept
    /// (first registration wins) and reported.
    fn register_openapi(&self, module: &str, doc: OpenApi);

    /// Downcast support for accessing the concrete implementation if needed.
    fn as_any(&self) -> &dyn std::any::Any;
}
