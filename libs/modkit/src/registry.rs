use axum::Router;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use thiserror::Error;

use crate::context;
use crate::contracts;

/// One registered module and the capabilities it provides.
pub struct ModuleEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn contracts::Module>,
    pub rest: Option<Arc<dyn contracts::RestfulModule>>,
    pub rest_host: Option<Arc<dyn contracts::RestHostModule>>,
    pub db: Option<Arc<dyn contracts::DbModule>>,
    pub stateful: Option<Arc<dyn contracts::StatefulModule>>,
}

impl ModuleEntry {
    pub fn new(name: &'static str, core: Arc<dyn contracts::Module>) -> Self {
        Self {
            name,
            deps: &[],
            core,
            rest: None,
            rest_host: None,
            db: None,
            stateful: None,
        }
    }

    pub fn deps(mut self, deps: &'static [&'static str]) -> Self {
        self.deps = deps;
        self
    }

    pub fn rest(mut self, m: Arc<dyn contracts::RestfulModule>) -> Self {
        self.rest = Some(m);
        self
    }

    pub fn rest_host(mut self, m: Arc<dyn contracts::RestHostModule>) -> Self {
        self.rest_host = Some(m);
        self
    }

    pub fn db(mut self, m: Arc<dyn contracts::DbModule>) -> Self {
        self.db = Some(m);
        self
    }

    pub fn stateful(mut self, m: Arc<dyn contracts::StatefulModule>) -> Self {
        self.stateful = Some(m);
        self
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_db", &self.db.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// Collects entries in registration order; that order is the run order.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<ModuleEntry>,
}

impl RegistryBuilder {
    pub fn module(mut self, entry: ModuleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Validate names, dependencies (each must be registered earlier) and the single REST host.
    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        let mut seen: HashSet<&'static str> = HashSet::new();
        let mut errors = Vec::new();

        for e in &self.entries {
            for &d in e.deps {
                if !seen.contains(d) {
                    let known_later = self.entries.iter().any(|o| o.name == d);
                    return Err(if known_later {
                        RegistryError::DependencyOrder {
                            module: e.name.to_string(),
                            depends_on: d.to_string(),
                        }
                    } else {
                        RegistryError::UnknownDependency {
                            module: e.name.to_string(),
                            depends_on: d.to_string(),
                        }
                    });
                }
            }
            if !seen.insert(e.name) {
                errors.push(format!("Module '{}' is already registered", e.name));
            }
        }

        let hosts: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.rest_host.is_some())
            .map(|e| e.name)
            .collect();
        if hosts.len() > 1 {
            errors.push(format!(
                "Multiple REST host modules detected: {hosts:?}. Only one REST host is allowed."
            ));
        }

        if !errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration { errors });
        }

        tracing::info!(
            modules = ?self.entries.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module order resolved"
        );
        Ok(ModuleRegistry {
            modules: self.entries,
        })
    }
}

/// The final runtime registry.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn contracts::Module>> {
        self.modules
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.core.clone())
    }

    // ---- Ordered phases: init → DB → REST (sync) → start → stop ----

    pub async fn run_init_phase(&self, base_ctx: &context::ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, db: &db::DbHandle) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(dbm) = &e.db {
                tracing::debug!(module = e.name, "running migrations");
                dbm.migrate(db)
                    .await
                    .map_err(|source| RegistryError::DbMigrate {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    pub fn run_rest_phase(
        &self,
        base_ctx: &context::ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let Some(host_entry) = self.modules.iter().find(|e| e.rest_host.is_some()) else {
            return if self.modules.iter().any(|e| e.rest.is_some()) {
                Err(RegistryError::RestRequiresHost)
            } else {
                Ok(router)
            };
        };
        let Some(host) = host_entry.rest_host.as_ref() else {
            return Err(RegistryError::RestRequiresHost);
        };
        let host_ctx = base_ctx.clone().for_module(host_entry.name);
        let registry: &dyn contracts::OpenApiRegistry = host.as_registry();

        router =
            host.rest_prepare(&host_ctx, router)
                .map_err(|source| RegistryError::RestPrepare {
                    module: host_entry.name,
                    source,
                })?;

        for e in &self.modules {
            if let Some(rest) = &e.rest {
                let ctx = base_ctx.clone().for_module(e.name);
                router = rest
                    .register_rest(&ctx, router, registry)
                    .map_err(|source| RegistryError::RestRegister {
                        module: e.name,
                        source,
                    })?;
            }
        }

        router = host.rest_finalize(&host_ctx, router).map_err(|source| {
            RegistryError::RestFinalize {
                module: host_entry.name,
                source,
            }
        })?;

        Ok(router)
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(s) = &e.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Stops in reverse order; failures are logged, not propagated.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) {
        for e in self.modules.iter().rev() {
            if let Some(s) = &e.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = e.name, error = %err, "Failed to stop module");
                }
            }
        }
    }
}

/// Structured errors for the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("DB migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST phase requires an ingress host: modules with capability 'rest' found, but no module with capability 'rest_host'")]
    RestRequiresHost,
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency { module: String, depends_on: String },
    #[error("module '{module}' must be registered after its dependency '{depends_on}'")]
    DependencyOrder { module: String, depends_on: String },
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ModuleCtx, ModuleCtxBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct DummyCore {
        inits: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl contracts::Module for DummyCore {
        async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[derive(Default)]
    struct DummyRestHost {
        docs: std::sync::Mutex<Vec<String>>,
    }

    impl contracts::OpenApiRegistry for DummyRestHost {
        fn register_openapi(&self, module: &str, _doc: utoipa::openapi::OpenApi) {
            self.docs.lock().unwrap().push(module.to_string());
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    impl contracts::RestHostModule for DummyRestHost {
        fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router.route("/healthz", axum::routing::get(|| async { "ok" })))
        }
        fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router)
        }
        fn as_registry(&self) -> &dyn contracts::OpenApiRegistry {
            self
        }
    }

    struct DummyRest;
    impl contracts::RestfulModule for DummyRest {
        fn register_rest(
            &self,
            ctx: &ModuleCtx,
            router: Router,
            openapi: &dyn contracts::OpenApiRegistry,
        ) -> anyhow::Result<Router> {
            openapi.register_openapi(
                ctx.current_module().unwrap_or("?"),
                utoipa::openapi::OpenApi::default(),
            );
            Ok(router.route("/dummy", axum::routing::get(|| async { "dummy" })))
        }
    }

    #[test]
    fn registration_order_is_run_order() {
        let reg = ModuleRegistry::builder()
            .module(ModuleEntry::new("a", Arc::new(DummyCore::default())))
            .module(ModuleEntry::new("b", Arc::new(DummyCore::default())).deps(&["a"]))
            .build()
            .unwrap();
        let names: Vec<_> = reg.modules().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(reg.get_module("b").is_some());
    }

    #[test]
    fn unknown_dependency_error() {
        let err = ModuleRegistry::builder()
            .module(ModuleEntry::new("a", Arc::new(DummyCore::default())).deps(&["missing"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDependency { .. }));
    }

    #[test]
    fn dependency_registered_too_late() {
        let err = ModuleRegistry::builder()
            .module(ModuleEntry::new("b", Arc::new(DummyCore::default())).deps(&["a"]))
            .module(ModuleEntry::new("a", Arc::new(DummyCore::default())))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DependencyOrder { .. }));
    }

    #[test]
    fn duplicates_and_multiple_hosts_reported() {
        let err = ModuleRegistry::builder()
            .module(
                ModuleEntry::new("h1", Arc::new(DummyCore::default()))
                    .rest_host(Arc::new(DummyRestHost::default())),
            )
            .module(
                ModuleEntry::new("h1", Arc::new(DummyCore::default()))
                    .rest_host(Arc::new(DummyRestHost::default())),
            )
            .build()
            .unwrap_err();
        match err {
            RegistryError::InvalidRegistryConfiguration { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rest_requires_host_if_rest_modules_exist() {
        let reg = ModuleRegistry::builder()
            .module(ModuleEntry::new("svc", Arc::new(DummyCore::default())).rest(Arc::new(DummyRest)))
            .build()
            .unwrap();
        let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
        let err = reg.run_rest_phase(&ctx, Router::new()).unwrap_err();
        assert!(matches!(err, RegistryError::RestRequiresHost));
    }

    #[tokio::test]
    async fn rest_phase_registers_providers_with_host_registry() {
        use tower::ServiceExt;

        let host = Arc::new(DummyRestHost::default());
        let reg = ModuleRegistry::builder()
            .module(ModuleEntry::new("host", Arc::new(DummyCore::default())).rest_host(host.clone()))
            .module(
                ModuleEntry::new("svc", Arc::new(DummyCore::default()))
                    .deps(&["host"])
                    .rest(Arc::new(DummyRest)),
            )
            .build()
            .unwrap();

        let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
        let router = reg.run_rest_phase(&ctx, Router::new()).unwrap();
        assert_eq!(*host.docs.lock().unwrap(), vec!["svc".to_string()]);

        let resp = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/dummy")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn init_and_lifecycle_phases_run() {
        let a = Arc::new(DummyCore::default());
        let reg = ModuleRegistry::builder()
            .module(ModuleEntry::new("a", a.clone()))
            .build()
            .unwrap();

        let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
        reg.run_init_phase(&ctx).await.unwrap();
        assert_eq!(a.inits.load(Ordering::SeqCst), 1);

        let cancel = CancellationToken::new();
        reg.run_start_phase(cancel.child_token()).await.unwrap();
        reg.run_stop_phase(cancel.child_token()).await;
    }
}
