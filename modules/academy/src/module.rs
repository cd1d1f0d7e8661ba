use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use axum::http::HeaderName;
use modkit::api::OpenApiRegistry;
use modkit::{DbModule, Module, ModuleCtx, RestfulModule, StatefulModule};
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::rest::auth::PrincipalHeader;
use crate::api::rest::routes;
use crate::config::{AcademyConfig, StorageKind};
use crate::domain::repo::Storage;
use crate::domain::service::{Service, ServiceConfig};
use crate::infra::storage;

/// The academy module: school data, batch codes, attendance, finance and messaging.
pub struct Academy {
    // Keep the domain service behind ArcSwap for cheap read-mostly access.
    service: ArcSwapOption<Service>,
    config: ArcSwap<AcademyConfig>,
}

impl Default for Academy {
    fn default() -> Self {
        Self {
            service: ArcSwapOption::empty(),
            config: ArcSwap::from_pointee(AcademyConfig::default()),
        }
    }
}

impl Academy {
    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    fn principal_header(cfg: &AcademyConfig) -> anyhow::Result<PrincipalHeader> {
        let name = HeaderName::from_bytes(cfg.principal_header.to_ascii_lowercase().as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid principal_header '{}': {e}", cfg.principal_header))?;
        Ok(PrincipalHeader(name))
    }
}

fn select_storage(cfg: &AcademyConfig, ctx: &ModuleCtx) -> anyhow::Result<(StorageKind, Storage)> {
    match (cfg.storage, ctx.db()) {
        (Some(StorageKind::Memory), _) | (None, None) => Ok((StorageKind::Memory, storage::in_memory())),
        (Some(StorageKind::Database), None) => Err(anyhow::anyhow!(
            "academy storage 'database' requires a configured database"
        )),
        (_, Some(db)) => Ok((StorageKind::Database, storage::sea_orm(db.sea()))),
    }
}

#[async_trait]
impl Module for Academy {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing academy module");

        let cfg: AcademyConfig = ctx.module_config();
        Self::principal_header(&cfg)?;
        debug!(
            storage = ?cfg.storage,
            principal_header = %cfg.principal_header,
            "Loaded academy config"
        );

        let (kind, store) = select_storage(&cfg, ctx)?;
        let service = Service::new(
            store,
            ServiceConfig {
                max_name_length: cfg.max_name_length,
            },
        );
        self.service.store(Some(Arc::new(service)));
        self.config.store(Arc::new(cfg));
        info!(storage = ?kind, "Academy service ready");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Academy {
    async fn migrate(&self, db: &db::DbHandle) -> anyhow::Result<()> {
        info!("Running academy database migrations");
        crate::infra::storage::migrations::Migrator::up(db.seaorm(), None).await?;
        info!("Academy database migrations completed successfully");
        Ok(())
    }
}

impl RestfulModule for Academy {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        info!("Registering academy REST routes");
        let service = self.service()?;
        let header = Self::principal_header(&self.config.load())?;
        let router = routes::register_routes(router, openapi, service, header)?;
        info!("Academy REST routes registered successfully");
        Ok(router)
    }
}

#[async_trait]
impl StatefulModule for Academy {
    /// Seeds the configured administrator once migrations have run.
    async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        let Some(admin) = self.config.load().bootstrap_admin.clone() else {
            return Ok(());
        };
        let service = self.service()?;
        service
            .bootstrap_admin(&admin.email, &admin.display_name)
            .await?;
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }
}
