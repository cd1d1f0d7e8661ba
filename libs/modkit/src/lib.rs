//! # ModKit - module wiring for the academy server
//!
//! Modules are plain structs implementing a core [`Module`] trait plus any of the
//! optional capabilities ([`DbModule`], [`RestfulModule`], [`RestHostModule`],
//! [`StatefulModule`]). The binary registers them explicitly, in dependency order,
//! and [`runtime::run`] drives the phases:
//!
//! init → db → rest → start → wait → stop
//!
//! ```rust,ignore
//! let registry = ModuleRegistry::builder()
//!     .module(ModuleEntry::new("api_ingress", ingress.clone()).rest_host(ingress.clone()).stateful(ingress))
//!     .module(ModuleEntry::new("academy", academy.clone()).deps(&["api_ingress"]).db(academy.clone()).rest(academy))
//!     .build()?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod api;
pub mod context;
pub mod contracts;
pub mod registry;
pub mod runtime;

pub use api::problem::{
    bad_request, conflict, forbidden, internal_error, not_found, unauthorized, Problem,
    ProblemResponse, ValidationError,
};
pub use api::OpenApiRegistry;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};
pub use contracts::*;
pub use registry::{ModuleEntry, ModuleRegistry, RegistryError};
pub use runtime::{db_factory, run, DbFactory, DbOptions, RunOptions, ShutdownOptions};
