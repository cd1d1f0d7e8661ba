use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use db::{ConnectOpts, DbHandle};
use mimalloc::MiMalloc;
use modkit::{db_factory, run, DbOptions, ModuleEntry, ModuleRegistry, RunOptions, ShutdownOptions};
use runtime::{AppConfig, AppConfigProvider, CliArgs, ConfigProvider, DatabaseConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(AppConfigProvider);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

/// Academy Server - school management backend for music and dance academies
#[derive(Parser)]
#[command(name = "academy-server")]
#[command(about = "Academy Server - school management backend for music and dance academies")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run without a database on the in-memory store
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    inject_bind_addr(&mut config);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(home_dir = %config.server.home_dir, "Academy Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

/// `server.host`/`server.port` feed the ingress unless its section sets `bind_addr`.
fn inject_bind_addr(config: &mut AppConfig) {
    let bind_addr = config.server.bind_addr();
    let section = config
        .modules
        .entry("api_ingress".to_string())
        .or_insert_with(|| serde_json::json!({}));
    if let Some(obj) = section.as_object_mut() {
        obj.entry("bind_addr")
            .or_insert_with(|| serde_json::Value::String(bind_addr));
    }
}

/// Detect DB backend from URL scheme.
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    if raw.eq_ignore_ascii_case("sqlite::memory:") {
        return Ok("sqlite");
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;
    match url.scheme() {
        "sqlite" | "sqlite3" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

fn db_options(config: &AppConfig) -> Result<DbOptions> {
    let Some(db_config) = config.database.clone() else {
        tracing::warn!("No database configuration found, academy runs on the in-memory store");
        return Ok(DbOptions::None);
    };
    let backend = detect_from_dsn(&db_config)?;

    // Base dir for resolving relative sqlite paths (already absolute & created)
    let base_dir = PathBuf::from(&config.server.home_dir);

    Ok(DbOptions::Auto(db_factory(move || async move {
        let mut dsn = db_config.url.trim().to_owned();
        if backend == "sqlite" {
            dsn = db::absolutize_sqlite_dsn(&dsn, &base_dir)?;
        }

        let connect_opts = ConnectOpts {
            max_conns: db_config.max_conns,
            acquire_timeout: Some(Duration::from_secs(5)),
            sqlite_busy_timeout: db_config
                .busy_timeout_ms
                .map(|ms| Duration::from_millis(u64::from(ms))),
            create_sqlite_dirs: true,
            ..Default::default()
        };

        tracing::info!(backend, "Connecting to database");
        let db = DbHandle::connect(&dsn, connect_opts).await?;
        tracing::info!("Connected DB backend: {:?}", db.engine());
        Ok(Arc::new(db))
    })))
}

fn build_registry() -> Result<ModuleRegistry> {
    let ingress = Arc::new(api_ingress::ApiIngress::default());
    let academy = Arc::new(academy::Academy::default());

    let registry = ModuleRegistry::builder()
        .module(
            ModuleEntry::new("api_ingress", ingress.clone())
                .rest_host(ingress.clone())
                .stateful(ingress),
        )
        .module(
            ModuleEntry::new("academy", academy.clone())
                .deps(&["api_ingress"])
                .db(academy.clone())
                .rest(academy.clone())
                .stateful(academy),
        )
        .build()?;
    Ok(registry)
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let db = db_options(&config)?;
    let registry = build_registry()?;
    let modules_cfg = Arc::new(ModkitConfigAdapter(AppConfigProvider::new(config)));

    run(RunOptions {
        registry,
        modules_cfg,
        db,
        shutdown: ShutdownOptions::Signals,
    })
    .await
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    if let Some(db) = &config.database {
        detect_from_dsn(db)?;
    }
    build_registry()?;

    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
