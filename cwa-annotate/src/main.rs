//! cwa-annotate - check-worthiness annotation service
//!
//! Serves the annotation web form. Settings come from the TOML bootstrap
//! file, overridden by command-line arguments and environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cwa_common::config::{
    self, ConfigSource, StoreBackend, TomlConfig, ACCESS_TOKEN_ENV_VAR, SERVICE_ACCOUNT_KEY_ENV_VAR,
};
use cwa_common::sheets::{
    GoogleAuth, GoogleSheetsClient, GoogleSheetsConfig, MemorySpreadsheet, Spreadsheet,
};
use cwa_annotate::{build_router, spawn_session_sweeper, AnnotatorSettings, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cwa-annotate
#[derive(Parser, Debug)]
#[command(name = "cwa-annotate")]
#[command(about = "Check-worthiness annotation web form")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CWA_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "CWA_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CWA_PORT")]
    port: Option<u16>,

    /// Folder holding one corpus folder per user
    #[arg(long, env = "CWA_CORPUS_ROOT")]
    corpus_root: Option<PathBuf>,

    /// Google Sheets document id
    #[arg(long, env = "CWA_SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,

    /// Service-account JSON key for the Sheets API
    #[arg(long, env = SERVICE_ACCOUNT_KEY_ENV_VAR)]
    service_account_key: Option<PathBuf>,

    /// Fixed OAuth2 bearer token, used when no service-account key is set
    #[arg(long, env = ACCESS_TOKEN_ENV_VAR, hide_env_values = true)]
    access_token: Option<String>,

    /// Spreadsheet backend: google or memory
    #[arg(long, env = "CWA_STORE_BACKEND")]
    backend: Option<StoreBackend>,
}

impl Args {
    /// Fold command-line/environment overrides into the file configuration
    fn apply_to(&self, config: &mut TomlConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(root) = &self.corpus_root {
            config.corpus.root = root.clone();
        }
        if let Some(id) = &self.spreadsheet_id {
            config.sheets.spreadsheet_id = Some(id.clone());
        }
        if let Some(backend) = self.backend {
            config.sheets.backend = backend;
        }
    }
}

fn init_tracing(level: &str) {
    let default_filter = format!("cwa_annotate={level},cwa_common={level},tower_http={level}");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Pick Sheets credentials: a service-account key when configured, else a fixed token
fn resolve_google_auth(
    config: &TomlConfig,
    cli_key: Option<&Path>,
    cli_token: Option<&str>,
) -> Result<GoogleAuth> {
    if let Some(path) = config::resolve_service_account_key(cli_key, &config.sheets) {
        let auth = GoogleAuth::service_account_key(&path)
            .context("Failed to load service account key")?;
        info!("Authenticating to Sheets with service account key {}", path.display());
        return Ok(auth);
    }

    let token = config::resolve_access_token(cli_token, &config.sheets).with_context(|| {
        format!(
            "No Sheets credentials: set {SERVICE_ACCOUNT_KEY_ENV_VAR} (or sheets.service_account_key), \
             or {ACCESS_TOKEN_ENV_VAR} (or sheets.access_token)"
        )
    })?;
    warn!("Authenticating to Sheets with a fixed access token; saves will fail once it expires");
    Ok(GoogleAuth::AccessToken(token))
}

/// Open the configured spreadsheet backend
async fn open_store(config: &TomlConfig, args: &Args) -> Result<Arc<dyn Spreadsheet>> {
    match config.sheets.backend {
        StoreBackend::Google => {
            let spreadsheet_id = config
                .sheets
                .spreadsheet_id
                .as_deref()
                .context("sheets.spreadsheet_id is required for the google backend")?;
            let auth = resolve_google_auth(
                config,
                args.service_account_key.as_deref(),
                args.access_token.as_deref(),
            )?;

            let client_config = GoogleSheetsConfig {
                api_base_url: config.sheets.api_base_url.clone(),
                auth,
                timeout: Duration::from_secs(config.sheets.timeout_secs),
            };
            let client = GoogleSheetsClient::open(spreadsheet_id, client_config)
                .context("Failed to open spreadsheet")?;
            info!(spreadsheet_id = %spreadsheet_id, "Using Google Sheets backend");
            Ok(Arc::new(client))
        }
        StoreBackend::Memory => {
            let store = MemorySpreadsheet::new();
            let rows = config
                .memory
                .allowed_users
                .iter()
                .map(|user| vec![user.clone()])
                .collect();
            store
                .seed_worksheet(&config.sheets.allow_list_sheet, rows)
                .await;
            warn!(
                allowed_users = config.memory.allowed_users.len(),
                "Using in-memory backend; annotations are not persisted"
            );
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let (mut config, source) =
        config::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    init_tracing(&config.logging.level);

    info!("Starting cwa-annotate v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::MissingFile(path) => {
            warn!("Config file {} not found, using defaults", path.display())
        }
        ConfigSource::Defaults => info!("No config file, using defaults"),
    }
    config.validate().context("Invalid configuration")?;

    let store = open_store(&config, &args).await?;
    let settings = AnnotatorSettings::from_config(&config);
    info!(
        "Corpus: {}/<user_id>/{}",
        settings.corpus_root.display(),
        settings.corpus_file
    );

    let state = AppState::new(store, &settings);
    let sweeper = spawn_session_sweeper(state.clone(), settings.session_idle);
    let app = build_router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("cwa-annotate listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    for handle in state.flush_all_sessions().await {
        if let Err(e) = handle.await {
            error!("Final flush task failed: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
