//! cwa-annotate library - check-worthiness annotation service
//!
//! Annotators log in against an allow-list, work through their personal
//! corpus one text unit at a time, and mark spans as check-worthy or other.
//! Annotations are buffered per session and appended to a per-user ledger
//! sheet in batches.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use cwa_common::config::TomlConfig;
use cwa_common::sheets::Spreadsheet;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod capture;
pub mod corpus;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod models;
pub mod persistence;
pub mod session;
pub mod ui;

pub use error::{ApiError, ApiResult};

use corpus::CorpusProvider;
use directory::UserDirectory;
use ledger::Ledger;
use persistence::BatchWriter;
use session::SessionStore;

/// Service settings derived from the bootstrap configuration
#[derive(Debug, Clone)]
pub struct AnnotatorSettings {
    pub allow_list_sheet: String,
    pub corpus_root: PathBuf,
    pub corpus_file: String,
    pub batch_size: usize,
    pub session_idle: Duration,
}

impl AnnotatorSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            allow_list_sheet: config.sheets.allow_list_sheet.clone(),
            corpus_root: config.corpus.root.clone(),
            corpus_file: config.corpus.file_name.clone(),
            batch_size: config.annotation.batch_size,
            session_idle: Duration::from_secs(config.annotation.session_idle_minutes * 60),
        }
    }
}

impl Default for AnnotatorSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: UserDirectory,
    pub ledger: Ledger,
    pub corpus: CorpusProvider,
    pub writer: BatchWriter,
    pub sessions: SessionStore,
    pub batch_size: usize,
    /// Server start, for uptime on /health
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn Spreadsheet>, settings: &AnnotatorSettings) -> Self {
        let ledger = Ledger::new(store.clone());
        Self {
            directory: UserDirectory::new(store, settings.allow_list_sheet.clone()),
            writer: BatchWriter::new(ledger.clone()),
            ledger,
            corpus: CorpusProvider::new(&settings.corpus_root, settings.corpus_file.clone()),
            sessions: SessionStore::new(),
            batch_size: settings.batch_size,
            startup_time: Instant::now(),
        }
    }

    /// Close sessions idle for at least `max_idle`, flushing their buffers
    pub async fn sweep_idle_sessions(&self, max_idle: Duration) -> Vec<JoinHandle<()>> {
        let idle = self.sessions.drain_idle(max_idle).await;
        if !idle.is_empty() {
            tracing::info!(sessions = idle.len(), "Sweeping idle sessions");
        }
        idle.into_iter()
            .filter_map(|state| state.close(&self.writer))
            .collect()
    }

    /// Close every session, flushing their buffers (shutdown)
    pub async fn flush_all_sessions(&self) -> Vec<JoinHandle<()>> {
        let all = self.sessions.drain_all().await;
        tracing::info!(sessions = all.len(), "Flushing all sessions");
        all.into_iter()
            .filter_map(|state| state.close(&self.writer))
            .collect()
    }
}

/// Periodically sweep idle sessions
pub fn spawn_session_sweeper(state: AppState, max_idle: Duration) -> JoinHandle<()> {
    let period = max_idle.min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            // Flush tasks run detached; the sweeper does not wait for them
            let _ = state.sweep_idle_sessions(max_idle).await;
        }
    })
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/", get(api::show_page))
        .route("/login", post(api::login))
        .route("/annotate", post(api::annotate))
        .route("/logout", post(api::logout))
        .route("/api/progress", get(api::progress))
        .route("/static/annotate.js", get(api::serve_annotate_js))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
