pub mod cleanup;
mod routes;
pub mod session;
pub mod templates;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::browser;
use crate::collector::{Collector, HttpListingSource, ListingSource, ParseRules};
use crate::config::Config;
use crate::document::ArchiveDocument;
use crate::workflow::CurationSession;

use self::cleanup::{run_cleanup_worker, CleanupConfig};
use self::session::{generate_session_token, SessionStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub source: Arc<dyn ListingSource>,
    /// Cancelled when the server should stop, from a signal or `/exit`.
    pub shutdown: CancellationToken,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, source: Arc<dyn ListingSource>) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            source,
            shutdown: CancellationToken::new(),
        }
    }

    /// State backed by the HTTP listing described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let source = HttpListingSource::new(&config).context("Failed to build listing source")?;
        Ok(Self::new(config, Arc::new(source)))
    }

    /// A fresh, unbound curation session writing to its own output file.
    fn new_session(&self, nick: &str) -> Result<CurationSession> {
        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.config.output_dir.display()
            )
        })?;

        let collector = Collector::new(
            self.source.clone(),
            ParseRules::new(&self.config.site_origin, &self.config.media_host_prefix),
        );
        let document = ArchiveDocument::new(
            output_path(&self.config.output_dir, nick),
            &self.config.document_title,
        );
        Ok(CurationSession::new(collector, document))
    }
}

/// `<nick>-<random>.docx` under `dir`; never shared between sessions.
fn output_path(dir: &std::path::Path, nick: &str) -> PathBuf {
    let stem: String = nick
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let suffix = &generate_session_token()[..8];
    dir.join(format!("{stem}-{suffix}.docx"))
}

/// Filename-safe rendition of a nickname for downloads.
pub(crate) fn attachment_name(subject: &str) -> String {
    let name: String = subject
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "archive".to_string()
    } else {
        name
    }
}

/// Start the web server and block until shutdown.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;
    let open_browser = config.open_browser;
    let cleanup = CleanupConfig::for_idle(config.session_idle);

    let state = AppState::from_config(config)?;
    let shutdown = state.shutdown.clone();

    let cleanup_handle = tokio::spawn(run_cleanup_worker(
        state.sessions.clone(),
        cleanup,
        shutdown.clone(),
    ));

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;
    let local_addr = listener.local_addr().context("Failed to read bound address")?;
    let url = format!("http://{local_addr}/");
    info!(addr = %local_addr, "Starting HTTP web server");

    if open_browser {
        if let Err(e) = browser::open_in_browser(&url).await {
            warn!(url = %url, "Failed to open browser, visit the URL manually: {e:#}");
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Web server error")?;

    shutdown.cancel();
    if let Err(e) = cleanup_handle.await {
        warn!("Cleanup worker ended abnormally: {e}");
    }
    info!("Shutdown complete");

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    info!(static_dir = ?static_dir, "Serving static files");

    Router::new()
        .merge(routes::router())
        .nest_service("/static", ServeDir::new(&static_dir))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on Ctrl+C, SIGTERM, or when `token` is cancelled.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
        () = token.cancelled() => info!("Shutdown requested"),
    }
    token.cancel();
}
