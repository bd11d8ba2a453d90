use anyhow::{anyhow, Context, Result};
use clap::Parser;
use markdown_preview_core::assets::Assets;
use markdown_preview_core::highlight::theme_css;
use markdown_preview_core::{DocumentWatcher, PreviewSession, WatcherConfig};
use preview_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

/// Starts the live preview server.
#[derive(Parser, Debug, Clone)]
pub struct Serve {
    /// Markdown file to preview; changes on disk are picked up live.
    pub file: Option<PathBuf>,

    /// Port to listen on, overrides `[server] port`.
    #[clap(long)]
    pub port: Option<u16>,

    /// Address to listen on, overrides `[server] host`.
    #[clap(long)]
    pub host: Option<String>,

    /// Do not open the preview in the browser.
    #[clap(long)]
    pub no_browser: bool,
}

/// Feed changes of `path` on disk into the session.
fn spawn_file_reload(path: PathBuf, session: Arc<PreviewSession>) -> Result<()> {
    let mut watcher = DocumentWatcher::new(&path, WatcherConfig::default())?;

    tokio::spawn(async move {
        while watcher.changed().await.is_some() {
            match tokio::fs::read_to_string(watcher.path()).await {
                Ok(text) => {
                    if text != session.document() {
                        tracing::debug!(path = %watcher.path().display(), "Reloading changed file");
                        session.load(text);
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %watcher.path().display(), %err, "Failed to read changed file");
                }
            }
        }
    });

    Ok(())
}

impl Serve {
    pub async fn run(self, config: &Config) -> Result<()> {
        let pipeline = Arc::new(super::build_pipeline(config).await);
        let session = Arc::new(PreviewSession::new(pipeline, config.debounce()));

        if let Some(path) = &self.file {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            session.load(text);
            spawn_file_reload(path.clone(), session.clone())?;
        }

        // Initial render, so the page never waits on the debounce.
        session.render_now().await;

        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .with_context(|| format!("failed to listen on {host}:{port}"))?;

        let page = Assets::build_html(&theme_css(&config.highlight.theme));
        let open_browser = config.server.open_browser && !self.no_browser;

        markdown_preview_server::serve(listener, session, page, open_browser)
            .await
            .map_err(|err| anyhow!(err))
    }
}
