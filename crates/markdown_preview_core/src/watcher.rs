//! Watches the previewed file for changes made outside the page.
//!
//! Uses the platform notifier when available and falls back to polling the
//! file metadata otherwise.

use notify::{Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("cannot watch {0}: not a file path")]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Notify(#[from] notify::Error),
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Interval of the polling fallback.
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

enum Backend {
    Notify(RecommendedWatcher),
    Polling(JoinHandle<()>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Notify(_) => f.write_str("Notify"),
            Self::Polling(_) => f.write_str("Polling"),
        }
    }
}

/// Reports changes to one file.
#[derive(Debug)]
pub struct DocumentWatcher {
    path: PathBuf,
    changes: UnboundedReceiver<()>,
    backend: Backend,
}

impl DocumentWatcher {
    /// Must be called within a tokio runtime.
    pub fn new(path: &Path, config: WatcherConfig) -> Result<Self, WatchError> {
        let (changes_tx, changes) = unbounded_channel();

        let backend = match watch_with_notify(path, changes_tx.clone()) {
            Ok(watcher) => {
                tracing::info!(path = %path.display(), "Started file watcher");
                Backend::Notify(watcher)
            }
            Err(WatchError::InvalidPath(path)) => return Err(WatchError::InvalidPath(path)),
            Err(err) => {
                tracing::warn!(?err, path = %path.display(), "File watcher failed, falling back to polling");
                Backend::Polling(spawn_polling(path, config.poll_interval, changes_tx))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            changes,
            backend,
        })
    }

    /// Watch by polling only. Must be called within a tokio runtime.
    pub fn polling(path: &Path, config: WatcherConfig) -> Self {
        let (changes_tx, changes) = unbounded_channel();
        Self {
            path: path.to_path_buf(),
            changes,
            backend: Backend::Polling(spawn_polling(path, config.poll_interval, changes_tx)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next change. Changes reported while the caller was busy
    /// are coalesced into one.
    pub async fn changed(&mut self) -> Option<()> {
        self.changes.recv().await?;
        while self.changes.try_recv().is_ok() {}
        Some(())
    }
}

impl Drop for DocumentWatcher {
    fn drop(&mut self) {
        if let Backend::Polling(handle) = &self.backend {
            handle.abort();
        }
    }
}

fn watch_with_notify(
    path: &Path,
    changes_tx: UnboundedSender<()>,
) -> Result<RecommendedWatcher, WatchError> {
    // Editors commonly save by renaming a temporary file over the target,
    // so the parent directory is watched rather than the file.
    let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(WatchError::InvalidPath(path.to_path_buf()));
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let file_name = file_name.to_os_string();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| match res {
            Ok(event) => {
                let touches_target = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()));
                if touches_target && (event.kind.is_modify() || event.kind.is_create()) {
                    let _ = changes_tx.send(());
                }
            }
            Err(err) => tracing::error!(?err, "File watcher error"),
        },
        notify::Config::default(),
    )?;

    watcher.watch(parent, RecursiveMode::NonRecursive)?;

    Ok(watcher)
}

fn file_stamp(path: &Path) -> Option<(SystemTime, u64)> {
    let metadata = std::fs::metadata(path).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

fn spawn_polling(
    path: &Path,
    poll_interval: Duration,
    changes_tx: UnboundedSender<()>,
) -> JoinHandle<()> {
    let path = path.to_path_buf();

    tokio::spawn(async move {
        tracing::info!(path = %path.display(), ?poll_interval, "Started polling file watcher");

        let mut last_stamp = file_stamp(&path);
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let stamp = file_stamp(&path);
            if stamp.is_some() && stamp != last_stamp {
                last_stamp = stamp;
                if changes_tx.send(()).is_err() {
                    break;
                }
            }
        }
    })
}
