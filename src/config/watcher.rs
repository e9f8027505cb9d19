//! Hot reload of the service config file.
//!
//! The parent directory is watched rather than the file itself so editors that
//! save by rename-over keep producing events. Bursts of events are collapsed by
//! the debouncer into one reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ServiceConfig;

/// Quiet period before a burst of file events triggers a reload.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Reloads the config file on change and forwards valid configs.
pub struct ConfigWatcher {
    path: PathBuf,
    file_name: OsString,
    rx: mpsc::UnboundedReceiver<DebounceEventResult>,
    _debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> Result<Self, notify::Error> {
        Self::with_debounce(path, DEFAULT_DEBOUNCE)
    }

    /// Start watching `path` with a custom quiet period.
    pub fn with_debounce(path: &Path, debounce: Duration) -> Result<Self, notify::Error> {
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            if tx.send(result).is_err() {
                tracing::debug!("Config watcher stopped, dropping file events");
            }
        })?;
        debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            rx,
            _debouncer: debouncer,
        })
    }

    /// Reload on every debounced change until the file events end or
    /// `updates` is closed.
    pub async fn run(mut self, updates: mpsc::UnboundedSender<ServiceConfig>) {
        tracing::info!(path = ?self.path, "Config watcher started");

        while let Some(result) = self.rx.recv().await {
            let events = match result {
                Ok(events) => events,
                Err(errors) => {
                    for e in errors {
                        tracing::error!(error = %e, "Config watch error");
                    }
                    continue;
                }
            };
            if !events.iter().any(|e| self.is_config_change(&e.event)) {
                continue;
            }

            tracing::info!(path = ?self.path, "Config file change detected, reloading");
            match load_config(&self.path) {
                Ok(config) => {
                    if updates.send(config).is_err() {
                        tracing::info!("Config update receiver closed, stopping watcher");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                }
            }
        }
    }

    fn is_config_change(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    fn modified() -> EventKind {
        EventKind::Modify(ModifyKind::Data(DataChange::Content))
    }

    fn watcher_for(dir: &tempfile::TempDir) -> (ConfigWatcher, PathBuf) {
        let path = dir.path().join("service.toml");
        std::fs::write(&path, "").unwrap();
        let watcher = ConfigWatcher::with_debounce(&path, Duration::from_millis(50)).unwrap();
        (watcher, path)
    }

    #[test]
    fn test_only_the_config_file_counts() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _) = watcher_for(&dir);

        assert!(watcher.is_config_change(&event(modified(), "/etc/app/service.toml")));
        assert!(watcher.is_config_change(&event(
            EventKind::Create(CreateKind::File),
            "/etc/app/service.toml"
        )));
        assert!(!watcher.is_config_change(&event(modified(), "/etc/app/service.toml.swp")));
        assert!(!watcher.is_config_change(&event(modified(), "/etc/app/other.toml")));
        assert!(!watcher.is_config_change(&event(
            EventKind::Remove(RemoveKind::File),
            "/etc/app/service.toml"
        )));
    }

    #[test]
    fn test_path_without_file_name_is_rejected() {
        assert!(ConfigWatcher::new(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn test_rewrite_delivers_new_config() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, path) = watcher_for(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(watcher.run(tx));

        // Sibling files are ignored.
        std::fs::write(dir.path().join("notes.txt"), "scratch").unwrap();
        std::fs::write(&path, "[observation]\nmetric_name = \"edge.requests\"\n").unwrap();

        let config = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no config update within timeout")
            .expect("watcher stopped");
        assert_eq!(config.observation.metric_name, "edge.requests");
    }

    #[tokio::test]
    async fn test_invalid_rewrite_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, path) = watcher_for(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(watcher.run(tx));

        std::fs::write(&path, "[observation]\nmetric_name = \"\"\n").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        std::fs::write(&path, "[observation]\nstatic_tag_value = \"edge\"\n").unwrap();

        let config = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no config update within timeout")
            .expect("watcher stopped");
        assert_eq!(config.observation.static_tag_value, "edge");
    }

    #[tokio::test]
    async fn test_stops_when_receiver_closed() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, path) = watcher_for(&dir);
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(watcher.run(tx));
        drop(rx);

        std::fs::write(&path, "[observation]\nmetric_name = \"edge.requests\"\n").unwrap();

        tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .expect("watcher kept running after its receiver closed")
            .unwrap();
    }
}
