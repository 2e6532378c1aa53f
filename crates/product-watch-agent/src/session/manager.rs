//! One live watcher per page, replaced on navigation.
//!
//! The watcher's page snapshot is not `Send`, so the watcher task is spawned
//! with `spawn_local`; every method that opens a watcher must run inside a
//! `tokio::task::LocalSet`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use product_watch::{
    CoordinatorBus, Dispatcher, Document, FileTitleStore, MemoryTitleStore, ProductWatcher,
    TitleStore, WatchCommand, WatchConfig, WatchStatus,
};

use crate::types::{AgentError, AgentResult};

struct ActiveWatcher {
    url: String,
    opened_at: DateTime<Utc>,
    commands: mpsc::UnboundedSender<WatchCommand>,
    task: JoinHandle<ProductWatcher>,
}

/// Owns the config, the coordinator bus and the current watcher task.
pub struct WatchSession {
    config: WatchConfig,
    store_path: Option<PathBuf>,
    bus: CoordinatorBus,
    active: Option<ActiveWatcher>,
}

impl WatchSession {
    /// `store_path` of `None` keeps the last title in memory only.
    pub fn new(config: WatchConfig, store_path: Option<PathBuf>, bus: CoordinatorBus) -> Self {
        Self {
            config,
            store_path,
            bus,
            active: None,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn bus(&self) -> &CoordinatorBus {
        &self.bus
    }

    pub fn url(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.url.as_str())
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|a| a.opened_at)
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    fn open_store(&self) -> Box<dyn TitleStore> {
        let Some(path) = &self.store_path else {
            return Box::new(MemoryTitleStore::new());
        };
        match FileTitleStore::open(path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                tracing::warn!("{e}; keeping the last title in memory only");
                Box::new(MemoryTitleStore::new())
            }
        }
    }

    /// Tear down the current watcher, if any, and start a fresh one for `url`.
    pub async fn open(&mut self, url: &str, html: Option<&str>) -> WatchStatus {
        self.close().await;

        let dispatcher = Dispatcher::new(self.open_store(), self.bus.clone());
        let mut watcher = ProductWatcher::new(self.config.clone(), url, dispatcher);
        watcher.start(html.map(Document::parse).unwrap_or_else(Document::empty));
        let status = watcher.status();

        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::task::spawn_local(watcher.run(rx));
        self.active = Some(ActiveWatcher {
            url: url.to_string(),
            opened_at: Utc::now(),
            commands,
            task,
        });

        tracing::info!("Session opened for {url} ({:?})", status.phase);
        status
    }

    /// Queue a command for the current watcher.
    pub fn send(&self, command: WatchCommand) -> AgentResult<()> {
        let active = self.active.as_ref().ok_or(AgentError::WatcherGone)?;
        active
            .commands
            .send(command)
            .map_err(|_| AgentError::WatcherGone)
    }

    pub async fn current_title(&self) -> AgentResult<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(WatchCommand::CurrentTitle(reply))?;
        rx.await.map_err(|_| AgentError::WatcherGone)
    }

    pub async fn status(&self) -> AgentResult<WatchStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(WatchCommand::Status(reply))?;
        rx.await.map_err(|_| AgentError::WatcherGone)
    }

    /// Evaluate now and wait until the evaluation has happened.
    pub async fn force_check(&self) -> AgentResult<WatchStatus> {
        self.send(WatchCommand::ForceCheck)?;
        self.status().await
    }

    /// Stop the current watcher and wait for its teardown.
    pub async fn close(&mut self) -> Option<ProductWatcher> {
        let active = self.active.take()?;
        let _ = active.commands.send(WatchCommand::Close);
        match active.task.await {
            Ok(watcher) => {
                tracing::info!(
                    "Session for {} closed after {} evaluations",
                    active.url,
                    watcher.stats().evaluations
                );
                Some(watcher)
            }
            Err(e) => {
                tracing::warn!("Watcher task for {} failed: {e}", active.url);
                None
            }
        }
    }
}
