//! Watcher lifecycle and the single cooperative event loop.
//!
//! A [`ProductWatcher`] is created per page load, started once, and torn
//! down on every exit path. While watching, three trigger sources feed the
//! same synchronous evaluation: debounced mutation signals, a periodic
//! safety-net poll, and explicit force checks. All of them are serviced by
//! one `tokio::select!` loop, so two evaluations can never overlap.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::WatchConfig;
use crate::debounce::{self, Debouncer};
use crate::diff::diff_documents;
use crate::dispatch::Dispatcher;
use crate::dom::{Document, MutationRecord};
use crate::gate::ChangeGate;
use crate::pipeline::{PipelineOutcome, TitlePipeline};
use crate::relevance::MutationWatcher;
use crate::types::{CanonicalTitle, ProductChangeEvent, Trigger, WatchStats, WatcherPhase};

/// Inputs accepted by a running watcher.
#[derive(Debug)]
pub enum WatchCommand {
    /// The page changed. Without `records`, the watcher diffs against the
    /// previous snapshot to find out what changed.
    DomChanged {
        html: String,
        records: Option<Vec<MutationRecord>>,
    },
    /// Evaluate immediately, skipping the quiet period.
    ForceCheck,
    /// Reply with the last emitted title.
    CurrentTitle(oneshot::Sender<Option<String>>),
    /// Reply with a status snapshot.
    Status(oneshot::Sender<WatchStatus>),
    /// Tear down and stop the loop.
    Close,
}

/// Point-in-time view of a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStatus {
    pub phase: WatcherPhase,
    pub url: String,
    pub last_title: Option<String>,
    pub observing: bool,
    pub pending_check: bool,
    pub stats: WatchStats,
}

/// Owns every piece of per-page state. No globals.
pub struct ProductWatcher {
    config: WatchConfig,
    url: String,
    phase: WatcherPhase,
    document: Document,
    pipeline: Option<TitlePipeline>,
    observer: Option<MutationWatcher>,
    debouncer: Debouncer,
    gate: ChangeGate,
    dispatcher: Dispatcher,
    stats: WatchStats,
}

impl ProductWatcher {
    pub fn new(config: WatchConfig, url: impl Into<String>, dispatcher: Dispatcher) -> Self {
        let url = url.into();
        let debouncer = Debouncer::new(config.debounce_quiet_period());
        Self {
            gate: ChangeGate::new(url.clone()),
            config,
            url,
            phase: WatcherPhase::Uninitialized,
            document: Document::empty(),
            pipeline: None,
            observer: None,
            debouncer,
            dispatcher,
            stats: WatchStats::default(),
        }
    }

    pub fn phase(&self) -> WatcherPhase {
        self.phase
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn stats(&self) -> WatchStats {
        self.stats
    }

    pub fn last_emitted(&self) -> Option<&CanonicalTitle> {
        self.gate.last_emitted()
    }

    /// Whether mutation batches are being filtered (false means poll-only).
    pub fn is_observing(&self) -> bool {
        self.observer.is_some()
    }

    pub fn has_pending_check(&self) -> bool {
        self.debouncer.is_armed()
    }

    pub fn status(&self) -> WatchStatus {
        WatchStatus {
            phase: self.phase,
            url: self.url.clone(),
            last_title: self.last_emitted().map(|t| t.as_str().to_string()),
            observing: self.is_observing(),
            pending_check: self.has_pending_check(),
            stats: self.stats,
        }
    }

    /// Resolve the profile, attach observation, and run the first check.
    pub fn start(&mut self, document: Document) -> WatcherPhase {
        if self.phase != WatcherPhase::Uninitialized {
            tracing::debug!("Already started, skipping initialization");
            return self.phase;
        }

        self.phase = WatcherPhase::Initializing;
        self.document = document;

        if !self.config.is_supported(&self.url) {
            tracing::info!("Not a supported domain, watcher disabled: {}", self.url);
            self.phase = WatcherPhase::Disabled;
            return self.phase;
        }

        let profile = self.config.profile_for(&self.url);

        self.observer = match MutationWatcher::attach(&profile) {
            Ok(observer) => Some(observer),
            Err(e) => {
                tracing::warn!("{e}; relying on periodic checks only");
                None
            }
        };
        self.pipeline = Some(TitlePipeline::from_profile(&profile, &self.config));
        self.phase = WatcherPhase::Watching;

        tracing::info!(
            "Watching {} (debounce {}ms, poll {}ms, observing: {})",
            self.url,
            self.config.debounce_quiet_period_millis,
            self.config.poll_interval_millis,
            self.is_observing()
        );

        self.evaluate(Trigger::Start);
        self.phase
    }

    /// Replace the current snapshot and filter the accompanying mutations.
    ///
    /// Returns whether a debounced check was scheduled.
    pub fn on_dom_changed(&mut self, html: &str, records: Option<Vec<MutationRecord>>) -> bool {
        if self.phase != WatcherPhase::Watching {
            return false;
        }

        let next = Document::parse(html);
        let records = match records {
            Some(records) => records,
            None if self.observer.is_some() => diff_documents(&self.document, &next),
            None => Vec::new(),
        };
        self.document = next;
        self.on_mutations(&records)
    }

    /// Filter a mutation batch against the current snapshot; schedule a
    /// debounced check if any record is relevant.
    pub fn on_mutations(&mut self, records: &[MutationRecord]) -> bool {
        if self.phase != WatcherPhase::Watching {
            return false;
        }
        let Some(observer) = &self.observer else {
            return false;
        };

        if observer.is_relevant(&self.document, records) {
            self.stats.relevant_batches += 1;
            self.debouncer.schedule();
            true
        } else {
            self.stats.ignored_batches += 1;
            false
        }
    }

    /// Evaluate now, bypassing the quiet period.
    pub fn force_check(&mut self) -> Option<ProductChangeEvent> {
        self.evaluate(Trigger::Force)
    }

    /// Run the debounced check if its deadline has passed at `now`.
    pub fn fire_due(&mut self, now: Instant) -> Option<ProductChangeEvent> {
        if self.debouncer.take_due(now) {
            self.evaluate(Trigger::Debounce)
        } else {
            None
        }
    }

    /// One full pass: locate, extract, normalize, gate, dispatch.
    pub fn evaluate(&mut self, trigger: Trigger) -> Option<ProductChangeEvent> {
        if self.phase != WatcherPhase::Watching {
            return None;
        }
        let pipeline = self.pipeline.as_ref()?;
        self.stats.evaluations += 1;

        let title = match pipeline.run(&self.document) {
            PipelineOutcome::Title(title) => title,
            outcome => {
                tracing::debug!("Skipping {trigger} check: {outcome:?}");
                return None;
            }
        };

        let event = self.gate.evaluate(title)?;
        self.stats.emitted += 1;
        tracing::info!("Product changed ({trigger}): {}", event.title);
        self.dispatcher.dispatch(&event);
        Some(event)
    }

    /// Disconnect observation and clear timers. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.phase == WatcherPhase::TornDown {
            return;
        }
        self.observer = None;
        self.debouncer.cancel();
        self.pipeline = None;
        self.phase = WatcherPhase::TornDown;
        tracing::info!("Watcher for {} torn down", self.url);
    }

    /// Apply one command outside the run loop.
    pub fn handle_command(&mut self, command: WatchCommand) {
        match command {
            WatchCommand::DomChanged { html, records } => {
                self.on_dom_changed(&html, records);
            }
            WatchCommand::ForceCheck => {
                self.force_check();
            }
            WatchCommand::CurrentTitle(reply) => {
                let _ = reply.send(self.last_emitted().map(|t| t.as_str().to_string()));
            }
            WatchCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
            WatchCommand::Close => self.teardown(),
        }
    }

    /// Service commands, debounce expiry and poll ticks until `Close` or
    /// until every sender is dropped, then tear down.
    ///
    /// Call after [`ProductWatcher::start`]. A disabled watcher still
    /// answers queries but never evaluates.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<WatchCommand>) -> Self {
        let period = self.config.poll_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let watching = self.phase == WatcherPhase::Watching;
            let deadline = self.debouncer.deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(WatchCommand::Close) | None => break,
                    Some(command) => self.handle_command(command),
                },
                _ = debounce::sleep_until(deadline), if watching && deadline.is_some() => {
                    self.fire_due(Instant::now());
                }
                _ = ticker.tick(), if watching => {
                    self.evaluate(Trigger::Poll);
                }
            }
        }

        self.teardown();
        self
    }
}
