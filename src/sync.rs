//! Periodic and on-demand reconciliation with the remote source.
//!
//! A sync cycle is fetch → merge → persist → notify. The fetch runs without
//! holding the store lock; the merge reads the store's list under the same
//! lock that applies the result, so a quote added while the fetch is in
//! flight is part of the merge input instead of being overwritten.
//!
//! Only one cycle runs at a time. `run_cycle` called while another cycle is
//! in flight returns [`SyncOutcome::Skipped`], and the background loop
//! coalesces manual triggers through a one-slot queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::events::{EventSender, QuoteEvent};
use crate::gateway::{FetchOutcome, RemoteSource};
use crate::merge::{self, Conflict};
use crate::quote::Quote;
use crate::store::QuoteStore;

pub type SharedStore = Arc<Mutex<QuoteStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// Summary of a cycle whose fetch succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub changed: bool,
    pub added: usize,
    pub conflicts: Vec<Conflict>,
    pub total: usize,
    pub completed_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// The remote could not be read; local state was left alone.
    FetchFailed(String),
    /// The merged list could not be persisted; local state was left alone.
    ApplyFailed(String),
    /// Another cycle was already in flight.
    Skipped,
}

/// Clears the in-flight flag however the cycle ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncScheduler {
    store: SharedStore,
    remote: Arc<dyn RemoteSource>,
    events: EventSender,
    interval: Duration,
    in_flight: AtomicBool,
}

impl SyncScheduler {
    pub fn new(
        store: SharedStore,
        remote: Arc<dyn RemoteSource>,
        events: EventSender,
        interval: Duration,
    ) -> Self {
        // tokio intervals must be non-zero
        let interval = interval.max(Duration::from_secs(1));
        Self {
            store,
            remote,
            events,
            interval,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SyncState {
        if self.in_flight.load(Ordering::Acquire) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one fetch → merge → persist → notify cycle.
    pub async fn run_cycle(&self) -> SyncOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sync already in flight, skipping");
            return SyncOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        match self.remote.fetch().await {
            FetchOutcome::Fetched(remote) => self.apply(remote).await,
            FetchOutcome::Failed(reason) => {
                tracing::warn!(err = %reason, "sync cycle skipped: remote fetch failed");
                SyncOutcome::FetchFailed(reason)
            }
        }
    }

    async fn apply(&self, remote: Vec<Quote>) -> SyncOutcome {
        let mut store = self.store.lock().await;
        let report = merge::reconcile(store.quotes(), &remote);

        for conflict in &report.conflicts {
            tracing::info!(
                text = %conflict.text,
                local = %conflict.local_category,
                remote = %conflict.remote_category,
                "remote category replaced local category"
            );
        }

        let changed = report.changed();
        if changed {
            if let Err(e) = store.replace(report.merged) {
                let reason = format!("{e:#}");
                tracing::warn!(err = %reason, "failed to persist merged quotes");
                return SyncOutcome::ApplyFailed(reason);
            }
        }

        let completed_at = Utc::now();
        if let Err(e) = store.record_sync(completed_at) {
            tracing::warn!(err = %e, "could not record sync time");
        }

        let message = if changed {
            format!(
                "Quotes synced with server: {} new, {} updated from server.",
                report.added.len(),
                report.conflicts.len()
            )
        } else {
            "Quotes already up to date with server.".to_string()
        };
        tracing::info!(
            changed,
            added = report.added.len(),
            conflicts = report.conflicts.len(),
            total = store.len(),
            "sync cycle complete"
        );

        let _ = self.events.send(QuoteEvent::SyncCompleted(message.clone()));

        SyncOutcome::Completed(SyncReport {
            changed,
            added: report.added.len(),
            conflicts: report.conflicts,
            total: store.len(),
            completed_at,
            message,
        })
    }

    /// Send a snapshot of the local list to the remote. Never fails.
    pub async fn push_local(&self) {
        let snapshot = self.store.lock().await.quotes().to_vec();
        self.remote.push(&snapshot).await;
    }

    /// Run cycles on the configured interval and whenever [`SyncHandle::trigger`]
    /// is called, until [`SyncHandle::shutdown`].
    pub fn spawn(self: Arc<Self>) -> SyncHandle {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = self.interval.as_secs(), "sync scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    Some(()) = trigger_rx.recv() => {
                        tracing::debug!("manual sync triggered");
                    }
                    _ = shutdown_rx.changed() => break,
                }
                self.run_cycle().await;
            }

            tracing::info!("sync scheduler stopped");
        });

        SyncHandle {
            trigger_tx,
            shutdown_tx,
            task,
        }
    }
}

pub struct SyncHandle {
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Queue a sync. Returns false if one is already queued.
    pub fn trigger(&self) -> bool {
        match self.trigger_tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::debug!("sync already queued, dropping trigger");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }

    /// Stop the loop. An in-flight cycle is allowed to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(err = %e, "sync scheduler task failed");
        }
    }
}
