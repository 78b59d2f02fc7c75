//! Background thread that owns the persistence gateway.
//!
//! The worker performs the initial load first, retrying I/O failures until
//! storage answers, then writes snapshots in the order the store accepted
//! them. Queued saves are coalesced to the newest
//! version, so an older snapshot can never land after a newer one. Failed
//! saves are retried with backoff; a newer snapshot replaces the one being
//! retried.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::load::LoadOutcome;
use super::Shared;
use crate::book::Collection;
use crate::config::PersistConfig;
use crate::error::PersistenceError;
use crate::persist::PersistenceGateway;

/// Statistics from the persistence worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PersistStats {
    /// Snapshots written successfully.
    pub saves_completed: usize,
    /// Failed save attempts, retries included.
    pub save_failures: usize,
    /// Snapshots skipped because a newer one was queued behind them.
    pub saves_coalesced: usize,
    /// Load attempts made at startup.
    pub load_attempts: usize,
}

/// A snapshot waiting to be written, tagged with the store version that
/// produced it.
#[derive(Debug, Clone)]
pub(crate) struct PendingSave {
    pub(crate) version: u64,
    pub(crate) snapshot: Collection,
}

pub(crate) enum WorkerCommand {
    Save(PendingSave),
    Stop,
}

/// Highest version handed to the worker versus highest version written.
pub(crate) struct SaveProgress {
    state: Mutex<ProgressState>,
    changed: Condvar,
}

#[derive(Default)]
struct ProgressState {
    requested: u64,
    persisted: u64,
}

impl SaveProgress {
    pub(crate) fn new() -> Self {
        SaveProgress {
            state: Mutex::new(ProgressState::default()),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn request(&self, version: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.requested = state.requested.max(version);
    }

    fn persisted(&self, version: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.persisted = state.persisted.max(version);
        self.changed.notify_all();
    }

    /// Wait until everything requested so far is written.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let target = state.requested;

        while state.persisted < target {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// Handle to the running worker thread.
pub(crate) struct PersistWorkerThread {
    commands: Sender<WorkerCommand>,
    handle: Option<JoinHandle<PersistStats>>,
}

impl PersistWorkerThread {
    pub(crate) fn spawn<G>(
        shared: Arc<Shared>,
        gateway: G,
        config: PersistConfig,
        commands: Sender<WorkerCommand>,
        inbox: Receiver<WorkerCommand>,
        outcome: Sender<LoadOutcome>,
    ) -> Self
    where
        G: PersistenceGateway + 'static,
    {
        let handle = thread::spawn(move || {
            let mut worker = Worker {
                shared,
                gateway,
                config,
                inbox,
                stats: PersistStats::default(),
            };

            match worker.load_with_retries() {
                Some(loaded) => {
                    let first = worker.settle(loaded, &outcome);
                    drop(outcome);
                    worker.run(first);
                }
                None => tracing::info!("stopped before the initial load settled, nothing was written"),
            }
            worker.stats
        });

        Self {
            commands,
            handle: Some(handle),
        }
    }

    /// Signal the worker to stop and wait for its final save.
    /// Returns the worker statistics.
    pub(crate) fn stop(mut self) -> PersistStats {
        let _ = self.commands.send(WorkerCommand::Stop);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => PersistStats::default(),
        }
    }
}

impl Drop for PersistWorkerThread {
    fn drop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Stop);
        // Don't join on drop: a stalled gateway would hang the caller.
    }
}

struct Worker<G> {
    shared: Arc<Shared>,
    gateway: G,
    config: PersistConfig,
    inbox: Receiver<WorkerCommand>,
    stats: PersistStats,
}

enum Wait {
    Forever,
    No,
    For(Duration),
}

impl<G: PersistenceGateway> Worker<G> {
    fn settle(
        &mut self,
        loaded: Result<Option<Collection>, PersistenceError>,
        outcome: &Sender<LoadOutcome>,
    ) -> Option<PendingSave> {
        let (result, save) = self.shared.settle_load(loaded);
        tracing::info!(outcome = ?result, "initial load settled");
        let _ = outcome.send(result);
        save
    }

    /// Load until storage returns data or a permanent error. `None` if the
    /// worker was told to stop first.
    ///
    /// Saves stay held while this runs, so an unreadable slot is never
    /// overwritten by a collection that is missing its stored books.
    fn load_with_retries(&mut self) -> Option<Result<Option<Collection>, PersistenceError>> {
        let mut failures: u32 = 0;

        loop {
            self.stats.load_attempts += 1;
            match self.gateway.load() {
                Err(err) if err.is_transient() => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.backoff(failures);
                    if delay.as_millis() >= u128::from(self.config.max_backoff_ms) {
                        tracing::error!(%err, attempt = failures, "storage still unavailable, changes are not durable yet");
                    } else {
                        tracing::warn!(%err, attempt = failures, "initial load failed, retrying");
                    }
                    if self.stop_requested(delay) {
                        return None;
                    }
                }
                loaded => return Some(loaded),
            }
        }
    }

    /// Sleep for up to `delay`, waking early on a stop request.
    fn stop_requested(&mut self, delay: Duration) -> bool {
        match self.inbox.recv_timeout(delay) {
            Ok(WorkerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => true,
            // The store sends no saves before the load settles.
            Ok(WorkerCommand::Save(_)) | Err(RecvTimeoutError::Timeout) => false,
        }
    }

    fn run(&mut self, mut pending: Option<PendingSave>) {
        let mut failures: u32 = 0;
        let mut stopping = false;

        loop {
            let wait = match (&pending, failures) {
                (None, _) => Wait::Forever,
                (Some(_), 0) => Wait::No,
                (Some(_), n) => Wait::For(self.config.backoff(n)),
            };

            if self.receive(wait, &mut pending) {
                stopping = true;
            }
            while let Ok(command) = self.inbox.try_recv() {
                if self.accept(command, &mut pending) {
                    stopping = true;
                }
            }

            if stopping {
                if let Some(save) = pending.take() {
                    self.final_save(save);
                }
                return;
            }

            if let Some(save) = pending.take() {
                match self.save(&save) {
                    Ok(()) => failures = 0,
                    Err(err) => {
                        failures = failures.saturating_add(1);
                        tracing::warn!(%err, version = save.version, attempt = failures, "save failed, will retry");
                        pending = Some(save);
                    }
                }
            }
        }
    }

    /// Wait for one command. Returns true when the worker should stop.
    fn receive(&mut self, wait: Wait, pending: &mut Option<PendingSave>) -> bool {
        let command = match wait {
            Wait::Forever => self.inbox.recv().ok(),
            Wait::No => match self.inbox.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => None,
            },
            Wait::For(timeout) => match self.inbox.recv_timeout(timeout) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => None,
            },
        };

        match command {
            Some(command) => self.accept(command, pending),
            None => true,
        }
    }

    fn accept(&mut self, command: WorkerCommand, pending: &mut Option<PendingSave>) -> bool {
        match command {
            WorkerCommand::Stop => true,
            WorkerCommand::Save(save) => {
                if let Some(current) = pending.as_ref() {
                    self.stats.saves_coalesced += 1;
                    if current.version >= save.version {
                        return false;
                    }
                }
                *pending = Some(save);
                false
            }
        }
    }

    fn save(&mut self, save: &PendingSave) -> Result<(), PersistenceError> {
        match self.gateway.save(&save.snapshot) {
            Ok(()) => {
                self.stats.saves_completed += 1;
                self.shared.progress.persisted(save.version);
                Ok(())
            }
            Err(err) => {
                self.stats.save_failures += 1;
                Err(err)
            }
        }
    }

    fn final_save(&mut self, save: PendingSave) {
        let attempts = self.config.shutdown_attempts.max(1);
        for attempt in 1..=attempts {
            match self.save(&save) {
                Ok(()) => return,
                Err(err) if attempt < attempts => {
                    tracing::warn!(%err, attempt, "final save failed, retrying");
                    thread::sleep(self.config.backoff(attempt));
                }
                Err(err) => {
                    tracing::error!(%err, version = save.version, "final save failed, latest changes are not durable");
                }
            }
        }
    }
}
