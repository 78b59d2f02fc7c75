//! Library state store - the single source of truth for the collection.
//!
//! The store owns the current snapshot, runs every action through the
//! reducer, notifies subscribers, and hands each accepted snapshot to a
//! persistence worker.
//!
//! ## Example
//!
//! ```ignore
//! use reading_list::{
//!     Codec, InMemoryKeyValueStore, KeyValueGateway, LibraryStore, Status, StoreConfig,
//! };
//!
//! let config = StoreConfig::default();
//! let gateway = KeyValueGateway::from_config(InMemoryKeyValueStore::new(), &config);
//! let store = LibraryStore::with_config(config);
//! let load = store.initialize(gateway)?;
//!
//! let _subscription = store.subscribe(|snapshot| println!("{} books", snapshot.len()));
//! store.add(entry, Status::Reading)?;
//!
//! load.wait();
//! let shelves = store.shelves();
//! store.shutdown();
//! ```
//!
//! ## Ordering
//!
//! State transitions are serialized by one lock. A dispatch never waits on
//! storage: the snapshot is swapped and subscribers are notified before the
//! save is even attempted. Actions accepted before the initial load settles
//! are recorded and replayed on top of the stored collection when it
//! arrives, so a slow load can neither drop them nor be dropped by them.

mod listeners;
mod load;
mod worker;

use chrono::Utc;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use crate::book::{Book, BookId, CatalogEntry, Collection, Status};
use crate::config::StoreConfig;
use crate::error::{PersistenceError, ReducerError, StoreError};
use crate::persist::PersistenceGateway;
use crate::reducer::{rebase, reduce_at, AcceptedAction, Action, Choice};
use crate::view::{project, Shelves};

use listeners::Listeners;
use worker::{PendingSave, PersistWorkerThread, SaveProgress, WorkerCommand};

pub use listeners::Subscription;
pub use load::{LoadOutcome, LoadTask};
pub use worker::PersistStats;

/// State shared between the store handle and its worker.
pub(crate) struct Shared {
    snapshot: RwLock<Collection>,
    transitions: Mutex<Transitions>,
    listeners: Arc<Listeners>,
    progress: SaveProgress,
}

struct Transitions {
    /// Bumped on every snapshot change.
    version: u64,
    load: LoadPhase,
    initialized: bool,
    saves: Option<Sender<WorkerCommand>>,
}

enum LoadPhase {
    /// No gateway yet; the store is purely in memory and records nothing.
    Detached,
    /// Initial load not settled; accepted actions are kept for replay.
    Pending { interim: Vec<AcceptedAction> },
    Settled,
}

impl Shared {
    fn new() -> Self {
        Shared {
            snapshot: RwLock::new(Collection::new()),
            transitions: Mutex::new(Transitions {
                version: 0,
                load: LoadPhase::Detached,
                initialized: false,
                saves: None,
            }),
            listeners: Arc::new(Listeners::new()),
            progress: SaveProgress::new(),
        }
    }

    fn snapshot(&self) -> Collection {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn transitions(&self) -> MutexGuard<'_, Transitions> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in `next` and queue it for subscribers. Call with the transition
    /// lock held.
    fn publish(&self, transitions: &mut Transitions, next: &Collection) -> u64 {
        transitions.version += 1;
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next.clone();
        self.listeners.enqueue(next.clone());
        transitions.version
    }

    /// Resolve an action against the current snapshot and apply it.
    fn apply<F>(&self, resolve: F) -> Result<Collection, ReducerError>
    where
        F: FnOnce(&Collection) -> Result<Action, ReducerError>,
    {
        let next = {
            let mut guard = self.transitions();
            let transitions = &mut *guard;
            let current = self.snapshot();
            let action = resolve(&current)?;
            let now = Utc::now();
            let next = reduce_at(&current, &action, now)?;

            let version = self.publish(transitions, &next);
            self.progress.request(version);
            tracing::debug!(
                action = action.name(),
                book_id = action.book_id().map(BookId::as_str),
                version,
                books = next.len(),
                "accepted action"
            );

            match &mut transitions.load {
                LoadPhase::Detached => {}
                LoadPhase::Pending { interim } => interim.push(AcceptedAction::new(action, now)),
                LoadPhase::Settled => {
                    if let Some(saves) = &transitions.saves {
                        let save = PendingSave {
                            version,
                            snapshot: next.clone(),
                        };
                        if saves.send(WorkerCommand::Save(save)).is_err() {
                            tracing::warn!(version, "persistence worker is gone, change kept in memory only");
                        }
                    }
                }
            }
            next
        };

        self.listeners.drain();
        Ok(next)
    }

    /// Fold the result of the initial load into the store. Returns what to
    /// report and, if the merged state must be written, the save to start
    /// with.
    ///
    /// `loaded` is either what the gateway returned or a permanent error;
    /// transient failures are retried by the worker and never get here.
    pub(crate) fn settle_load(
        &self,
        loaded: Result<Option<Collection>, PersistenceError>,
    ) -> (LoadOutcome, Option<PendingSave>) {
        // Stored values are seeded through ReplaceAll, which rejects duplicates.
        let loaded = loaded.and_then(|stored| {
            stored
                .map(|stored| reduce_at(&Collection::new(), &Action::ReplaceAll(stored), Utc::now()))
                .transpose()
                .map_err(PersistenceError::from)
        });
        let (loaded, recovered) = match loaded {
            Ok(loaded) => (loaded, None),
            Err(err) => {
                tracing::warn!(%err, "stored collection is unusable, keeping the in-memory collection");
                (None, Some(err.to_string()))
            }
        };
        let empty = || match &recovered {
            Some(error) => LoadOutcome::Recovered {
                error: error.clone(),
            },
            None => LoadOutcome::Empty,
        };

        let settled = {
            let mut transitions = self.transitions();
            let interim = match std::mem::replace(&mut transitions.load, LoadPhase::Settled) {
                LoadPhase::Pending { interim } => interim,
                LoadPhase::Detached | LoadPhase::Settled => Vec::new(),
            };

            match loaded {
                Some(stored) if interim.is_empty() => {
                    let books = stored.len();
                    self.publish(&mut transitions, &stored);
                    (LoadOutcome::Loaded { books }, None)
                }
                Some(stored) => {
                    let merged = rebase(&stored, &interim);
                    let version = self.publish(&mut transitions, &merged);
                    self.progress.request(version);
                    let outcome = LoadOutcome::Rebased {
                        books: merged.len(),
                        replayed: interim.len(),
                    };
                    (outcome, Some(PendingSave { version, snapshot: merged }))
                }
                None if interim.is_empty() => (empty(), None),
                None => {
                    let save = PendingSave {
                        version: transitions.version,
                        snapshot: self.snapshot(),
                    };
                    (empty(), Some(save))
                }
            }
        };

        self.listeners.drain();
        settled
    }
}

/// Adds that rebuild `snapshot` when replayed, oldest first, stamped with
/// each book's own filing time.
fn carried_over(snapshot: &Collection) -> Vec<AcceptedAction> {
    snapshot
        .iter()
        .rev()
        .map(|book| {
            AcceptedAction::new(
                Action::add(book.entry().clone(), book.status()),
                book.added_on(),
            )
        })
        .collect()
}

/// The library state store.
///
/// Construct one at the application root, call [`initialize`](Self::initialize)
/// with a gateway, and share it by reference. Readers get immutable
/// [`Collection`] snapshots; writers go through [`dispatch`](Self::dispatch)
/// or its wrappers.
pub struct LibraryStore {
    shared: Arc<Shared>,
    worker: Mutex<Option<PersistWorkerThread>>,
    config: StoreConfig,
}

impl Default for LibraryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        LibraryStore {
            shared: Arc::new(Shared::new()),
            worker: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Start the persistence worker: load the stored collection once, then
    /// save every accepted snapshot. Can be called once per store.
    ///
    /// Until the load settles the store keeps working on its in-memory
    /// collection and remembers the accepted actions so they can be replayed
    /// over the stored books. Nothing is written before then; a load that
    /// keeps failing with I/O errors is retried until it succeeds or the store
    /// shuts down. Books filed before this call are carried over as adds.
    pub fn initialize<G>(&self, gateway: G) -> Result<LoadTask, StoreError>
    where
        G: PersistenceGateway + 'static,
    {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let (commands, inbox) = channel();
        let (outcome, outcome_rx) = channel();

        {
            let mut transitions = self.shared.transitions();
            if transitions.initialized {
                return Err(StoreError::AlreadyInitialized);
            }
            transitions.initialized = true;
            transitions.saves = Some(commands.clone());
            let current = self.shared.snapshot();
            transitions.load = LoadPhase::Pending {
                interim: carried_over(&current),
            };
        }

        *worker = Some(PersistWorkerThread::spawn(
            self.shared.clone(),
            gateway,
            self.config.persist.clone(),
            commands,
            inbox,
            outcome,
        ));
        Ok(LoadTask::new(outcome_rx))
    }

    /// The current collection. Never waits on storage.
    pub fn get_snapshot(&self) -> Collection {
        self.shared.snapshot()
    }

    /// Call `listener` with the new snapshot after every accepted change,
    /// including the initial load.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Collection) + Send + Sync + 'static,
    {
        let id = self.shared.listeners.add(Arc::new(listener));
        Subscription::new(id, &self.shared.listeners)
    }

    /// Run `action` through the reducer and adopt the result. On error the
    /// snapshot is left untouched.
    pub fn dispatch(&self, action: Action) -> Result<(), ReducerError> {
        self.shared.apply(|_| Ok(action)).map(|_| ())
    }

    /// File `entry` under `status`.
    pub fn add(&self, entry: CatalogEntry, status: Status) -> Result<(), ReducerError> {
        self.dispatch(Action::add(entry, status))
    }

    /// Move a filed book to another shelf.
    pub fn reclassify(
        &self,
        book_id: impl Into<BookId>,
        status: Status,
    ) -> Result<(), ReducerError> {
        self.dispatch(Action::reclassify(book_id, status))
    }

    /// Take a filed book out of the collection.
    pub fn remove(&self, book_id: impl Into<BookId>) -> Result<(), ReducerError> {
        self.dispatch(Action::remove(book_id))
    }

    /// Apply a status-sheet choice: add, reclassify or remove `entry`
    /// depending on whether it is filed.
    pub fn file(&self, entry: &CatalogEntry, choice: Choice) -> Result<(), ReducerError> {
        self.shared
            .apply(|current| Action::for_choice(current, entry, choice))
            .map(|_| ())
    }

    /// Advance `entry` one step along the status cycle. Returns its new
    /// status, or `None` if it left the collection.
    pub fn cycle(&self, entry: &CatalogEntry) -> Result<Option<Status>, ReducerError> {
        let next = self
            .shared
            .apply(|current| Ok(Action::for_cycle(current, entry)))?;
        Ok(next.get(&entry.book_id).map(Book::status))
    }

    pub fn find(&self, book_id: &BookId) -> Option<Book> {
        self.get_snapshot().get(book_id).cloned()
    }

    pub fn status_of(&self, book_id: &BookId) -> Option<Status> {
        self.get_snapshot().get(book_id).map(Book::status)
    }

    /// The current snapshot split into shelves.
    pub fn shelves(&self) -> Shelves {
        project(&self.get_snapshot())
    }

    pub fn len(&self) -> usize {
        self.get_snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get_snapshot().is_empty()
    }

    /// Whether the initial load has settled.
    pub fn is_loaded(&self) -> bool {
        matches!(self.shared.transitions().load, LoadPhase::Settled)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Wait until every snapshot accepted so far is durable. Returns false
    /// on timeout, which is what happens when the store was never
    /// initialized or storage keeps failing.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.shared.progress.wait(timeout)
    }

    /// Stop the persistence worker after a final save of the latest
    /// snapshot. Later changes stay in memory only. Returns `None` if the
    /// worker was never started or already stopped.
    pub fn shutdown(&self) -> Option<PersistStats> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        self.shared.transitions().saves = None;

        let stats = worker.stop();
        {
            let mut transitions = self.shared.transitions();
            if matches!(transitions.load, LoadPhase::Pending { .. }) {
                tracing::warn!("stopped before the initial load settled, changes stay in memory");
                transitions.load = LoadPhase::Detached;
            }
        }
        tracing::info!(?stats, "persistence worker stopped");
        Some(stats)
    }
}
