use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// How the initial load settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The stored collection became the snapshot.
    Loaded { books: usize },
    /// Actions accepted before the load resolved were replayed on top of
    /// the stored collection, and the result was saved.
    Rebased { books: usize, replayed: usize },
    /// Nothing was stored.
    Empty,
    /// The stored value was malformed (undecodable, or listing a book
    /// twice); the store kept its in-memory collection.
    Recovered { error: String },
}

/// Completion handle for the initial load started by
/// [`LibraryStore::initialize`](crate::LibraryStore::initialize).
///
/// The store is usable before the load settles; waiting is only needed by
/// callers that want to know the stored books are in.
pub struct LoadTask {
    outcome: Receiver<LoadOutcome>,
}

impl LoadTask {
    pub(crate) fn new(outcome: Receiver<LoadOutcome>) -> Self {
        LoadTask { outcome }
    }

    /// Block until the load settles. `None` if the store shut down first.
    pub fn wait(self) -> Option<LoadOutcome> {
        self.outcome.recv().ok()
    }

    /// Block for at most `timeout`. Hands the task back if the load is still
    /// in flight.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Option<LoadOutcome>, LoadTask> {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn timeout_hands_the_task_back() {
        let (tx, rx) = channel();
        let task = LoadTask::new(rx);

        let task = task.wait_timeout(Duration::from_millis(5)).err().unwrap();
        tx.send(LoadOutcome::Empty).unwrap();
        assert_eq!(task.wait(), Some(LoadOutcome::Empty));
    }

    #[test]
    fn dropped_worker_yields_none() {
        let (tx, rx) = channel::<LoadOutcome>();
        drop(tx);
        assert_eq!(LoadTask::new(rx).wait_timeout(Duration::from_millis(5)).ok(), Some(None));
    }
}
