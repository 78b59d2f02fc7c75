//! Test doubles for the persistence side of the store.

#![allow(dead_code)]

use reading_list::{
    Author, CatalogEntry, Collection, PersistenceError, PersistenceGateway, Status,
};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn entry(id: &str) -> CatalogEntry {
    CatalogEntry::new(id, format!("Book {}", id), Author::named("Author"))
}

pub fn ids(collection: &Collection) -> Vec<String> {
    collection.ids().map(|id| id.to_string()).collect()
}

pub fn statuses(collection: &Collection) -> Vec<(String, Status)> {
    collection
        .iter()
        .map(|book| (book.id().to_string(), book.status()))
        .collect()
}

/// Opens a held load. Dropping it releases the load with its scripted result.
pub struct LoadGate {
    release: Sender<()>,
}

impl LoadGate {
    pub fn open(self) {
        let _ = self.release.send(());
    }
}

#[derive(Default)]
struct Script {
    stored: Option<Collection>,
    load_errors: usize,
    malformed: bool,
    save_errors: usize,
    load_attempts: usize,
    saves: Vec<Collection>,
}

/// Gateway whose behavior is scripted by the test.
///
/// Clones share the same script, so a test keeps one handle while the store
/// owns the other.
#[derive(Clone)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
    gate: Arc<Mutex<Option<Receiver<()>>>>,
    save_delay: Duration,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        ScriptedGateway {
            script: Arc::new(Mutex::new(Script::default())),
            gate: Arc::new(Mutex::new(None)),
            save_delay: Duration::ZERO,
        }
    }

    /// Start with `stored` in storage.
    pub fn storing(stored: Collection) -> Self {
        let gateway = Self::new();
        gateway.script.lock().unwrap().stored = Some(stored);
        gateway
    }

    /// Hold the next load until the returned gate is opened.
    pub fn hold_load(&self) -> LoadGate {
        let (release, held) = channel();
        *self.gate.lock().unwrap() = Some(held);
        LoadGate { release }
    }

    /// Fail the next `count` loads with an I/O error.
    pub fn fail_loads(&self, count: usize) {
        self.script.lock().unwrap().load_errors = count;
    }

    /// Report the stored value as undecodable.
    pub fn malformed(&self) {
        self.script.lock().unwrap().malformed = true;
    }

    /// Fail the next `count` saves with an I/O error.
    pub fn fail_saves(&self, count: usize) {
        self.script.lock().unwrap().save_errors = count;
    }

    /// Make every save take at least `delay`.
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    pub fn saves(&self) -> Vec<Collection> {
        self.script.lock().unwrap().saves.clone()
    }

    pub fn last_saved(&self) -> Option<Collection> {
        self.script.lock().unwrap().saves.last().cloned()
    }

    pub fn load_attempts(&self) -> usize {
        self.script.lock().unwrap().load_attempts
    }

    fn io_error(operation: &'static str) -> PersistenceError {
        PersistenceError::Io {
            operation,
            key: "@lists".to_string(),
            source: std::io::Error::other("disk unavailable"),
        }
    }
}

impl PersistenceGateway for ScriptedGateway {
    fn load(&self) -> Result<Option<Collection>, PersistenceError> {
        let held = self.gate.lock().unwrap().take();
        if let Some(held) = held {
            let _ = held.recv();
        }

        let mut script = self.script.lock().unwrap();
        script.load_attempts += 1;
        if script.load_errors > 0 {
            script.load_errors -= 1;
            return Err(Self::io_error("load"));
        }
        if script.malformed {
            return Err(PersistenceError::MalformedPersistedData {
                reason: "expected an array".to_string(),
            });
        }
        Ok(script.stored.clone())
    }

    fn save(&self, collection: &Collection) -> Result<(), PersistenceError> {
        if !self.save_delay.is_zero() {
            std::thread::sleep(self.save_delay);
        }

        let mut script = self.script.lock().unwrap();
        if script.save_errors > 0 {
            script.save_errors -= 1;
            return Err(Self::io_error("save"));
        }
        script.stored = Some(collection.clone());
        script.saves.push(collection.clone());
        Ok(())
    }
}
