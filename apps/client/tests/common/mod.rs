//! Common test utilities for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - MemoryDocumentStore, an in-process stand-in for the cloud document store
//! - FlakyStore, a key-value store whose writes can be made to fail
//! - Helpers for building repositories, mergers and progress stores

#![allow(dead_code)]

pub mod fixtures;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use wortschatz_client::db::{
    DbError, KeyValueStore, LocalRepository, SharedRepository, SqliteKeyValueStore,
};
use wortschatz_client::{DocumentStore, ProgressStore, RemoteError, SyncMerger};
use wortschatz_core::types::{AccountSnapshot, SnapshotPatch};

const GATE_PERMITS: usize = 1024;

#[derive(Default)]
struct RemoteState {
    documents: HashMap<String, String>,
    failing: bool,
    creates: usize,
    updates: usize,
}

/// Cloud document store kept in memory.
///
/// Documents are stored as JSON text, like the real collection attribute.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<RemoteState>>,
    read_gate: Arc<Semaphore>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            read_gate: Arc::new(Semaphore::new(GATE_PERMITS)),
        }
    }

    /// A store whose reads block until `open_reads` is called.
    pub fn gated() -> Self {
        Self {
            state: Arc::default(),
            read_gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn open_reads(&self) {
        self.read_gate.add_permits(GATE_PERMITS);
    }

    /// Make every call fail with a network error.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn seed(&self, account_id: &str, snapshot: &AccountSnapshot) {
        self.seed_json(account_id, serde_json::to_value(snapshot).unwrap());
    }

    pub fn seed_json(&self, account_id: &str, document: serde_json::Value) {
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(account_id.to_string(), document.to_string());
    }

    pub fn document(&self, account_id: &str) -> Option<AccountSnapshot> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(account_id)
            .map(|raw| serde_json::from_str(raw).unwrap())
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> usize {
        self.state.lock().unwrap().updates
    }
}

fn offline() -> RemoteError {
    RemoteError::Network("connection refused".to_string())
}

impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, account_id: &str) -> Result<Option<SnapshotPatch>, RemoteError> {
        let _permit = self
            .read_gate
            .acquire()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(offline());
        }
        match state.documents.get(account_id) {
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| RemoteError::Parse(e.to_string())),
            None => Ok(None),
        }
    }

    async fn create_document(
        &self,
        account_id: &str,
        snapshot: &AccountSnapshot,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(offline());
        }
        if state.documents.contains_key(account_id) {
            return Err(RemoteError::Backend {
                status: 409,
                message: "document already exists".to_string(),
            });
        }
        state
            .documents
            .insert(account_id.to_string(), serde_json::to_string(snapshot).unwrap());
        state.creates += 1;
        Ok(())
    }

    async fn update_document(
        &self,
        account_id: &str,
        snapshot: &AccountSnapshot,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(offline());
        }
        match state.documents.get_mut(account_id) {
            Some(raw) => *raw = serde_json::to_string(snapshot).unwrap(),
            None => return Err(RemoteError::NotFound(account_id.to_string())),
        }
        state.updates += 1;
        Ok(())
    }
}

/// SQLite key-value store whose writes fail while `fail_writes` is set.
pub struct FlakyStore {
    inner: SqliteKeyValueStore,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let fail_writes = Arc::new(AtomicBool::new(false));
        let store = Self {
            inner: SqliteKeyValueStore::open_in_memory().unwrap(),
            fail_writes: fail_writes.clone(),
        };
        (store, fail_writes)
    }

    fn check(&self) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("disk full".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), DbError> {
        self.check()?;
        self.inner.remove(key)
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), DbError> {
        self.check()?;
        self.inner.set_many(entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), DbError> {
        self.check()?;
        self.inner.remove_many(keys)
    }
}

/// Fresh in-memory repository.
pub fn memory_repo() -> SharedRepository {
    LocalRepository::new(SqliteKeyValueStore::open_in_memory().unwrap()).shared()
}

/// Initialized progress store over an in-memory repository.
pub async fn ready_store(remote: &MemoryDocumentStore) -> ProgressStore<MemoryDocumentStore> {
    ready_store_with(memory_repo(), remote).await
}

pub async fn ready_store_with(
    repo: SharedRepository,
    remote: &MemoryDocumentStore,
) -> ProgressStore<MemoryDocumentStore> {
    let store = ProgressStore::new(SyncMerger::new(repo, remote.clone()));
    store.init().await.unwrap();
    store
}
