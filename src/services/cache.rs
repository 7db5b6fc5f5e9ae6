// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discovery response cache and change-notification bus.
//!
//! The cache is keyed by the canonical filter and dropped wholesale whenever
//! the establishment table changes. A generation counter guards against a
//! fetch that started before an invalidation writing its stale result back.

use crate::db::tables;
use crate::models::RankedEstablishment;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const BUS_CAPACITY: usize = 256;

/// Entry cap for the discovery response cache.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Kind of row change reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change on some table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record_id: Option<String>,
}

/// Broadcast channel carrying change notifications.
#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Returns the number of live subscribers.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        tracing::debug!(table = %event.table, kind = ?event.kind, record = ?event.record_id, "Change event");
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Concurrent map whose entries expire after a TTL, holding at most
/// `max_entries` values.
///
/// Expired entries are swept once the map is full; if it is still full the
/// oldest entries are evicted.
pub struct TtlMap<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Fresh value for `key`, if any. Expired entries are removed.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hit = self.entries.get(key).map(|e| e.clone())?;
        if hit.inserted_at.elapsed() > self.ttl {
            self.entries.remove(key);
            return None;
        }
        Some(hit.value)
    }

    pub fn insert(&self, key: K, value: V) {
        if !self.entries.contains_key(&key) {
            self.make_room();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.inserted_at.elapsed() <= ttl);

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.inserted_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Concurrent response cache keyed by filter.
pub struct ResponseCache {
    entries: TtlMap<String, Arc<Vec<RankedEstablishment>>>,
    generation: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_entries(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: TtlMap::new(ttl, max_entries),
            generation: AtomicU64::new(0),
        }
    }

    /// Current generation; record it before starting a fetch.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fresh entry for `key`, if any. Expired entries are removed.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<RankedEstablishment>>> {
        self.entries.get(key)
    }

    /// Store a result fetched under `generation`.
    ///
    /// Returns `false` (and stores nothing) if the cache was invalidated
    /// after the fetch started.
    pub fn insert_if_current(
        &self,
        key: String,
        generation: u64,
        value: Arc<Vec<RankedEstablishment>>,
    ) -> bool {
        if self.generation() != generation {
            tracing::debug!(key = %key, "Discarding stale discovery result");
            return false;
        }
        self.entries.insert(key, value);
        // An invalidation may have raced the insert; undo it if so.
        if self.generation() != generation {
            self.entries.clear();
            return false;
        }
        true
    }

    /// Drop every entry and start a new generation.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let dropped = self.entries.len();
        self.entries.clear();
        tracing::info!(dropped, generation = self.generation(), "Discovery cache invalidated");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Spawn the task that invalidates `cache` on establishment changes.
///
/// A lagged receiver may have missed events, so it invalidates too.
pub fn spawn_invalidator(bus: &ChangeBus, cache: Arc<ResponseCache>) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) if event.table == tables::ESTABLISHMENTS => cache.invalidate_all(),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Change bus lagged; invalidating cache");
                    cache.invalidate_all();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Change bus closed; invalidator stopping");
                    break;
                }
            }
        }
    })
}
