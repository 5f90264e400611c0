//! Query plan cache
//!
//! Maps structural fingerprints to SQL templates. Entries are evicted in
//! insertion order once the cache is full.

use crate::fingerprint::Fingerprint;
use crate::plan::CachePlanEntry;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Plan cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Fingerprint, Arc<CachePlanEntry>>,
    /// Insertion order, oldest first
    order: VecDeque<Fingerprint>,
}

/// Thread-safe FIFO cache of plan templates.
pub struct PlanCache {
    inner: Mutex<Inner>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PlanCache {
    /// Create a new plan cache holding at most `capacity` templates.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a template by fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<CachePlanEntry>> {
        let found = self.inner.lock().entries.get(fingerprint).cloned();

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("Plan cache hit for {}", fingerprint);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!("Plan cache miss for {}", fingerprint);
        }
        found
    }

    /// Insert a template. If another caller inserted the same shape first,
    /// the existing entry is kept.
    pub fn insert(&self, fingerprint: Fingerprint, entry: CachePlanEntry) {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&fingerprint) {
            return;
        }

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted plan {}", oldest);
        }

        inner.order.push_back(fingerprint.clone());
        inner.entries.insert(fingerprint, Arc::new(entry));
    }

    /// Whether a template for `fingerprint` is cached. Does not touch stats.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.lock().entries.contains_key(fingerprint)
    }

    /// Remove every template.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
