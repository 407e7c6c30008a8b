//! Bounded LRU cache of temporary buffers.
//!
//! Temporaries are keyed by plan id, slot and execution context, so repeated
//! executions of one plan in one context reuse the same buffers while
//! concurrent contexts never share one.

use core::any::Any;
use std::collections::BTreeMap;

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::config::{CacheBudget, CacheConfig};
use crate::backend::ElementType;
use crate::error::ContractResult;

/// Caller-supplied token separating concurrent evaluations of one plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionContext(pub u64);

impl ExecutionContext {
    pub const MAIN: ExecutionContext = ExecutionContext(0);

    pub const fn new(id: u64) -> Self {
        ExecutionContext(id)
    }
}

/// Identity of a cached temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub plan: u64,
    pub slot: usize,
    pub context: ExecutionContext,
}

impl CacheKey {
    pub fn new(plan: u64, slot: usize, context: ExecutionContext) -> Self {
        Self {
            plan,
            slot,
            context,
        }
    }
}

/// Shape and element type of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferSpec {
    pub dims: Vec<usize>,
    pub element: ElementType,
}

impl BufferSpec {
    pub fn new(dims: impl Into<Vec<usize>>, element: ElementType) -> Self {
        Self {
            dims: dims.into(),
            element,
        }
    }

    /// Size in bytes.
    pub fn bytes(&self) -> usize {
        self.dims
            .iter()
            .fold(self.element.size(), |acc, &d| acc.saturating_mul(d))
    }
}

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of acquisitions served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    /// `None` while the buffer is handed out.
    buffer: Option<Box<dyn Any + Send>>,
    spec: BufferSpec,
    bytes: usize,
    /// Clock value of the last acquire; the recency index key while idle.
    stamp: u64,
}

impl CacheEntry {
    fn in_use(&self) -> bool {
        self.buffer.is_none()
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Idle entries by last acquire, oldest first.
    recency: BTreeMap<u64, CacheKey>,
    total_bytes: usize,
    clock: u64,
    stats: CacheStats,
    enabled: bool,
}

impl CacheState {
    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        if !entry.in_use() {
            self.recency.remove(&entry.stamp);
        }
        self.total_bytes = self.total_bytes.saturating_sub(entry.bytes);
        Some(entry)
    }

    /// Removes idle entries, least recently used first, until within `budget`.
    fn evict(&mut self, budget: usize, dropped: &mut Vec<CacheEntry>) {
        while self.total_bytes > budget {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.bytes);
                self.stats.evictions += 1;
                log::trace!("evicted {:?} ({} bytes)", key, entry.bytes);
                dropped.push(entry);
            }
        }
    }
}

/// Thread-safe store of reusable temporaries with a byte budget.
///
/// A buffer is owned by whoever acquired it until it is released. Idle
/// buffers are evicted least recently acquired first whenever the total
/// size exceeds the budget. Allocation on a miss happens outside the lock.
pub struct CacheManager {
    budget: usize,
    state: Mutex<CacheState>,
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl CacheManager {
    pub fn new(config: &CacheConfig) -> Self {
        let budget = config.budget.resolve();
        log::debug!("temporary cache with budget {budget} bytes (enabled: {})", config.enabled);
        Self {
            budget,
            state: Mutex::new(CacheState {
                enabled: config.enabled,
                ..Default::default()
            }),
        }
    }

    /// Enabled cache holding at most `bytes` bytes of idle buffers.
    pub fn with_budget(bytes: usize) -> Self {
        Self::new(&CacheConfig::new().with_budget(CacheBudget::Bytes(bytes)))
    }

    /// A cache that never keeps anything.
    pub fn disabled() -> Self {
        Self::new(&CacheConfig::new().with_enabled(false))
    }

    /// Returns the cached buffer for `key` if one with the same spec is idle,
    /// otherwise allocates a new one with `allocate` and registers it.
    pub fn acquire<B, F>(&self, key: CacheKey, spec: &BufferSpec, allocate: F) -> ContractResult<B>
    where
        B: Send + 'static,
        F: FnOnce() -> ContractResult<B>,
    {
        let mut dropped = Vec::new();
        {
            let mut state = self.state.lock();
            if !state.enabled {
                drop(state);
                return allocate();
            }

            let reusable = state
                .entries
                .get(&key)
                .map(|entry| !entry.in_use() && entry.spec == *spec && entry.buffer_is::<B>());
            match reusable {
                Some(true) => {
                    state.clock += 1;
                    let now = state.clock;
                    let entry = state.entries.get_mut(&key).and_then(|e| {
                        let idle_stamp = core::mem::replace(&mut e.stamp, now);
                        e.buffer.take().map(|b| (idle_stamp, b))
                    });
                    if let Some((idle_stamp, buffer)) = entry {
                        state.recency.remove(&idle_stamp);
                        if let Ok(buffer) = buffer.downcast::<B>() {
                            state.stats.hits += 1;
                            log::trace!("cache hit for {key:?}");
                            return Ok(*buffer);
                        }
                    }
                }
                Some(false) => {
                    // stale shape or still handed out: replaced below
                    if let Some(entry) = state.remove(&key) {
                        dropped.push(entry);
                    }
                }
                None => {}
            }
            state.stats.misses += 1;
        }
        drop(dropped);

        log::trace!("cache miss for {key:?}, allocating {} bytes", spec.bytes());
        let buffer = allocate()?;

        let mut dropped = Vec::new();
        {
            let mut state = self.state.lock();
            if let Some(old) = state.remove(&key) {
                dropped.push(old);
            }
            let bytes = spec.bytes();
            state.clock += 1;
            let stamp = state.clock;
            state.total_bytes = state.total_bytes.saturating_add(bytes);
            state.entries.insert(
                key,
                CacheEntry {
                    buffer: None,
                    spec: spec.clone(),
                    bytes,
                    stamp,
                },
            );
            state.evict(self.budget, &mut dropped);
        }
        Ok(buffer)
    }

    /// Hands a buffer back, making it available to the next acquire of `key`.
    pub fn release<B: Send + 'static>(&self, key: CacheKey, buffer: B) {
        let mut dropped = Vec::new();
        {
            let mut state = self.state.lock();
            let checked_out = state.entries.get(&key).is_some_and(CacheEntry::in_use);

            if !state.enabled {
                if checked_out {
                    dropped.extend(state.remove(&key));
                }
                return;
            }
            if !checked_out {
                // entry was cleared while handed out, or another holder already returned it
                return;
            }

            // idle entries are ordered by their last acquire
            let stamp = state.entries.get_mut(&key).map(|entry| {
                entry.buffer = Some(Box::new(buffer));
                entry.stamp
            });
            if let Some(stamp) = stamp {
                state.recency.insert(stamp, key);
            }
            state.evict(self.budget, &mut dropped);
        }
    }

    /// Drops idle entries, least recently used first, until within budget.
    pub fn evict_until_within_budget(&self) {
        let mut dropped = Vec::new();
        self.state.lock().evict(self.budget, &mut dropped);
    }

    /// Drops every entry. Buffers currently handed out are dropped on release.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let entries = core::mem::take(&mut state.entries);
        state.recency.clear();
        state.total_bytes = 0;
        drop(state);
        drop(entries);
    }

    /// Bytes held by all registered entries, idle or handed out.
    pub fn total_bytes(&self) -> usize {
        self.state.lock().total_bytes
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// While disabled, acquire always allocates and release drops the buffer.
    /// Idle entries are kept until cleared.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }
}

impl CacheEntry {
    fn buffer_is<B: 'static>(&self) -> bool {
        self.buffer.as_ref().is_some_and(|b| b.is::<B>())
    }
}
