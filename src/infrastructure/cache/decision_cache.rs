//! Copy-on-write decision cache

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::domain::authorization::DecisionKind;
use crate::domain::cache::{CacheKey, DecisionCacheEntries, PrincipalId};

/// Generation observed before computing a decision to be cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillToken(u64);

/// Decision cache published as immutable snapshots
///
/// Readers clone the current `Arc` and never observe a partial purge. Writers
/// are serialized and swap in a new map. Every purge bumps the generation, and
/// a fill whose token predates the current generation is discarded.
#[derive(Debug, Default)]
pub struct DecisionCache {
    entries: RwLock<Arc<DecisionCacheEntries>>,
    writer: Mutex<()>,
    generation: AtomicU64,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache seeded with entries
    pub fn with_entries(entries: DecisionCacheEntries) -> Self {
        Self {
            entries: RwLock::new(Arc::new(entries)),
            ..Self::default()
        }
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<DecisionCacheEntries> {
        Arc::clone(&self.entries.read())
    }

    pub fn get(&self, key: &CacheKey) -> Option<DecisionKind> {
        self.entries.read().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Take a token before reading the state a cached decision is derived from
    pub fn begin_fill(&self) -> FillToken {
        FillToken(self.generation())
    }

    /// Store a decision unless a purge happened since `token` was taken
    pub fn fill(&self, token: FillToken, key: CacheKey, decision: DecisionKind) -> bool {
        let _writer = self.writer.lock();

        if self.generation() != token.0 {
            debug!(key = %key, "Discarded stale cache fill");
            return false;
        }

        let mut entries = self.entries.write();
        Arc::make_mut(&mut entries).insert(key, decision);
        true
    }

    /// Store a decision unconditionally
    pub fn insert(&self, key: CacheKey, decision: DecisionKind) {
        let _writer = self.writer.lock();
        let mut entries = self.entries.write();
        Arc::make_mut(&mut entries).insert(key, decision);
    }

    /// Remove one entry. Returns whether it was present.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.replace_with(|entries| {
            if !entries.contains_key(key) {
                return (None, false);
            }
            let mut next = entries.clone();
            next.remove(key);
            (Some(next), true)
        })
    }

    /// Remove every entry of a principal. Returns the number removed.
    pub fn remove_principal(&self, principal_id: &PrincipalId) -> usize {
        self.remove_principals(&HashSet::from([principal_id.clone()]))
    }

    /// Remove every entry of the given principals. Returns the number removed.
    pub fn remove_principals(&self, principals: &HashSet<PrincipalId>) -> usize {
        self.replace_with(|entries| {
            let next: DecisionCacheEntries = entries
                .iter()
                .filter(|(key, _)| !principals.contains(&key.principal_id))
                .map(|(key, decision)| (key.clone(), *decision))
                .collect();

            let removed = entries.len() - next.len();
            if removed == 0 {
                (None, 0)
            } else {
                (Some(next), removed)
            }
        })
    }

    /// Compute a replacement map from the current snapshot and publish it
    ///
    /// `purge` runs off to the side while concurrent readers keep the old
    /// snapshot. Returning `None` keeps the current map. The generation
    /// advances either way, so fills computed before the purge are discarded.
    pub fn replace_with<T>(
        &self,
        purge: impl FnOnce(&DecisionCacheEntries) -> (Option<DecisionCacheEntries>, T),
    ) -> T {
        let _writer = self.writer.lock();
        let current = self.snapshot();

        let (next, output) = purge(&current);
        if let Some(next) = next {
            *self.entries.write() = Arc::new(next);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        output
    }
}
