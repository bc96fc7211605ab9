// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! LRU cache for creator tier lookups.
//!
//! Tier reads happen on every promotion create and on the creator
//! dashboard; recomputing from all snapshots each time means re-reading
//! the creator's whole social directory. The cache keeps the most recent
//! assessments and is invalidated whenever a verify or disconnect
//! recomputes the tier.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::scoring::TierAssessment;

/// Cached entry: assessment (None = creator has no tier) + insertion time.
struct CacheEntry {
    assessment: Option<TierAssessment>,
    inserted_at: Instant,
}

/// In-process LRU cache for creator tier assessments.
pub struct TierCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl TierCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Get the cached assessment for a creator.
    ///
    /// The outer `Option` distinguishes "not cached" from a cached
    /// "no tier" result.
    pub fn get(&self, creator_user_id: &str) -> Option<Option<TierAssessment>> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(creator_user_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.assessment);
            }
            cache.pop(creator_user_id);
        }
        None
    }

    /// Store an assessment for a creator.
    pub fn put(&self, creator_user_id: &str, assessment: Option<TierAssessment>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                creator_user_id.to_string(),
                CacheEntry {
                    assessment,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop a creator's entry (called after every recompute).
    pub fn invalidate(&self, creator_user_id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(creator_user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::scoring::CreatorTier;

    fn assessment() -> TierAssessment {
        TierAssessment {
            tier: CreatorTier::Gold,
            score: 70.0,
            commission_rate_bps: 500,
        }
    }

    #[test]
    fn get_returns_cached_value() {
        let cache = TierCache::new(10, Duration::from_secs(60));
        cache.put("creator-1", Some(assessment()));

        let hit = cache.get("creator-1").expect("cached");
        assert_eq!(hit.unwrap().tier, CreatorTier::Gold);
    }

    #[test]
    fn caches_no_tier_result() {
        let cache = TierCache::new(10, Duration::from_secs(60));
        cache.put("creator-1", None);

        // Cached, and the cached value is "no tier"
        assert_eq!(cache.get("creator-1"), Some(None));
        // Never cached at all
        assert_eq!(cache.get("creator-2"), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = TierCache::new(10, Duration::from_secs(60));
        cache.put("creator-1", Some(assessment()));
        cache.invalidate("creator-1");
        assert_eq!(cache.get("creator-1"), None);
    }

    #[test]
    fn expired_entries_miss() {
        let cache = TierCache::new(10, Duration::from_millis(0));
        cache.put("creator-1", Some(assessment()));
        assert_eq!(cache.get("creator-1"), None);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = TierCache::new(2, Duration::from_secs(60));
        cache.put("a", None);
        cache.put("b", None);
        cache.put("c", None);

        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }
}
