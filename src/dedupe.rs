// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Dedupe Index
 * Suppresses redundant check executions across equivalent targets
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// Per-check sets of claimed dedupe keys. A check that defines a dedupe
/// key runs at most once per `(check_id, key)` pair for the lifetime of
/// one scan; the first claimant wins.
#[derive(Debug, Default)]
pub struct DedupeIndex {
    claims: Mutex<HashMap<String, HashSet<String>>>,
}

impl DedupeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic test-and-insert: returns true (and records the claim) when
    /// the key was not yet claimed for this check.
    pub fn should_run(&self, check_id: &str, key: &str) -> bool {
        let mut claims = self.claims.lock();
        claims
            .entry(check_id.to_string())
            .or_default()
            .insert(key.to_string())
    }

    /// Pre-seed claims, e.g. to merge with a prior scan's work.
    pub fn seed(&self, entries: HashMap<String, HashSet<String>>) {
        let mut claims = self.claims.lock();
        for (check_id, keys) in entries {
            claims.entry(check_id).or_default().extend(keys);
        }
    }

    /// Deep copy for estimation, so counting applicable checks never
    /// pollutes the live index.
    pub fn snapshot(&self) -> DedupeIndex {
        DedupeIndex {
            claims: Mutex::new(self.claims.lock().clone()),
        }
    }

    pub fn claimed_keys(&self, check_id: &str) -> usize {
        self.claims.lock().get(check_id).map_or(0, |s| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_wins() {
        let index = DedupeIndex::new();
        assert!(index.should_run("hsts", "example.com\u{1}443"));
        assert!(!index.should_run("hsts", "example.com\u{1}443"));
        assert!(index.should_run("hsts", "example.com\u{1}8443"));
    }

    #[test]
    fn keys_are_scoped_per_check() {
        let index = DedupeIndex::new();
        assert!(index.should_run("hsts", "k"));
        assert!(index.should_run("server-header-disclosure", "k"));
    }

    #[test]
    fn snapshot_is_isolated() {
        let index = DedupeIndex::new();
        index.should_run("hsts", "a");

        let snap = index.snapshot();
        assert!(!snap.should_run("hsts", "a"));
        assert!(snap.should_run("hsts", "b"));

        // the live index never saw "b"
        assert!(index.should_run("hsts", "b"));
    }

    #[test]
    fn seeding_blocks_future_claims() {
        let index = DedupeIndex::new();
        let mut entries = HashMap::new();
        entries.insert(
            "hsts".to_string(),
            HashSet::from(["example.com\u{1}443".to_string()]),
        );
        index.seed(entries);

        assert!(!index.should_run("hsts", "example.com\u{1}443"));
        assert_eq!(index.claimed_keys("hsts"), 1);
    }
}
