//! Packrat cache
//!
//! Successful results are stored per (pattern, position, silent, error count).
//! The error count is part of the key because the same pattern at the same
//! position can behave differently once errors have been recorded (error limits,
//! build failures). Failures are never cached.
//!
//! The cache is bounded. When it reaches 90% of its capacity it drops stale
//! entries (older than the freshness window, or recorded under a different error
//! count) and, if that is not enough, the single oldest entry.

use crate::peg::grammar::Pattern;
use crate::peg::result::Match;
use std::collections::HashMap;

/// Patterns evaluated deeper than this are not cached.
pub const MEMO_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    pattern: usize,
    position: usize,
    silent: bool,
    error_count: usize,
}

impl MemoKey {
    /// Patterns are keyed by address; they live in the rule table for the
    /// whole parse.
    pub fn new(pattern: &Pattern, position: usize, silent: bool, error_count: usize) -> Self {
        Self {
            pattern: pattern as *const Pattern as usize,
            position,
            silent,
            error_count,
        }
    }
}

#[derive(Debug, Clone)]
struct MemoEntry<T> {
    value: Match<T>,
    end: usize,
    error_count: usize,
    inserted: usize,
}

#[derive(Debug)]
pub struct MemoCache<T> {
    entries: HashMap<MemoKey, MemoEntry<T>>,
    max_size: usize,
    freshness: usize,
    tick: usize,
}

impl<T: Clone> MemoCache<T> {
    pub fn new(max_size: usize, freshness: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            freshness,
            tick: 0,
        }
    }

    /// Cached match and the cursor position after it
    pub(crate) fn get(&self, key: &MemoKey) -> Option<(Match<T>, usize)> {
        self.entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.end))
    }

    /// Store a match, evicting first if the cache is nearly full.
    ///
    /// Returns how many entries were evicted.
    pub(crate) fn insert(
        &mut self,
        key: MemoKey,
        value: Match<T>,
        end: usize,
        error_count: usize,
    ) -> usize {
        if self.max_size == 0 {
            return 0;
        }
        let before = self.entries.len();
        let evicted = if before >= self.threshold() {
            self.evict(error_count);
            before - self.entries.len()
        } else {
            0
        };
        self.tick += 1;
        self.entries.insert(
            key,
            MemoEntry {
                value,
                end,
                error_count,
                inserted: self.tick,
            },
        );
        evicted
    }

    fn threshold(&self) -> usize {
        (self.max_size * 9 / 10).max(1)
    }

    fn evict(&mut self, error_count: usize) {
        let tick = self.tick;
        let freshness = self.freshness;
        self.entries.retain(|_, entry| {
            tick - entry.inserted < freshness && entry.error_count == error_count
        });

        if self.entries.len() >= self.max_size {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(key, _)| *key);
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
    }

}

impl<T> MemoCache<T> {
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tick = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
