// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Picks one survivor per logical identity `(kind, key)`.
//!
//! A decisively more confident candidate wins outright. Within the
//! confidence band the more recent candidate wins and its score is boosted
//! once. Equal confidence band and equal turn keep whichever came first.

use std::collections::HashMap;

use recollect_config::model::ConflictConfig;
use recollect_core::{MemoryEntry, MemoryKind};

/// Absorbs float noise so a delta of exactly the threshold is a near tie.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// A candidate entry with its decayed score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub entry: MemoryEntry,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn new(entry: MemoryEntry, score: f64) -> Self {
        Self { entry, score }
    }
}

struct Slot {
    candidate: ScoredCandidate,
    boosted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    threshold: f64,
    recency_boost: f64,
}

impl ConflictResolver {
    pub fn new(config: &ConflictConfig) -> Self {
        Self {
            threshold: config.confidence_threshold,
            recency_boost: config.recency_boost,
        }
    }

    /// Fold candidates in order and return one survivor per `(kind, key)`,
    /// in the order each identity was first seen.
    pub fn resolve(&self, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        let mut slots: Vec<Slot> = Vec::new();
        let mut by_identity: HashMap<(MemoryKind, String), usize> = HashMap::new();

        for candidate in candidates {
            let identity = (candidate.entry.kind, candidate.entry.key.clone());
            let Some(&idx) = by_identity.get(&identity) else {
                by_identity.insert(identity, slots.len());
                slots.push(Slot {
                    candidate,
                    boosted: false,
                });
                continue;
            };
            self.fold(&mut slots[idx], candidate);
        }

        slots.into_iter().map(|slot| slot.candidate).collect()
    }

    fn fold(&self, slot: &mut Slot, incoming: ScoredCandidate) {
        let band = self.threshold + THRESHOLD_EPSILON;
        let delta = incoming.entry.confidence - slot.candidate.entry.confidence;

        if delta > band {
            *slot = Slot {
                candidate: incoming,
                boosted: false,
            };
        } else if delta < -band {
            // Stored candidate is decisively more confident.
        } else if incoming.entry.source_turn > slot.candidate.entry.source_turn {
            let mut winner = incoming;
            winner.score *= self.recency_boost;
            *slot = Slot {
                candidate: winner,
                boosted: true,
            };
        } else if incoming.entry.source_turn < slot.candidate.entry.source_turn && !slot.boosted {
            slot.candidate.score *= self.recency_boost;
            slot.boosted = true;
        }
    }
}
