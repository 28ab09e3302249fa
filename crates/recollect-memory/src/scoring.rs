// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Age decay and confidence weighting of raw similarity scores.

use recollect_core::MemoryEntry;

/// Parameters for turning a hybrid similarity score into a decayed score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    pub lambda: f64,
    pub max_age_turns: u64,
}

impl DecayPolicy {
    pub fn new(lambda: f64, max_age_turns: u64) -> Self {
        Self {
            lambda,
            max_age_turns,
        }
    }

    /// `exp(-lambda * age)`.
    pub fn decay(&self, age: u64) -> f64 {
        (-self.lambda * age as f64).exp()
    }

    /// Decayed score for `entry` at `current_turn`, or `None` when the entry
    /// is older than the cutoff. An entry exactly at the cutoff is eligible.
    pub fn score(&self, hybrid: f64, entry: &MemoryEntry, current_turn: u64) -> Option<f64> {
        let age = current_turn.saturating_sub(entry.source_turn);
        if age > self.max_age_turns {
            return None;
        }
        Some(hybrid * entry.confidence * self.decay(age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use recollect_core::MemoryKind;

    fn entry(turn: u64, confidence: f64) -> MemoryEntry {
        MemoryEntry::new(MemoryKind::Fact, "k", "v", turn, confidence)
    }

    #[test]
    fn age_cutoff_is_inclusive() {
        let policy = DecayPolicy::new(0.008, 1400);
        assert!(policy.score(1.0, &entry(100, 0.9), 1500).is_some(), "age == max");
        assert!(policy.score(1.0, &entry(101, 0.9), 1500).is_some(), "age == max - 1");
        assert!(policy.score(1.0, &entry(99, 0.9), 1500).is_none(), "age == max + 1");
    }

    #[test]
    fn future_entries_have_zero_age() {
        let policy = DecayPolicy::new(0.5, 10);
        let score = policy.score(0.8, &entry(20, 0.5), 10).unwrap();
        assert!((score - 0.4).abs() < 1e-12);
    }

    #[test]
    fn zero_lambda_means_no_decay() {
        let policy = DecayPolicy::new(0.0, 10_000);
        assert_eq!(policy.decay(5_000), 1.0);
    }

    #[test]
    fn known_decay_value() {
        let policy = DecayPolicy::new(0.008, 1400);
        let score = policy.score(1.0, &entry(950, 1.0), 1000).unwrap();
        assert!((score - (-0.4_f64).exp()).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn higher_confidence_scores_strictly_higher(
            hybrid in 0.01_f64..1.0,
            low in 0.0_f64..0.5,
            bump in 0.01_f64..0.5,
            age in 0_u64..1400,
        ) {
            let high = low + bump;
            let policy = DecayPolicy::new(0.008, 1400);
            let a = policy.score(hybrid, &entry(0, low), age).unwrap();
            let b = policy.score(hybrid, &entry(0, high), age).unwrap();
            prop_assert!(b > a, "{b} should exceed {a}");
        }

        #[test]
        fn older_entries_never_score_higher(
            hybrid in 0.0_f64..1.0,
            confidence in 0.0_f64..1.0,
            age in 0_u64..1000,
            extra in 0_u64..400,
        ) {
            let policy = DecayPolicy::new(0.008, 1400);
            let now = 2000;
            let newer = policy.score(hybrid, &entry(now - age, confidence), now).unwrap();
            let older = policy.score(hybrid, &entry(now - age - extra, confidence), now).unwrap();
            prop_assert!(older <= newer);
        }
    }
}
