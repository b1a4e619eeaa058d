//! Aggregated legal reasoning patterns.
//!
//! A pattern is a reasoning fingerprint extracted from at least three cases
//! sharing an intent: the articles they lean on, the dominant outcome, a
//! centroid embedding, and curated risk/argument keywords.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Dominant outcome across a pattern's case cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    ConsumerWon,
    SellerWon,
    Partial,
    Rejected,
}

impl DecisionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionOutcome::ConsumerWon => "consumer_won",
            DecisionOutcome::SellerWon => "seller_won",
            DecisionOutcome::Partial => "partial",
            DecisionOutcome::Rejected => "rejected",
        }
    }
}

/// Tiered pattern confidence. A monotone non-decreasing function of the
/// case count only.
pub fn confidence_for_frequency(frequency: usize) -> f32 {
    match frequency {
        n if n < 5 => 0.3,
        n if n < 10 => 0.5,
        n if n < 20 => 0.7,
        _ => 0.9,
    }
}

/// An aggregated reasoning pattern over a case cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalPattern {
    pub id: Uuid,
    /// The intent this pattern belongs to (e.g. `consumer_protection`).
    pub intent: String,
    /// Articles cited by at least 30% of the cohort, as written (`ст. 15`).
    pub law_articles: Vec<String>,
    /// Element-wise mean of the cohort's reasoning embeddings.
    pub centroid: Vec<f32>,
    pub decision_outcome: DecisionOutcome,
    /// Number of cases behind the pattern.
    pub frequency: usize,
    /// Tiered by `frequency`; one of {0.3, 0.5, 0.7, 0.9}.
    pub confidence: f32,
    pub example_cases: Vec<Uuid>,
    pub risk_factors: Vec<String>,
    pub success_arguments: Vec<String>,
    pub anti_patterns: Value,
    pub updated_at: DateTime<Utc>,
}

impl LegalPattern {
    /// Whether the stored confidence is consistent with the tiered rule.
    pub fn confidence_consistent(&self) -> bool {
        (self.confidence - confidence_for_frequency(self.frequency)).abs() < f32::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(confidence_for_frequency(3), 0.3);
        assert_eq!(confidence_for_frequency(4), 0.3);
        assert_eq!(confidence_for_frequency(5), 0.5);
        assert_eq!(confidence_for_frequency(9), 0.5);
        assert_eq!(confidence_for_frequency(10), 0.7);
        assert_eq!(confidence_for_frequency(19), 0.7);
        assert_eq!(confidence_for_frequency(20), 0.9);
        assert_eq!(confidence_for_frequency(200), 0.9);
    }

    #[test]
    fn test_confidence_monotone() {
        let mut prev = 0.0;
        for n in 0..50 {
            let c = confidence_for_frequency(n);
            assert!(c >= prev);
            prev = c;
        }
    }
}
