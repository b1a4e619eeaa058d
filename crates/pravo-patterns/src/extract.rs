//! Pattern extraction over a case cohort.

use crate::{classify_outcome, lexicon_hits, OutcomeVote, RISK_LEXICON, SUCCESS_LEXICON};
use pravo_core::{cited_articles, confidence_for_frequency, DecisionOutcome, LegalPattern};
use pravo_llm::Embedding;
use std::collections::HashMap;
use uuid::Uuid;

/// Minimum cohort size for a pattern.
pub const MIN_CASES: usize = 3;

/// An article must appear in at least this share of the cohort.
const ARTICLE_SHARE: f32 = 0.3;

/// One case's contribution to a pattern.
#[derive(Debug, Clone)]
pub struct CaseEvidence {
    pub document_id: Uuid,
    /// The court's reasoning text.
    pub reasoning: String,
    /// The operative text when present; falls back to reasoning for the
    /// outcome vote.
    pub decision: Option<String>,
    pub reasoning_embedding: Embedding,
}

/// Articles appearing in at least [`ARTICLE_SHARE`] of the cohort.
fn common_articles(cases: &[CaseEvidence]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for case in cases {
        for article in cited_articles(&case.reasoning) {
            if !counts.contains_key(&article) {
                order.push(article.clone());
            }
            *counts.entry(article).or_default() += 1;
        }
    }
    let threshold = (cases.len() as f32 * ARTICLE_SHARE).ceil() as usize;
    order
        .into_iter()
        .filter(|article| counts[article] >= threshold.max(1))
        .collect()
}

/// Majority vote across the cohort; ties and unknown-only cohorts default
/// to `rejected`.
fn vote_outcome(cases: &[CaseEvidence]) -> DecisionOutcome {
    let mut won = 0usize;
    let mut rejected = 0usize;
    let mut partial = 0usize;
    for case in cases {
        let text = case.decision.as_deref().unwrap_or(&case.reasoning);
        match classify_outcome(text) {
            OutcomeVote::Won => won += 1,
            OutcomeVote::Rejected => rejected += 1,
            OutcomeVote::Partial => partial += 1,
            OutcomeVote::Unknown => {}
        }
    }
    let top = won.max(rejected).max(partial);
    if top == 0 {
        return DecisionOutcome::Rejected;
    }
    // Ties default to rejected; a tied rejected count wins outright.
    if rejected == top {
        DecisionOutcome::Rejected
    } else if won == top && partial == top {
        DecisionOutcome::Rejected
    } else if won == top {
        DecisionOutcome::ConsumerWon
    } else {
        DecisionOutcome::Partial
    }
}

/// Builds a pattern from a cohort. `None` when the cohort is too small.
pub fn extract_pattern(intent: &str, cases: &[CaseEvidence]) -> Option<LegalPattern> {
    if cases.len() < MIN_CASES {
        return None;
    }

    let reasoning_texts: Vec<String> = cases.iter().map(|c| c.reasoning.clone()).collect();
    let embeddings: Vec<Embedding> = cases.iter().map(|c| c.reasoning_embedding.clone()).collect();
    let centroid = Embedding::centroid(&embeddings).ok()?;

    Some(LegalPattern {
        id: Uuid::new_v4(),
        intent: intent.to_string(),
        law_articles: common_articles(cases),
        centroid: centroid.vector,
        decision_outcome: vote_outcome(cases),
        frequency: cases.len(),
        confidence: confidence_for_frequency(cases.len()),
        example_cases: cases.iter().map(|c| c.document_id).collect(),
        risk_factors: lexicon_hits(RISK_LEXICON, &reasoning_texts)
            .into_iter()
            .map(str::to_string)
            .collect(),
        success_arguments: lexicon_hits(SUCCESS_LEXICON, &reasoning_texts)
            .into_iter()
            .map(str::to_string)
            .collect(),
        anti_patterns: serde_json::Value::Null,
        updated_at: chrono::Utc::now(),
    })
}
