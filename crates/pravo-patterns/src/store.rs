//! The pattern store: extraction over stored cases and centroid matching.

use crate::{extract_pattern, CaseEvidence, MIN_CASES};
use pravo_core::{LegalPattern, Result, SectionType};
use pravo_llm::{Embedding, EmbeddingGateway};
use pravo_store::MetaStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Matches below this cosine similarity are not returned.
const MATCH_THRESHOLD: f32 = 0.7;

/// Patterns below this confidence are excluded from matching by default.
const MIN_MATCH_CONFIDENCE: f32 = 0.6;

/// A matched pattern with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct PatternMatch {
    pub pattern: LegalPattern,
    pub similarity: f32,
}

/// Extraction and matching over the persisted pattern set.
pub struct PatternStore {
    meta: Arc<dyn MetaStore>,
    gateway: Arc<EmbeddingGateway>,
}

impl PatternStore {
    pub fn new(meta: Arc<dyn MetaStore>, gateway: Arc<EmbeddingGateway>) -> Self {
        Self { meta, gateway }
    }

    /// Extracts and persists a pattern from stored cases. Cases without a
    /// reasoning section are skipped; fewer than three usable cases yields
    /// `None`.
    pub async fn extract(&self, case_ids: &[Uuid], intent: &str) -> Result<Option<LegalPattern>> {
        let mut evidence = Vec::with_capacity(case_ids.len());
        for &document_id in case_ids {
            let sections = self.meta.sections_for(document_id).await?;
            let reasoning = sections
                .iter()
                .find(|s| s.section_type == SectionType::CourtReasoning)
                .map(|s| s.text.clone());
            let Some(reasoning) = reasoning else {
                debug!(%document_id, "case has no reasoning section, skipped");
                continue;
            };
            let decision = sections
                .iter()
                .find(|s| s.section_type == SectionType::Decision)
                .map(|s| s.text.clone());
            let reasoning_embedding = self.gateway.embed(&reasoning).await?;
            evidence.push(CaseEvidence {
                document_id,
                reasoning,
                decision,
                reasoning_embedding,
            });
        }

        if evidence.len() < MIN_CASES {
            return Ok(None);
        }

        let Some(pattern) = extract_pattern(intent, &evidence) else {
            return Ok(None);
        };
        self.meta.upsert_pattern(&pattern).await?;
        info!(
            intent,
            frequency = pattern.frequency,
            outcome = pattern.decision_outcome.as_str(),
            "legal pattern extracted"
        );
        Ok(Some(pattern))
    }

    /// Patterns of an intent similar to the query vector, best first.
    pub async fn match_patterns(
        &self,
        query_vector: &[f32],
        intent: &str,
    ) -> Result<Vec<PatternMatch>> {
        let query = Embedding::new(query_vector.to_vec());
        let mut matches = Vec::new();
        for pattern in self.meta.patterns_by_intent(intent).await? {
            if pattern.confidence < MIN_MATCH_CONFIDENCE {
                continue;
            }
            let centroid = Embedding::new(pattern.centroid.clone());
            let similarity = query.cosine_similarity(&centroid)?;
            if similarity > MATCH_THRESHOLD {
                matches.push(PatternMatch {
                    pattern,
                    similarity,
                });
            }
        }
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pravo_core::{confidence_for_frequency, DecisionOutcome, Document, DocumentType, Section};
    use pravo_llm::testing::FakeEmbedder;
    use pravo_llm::CostMeter;
    use pravo_store::MemoryMetaStore;

    const DIM: usize = 8;

    fn gateway() -> Arc<EmbeddingGateway> {
        Arc::new(EmbeddingGateway::new(
            Arc::new(FakeEmbedder::new(DIM)),
            Arc::new(CostMeter::new()),
        ))
    }

    async fn seed_case(meta: &MemoryMetaStore, n: usize, reasoning: &str, decision: &str) -> Uuid {
        let doc = Document::new(format!("case-{n}"), DocumentType::CourtDecision);
        let stored = meta.upsert_document(&doc).await.unwrap();

        let pad = |s: &str| format!("{s} {}", "деталі обставин справи ".repeat(4));
        let reasoning_text = pad(&format!("суд вважає {reasoning}"));
        let decision_text = pad(&format!("ухвалив {decision}"));
        let full = format!("{reasoning_text}\n\n{decision_text}");
        let mut shell = stored.clone();
        shell.full_text = Some(full.clone());
        meta.upsert_document(&shell).await.unwrap();

        let boundary = reasoning_text.len();
        let sections = vec![
            Section::new(stored.id, SectionType::CourtReasoning, &full, 0, boundary, 0.8).unwrap(),
            Section::new(
                stored.id,
                SectionType::Decision,
                &full,
                boundary + 2,
                full.len(),
                0.8,
            )
            .unwrap(),
        ];
        meta.replace_sections(stored.id, &sections).await.unwrap();
        stored.id
    }

    #[tokio::test]
    async fn test_extract_below_minimum_is_none() {
        let meta = Arc::new(MemoryMetaStore::new());
        let a = seed_case(&meta, 1, "борг підтверджено ст. 625", "позов задовольнити").await;
        let b = seed_case(&meta, 2, "борг підтверджено ст. 625", "позов задовольнити").await;
        let store = PatternStore::new(meta, gateway());
        assert!(store
            .extract(&[a, b], "debt_recovery")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_extract_and_match_round() {
        let meta = Arc::new(MemoryMetaStore::new());
        let mut ids = Vec::new();
        for n in 0..10 {
            ids.push(
                seed_case(
                    &meta,
                    n,
                    "прострочення грошового зобов'язання за ст. 625",
                    "позов задовольнити",
                )
                .await,
            );
        }
        let store = PatternStore::new(meta, gateway());
        let pattern = store
            .extract(&ids, "debt_recovery")
            .await
            .unwrap()
            .expect("pattern extracted");
        assert_eq!(pattern.frequency, 10);
        assert_eq!(pattern.confidence, confidence_for_frequency(10));
        assert_eq!(pattern.decision_outcome, DecisionOutcome::ConsumerWon);
        assert!(pattern.law_articles.contains(&"ст. 625".to_string()));

        // The centroid of identical reasoning embeddings matches a query
        // embedded from the same text.
        let query = FakeEmbedder::new(DIM)
            .deterministic(&format!(
                "суд вважає прострочення грошового зобов'язання за ст. 625 {}",
                "деталі обставин справи ".repeat(4)
            ))
            .vector;
        let matches = store.match_patterns(&query, "debt_recovery").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].similarity > MATCH_THRESHOLD);
    }

    #[tokio::test]
    async fn test_match_other_intent_is_empty() {
        let meta = Arc::new(MemoryMetaStore::new());
        let mut ids = Vec::new();
        for n in 0..3 {
            ids.push(seed_case(&meta, n, "ст. 625", "позов задовольнити").await);
        }
        let store = PatternStore::new(meta, gateway());
        store.extract(&ids, "debt_recovery").await.unwrap();
        assert!(store
            .match_patterns(&vec![1.0; DIM], "consumer_protection")
            .await
            .unwrap()
            .is_empty());
    }
}
