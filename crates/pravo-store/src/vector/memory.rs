//! Exact in-memory implementation of the [`VectorStore`] contract.
//!
//! Backs unit and integration tests: brute-force cosine over a map, the
//! same filter semantics as the Qdrant implementation, the same dimension
//! invariant.

use super::{ChunkPayload, Predicate, ScoredChunk, VectorFilter, VectorPoint, VectorStore};
use async_trait::async_trait;
use pravo_core::{Error, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Brute-force vector index for tests.
pub struct MemoryVectorStore {
    dimension: usize,
    points: RwLock<HashMap<Uuid, VectorPoint>>,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            points: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored vectors.
    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    /// Whether the index holds no vectors.
    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

pub(crate) fn payload_matches(payload: &ChunkPayload, filter: &VectorFilter) -> bool {
    let holds = |p: &Predicate| match p {
        Predicate::Eq { field, value } => payload.field(field).as_deref() == Some(value.as_str()),
        Predicate::DateRange { from, to } => match payload.date {
            Some(d) => from.is_none_or(|f| d >= f) && to.is_none_or(|t| d <= t),
            None => false,
        },
    };
    filter.must.iter().all(holds) && (filter.should.is_empty() || filter.should.iter().any(holds))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        let mut store = self.points.write().await;
        for point in points {
            if point.vector.len() != self.dimension {
                return Err(Error::InvariantViolated(format!(
                    "vector dimension {} != collection dimension {}",
                    point.vector.len(),
                    self.dimension
                )));
            }
            store.insert(point.id, point);
        }
        Ok(())
    }

    async fn delete_by_document(&self, doc_id: Uuid) -> Result<()> {
        self.points
            .write()
            .await
            .retain(|_, p| p.payload.doc_id != doc_id);
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        filter: &VectorFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(Error::InvariantViolated(format!(
                "query dimension {} != collection dimension {}",
                query.len(),
                self.dimension
            )));
        }
        let store = self.points.read().await;
        let mut hits: Vec<ScoredChunk> = store
            .values()
            .filter(|p| payload_matches(&p.payload, filter))
            .map(|p| ScoredChunk {
                id: p.id,
                score: cosine(query, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pravo_core::SectionType;

    fn payload(doc: Uuid, section: SectionType, court: &str) -> ChunkPayload {
        ChunkPayload {
            doc_id: doc,
            document_type: "court_decision".into(),
            section_type: section,
            text: "…".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            court: Some(court.into()),
            chamber: Some("КЦС".into()),
            case_number: Some("756/1234/24".into()),
            dispute_category: None,
            outcome: None,
            deviation_flag: false,
            precedent_status: Some("active".into()),
            law_articles: vec!["ст. 625".into()],
            matter_id: None,
        }
    }

    fn point(doc: Uuid, vector: Vec<f32>, section: SectionType) -> VectorPoint {
        VectorPoint {
            id: Uuid::new_v4(),
            vector,
            payload: payload(doc, section, "Верховний Суд"),
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = MemoryVectorStore::new(2);
        let doc = Uuid::new_v4();
        store
            .upsert(vec![
                point(doc, vec![1.0, 0.0], SectionType::Decision),
                point(doc, vec![0.0, 1.0], SectionType::Decision),
                point(doc, vec![0.7, 0.7], SectionType::Decision),
            ])
            .await
            .unwrap();

        let hits = store
            .search(&[1.0, 0.0], &VectorFilter::new(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_filters_apply() {
        let store = MemoryVectorStore::new(2);
        let doc = Uuid::new_v4();
        store
            .upsert(vec![
                point(doc, vec![1.0, 0.0], SectionType::Decision),
                point(doc, vec![1.0, 0.0], SectionType::Facts),
            ])
            .await
            .unwrap();

        let filter = VectorFilter::new().eq("section_type", "DECISION");
        let hits = store.search(&[1.0, 0.0], &filter, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.section_type, SectionType::Decision);
    }

    #[tokio::test]
    async fn test_should_group_is_or_semantics() {
        let store = MemoryVectorStore::new(2);
        let doc = Uuid::new_v4();
        store
            .upsert(vec![point(doc, vec![1.0, 0.0], SectionType::Decision)])
            .await
            .unwrap();

        let matching = VectorFilter::new().any_of("chamber", ["КЦС", "КГС"]);
        assert_eq!(store.search(&[1.0, 0.0], &matching, 10).await.unwrap().len(), 1);

        let missing = VectorFilter::new().any_of("chamber", ["КГС", "КАС"]);
        assert!(store.search(&[1.0, 0.0], &missing, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_date_range_filter() {
        let store = MemoryVectorStore::new(2);
        let doc = Uuid::new_v4();
        store
            .upsert(vec![point(doc, vec![1.0, 0.0], SectionType::Decision)])
            .await
            .unwrap();

        let inside = VectorFilter::new().date_between(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 12, 31),
        );
        assert_eq!(store.search(&[1.0, 0.0], &inside, 10).await.unwrap().len(), 1);

        let outside = VectorFilter::new().date_between(NaiveDate::from_ymd_opt(2025, 1, 1), None);
        assert!(store.search(&[1.0, 0.0], &outside, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let store = MemoryVectorStore::new(2);
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();
        store
            .upsert(vec![
                point(keep, vec![1.0, 0.0], SectionType::Decision),
                point(drop, vec![0.0, 1.0], SectionType::Decision),
            ])
            .await
            .unwrap();
        store.delete_by_document(drop).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = MemoryVectorStore::new(4);
        let err = store
            .upsert(vec![point(Uuid::new_v4(), vec![1.0, 0.0], SectionType::Decision)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVARIANT_VIOLATED");
    }
}
