//! Qdrant-backed implementation of the [`VectorStore`] contract.

use super::{ChunkPayload, Predicate, ScoredChunk, VectorFilter, VectorPoint, VectorStore};
use async_trait::async_trait;
use chrono::Datelike;
use pravo_core::{Error, Result};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    Range, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::info;
use uuid::Uuid;

/// ANN index over a single Qdrant collection with cosine distance.
///
/// The collection is created lazily on first touch with the configured
/// dimension; the dimension never changes afterwards.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Connects to a Qdrant endpoint.
    pub fn connect(url: &str, collection: impl Into<String>, dimension: usize) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| Error::Unavailable(format!("qdrant connect failed: {e}")))?;
        Ok(Self {
            client,
            collection: collection.into(),
            dimension,
        })
    }

    fn payload_for(&self, point: &VectorPoint) -> Result<Payload> {
        let p = &point.payload;
        let mut fields = serde_json::json!({
            "doc_id": p.doc_id.to_string(),
            "document_type": p.document_type,
            "section_type": p.section_type.as_str(),
            "deviation_flag": p.deviation_flag,
            "law_articles": p.law_articles,
            // Full snapshot for reconstruction on read.
            "payload_json": serde_json::to_string(p).map_err(|e| Error::Internal(e.into()))?,
        });
        let object = fields.as_object_mut().expect("literal object");
        if let Some(d) = p.date {
            object.insert("date_days".into(), serde_json::json!(d.num_days_from_ce()));
        }
        for (key, value) in [
            ("court", &p.court),
            ("chamber", &p.chamber),
            ("case_number", &p.case_number),
            ("dispute_category", &p.dispute_category),
            ("outcome", &p.outcome),
            ("precedent_status", &p.precedent_status),
            ("matter_id", &p.matter_id),
        ] {
            if let Some(v) = value {
                object.insert(key.into(), serde_json::json!(v));
            }
        }
        Payload::try_from(fields).map_err(|e| Error::Internal(anyhow::anyhow!("payload build: {e}")))
    }

    fn condition_for(predicate: &Predicate) -> Condition {
        match predicate {
            Predicate::Eq { field, value } => {
                if field == "deviation_flag" {
                    Condition::matches(field.clone(), value == "true")
                } else {
                    Condition::matches(field.clone(), value.clone())
                }
            }
            Predicate::DateRange { from, to } => Condition::range(
                "date_days",
                Range {
                    gte: from.map(|d| d.num_days_from_ce() as f64),
                    lte: to.map(|d| d.num_days_from_ce() as f64),
                    ..Default::default()
                },
            ),
        }
    }

    fn filter_for(filter: &VectorFilter) -> Filter {
        Filter {
            must: filter.must.iter().map(Self::condition_for).collect(),
            should: filter.should.iter().map(Self::condition_for).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| Error::Unavailable(format!("qdrant collection check: {e}")))?;
        if exists {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| Error::Unavailable(format!("qdrant create collection: {e}")))?;
        info!(collection = %self.collection, dimension = self.dimension, "created vector collection");
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        self.ensure_collection().await?;

        let mut structs = Vec::with_capacity(points.len());
        for point in &points {
            if point.vector.len() != self.dimension {
                return Err(Error::InvariantViolated(format!(
                    "vector dimension {} != collection dimension {}",
                    point.vector.len(),
                    self.dimension
                )));
            }
            structs.push(PointStruct::new(
                point.id.to_string(),
                point.vector.clone(),
                self.payload_for(point)?,
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, structs).wait(true))
            .await
            .map_err(|e| Error::Unavailable(format!("qdrant upsert: {e}")))?;
        Ok(())
    }

    async fn delete_by_document(&self, doc_id: Uuid) -> Result<()> {
        self.ensure_collection().await?;
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Filter::must([Condition::matches(
                        "doc_id",
                        doc_id.to_string(),
                    )]))
                    .wait(true),
            )
            .await
            .map_err(|e| Error::Unavailable(format!("qdrant delete: {e}")))?;
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
        self.ensure_collection().await?;

        let mut request =
            SearchPointsBuilder::new(&self.collection, query.to_vec(), limit as u64)
                .with_payload(true);
        if !filter.is_empty() {
            request = request.filter(Self::filter_for(filter));
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| Error::Unavailable(format!("qdrant search: {e}")))?;

        let mut hits = Vec::with_capacity(response.result.len());
        for point in response.result {
            let id = match point.id.and_then(|p| p.point_id_options) {
                Some(PointIdOptions::Uuid(s)) => Uuid::parse_str(&s)
                    .map_err(|e| Error::Internal(anyhow::anyhow!("bad point id: {e}")))?,
                _ => continue,
            };
            let Some(Kind::StringValue(raw)) = point
                .payload
                .get("payload_json")
                .and_then(|v| v.kind.clone())
            else {
                continue;
            };
            let payload: ChunkPayload = serde_json::from_str(&raw)
                .map_err(|e| Error::Internal(anyhow::anyhow!("payload decode: {e}")))?;
            hits.push(ScoredChunk {
                id,
                score: point.score,
                payload,
            });
        }
        Ok(hits)
    }
}
