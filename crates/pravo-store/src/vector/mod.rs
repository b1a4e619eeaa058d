//! Filtered ANN over embedded sections.

mod filter;
mod memory;
mod qdrant;

pub use filter::*;
pub use memory::*;
pub use qdrant::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use pravo_core::{Result, SectionType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized snapshot of filterable fields carried on each vector.
///
/// Authoritative metadata lives in the metadata store; this payload is
/// refreshed whenever the parent document is re-ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub doc_id: Uuid,
    pub document_type: String,
    pub section_type: SectionType,
    pub text: String,
    pub date: Option<NaiveDate>,
    pub court: Option<String>,
    pub chamber: Option<String>,
    pub case_number: Option<String>,
    pub dispute_category: Option<String>,
    pub outcome: Option<String>,
    pub deviation_flag: bool,
    pub precedent_status: Option<String>,
    pub law_articles: Vec<String>,
    pub matter_id: Option<String>,
}

impl ChunkPayload {
    /// Looks up a filterable scalar field by its payload name.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "doc_id" => Some(self.doc_id.to_string()),
            "document_type" => Some(self.document_type.clone()),
            "section_type" => Some(self.section_type.as_str().to_string()),
            "court" => self.court.clone(),
            "chamber" => self.chamber.clone(),
            "case_number" => self.case_number.clone(),
            "dispute_category" => self.dispute_category.clone(),
            "outcome" => self.outcome.clone(),
            "deviation_flag" => Some(self.deviation_flag.to_string()),
            "precedent_status" => self.precedent_status.clone(),
            "matter_id" => self.matter_id.clone(),
            _ => None,
        }
    }
}

/// One vector with its payload, ready for upsert.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: Uuid,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// The ANN index seam. Cosine similarity; the collection is created lazily
/// on first touch with the fixed dimension; mismatched insertions fail.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection if it does not exist yet.
    async fn ensure_collection(&self) -> Result<()>;

    /// Upserts points. Dimension mismatches are `INVARIANT_VIOLATED`.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()>;

    /// Deletes every vector belonging to a document.
    async fn delete_by_document(&self, doc_id: Uuid) -> Result<()>;

    /// Filtered cosine search, best score first.
    async fn search(
        &self,
        query: &[f32],
        filter: &VectorFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;
}
