//! Relational metadata store: the single authority for documents, sections,
//! legislation, patterns, citation links, precedent status, and the event
//! trail.

mod memory;
mod pg;
mod schema;

pub use memory::*;
pub use pg::*;
pub use schema::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use pravo_core::{
    CitationLink, Document, Event, LegalPattern, LegislationAct, LegislationArticle,
    PrecedentStatus, Result, Section,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Composite filter over document metadata. All present fields are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilters {
    pub doc_type: Option<String>,
    pub court: Option<String>,
    pub chamber: Option<String>,
    pub dispute_category: Option<String>,
    pub outcome: Option<String>,
    pub case_number: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Full-text term ANDed into the metadata predicates.
    pub text: Option<String>,
    pub limit: usize,
}

impl DocumentFilters {
    pub fn new() -> Self {
        Self {
            limit: 20,
            ..Default::default()
        }
    }
}

/// Aggregate counts for the analytics tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_documents: i64,
    pub total_sections: i64,
    pub by_type: Vec<(String, i64)>,
    pub by_court: Vec<(String, i64)>,
    pub by_outcome: Vec<(String, i64)>,
}

/// The relational store seam.
///
/// Every document read takes a `viewer`: rows with `owner_id = NULL` are
/// public, any other row is visible only when `viewer` matches. Writes to
/// one document are serialized by row-level contention on the external id.
#[async_trait]
pub trait MetaStore: Send + Sync {
    // Documents.

    /// COALESCE-merge upsert keyed by the external id: populated fields of
    /// the incoming row win, but an absent `full_text` never erases one
    /// already stored. Returns the merged row.
    async fn upsert_document(&self, doc: &Document) -> Result<Document>;
    async fn document_by_external_id(
        &self,
        external_id: &str,
        viewer: Option<Uuid>,
    ) -> Result<Option<Document>>;
    async fn document_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<Document>>;
    async fn documents_by_case_number(
        &self,
        case_number: &str,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Document>>;
    /// Language-aware ranked full-text search over `full_text`.
    async fn full_text_search(
        &self,
        query: &str,
        viewer: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Document>>;
    async fn search_documents(
        &self,
        filters: &DocumentFilters,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Document>>;
    async fn list_documents(
        &self,
        viewer: Option<Uuid>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>>;

    // Sections.

    /// Atomically replaces a document's sections (delete-then-insert in one
    /// transaction). The set must already satisfy the ordering and
    /// non-overlap invariants.
    async fn replace_sections(&self, document_id: Uuid, sections: &[Section]) -> Result<()>;
    async fn sections_for(&self, document_id: Uuid) -> Result<Vec<Section>>;
    async fn section_count(&self, document_id: Uuid) -> Result<usize>;

    // Embedding bookkeeping (mirror of the vector store).

    async fn record_chunks(&self, section_id: Uuid, chunks: &[(Uuid, String)]) -> Result<()>;
    async fn chunk_count(&self, document_id: Uuid) -> Result<usize>;
    async fn record_legislation_chunks(
        &self,
        article_id: Uuid,
        chunks: &[(Uuid, String)],
    ) -> Result<()>;

    // Legislation.

    async fn upsert_act(&self, act: &LegislationAct) -> Result<()>;
    async fn act_by_id(&self, act_id: &str) -> Result<Option<LegislationAct>>;
    /// Upserts article versions; the previous current version of each
    /// `(act, article_number)` is demoted so exactly one stays current.
    async fn upsert_articles(&self, articles: &[LegislationArticle]) -> Result<()>;
    async fn article(
        &self,
        act_id: &str,
        article_number: &str,
    ) -> Result<Option<LegislationArticle>>;
    async fn articles_for_act(&self, act_id: &str) -> Result<Vec<LegislationArticle>>;
    async fn search_articles(
        &self,
        query: &str,
        act_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LegislationArticle>>;

    // Patterns.

    async fn upsert_pattern(&self, pattern: &LegalPattern) -> Result<()>;
    async fn patterns_by_intent(&self, intent: &str) -> Result<Vec<LegalPattern>>;

    // Citations and precedent status.

    async fn upsert_citation(&self, link: &CitationLink) -> Result<()>;
    async fn citations_from(&self, document_id: Uuid) -> Result<Vec<CitationLink>>;
    async fn upsert_precedent_status(&self, status: &PrecedentStatus) -> Result<()>;
    async fn precedent_status(&self, document_id: Uuid) -> Result<Option<PrecedentStatus>>;

    // Audit trail.

    async fn record_event(&self, event: &Event) -> Result<()>;

    // Analytics.

    async fn corpus_stats(&self) -> Result<CorpusStats>;
}
