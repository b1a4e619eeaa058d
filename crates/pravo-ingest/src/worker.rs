//! The ingest worker: one document from identity to indexed.
//!
//! Sequence per document: fetch raw text → upsert the document row →
//! delete+insert sections → embed the reasoning and operative sections →
//! upsert vectors. Readers may observe any consistent prefix of that
//! sequence. Each step is upsert-idempotent, so a crashed ingest restarts
//! cleanly. Rate-limited fetches run before the semaphore slot is taken so
//! a sleeping fetch never starves the pool.

use crate::Sectionizer;
use async_trait::async_trait;
use pravo_core::{
    cited_articles, CitationLink, CitationType, DocumentType, Error, Event, PrecedentStatus,
    Result, Section, SectionType,
};
use pravo_llm::EmbeddingGateway;
use pravo_sources::{CourtClient, DecisionText};
use pravo_store::{ChunkPayload, MetaStore, VectorPoint, VectorStore};
use regex::Regex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn case_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"справ[іиа]\s*№?\s*(\d+/\d+/\d+(?:-[а-яa-z]+)?)").expect("static regex")
    })
}

/// Section types worth embedding; the rest are retrievable by metadata only.
const EMBEDDED_SECTIONS: [SectionType; 2] = [SectionType::CourtReasoning, SectionType::Decision];

/// Outcome of one document ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum IngestOutcome {
    /// The document already had text and sections; nothing was done.
    Cached,
    Ingested {
        sections: usize,
        embeddings: usize,
    },
}

/// One failed item inside a batch.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub external_id: String,
    pub error: String,
}

/// Structured report emitted after a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub errors: Vec<IngestFailure>,
    pub sections_created: usize,
    pub embeddings_created: usize,
    pub duration_ms: u64,
}

/// Fetch seam so the worker runs against the real court client or a fake.
#[async_trait]
pub trait DecisionFetcher: Send + Sync {
    /// Full text of one decision by its registry id.
    async fn fetch_decision(&self, doc_id: &str) -> Result<DecisionText>;
}

#[async_trait]
impl DecisionFetcher for CourtClient {
    async fn fetch_decision(&self, doc_id: &str) -> Result<DecisionText> {
        self.get_full_text(doc_id).await
    }
}

/// Drives the per-document ingest pipeline under bounded concurrency.
pub struct IngestWorker {
    meta: Arc<dyn MetaStore>,
    vectors: Arc<dyn VectorStore>,
    gateway: Arc<EmbeddingGateway>,
    court: Arc<dyn DecisionFetcher>,
    sectionizer: Sectionizer,
    semaphore: Arc<Semaphore>,
    in_flight: AtomicUsize,
}

impl IngestWorker {
    pub fn new(
        meta: Arc<dyn MetaStore>,
        vectors: Arc<dyn VectorStore>,
        gateway: Arc<EmbeddingGateway>,
        court: Arc<dyn DecisionFetcher>,
        sectionizer: Sectionizer,
        concurrency: usize,
    ) -> Self {
        Self {
            meta,
            vectors,
            gateway,
            court,
            sectionizer,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Documents currently inside the semaphore, for backpressure decisions.
    pub fn queue_depth(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Ingests one court decision by its registry id.
    pub async fn ingest_document(&self, external_id: &str) -> Result<IngestOutcome> {
        // Idempotency check before any work.
        if let Some(existing) = self.meta.document_by_external_id(external_id, None).await? {
            let section_count = self.meta.section_count(existing.id).await?;
            if existing.is_ingest_cached(section_count) {
                info!(external_id, "ingest cached, skipping");
                return Ok(IngestOutcome::Cached);
            }
        }

        // The rate-limited fetch happens before we take a semaphore slot.
        let fetched = self.court.fetch_decision(external_id).await?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Unavailable("ingest pool closed".into()))?;
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let result = self.process_fetched(external_id, fetched).await;
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        result
    }

    async fn process_fetched(
        &self,
        external_id: &str,
        fetched: DecisionText,
    ) -> Result<IngestOutcome> {
        let mut shell = pravo_core::Document::new(external_id, DocumentType::CourtDecision)
            .with_full_text(fetched.text.clone());
        shell.full_text_html = fetched.html.clone();
        shell.case_number = fetched.case_number.clone();
        let doc = self.meta.upsert_document(&shell).await?;

        let full_text = doc
            .full_text
            .as_deref()
            .ok_or_else(|| Error::Unavailable(format!("no text for {external_id}")))?;

        let sections = self.sectionizer.sectionize(doc.id, full_text).await?;
        self.meta.replace_sections(doc.id, &sections).await?;

        self.derive_citations(&doc, &sections).await?;
        let embeddings_created = self.index_sections(&doc, &sections).await?;

        self.meta
            .record_event(&Event::new(
                "document_ingested",
                serde_json::json!({
                    "external_id": external_id,
                    "document_id": doc.id,
                    "sections": sections.len(),
                    "embeddings": embeddings_created,
                }),
            ))
            .await?;

        Ok(IngestOutcome::Ingested {
            sections: sections.len(),
            embeddings: embeddings_created,
        })
    }

    /// Records case-to-case citation edges found in the sections and seeds
    /// the document's precedent bookkeeping.
    async fn derive_citations(
        &self,
        doc: &pravo_core::Document,
        sections: &[Section],
    ) -> Result<()> {
        if self.meta.precedent_status(doc.id).await?.is_none() {
            self.meta
                .upsert_precedent_status(&PrecedentStatus::active(doc.id))
                .await?;
        }

        for section in sections {
            for captures in case_number_re().captures_iter(&section.text).take(100) {
                let case_number = &captures[1];
                if doc.case_number.as_deref() == Some(case_number) {
                    continue;
                }
                let cited = self
                    .meta
                    .documents_by_case_number(case_number, None)
                    .await?;
                for target in cited {
                    debug!(from = %doc.id, to = %target.id, case_number, "citation edge");
                    self.meta
                        .upsert_citation(&CitationLink {
                            from_document_id: doc.id,
                            to_document_id: target.id,
                            citation_type: CitationType::Mentions,
                            context: Some(
                                captures
                                    .get(0)
                                    .map(|m| m.as_str().to_string())
                                    .unwrap_or_default(),
                            ),
                            found_in: Some(section.section_type),
                            confidence: 0.8,
                        })
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Embeds the selected sections and refreshes the document's vectors.
    async fn index_sections(
        &self,
        doc: &pravo_core::Document,
        sections: &[pravo_core::Section],
    ) -> Result<usize> {
        let embeddable: Vec<&pravo_core::Section> = sections
            .iter()
            .filter(|s| EMBEDDED_SECTIONS.contains(&s.section_type))
            .collect();
        if embeddable.is_empty() {
            return Ok(0);
        }

        // Re-ingest replaces the document's vectors wholesale.
        self.vectors.delete_by_document(doc.id).await?;

        let precedent = self.meta.precedent_status(doc.id).await?;
        // Every chunk carries the document's cited norms.
        let law_articles: Vec<String> = cited_articles(
            &sections
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        let mut created = 0;
        for section in embeddable {
            let chunks = self.gateway.split_for_embedding(&section.text);
            if chunks.is_empty() {
                continue;
            }
            let vectors = self.gateway.embed_batch(&chunks).await?;

            let mut points = Vec::with_capacity(chunks.len());
            let mut bookkeeping = Vec::with_capacity(chunks.len());
            for (chunk, embedding) in chunks.iter().zip(vectors) {
                let vector_id = Uuid::new_v4();
                points.push(VectorPoint {
                    id: vector_id,
                    vector: embedding.vector,
                    payload: ChunkPayload {
                        doc_id: doc.id,
                        document_type: doc.doc_type.as_str().to_string(),
                        section_type: section.section_type,
                        text: chunk.clone(),
                        date: doc.date,
                        court: doc.court.clone(),
                        chamber: doc.chamber.clone(),
                        case_number: doc.case_number.clone(),
                        dispute_category: doc.dispute_category.clone(),
                        outcome: doc.outcome.clone(),
                        deviation_flag: false,
                        precedent_status: precedent.as_ref().map(|p| p.status.as_str().to_string()),
                        law_articles: law_articles.clone(),
                        matter_id: None,
                    },
                });
                bookkeeping.push((vector_id, chunk.clone()));
            }
            self.vectors.upsert(points).await?;
            self.meta.record_chunks(section.id, &bookkeeping).await?;
            created += bookkeeping.len();
        }
        Ok(created)
    }

    /// Ingests a batch; per-item failures are recorded and the batch moves
    /// on. Concurrency is bounded by the shared semaphore.
    pub async fn ingest_batch(&self, external_ids: &[String]) -> IngestReport {
        let started = Instant::now();
        let mut report = IngestReport::default();

        let results = futures::future::join_all(
            external_ids
                .iter()
                .map(|id| async move { (id.clone(), self.ingest_document(id).await) }),
        )
        .await;

        for (external_id, result) in results {
            match result {
                Ok(IngestOutcome::Cached) => report.processed += 1,
                Ok(IngestOutcome::Ingested {
                    sections,
                    embeddings,
                }) => {
                    report.processed += 1;
                    report.sections_created += sections;
                    report.embeddings_created += embeddings;
                }
                Err(e) => {
                    warn!(external_id, error = %e, "ingest failed");
                    report.errors.push(IngestFailure {
                        external_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            processed = report.processed,
            errors = report.errors.len(),
            sections = report.sections_created,
            embeddings = report.embeddings_created,
            duration_ms = report.duration_ms,
            "ingest batch finished"
        );
        report
    }
}
