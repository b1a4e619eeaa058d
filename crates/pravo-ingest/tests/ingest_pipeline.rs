//! End-to-end ingest over in-memory stores and deterministic fakes.

use async_trait::async_trait;
use pravo_core::{Result, SectionType};
use pravo_ingest::{
    DecisionFetcher, DecisionSearch, IngestOutcome, IngestWorker, ScrapeRequest, ScrapeWorker,
    Sectionizer, JobStatus,
};
use pravo_llm::testing::FakeEmbedder;
use pravo_llm::{CostMeter, EmbeddingGateway};
use pravo_sources::{DecisionText, RawDecision, SearchPage};
use pravo_store::{MemoryMetaStore, MemoryVectorStore, MetaStore, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const DIM: usize = 8;

struct FakeCourt {
    texts: HashMap<String, String>,
}

#[async_trait]
impl DecisionFetcher for FakeCourt {
    async fn fetch_decision(&self, doc_id: &str) -> Result<DecisionText> {
        match self.texts.get(doc_id) {
            Some(text) => Ok(DecisionText {
                text: text.clone(),
                html: None,
                case_number: Some(format!("756/{doc_id}/24")),
            }),
            None => Err(pravo_core::Error::not_found(format!("decision {doc_id}"))),
        }
    }
}

fn decision_text() -> String {
    let filler = "обставини підтверджено належними доказами у справі ".repeat(4);
    format!(
        "встановлено {filler}\n\nпозивач просить стягнути заборгованість {filler}\n\n\
         суд вважає позов обґрунтованим з огляду на таке {filler}\n\nухвалив позов задовольнити {filler}"
    )
}

struct Pipeline {
    meta: Arc<MemoryMetaStore>,
    vectors: Arc<MemoryVectorStore>,
    worker: Arc<IngestWorker>,
}

fn pipeline(texts: &[(&str, String)]) -> Pipeline {
    let meta = Arc::new(MemoryMetaStore::new());
    let vectors = Arc::new(MemoryVectorStore::new(DIM));
    let gateway = Arc::new(EmbeddingGateway::new(
        Arc::new(FakeEmbedder::new(DIM)),
        Arc::new(CostMeter::new()),
    ));
    let court = Arc::new(FakeCourt {
        texts: texts
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    });
    let worker = Arc::new(IngestWorker::new(
        meta.clone(),
        vectors.clone(),
        gateway,
        court,
        Sectionizer::new(),
        4,
    ));
    Pipeline {
        meta,
        vectors,
        worker,
    }
}

#[tokio::test]
async fn test_full_ingest_produces_sections_and_vectors() {
    let p = pipeline(&[("100200300", decision_text())]);

    let outcome = p.worker.ingest_document("100200300").await.unwrap();
    let IngestOutcome::Ingested {
        sections,
        embeddings,
    } = outcome
    else {
        panic!("expected fresh ingest");
    };
    assert!(sections >= 4, "got {sections} sections");
    assert!(embeddings >= 2, "got {embeddings} embeddings");

    let doc = p
        .meta
        .document_by_external_id("100200300", None)
        .await
        .unwrap()
        .expect("document persisted");
    assert_eq!(doc.case_number.as_deref(), Some("756/100200300/24"));

    let stored = p.meta.sections_for(doc.id).await.unwrap();
    let full_text = doc.full_text.as_deref().unwrap();
    for section in &stored {
        assert_eq!(section.text, &full_text[section.start_index..section.end_index]);
    }

    // Only reasoning and operative sections get embedded.
    let hits = p
        .vectors
        .search(&vec![1.0; DIM], &Default::default(), 100)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    for hit in &hits {
        assert!(matches!(
            hit.payload.section_type,
            SectionType::CourtReasoning | SectionType::Decision
        ));
        assert_eq!(hit.payload.doc_id, doc.id);
    }
}

#[tokio::test]
async fn test_second_ingest_is_cached() {
    let p = pipeline(&[("100200300", decision_text())]);

    let first = p.worker.ingest_document("100200300").await.unwrap();
    assert!(matches!(first, IngestOutcome::Ingested { .. }));

    let second = p.worker.ingest_document("100200300").await.unwrap();
    assert_eq!(second, IngestOutcome::Cached);

    // Section content is stable across the repeat.
    let doc = p
        .meta
        .document_by_external_id("100200300", None)
        .await
        .unwrap()
        .unwrap();
    let sections = p.meta.sections_for(doc.id).await.unwrap();
    assert!(!sections.is_empty());
}

#[tokio::test]
async fn test_short_document_persisted_without_sections() {
    let p = pipeline(&[("555", "коротке рішення".to_string())]);

    let outcome = p.worker.ingest_document("555").await.unwrap();
    assert_eq!(
        outcome,
        IngestOutcome::Ingested {
            sections: 0,
            embeddings: 0
        }
    );

    let doc = p
        .meta
        .document_by_external_id("555", None)
        .await
        .unwrap()
        .expect("short document still persisted");
    assert_eq!(p.meta.section_count(doc.id).await.unwrap(), 0);
    assert!(p.vectors.is_empty().await);
}

#[tokio::test]
async fn test_batch_continues_past_failures() {
    let p = pipeline(&[("1", decision_text()), ("3", decision_text())]);

    let report = p
        .worker
        .ingest_batch(&["1".to_string(), "2".to_string(), "3".to_string()])
        .await;
    assert_eq!(report.processed, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].external_id, "2");
    assert!(report.sections_created > 0);
}

#[tokio::test]
async fn test_ingest_derives_citation_links() {
    let citing_text = format!(
        "встановлено що у справі № 756/1/24 викладено подібні обставини {}",
        "аргументи сторін досліджено повно ".repeat(6)
    );
    let p = pipeline(&[("1", decision_text()), ("2", citing_text)]);

    p.worker.ingest_document("1").await.unwrap();
    p.worker.ingest_document("2").await.unwrap();

    let cited = p.meta.document_by_external_id("1", None).await.unwrap().unwrap();
    let citing = p.meta.document_by_external_id("2", None).await.unwrap().unwrap();

    let links = p.meta.citations_from(citing.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].to_document_id, cited.id);
    assert_eq!(links[0].found_in, Some(SectionType::Facts));

    // Precedent bookkeeping is seeded on first ingest.
    assert!(p.meta.precedent_status(citing.id).await.unwrap().is_some());
}

struct FakeSearch {
    pages: Vec<Vec<&'static str>>,
}

#[async_trait]
impl DecisionSearch for FakeSearch {
    async fn search_page(&self, _request: &ScrapeRequest, page: usize) -> Result<SearchPage> {
        let items = self
            .pages
            .get(page - 1)
            .map(|ids| {
                ids.iter()
                    .map(|id| RawDecision {
                        id: serde_json::json!(id),
                        title: None,
                        date: None,
                        court: None,
                        chamber: None,
                        case_number: None,
                        dispute_category: None,
                        outcome: None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(SearchPage {
            items,
            total: Some(self.pages.iter().map(Vec::len).sum::<usize>() as u64),
            page: Some(page as u64),
        })
    }
}

#[tokio::test]
async fn test_scrape_streams_pages_to_completion() {
    let p = pipeline(&[
        ("a1", decision_text()),
        ("a2", decision_text()),
        ("b1", decision_text()),
    ]);
    let scraper = Arc::new(ScrapeWorker::new(
        Arc::new(FakeSearch {
            pages: vec![vec!["a1", "a2"], vec!["b1"]],
        }),
        p.worker.clone(),
    ));

    let job_id = scraper.start(ScrapeRequest::new("борг")).await;

    let mut status = JobStatus::Queued;
    for _ in 0..200 {
        if let Some(progress) = scraper.progress(job_id).await {
            status = progress.status;
            if matches!(status, JobStatus::Completed | JobStatus::Failed) {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(status, JobStatus::Completed);
    let progress = scraper.progress(job_id).await.unwrap();
    assert_eq!(progress.processed, 3);
    assert_eq!(progress.total, Some(3));
    assert!((progress.progress_pct - 100.0).abs() < f32::EPSILON);
    assert!(p
        .meta
        .document_by_external_id("b1", None)
        .await
        .unwrap()
        .is_some());
}
