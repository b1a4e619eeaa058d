//! The legislation service: fetch on demand, persist, index, and search.

use crate::{format_reference, parse_reference, title_for_act};
use async_trait::async_trait;
use pravo_core::{
    ArticleReference, Error, LegislationAct, LegislationArticle, Result, SectionType,
};
use pravo_llm::EmbeddingGateway;
use pravo_sources::{chunk_article_text, FetchedAct, LegislationFetcher};
use pravo_store::{ChunkPayload, MetaStore, VectorFilter, VectorPoint, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Source seam over the HTML fetcher.
#[async_trait]
pub trait ActSource: Send + Sync {
    async fn fetch_act(&self, act_id: &str) -> Result<FetchedAct>;
}

#[async_trait]
impl ActSource for LegislationFetcher {
    async fn fetch_act(&self, act_id: &str) -> Result<FetchedAct> {
        self.fetch(act_id).await
    }
}

/// Table of contents entry.
#[derive(Debug, Clone, Serialize)]
pub struct TocEntry {
    pub article_number: String,
    pub title: Option<String>,
}

/// Structure view of an act.
#[derive(Debug, Clone, Serialize)]
pub struct ActStructure {
    pub act: LegislationAct,
    pub toc: Vec<TocEntry>,
    pub article_count: usize,
}

/// Full-text hits grouped by act.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedArticleHits {
    pub act_id: String,
    pub act_title: Option<String>,
    pub articles: Vec<LegislationArticle>,
}

/// A vector-search hit over legislation chunks.
#[derive(Debug, Clone, Serialize)]
pub struct RelevantChunk {
    pub reference: ArticleReference,
    pub text: String,
    pub score: f32,
}

/// Fetch, persist, and query statutes.
pub struct LegislationService {
    meta: Arc<dyn MetaStore>,
    vectors: Arc<dyn VectorStore>,
    gateway: Arc<EmbeddingGateway>,
    source: Arc<dyn ActSource>,
}

impl LegislationService {
    pub fn new(
        meta: Arc<dyn MetaStore>,
        vectors: Arc<dyn VectorStore>,
        gateway: Arc<EmbeddingGateway>,
        source: Arc<dyn ActSource>,
    ) -> Self {
        Self {
            meta,
            vectors,
            gateway,
            source,
        }
    }

    /// Fetches, saves, and indexes an act unless it is already in the store.
    pub async fn ensure_exists(&self, act_id: &str) -> Result<()> {
        if self.meta.act_by_id(act_id).await?.is_some() {
            return Ok(());
        }

        let fetched = self.source.fetch_act(act_id).await?;
        self.meta.upsert_act(&fetched.act).await?;
        self.meta.upsert_articles(&fetched.articles).await?;
        info!(act_id, articles = fetched.articles.len(), "legislation act ingested");

        self.index_articles(&fetched.articles).await?;
        Ok(())
    }

    /// Embeds article chunks and upserts them with a legislation payload.
    async fn index_articles(&self, articles: &[LegislationArticle]) -> Result<usize> {
        let mut indexed = 0;
        for article in articles {
            let chunks = chunk_article_text(&article.text);
            if chunks.is_empty() {
                continue;
            }
            let embeddings = self.gateway.embed_batch(&chunks).await?;

            let reference = ArticleReference {
                act_id: article.act_id.clone(),
                article_number: article.article_number.clone(),
            };
            let mut points = Vec::with_capacity(chunks.len());
            let mut bookkeeping = Vec::with_capacity(chunks.len());
            for (chunk, embedding) in chunks.iter().zip(embeddings) {
                let vector_id = Uuid::new_v4();
                points.push(VectorPoint {
                    id: vector_id,
                    vector: embedding.vector,
                    payload: ChunkPayload {
                        doc_id: article.id,
                        document_type: "legislation".to_string(),
                        section_type: SectionType::LawReferences,
                        text: chunk.clone(),
                        date: article.version_date,
                        court: None,
                        chamber: None,
                        case_number: None,
                        dispute_category: None,
                        outcome: None,
                        deviation_flag: false,
                        precedent_status: None,
                        law_articles: vec![format_reference(&reference)],
                        matter_id: None,
                    },
                });
                bookkeeping.push((vector_id, chunk.clone()));
            }
            self.vectors.upsert(points).await?;
            self.meta
                .record_legislation_chunks(article.id, &bookkeeping)
                .await?;
            indexed += bookkeeping.len();
        }
        Ok(indexed)
    }

    /// One current article.
    pub async fn get_article(
        &self,
        act_id: &str,
        article_number: &str,
    ) -> Result<LegislationArticle> {
        self.ensure_exists(act_id).await?;
        self.meta
            .article(act_id, article_number)
            .await?
            .ok_or_else(|| Error::not_found(format!("ст. {article_number} в акті {act_id}")))
    }

    /// Several articles of one act; missing numbers are skipped.
    pub async fn get_articles(
        &self,
        act_id: &str,
        numbers: &[String],
    ) -> Result<Vec<LegislationArticle>> {
        self.ensure_exists(act_id).await?;
        let mut articles = Vec::with_capacity(numbers.len());
        for number in numbers {
            if let Some(article) = self.meta.article(act_id, number).await? {
                articles.push(article);
            }
        }
        Ok(articles)
    }

    /// Table of contents plus counts.
    pub async fn get_structure(&self, act_id: &str) -> Result<ActStructure> {
        self.ensure_exists(act_id).await?;
        let act = self
            .meta
            .act_by_id(act_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("акт {act_id}")))?;
        let articles = self.meta.articles_for_act(act_id).await?;
        Ok(ActStructure {
            toc: articles
                .iter()
                .map(|a| TocEntry {
                    article_number: a.article_number.clone(),
                    title: a.title.clone(),
                })
                .collect(),
            article_count: articles.len(),
            act,
        })
    }

    /// Full-text search over current articles, grouped by act.
    pub async fn search(
        &self,
        query: &str,
        act_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<GroupedArticleHits>> {
        if query.trim().is_empty() {
            return Err(Error::invalid_argument("empty legislation query"));
        }
        if let Some(act_id) = act_id {
            self.ensure_exists(act_id).await?;
        }
        let hits = self.meta.search_articles(query, act_id, limit).await?;

        let mut groups: Vec<GroupedArticleHits> = Vec::new();
        for article in hits {
            match groups.iter_mut().find(|g| g.act_id == article.act_id) {
                Some(group) => group.articles.push(article),
                None => groups.push(GroupedArticleHits {
                    act_title: title_for_act(&article.act_id).map(str::to_string),
                    act_id: article.act_id.clone(),
                    articles: vec![article],
                }),
            }
        }
        Ok(groups)
    }

    /// Vector search over legislation chunks; falls back to full-text when
    /// the vector store errors.
    pub async fn find_relevant(
        &self,
        query: &str,
        act_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RelevantChunk>> {
        if query.trim().is_empty() {
            return Err(Error::invalid_argument("empty legislation query"));
        }

        let vector_result = async {
            let embedding = self.gateway.embed(query).await?;
            let filter = VectorFilter::new().eq("document_type", "legislation");
            self.vectors
                .search(&embedding.vector, &filter, limit.max(1) * 2)
                .await
        }
        .await;

        match vector_result {
            Ok(hits) => {
                let mut relevant: Vec<RelevantChunk> = hits
                    .into_iter()
                    .filter_map(|hit| {
                        let reference = hit
                            .payload
                            .law_articles
                            .first()
                            .and_then(|r| parse_reference(r))?;
                        Some(RelevantChunk {
                            reference,
                            text: hit.payload.text,
                            score: hit.score,
                        })
                    })
                    .filter(|chunk| act_id.is_none_or(|wanted| chunk.reference.act_id == wanted))
                    .collect();
                relevant.truncate(limit);
                Ok(relevant)
            }
            Err(e) => {
                warn!(error = %e, "vector search failed, falling back to full-text");
                let hits = self.meta.search_articles(query, act_id, limit).await?;
                Ok(hits
                    .into_iter()
                    .map(|article| RelevantChunk {
                        reference: ArticleReference {
                            act_id: article.act_id.clone(),
                            article_number: article.article_number.clone(),
                        },
                        text: article.text,
                        score: 0.0,
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pravo_core::ActType;
    use pravo_llm::testing::FakeEmbedder;
    use pravo_llm::CostMeter;
    use pravo_store::{MemoryMetaStore, MemoryVectorStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIM: usize = 8;

    struct FakeActSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ActSource for FakeActSource {
        async fn fetch_act(&self, act_id: &str) -> Result<FetchedAct> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let act = LegislationAct::new(act_id, ActType::Code, "Цивільний кодекс України");
            let articles = vec![
                LegislationArticle::new(act_id, "625", "Боржник, який прострочив виконання грошового зобов'язання, на вимогу кредитора зобов'язаний сплатити суму боргу з урахуванням встановленого індексу інфляції.")
                    .with_title("Відповідальність за порушення грошового зобов'язання"),
                LegislationArticle::new(act_id, "626", "Договором є домовленість двох або більше сторін, спрямована на встановлення, зміну або припинення цивільних прав та обов'язків."),
            ];
            Ok(FetchedAct { act, articles })
        }
    }

    fn service() -> (LegislationService, Arc<FakeActSource>) {
        let source = Arc::new(FakeActSource {
            fetches: AtomicUsize::new(0),
        });
        let service = LegislationService::new(
            Arc::new(MemoryMetaStore::new()),
            Arc::new(MemoryVectorStore::new(DIM)),
            Arc::new(EmbeddingGateway::new(
                Arc::new(FakeEmbedder::new(DIM)),
                Arc::new(CostMeter::new()),
            )),
            source.clone(),
        );
        (service, source)
    }

    #[tokio::test]
    async fn test_ensure_exists_fetches_once() {
        let (service, source) = service();
        service.ensure_exists("435-15").await.unwrap();
        service.ensure_exists("435-15").await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_article_on_demand() {
        let (service, _) = service();
        let article = service.get_article("435-15", "625").await.unwrap();
        assert!(article.text.contains("індексу інфляції"));
        assert!(service.get_article("435-15", "9999").await.is_err());
    }

    #[tokio::test]
    async fn test_structure_lists_toc() {
        let (service, _) = service();
        let structure = service.get_structure("435-15").await.unwrap();
        assert_eq!(structure.article_count, 2);
        assert_eq!(structure.toc[0].article_number, "625");
        assert_eq!(
            structure.toc[0].title.as_deref(),
            Some("Відповідальність за порушення грошового зобов'язання")
        );
    }

    #[tokio::test]
    async fn test_find_relevant_filters_by_act() {
        let (service, _) = service();
        service.ensure_exists("435-15").await.unwrap();

        let hits = service
            .find_relevant("інфляція прострочення боргу", None, 5)
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.reference.act_id == "435-15"));

        let none = service
            .find_relevant("інфляція", Some("1618-15"), 5)
            .await
            .unwrap();
        // The only indexed act is 435-15; hits for another act are
        // post-filtered away (the fallback path would fetch 1618-15 first).
        assert!(none.iter().all(|h| h.reference.act_id == "1618-15"));
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let (service, _) = service();
        let err = service.find_relevant("  ", None, 5).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
