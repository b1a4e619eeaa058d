//! In-memory implementation of the [`MetaStore`] contract for tests.
//!
//! Merge semantics, visibility predicates, ordering, and the one-current-
//! article invariant match the Postgres implementation; full-text search is
//! approximated with case-insensitive token matching.

use super::{CorpusStats, DocumentFilters, MetaStore};
use async_trait::async_trait;
use pravo_core::{
    CitationLink, CitationType, Document, Event, LegalPattern, LegislationAct,
    LegislationArticle, PrecedentStatus, Result, Section, verify_section_set,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, Document>,
    sections: HashMap<Uuid, Vec<Section>>,
    chunks: HashMap<Uuid, Vec<(Uuid, String)>>,
    acts: HashMap<String, LegislationAct>,
    articles: Vec<LegislationArticle>,
    patterns: HashMap<Uuid, LegalPattern>,
    citations: HashMap<(Uuid, Uuid, CitationType), CitationLink>,
    precedent: HashMap<Uuid, PrecedentStatus>,
    events: Vec<Event>,
}

/// Hermetic metadata store.
#[derive(Default)]
pub struct MemoryMetaStore {
    inner: RwLock<Inner>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, for assertions.
    pub async fn events(&self) -> Vec<Event> {
        self.inner.read().await.events.clone()
    }
}

fn visible(doc: &Document, viewer: Option<Uuid>) -> bool {
    match doc.owner_id {
        None => true,
        Some(owner) => viewer == Some(owner),
    }
}

fn text_matches(haystack: &Option<String>, needle: &str) -> bool {
    let Some(text) = haystack else { return false };
    let text = text.to_lowercase();
    needle
        .split_whitespace()
        .all(|token| text.contains(&token.to_lowercase()))
}

fn merge(existing: &mut Document, incoming: &Document) {
    if !incoming.title.is_empty() {
        existing.title = incoming.title.clone();
    }
    let fields = [
        (&mut existing.court, &incoming.court),
        (&mut existing.chamber, &incoming.chamber),
        (&mut existing.case_number, &incoming.case_number),
        (&mut existing.dispute_category, &incoming.dispute_category),
        (&mut existing.outcome, &incoming.outcome),
        (&mut existing.full_text, &incoming.full_text),
        (&mut existing.full_text_html, &incoming.full_text_html),
    ];
    for (slot, value) in fields {
        if value.is_some() {
            *slot = value.clone();
        }
    }
    if incoming.date.is_some() {
        existing.date = incoming.date;
    }
    if incoming.owner_id.is_some() {
        existing.owner_id = incoming.owner_id;
    }
    if !incoming.metadata.is_null() {
        existing.metadata = incoming.metadata.clone();
    }
    existing.updated_at = chrono::Utc::now();
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    async fn upsert_document(&self, doc: &Document) -> Result<Document> {
        let mut inner = self.inner.write().await;
        let existing_id = inner
            .documents
            .values()
            .find(|d| d.external_id == doc.external_id)
            .map(|d| d.id);
        match existing_id {
            Some(id) => {
                let existing = inner.documents.get_mut(&id).expect("looked up above");
                merge(existing, doc);
                Ok(existing.clone())
            }
            None => {
                inner.documents.insert(doc.id, doc.clone());
                Ok(doc.clone())
            }
        }
    }

    async fn document_by_external_id(
        &self,
        external_id: &str,
        viewer: Option<Uuid>,
    ) -> Result<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .values()
            .find(|d| d.external_id == external_id && visible(d, viewer))
            .cloned())
    }

    async fn document_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .get(&id)
            .filter(|d| visible(d, viewer))
            .cloned())
    }

    async fn documents_by_case_number(
        &self,
        case_number: &str,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| d.case_number.as_deref() == Some(case_number) && visible(d, viewer))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn full_text_search(
        &self,
        query: &str,
        viewer: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| visible(d, viewer) && text_matches(&d.full_text, query))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs.truncate(limit);
        Ok(docs)
    }

    async fn search_documents(
        &self,
        filters: &DocumentFilters,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let eq = |field: &Option<String>, wanted: &Option<String>| match wanted {
            Some(w) => field.as_deref() == Some(w.as_str()),
            None => true,
        };
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| visible(d, viewer))
            .filter(|d| match &filters.doc_type {
                Some(t) => d.doc_type.as_str() == t,
                None => true,
            })
            .filter(|d| eq(&d.court, &filters.court))
            .filter(|d| eq(&d.chamber, &filters.chamber))
            .filter(|d| eq(&d.dispute_category, &filters.dispute_category))
            .filter(|d| eq(&d.outcome, &filters.outcome))
            .filter(|d| eq(&d.case_number, &filters.case_number))
            .filter(|d| filters.date_from.is_none_or(|from| d.date.is_some_and(|x| x >= from)))
            .filter(|d| filters.date_to.is_none_or(|to| d.date.is_some_and(|x| x <= to)))
            .filter(|d| match &filters.text {
                Some(t) => text_matches(&d.full_text, t),
                None => true,
            })
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs.truncate(filters.limit.max(1));
        Ok(docs)
    }

    async fn list_documents(
        &self,
        viewer: Option<Uuid>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| visible(d, viewer))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs.into_iter().skip(offset).take(limit).collect())
    }

    async fn replace_sections(&self, document_id: Uuid, sections: &[Section]) -> Result<()> {
        verify_section_set(sections)?;
        let mut inner = self.inner.write().await;
        inner.sections.insert(document_id, sections.to_vec());
        Ok(())
    }

    async fn sections_for(&self, document_id: Uuid) -> Result<Vec<Section>> {
        let inner = self.inner.read().await;
        Ok(inner.sections.get(&document_id).cloned().unwrap_or_default())
    }

    async fn section_count(&self, document_id: Uuid) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner.sections.get(&document_id).map_or(0, Vec::len))
    }

    async fn record_chunks(&self, section_id: Uuid, chunks: &[(Uuid, String)]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .chunks
            .entry(section_id)
            .or_default()
            .extend(chunks.iter().cloned());
        Ok(())
    }

    async fn chunk_count(&self, document_id: Uuid) -> Result<usize> {
        let inner = self.inner.read().await;
        let section_ids: Vec<Uuid> = inner
            .sections
            .get(&document_id)
            .map(|ss| ss.iter().map(|s| s.id).collect())
            .unwrap_or_default();
        Ok(section_ids
            .iter()
            .filter_map(|id| inner.chunks.get(id))
            .map(Vec::len)
            .sum())
    }

    async fn record_legislation_chunks(
        &self,
        article_id: Uuid,
        chunks: &[(Uuid, String)],
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .chunks
            .entry(article_id)
            .or_default()
            .extend(chunks.iter().cloned());
        Ok(())
    }

    async fn upsert_act(&self, act: &LegislationAct) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.acts.insert(act.act_id.clone(), act.clone());
        Ok(())
    }

    async fn act_by_id(&self, act_id: &str) -> Result<Option<LegislationAct>> {
        let inner = self.inner.read().await;
        Ok(inner.acts.get(act_id).cloned())
    }

    async fn upsert_articles(&self, articles: &[LegislationArticle]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for article in articles {
            if article.is_current {
                for existing in inner.articles.iter_mut() {
                    if existing.act_id == article.act_id
                        && existing.article_number == article.article_number
                    {
                        existing.is_current = false;
                    }
                }
            }
            inner.articles.push(article.clone());
        }
        Ok(())
    }

    async fn article(
        &self,
        act_id: &str,
        article_number: &str,
    ) -> Result<Option<LegislationArticle>> {
        let inner = self.inner.read().await;
        Ok(inner
            .articles
            .iter()
            .find(|a| a.act_id == act_id && a.article_number == article_number && a.is_current)
            .cloned())
    }

    async fn articles_for_act(&self, act_id: &str) -> Result<Vec<LegislationArticle>> {
        let inner = self.inner.read().await;
        let mut articles: Vec<LegislationArticle> = inner
            .articles
            .iter()
            .filter(|a| a.act_id == act_id && a.is_current)
            .cloned()
            .collect();
        articles.sort_by(|a, b| {
            (a.article_number.len(), &a.article_number)
                .cmp(&(b.article_number.len(), &b.article_number))
        });
        Ok(articles)
    }

    async fn search_articles(
        &self,
        query: &str,
        act_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LegislationArticle>> {
        let inner = self.inner.read().await;
        let needle = Some(query.to_string());
        let mut hits: Vec<LegislationArticle> = inner
            .articles
            .iter()
            .filter(|a| a.is_current)
            .filter(|a| act_id.is_none_or(|wanted| a.act_id == wanted))
            .filter(|a| {
                a.article_number == query
                    || text_matches(&Some(a.text.clone()), needle.as_deref().unwrap_or_default())
            })
            .cloned()
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn upsert_pattern(&self, pattern: &LegalPattern) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.patterns.insert(pattern.id, pattern.clone());
        Ok(())
    }

    async fn patterns_by_intent(&self, intent: &str) -> Result<Vec<LegalPattern>> {
        let inner = self.inner.read().await;
        Ok(inner
            .patterns
            .values()
            .filter(|p| p.intent == intent)
            .cloned()
            .collect())
    }

    async fn upsert_citation(&self, link: &CitationLink) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.citations.insert(
            (link.from_document_id, link.to_document_id, link.citation_type),
            link.clone(),
        );
        Ok(())
    }

    async fn citations_from(&self, document_id: Uuid) -> Result<Vec<CitationLink>> {
        let inner = self.inner.read().await;
        Ok(inner
            .citations
            .values()
            .filter(|c| c.from_document_id == document_id)
            .cloned()
            .collect())
    }

    async fn upsert_precedent_status(&self, status: &PrecedentStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.precedent.insert(status.document_id, status.clone());
        Ok(())
    }

    async fn precedent_status(&self, document_id: Uuid) -> Result<Option<PrecedentStatus>> {
        let inner = self.inner.read().await;
        Ok(inner.precedent.get(&document_id).cloned())
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.events.push(event.clone());
        Ok(())
    }

    async fn corpus_stats(&self) -> Result<CorpusStats> {
        let inner = self.inner.read().await;
        let mut by_type: HashMap<String, i64> = HashMap::new();
        let mut by_court: HashMap<String, i64> = HashMap::new();
        let mut by_outcome: HashMap<String, i64> = HashMap::new();
        for doc in inner.documents.values() {
            *by_type.entry(doc.doc_type.as_str().to_string()).or_default() += 1;
            if let Some(court) = &doc.court {
                *by_court.entry(court.clone()).or_default() += 1;
            }
            if let Some(outcome) = &doc.outcome {
                *by_outcome.entry(outcome.clone()).or_default() += 1;
            }
        }
        let sorted = |map: HashMap<String, i64>| {
            let mut v: Vec<(String, i64)> = map.into_iter().collect();
            v.sort_by(|a, b| b.1.cmp(&a.1));
            v
        };
        Ok(CorpusStats {
            total_documents: inner.documents.len() as i64,
            total_sections: inner.sections.values().map(Vec::len).sum::<usize>() as i64,
            by_type: sorted(by_type),
            by_court: sorted(by_court),
            by_outcome: sorted(by_outcome),
        })
    }
}
