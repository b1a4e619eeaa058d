//! Precedent search and retrieval tools.

use super::tool;
use crate::{ToolContext, ToolOutput, ToolSpec};
use chrono::NaiveDate;
use pravo_core::{Budget, Error, Result, SectionType};
use pravo_ingest::Sectionizer;
use pravo_llm::select_strategy;
use pravo_store::{DocumentFilters, VectorFilter};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

fn parse_date(raw: &Option<String>) -> Result<Option<NaiveDate>> {
    match raw.as_deref() {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Error::invalid_argument(format!("bad date: {s}"))),
    }
}

#[derive(Deserialize)]
struct SearchPrecedentsArgs {
    query: String,
    #[serde(default)]
    court: Option<String>,
    #[serde(default)]
    chamber: Option<String>,
    #[serde(default)]
    dispute_category: Option<String>,
    #[serde(default)]
    outcome: Option<String>,
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    date_to: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn search_precedents(ctx: Arc<ToolContext>, args: SearchPrecedentsArgs) -> Result<ToolOutput> {
    if args.query.trim().is_empty() {
        return Err(Error::invalid_argument("empty query"));
    }
    let limit = args.limit.unwrap_or(10).clamp(1, 50);
    let date_from = parse_date(&args.date_from)?;
    let date_to = parse_date(&args.date_to)?;

    let mut filter = VectorFilter::new().eq("document_type", "court_decision");
    for (field, value) in [
        ("court", &args.court),
        ("chamber", &args.chamber),
        ("dispute_category", &args.dispute_category),
        ("outcome", &args.outcome),
    ] {
        if let Some(v) = value {
            filter = filter.eq(field, v.clone());
        }
    }
    filter = filter.date_between(date_from, date_to);

    let mut warnings = Vec::new();
    let mut hits = Vec::new();
    match ctx.gateway.embed(&args.query).await {
        Ok(embedding) => match ctx.vectors.search(&embedding.vector, &filter, limit).await {
            Ok(found) => hits = found,
            Err(e) => warnings.push(format!("vector search: {e}")),
        },
        Err(e) => warnings.push(format!("embedding: {e}")),
    }

    // Metadata search fills in documents the vector index has not seen.
    let mut filters = DocumentFilters::new();
    filters.court = args.court;
    filters.chamber = args.chamber;
    filters.dispute_category = args.dispute_category;
    filters.outcome = args.outcome;
    filters.date_from = date_from;
    filters.date_to = date_to;
    filters.text = Some(args.query.clone());
    filters.limit = limit;
    let documents = match ctx.meta.search_documents(&filters, ctx.viewer).await {
        Ok(docs) => docs,
        Err(e) => {
            warnings.push(format!("metadata search: {e}"));
            Vec::new()
        }
    };

    let seen: HashSet<Uuid> = hits.iter().map(|h| h.payload.doc_id).collect();
    let extra: Vec<_> = documents
        .into_iter()
        .filter(|d| !seen.contains(&d.id))
        .map(|d| {
            json!({
                "document_id": d.id,
                "external_id": d.external_id,
                "title": d.title,
                "case_number": d.case_number,
                "court": d.court,
                "date": d.date,
                "provenance": "keyword",
            })
        })
        .collect();

    let payload = json!({
        "vector_hits": hits.iter().map(|h| json!({
            "document_id": h.payload.doc_id,
            "score": h.score,
            "section_type": h.payload.section_type,
            "text": h.payload.text,
            "case_number": h.payload.case_number,
            "court": h.payload.court,
            "date": h.payload.date,
        })).collect::<Vec<_>>(),
        "metadata_hits": extra,
    });
    ToolOutput::with_warnings(&payload, warnings)
}

#[derive(Deserialize)]
struct GetDecisionArgs {
    external_id: String,
    /// Fetch and ingest when the decision is not yet in the store.
    #[serde(default)]
    ingest_if_missing: Option<bool>,
}

async fn get_decision(ctx: Arc<ToolContext>, args: GetDecisionArgs) -> Result<ToolOutput> {
    let existing = ctx
        .meta
        .document_by_external_id(&args.external_id, ctx.viewer)
        .await?;
    let doc = match existing {
        Some(doc) => doc,
        None if args.ingest_if_missing.unwrap_or(true) => {
            ctx.ingest.ingest_document(&args.external_id).await?;
            ctx.meta
                .document_by_external_id(&args.external_id, ctx.viewer)
                .await?
                .ok_or_else(|| Error::not_found(format!("decision {}", args.external_id)))?
        }
        None => return Err(Error::not_found(format!("decision {}", args.external_id))),
    };
    let sections = ctx.meta.sections_for(doc.id).await?;
    ToolOutput::ok(&json!({ "document": doc, "sections": sections }))
}

#[derive(Deserialize)]
struct ExtractSectionsArgs {
    #[serde(default)]
    external_id: Option<String>,
    /// Raw text to sectionize directly, bypassing the store.
    #[serde(default)]
    text: Option<String>,
}

async fn extract_sections(ctx: Arc<ToolContext>, args: ExtractSectionsArgs) -> Result<ToolOutput> {
    match (args.external_id, args.text) {
        (Some(external_id), None) => {
            let doc = ctx
                .meta
                .document_by_external_id(&external_id, ctx.viewer)
                .await?
                .ok_or_else(|| Error::not_found(format!("decision {external_id}")))?;
            let sections = ctx.meta.sections_for(doc.id).await?;
            if !sections.is_empty() {
                return ToolOutput::ok(&json!({ "sections": sections, "cached": true }));
            }
            let text = doc
                .full_text
                .ok_or_else(|| Error::PreconditionFailed(format!("{external_id} has no text")))?;
            let sections = Sectionizer::new().sectionize(doc.id, &text).await?;
            ToolOutput::ok(&json!({ "sections": sections, "cached": false }))
        }
        (None, Some(text)) => {
            let sections = Sectionizer::new()
                .sectionize(Uuid::new_v4(), &text)
                .await?;
            ToolOutput::ok(&json!({ "sections": sections, "cached": false }))
        }
        _ => Err(Error::invalid_argument(
            "provide exactly one of external_id or text",
        )),
    }
}

#[derive(Deserialize)]
struct LoadTextsArgs {
    external_ids: Vec<String>,
}

async fn load_decision_texts(ctx: Arc<ToolContext>, args: LoadTextsArgs) -> Result<ToolOutput> {
    if args.external_ids.is_empty() {
        return Err(Error::invalid_argument("external_ids is empty"));
    }
    let report = ctx.ingest.ingest_batch(&args.external_ids).await;
    ToolOutput::ok(&report)
}

#[derive(Deserialize)]
struct ScPracticeArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

const SUPREME_COURT: &str = "Верховний Суд";

async fn search_supreme_court_practice(
    ctx: Arc<ToolContext>,
    args: ScPracticeArgs,
) -> Result<ToolOutput> {
    if args.query.trim().is_empty() {
        return Err(Error::invalid_argument("empty query"));
    }
    let limit = args.limit.unwrap_or(10).clamp(1, 50);

    let mut warnings = Vec::new();
    let filter = VectorFilter::new().eq("court", SUPREME_COURT);
    let hits = match ctx.gateway.embed(&args.query).await {
        Ok(embedding) => match ctx.vectors.search(&embedding.vector, &filter, limit).await {
            Ok(hits) => hits,
            Err(e) => {
                warnings.push(format!("vector search: {e}"));
                Vec::new()
            }
        },
        Err(e) => {
            warnings.push(format!("embedding: {e}"));
            Vec::new()
        }
    };

    let mut filters = DocumentFilters::new();
    filters.court = Some(SUPREME_COURT.to_string());
    filters.text = Some(args.query.clone());
    filters.limit = limit;
    let documents = ctx.meta.search_documents(&filters, ctx.viewer).await?;

    let payload = json!({
        "vector_hits": hits.iter().map(|h| json!({
            "document_id": h.payload.doc_id,
            "score": h.score,
            "text": h.payload.text,
            "case_number": h.payload.case_number,
        })).collect::<Vec<_>>(),
        "documents": documents,
    });
    ToolOutput::with_warnings(&payload, warnings)
}

#[derive(Deserialize)]
struct ProContraArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

async fn compare_practice_pro_contra(
    ctx: Arc<ToolContext>,
    args: ProContraArgs,
) -> Result<ToolOutput> {
    if args.query.trim().is_empty() {
        return Err(Error::invalid_argument("empty query"));
    }
    let limit = args.limit.unwrap_or(5).clamp(1, 20);

    let side = |affirmative: bool| {
        let ctx = ctx.clone();
        let query = args.query.clone();
        async move {
            let suffix = if affirmative { "задовольнити" } else { "відмовити" };
            let mut filters = DocumentFilters::new();
            filters.court = Some(SUPREME_COURT.to_string());
            filters.text = Some(format!("{query} {suffix}"));
            filters.limit = limit;
            ctx.meta.search_documents(&filters, ctx.viewer).await
        }
    };

    let (pro, contra) = futures::join!(side(true), side(false));
    let mut warnings = Vec::new();
    let pro = pro.unwrap_or_else(|e| {
        warnings.push(format!("pro search: {e}"));
        Vec::new()
    });
    let contra = contra.unwrap_or_else(|e| {
        warnings.push(format!("contra search: {e}"));
        Vec::new()
    });

    // Balanced samples: the same number of cases on each side.
    let balanced = pro.len().min(contra.len()).max(1);
    let payload = json!({
        "pro": pro.into_iter().take(balanced.max(1)).collect::<Vec<_>>(),
        "contra": contra.into_iter().take(balanced.max(1)).collect::<Vec<_>>(),
    });
    ToolOutput::with_warnings(&payload, warnings)
}

#[derive(Deserialize)]
struct SimilarFactsArgs {
    facts: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct DistilledKeywords {
    keywords: Vec<String>,
}

async fn find_similar_fact_pattern_cases(
    ctx: Arc<ToolContext>,
    args: SimilarFactsArgs,
) -> Result<ToolOutput> {
    if args.facts.trim().is_empty() {
        return Err(Error::invalid_argument("empty facts"));
    }
    let limit = args.limit.unwrap_or(10).clamp(1, 50);
    let mut warnings = Vec::new();

    // Distill searchable keywords from the free-text facts first.
    let model = ctx.providers.chat(&select_strategy(Budget::Quick));
    let prompt = format!(
        "Виділи 3-7 ключових пошукових термінів з опису фактів. \
         Поверни JSON {{\"keywords\": [\"...\"]}}.\n\nФакти: {}",
        args.facts
    );
    let keywords = match model.generate_json(&prompt).await {
        Ok(raw) => match serde_json::from_value::<DistilledKeywords>(raw) {
            Ok(distilled) if !distilled.keywords.is_empty() => distilled.keywords,
            _ => {
                warnings.push("keyword distillation malformed, using raw facts".to_string());
                vec![args.facts.clone()]
            }
        },
        Err(e) => {
            warnings.push(format!("keyword distillation: {e}"));
            vec![args.facts.clone()]
        }
    };

    let filter = VectorFilter::new()
        .eq("document_type", "court_decision")
        .any_of(
            "section_type",
            [SectionType::Facts.as_str(), SectionType::CourtReasoning.as_str()],
        );
    let embedding = ctx.gateway.embed(&args.facts).await?;
    let hits = ctx.vectors.search(&embedding.vector, &filter, limit).await?;

    let keyword_query = keywords.join(" ");
    let documents = ctx
        .meta
        .full_text_search(&keyword_query, ctx.viewer, limit)
        .await
        .unwrap_or_else(|e| {
            warnings.push(format!("keyword search: {e}"));
            Vec::new()
        });

    let payload = json!({
        "keywords": keywords,
        "vector_hits": hits.iter().map(|h| json!({
            "document_id": h.payload.doc_id,
            "score": h.score,
            "section_type": h.payload.section_type,
            "case_number": h.payload.case_number,
        })).collect::<Vec<_>>(),
        "keyword_hits": documents,
    });
    ToolOutput::with_warnings(&payload, warnings)
}

pub(crate) fn register(specs: &mut Vec<ToolSpec>) {
    specs.push(tool(
        "search_precedents",
        "Гібридний пошук судових рішень: вектори + метадані з фільтрами.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "court": {"type": "string"},
                "chamber": {"type": "string"},
                "dispute_category": {"type": "string"},
                "outcome": {"type": "string"},
                "date_from": {"type": "string", "format": "date"},
                "date_to": {"type": "string", "format": "date"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 50}
            },
            "required": ["query"]
        }),
        search_precedents,
    ));
    specs.push(tool(
        "get_decision",
        "Повертає рішення з розділами; за потреби інжестить його з реєстру.",
        json!({
            "type": "object",
            "properties": {
                "external_id": {"type": "string"},
                "ingest_if_missing": {"type": "boolean"}
            },
            "required": ["external_id"]
        }),
        get_decision,
    ));
    specs.push(tool(
        "extract_sections",
        "Типізовані розділи рішення: зі сховища або з наданого тексту.",
        json!({
            "type": "object",
            "properties": {
                "external_id": {"type": "string"},
                "text": {"type": "string"}
            }
        }),
        extract_sections,
    ));
    specs.push(tool(
        "load_decision_texts",
        "Масове завантаження повних текстів рішень з інжестом.",
        json!({
            "type": "object",
            "properties": {
                "external_ids": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["external_ids"]
        }),
        load_decision_texts,
    ));
    specs.push(tool(
        "search_supreme_court_practice",
        "Пошук практики Верховного Суду за запитом.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer"}
            },
            "required": ["query"]
        }),
        search_supreme_court_practice,
    ));
    specs.push(tool(
        "compare_practice_pro_contra",
        "Паралельний пошук практики «за» і «проти» зі збалансованими вибірками.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer"}
            },
            "required": ["query"]
        }),
        compare_practice_pro_contra,
    ));
    specs.push(tool(
        "find_similar_fact_pattern_cases",
        "Пошук справ зі схожими фактами: дистиляція ключових слів + гібридний пошук.",
        json!({
            "type": "object",
            "properties": {
                "facts": {"type": "string"},
                "limit": {"type": "integer"}
            },
            "required": ["facts"]
        }),
        find_similar_fact_pattern_cases,
    ));
}
