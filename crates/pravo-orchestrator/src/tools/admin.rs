//! Bulk ingestion, pattern management, and analytics tools.

use super::tool;
use crate::{ToolContext, ToolOutput, ToolSpec};
use chrono::NaiveDate;
use pravo_core::{Error, Result};
use pravo_ingest::ScrapeRequest;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
struct BulkIngestArgs {
    query: String,
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    date_to: Option<String>,
    #[serde(default)]
    max_documents: Option<usize>,
}

async fn bulk_ingest(ctx: Arc<ToolContext>, args: BulkIngestArgs) -> Result<ToolOutput> {
    if args.query.trim().is_empty() {
        return Err(Error::invalid_argument("empty query"));
    }
    let parse = |raw: &Option<String>| -> Result<Option<NaiveDate>> {
        raw.as_deref()
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| Error::invalid_argument(format!("bad date: {s}")))
            })
            .transpose()
    };

    let mut request = ScrapeRequest::new(&args.query);
    request.date_from = parse(&args.date_from)?;
    request.date_to = parse(&args.date_to)?;
    request.max_documents = args.max_documents;

    let job_id = ctx.scraper.start(request).await;
    ToolOutput::ok(&json!({ "job_id": job_id }))
}

#[derive(Deserialize)]
struct JobArgs {
    job_id: Uuid,
}

async fn ingest_status(ctx: Arc<ToolContext>, args: JobArgs) -> Result<ToolOutput> {
    match ctx.scraper.progress(args.job_id).await {
        Some(progress) => ToolOutput::ok(&progress),
        None => Err(Error::not_found(format!("job {}", args.job_id))),
    }
}

async fn cancel_ingest(ctx: Arc<ToolContext>, args: JobArgs) -> Result<ToolOutput> {
    if !ctx.scraper.cancel(args.job_id).await {
        return Err(Error::not_found(format!("job {}", args.job_id)));
    }
    ToolOutput::ok(&json!({ "cancelled": args.job_id }))
}

#[derive(Deserialize)]
struct ExtractPatternArgs {
    case_ids: Vec<Uuid>,
    intent: String,
}

async fn extract_legal_pattern(ctx: Arc<ToolContext>, args: ExtractPatternArgs) -> Result<ToolOutput> {
    if args.case_ids.is_empty() {
        return Err(Error::invalid_argument("case_ids is empty"));
    }
    let pattern = ctx.patterns.extract(&args.case_ids, &args.intent).await?;
    match pattern {
        Some(pattern) => ToolOutput::ok(&pattern),
        None => ToolOutput::with_warnings(
            &json!(null),
            vec!["fewer than three usable cases; no pattern extracted".to_string()],
        ),
    }
}

#[derive(Deserialize)]
struct MatchPatternsArgs {
    query: String,
    intent: String,
}

async fn match_legal_patterns(ctx: Arc<ToolContext>, args: MatchPatternsArgs) -> Result<ToolOutput> {
    if args.query.trim().is_empty() {
        return Err(Error::invalid_argument("empty query"));
    }
    let embedding = ctx.gateway.embed(&args.query).await?;
    let matches = ctx
        .patterns
        .match_patterns(&embedding.vector, &args.intent)
        .await?;
    ToolOutput::ok(&json!({ "matches": matches }))
}

#[derive(Deserialize)]
struct AnalyticsArgs {}

async fn corpus_analytics(ctx: Arc<ToolContext>, _args: AnalyticsArgs) -> Result<ToolOutput> {
    let stats = ctx.meta.corpus_stats().await?;
    let usage = ctx.meter.snapshot();
    ToolOutput::ok(&json!({
        "corpus": stats,
        "usage": {
            "calls": usage.calls,
            "input_tokens": usage.input_tokens,
            "output_tokens": usage.output_tokens,
            "cost_micros": usage.cost_micros,
        },
        "ingest_queue_depth": ctx.ingest.queue_depth(),
    }))
}

pub(crate) fn register(specs: &mut Vec<ToolSpec>) {
    specs.push(tool(
        "bulk_ingest",
        "Фонова масова інжестія рішень за ключовим словом і періодом.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "date_from": {"type": "string", "format": "date"},
                "date_to": {"type": "string", "format": "date"},
                "max_documents": {"type": "integer", "minimum": 1}
            },
            "required": ["query"]
        }),
        bulk_ingest,
    ));
    specs.push(tool(
        "ingest_status",
        "Прогрес фонової інжестії за ідентифікатором задачі.",
        json!({
            "type": "object",
            "properties": {"job_id": {"type": "string", "format": "uuid"}},
            "required": ["job_id"]
        }),
        ingest_status,
    ));
    specs.push(tool(
        "cancel_ingest",
        "Кооперативне скасування фонової інжестії.",
        json!({
            "type": "object",
            "properties": {"job_id": {"type": "string", "format": "uuid"}},
            "required": ["job_id"]
        }),
        cancel_ingest,
    ));
    specs.push(tool(
        "extract_legal_pattern",
        "Витягає узагальнений патерн практики з когорти справ одного наміру.",
        json!({
            "type": "object",
            "properties": {
                "case_ids": {"type": "array", "items": {"type": "string", "format": "uuid"}},
                "intent": {"type": "string"}
            },
            "required": ["case_ids", "intent"]
        }),
        extract_legal_pattern,
    ));
    specs.push(tool(
        "match_legal_patterns",
        "Пошук патернів практики, схожих на запит, у межах наміру.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "intent": {"type": "string"}
            },
            "required": ["query", "intent"]
        }),
        match_legal_patterns,
    ));
    specs.push(tool(
        "corpus_analytics",
        "Аналітика корпусу та лічильники використання моделей.",
        json!({"type": "object", "properties": {}}),
        corpus_analytics,
    ));
}
