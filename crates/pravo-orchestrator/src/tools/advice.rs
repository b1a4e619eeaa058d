//! The answering tool family: classification, advice, validation, and
//! rendering.

use super::tool;
use crate::{
    classify_intent, get_legal_advice, validate_citations, AnswerPack, EvidenceTexts,
    ToolContext, ToolOutput, ToolSpec,
};
use pravo_core::{Budget, Error, Result};
use pravo_llm::select_strategy;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Deserialize)]
struct ClassifyArgs {
    query: String,
}

async fn classify(ctx: Arc<ToolContext>, args: ClassifyArgs) -> Result<ToolOutput> {
    if args.query.trim().is_empty() {
        return Err(Error::invalid_argument("empty query"));
    }
    let model = ctx.providers.chat(&select_strategy(Budget::Quick));
    let classification = classify_intent(&args.query, Some(model.as_ref())).await;
    ToolOutput::ok(&classification)
}

#[derive(Deserialize)]
struct AdviceArgs {
    query: String,
    #[serde(default)]
    budget: Option<String>,
}

async fn advice(ctx: Arc<ToolContext>, args: AdviceArgs) -> Result<ToolOutput> {
    if args.query.trim().is_empty() {
        return Err(Error::invalid_argument("empty query"));
    }
    let budget = match args.budget.as_deref() {
        Some(raw) => Budget::parse(raw)?,
        None => Budget::Standard,
    };
    let payload = get_legal_advice(&ctx, &args.query, budget).await?;
    let warnings = payload.warnings.clone();
    ToolOutput::with_warnings(&payload, warnings)
}

#[derive(Deserialize)]
struct ValidateArgs {
    answer: Value,
    /// `[{document_id, text}]` pairs the quotes must trace to.
    evidence: Vec<EvidenceEntry>,
}

#[derive(Deserialize)]
struct EvidenceEntry {
    document_id: String,
    text: String,
}

async fn validate(_ctx: Arc<ToolContext>, args: ValidateArgs) -> Result<ToolOutput> {
    let mut texts = EvidenceTexts::new();
    for entry in &args.evidence {
        texts.add(entry.document_id.clone(), &entry.text);
    }
    let report = validate_citations(AnswerPack::from_raw(args.answer)?, &texts)?;
    ToolOutput::with_warnings(&report.pack, report.stripped)
}

#[derive(Deserialize)]
struct FormatArgs {
    answer: Value,
}

/// Renders a validated pack as readable Markdown.
fn render_markdown(pack: &AnswerPack) -> String {
    let mut out = String::new();
    out.push_str(&format!("## Висновок\n\n{}\n", pack.short_conclusion.conclusion));
    for condition in &pack.short_conclusion.conditions {
        out.push_str(&format!("- умова: {condition}\n"));
    }
    if let Some(risk) = &pack.short_conclusion.risk_or_exception {
        out.push_str(&format!("- ризик: {risk}\n"));
    }

    if !pack.legal_framework.norms.is_empty() {
        out.push_str("\n## Нормативна база\n\n");
        for norm in &pack.legal_framework.norms {
            out.push_str(&format!("**{} {}**: «{}»\n", norm.act, norm.article_ref, norm.quote));
            if let Some(comment) = &norm.comment {
                out.push_str(&format!("  {comment}\n"));
            }
        }
    }

    if !pack.supreme_court_positions.is_empty() {
        out.push_str("\n## Позиції Верховного Суду\n\n");
        for position in &pack.supreme_court_positions {
            out.push_str(&format!("- {}\n", position.thesis));
            for quote in &position.quotes {
                out.push_str(&format!("  > «{}» ({})\n", quote.quote, quote.source_doc_id));
            }
        }
    }

    if !pack.checklist.steps.is_empty() {
        out.push_str("\n## Кроки\n\n");
        for (i, step) in pack.checklist.steps.iter().enumerate() {
            out.push_str(&format!("{}. {step}\n", i + 1));
        }
    }

    out.push_str("\n## Джерела\n\n");
    for source in &pack.sources {
        out.push_str(&format!(
            "- {} ({}): «{}»\n",
            source.document_id, source.section_type, source.quote
        ));
    }
    out
}

async fn format_pack(_ctx: Arc<ToolContext>, args: FormatArgs) -> Result<ToolOutput> {
    let pack = AnswerPack::from_raw(args.answer)?;
    ToolOutput::ok(&json!({ "markdown": render_markdown(&pack) }))
}

pub(crate) fn register(specs: &mut Vec<ToolSpec>) {
    specs.push(tool(
        "classify_intent",
        "Класифікація наміру юридичного запиту: інтент, домени, слоти, бюджет.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Запит користувача"}
            },
            "required": ["query"]
        }),
        classify,
    ));
    specs.push(tool(
        "get_legal_advice",
        "Повний цикл відповіді: намір → пошук доказів → синтез → перевірка цитат.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "budget": {"type": "string", "enum": ["quick", "standard", "deep"]}
            },
            "required": ["query"]
        }),
        advice,
    ));
    specs.push(tool(
        "validate_citations",
        "Перевіряє, що кожна цитата відповіді є дослівним фрагментом наданих джерел.",
        json!({
            "type": "object",
            "properties": {
                "answer": {"type": "object"},
                "evidence": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "document_id": {"type": "string"},
                            "text": {"type": "string"}
                        },
                        "required": ["document_id", "text"]
                    }
                }
            },
            "required": ["answer", "evidence"]
        }),
        validate,
    ));
    specs.push(tool(
        "format_answer_pack",
        "Рендерить структуровану відповідь у Markdown.",
        json!({
            "type": "object",
            "properties": {"answer": {"type": "object"}},
            "required": ["answer"]
        }),
        format_pack,
    ));
}
