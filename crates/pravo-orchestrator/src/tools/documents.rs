//! Uploaded-document tools.

use super::tool;
use crate::{compare_documents, ToolContext, ToolOutput, ToolSpec};
use base64::Engine;
use pravo_core::{Budget, DocumentType, Error, Result};
use pravo_llm::select_strategy;
use pravo_patterns::{lexicon_hits, RISK_LEXICON};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

#[derive(Deserialize)]
struct ParseDocumentArgs {
    /// Base64-encoded document bytes.
    content: String,
    mime: String,
    #[serde(default)]
    title: Option<String>,
    /// Persist the parsed text as a private document of the caller.
    #[serde(default)]
    save: Option<bool>,
}

async fn parse_document(ctx: Arc<ToolContext>, args: ParseDocumentArgs) -> Result<ToolOutput> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&args.content)
        .map_err(|e| Error::invalid_argument(format!("content is not base64: {e}")))?;
    let parsed = ctx.upload.parse(&bytes, &args.mime).await?;

    let mut document_id = None;
    if args.save.unwrap_or(false) {
        let mut doc = pravo_core::Document::new(
            format!("upload-{}", Uuid::new_v4()),
            DocumentType::Uploaded,
        )
        .with_title(args.title.clone().unwrap_or_else(|| "Завантажений документ".into()))
        .with_full_text(parsed.text.clone());
        doc.owner_id = ctx.viewer;
        let stored = ctx.meta.upsert_document(&doc).await?;
        document_id = Some(stored.id);
    }

    ToolOutput::ok(&json!({
        "text": parsed.text,
        "page_count": parsed.page_count,
        "source": format!("{:?}", parsed.source),
        "document_id": document_id,
    }))
}

/// Clause headings recognized in Ukrainian contracts.
const CLAUSE_MARKERS: &[(&str, &[&str])] = &[
    ("subject", &["предмет договору", "предмет угоди"]),
    ("price", &["ціна договору", "вартість", "порядок розрахунків", "оплата"]),
    ("term", &["строк дії", "термін дії", "строк виконання"]),
    ("liability", &["відповідальність сторін", "штрафні санкції", "пеня"]),
    ("termination", &["розірвання договору", "припинення договору"]),
    ("force_majeure", &["форс-мажор", "обставини непереборної сили"]),
    ("confidentiality", &["конфіденційність", "нерозголошення"]),
    ("disputes", &["вирішення спорів", "порядок вирішення спорів", "арбітраж"]),
];

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static regex"))
}

/// Paragraph-level clause extraction by heading markers.
fn extract_clauses(text: &str) -> Vec<(&'static str, String)> {
    let mut clauses = Vec::new();
    for paragraph in paragraph_re().split(text) {
        let lower = paragraph.to_lowercase();
        for (clause_type, markers) in CLAUSE_MARKERS {
            if markers.iter().any(|m| lower.contains(m)) {
                clauses.push((*clause_type, paragraph.trim().to_string()));
                break;
            }
        }
    }
    clauses
}

#[derive(Deserialize)]
struct KeyClausesArgs {
    text: String,
}

async fn extract_key_clauses(_ctx: Arc<ToolContext>, args: KeyClausesArgs) -> Result<ToolOutput> {
    if args.text.trim().is_empty() {
        return Err(Error::invalid_argument("empty text"));
    }
    let clauses: Vec<_> = extract_clauses(&args.text)
        .into_iter()
        .map(|(clause_type, text)| json!({ "clause_type": clause_type, "text": text }))
        .collect();
    ToolOutput::ok(&json!({ "clauses": clauses }))
}

#[derive(Deserialize)]
struct SummarizeArgs {
    text: String,
    #[serde(default)]
    budget: Option<String>,
}

async fn summarize_document(ctx: Arc<ToolContext>, args: SummarizeArgs) -> Result<ToolOutput> {
    if args.text.trim().is_empty() {
        return Err(Error::invalid_argument("empty text"));
    }
    let budget = match args.budget.as_deref() {
        Some(raw) => Budget::parse(raw)?,
        None => Budget::Quick,
    };
    let model = ctx.providers.chat(&select_strategy(budget));
    let window: String = args.text.chars().take(12_000).collect();
    let summary = model
        .generate_text(&format!(
            "Стисло підсумуй юридичний документ у 5-7 реченнях українською:\n\n{window}"
        ))
        .await?;
    ToolOutput::ok(&json!({ "summary": summary }))
}

#[derive(Deserialize)]
struct CompareArgs {
    left: String,
    right: String,
}

async fn compare_documents_tool(_ctx: Arc<ToolContext>, args: CompareArgs) -> Result<ToolOutput> {
    let changes = compare_documents(&args.left, &args.right);
    let count = |severity: crate::ChangeSeverity| {
        changes.iter().filter(|c| c.severity == severity).count()
    };
    ToolOutput::ok(&json!({
        "changes": changes,
        "critical": count(crate::ChangeSeverity::Critical),
        "significant": count(crate::ChangeSeverity::Significant),
        "minor": count(crate::ChangeSeverity::Minor),
    }))
}

#[derive(Deserialize)]
struct AnalyzeArgs {
    text: String,
}

fn amount_scan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\d[\d\s]*(?:[.,]\d+)?\s*(?:грн|гривень|₴)").expect("static regex")
    })
}

async fn analyze_document(_ctx: Arc<ToolContext>, args: AnalyzeArgs) -> Result<ToolOutput> {
    if args.text.trim().is_empty() {
        return Err(Error::invalid_argument("empty text"));
    }
    let clauses: Vec<_> = extract_clauses(&args.text)
        .into_iter()
        .map(|(clause_type, text)| json!({ "clause_type": clause_type, "text": text }))
        .collect();
    let risks = lexicon_hits(RISK_LEXICON, std::slice::from_ref(&args.text));
    let amounts: Vec<String> = amount_scan_re()
        .find_iter(&args.text)
        .take(50)
        .map(|m| m.as_str().trim().to_string())
        .collect();

    ToolOutput::ok(&json!({
        "clauses": clauses,
        "risk_phrases": risks,
        "amounts": amounts,
    }))
}

pub(crate) fn register(specs: &mut Vec<ToolSpec>) {
    specs.push(tool(
        "parse_document",
        "Витягає текст із завантаженого PDF/DOCX/HTML, за потреби через OCR.",
        json!({
            "type": "object",
            "properties": {
                "content": {"type": "string", "description": "base64"},
                "mime": {"type": "string"},
                "title": {"type": "string"},
                "save": {"type": "boolean"}
            },
            "required": ["content", "mime"]
        }),
        parse_document,
    ));
    specs.push(tool(
        "extract_key_clauses",
        "Ключові розділи договору за маркерами заголовків.",
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
        extract_key_clauses,
    ));
    specs.push(tool(
        "summarize_document",
        "Стислий підсумок документа.",
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"},
                "budget": {"type": "string", "enum": ["quick", "standard", "deep"]}
            },
            "required": ["text"]
        }),
        summarize_document,
    ));
    specs.push(tool(
        "compare_documents",
        "Послівне порівняння двох документів із класифікацією змін за критичністю.",
        json!({
            "type": "object",
            "properties": {
                "left": {"type": "string"},
                "right": {"type": "string"}
            },
            "required": ["left", "right"]
        }),
        compare_documents_tool,
    ));
    specs.push(tool(
        "analyze_document",
        "Аналіз документа: ключові розділи, ризикові формулювання, суми.",
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
        analyze_document,
    ));
}
