//! Legislation tools.

use super::tool;
use crate::{ToolContext, ToolOutput, ToolSpec};
use pravo_core::{Error, Result};
use pravo_legislation::{parse_reference, resolve_act};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Procedure-code key → act id.
fn act_for_procedure(code: &str) -> Result<&'static str> {
    match code {
        "cpc" => Ok("1618-15"),
        "gpc" => Ok("1798-12"),
        "cas" => Ok("2747-15"),
        "cpc_criminal" => Ok("4651-17"),
        other => Err(Error::invalid_argument(format!(
            "unknown procedure code: {other}"
        ))),
    }
}

fn resolve_act_arg(raw: &str) -> Result<String> {
    resolve_act(raw)
        .ok_or_else(|| Error::invalid_argument(format!("unknown act: {raw}")))
}

#[derive(Deserialize)]
struct SearchLegislationArgs {
    query: String,
    #[serde(default)]
    act: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn search_legislation(ctx: Arc<ToolContext>, args: SearchLegislationArgs) -> Result<ToolOutput> {
    let act_id = args.act.as_deref().map(resolve_act_arg).transpose()?;
    let groups = ctx
        .legislation
        .search(&args.query, act_id.as_deref(), args.limit.unwrap_or(10))
        .await?;
    ToolOutput::ok(&json!({ "groups": groups }))
}

#[derive(Deserialize)]
struct GetArticleArgs {
    act: String,
    article_number: String,
}

async fn get_article(ctx: Arc<ToolContext>, args: GetArticleArgs) -> Result<ToolOutput> {
    let act_id = resolve_act_arg(&args.act)?;
    let article = ctx
        .legislation
        .get_article(&act_id, &args.article_number)
        .await?;
    ToolOutput::ok(&article)
}

#[derive(Deserialize)]
struct GetArticlesArgs {
    act: String,
    article_numbers: Vec<String>,
}

async fn get_articles(ctx: Arc<ToolContext>, args: GetArticlesArgs) -> Result<ToolOutput> {
    if args.article_numbers.is_empty() {
        return Err(Error::invalid_argument("article_numbers is empty"));
    }
    let act_id = resolve_act_arg(&args.act)?;
    let articles = ctx
        .legislation
        .get_articles(&act_id, &args.article_numbers)
        .await?;
    ToolOutput::ok(&json!({ "articles": articles }))
}

#[derive(Deserialize)]
struct GetStructureArgs {
    act: String,
}

async fn get_structure(ctx: Arc<ToolContext>, args: GetStructureArgs) -> Result<ToolOutput> {
    let act_id = resolve_act_arg(&args.act)?;
    let structure = ctx.legislation.get_structure(&act_id).await?;
    ToolOutput::ok(&structure)
}

#[derive(Deserialize)]
struct FindRelevantArgs {
    query: String,
    #[serde(default)]
    act: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn find_relevant_articles(ctx: Arc<ToolContext>, args: FindRelevantArgs) -> Result<ToolOutput> {
    let act_id = args.act.as_deref().map(resolve_act_arg).transpose()?;
    let hits = ctx
        .legislation
        .find_relevant(&args.query, act_id.as_deref(), args.limit.unwrap_or(5))
        .await?;
    ToolOutput::ok(&json!({ "hits": hits }))
}

#[derive(Deserialize)]
struct ProceduralNormsArgs {
    query: String,
    #[serde(default)]
    procedure_code: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn search_procedural_norms(
    ctx: Arc<ToolContext>,
    args: ProceduralNormsArgs,
) -> Result<ToolOutput> {
    let act_id = args
        .procedure_code
        .as_deref()
        .map(act_for_procedure)
        .transpose()?;
    let groups = ctx
        .legislation
        .search(&args.query, act_id, args.limit.unwrap_or(10))
        .await?;
    ToolOutput::ok(&json!({ "groups": groups }))
}

#[derive(Deserialize)]
struct ParseReferenceArgs {
    phrase: String,
}

async fn parse_reference_tool(_ctx: Arc<ToolContext>, args: ParseReferenceArgs) -> Result<ToolOutput> {
    match parse_reference(&args.phrase) {
        Some(reference) => ToolOutput::ok(&json!({
            "act_id": reference.act_id,
            "article_number": reference.article_number,
        })),
        None => ToolOutput::ok(&json!(null)),
    }
}

pub(crate) fn register(specs: &mut Vec<ToolSpec>) {
    specs.push(tool(
        "search_legislation",
        "Повнотекстовий пошук статей законодавства, згрупований за актами.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "act": {"type": "string", "description": "Код акта (ЦК) або ідентифікатор (435-15)"},
                "limit": {"type": "integer"}
            },
            "required": ["query"]
        }),
        search_legislation,
    ));
    specs.push(tool(
        "get_article",
        "Чинна редакція статті акта; акт підвантажується за потреби.",
        json!({
            "type": "object",
            "properties": {
                "act": {"type": "string"},
                "article_number": {"type": "string"}
            },
            "required": ["act", "article_number"]
        }),
        get_article,
    ));
    specs.push(tool(
        "get_articles",
        "Декілька статей одного акта.",
        json!({
            "type": "object",
            "properties": {
                "act": {"type": "string"},
                "article_numbers": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["act", "article_numbers"]
        }),
        get_articles,
    ));
    specs.push(tool(
        "get_structure",
        "Зміст акта: перелік статей із заголовками.",
        json!({
            "type": "object",
            "properties": {"act": {"type": "string"}},
            "required": ["act"]
        }),
        get_structure,
    ));
    specs.push(tool(
        "find_relevant_articles",
        "Векторний пошук статей законодавства з fallback на повнотекстовий.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "act": {"type": "string"},
                "limit": {"type": "integer"}
            },
            "required": ["query"]
        }),
        find_relevant_articles,
    ));
    specs.push(tool(
        "search_procedural_norms",
        "Пошук норм у процесуальному кодексі за ключем процедури.",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "procedure_code": {"type": "string", "enum": ["cpc", "gpc", "cas", "cpc_criminal"]},
                "limit": {"type": "integer"}
            },
            "required": ["query"]
        }),
        search_procedural_norms,
    ));
    specs.push(tool(
        "parse_reference",
        "Розбирає вільну згадку норми (напр. «ст. 625 ЦК») у пару акт/стаття.",
        json!({
            "type": "object",
            "properties": {"phrase": {"type": "string"}},
            "required": ["phrase"]
        }),
        parse_reference_tool,
    ));
}
