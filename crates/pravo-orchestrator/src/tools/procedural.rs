//! Procedural tools: deadlines, checklists, monetary claims.

use super::tool;
use crate::{compute_deadline, ToolContext, ToolOutput, ToolSpec};
use chrono::NaiveDate;
use pravo_core::{Error, Result};
use pravo_store::DocumentFilters;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
struct DeadlineArgs {
    procedure_code: String,
    appeal_type: String,
    event_type: String,
    event_date: String,
    /// Date the full text was served, for a party absent at pronouncement.
    #[serde(default)]
    receipt_date: Option<String>,
}

async fn calculate_procedural_deadlines(
    ctx: Arc<ToolContext>,
    args: DeadlineArgs,
) -> Result<ToolOutput> {
    let event_date = NaiveDate::parse_from_str(&args.event_date, "%Y-%m-%d")
        .map_err(|_| Error::invalid_argument(format!("bad event_date: {}", args.event_date)))?;
    let receipt_date = args
        .receipt_date
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| Error::invalid_argument(format!("bad receipt_date: {raw}")))
        })
        .transpose()?;
    let computed = compute_deadline(
        &args.procedure_code,
        &args.appeal_type,
        &args.event_type,
        event_date,
        receipt_date,
    )?;

    // Static table first, then an active look at recent practice on
    // deadline renewal for the same appeal type.
    let mut warnings = Vec::new();
    let mut filters = DocumentFilters::new();
    filters.court = Some("Верховний Суд".to_string());
    filters.text = Some("поновлення строку на оскарження".to_string());
    filters.limit = 5;
    let theses: Vec<serde_json::Value> = match ctx.meta.search_documents(&filters, ctx.viewer).await
    {
        Ok(documents) => documents
            .into_iter()
            .map(|d| {
                json!({
                    "case_number": d.case_number,
                    "court": d.court,
                    "date": d.date,
                    "title": d.title,
                })
            })
            .collect(),
        Err(e) => {
            warnings.push(format!("practice lookup: {e}"));
            Vec::new()
        }
    };

    let payload = json!({
        "conclusion": format!(
            "Строк оскарження становить {} днів; кінцева дата за базовим правилом — {}.",
            computed.days, computed.variants[0].end_date
        ),
        "days": computed.days,
        "variants": computed.variants,
        "norms": computed.norms,
        "renewal_criteria": computed.renewal_criteria,
        "risks": computed.risks,
        "action_checklist": [
            "підготувати скаргу та додатки",
            "сплатити судовий збір",
            "подати скаргу до належного суду до кінцевої дати",
        ],
        "supreme_court_theses": theses,
    });
    ToolOutput::with_warnings(&payload, warnings)
}

#[derive(Deserialize)]
struct ChecklistArgs {
    procedure_code: String,
    /// `claim`, `appeal`, or `cassation`.
    action: String,
}

async fn build_procedural_checklist(
    _ctx: Arc<ToolContext>,
    args: ChecklistArgs,
) -> Result<ToolOutput> {
    let steps: Vec<&str> = match args.action.as_str() {
        "claim" => vec![
            "визначити предметну та територіальну юрисдикцію",
            "сформулювати позовні вимоги та їх обґрунтування",
            "зібрати докази на підтвердження кожної обставини",
            "розрахувати та сплатити судовий збір",
            "подати позовну заяву з додатками",
        ],
        "appeal" => vec![
            "перевірити строк на апеляційне оскарження",
            "сформулювати доводи щодо порушень судом першої інстанції",
            "додати клопотання про поновлення строку в разі пропуску",
            "сплатити судовий збір",
            "подати скаргу через суд апеляційної інстанції",
        ],
        "cassation" => vec![
            "перевірити наявність підстав касаційного оскарження",
            "визначити, чи допускається касація у цій категорії справ",
            "обґрунтувати неправильне застосування норм матеріального права",
            "подати скаргу безпосередньо до Верховного Суду",
        ],
        other => {
            return Err(Error::invalid_argument(format!(
                "unknown action: {other}"
            )));
        }
    };
    let evidence: Vec<&str> = match args.action.as_str() {
        "claim" => vec![
            "документи на підтвердження вимог",
            "розрахунок ціни позову",
            "докази надсилання копій іншим учасникам",
        ],
        _ => vec![
            "копія оскаржуваного рішення",
            "докази дати отримання повного тексту",
            "квитанція про сплату судового збору",
        ],
    };
    ToolOutput::ok(&json!({
        "procedure_code": args.procedure_code,
        "action": args.action,
        "steps": steps,
        "evidence": evidence,
    }))
}

#[derive(Deserialize)]
struct MonetaryArgs {
    /// Principal amount in kopecks to avoid float money.
    principal_kopecks: u64,
    date_from: String,
    date_to: String,
    /// Annual interest per ст. 625 ЦК; defaults to 3%.
    #[serde(default)]
    annual_interest_pct: Option<f64>,
    /// Cumulative inflation index over the period, e.g. 1.074 for +7.4%.
    #[serde(default)]
    inflation_index: Option<f64>,
}

async fn calculate_monetary_claims(_ctx: Arc<ToolContext>, args: MonetaryArgs) -> Result<ToolOutput> {
    let from = NaiveDate::parse_from_str(&args.date_from, "%Y-%m-%d")
        .map_err(|_| Error::invalid_argument(format!("bad date_from: {}", args.date_from)))?;
    let to = NaiveDate::parse_from_str(&args.date_to, "%Y-%m-%d")
        .map_err(|_| Error::invalid_argument(format!("bad date_to: {}", args.date_to)))?;
    if to < from {
        return Err(Error::invalid_argument("date_to precedes date_from"));
    }

    let days = (to - from).num_days() as f64;
    let principal = args.principal_kopecks as f64;
    let rate = args.annual_interest_pct.unwrap_or(3.0) / 100.0;

    let three_percent = principal * rate * days / 365.0;
    let inflation_loss = args
        .inflation_index
        .map(|index| principal * (index - 1.0).max(0.0))
        .unwrap_or(0.0);
    let total = principal + three_percent + inflation_loss;

    ToolOutput::ok(&json!({
        "days_overdue": days as u64,
        "principal_kopecks": args.principal_kopecks,
        "interest_kopecks": three_percent.round() as u64,
        "inflation_loss_kopecks": inflation_loss.round() as u64,
        "total_kopecks": total.round() as u64,
        "basis": {
            "act": "Цивільний кодекс України",
            "article": "ст. 625",
        },
    }))
}

pub(crate) fn register(specs: &mut Vec<ToolSpec>) {
    specs.push(tool(
        "calculate_procedural_deadlines",
        "Процесуальні строки за таблицею норм з оглядом практики щодо поновлення.",
        json!({
            "type": "object",
            "properties": {
                "procedure_code": {"type": "string", "enum": ["cpc", "gpc", "cas"]},
                "appeal_type": {"type": "string", "enum": ["appeal", "cassation"]},
                "event_type": {"type": "string", "enum": ["decision", "ruling"]},
                "event_date": {"type": "string", "format": "date"},
                "receipt_date": {
                    "type": "string",
                    "format": "date",
                    "description": "Дата вручення повного тексту, якщо сторона не була присутня при проголошенні"
                }
            },
            "required": ["procedure_code", "appeal_type", "event_type", "event_date"]
        }),
        calculate_procedural_deadlines,
    ));
    specs.push(tool(
        "build_procedural_checklist",
        "Покроковий чекліст процесуальної дії з переліком доказів.",
        json!({
            "type": "object",
            "properties": {
                "procedure_code": {"type": "string"},
                "action": {"type": "string", "enum": ["claim", "appeal", "cassation"]}
            },
            "required": ["procedure_code", "action"]
        }),
        build_procedural_checklist,
    ));
    specs.push(tool(
        "calculate_monetary_claims",
        "Розрахунок грошових вимог: 3% річних та інфляційні втрати за ст. 625 ЦК.",
        json!({
            "type": "object",
            "properties": {
                "principal_kopecks": {"type": "integer", "minimum": 0},
                "date_from": {"type": "string", "format": "date"},
                "date_to": {"type": "string", "format": "date"},
                "annual_interest_pct": {"type": "number"},
                "inflation_index": {"type": "number"}
            },
            "required": ["principal_kopecks", "date_from", "date_to"]
        }),
        calculate_monetary_claims,
    ));
}
