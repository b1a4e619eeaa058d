//! Intent classification.
//!
//! A keyword planner covers the recurring intents deterministically; when
//! it is unsure and a model is available, the model refines the guess. The
//! output drives the retrieval plan: which section types to search, which
//! procedural code applies, how deep the reasoning budget goes.

use pravo_core::{Budget, SectionType};
use pravo_llm::ChatProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Slots distilled from the query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentSlots {
    /// Procedural code key: `cpc`, `gpc`, `cas`, `cpc_criminal`.
    #[serde(default)]
    pub procedure_code: Option<String>,
    /// Court level: `first_instance`, `appeal`, `cassation`.
    #[serde(default)]
    pub court_level: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub parties: Vec<String>,
}

/// The planner's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    pub intent: String,
    pub confidence: f32,
    pub domains: Vec<String>,
    pub required_entities: Vec<String>,
    pub sections_of_interest: Vec<SectionType>,
    pub reasoning_budget: Budget,
    pub slots: IntentSlots,
}

struct IntentRule {
    intent: &'static str,
    domain: &'static str,
    keywords: &'static [&'static str],
    sections: &'static [SectionType],
    procedure_code: Option<&'static str>,
    budget: Budget,
}

const RULES: &[IntentRule] = &[
    IntentRule {
        intent: "appeal",
        domain: "procedure",
        keywords: &[
            "оскаржити",
            "апеляц",
            "скасувати рішення",
            "касац",
            "не згоден з рішенням",
        ],
        sections: &[SectionType::CourtReasoning, SectionType::Decision],
        procedure_code: Some("cpc"),
        budget: Budget::Standard,
    },
    IntentRule {
        intent: "procedural_deadlines",
        domain: "procedure",
        keywords: &["строк", "термін", "пропустив", "поновлення строку", "дедлайн"],
        sections: &[SectionType::CourtReasoning, SectionType::Decision],
        procedure_code: Some("cpc"),
        budget: Budget::Quick,
    },
    IntentRule {
        intent: "consumer_protection",
        domain: "consumer",
        keywords: &["споживач", "повернути товар", "неякісний", "гарантійн"],
        sections: &[SectionType::CourtReasoning, SectionType::Decision, SectionType::Amounts],
        procedure_code: None,
        budget: Budget::Standard,
    },
    IntentRule {
        intent: "debt_recovery",
        domain: "obligations",
        keywords: &["борг", "заборгованість", "стягнення", "інфляційн", "прострочен"],
        sections: &[SectionType::CourtReasoning, SectionType::Decision, SectionType::Amounts],
        procedure_code: None,
        budget: Budget::Standard,
    },
    IntentRule {
        intent: "contract_dispute",
        domain: "obligations",
        keywords: &["договір", "договору", "розірвати", "недійсним", "умови контракту"],
        sections: &[SectionType::CourtReasoning, SectionType::Decision],
        procedure_code: None,
        budget: Budget::Standard,
    },
    IntentRule {
        intent: "labor_dispute",
        domain: "labor",
        keywords: &["звільнення", "поновлення на роботі", "заробітна плата", "трудов"],
        sections: &[SectionType::CourtReasoning, SectionType::Decision],
        procedure_code: None,
        budget: Budget::Standard,
    },
];

fn detect_court_level(lower: &str) -> Option<&'static str> {
    if lower.contains("перш") && lower.contains("інстанц") {
        Some("first_instance")
    } else if lower.contains("апеляц") {
        Some("appeal")
    } else if lower.contains("касац") || lower.contains("верховн") {
        Some("cassation")
    } else {
        None
    }
}

fn detect_procedure_code(lower: &str) -> Option<&'static str> {
    if lower.contains("господарськ") {
        Some("gpc")
    } else if lower.contains("адміністративн") {
        Some("cas")
    } else if lower.contains("кримінальн") {
        Some("cpc_criminal")
    } else if lower.contains("цивільн") || lower.contains("суду") || lower.contains("суд") {
        Some("cpc")
    } else {
        None
    }
}

/// Deterministic keyword pass.
pub fn classify_by_keywords(query: &str) -> IntentClassification {
    let lower = query.to_lowercase();

    let mut best: Option<(&IntentRule, usize)> = None;
    for rule in RULES {
        let hits = rule.keywords.iter().filter(|k| lower.contains(*k)).count();
        if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
            best = Some((rule, hits));
        }
    }

    match best {
        Some((rule, hits)) => {
            let confidence = (0.5 + 0.15 * hits as f32).min(0.95);
            IntentClassification {
                intent: rule.intent.to_string(),
                confidence,
                domains: vec![rule.domain.to_string()],
                required_entities: Vec::new(),
                sections_of_interest: rule.sections.to_vec(),
                reasoning_budget: rule.budget,
                slots: IntentSlots {
                    procedure_code: detect_procedure_code(&lower)
                        .or(rule.procedure_code)
                        .map(str::to_string),
                    court_level: detect_court_level(&lower).map(str::to_string),
                    ..Default::default()
                },
            }
        }
        None => IntentClassification {
            intent: "general_legal".to_string(),
            confidence: 0.3,
            domains: vec!["general".to_string()],
            required_entities: Vec::new(),
            sections_of_interest: vec![SectionType::CourtReasoning, SectionType::Decision],
            reasoning_budget: Budget::Standard,
            slots: IntentSlots {
                procedure_code: detect_procedure_code(&lower).map(str::to_string),
                court_level: detect_court_level(&lower).map(str::to_string),
                ..Default::default()
            },
        },
    }
}

/// Shape the refining model must return.
#[derive(Debug, Deserialize)]
struct ModelIntent {
    intent: String,
    confidence: f32,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    slots: IntentSlots,
}

/// Keyword pass first; a low-confidence result is refined by the model when
/// one is available. Model failures fall back to the keyword result.
pub async fn classify_intent(
    query: &str,
    model: Option<&dyn ChatProvider>,
) -> IntentClassification {
    let keyword = classify_by_keywords(query);
    if keyword.confidence >= 0.6 {
        return keyword;
    }
    let Some(model) = model else {
        return keyword;
    };

    let prompt = format!(
        "Класифікуй юридичний запит. Поверни JSON \
         {{\"intent\": \"...\", \"confidence\": 0.0, \"domains\": [], \
         \"slots\": {{\"procedure_code\": null, \"court_level\": null}}}}.\n\nЗапит: {query}"
    );
    match model.generate_json(&prompt).await {
        Ok(raw) => match serde_json::from_value::<ModelIntent>(raw) {
            Ok(refined) if refined.confidence > keyword.confidence => IntentClassification {
                intent: refined.intent,
                confidence: refined.confidence.clamp(0.0, 1.0),
                domains: if refined.domains.is_empty() {
                    keyword.domains.clone()
                } else {
                    refined.domains
                },
                required_entities: keyword.required_entities.clone(),
                sections_of_interest: keyword.sections_of_interest.clone(),
                reasoning_budget: keyword.reasoning_budget,
                slots: IntentSlots {
                    procedure_code: refined
                        .slots
                        .procedure_code
                        .or(keyword.slots.procedure_code.clone()),
                    court_level: refined.slots.court_level.or(keyword.slots.court_level.clone()),
                    date_from: refined.slots.date_from,
                    date_to: refined.slots.date_to,
                    parties: refined.slots.parties,
                },
            },
            _ => keyword,
        },
        Err(e) => {
            debug!(error = %e, "intent model refinement failed, keeping keyword result");
            keyword
        }
    }
}
