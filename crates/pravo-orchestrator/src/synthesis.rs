//! Structured synthesis: one model call, strict output, grounded quotes.

use crate::{
    collect_evidence, evidence_texts, expand_top_cases, validate_citations, AnswerPack,
    EvidenceSet, ExpandedCase, IntentClassification, ToolContext, classify_intent,
};
use pravo_core::{Budget, Result};
use pravo_legislation::format_reference;
use pravo_llm::{estimate_tokens, select_strategy};
use serde::Serialize;
use tracing::info;

/// Expansion depth in characters per kept section, by budget.
fn depth_for(budget: Budget) -> usize {
    match budget {
        Budget::Quick => 2_000,
        Budget::Standard => 4_000,
        Budget::Deep => 8_000,
    }
}

/// The tool result of `get_legal_advice`.
#[derive(Debug, Serialize)]
pub struct AdvicePayload {
    pub intent: IntentClassification,
    /// Raw evidence the answer was synthesized from.
    pub precedent_chunks: EvidenceSet,
    pub packaged_answer: AnswerPack,
    pub warnings: Vec<String>,
}

/// Builds the single synthesis prompt: intent, quoted legislation, quoted
/// precedent excerpts, and the user's question.
pub fn build_synthesis_prompt(
    query: &str,
    intent: &IntentClassification,
    evidence: &EvidenceSet,
    expanded: &[ExpandedCase],
) -> String {
    let mut prompt = String::with_capacity(8_192);
    prompt.push_str(
        "Ти юридичний асистент з українського права. Використовуй ВИКЛЮЧНО наведені джерела; \
         кожна цитата має бути дослівним фрагментом джерела. Поверни JSON зі структурою: \
         {\"short_conclusion\": {\"conclusion\", \"conditions\", \"risk_or_exception\"}, \
         \"legal_framework\": {\"norms\": [{\"act\", \"article_ref\", \"quote\", \"comment\"}]}, \
         \"supreme_court_positions\": [{\"thesis\", \"quotes\": [{\"quote\", \"source_doc_id\", \"section_type\"}], \"context\"}], \
         \"practice\": [{\"source_doc_id\", \"section_type\", \"quote\", \"relevance_reason\", \"case_number\", \"court\", \"date\"}], \
         \"criteria_test\": [], \"counterarguments_and_risks\": [], \
         \"checklist\": {\"steps\": [], \"evidence\": []}, \
         \"sources\": [{\"document_id\", \"section_type\", \"quote\"}]}.\n\n",
    );

    prompt.push_str(&format!(
        "Намір запиту: {} (впевненість {:.2})\n\n",
        intent.intent, intent.confidence
    ));

    if !evidence.legislation.is_empty() {
        prompt.push_str("Законодавство:\n");
        for chunk in &evidence.legislation {
            prompt.push_str(&format!(
                "[{}]\n{}\n\n",
                format_reference(&chunk.reference),
                chunk.text
            ));
        }
    }

    if !expanded.is_empty() {
        prompt.push_str("Судова практика:\n");
        for case in expanded {
            let header = format!(
                "[document_id: {} | справа: {} | суд: {}]\n",
                case.document_id,
                case.case_number.as_deref().unwrap_or("—"),
                case.court.as_deref().unwrap_or("—"),
            );
            prompt.push_str(&header);
            for (section_type, text) in &case.sections {
                prompt.push_str(&format!("({section_type}) {text}\n"));
            }
            prompt.push('\n');
        }
    }

    if !evidence.patterns.is_empty() {
        prompt.push_str("Узагальнені патерни практики:\n");
        for matched in &evidence.patterns {
            prompt.push_str(&format!(
                "- {} ({}, частота {})\n",
                matched.pattern.intent,
                matched.pattern.decision_outcome.as_str(),
                matched.pattern.frequency
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Питання користувача: {query}\n"));
    prompt
}

/// The canonical end-to-end answering path.
pub async fn get_legal_advice(
    ctx: &ToolContext,
    query: &str,
    budget: Budget,
) -> Result<AdvicePayload> {
    // 1. Intent.
    let quick_model = ctx.providers.chat(&select_strategy(Budget::Quick));
    let intent = classify_intent(query, Some(quick_model.as_ref())).await;

    // 2–3. Plan and parallel evidence collection.
    let mut evidence = collect_evidence(ctx, &intent, query).await;

    // 4. Expansion of the top cases.
    let (expanded, expansion_warnings) =
        expand_top_cases(ctx, &evidence, ctx.expansion_top_k, depth_for(budget)).await;
    evidence.warnings.extend(expansion_warnings);

    // 5. Synthesis.
    let prompt = build_synthesis_prompt(query, &intent, &evidence, &expanded);
    let strategy = select_strategy(budget);
    let chat = ctx.providers.chat(&strategy);
    let raw = chat.generate_json(&prompt).await?;
    ctx.meter.record(
        &strategy.model,
        estimate_tokens(&prompt),
        estimate_tokens(&raw.to_string()),
    );

    // 6. Citation validation. Never downgraded.
    let texts = evidence_texts(&evidence, &expanded);
    let report = validate_citations(AnswerPack::from_raw(raw)?, &texts)?;

    let mut warnings = std::mem::take(&mut evidence.warnings);
    warnings.extend(report.stripped);

    info!(
        intent = %intent.intent,
        chunks = evidence.chunks.len(),
        sources = report.pack.sources.len(),
        warnings = warnings.len(),
        "legal advice packaged"
    );

    // 7. Packaging.
    Ok(AdvicePayload {
        intent,
        precedent_chunks: evidence,
        packaged_answer: report.pack,
        warnings,
    })
}
