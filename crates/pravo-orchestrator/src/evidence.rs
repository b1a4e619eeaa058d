//! Parallel evidence collection and top-K expansion.
//!
//! All retrieval sources run concurrently under a per-source latency cap.
//! A failing source degrades the answer, it never sinks it: the failure is
//! recorded as a warning and the survivors proceed. Results are
//! deduplicated by document id with the highest-score occurrence winning.

use crate::{EvidenceTexts, IntentClassification, ToolContext};
use chrono::NaiveDate;
use futures::future;
use pravo_core::{Result, SectionType};
use pravo_legislation::{format_reference, parse_reference, RelevantChunk};
use pravo_patterns::PatternMatch;
use pravo_store::VectorFilter;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// One deduplicated piece of case evidence.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceItem {
    pub document_id: Uuid,
    pub score: f32,
    pub section_type: SectionType,
    pub text: String,
    pub case_number: Option<String>,
    pub court: Option<String>,
    pub date: Option<NaiveDate>,
    /// Which source produced the winning occurrence.
    pub provenance: &'static str,
}

/// Everything the synthesizer may cite.
#[derive(Debug, Default, Serialize)]
pub struct EvidenceSet {
    pub chunks: Vec<EvidenceItem>,
    pub legislation: Vec<RelevantChunk>,
    pub patterns: Vec<PatternMatch>,
    pub warnings: Vec<String>,
}

/// A fully expanded precedent.
#[derive(Debug, Clone, Serialize)]
pub struct ExpandedCase {
    pub document_id: Uuid,
    pub case_number: Option<String>,
    pub court: Option<String>,
    pub date: Option<NaiveDate>,
    pub sections: Vec<(SectionType, String)>,
}

async fn capped<T>(
    cap: Duration,
    source: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> std::result::Result<T, String> {
    match tokio::time::timeout(cap, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{source}: {e}")),
        Err(_) => Err(format!("{source}: timed out after {}ms", cap.as_millis())),
    }
}

/// Builds the vector filter out of the retrieval plan.
pub fn plan_vector_filter(intent: &IntentClassification) -> VectorFilter {
    let mut filter = VectorFilter::new().eq("document_type", "court_decision");
    filter = filter.any_of(
        "section_type",
        intent
            .sections_of_interest
            .iter()
            .map(|s| s.as_str().to_string()),
    );
    let parse = |s: &Option<String>| {
        s.as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    };
    filter.date_between(parse(&intent.slots.date_from), parse(&intent.slots.date_to))
}

/// Issues every planned query concurrently and merges the results.
pub async fn collect_evidence(
    ctx: &ToolContext,
    intent: &IntentClassification,
    query: &str,
) -> EvidenceSet {
    let cap = ctx.evidence_timeout;
    let filter = plan_vector_filter(intent);

    let vector_fut = capped(cap, "vector_search", async {
        let embedding = ctx.embed_cached(query).await?;
        ctx.vectors.search(&embedding, &filter, 20).await
    });
    let keyword_fut = capped(cap, "keyword_search", async {
        ctx.meta.full_text_search(query, ctx.viewer, 20).await
    });
    let legislation_fut = capped(cap, "legislation", async {
        ctx.legislation.find_relevant(query, None, 5).await
    });
    let reference_fut = capped(cap, "reference_lookup", async {
        match parse_reference(query) {
            Some(reference) => ctx
                .legislation
                .get_article(&reference.act_id, &reference.article_number)
                .await
                .map(|article| {
                    Some(RelevantChunk {
                        reference,
                        text: article.text,
                        score: 1.0,
                    })
                }),
            None => Ok(None),
        }
    });
    let pattern_fut = capped(cap, "pattern_match", async {
        let embedding = ctx.embed_cached(query).await?;
        ctx.patterns.match_patterns(&embedding, &intent.intent).await
    });

    let (vector, keyword, legislation, reference, patterns) = future::join5(
        vector_fut,
        keyword_fut,
        legislation_fut,
        reference_fut,
        pattern_fut,
    )
    .await;

    let mut set = EvidenceSet::default();
    let mut best: HashMap<Uuid, EvidenceItem> = HashMap::new();

    match vector {
        Ok(hits) => {
            for hit in hits {
                let item = EvidenceItem {
                    document_id: hit.payload.doc_id,
                    score: hit.score,
                    section_type: hit.payload.section_type,
                    text: hit.payload.text,
                    case_number: hit.payload.case_number,
                    court: hit.payload.court,
                    date: hit.payload.date,
                    provenance: "vector",
                };
                merge_best(&mut best, item);
            }
        }
        Err(warning) => set.warnings.push(warning),
    }

    match keyword {
        Ok(documents) => {
            for doc in documents {
                let Some(text) = doc.full_text else { continue };
                let excerpt: String = text.chars().take(600).collect();
                let item = EvidenceItem {
                    document_id: doc.id,
                    // Keyword hits rank below any vector hit of the same
                    // document unless nothing else found it.
                    score: 0.0,
                    section_type: SectionType::CourtReasoning,
                    text: excerpt,
                    case_number: doc.case_number,
                    court: doc.court,
                    date: doc.date,
                    provenance: "keyword",
                };
                merge_best(&mut best, item);
            }
        }
        Err(warning) => set.warnings.push(warning),
    }

    match legislation {
        Ok(chunks) => set.legislation.extend(chunks),
        Err(warning) => set.warnings.push(warning),
    }
    match reference {
        Ok(Some(chunk)) => set.legislation.push(chunk),
        Ok(None) => {}
        Err(warning) => set.warnings.push(warning),
    }
    match patterns {
        Ok(matches) => set.patterns = matches,
        Err(warning) => set.warnings.push(warning),
    }

    set.chunks = best.into_values().collect();
    set.chunks
        .sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!(
        chunks = set.chunks.len(),
        legislation = set.legislation.len(),
        patterns = set.patterns.len(),
        warnings = set.warnings.len(),
        "evidence collected"
    );
    set
}

fn merge_best(best: &mut HashMap<Uuid, EvidenceItem>, item: EvidenceItem) {
    match best.get(&item.document_id) {
        Some(existing) if existing.score >= item.score => {}
        _ => {
            best.insert(item.document_id, item);
        }
    }
}

/// Loads full sections for the top-K evidence documents, keeping the
/// reasoning and operative parts up to `depth_chars` each. Documents that
/// are not yet sectionized contribute their evidence chunk only.
pub async fn expand_top_cases(
    ctx: &ToolContext,
    evidence: &EvidenceSet,
    top_k: usize,
    depth_chars: usize,
) -> (Vec<ExpandedCase>, Vec<String>) {
    let mut expanded = Vec::new();
    let mut warnings = Vec::new();

    for item in evidence.chunks.iter().take(top_k) {
        match load_expandable_sections(ctx, item.document_id, &mut warnings).await {
            Ok(sections) => {
                let kept: Vec<(SectionType, String)> = sections
                    .into_iter()
                    .filter(|s| {
                        matches!(
                            s.section_type,
                            SectionType::CourtReasoning | SectionType::Decision
                        )
                    })
                    .map(|s| {
                        let text: String = s.text.chars().take(depth_chars).collect();
                        (s.section_type, text)
                    })
                    .collect();
                expanded.push(ExpandedCase {
                    document_id: item.document_id,
                    case_number: item.case_number.clone(),
                    court: item.court.clone(),
                    date: item.date,
                    sections: if kept.is_empty() {
                        vec![(item.section_type, item.text.clone())]
                    } else {
                        kept
                    },
                });
            }
            Err(e) => warnings.push(format!("expansion of {}: {e}", item.document_id)),
        }
    }
    (expanded, warnings)
}

/// Sections for one document; a document that is known but not yet
/// sectionized triggers its own (rate-limited) ingest first.
async fn load_expandable_sections(
    ctx: &ToolContext,
    document_id: Uuid,
    warnings: &mut Vec<String>,
) -> Result<Vec<pravo_core::Section>> {
    let sections = ctx.meta.sections_for(document_id).await?;
    if !sections.is_empty() {
        return Ok(sections);
    }
    let Some(doc) = ctx.meta.document_by_id(document_id, ctx.viewer).await? else {
        return Ok(sections);
    };
    if let Err(e) = ctx.ingest.ingest_document(&doc.external_id).await {
        warnings.push(format!("expansion ingest of {}: {e}", doc.external_id));
        return Ok(Vec::new());
    }
    ctx.meta.sections_for(document_id).await
}

/// Registers everything citable under its anchor key.
pub fn evidence_texts(evidence: &EvidenceSet, expanded: &[ExpandedCase]) -> EvidenceTexts {
    let mut texts = EvidenceTexts::new();
    for item in &evidence.chunks {
        texts.add(item.document_id.to_string(), &item.text);
    }
    for case in expanded {
        for (_, text) in &case.sections {
            texts.add(case.document_id.to_string(), text);
        }
    }
    for chunk in &evidence.legislation {
        let key = format_reference(&chunk.reference);
        texts.add(key, &chunk.text);
    }
    texts
}
