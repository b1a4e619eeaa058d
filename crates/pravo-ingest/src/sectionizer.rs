//! The sectionizer: raw decision text to typed sections.
//!
//! A read-only marker catalog is scanned per section type in priority order
//! (FACTS=1 through AMOUNTS=6). Each hit opens a candidate section; the end
//! is the earliest of the next marker after a 100-character skip, a
//! paragraph break after the same skip, a 5,000-character ceiling, or the
//! end of text. Overlapping candidates lose to already-accepted ones.
//! Scanning is deterministic: the same text always yields the same set.

use pravo_core::{Error, Result, Section, SectionType, verify_section_set};
use pravo_llm::ChatProvider;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Texts shorter than this produce no sections at all.
const MIN_TEXT_LEN: usize = 100;

/// Cap on marker hits scanned per pattern, against pathological inputs.
const MAX_SCAN_HITS: usize = 1_000;

/// Characters skipped before an end marker or paragraph break may close a
/// section.
const END_SKIP_CHARS: usize = 100;

/// Hard ceiling on section length in characters.
const MAX_SECTION_CHARS: usize = 5_000;

/// Candidates below this confidence are dropped.
const MIN_CONFIDENCE: f32 = 0.5;

/// First slice of text handed to the model-assist fallback.
const ASSIST_WINDOW_CHARS: usize = 8_000;

struct MarkerCatalog {
    /// Per section type, priority-ordered marker patterns.
    markers: Vec<(SectionType, Vec<Regex>)>,
}

fn catalog() -> &'static MarkerCatalog {
    static CATALOG: OnceLock<MarkerCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("static marker pattern"))
                .collect()
        };
        MarkerCatalog {
            markers: vec![
                (
                    SectionType::Facts,
                    compile(&[
                        r"встановлено",
                        r"суд встановив",
                        r"обставини справи",
                        r"з матеріалів справи",
                    ]),
                ),
                (
                    SectionType::Claims,
                    compile(&[
                        r"позивач просить",
                        r"позовні вимоги",
                        r"звернувся з позовом",
                        r"просить суд",
                    ]),
                ),
                (
                    SectionType::LawReferences,
                    compile(&[
                        r"відповідно до стат",
                        r"відповідно до ст\.",
                        r"згідно зі ст",
                        r"на підставі ст",
                        r"керуючись стат",
                    ]),
                ),
                (
                    SectionType::CourtReasoning,
                    compile(&[
                        r"суд вважає",
                        r"суд дійшов висновку",
                        r"колегія суддів вважає",
                        r"суд зазначає",
                        r"верховний суд виходить",
                    ]),
                ),
                (
                    SectionType::Decision,
                    compile(&[r"ухвалив", r"постановив", r"вирішив"]),
                ),
                (
                    SectionType::Amounts,
                    compile(&[r"стягнути з", r"у розмірі", r"сума боргу"]),
                ),
            ],
        }
    })
}

/// Shape the model-assist fallback must return.
#[derive(Debug, Deserialize)]
struct AssistedSections {
    sections: Vec<AssistedSection>,
}

#[derive(Debug, Deserialize)]
struct AssistedSection {
    section_type: String,
    /// Character offsets into the assisted window.
    start: usize,
    end: usize,
}

/// Deterministic marker-based sectionizer with an optional model fallback.
pub struct Sectionizer {
    assist: Option<Arc<dyn ChatProvider>>,
}

impl Sectionizer {
    pub fn new() -> Self {
        Self { assist: None }
    }

    /// Enables the model-assisted fallback for texts where no marker fires.
    pub fn with_assist(mut self, assist: Arc<dyn ChatProvider>) -> Self {
        self.assist = Some(assist);
        self
    }

    /// Extracts sections. Marker scanning first; the model fallback only
    /// runs when no section survives and assistance is enabled.
    pub async fn sectionize(&self, document_id: Uuid, text: &str) -> Result<Vec<Section>> {
        if text.chars().count() < MIN_TEXT_LEN {
            return Ok(Vec::new());
        }

        let sections = self.scan(document_id, text)?;
        if !sections.is_empty() {
            return Ok(sections);
        }

        match &self.assist {
            Some(model) => self.assisted(model.as_ref(), document_id, text).await,
            None => Ok(Vec::new()),
        }
    }

    /// The deterministic marker pass.
    pub fn scan(&self, document_id: Uuid, text: &str) -> Result<Vec<Section>> {
        let all_marker_starts = collect_all_marker_starts(text);
        let mut accepted: Vec<Section> = Vec::new();

        for (section_type, patterns) in &catalog().markers {
            let mut hits: Vec<usize> = patterns
                .iter()
                .flat_map(|p| {
                    p.find_iter(text)
                        .take(MAX_SCAN_HITS)
                        .map(|m| m.start())
                        .collect::<Vec<_>>()
                })
                .collect();
            hits.sort_unstable();
            hits.dedup();

            for start in hits {
                let end = section_end(text, start, &all_marker_starts);
                if end <= start {
                    continue;
                }
                let candidate =
                    Section::new(document_id, *section_type, text, start, end, 0.0)?;
                if accepted.iter().any(|s| s.overlaps(&candidate)) {
                    continue;
                }
                let confidence = score_confidence(&candidate, patterns);
                if confidence < MIN_CONFIDENCE {
                    debug!(
                        section = %section_type,
                        start,
                        confidence,
                        "candidate below confidence floor"
                    );
                    continue;
                }
                let mut section = candidate;
                section.confidence = confidence;
                accepted.push(section);
            }
        }

        accepted.sort_by_key(|s| s.start_index);
        verify_section_set(&accepted)?;
        Ok(accepted)
    }

    async fn assisted(
        &self,
        model: &dyn ChatProvider,
        document_id: Uuid,
        text: &str,
    ) -> Result<Vec<Section>> {
        let window: String = text.chars().take(ASSIST_WINDOW_CHARS).collect();
        let prompt = format!(
            "Розбий текст судового рішення на розділи. Поверни JSON \
             {{\"sections\": [{{\"section_type\": \"FACTS|CLAIMS|LAW_REFERENCES|COURT_REASONING|DECISION|AMOUNTS\", \
             \"start\": <зміщення в символах>, \"end\": <зміщення в символах>}}]}}.\n\nТекст:\n{window}"
        );
        let raw = model.generate_json(&prompt).await?;
        let parsed: AssistedSections = serde_json::from_value(raw)
            .map_err(|e| Error::PreconditionFailed(format!("assisted sections malformed: {e}")))?;

        let char_offsets: Vec<usize> = window
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(window.len()))
            .collect();

        let mut sections = Vec::new();
        for item in parsed.sections {
            let Ok(section_type) = SectionType::parse(&item.section_type) else {
                warn!(section_type = %item.section_type, "assist returned unknown section type");
                continue;
            };
            let (Some(&start), Some(&end)) =
                (char_offsets.get(item.start), char_offsets.get(item.end))
            else {
                continue;
            };
            if start >= end {
                continue;
            }
            let Ok(section) = Section::new(document_id, section_type, text, start, end, 0.6)
            else {
                continue;
            };
            if sections.iter().any(|s: &Section| s.overlaps(&section)) {
                continue;
            }
            sections.push(section);
        }
        sections.sort_by_key(|s| s.start_index);
        verify_section_set(&sections)?;
        Ok(sections)
    }
}

impl Default for Sectionizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offsets of every marker hit of every type, sorted.
fn collect_all_marker_starts(text: &str) -> Vec<usize> {
    let mut starts: Vec<usize> = catalog()
        .markers
        .iter()
        .flat_map(|(_, patterns)| patterns.iter())
        .flat_map(|p| {
            p.find_iter(text)
                .take(MAX_SCAN_HITS)
                .map(|m| m.start())
                .collect::<Vec<_>>()
        })
        .collect();
    starts.sort_unstable();
    starts.dedup();
    starts
}

/// Byte offset `chars` characters past `from`, clamped to the text end.
fn advance_chars(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map(|(byte, _)| from + byte)
        .unwrap_or(text.len())
}

/// The earliest admissible end for a section starting at `start`.
fn section_end(text: &str, start: usize, all_marker_starts: &[usize]) -> usize {
    let skip_to = advance_chars(text, start, END_SKIP_CHARS);
    let ceiling = advance_chars(text, start, MAX_SECTION_CHARS);

    let next_marker = all_marker_starts
        .iter()
        .copied()
        .find(|&m| m >= skip_to && m > start);
    let paragraph_break = text[skip_to..].find("\n\n").map(|i| skip_to + i);

    [next_marker, paragraph_break, Some(ceiling), Some(text.len())]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len())
}

/// Base 0.7; +0.1 per additional marker of the same type inside the span;
/// −0.2 when shorter than 50 characters; −0.1 when longer than 10,000.
fn score_confidence(section: &Section, patterns: &[Regex]) -> f32 {
    let mut confidence = 0.7f32;

    let hits: usize = patterns
        .iter()
        .map(|p| p.find_iter(&section.text).take(MAX_SCAN_HITS).count())
        .sum();
    confidence += 0.1 * hits.saturating_sub(1) as f32;

    let chars = section.text.chars().count();
    if chars < 50 {
        confidence -= 0.2;
    }
    if chars > 10_000 {
        confidence -= 0.1;
    }
    confidence.clamp(0.0, 1.0)
}
