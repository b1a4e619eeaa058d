//! Citation validation: every quote must be traceable to retrieved text.
//!
//! A quote survives when its whitespace-normalized, case-folded form is a
//! substring of a section (or evidence chunk) belonging to a document in
//! the evidence set. Failing quotes are stripped and reported; an answer
//! whose `sources` all fail is rejected with `PRECONDITION_FAILED`.

use crate::AnswerPack;
use pravo_core::{Error, Result};
use std::collections::HashMap;

/// Searchable text reachable from one evidence document.
#[derive(Debug, Default, Clone)]
pub struct EvidenceTexts {
    /// Document id (string form) → normalized section/chunk texts.
    texts: HashMap<String, Vec<String>>,
}

impl EvidenceTexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one text span under a document id.
    pub fn add(&mut self, document_id: impl Into<String>, text: &str) {
        self.texts
            .entry(document_id.into())
            .or_default()
            .push(normalize(text));
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn contains_quote(&self, document_id: &str, quote: &str) -> bool {
        let needle = normalize(quote);
        if needle.is_empty() {
            return false;
        }
        self.texts
            .get(document_id)
            .is_some_and(|texts| texts.iter().any(|t| t.contains(&needle)))
    }
}

/// Whitespace-normalized, case-folded form used for containment checks.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Outcome of a validation pass.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub pack: AnswerPack,
    /// Human-readable notes on every stripped quote.
    pub stripped: Vec<String>,
}

/// Validates and prunes an answer pack against the evidence set.
///
/// Never downgraded: an empty surviving `sources` array raises.
pub fn validate_citations(mut pack: AnswerPack, evidence: &EvidenceTexts) -> Result<ValidationReport> {
    let mut stripped = Vec::new();

    pack.legal_framework.norms.retain(|norm| {
        // Statutory quotes are validated against the legislation evidence
        // registered under the article reference.
        let ok = evidence.contains_quote(&norm.article_ref, &norm.quote)
            || evidence.contains_quote(&norm.act, &norm.quote);
        if !ok {
            stripped.push(format!("norm quote not grounded: {}", norm.article_ref));
        }
        ok
    });

    for position in &mut pack.supreme_court_positions {
        position.quotes.retain(|quote| {
            let ok = evidence.contains_quote(&quote.source_doc_id, &quote.quote);
            if !ok {
                stripped.push(format!(
                    "supreme court quote not grounded: {}",
                    quote.source_doc_id
                ));
            }
            ok
        });
    }
    pack.supreme_court_positions
        .retain(|position| !position.quotes.is_empty());

    pack.practice.retain(|item| {
        let ok = evidence.contains_quote(&item.source_doc_id, &item.quote);
        if !ok {
            stripped.push(format!("practice quote not grounded: {}", item.source_doc_id));
        }
        ok
    });

    pack.sources.retain(|source| {
        let ok = evidence.contains_quote(&source.document_id, &source.quote);
        if !ok {
            stripped.push(format!("source anchor not grounded: {}", source.document_id));
        }
        ok
    });

    if pack.sources.is_empty() {
        return Err(Error::PreconditionFailed(
            "answer rejected: no citation survived validation".into(),
        ));
    }

    Ok(ValidationReport { pack, stripped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AnchoredQuote, Checklist, LegalFramework, NormCitation, PracticeItem, ShortConclusion,
        SourceAnchor, SupremeCourtPosition,
    };

    fn pack_with(sources: Vec<SourceAnchor>, practice: Vec<PracticeItem>) -> AnswerPack {
        AnswerPack {
            short_conclusion: ShortConclusion {
                conclusion: "висновок".into(),
                conditions: Vec::new(),
                risk_or_exception: None,
            },
            legal_framework: LegalFramework { norms: Vec::new() },
            supreme_court_positions: Vec::new(),
            practice,
            criteria_test: Vec::new(),
            counterarguments_and_risks: Vec::new(),
            checklist: Checklist::default(),
            sources,
        }
    }

    fn anchor(doc: &str, quote: &str) -> SourceAnchor {
        SourceAnchor {
            document_id: doc.into(),
            section_type: "COURT_REASONING".into(),
            quote: quote.into(),
        }
    }

    #[test]
    fn test_normalization_tolerates_whitespace_and_case() {
        let mut evidence = EvidenceTexts::new();
        evidence.add("doc-1", "Суд дійшов  висновку про\nобґрунтованість позову.");

        let pack = pack_with(
            vec![anchor("doc-1", "суд ДІЙШОВ висновку про обґрунтованість")],
            Vec::new(),
        );
        let report = validate_citations(pack, &evidence).unwrap();
        assert_eq!(report.pack.sources.len(), 1);
        assert!(report.stripped.is_empty());
    }

    #[test]
    fn test_ungrounded_quote_is_stripped_with_warning() {
        let mut evidence = EvidenceTexts::new();
        evidence.add("doc-1", "текст рішення про стягнення боргу");

        let pack = pack_with(
            vec![
                anchor("doc-1", "стягнення боргу"),
                anchor("doc-1", "вигадана цитата якої немає"),
            ],
            vec![PracticeItem {
                source_doc_id: "doc-2".into(),
                section_type: "DECISION".into(),
                quote: "цитата з чужого документа".into(),
                relevance_reason: "схожі факти".into(),
                case_number: None,
                court: None,
                date: None,
            }],
        );

        let report = validate_citations(pack, &evidence).unwrap();
        assert_eq!(report.pack.sources.len(), 1);
        assert!(report.pack.practice.is_empty());
        assert_eq!(report.stripped.len(), 2);
    }

    #[test]
    fn test_all_sources_failing_raises() {
        let mut evidence = EvidenceTexts::new();
        evidence.add("doc-1", "текст рішення");

        let pack = pack_with(vec![anchor("doc-1", "цитати такої немає")], Vec::new());
        let err = validate_citations(pack, &evidence).unwrap_err();
        assert_eq!(err.code(), "PRECONDITION_FAILED");
    }

    #[test]
    fn test_position_without_surviving_quotes_is_dropped() {
        let mut evidence = EvidenceTexts::new();
        evidence.add("doc-1", "правова позиція щодо позовної давності");

        let mut pack = pack_with(
            vec![anchor("doc-1", "позовної давності")],
            Vec::new(),
        );
        pack.supreme_court_positions = vec![SupremeCourtPosition {
            thesis: "теза".into(),
            quotes: vec![AnchoredQuote {
                quote: "цитата не з evidence".into(),
                source_doc_id: "doc-1".into(),
                section_type: "COURT_REASONING".into(),
            }],
            context: None,
        }];

        let report = validate_citations(pack, &evidence).unwrap();
        assert!(report.pack.supreme_court_positions.is_empty());
    }
}
