//! The strict answer-pack structure the synthesizer must fill.
//!
//! The synthesizer's raw JSON is parsed into these types; a missing
//! required field is a validation failure, never a silent default.

use pravo_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The headline verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortConclusion {
    pub conclusion: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub risk_or_exception: Option<String>,
}

/// One statutory norm with its quoted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormCitation {
    pub act: String,
    pub article_ref: String,
    pub quote: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Statutory grounding of the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalFramework {
    pub norms: Vec<NormCitation>,
}

/// A quote anchored to a retrieved section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchoredQuote {
    pub quote: String,
    pub source_doc_id: String,
    pub section_type: String,
}

/// A Supreme Court position with its supporting quotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupremeCourtPosition {
    pub thesis: String,
    pub quotes: Vec<AnchoredQuote>,
    #[serde(default)]
    pub context: Option<String>,
}

/// One practice example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeItem {
    pub source_doc_id: String,
    pub section_type: String,
    pub quote: String,
    pub relevance_reason: String,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Actionable checklist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// One source anchor. A packaged answer carries at least one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAnchor {
    pub document_id: String,
    pub section_type: String,
    pub quote: String,
}

/// The validated answer structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerPack {
    pub short_conclusion: ShortConclusion,
    pub legal_framework: LegalFramework,
    #[serde(default)]
    pub supreme_court_positions: Vec<SupremeCourtPosition>,
    #[serde(default)]
    pub practice: Vec<PracticeItem>,
    #[serde(default)]
    pub criteria_test: Vec<String>,
    #[serde(default)]
    pub counterarguments_and_risks: Vec<String>,
    #[serde(default)]
    pub checklist: Checklist,
    pub sources: Vec<SourceAnchor>,
}

impl AnswerPack {
    /// Parses the synthesizer's raw output. Structural problems are
    /// `PRECONDITION_FAILED`: the model failed the contract, retrying the
    /// same evidence will not help.
    pub fn from_raw(raw: Value) -> Result<Self> {
        serde_json::from_value(raw)
            .map_err(|e| Error::PreconditionFailed(format!("synthesis output malformed: {e}")))
    }
}
