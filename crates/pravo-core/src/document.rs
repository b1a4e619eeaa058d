//! Documents: court decisions, legislation articles, uploads, ECHR rulings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The provenance class of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    CourtDecision,
    LegislationArticle,
    Uploaded,
    Echr,
}

impl DocumentType {
    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::CourtDecision => "court_decision",
            DocumentType::LegislationArticle => "legislation_article",
            DocumentType::Uploaded => "uploaded",
            DocumentType::Echr => "echr",
        }
    }

    /// Parses a wire name; unknown names fall back to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "court_decision" => Some(DocumentType::CourtDecision),
            "legislation_article" => Some(DocumentType::LegislationArticle),
            "uploaded" => Some(DocumentType::Uploaded),
            "echr" => Some(DocumentType::Echr),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ingested document.
///
/// `owner_id = None` means publicly readable; a non-null owner restricts
/// visibility to that owner. Every store query enforces this predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Internal identity.
    pub id: Uuid,
    /// Stable external identity (registry id for decisions, act/article key
    /// for legislation, upload id for uploads).
    pub external_id: String,
    /// Provenance class.
    pub doc_type: DocumentType,
    /// Human-readable title.
    pub title: String,
    /// Decision or publication date.
    pub date: Option<NaiveDate>,
    /// Court name, for decisions.
    pub court: Option<String>,
    /// Chamber within the court.
    pub chamber: Option<String>,
    /// Case number, for decisions.
    pub case_number: Option<String>,
    /// Dispute category label.
    pub dispute_category: Option<String>,
    /// Outcome label, when classified.
    pub outcome: Option<String>,
    /// Full plain text. Populated at the `fetched` readiness state.
    pub full_text: Option<String>,
    /// Full HTML as delivered by the source.
    pub full_text_html: Option<String>,
    /// Owning user; `None` = public.
    pub owner_id: Option<Uuid>,
    /// Free-form source metadata.
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document shell with the given identity.
    pub fn new(external_id: impl Into<String>, doc_type: DocumentType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            doc_type,
            title: String::new(),
            date: None,
            court: None,
            chamber: None,
            case_number: None,
            dispute_category: None,
            outcome: None,
            full_text: None,
            full_text_html: None,
            owner_id: None,
            metadata: Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the decision date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the court.
    pub fn with_court(mut self, court: impl Into<String>) -> Self {
        self.court = Some(court.into());
        self
    }

    /// Sets the chamber.
    pub fn with_chamber(mut self, chamber: impl Into<String>) -> Self {
        self.chamber = Some(chamber.into());
        self
    }

    /// Sets the case number.
    pub fn with_case_number(mut self, case_number: impl Into<String>) -> Self {
        self.case_number = Some(case_number.into());
        self
    }

    /// Sets the full text.
    pub fn with_full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = Some(text.into());
        self
    }

    /// Sets the owner, making the document private.
    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Readiness state of this document (see the ingest state machine).
    pub fn readiness(&self, section_count: usize, embedded: bool) -> Readiness {
        match (&self.full_text, section_count, embedded) {
            (None, _, _) => Readiness::Absent,
            (Some(_), 0, _) => Readiness::Fetched,
            (Some(_), _, false) => Readiness::Sectionized,
            (Some(_), _, true) => Readiness::Indexed,
        }
    }

    /// Whether ingest may skip this document: text already fetched and
    /// sections already extracted.
    pub fn is_ingest_cached(&self, section_count: usize) -> bool {
        self.full_text.as_deref().map(str::len).unwrap_or(0) > 100 && section_count > 0
    }
}

/// Document readiness along the ingest path. Each transition is idempotent;
/// queries may run against any state at `Fetched` or beyond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Absent,
    Fetched,
    Sectionized,
    Indexed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_progression() {
        let mut doc = Document::new("98765432", DocumentType::CourtDecision);
        assert_eq!(doc.readiness(0, false), Readiness::Absent);
        doc.full_text = Some("текст рішення".into());
        assert_eq!(doc.readiness(0, false), Readiness::Fetched);
        assert_eq!(doc.readiness(3, false), Readiness::Sectionized);
        assert_eq!(doc.readiness(3, true), Readiness::Indexed);
    }

    #[test]
    fn test_ingest_cached_requires_text_and_sections() {
        let mut doc = Document::new("98765432", DocumentType::CourtDecision);
        assert!(!doc.is_ingest_cached(5));
        doc.full_text = Some("x".repeat(101));
        assert!(doc.is_ingest_cached(5));
        assert!(!doc.is_ingest_cached(0));
        doc.full_text = Some("x".repeat(100));
        assert!(!doc.is_ingest_cached(5));
    }
}
