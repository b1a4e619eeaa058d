//! Typed sections of a legal document.
//!
//! A section is a contiguous `[start_index, end_index)` span of the parent
//! document's text, tagged with one of six legal roles. Sections of one
//! document are non-overlapping and sorted by start index after
//! sectionization.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The legal role of a section within a court decision.
///
/// The discriminant order doubles as the claim priority: when two section
/// types would claim the same span, the lower-numbered one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    /// Established facts of the case.
    Facts,
    /// What the claimant asks for.
    Claims,
    /// Норми права: statutes the court relies on.
    LawReferences,
    /// The court's own reasoning.
    CourtReasoning,
    /// The operative part (резолютивна частина).
    Decision,
    /// Monetary amounts in dispute or awarded.
    Amounts,
}

impl SectionType {
    /// Claim priority, 1 = highest (FACTS) through 6 (AMOUNTS).
    pub fn priority(self) -> u8 {
        match self {
            SectionType::Facts => 1,
            SectionType::Claims => 2,
            SectionType::LawReferences => 3,
            SectionType::CourtReasoning => 4,
            SectionType::Decision => 5,
            SectionType::Amounts => 6,
        }
    }

    /// All section types in priority order.
    pub fn all() -> [SectionType; 6] {
        [
            SectionType::Facts,
            SectionType::Claims,
            SectionType::LawReferences,
            SectionType::CourtReasoning,
            SectionType::Decision,
            SectionType::Amounts,
        ]
    }

    /// Stable wire name (`FACTS`, `COURT_REASONING`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Facts => "FACTS",
            SectionType::Claims => "CLAIMS",
            SectionType::LawReferences => "LAW_REFERENCES",
            SectionType::CourtReasoning => "COURT_REASONING",
            SectionType::Decision => "DECISION",
            SectionType::Amounts => "AMOUNTS",
        }
    }

    /// Parses a wire name back into the enum.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "FACTS" => Ok(SectionType::Facts),
            "CLAIMS" => Ok(SectionType::Claims),
            "LAW_REFERENCES" => Ok(SectionType::LawReferences),
            "COURT_REASONING" => Ok(SectionType::CourtReasoning),
            "DECISION" => Ok(SectionType::Decision),
            "AMOUNTS" => Ok(SectionType::Amounts),
            other => Err(Error::invalid_argument(format!(
                "unknown section type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, anchored span of a document's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Internal identifier.
    pub id: Uuid,
    /// Owning document.
    pub document_id: Uuid,
    /// Legal role of this span.
    pub section_type: SectionType,
    /// The span text. Always equals `full_text[start_index..end_index]`.
    pub text: String,
    /// Byte offset of the span start in the parent text.
    pub start_index: usize,
    /// Byte offset one past the span end.
    pub end_index: usize,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Section {
    /// Creates a section over a span of `full_text`.
    pub fn new(
        document_id: Uuid,
        section_type: SectionType,
        full_text: &str,
        start_index: usize,
        end_index: usize,
        confidence: f32,
    ) -> Result<Self> {
        if start_index >= end_index || end_index > full_text.len() {
            return Err(Error::InvariantViolated(format!(
                "section span [{start_index}, {end_index}) out of bounds for text of {} bytes",
                full_text.len()
            )));
        }
        if !full_text.is_char_boundary(start_index) || !full_text.is_char_boundary(end_index) {
            return Err(Error::InvariantViolated(format!(
                "section span [{start_index}, {end_index}) splits a UTF-8 character"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            document_id,
            section_type,
            text: full_text[start_index..end_index].to_string(),
            start_index,
            end_index,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    /// Whether this section's span intersects another's.
    pub fn overlaps(&self, other: &Section) -> bool {
        self.start_index < other.end_index && other.start_index < self.end_index
    }

    /// Span length in bytes.
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    /// Whether the span is empty. Sections are never constructed empty, but
    /// callers pattern-matching on deserialized rows still check.
    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }
}

/// Verifies the pairwise non-overlap and ordering invariants over a final
/// section set. Returns `InvariantViolated` on the first violation.
pub fn verify_section_set(sections: &[Section]) -> Result<()> {
    for pair in sections.windows(2) {
        if pair[1].start_index < pair[0].start_index {
            return Err(Error::InvariantViolated(
                "sections not sorted by start_index".into(),
            ));
        }
        if pair[0].overlaps(&pair[1]) {
            return Err(Error::InvariantViolated(format!(
                "overlapping sections at [{}, {}) and [{}, {})",
                pair[0].start_index, pair[0].end_index, pair[1].start_index, pair[1].end_index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(start: usize, end: usize) -> Section {
        let text = "а".repeat(200);
        Section::new(
            Uuid::new_v4(),
            SectionType::Facts,
            &text,
            start,
            end,
            0.8,
        )
        .unwrap()
    }

    #[test]
    fn test_span_matches_text() {
        let text = "Суд встановив такі обставини справи.";
        let s = Section::new(Uuid::new_v4(), SectionType::Facts, text, 0, 7, 0.9).unwrap();
        assert_eq!(s.text, "Суд ");
        assert_eq!(s.text, &text[0..7]);
    }

    #[test]
    fn test_rejects_out_of_bounds() {
        let text = "короткий текст";
        let err = Section::new(Uuid::new_v4(), SectionType::Facts, text, 0, 500, 0.9);
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_char_split() {
        // Cyrillic chars are 2 bytes; offset 1 lands mid-character.
        let text = "правосуддя";
        let err = Section::new(Uuid::new_v4(), SectionType::Facts, text, 1, 4, 0.9);
        assert!(err.is_err());
    }

    #[test]
    fn test_overlap_detection() {
        assert!(section(0, 100).overlaps(&section(50, 150)));
        assert!(!section(0, 100).overlaps(&section(100, 150)));
    }

    #[test]
    fn test_verify_section_set() {
        let ok = vec![section(0, 100), section(100, 150), section(160, 200)];
        assert!(verify_section_set(&ok).is_ok());

        let overlapping = vec![section(0, 100), section(80, 150)];
        assert!(verify_section_set(&overlapping).is_err());

        let unsorted = vec![section(100, 150), section(0, 50)];
        assert!(verify_section_set(&unsorted).is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(SectionType::Facts.priority() < SectionType::Amounts.priority());
        let all = SectionType::all();
        for (i, t) in all.iter().enumerate() {
            assert_eq!(t.priority() as usize, i + 1);
        }
    }

    #[test]
    fn test_wire_name_round_trip() {
        for t in SectionType::all() {
            assert_eq!(SectionType::parse(t.as_str()).unwrap(), t);
        }
        assert!(SectionType::parse("PREAMBLE").is_err());
    }
}
