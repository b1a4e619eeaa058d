//! Case-to-case citation links, precedent status, and article citation
//! scanning.

use crate::SectionType;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

fn article_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ст\.?\s*(\d+(?:-\d+)?)").expect("static regex"))
}

/// Articles cited in a text, normalized to `ст. N`, deduplicated in order
/// of first appearance. Scanning is capped against pathological inputs.
pub fn cited_articles(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for captures in article_re().captures_iter(text).take(1_000) {
        let normalized = format!("ст. {}", &captures[1]);
        if !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }
    seen
}

/// How one decision refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationType {
    Follows,
    Distinguishes,
    Overrules,
    Mentions,
}

/// A directed citation edge between two documents.
///
/// The `(from, to, citation_type)` triple is unique. Citation graphs are
/// never walked without a visited set and a depth limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationLink {
    pub from_document_id: Uuid,
    pub to_document_id: Uuid,
    pub citation_type: CitationType,
    /// Text surrounding the citation.
    pub context: Option<String>,
    /// Section type the citation was found in.
    pub found_in: Option<SectionType>,
    pub confidence: f32,
}

/// Whether a decision still stands as precedent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedentState {
    Active,
    Reversed,
    Overruled,
    Distinguished,
}

impl PrecedentState {
    pub fn as_str(self) -> &'static str {
        match self {
            PrecedentState::Active => "active",
            PrecedentState::Reversed => "reversed",
            PrecedentState::Overruled => "overruled",
            PrecedentState::Distinguished => "distinguished",
        }
    }
}

/// Precedent bookkeeping for one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedentStatus {
    pub document_id: Uuid,
    pub status: PrecedentState,
    pub reversed_by: Vec<Uuid>,
    pub overruled_by: Vec<Uuid>,
    pub distinguished_in: Vec<Uuid>,
    pub last_checked: DateTime<Utc>,
}

impl PrecedentStatus {
    /// A fresh `active` status for a document.
    pub fn active(document_id: Uuid) -> Self {
        Self {
            document_id,
            status: PrecedentState::Active,
            reversed_by: Vec::new(),
            overruled_by: Vec::new(),
            distinguished_in: Vec::new(),
            last_checked: Utc::now(),
        }
    }

    /// Recomputes `status` from the recorded citing lists. Overruling takes
    /// precedence over reversal, reversal over distinguishing.
    pub fn recompute(&mut self) {
        self.status = if !self.overruled_by.is_empty() {
            PrecedentState::Overruled
        } else if !self.reversed_by.is_empty() {
            PrecedentState::Reversed
        } else if !self.distinguished_in.is_empty() {
            PrecedentState::Distinguished
        } else {
            PrecedentState::Active
        };
        self.last_checked = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cited_articles_normalized_and_deduplicated() {
        let articles = cited_articles("посилання на ст.625, ст. 549 та ст. 625 повторно");
        assert_eq!(articles, vec!["ст. 625".to_string(), "ст. 549".to_string()]);
        assert!(cited_articles("текст без посилань").is_empty());
    }

    #[test]
    fn test_recompute_precedence() {
        let mut st = PrecedentStatus::active(Uuid::new_v4());
        st.distinguished_in.push(Uuid::new_v4());
        st.recompute();
        assert_eq!(st.status, PrecedentState::Distinguished);

        st.reversed_by.push(Uuid::new_v4());
        st.recompute();
        assert_eq!(st.status, PrecedentState::Reversed);

        st.overruled_by.push(Uuid::new_v4());
        st.recompute();
        assert_eq!(st.status, PrecedentState::Overruled);
    }
}
