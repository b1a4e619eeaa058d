//! Word-level document comparison with legal severity classification.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How much a change matters legally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSeverity {
    Critical,
    Significant,
    Minor,
}

/// What happened to a run of words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
}

/// One classified change between the documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub text: String,
    pub severity: ChangeSeverity,
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d[\d\s]*([.,]\d+)?\s*(грн|гривень|коп|₴|%)|\d+[.,]\d{2})")
            .expect("static regex")
    })
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{1,2}[./]\d{1,2}[./]\d{2,4}|\d{4}-\d{2}-\d{2}").expect("static regex")
    })
}

const LIABILITY_TERMS: &[&str] = &[
    "штраф",
    "пеня",
    "пені",
    "неустойк",
    "відповідальн",
    "розірвання",
    "припинення",
];

const RIGHTS_TERMS: &[&str] = &["право", "права", "обов'яз", "зобов'яз", "гарант"];

/// Lexical severity rules: amounts, dates, and liability terms are
/// critical; substantial rights/obligations wording is significant;
/// everything else is minor.
pub fn classify_change(text: &str) -> ChangeSeverity {
    let lower = text.to_lowercase();
    if amount_re().is_match(text)
        || date_re().is_match(text)
        || LIABILITY_TERMS.iter().any(|t| lower.contains(t))
    {
        return ChangeSeverity::Critical;
    }
    if text.chars().count() > 50 && RIGHTS_TERMS.iter().any(|t| lower.contains(t)) {
        return ChangeSeverity::Significant;
    }
    ChangeSeverity::Minor
}

enum DiffOp<'a> {
    Keep,
    Add(&'a str),
    Remove(&'a str),
}

/// Word-level diff of two documents, classified by severity. An
/// uninterrupted run of added or removed words becomes one change; a
/// matching word closes the run.
pub fn compare_documents(left: &str, right: &str) -> Vec<DocumentChange> {
    let a: Vec<&str> = left.split_whitespace().collect();
    let b: Vec<&str> = right.split_whitespace().collect();

    // Longest-common-subsequence table over words.
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            ops.push(DiffOp::Keep);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(DiffOp::Remove(a[i]));
            i += 1;
        } else {
            ops.push(DiffOp::Add(b[j]));
            j += 1;
        }
    }
    ops.extend(a[i..].iter().map(|w| DiffOp::Remove(w)));
    ops.extend(b[j..].iter().map(|w| DiffOp::Add(w)));

    let mut changes = Vec::new();
    let mut run: Option<(ChangeKind, Vec<&str>)> = None;
    let mut flush = |run: &mut Option<(ChangeKind, Vec<&str>)>, changes: &mut Vec<DocumentChange>| {
        if let Some((kind, words)) = run.take() {
            let text = words.join(" ");
            let severity = classify_change(&text);
            changes.push(DocumentChange {
                kind,
                text,
                severity,
            });
        }
    };
    for op in ops {
        let (kind, word) = match op {
            DiffOp::Keep => {
                flush(&mut run, &mut changes);
                continue;
            }
            DiffOp::Add(w) => (ChangeKind::Added, w),
            DiffOp::Remove(w) => (ChangeKind::Removed, w),
        };
        match &mut run {
            Some((run_kind, words)) if *run_kind == kind => words.push(word),
            _ => {
                flush(&mut run, &mut changes);
                run = Some((kind, vec![word]));
            }
        }
    }
    flush(&mut run, &mut changes);
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_change_is_critical() {
        assert_eq!(classify_change("50 000 грн"), ChangeSeverity::Critical);
        assert_eq!(classify_change("сума 12,50"), ChangeSeverity::Critical);
    }

    #[test]
    fn test_date_change_is_critical() {
        assert_eq!(classify_change("до 01.12.2024"), ChangeSeverity::Critical);
    }

    #[test]
    fn test_liability_term_is_critical() {
        assert_eq!(
            classify_change("пеня за прострочення"),
            ChangeSeverity::Critical
        );
    }

    #[test]
    fn test_long_rights_wording_is_significant() {
        let text = "покупець має право вимагати усунення недоліків товару протягом гарантійного періоду";
        assert!(text.chars().count() > 50);
        assert_eq!(classify_change(text), ChangeSeverity::Significant);
    }

    #[test]
    fn test_short_neutral_change_is_minor() {
        assert_eq!(classify_change("цим договором"), ChangeSeverity::Minor);
    }

    #[test]
    fn test_diff_detects_replacement() {
        let left = "строк поставки десять днів";
        let right = "строк поставки тридцять днів";
        let changes = compare_documents(left, right);
        assert!(changes
            .iter()
            .any(|c| c.kind == ChangeKind::Removed && c.text == "десять"));
        assert!(changes
            .iter()
            .any(|c| c.kind == ChangeKind::Added && c.text == "тридцять"));
    }

    #[test]
    fn test_identical_documents_have_no_changes() {
        assert!(compare_documents("той самий текст", "той самий текст").is_empty());
    }

    #[test]
    fn test_diff_classifies_penalty_insertion() {
        let left = "сторони несуть обумовлені обовязки";
        let right = "сторони несуть обумовлені обовязки і сплачують штраф";
        let changes = compare_documents(left, right);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[0].severity, ChangeSeverity::Critical);
    }
}
