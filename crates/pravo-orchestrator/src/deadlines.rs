//! Procedural deadline table and date arithmetic.
//!
//! The static table is keyed by `(procedure_code, appeal_type, event_type)`
//! and carries the day count plus the governing norm. The tool layer
//! augments the computed variants with recent Supreme Court practice.

use chrono::{Days, NaiveDate};
use pravo_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// One row of the deadline table.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineRule {
    pub procedure_code: &'static str,
    pub appeal_type: &'static str,
    pub event_type: &'static str,
    pub days: u64,
    pub act_title: &'static str,
    pub article: &'static str,
}

/// `(procedure_code, appeal_type, event_type)` → days and norm.
pub const DEADLINE_TABLE: &[DeadlineRule] = &[
    DeadlineRule {
        procedure_code: "cpc",
        appeal_type: "appeal",
        event_type: "decision",
        days: 30,
        act_title: "Цивільний процесуальний кодекс України",
        article: "ст. 354",
    },
    DeadlineRule {
        procedure_code: "cpc",
        appeal_type: "appeal",
        event_type: "ruling",
        days: 15,
        act_title: "Цивільний процесуальний кодекс України",
        article: "ст. 354",
    },
    DeadlineRule {
        procedure_code: "cpc",
        appeal_type: "cassation",
        event_type: "decision",
        days: 30,
        act_title: "Цивільний процесуальний кодекс України",
        article: "ст. 390",
    },
    DeadlineRule {
        procedure_code: "gpc",
        appeal_type: "appeal",
        event_type: "decision",
        days: 20,
        act_title: "Господарський процесуальний кодекс України",
        article: "ст. 256",
    },
    DeadlineRule {
        procedure_code: "gpc",
        appeal_type: "appeal",
        event_type: "ruling",
        days: 10,
        act_title: "Господарський процесуальний кодекс України",
        article: "ст. 256",
    },
    DeadlineRule {
        procedure_code: "gpc",
        appeal_type: "cassation",
        event_type: "decision",
        days: 20,
        act_title: "Господарський процесуальний кодекс України",
        article: "ст. 288",
    },
    DeadlineRule {
        procedure_code: "cas",
        appeal_type: "appeal",
        event_type: "decision",
        days: 30,
        act_title: "Кодекс адміністративного судочинства України",
        article: "ст. 295",
    },
    DeadlineRule {
        procedure_code: "cas",
        appeal_type: "cassation",
        event_type: "decision",
        days: 30,
        act_title: "Кодекс адміністративного судочинства України",
        article: "ст. 329",
    },
];

/// One computed deadline window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineVariant {
    /// Which counting rule produced this window.
    pub rule: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// The computed deadline with its governing norm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineComputation {
    pub days: u64,
    pub variants: Vec<DeadlineVariant>,
    pub norms: DeadlineNorm,
    pub renewal_criteria: Vec<String>,
    pub risks: Vec<String>,
}

/// The governing norm of a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineNorm {
    pub act: String,
    pub article: String,
}

fn lookup(procedure_code: &str, appeal_type: &str, event_type: &str) -> Option<&'static DeadlineRule> {
    DEADLINE_TABLE.iter().find(|rule| {
        rule.procedure_code == procedure_code
            && rule.appeal_type == appeal_type
            && rule.event_type == event_type
    })
}

/// Computes the deadline windows for an event.
///
/// `receipt_date` is the date the full text was served on a party absent at
/// pronouncement; when present, a second window counted from it is emitted
/// alongside the base one.
pub fn compute_deadline(
    procedure_code: &str,
    appeal_type: &str,
    event_type: &str,
    event_date: NaiveDate,
    receipt_date: Option<NaiveDate>,
) -> Result<DeadlineComputation> {
    let rule = lookup(procedure_code, appeal_type, event_type).ok_or_else(|| {
        Error::invalid_argument(format!(
            "no deadline rule for ({procedure_code}, {appeal_type}, {event_type})"
        ))
    })?;

    let window = |start: NaiveDate, name: &str| -> Result<DeadlineVariant> {
        let end = start
            .checked_add_days(Days::new(rule.days))
            .ok_or_else(|| Error::invalid_argument(format!("{name} out of range")))?;
        Ok(DeadlineVariant {
            rule: name.to_string(),
            start_date: start,
            end_date: end,
        })
    };

    let mut variants = vec![window(event_date, "from_event_date")?];
    if let Some(receipt) = receipt_date {
        if receipt < event_date {
            return Err(Error::invalid_argument(
                "receipt_date precedes event_date".to_string(),
            ));
        }
        variants.push(window(receipt, "from_receipt_date")?);
    }

    Ok(DeadlineComputation {
        days: rule.days,
        variants,
        norms: DeadlineNorm {
            act: rule.act_title.to_string(),
            article: rule.article.to_string(),
        },
        renewal_criteria: vec![
            "поважність причин пропуску строку".to_string(),
            "клопотання про поновлення строку разом зі скаргою".to_string(),
        ],
        risks: vec![
            "повернення скарги без розгляду в разі пропуску строку".to_string(),
            "відмова у поновленні строку без доведених поважних причин".to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cpc_appeal_decision_thirty_days() {
        let result =
            compute_deadline("cpc", "appeal", "decision", date(2024, 1, 15), None).unwrap();
        assert_eq!(result.days, 30);
        assert_eq!(result.variants.len(), 1);
        assert_eq!(result.variants[0].rule, "from_event_date");
        assert_eq!(result.variants[0].start_date, date(2024, 1, 15));
        assert_eq!(result.variants[0].end_date, date(2024, 2, 14));
        assert_eq!(result.norms.act, "Цивільний процесуальний кодекс України");
    }

    #[test]
    fn test_receipt_date_yields_diverging_window() {
        let result = compute_deadline(
            "cpc",
            "appeal",
            "decision",
            date(2024, 1, 15),
            Some(date(2024, 1, 22)),
        )
        .unwrap();
        assert_eq!(result.variants.len(), 2);
        assert_eq!(result.variants[1].rule, "from_receipt_date");
        assert_eq!(result.variants[1].start_date, date(2024, 1, 22));
        assert_eq!(result.variants[1].end_date, date(2024, 2, 21));
        assert_ne!(result.variants[0].end_date, result.variants[1].end_date);
    }

    #[test]
    fn test_receipt_before_event_is_invalid() {
        let err = compute_deadline(
            "cpc",
            "appeal",
            "decision",
            date(2024, 1, 15),
            Some(date(2024, 1, 10)),
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_gpc_appeal_is_twenty_days() {
        let result =
            compute_deadline("gpc", "appeal", "decision", date(2024, 3, 1), None).unwrap();
        assert_eq!(result.days, 20);
        assert_eq!(result.variants[0].end_date, date(2024, 3, 21));
    }

    #[test]
    fn test_ruling_has_shorter_window() {
        let decision =
            compute_deadline("cpc", "appeal", "decision", date(2024, 1, 1), None).unwrap();
        let ruling = compute_deadline("cpc", "appeal", "ruling", date(2024, 1, 1), None).unwrap();
        assert!(ruling.days < decision.days);
    }

    #[test]
    fn test_unknown_combination_is_invalid_argument() {
        let err =
            compute_deadline("cpc", "appeal", "verdict", date(2024, 1, 1), None).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_leap_day_arithmetic() {
        let result =
            compute_deadline("cpc", "appeal", "decision", date(2024, 2, 1), None).unwrap();
        // 2024 is a leap year: 1 Feb + 30 days = 2 Mar.
        assert_eq!(result.variants[0].end_date, date(2024, 3, 2));
    }
}
