//! Free-form legislation reference resolution.
//!
//! Accepted shapes: `ст. 625 ЦК`, `ЦПК ст. 175`, `1618-15 ст. 354`. The
//! code table is small and fixed; anything it cannot resolve is `None`, not
//! a guess.

use pravo_core::ArticleReference;
use regex::Regex;
use std::sync::OnceLock;

/// Procedural and substantive codes the resolver knows.
const CODE_TABLE: &[(&str, &str, &str)] = &[
    ("ЦПК", "1618-15", "Цивільний процесуальний кодекс України"),
    ("ГПК", "1798-12", "Господарський процесуальний кодекс України"),
    ("КАС", "2747-15", "Кодекс адміністративного судочинства України"),
    ("КПК", "4651-17", "Кримінальний процесуальний кодекс України"),
    ("ЦК", "435-15", "Цивільний кодекс України"),
    ("ГК", "436-15", "Господарський кодекс України"),
    ("ПКУ", "2755-17", "Податковий кодекс України"),
];

fn act_id_for_alias(alias: &str) -> Option<&'static str> {
    let upper = alias.to_uppercase();
    CODE_TABLE
        .iter()
        .find(|(code, _, _)| *code == upper)
        .map(|(_, act_id, _)| *act_id)
}

/// Known alias for an act id, when there is one.
pub fn alias_for_act(act_id: &str) -> Option<&'static str> {
    CODE_TABLE
        .iter()
        .find(|(_, id, _)| *id == act_id)
        .map(|(code, _, _)| *code)
}

/// Full title for an act id from the code table.
pub fn title_for_act(act_id: &str) -> Option<&'static str> {
    CODE_TABLE
        .iter()
        .find(|(_, id, _)| *id == act_id)
        .map(|(_, _, title)| *title)
}

fn article_then_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)ст\.?\s*(\d+(?:-\d+)?)\s+([А-ЯІЇЄҐа-яіїєґ]{2,4}|\d{3,4}-\d{2})")
            .expect("static regex")
    })
}

fn code_then_article_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([А-ЯІЇЄҐа-яіїєґ]{2,4}|\d{3,4}-\d{2})\s+ст\.?\s*(\d+(?:-\d+)?)")
            .expect("static regex")
    })
}

/// Resolves a bare act token: a known alias (`ЦК`) or a raw external id
/// (`435-15`).
pub fn resolve_act(token: &str) -> Option<String> {
    resolve_code_token(token.trim())
}

fn resolve_code_token(token: &str) -> Option<String> {
    if let Some(act_id) = act_id_for_alias(token) {
        return Some(act_id.to_string());
    }
    // A raw external id like `1618-15` passes through as-is.
    let looks_like_act_id = token.len() >= 6
        && token.chars().all(|c| c.is_ascii_digit() || c == '-')
        && token.contains('-');
    looks_like_act_id.then(|| token.to_string())
}

/// Resolves a phrase to `(act_id, article_number)`, or `None`.
pub fn parse_reference(phrase: &str) -> Option<ArticleReference> {
    if let Some(captures) = article_then_code_re().captures(phrase) {
        if let Some(act_id) = resolve_code_token(&captures[2]) {
            return Some(ArticleReference {
                act_id,
                article_number: captures[1].to_string(),
            });
        }
    }
    if let Some(captures) = code_then_article_re().captures(phrase) {
        if let Some(act_id) = resolve_code_token(&captures[1]) {
            return Some(ArticleReference {
                act_id,
                article_number: captures[2].to_string(),
            });
        }
    }
    None
}

/// Canonical rendering of a reference; `parse_reference` accepts every
/// string this produces.
pub fn format_reference(reference: &ArticleReference) -> String {
    match alias_for_act(&reference.act_id) {
        Some(alias) => format!("ст. {} {}", reference.article_number, alias),
        None => format!("ст. {} {}", reference.article_number, reference.act_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(act_id: &str, article: &str) -> ArticleReference {
        ArticleReference {
            act_id: act_id.to_string(),
            article_number: article.to_string(),
        }
    }

    #[test]
    fn test_article_then_code() {
        assert_eq!(parse_reference("ст. 625 ЦК"), Some(reference("435-15", "625")));
        assert_eq!(parse_reference("ст.130 ЦПК"), Some(reference("1618-15", "130")));
    }

    #[test]
    fn test_code_then_article() {
        assert_eq!(parse_reference("ЦПК ст. 175"), Some(reference("1618-15", "175")));
        assert_eq!(parse_reference("КАС ст. 122"), Some(reference("2747-15", "122")));
    }

    #[test]
    fn test_raw_act_id() {
        assert_eq!(
            parse_reference("1618-15 ст. 354"),
            Some(reference("1618-15", "354"))
        );
    }

    #[test]
    fn test_suffixed_article_number() {
        assert_eq!(
            parse_reference("ст. 175-1 ЦПК"),
            Some(reference("1618-15", "175-1"))
        );
    }

    #[test]
    fn test_embedded_in_prose() {
        let parsed = parse_reference(
            "Позивач посилається на ст. 625 ЦК щодо інфляційних втрат",
        );
        assert_eq!(parsed, Some(reference("435-15", "625")));
    }

    #[test]
    fn test_unresolvable_is_none() {
        assert_eq!(parse_reference("ст. 5 ЖК"), None);
        assert_eq!(parse_reference("стаття без номера"), None);
        assert_eq!(parse_reference(""), None);
    }

    #[test]
    fn test_format_parse_round_trip() {
        let cases = [
            reference("435-15", "625"),
            reference("1618-15", "175-1"),
            reference("2755-17", "14"),
            reference("9999-99", "1"),
        ];
        for case in cases {
            assert_eq!(parse_reference(&format_reference(&case)), Some(case));
        }
    }

    #[test]
    fn test_case_insensitive_alias() {
        assert_eq!(parse_reference("ст. 625 цк"), Some(reference("435-15", "625")));
    }
}
