//! Curated lexicons for outcome voting and risk/argument keyword hits.

/// One case's vote on how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeVote {
    Won,
    Rejected,
    Partial,
    Unknown,
}

const WON_MARKERS: &[&str] = &[
    "позов задовольнити",
    "позов задоволено",
    "задовольнити повністю",
    "вимоги задоволено",
    "скаргу задовольнити",
];

const REJECTED_MARKERS: &[&str] = &[
    "відмовити у задоволенні",
    "у задоволенні позову відмовити",
    "відмовлено повністю",
    "залишити без задоволення",
];

const PARTIAL_MARKERS: &[&str] = &["задовольнити частково", "задоволено частково", "частково задовольнити"];

/// Phrases that historically sink a claim.
pub const RISK_LEXICON: &[&str] = &[
    "пропуск позовної давності",
    "недоведеність",
    "відсутність доказів",
    "неналежний відповідач",
    "зловживання правом",
    "відсутність причинного зв'язку",
];

/// Phrases that historically carry a claim.
pub const SUCCESS_LEXICON: &[&str] = &[
    "письмові докази",
    "висновок експерта",
    "визнання боргу",
    "прострочення виконання",
    "індекс інфляції",
    "моральна шкода",
];

/// Keyword classification of one case's text.
pub fn classify_outcome(text: &str) -> OutcomeVote {
    let lower = text.to_lowercase();
    // Partial wording also contains the won markers, so it is checked first.
    if PARTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return OutcomeVote::Partial;
    }
    if REJECTED_MARKERS.iter().any(|m| lower.contains(m)) {
        return OutcomeVote::Rejected;
    }
    if WON_MARKERS.iter().any(|m| lower.contains(m)) {
        return OutcomeVote::Won;
    }
    OutcomeVote::Unknown
}

/// Deduplicated lexicon hits across a set of texts, in lexicon order.
pub fn lexicon_hits<'a>(lexicon: &[&'a str], texts: &[String]) -> Vec<&'a str> {
    lexicon
        .iter()
        .filter(|phrase| {
            texts
                .iter()
                .any(|text| text.to_lowercase().contains(&phrase.to_lowercase()))
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_beats_won() {
        assert_eq!(
            classify_outcome("суд ухвалив позов задовольнити частково"),
            OutcomeVote::Partial
        );
    }

    #[test]
    fn test_basic_votes() {
        assert_eq!(classify_outcome("ухвалив позов задовольнити"), OutcomeVote::Won);
        assert_eq!(
            classify_outcome("вирішив відмовити у задоволенні позову"),
            OutcomeVote::Rejected
        );
        assert_eq!(classify_outcome("ухвала про відкриття провадження"), OutcomeVote::Unknown);
    }

    #[test]
    fn test_lexicon_hits_dedup() {
        let texts = vec![
            "суд врахував висновок експерта".to_string(),
            "наданий висновок експерта та письмові докази".to_string(),
        ];
        let hits = lexicon_hits(SUCCESS_LEXICON, &texts);
        assert_eq!(hits, vec!["письмові докази", "висновок експерта"]);
    }
}
