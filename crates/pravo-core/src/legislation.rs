//! Legislation acts and their numbered articles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of statutory instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActType {
    Code,
    Law,
    Regulation,
}

/// A statutory act, identified by its external code (e.g. `1618-15`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegislationAct {
    /// External code on zakon.rada.gov.ua.
    pub act_id: String,
    pub act_type: ActType,
    pub title: String,
    pub short_title: Option<String>,
    pub url: String,
    pub adoption_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub last_amended: Option<NaiveDate>,
    /// Free-form status label ("чинний", "втратив чинність", ...).
    pub status: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LegislationAct {
    pub fn new(act_id: impl Into<String>, act_type: ActType, title: impl Into<String>) -> Self {
        let act_id = act_id.into();
        Self {
            url: format!("https://zakon.rada.gov.ua/laws/show/{act_id}"),
            act_id,
            act_type,
            title: title.into(),
            short_title: None,
            adoption_date: None,
            effective_date: None,
            last_amended: None,
            status: None,
            updated_at: Utc::now(),
        }
    }
}

/// A numbered article within an act.
///
/// Older versions are retained with `is_current = false`; exactly one version
/// per `(act_id, article_number)` is current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegislationArticle {
    pub id: Uuid,
    pub act_id: String,
    /// Article number as written ("625", "175-1").
    pub article_number: String,
    pub version_date: Option<NaiveDate>,
    pub section_number: Option<String>,
    pub chapter_number: Option<String>,
    pub part_number: Option<String>,
    pub paragraph_number: Option<String>,
    pub title: Option<String>,
    pub text: String,
    pub html: Option<String>,
    pub byte_size: usize,
    pub is_current: bool,
}

impl LegislationArticle {
    pub fn new(
        act_id: impl Into<String>,
        article_number: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: Uuid::new_v4(),
            act_id: act_id.into(),
            article_number: article_number.into(),
            version_date: None,
            section_number: None,
            chapter_number: None,
            part_number: None,
            paragraph_number: None,
            title: None,
            byte_size: text.len(),
            text,
            html: None,
            is_current: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A parsed free-form legislation reference, e.g. `ст. 625 ЦК`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleReference {
    /// External act code, e.g. `435-15`.
    pub act_id: String,
    /// Article number as written.
    pub article_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_act_url_from_id() {
        let act = LegislationAct::new("435-15", ActType::Code, "Цивільний кодекс України");
        assert_eq!(act.url, "https://zakon.rada.gov.ua/laws/show/435-15");
    }

    #[test]
    fn test_article_byte_size_tracks_text() {
        let art = LegislationArticle::new("435-15", "625", "Боржник не звільняється");
        assert_eq!(art.byte_size, art.text.len());
        assert!(art.is_current);
    }
}
