//! Scraper for the public legislation source.
//!
//! Acts are fetched from the print view at `/laws/show/<act_id>/print`.
//! Article boundaries come from a primary recognizer over the
//! `<span class="rvts9">Стаття N.</span>` anchors the print markup carries;
//! a plain-text scan handles pages that do not conform. Raw pages are kept
//! in the fetch cache so re-parsing never refetches.

use crate::{AdapterLimiter, FetchCache};
use pravo_core::{
    classify_status, retry_with_backoff, ActType, Error, LegislationAct, LegislationArticle,
    Result, RetryPolicy,
};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Scan guard for the anchor loops.
const MAX_ARTICLES: usize = 5_000;

/// Article chunking for vector search: window and overlap in characters.
const CHUNK_WINDOW: usize = 500;
const CHUNK_OVERLAP: usize = 100;

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<span[^>]*class="rvts9"[^>]*>\s*Стаття\s+(\d+(?:-\d+)?)\s*\.?"#)
            .expect("static regex")
    })
}

fn text_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*Стаття\s+(\d+(?:-\d+)?)\s*\.").expect("static regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

/// A fetched act with its parsed articles.
#[derive(Debug, Clone)]
pub struct FetchedAct {
    pub act: LegislationAct,
    pub articles: Vec<LegislationArticle>,
}

/// The legislation source adapter.
pub struct LegislationFetcher {
    base_url: String,
    client: reqwest::Client,
    limiter: AdapterLimiter,
    retry: RetryPolicy,
    cache: Option<FetchCache>,
}

impl LegislationFetcher {
    pub fn new(base_url: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            limiter: AdapterLimiter::new(min_interval),
            retry: RetryPolicy::default(),
            cache: None,
        }
    }

    /// Attaches a raw-byte cache.
    pub fn with_cache(mut self, cache: FetchCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetches and parses one act.
    pub async fn fetch(&self, act_id: &str) -> Result<FetchedAct> {
        let url = format!("{}/laws/show/{act_id}/print", self.base_url);

        let html = if let Some(cached) = match &self.cache {
            Some(cache) => cache.get(&url).await,
            None => None,
        } {
            String::from_utf8_lossy(&cached).into_owned()
        } else {
            let body = retry_with_backoff(&self.retry, "legislation_fetch", || async {
                self.limiter.acquire().await;
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| Error::Unavailable(format!("legislation request: {e}")))?;
                let status = response.status();
                if status.as_u16() == 404 {
                    return Err(Error::not_found(format!("act {act_id}")));
                }
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(classify_status(status.as_u16(), &body));
                }
                response
                    .text()
                    .await
                    .map_err(|e| Error::Unavailable(format!("legislation body: {e}")))
            })
            .await?;
            if let Some(cache) = &self.cache {
                cache.put(&url, body.as_bytes()).await?;
            }
            body
        };

        parse_print_page(act_id, &html)
    }

    /// Splits an article into overlapping windows for embedding.
    pub fn create_article_chunks(&self, article: &LegislationArticle) -> Vec<String> {
        chunk_article_text(&article.text)
    }
}

/// Parses a print-view page into an act and its articles.
pub fn parse_print_page(act_id: &str, html: &str) -> Result<FetchedAct> {
    let title = extract_title(html).unwrap_or_else(|| format!("Акт {act_id}"));
    let act_type = infer_act_type(&title);

    let mut articles = parse_articles_primary(act_id, html);
    if articles.is_empty() {
        debug!(act_id, "primary recognizer found no anchors, using text fallback");
        articles = parse_articles_fallback(act_id, html);
    }
    if articles.is_empty() {
        warn!(act_id, "no articles recognized in print page");
    }

    let mut act = LegislationAct::new(act_id, act_type, title);
    act.status = Some("чинний".to_string());
    Ok(FetchedAct { act, articles })
}

fn extract_title(html: &str) -> Option<String> {
    static TITLE_RE: OnceLock<Regex> = OnceLock::new();
    let re = TITLE_RE
        .get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"));
    re.captures(html).map(|c| {
        let raw = strip_tags(&c[1]);
        raw.split('|').next().unwrap_or(&raw).trim().to_string()
    })
}

fn infer_act_type(title: &str) -> ActType {
    let lower = title.to_lowercase();
    if lower.contains("кодекс") {
        ActType::Code
    } else if lower.contains("закон") {
        ActType::Law
    } else {
        ActType::Regulation
    }
}

fn parse_articles_primary(act_id: &str, html: &str) -> Vec<LegislationArticle> {
    let anchors: Vec<(usize, usize, String)> = anchor_re()
        .captures_iter(html)
        .take(MAX_ARTICLES)
        .map(|c| {
            let m = c.get(0).expect("whole match");
            (m.start(), m.end(), c[1].to_string())
        })
        .collect();

    let mut articles = Vec::with_capacity(anchors.len());
    for (i, (start, _, number)) in anchors.iter().enumerate() {
        let end = anchors
            .get(i + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(html.len());
        let body_html = &html[*start..end];
        let text = strip_tags(body_html);
        if text.trim().is_empty() {
            continue;
        }
        let mut article = LegislationArticle::new(act_id, number.clone(), text.trim().to_string());
        article.html = Some(body_html.to_string());
        article.title = article_title(&article.text);
        articles.push(article);
    }
    articles
}

fn parse_articles_fallback(act_id: &str, html: &str) -> Vec<LegislationArticle> {
    let text = strip_tags(html);
    let anchors: Vec<(usize, String)> = text_fallback_re()
        .captures_iter(&text)
        .take(MAX_ARTICLES)
        .map(|c| (c.get(0).expect("whole match").start(), c[1].to_string()))
        .collect();

    let mut articles = Vec::with_capacity(anchors.len());
    for (i, (start, number)) in anchors.iter().enumerate() {
        let end = anchors.get(i + 1).map(|(s, _)| *s).unwrap_or(text.len());
        let body = text[*start..end].trim();
        if body.is_empty() {
            continue;
        }
        let mut article = LegislationArticle::new(act_id, number.clone(), body.to_string());
        article.title = article_title(body);
        articles.push(article);
    }
    articles
}

/// First line after the "Стаття N." prefix, when it reads like a heading.
fn article_title(text: &str) -> Option<String> {
    let first_line = text.lines().next()?;
    let after = first_line.split_once('.').map(|(_, rest)| rest.trim())?;
    (!after.is_empty() && after.chars().count() < 120).then(|| after.to_string())
}

/// Drops markup, decodes the common entities, keeps line structure.
pub fn strip_tags(html: &str) -> String {
    let no_breaks = html
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n");
    let stripped = tag_re().replace_all(&no_breaks, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    // Collapse runs of blank lines and trailing spaces.
    let mut out = String::with_capacity(decoded.len());
    let mut blank_run = 0;
    for line in decoded.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// 500-character windows with 100-character overlap, trimmed.
pub fn chunk_article_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= CHUNK_WINDOW {
        let trimmed = text.trim();
        return if trimmed.is_empty() { Vec::new() } else { vec![trimmed.to_string()] };
    }

    let step = CHUNK_WINDOW - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + CHUNK_WINDOW).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINT_SAMPLE: &str = r#"
        <html><head><title>Цивільний кодекс України | Офіційний текст</title></head><body>
        <span class="rvts9">Стаття 625.</span> Відповідальність за порушення грошового зобов'язання.
        <p>Боржник не звільняється від відповідальності за неможливість виконання ним
        грошового зобов'язання.</p>
        <span class="rvts9">Стаття 626.</span> Поняття та види договору.
        <p>Договором є домовленість двох або більше сторін.</p>
        </body></html>
    "#;

    #[test]
    fn test_primary_recognizer() {
        let fetched = parse_print_page("435-15", PRINT_SAMPLE).unwrap();
        assert_eq!(fetched.act.title, "Цивільний кодекс України");
        assert_eq!(fetched.act.act_type, ActType::Code);
        assert_eq!(fetched.articles.len(), 2);
        assert_eq!(fetched.articles[0].article_number, "625");
        assert!(fetched.articles[0].text.contains("не звільняється"));
        assert_eq!(fetched.articles[1].article_number, "626");
    }

    #[test]
    fn test_fallback_on_nonconforming_markup() {
        let html = r#"
            <html><head><title>Закон про захист прав споживачів</title></head><body><pre>
Стаття 15. Право споживача на інформацію.
Споживач має право на одержання необхідної інформації.
Стаття 16. Відповідальність за шкоду.
Шкода відшкодовується у повному обсязі.
            </pre></body></html>
        "#;
        let fetched = parse_print_page("1023-12", html).unwrap();
        assert_eq!(fetched.act.act_type, ActType::Law);
        assert_eq!(fetched.articles.len(), 2);
        assert_eq!(fetched.articles[0].article_number, "15");
        assert!(fetched.articles[1].text.contains("повному обсязі"));
    }

    #[test]
    fn test_suffixed_article_numbers() {
        let html = r#"<span class="rvts9">Стаття 175-1.</span> Текст статті з дефісом у номері."#;
        let fetched = parse_print_page("1618-15", html).unwrap();
        assert_eq!(fetched.articles[0].article_number, "175-1");
    }

    #[test]
    fn test_strip_tags_keeps_structure() {
        let text = strip_tags("<p>Перший абзац</p><p>Другий&nbsp;абзац</p>");
        assert_eq!(text, "Перший абзац\nДругий абзац");
    }

    #[test]
    fn test_chunking_window_and_overlap() {
        let text = "ж".repeat(1200);
        let chunks = chunk_article_text(&text);
        assert!(chunks.len() >= 3);
        assert_eq!(chunks[0].chars().count(), 500);
        // Overlap: the second chunk starts 400 chars in, so 100 chars repeat.
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
    }

    #[test]
    fn test_short_article_single_chunk() {
        let chunks = chunk_article_text("коротка стаття");
        assert_eq!(chunks, vec!["коротка стаття".to_string()]);
    }
}
