//! Client for the court-decisions search API.
//!
//! Wire shape: `GET /v1/search` with `meta.search`, `where[field][op]` /
//! `where[field][value]` predicate pairs, `date_from` / `date_to`, `target`,
//! `order[field]`, `limit`, `page`, `select`; `GET /v1/document/by/number/{id}`
//! for full text. Authentication is an app token in `X-App-Token`. Calls go
//! through the adapter's token bucket (≥200 ms between requests by default).

use crate::AdapterLimiter;
use chrono::NaiveDate;
use pravo_core::{classify_status, retry_with_backoff, Document, DocumentType, Error, Result, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Comparison operator on a `where` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOp {
    Eq,
    In,
    Between,
    Lte,
    Gte,
}

impl WhereOp {
    fn as_str(self) -> &'static str {
        match self {
            WhereOp::Eq => "=",
            WhereOp::In => "in",
            WhereOp::Between => "between",
            WhereOp::Lte => "<=",
            WhereOp::Gte => ">=",
        }
    }
}

/// One `where[field][op]` / `where[field][value]` pair.
#[derive(Debug, Clone)]
pub struct WherePredicate {
    pub field: String,
    pub op: WhereOp,
    pub value: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Search request composition.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Full-text term (`meta.search`).
    pub meta_search: Option<String>,
    pub predicates: Vec<WherePredicate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub target: Option<String>,
    pub order_by: Option<(String, Order)>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub select: Option<String>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, term: impl Into<String>) -> Self {
        self.meta_search = Some(term.into());
        self
    }

    pub fn with_where(mut self, field: impl Into<String>, op: WhereOp, value: impl Into<String>) -> Self {
        self.predicates.push(WherePredicate {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn with_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn with_order(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Flattens the composition into wire query pairs.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(term) = &self.meta_search {
            query.push(("meta.search".to_string(), term.clone()));
        }
        for p in &self.predicates {
            query.push((format!("where[{}][op]", p.field), p.op.as_str().to_string()));
            query.push((format!("where[{}][value]", p.field), p.value.clone()));
        }
        if let Some(from) = self.date_from {
            query.push(("date_from".to_string(), from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.date_to {
            query.push(("date_to".to_string(), to.format("%Y-%m-%d").to_string()));
        }
        if let Some(target) = &self.target {
            query.push(("target".to_string(), target.clone()));
        }
        if let Some((field, order)) = &self.order_by {
            let dir = match order {
                Order::Asc => "asc",
                Order::Desc => "desc",
            };
            query.push((format!("order[{field}]"), dir.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(select) = &self.select {
            query.push(("select".to_string(), select.clone()));
        }
        query
    }
}

/// One decision row as delivered by the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDecision {
    #[serde(alias = "doc_id")]
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "adjudication_date")]
    pub date: Option<String>,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub chamber: Option<String>,
    #[serde(default, alias = "cause_num")]
    pub case_number: Option<String>,
    #[serde(default)]
    pub dispute_category: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
}

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default, alias = "data")]
    pub items: Vec<RawDecision>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u64>,
}

/// Full text of one decision.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionText {
    #[serde(default, alias = "doc_text")]
    pub text: String,
    #[serde(default, alias = "doc_html")]
    pub html: Option<String>,
    #[serde(default, alias = "cause_num")]
    pub case_number: Option<String>,
}

/// The court-decisions search adapter.
pub struct CourtClient {
    base_url: String,
    app_token: String,
    client: reqwest::Client,
    limiter: AdapterLimiter,
    retry: RetryPolicy,
}

impl CourtClient {
    pub fn new(base_url: impl Into<String>, app_token: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            app_token: app_token.into(),
            client: reqwest::Client::new(),
            limiter: AdapterLimiter::new(min_interval),
            retry: RetryPolicy::default(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        retry_with_backoff(&self.retry, path, || async {
            self.limiter.acquire().await;
            let response = self
                .client
                .get(format!("{}{}", self.base_url, path))
                .header("X-App-Token", &self.app_token)
                .query(query)
                .send()
                .await
                .map_err(|e| Error::Unavailable(format!("court api request: {e}")))?;

            let status = response.status();
            if status.as_u16() == 404 {
                return Err(Error::not_found(format!("court api: {path}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_status(status.as_u16(), &body));
            }
            response
                .json::<T>()
                .await
                .map_err(|e| Error::Unavailable(format!("court api decode: {e}")))
        })
        .await
    }

    /// Filtered search over decisions.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchPage> {
        let page: SearchPage = self.get_json("/v1/search", &params.to_query()).await?;
        debug!(
            items = page.items.len(),
            total = page.total,
            "court search page"
        );
        Ok(page)
    }

    /// Facet metadata for a search.
    pub async fn search_meta(&self, params: &SearchParams) -> Result<Value> {
        self.get_json("/v1/search/meta", &params.to_query()).await
    }

    /// Full text of one decision by its registry number.
    pub async fn get_full_text(&self, doc_id: &str) -> Result<DecisionText> {
        self.get_json(&format!("/v1/document/by/number/{doc_id}"), &[])
            .await
    }

    /// Normalizes a result page into document shells.
    pub fn normalize(&self, page: &SearchPage) -> Vec<Document> {
        page.items.iter().map(normalize_decision).collect()
    }
}

fn normalize_decision(raw: &RawDecision) -> Document {
    let external_id = match &raw.id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    let mut doc = Document::new(external_id, DocumentType::CourtDecision);
    if let Some(title) = &raw.title {
        doc.title = title.clone();
    }
    doc.date = raw
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.get(..10).unwrap_or(d), "%Y-%m-%d").ok());
    doc.court = raw.court.clone();
    doc.chamber = raw.chamber.clone();
    doc.case_number = raw.case_number.clone();
    doc.dispute_category = raw.dispute_category.clone();
    doc.outcome = raw.outcome.clone();
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_composition() {
        let params = SearchParams::new()
            .with_text("позовна давність")
            .with_where("court_code", WhereOp::In, "[1090]")
            .with_dates(NaiveDate::from_ymd_opt(2024, 1, 1), None)
            .with_order("adjudication_date", Order::Desc)
            .with_limit(25)
            .with_page(2);
        let query = params.to_query();

        assert!(query.contains(&("meta.search".into(), "позовна давність".into())));
        assert!(query.contains(&("where[court_code][op]".into(), "in".into())));
        assert!(query.contains(&("where[court_code][value]".into(), "[1090]".into())));
        assert!(query.contains(&("date_from".into(), "2024-01-01".into())));
        assert!(query.contains(&("order[adjudication_date]".into(), "desc".into())));
        assert!(query.contains(&("limit".into(), "25".into())));
        assert!(query.contains(&("page".into(), "2".into())));
    }

    #[test]
    fn test_normalize_decision() {
        let raw = RawDecision {
            id: serde_json::json!(118752233),
            title: Some("Постанова КЦС ВС".into()),
            date: Some("2024-03-15 00:00:00".into()),
            court: Some("Касаційний цивільний суд".into()),
            chamber: None,
            case_number: Some("756/1234/23".into()),
            dispute_category: None,
            outcome: None,
        };
        let doc = normalize_decision(&raw);
        assert_eq!(doc.external_id, "118752233");
        assert_eq!(doc.doc_type, DocumentType::CourtDecision);
        assert_eq!(doc.date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(doc.case_number.as_deref(), Some("756/1234/23"));
    }

    #[test]
    fn test_where_op_wire_names() {
        assert_eq!(WhereOp::Eq.as_str(), "=");
        assert_eq!(WhereOp::Between.as_str(), "between");
        assert_eq!(WhereOp::Lte.as_str(), "<=");
    }
}
