//! Bulk ingestion by keyword and date range.
//!
//! The worker streams with bounded memory: one search-result page is
//! fetched, its documents are ingested under the shared semaphore, the page
//! is dropped, and only then is the next page requested. Progress is
//! queryable by job id; cancellation is cooperative (in-flight items
//! complete, no new page starts).

use crate::IngestWorker;
use async_trait::async_trait;
use chrono::NaiveDate;
use pravo_core::Result;
use pravo_sources::{CourtClient, Order, SearchPage, SearchParams};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Only the most recent errors are retained per job.
const ERROR_CAP: usize = 100;

/// What to scrape.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub query: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page_size: usize,
    /// Optional hard ceiling on ingested documents.
    pub max_documents: Option<usize>,
}

impl ScrapeRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            date_from: None,
            date_to: None,
            page_size: 25,
            max_documents: None,
        }
    }
}

/// Search seam so the worker runs against the real API or a fake.
#[async_trait]
pub trait DecisionSearch: Send + Sync {
    async fn search_page(&self, request: &ScrapeRequest, page: usize) -> Result<SearchPage>;
}

#[async_trait]
impl DecisionSearch for CourtClient {
    async fn search_page(&self, request: &ScrapeRequest, page: usize) -> Result<SearchPage> {
        let params = SearchParams::new()
            .with_text(&request.query)
            .with_dates(request.date_from, request.date_to)
            .with_order("adjudication_date", Order::Desc)
            .with_limit(request.page_size)
            .with_page(page);
        self.search(&params).await
    }
}

/// Bulk-job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub processed: usize,
    pub total: Option<usize>,
    pub errors: Vec<String>,
    pub progress_pct: f32,
}

struct JobEntry {
    progress: JobProgress,
    cancel: Arc<AtomicBool>,
}

/// Background bulk-ingestion worker.
pub struct ScrapeWorker {
    search: Arc<dyn DecisionSearch>,
    ingest: Arc<IngestWorker>,
    jobs: Arc<RwLock<HashMap<Uuid, JobEntry>>>,
}

impl ScrapeWorker {
    pub fn new(search: Arc<dyn DecisionSearch>, ingest: Arc<IngestWorker>) -> Self {
        Self {
            search,
            ingest,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Starts a bulk job; returns its id immediately.
    pub async fn start(self: &Arc<Self>, request: ScrapeRequest) -> Uuid {
        let job_id = Uuid::new_v4();
        let cancel = Arc::new(AtomicBool::new(false));
        self.jobs.write().await.insert(
            job_id,
            JobEntry {
                progress: JobProgress {
                    job_id,
                    status: JobStatus::Queued,
                    processed: 0,
                    total: None,
                    errors: Vec::new(),
                    progress_pct: 0.0,
                },
                cancel: cancel.clone(),
            },
        );

        let worker = self.clone();
        tokio::spawn(async move {
            worker.run(job_id, request, cancel).await;
        });
        job_id
    }

    /// Progress for a job id.
    pub async fn progress(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs.read().await.get(&job_id).map(|e| e.progress.clone())
    }

    /// Requests cancellation. Returns whether the job exists.
    pub async fn cancel(&self, job_id: Uuid) -> bool {
        match self.jobs.read().await.get(&job_id) {
            Some(entry) => {
                entry.cancel.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    async fn run(&self, job_id: Uuid, request: ScrapeRequest, cancel: Arc<AtomicBool>) {
        self.update(job_id, |p| p.status = JobStatus::Running).await;
        info!(%job_id, query = %request.query, "scrape job started");

        let mut page = 1usize;
        let mut processed = 0usize;
        let mut consecutive_failures = 0usize;

        loop {
            if cancel.load(Ordering::Relaxed) {
                self.update(job_id, |p| p.status = JobStatus::Cancelled).await;
                info!(%job_id, processed, "scrape job cancelled");
                return;
            }

            // One page at a time; the page is dropped before the next fetch.
            let search_result = self.search.search_page(&request, page).await;
            let page_data = match search_result {
                Ok(data) => {
                    consecutive_failures = 0;
                    data
                }
                Err(e) => {
                    consecutive_failures += 1;
                    self.update(job_id, |p| push_error(p, format!("page {page}: {e}"))).await;
                    if consecutive_failures >= 3 {
                        warn!(%job_id, error = %e, "scrape job failed");
                        self.update(job_id, |p| p.status = JobStatus::Failed).await;
                        return;
                    }
                    continue;
                }
            };

            if page_data.items.is_empty() {
                break;
            }

            let total = request
                .max_documents
                .or(page_data.total.map(|t| t as usize));
            self.update(job_id, |p| p.total = total).await;

            let mut ids: Vec<String> = page_data
                .items
                .iter()
                .map(|raw| match &raw.id {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            if let Some(max) = request.max_documents {
                let remaining = max.saturating_sub(processed);
                ids.truncate(remaining);
            }
            let page_len = ids.len();
            drop(page_data);

            let report = self.ingest.ingest_batch(&ids).await;
            processed += page_len;

            self.update(job_id, |p| {
                p.processed = processed;
                for failure in &report.errors {
                    push_error(p, format!("{}: {}", failure.external_id, failure.error));
                }
                p.progress_pct = match p.total {
                    Some(total) if total > 0 => {
                        ((processed as f32 / total as f32) * 100.0).min(100.0)
                    }
                    _ => 0.0,
                };
            })
            .await;

            if request
                .max_documents
                .is_some_and(|max| processed >= max)
            {
                break;
            }
            page += 1;
        }

        self.update(job_id, |p| {
            p.status = JobStatus::Completed;
            p.progress_pct = 100.0;
        })
        .await;
        info!(%job_id, processed, "scrape job completed");
    }

    async fn update(&self, job_id: Uuid, apply: impl FnOnce(&mut JobProgress)) {
        if let Some(entry) = self.jobs.write().await.get_mut(&job_id) {
            apply(&mut entry.progress);
        }
    }
}

fn push_error(progress: &mut JobProgress, error: String) {
    progress.errors.push(error);
    if progress.errors.len() > ERROR_CAP {
        let excess = progress.errors.len() - ERROR_CAP;
        progress.errors.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_cap_keeps_most_recent() {
        let mut progress = JobProgress {
            job_id: Uuid::new_v4(),
            status: JobStatus::Running,
            processed: 0,
            total: None,
            errors: Vec::new(),
            progress_pct: 0.0,
        };
        for i in 0..150 {
            push_error(&mut progress, format!("err {i}"));
        }
        assert_eq!(progress.errors.len(), ERROR_CAP);
        assert_eq!(progress.errors.first().unwrap(), "err 50");
        assert_eq!(progress.errors.last().unwrap(), "err 149");
    }
}
