//! Postgres implementation of the [`MetaStore`] contract.
//!
//! All queries go through one pool. Dynamic filters are composed with
//! `QueryBuilder`; everything else is plain parameterized SQL. Row-level
//! upsert contention on `zakononline_id` serializes concurrent writers per
//! document.

use super::{CorpusStats, DocumentFilters, MetaStore, MIGRATIONS};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pravo_core::{
    CitationLink, CitationType, DecisionOutcome, Document, DocumentType, Error, Event,
    LegalPattern, LegislationAct, ActType, LegislationArticle, PrecedentState, PrecedentStatus,
    Result, Section, SectionType, verify_section_set,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Acquire, QueryBuilder, Row};
use tracing::{info, warn};
use uuid::Uuid;

/// The relational authority, backed by Postgres.
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    /// Connects a pool to the given database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool (used by integration harnesses).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        info!("metadata schema up to date");
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            Error::Unavailable(format!("database: {e}"))
        }
        other => Error::Internal(anyhow::anyhow!("database: {other}")),
    }
}

const DOCUMENT_COLUMNS: &str = "id, zakononline_id, type, title, date, court, chamber, \
     case_number, dispute_category, outcome, full_text, full_text_html, user_id, metadata, \
     created_at, updated_at";

fn document_from_row(row: &PgRow) -> Result<Document> {
    let type_str: String = row.try_get("type").map_err(db_err)?;
    let doc_type = DocumentType::parse(&type_str).ok_or_else(|| {
        Error::InvariantViolated(format!("unknown document type in store: {type_str}"))
    })?;
    Ok(Document {
        id: row.try_get("id").map_err(db_err)?,
        external_id: row.try_get("zakononline_id").map_err(db_err)?,
        doc_type,
        title: row.try_get("title").map_err(db_err)?,
        date: row.try_get::<Option<NaiveDate>, _>("date").map_err(db_err)?,
        court: row.try_get("court").map_err(db_err)?,
        chamber: row.try_get("chamber").map_err(db_err)?,
        case_number: row.try_get("case_number").map_err(db_err)?,
        dispute_category: row.try_get("dispute_category").map_err(db_err)?,
        outcome: row.try_get("outcome").map_err(db_err)?,
        full_text: row.try_get("full_text").map_err(db_err)?,
        full_text_html: row.try_get("full_text_html").map_err(db_err)?,
        owner_id: row.try_get("user_id").map_err(db_err)?,
        metadata: row.try_get("metadata").map_err(db_err)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(db_err)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(db_err)?,
    })
}

fn section_from_row(row: &PgRow) -> Result<Section> {
    let type_str: String = row.try_get("section_type").map_err(db_err)?;
    Ok(Section {
        id: row.try_get("id").map_err(db_err)?,
        document_id: row.try_get("document_id").map_err(db_err)?,
        section_type: SectionType::parse(&type_str)?,
        text: row.try_get("text").map_err(db_err)?,
        start_index: row.try_get::<i64, _>("start_index").map_err(db_err)? as usize,
        end_index: row.try_get::<i64, _>("end_index").map_err(db_err)? as usize,
        confidence: row.try_get("confidence").map_err(db_err)?,
    })
}

fn article_from_row(row: &PgRow) -> Result<LegislationArticle> {
    Ok(LegislationArticle {
        id: row.try_get("id").map_err(db_err)?,
        act_id: row.try_get("act_id").map_err(db_err)?,
        article_number: row.try_get("article_number").map_err(db_err)?,
        version_date: row.try_get("version_date").map_err(db_err)?,
        section_number: row.try_get("section_number").map_err(db_err)?,
        chapter_number: row.try_get("chapter_number").map_err(db_err)?,
        part_number: row.try_get("part_number").map_err(db_err)?,
        paragraph_number: row.try_get("paragraph_number").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        text: row.try_get("text").map_err(db_err)?,
        html: row.try_get("html").map_err(db_err)?,
        byte_size: row.try_get::<i64, _>("byte_size").map_err(db_err)? as usize,
        is_current: row.try_get("is_current").map_err(db_err)?,
    })
}

fn outcome_from_str(s: &str) -> Result<DecisionOutcome> {
    match s {
        "consumer_won" => Ok(DecisionOutcome::ConsumerWon),
        "seller_won" => Ok(DecisionOutcome::SellerWon),
        "partial" => Ok(DecisionOutcome::Partial),
        "rejected" => Ok(DecisionOutcome::Rejected),
        other => Err(Error::InvariantViolated(format!(
            "unknown decision outcome in store: {other}"
        ))),
    }
}

fn citation_type_from_str(s: &str) -> Result<CitationType> {
    match s {
        "follows" => Ok(CitationType::Follows),
        "distinguishes" => Ok(CitationType::Distinguishes),
        "overrules" => Ok(CitationType::Overrules),
        "mentions" => Ok(CitationType::Mentions),
        other => Err(Error::InvariantViolated(format!(
            "unknown citation type in store: {other}"
        ))),
    }
}

fn citation_type_str(t: CitationType) -> &'static str {
    match t {
        CitationType::Follows => "follows",
        CitationType::Distinguishes => "distinguishes",
        CitationType::Overrules => "overrules",
        CitationType::Mentions => "mentions",
    }
}

fn precedent_state_from_str(s: &str) -> Result<PrecedentState> {
    match s {
        "active" => Ok(PrecedentState::Active),
        "reversed" => Ok(PrecedentState::Reversed),
        "overruled" => Ok(PrecedentState::Overruled),
        "distinguished" => Ok(PrecedentState::Distinguished),
        other => Err(Error::InvariantViolated(format!(
            "unknown precedent state in store: {other}"
        ))),
    }
}

fn act_type_str(t: ActType) -> &'static str {
    match t {
        ActType::Code => "code",
        ActType::Law => "law",
        ActType::Regulation => "regulation",
    }
}

fn act_type_from_str(s: &str) -> Result<ActType> {
    match s {
        "code" => Ok(ActType::Code),
        "law" => Ok(ActType::Law),
        "regulation" => Ok(ActType::Regulation),
        other => Err(Error::InvariantViolated(format!(
            "unknown act type in store: {other}"
        ))),
    }
}

#[async_trait]
impl MetaStore for PgMetadataStore {
    async fn upsert_document(&self, doc: &Document) -> Result<Document> {
        let sql = format!(
            r#"
            INSERT INTO documents
                ({DOCUMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, now(), now())
            ON CONFLICT (zakononline_id) DO UPDATE SET
                title            = CASE WHEN EXCLUDED.title <> '' THEN EXCLUDED.title
                                        ELSE documents.title END,
                date             = COALESCE(EXCLUDED.date, documents.date),
                court            = COALESCE(EXCLUDED.court, documents.court),
                chamber          = COALESCE(EXCLUDED.chamber, documents.chamber),
                case_number      = COALESCE(EXCLUDED.case_number, documents.case_number),
                dispute_category = COALESCE(EXCLUDED.dispute_category, documents.dispute_category),
                outcome          = COALESCE(EXCLUDED.outcome, documents.outcome),
                full_text        = COALESCE(EXCLUDED.full_text, documents.full_text),
                full_text_html   = COALESCE(EXCLUDED.full_text_html, documents.full_text_html),
                user_id          = COALESCE(EXCLUDED.user_id, documents.user_id),
                metadata         = CASE WHEN EXCLUDED.metadata = 'null'::jsonb
                                        THEN documents.metadata ELSE EXCLUDED.metadata END,
                updated_at       = now()
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(doc.id)
            .bind(&doc.external_id)
            .bind(doc.doc_type.as_str())
            .bind(&doc.title)
            .bind(doc.date)
            .bind(&doc.court)
            .bind(&doc.chamber)
            .bind(&doc.case_number)
            .bind(&doc.dispute_category)
            .bind(&doc.outcome)
            .bind(&doc.full_text)
            .bind(&doc.full_text_html)
            .bind(doc.owner_id)
            .bind(&doc.metadata)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        document_from_row(&row)
    }

    async fn document_by_external_id(
        &self,
        external_id: &str,
        viewer: Option<Uuid>,
    ) -> Result<Option<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE zakononline_id = $1 AND (user_id IS NULL OR user_id = $2)"
        );
        let row = sqlx::query(&sql)
            .bind(external_id)
            .bind(viewer)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn document_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE id = $1 AND (user_id IS NULL OR user_id = $2)"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(viewer)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn documents_by_case_number(
        &self,
        case_number: &str,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE case_number = $1 AND (user_id IS NULL OR user_id = $2) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(case_number)
            .bind(viewer)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(document_from_row).collect()
    }

    async fn full_text_search(
        &self,
        query: &str,
        viewer: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let sql = format!(
            r#"
            SELECT {DOCUMENT_COLUMNS},
                   ts_rank(to_tsvector('simple', coalesce(full_text, '')),
                           plainto_tsquery('simple', $1)) AS rank
            FROM documents
            WHERE (user_id IS NULL OR user_id = $2)
              AND to_tsvector('simple', coalesce(full_text, ''))
                  @@ plainto_tsquery('simple', $1)
            ORDER BY rank DESC
            LIMIT $3
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(viewer)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(document_from_row).collect()
    }

    async fn search_documents(
        &self,
        filters: &DocumentFilters,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Document>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE (user_id IS NULL OR user_id = "
        ));
        builder.push_bind(viewer);
        builder.push(")");

        let mut push_eq = |builder: &mut QueryBuilder<sqlx::Postgres>, col: &str, v: &Option<String>| {
            if let Some(value) = v {
                builder.push(format!(" AND {col} = "));
                builder.push_bind(value.clone());
            }
        };
        push_eq(&mut builder, "type", &filters.doc_type);
        push_eq(&mut builder, "court", &filters.court);
        push_eq(&mut builder, "chamber", &filters.chamber);
        push_eq(&mut builder, "dispute_category", &filters.dispute_category);
        push_eq(&mut builder, "outcome", &filters.outcome);
        push_eq(&mut builder, "case_number", &filters.case_number);

        if let Some(from) = filters.date_from {
            builder.push(" AND date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = filters.date_to {
            builder.push(" AND date <= ");
            builder.push_bind(to);
        }
        if let Some(text) = &filters.text {
            builder.push(
                " AND to_tsvector('simple', coalesce(full_text, '')) @@ plainto_tsquery('simple', ",
            );
            builder.push_bind(text.clone());
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(filters.limit.max(1) as i64);

        let rows = builder.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(document_from_row).collect()
    }

    async fn list_documents(
        &self,
        viewer: Option<Uuid>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE (user_id IS NULL OR user_id = $1) \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(viewer)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(document_from_row).collect()
    }

    async fn replace_sections(&self, document_id: Uuid, sections: &[Section]) -> Result<()> {
        verify_section_set(sections)?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM document_sections WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        for section in sections {
            sqlx::query(
                "INSERT INTO document_sections \
                 (id, document_id, section_type, text, start_index, end_index, confidence) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(section.id)
            .bind(document_id)
            .bind(section.section_type.as_str())
            .bind(&section.text)
            .bind(section.start_index as i64)
            .bind(section.end_index as i64)
            .bind(section.confidence)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)
    }

    async fn sections_for(&self, document_id: Uuid) -> Result<Vec<Section>> {
        let rows = sqlx::query(
            "SELECT id, document_id, section_type, text, start_index, end_index, confidence \
             FROM document_sections WHERE document_id = $1 ORDER BY start_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(section_from_row).collect()
    }

    async fn section_count(&self, document_id: Uuid) -> Result<usize> {
        let row = sqlx::query("SELECT count(*) AS n FROM document_sections WHERE document_id = $1")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.try_get::<i64, _>("n").map_err(db_err)? as usize)
    }

    async fn record_chunks(&self, section_id: Uuid, chunks: &[(Uuid, String)]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for (vector_id, text) in chunks {
            sqlx::query(
                "INSERT INTO embedding_chunks (id, document_section_id, vector_id, text) \
                 VALUES ($1, $2, $3, $4) ON CONFLICT (vector_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(section_id)
            .bind(vector_id)
            .bind(text)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)
    }

    async fn chunk_count(&self, document_id: Uuid) -> Result<usize> {
        let row = sqlx::query(
            "SELECT count(*) AS n FROM embedding_chunks c \
             JOIN document_sections s ON s.id = c.document_section_id \
             WHERE s.document_id = $1",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.try_get::<i64, _>("n").map_err(db_err)? as usize)
    }

    async fn record_legislation_chunks(
        &self,
        article_id: Uuid,
        chunks: &[(Uuid, String)],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for (vector_id, text) in chunks {
            sqlx::query(
                "INSERT INTO legislation_chunks (id, article_id, vector_id, text) \
                 VALUES ($1, $2, $3, $4) ON CONFLICT (vector_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(article_id)
            .bind(vector_id)
            .bind(text)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)
    }

    async fn upsert_act(&self, act: &LegislationAct) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO legislation
                (act_id, type, title, short_title, url, adoption_date, effective_date,
                 last_amended, status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (act_id) DO UPDATE SET
                type = EXCLUDED.type,
                title = EXCLUDED.title,
                short_title = COALESCE(EXCLUDED.short_title, legislation.short_title),
                url = EXCLUDED.url,
                adoption_date = COALESCE(EXCLUDED.adoption_date, legislation.adoption_date),
                effective_date = COALESCE(EXCLUDED.effective_date, legislation.effective_date),
                last_amended = COALESCE(EXCLUDED.last_amended, legislation.last_amended),
                status = COALESCE(EXCLUDED.status, legislation.status),
                updated_at = now()
            "#,
        )
        .bind(&act.act_id)
        .bind(act_type_str(act.act_type))
        .bind(&act.title)
        .bind(&act.short_title)
        .bind(&act.url)
        .bind(act.adoption_date)
        .bind(act.effective_date)
        .bind(act.last_amended)
        .bind(&act.status)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn act_by_id(&self, act_id: &str) -> Result<Option<LegislationAct>> {
        let row = sqlx::query("SELECT * FROM legislation WHERE act_id = $1")
            .bind(act_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|row| {
            let type_str: String = row.try_get("type").map_err(db_err)?;
            Ok(LegislationAct {
                act_id: row.try_get("act_id").map_err(db_err)?,
                act_type: act_type_from_str(&type_str)?,
                title: row.try_get("title").map_err(db_err)?,
                short_title: row.try_get("short_title").map_err(db_err)?,
                url: row.try_get("url").map_err(db_err)?,
                adoption_date: row.try_get("adoption_date").map_err(db_err)?,
                effective_date: row.try_get("effective_date").map_err(db_err)?,
                last_amended: row.try_get("last_amended").map_err(db_err)?,
                status: row.try_get("status").map_err(db_err)?,
                updated_at: row.try_get("updated_at").map_err(db_err)?,
            })
        })
        .transpose()
    }

    async fn upsert_articles(&self, articles: &[LegislationArticle]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for article in articles {
            // Per-item savepoint: one malformed article must not sink the
            // whole batch.
            let mut sp = tx.begin().await.map_err(db_err)?;
            let result: std::result::Result<(), sqlx::Error> = async {
                if article.is_current {
                    sqlx::query(
                        "UPDATE legislation_articles SET is_current = FALSE \
                         WHERE act_id = $1 AND article_number = $2 AND is_current",
                    )
                    .bind(&article.act_id)
                    .bind(&article.article_number)
                    .execute(&mut *sp)
                    .await?;
                }
                sqlx::query(
                    "INSERT INTO legislation_articles \
                     (id, act_id, article_number, version_date, section_number, chapter_number, \
                      part_number, paragraph_number, title, text, html, byte_size, is_current) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                )
                .bind(article.id)
                .bind(&article.act_id)
                .bind(&article.article_number)
                .bind(article.version_date)
                .bind(&article.section_number)
                .bind(&article.chapter_number)
                .bind(&article.part_number)
                .bind(&article.paragraph_number)
                .bind(&article.title)
                .bind(&article.text)
                .bind(&article.html)
                .bind(article.byte_size as i64)
                .bind(article.is_current)
                .execute(&mut *sp)
                .await?;
                Ok(())
            }
            .await;

            match result {
                Ok(()) => sp.commit().await.map_err(db_err)?,
                Err(e) => {
                    warn!(act_id = %article.act_id, article = %article.article_number,
                          error = %e, "article upsert rolled back");
                    sp.rollback().await.map_err(db_err)?;
                }
            }
        }
        tx.commit().await.map_err(db_err)
    }

    async fn article(
        &self,
        act_id: &str,
        article_number: &str,
    ) -> Result<Option<LegislationArticle>> {
        let row = sqlx::query(
            "SELECT * FROM legislation_articles \
             WHERE act_id = $1 AND article_number = $2 AND is_current",
        )
        .bind(act_id)
        .bind(article_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn articles_for_act(&self, act_id: &str) -> Result<Vec<LegislationArticle>> {
        let rows = sqlx::query(
            "SELECT * FROM legislation_articles WHERE act_id = $1 AND is_current \
             ORDER BY length(article_number), article_number",
        )
        .bind(act_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(article_from_row).collect()
    }

    async fn search_articles(
        &self,
        query: &str,
        act_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LegislationArticle>> {
        let rows = sqlx::query(
            r#"
            SELECT *, ts_rank(to_tsvector('simple', text),
                              plainto_tsquery('simple', $1)) AS rank
            FROM legislation_articles
            WHERE is_current
              AND ($2::text IS NULL OR act_id = $2)
              AND (article_number = $1
                   OR to_tsvector('simple', text) @@ plainto_tsquery('simple', $1))
            ORDER BY rank DESC
            LIMIT $3
            "#,
        )
        .bind(query)
        .bind(act_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(article_from_row).collect()
    }

    async fn upsert_pattern(&self, pattern: &LegalPattern) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO legal_patterns
                (id, intent, law_articles, centroid, decision_outcome, frequency,
                 confidence, example_cases, risk_factors, success_arguments,
                 anti_patterns, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now())
            ON CONFLICT (id) DO UPDATE SET
                law_articles = EXCLUDED.law_articles,
                centroid = EXCLUDED.centroid,
                decision_outcome = EXCLUDED.decision_outcome,
                frequency = EXCLUDED.frequency,
                confidence = EXCLUDED.confidence,
                example_cases = EXCLUDED.example_cases,
                risk_factors = EXCLUDED.risk_factors,
                success_arguments = EXCLUDED.success_arguments,
                anti_patterns = EXCLUDED.anti_patterns,
                updated_at = now()
            "#,
        )
        .bind(pattern.id)
        .bind(&pattern.intent)
        .bind(&pattern.law_articles)
        .bind(&pattern.centroid)
        .bind(pattern.decision_outcome.as_str())
        .bind(pattern.frequency as i64)
        .bind(pattern.confidence)
        .bind(&pattern.example_cases)
        .bind(&pattern.risk_factors)
        .bind(&pattern.success_arguments)
        .bind(&pattern.anti_patterns)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn patterns_by_intent(&self, intent: &str) -> Result<Vec<LegalPattern>> {
        let rows = sqlx::query("SELECT * FROM legal_patterns WHERE intent = $1")
            .bind(intent)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                let outcome_str: String = row.try_get("decision_outcome").map_err(db_err)?;
                Ok(LegalPattern {
                    id: row.try_get("id").map_err(db_err)?,
                    intent: row.try_get("intent").map_err(db_err)?,
                    law_articles: row.try_get("law_articles").map_err(db_err)?,
                    centroid: row.try_get("centroid").map_err(db_err)?,
                    decision_outcome: outcome_from_str(&outcome_str)?,
                    frequency: row.try_get::<i64, _>("frequency").map_err(db_err)? as usize,
                    confidence: row.try_get("confidence").map_err(db_err)?,
                    example_cases: row.try_get("example_cases").map_err(db_err)?,
                    risk_factors: row.try_get("risk_factors").map_err(db_err)?,
                    success_arguments: row.try_get("success_arguments").map_err(db_err)?,
                    anti_patterns: row.try_get("anti_patterns").map_err(db_err)?,
                    updated_at: row.try_get("updated_at").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn upsert_citation(&self, link: &CitationLink) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO citation_links
                (from_case_id, to_case_id, citation_type, context, section_type, confidence)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (from_case_id, to_case_id, citation_type) DO UPDATE SET
                context = COALESCE(EXCLUDED.context, citation_links.context),
                section_type = COALESCE(EXCLUDED.section_type, citation_links.section_type),
                confidence = EXCLUDED.confidence
            "#,
        )
        .bind(link.from_document_id)
        .bind(link.to_document_id)
        .bind(citation_type_str(link.citation_type))
        .bind(&link.context)
        .bind(link.found_in.map(|s| s.as_str()))
        .bind(link.confidence)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn citations_from(&self, document_id: Uuid) -> Result<Vec<CitationLink>> {
        let rows = sqlx::query("SELECT * FROM citation_links WHERE from_case_id = $1")
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                let type_str: String = row.try_get("citation_type").map_err(db_err)?;
                let found_in: Option<String> = row.try_get("section_type").map_err(db_err)?;
                Ok(CitationLink {
                    from_document_id: row.try_get("from_case_id").map_err(db_err)?,
                    to_document_id: row.try_get("to_case_id").map_err(db_err)?,
                    citation_type: citation_type_from_str(&type_str)?,
                    context: row.try_get("context").map_err(db_err)?,
                    found_in: found_in.as_deref().map(SectionType::parse).transpose()?,
                    confidence: row.try_get("confidence").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn upsert_precedent_status(&self, status: &PrecedentStatus) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO precedent_status
                (case_id, status, reversed_by, overruled_by, distinguished_in, last_checked)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (case_id) DO UPDATE SET
                status = EXCLUDED.status,
                reversed_by = EXCLUDED.reversed_by,
                overruled_by = EXCLUDED.overruled_by,
                distinguished_in = EXCLUDED.distinguished_in,
                last_checked = now()
            "#,
        )
        .bind(status.document_id)
        .bind(status.status.as_str())
        .bind(&status.reversed_by)
        .bind(&status.overruled_by)
        .bind(&status.distinguished_in)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn precedent_status(&self, document_id: Uuid) -> Result<Option<PrecedentStatus>> {
        let row = sqlx::query("SELECT * FROM precedent_status WHERE case_id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|row| {
            let status_str: String = row.try_get("status").map_err(db_err)?;
            Ok(PrecedentStatus {
                document_id: row.try_get("case_id").map_err(db_err)?,
                status: precedent_state_from_str(&status_str)?,
                reversed_by: row.try_get("reversed_by").map_err(db_err)?,
                overruled_by: row.try_get("overruled_by").map_err(db_err)?,
                distinguished_in: row.try_get("distinguished_in").map_err(db_err)?,
                last_checked: row.try_get("last_checked").map_err(db_err)?,
            })
        })
        .transpose()
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        sqlx::query("INSERT INTO events (id, event_type, payload, created_at) VALUES ($1, $2, $3, $4)")
            .bind(event.id)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn corpus_stats(&self) -> Result<CorpusStats> {
        let totals = sqlx::query(
            "SELECT (SELECT count(*) FROM documents) AS docs, \
                    (SELECT count(*) FROM document_sections) AS sections",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let group = |rows: Vec<PgRow>| -> Result<Vec<(String, i64)>> {
            rows.iter()
                .map(|r| {
                    Ok((
                        r.try_get::<Option<String>, _>("k").map_err(db_err)?.unwrap_or_default(),
                        r.try_get::<i64, _>("n").map_err(db_err)?,
                    ))
                })
                .collect()
        };

        let by_type = sqlx::query(
            "SELECT type AS k, count(*) AS n FROM documents GROUP BY type ORDER BY n DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        let by_court = sqlx::query(
            "SELECT court AS k, count(*) AS n FROM documents WHERE court IS NOT NULL \
             GROUP BY court ORDER BY n DESC LIMIT 20",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        let by_outcome = sqlx::query(
            "SELECT outcome AS k, count(*) AS n FROM documents WHERE outcome IS NOT NULL \
             GROUP BY outcome ORDER BY n DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(CorpusStats {
            total_documents: totals.try_get("docs").map_err(db_err)?,
            total_sections: totals.try_get("sections").map_err(db_err)?,
            by_type: group(by_type)?,
            by_court: group(by_court)?,
            by_outcome: group(by_outcome)?,
        })
    }
}
