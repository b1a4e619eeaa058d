//! Embedded schema migrations.
//!
//! Statements are idempotent so startup can apply them unconditionally.
//! The partial unique index on `legislation_articles` enforces the
//! one-current-version invariant at the database level.

/// Ordered DDL applied by [`super::PgMetadataStore::migrate`].
pub const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id               UUID PRIMARY KEY,
        zakononline_id   TEXT NOT NULL UNIQUE,
        type             TEXT NOT NULL,
        title            TEXT NOT NULL DEFAULT '',
        date             DATE,
        court            TEXT,
        chamber          TEXT,
        case_number      TEXT,
        dispute_category TEXT,
        outcome          TEXT,
        full_text        TEXT,
        full_text_html   TEXT,
        user_id          UUID,
        metadata         JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at       TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_documents_case_number ON documents (case_number)",
    "CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents (created_at DESC)",
    r#"
    CREATE INDEX IF NOT EXISTS idx_documents_fts
        ON documents USING GIN (to_tsvector('simple', coalesce(full_text, '')))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS document_sections (
        id           UUID PRIMARY KEY,
        document_id  UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        section_type TEXT NOT NULL,
        text         TEXT NOT NULL,
        start_index  BIGINT NOT NULL,
        end_index    BIGINT NOT NULL,
        confidence   REAL NOT NULL,
        UNIQUE (document_id, start_index)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sections_document ON document_sections (document_id)",
    r#"
    CREATE TABLE IF NOT EXISTS embedding_chunks (
        id                  UUID PRIMARY KEY,
        document_section_id UUID NOT NULL REFERENCES document_sections(id) ON DELETE CASCADE,
        vector_id           UUID NOT NULL UNIQUE,
        text                TEXT NOT NULL,
        metadata            JSONB NOT NULL DEFAULT '{}'::jsonb
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS legal_patterns (
        id                UUID PRIMARY KEY,
        intent            TEXT NOT NULL,
        law_articles      TEXT[] NOT NULL DEFAULT '{}',
        centroid          REAL[] NOT NULL DEFAULT '{}',
        decision_outcome  TEXT NOT NULL,
        frequency         BIGINT NOT NULL,
        confidence        REAL NOT NULL,
        example_cases     UUID[] NOT NULL DEFAULT '{}',
        risk_factors      TEXT[] NOT NULL DEFAULT '{}',
        success_arguments TEXT[] NOT NULL DEFAULT '{}',
        anti_patterns     JSONB NOT NULL DEFAULT 'null'::jsonb,
        updated_at        TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_patterns_intent ON legal_patterns (intent)",
    r#"
    CREATE TABLE IF NOT EXISTS citation_links (
        from_case_id  UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        to_case_id    UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        citation_type TEXT NOT NULL,
        context       TEXT,
        section_type  TEXT,
        confidence    REAL NOT NULL DEFAULT 0,
        UNIQUE (from_case_id, to_case_id, citation_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS precedent_status (
        case_id          UUID PRIMARY KEY REFERENCES documents(id) ON DELETE CASCADE,
        status           TEXT NOT NULL,
        reversed_by      UUID[] NOT NULL DEFAULT '{}',
        overruled_by     UUID[] NOT NULL DEFAULT '{}',
        distinguished_in UUID[] NOT NULL DEFAULT '{}',
        last_checked     TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS legislation (
        act_id         TEXT PRIMARY KEY,
        type           TEXT NOT NULL,
        title          TEXT NOT NULL,
        short_title    TEXT,
        url            TEXT NOT NULL,
        adoption_date  DATE,
        effective_date DATE,
        last_amended   DATE,
        status         TEXT,
        updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS legislation_articles (
        id               UUID PRIMARY KEY,
        act_id           TEXT NOT NULL REFERENCES legislation(act_id) ON DELETE CASCADE,
        article_number   TEXT NOT NULL,
        version_date     DATE,
        section_number   TEXT,
        chapter_number   TEXT,
        part_number      TEXT,
        paragraph_number TEXT,
        title            TEXT,
        text             TEXT NOT NULL,
        html             TEXT,
        byte_size        BIGINT NOT NULL,
        is_current       BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_one_current
        ON legislation_articles (act_id, article_number) WHERE is_current
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_articles_fts
        ON legislation_articles USING GIN (to_tsvector('simple', text))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS legislation_chunks (
        id         UUID PRIMARY KEY,
        article_id UUID NOT NULL REFERENCES legislation_articles(id) ON DELETE CASCADE,
        vector_id  UUID NOT NULL UNIQUE,
        text       TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id         UUID PRIMARY KEY,
        event_type TEXT NOT NULL,
        payload    JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_events_created_at ON events (created_at DESC)",
];
