//! Pravo-Store: the hybrid index layer.
//!
//! Two stores with a strict ownership split:
//!
//! - the **metadata store** (Postgres via sqlx) exclusively owns all
//!   relational rows: documents, sections, legislation, patterns, citation
//!   links, precedent status, the event trail;
//! - the **vector store** (Qdrant) exclusively owns vectors; the payload on
//!   each vector is a denormalized snapshot refreshed on re-ingest, never
//!   the authority.
//!
//! Both stores sit behind traits; in-memory implementations back the test
//! suites with the same contracts.

pub mod meta;
pub mod vector;

pub use meta::*;
pub use vector::*;
