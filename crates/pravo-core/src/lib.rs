//! Pravo-Core: domain types and error taxonomy for the Pravo legal research
//! backend.
//!
//! This crate defines the shapes every other layer agrees on: documents and
//! their typed sections, legislation acts and articles, citation links,
//! precedent status, aggregated legal patterns, and the append-only event
//! trail. It also owns the error taxonomy that flows from the adapters all
//! the way out to the MCP protocol surface.
//!
//! It also carries the retry/backoff discipline shared by every outbound
//! caller. Nothing here performs I/O; stores, adapters, and the
//! orchestrator build on these types.

mod budget;
mod citation;
mod config;
mod document;
mod error;
mod event;
mod legislation;
mod pattern;
mod retry;
mod section;

pub use budget::*;
pub use citation::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use event::*;
pub use legislation::*;
pub use pattern::*;
pub use retry::*;
pub use section::*;
