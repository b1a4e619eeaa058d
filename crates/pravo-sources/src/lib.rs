//! Pravo-Sources: adapters over the external corpora.
//!
//! Three adapters with a shared discipline: a per-adapter token-bucket rate
//! limiter enforcing a minimum inter-call interval, a filesystem cache of
//! fetched raw bytes, local retry on transient failures, and typed errors so
//! the caller decides whether to proceed on partial evidence. Adapters own
//! no persisted state beyond their rate-limit bookkeeping and caches.

mod cache;
mod court;
mod legislation;
mod ratelimit;
mod upload;

pub use cache::*;
pub use court::*;
pub use legislation::*;
pub use ratelimit::*;
pub use upload::*;
