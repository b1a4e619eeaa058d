//! Pravo-Patterns: aggregated reasoning fingerprints over case cohorts.
//!
//! A pattern condenses at least three cases sharing an intent into the
//! articles they lean on, the dominant outcome, curated risk/argument
//! keywords, and a centroid embedding that later queries match against.

mod extract;
mod lexicon;
mod store;

pub use extract::*;
pub use lexicon::*;
pub use store::*;
