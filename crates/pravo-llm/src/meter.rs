//! Cost metering for provider calls.
//!
//! Costs are estimated from a static price table before and after each call
//! (token counts approximated at four characters per token) and accumulated
//! in process-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Price per 1,000 tokens in micro-dollars, `(model prefix, input, output)`.
/// Lookup is by longest matching prefix so dated snapshots price like their
/// base model.
const PRICE_TABLE: &[(&str, u64, u64)] = &[
    ("gpt-4o-mini", 150, 600),
    ("gpt-4o", 2500, 10000),
    ("text-embedding-3-small", 20, 0),
    ("text-embedding-3-large", 130, 0),
];

/// Rough token count: four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Estimated cost of a call in micro-dollars.
pub fn estimate_cost_micros(model: &str, input_tokens: u64, output_tokens: u64) -> u64 {
    let (input_price, output_price) = PRICE_TABLE
        .iter()
        .filter(|(prefix, _, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _, _)| prefix.len())
        .map(|(_, i, o)| (*i, *o))
        .unwrap_or((0, 0));
    (input_tokens * input_price + output_tokens * output_price) / 1000
}

/// Cumulative usage counters, shared across the process.
#[derive(Debug, Default)]
pub struct CostMeter {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    cost_micros: AtomicU64,
    calls: AtomicU64,
}

impl CostMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed call.
    pub fn record(&self, model: &str, input_tokens: u64, output_tokens: u64) {
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
        self.cost_micros.fetch_add(
            estimate_cost_micros(model, input_tokens, output_tokens),
            Ordering::Relaxed,
        );
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters.
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            cost_micros: self.cost_micros.load(Ordering::Relaxed),
            calls: self.calls.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the cumulative usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_micros: u64,
    pub calls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_longest_prefix_wins() {
        // gpt-4o-mini must not price as gpt-4o.
        assert_eq!(estimate_cost_micros("gpt-4o-mini", 1000, 0), 150);
        assert_eq!(estimate_cost_micros("gpt-4o", 1000, 0), 2500);
        assert_eq!(estimate_cost_micros("gpt-4o-2024-08-06", 1000, 1000), 12500);
    }

    #[test]
    fn test_meter_accumulates() {
        let meter = CostMeter::new();
        meter.record("gpt-4o-mini", 1000, 1000);
        meter.record("gpt-4o-mini", 1000, 0);
        let snap = meter.snapshot();
        assert_eq!(snap.calls, 2);
        assert_eq!(snap.input_tokens, 2000);
        assert_eq!(snap.output_tokens, 1000);
        assert_eq!(snap.cost_micros, 750 + 150);
    }
}
