//! Vector-store filters: an AND of equality/range predicates plus an
//! optional OR-group (used for multi-chamber expansion).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One predicate over a payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Exact keyword match.
    Eq { field: String, value: String },
    /// Inclusive date range over the payload date; either bound optional.
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

/// Conjunction of `must` predicates, with `should` as one OR-group ANDed in
/// (at least one `should` member must hold when the group is non-empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorFilter {
    pub must: Vec<Predicate>,
    pub should: Vec<Predicate>,
}

impl VectorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality predicate to the AND set.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push(Predicate::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Constrains the payload date.
    pub fn date_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if from.is_some() || to.is_some() {
            self.must.push(Predicate::DateRange { from, to });
        }
        self
    }

    /// Adds an OR-group of equality predicates over one field.
    pub fn any_of<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field = field.into();
        for value in values {
            self.should.push(Predicate::Eq {
                field: field.clone(),
                value: value.into(),
            });
        }
        self
    }

    /// Whether the filter constrains anything at all.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_composition() {
        let filter = VectorFilter::new()
            .eq("section_type", "DECISION")
            .date_between(NaiveDate::from_ymd_opt(2023, 1, 1), None)
            .any_of("chamber", ["КЦС", "ВП"]);
        assert_eq!(filter.must.len(), 2);
        assert_eq!(filter.should.len(), 2);
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_empty_date_range_is_dropped() {
        let filter = VectorFilter::new().date_between(None, None);
        assert!(filter.is_empty());
    }
}
