//! The quality/cost dial for model selection and expansion depth.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Coarse quality/cost dial. Selects model tiers and expansion depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl Budget {
    pub fn as_str(self) -> &'static str {
        match self {
            Budget::Quick => "quick",
            Budget::Standard => "standard",
            Budget::Deep => "deep",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "quick" => Ok(Budget::Quick),
            "standard" => Ok(Budget::Standard),
            "deep" => Ok(Budget::Deep),
            other => Err(Error::invalid_argument(format!("unknown budget: {other}"))),
        }
    }

    /// How many top cases get full-section expansion under this budget.
    pub fn expansion_depth(self) -> usize {
        match self {
            Budget::Quick => 2,
            Budget::Standard => 3,
            Budget::Deep => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for b in [Budget::Quick, Budget::Standard, Budget::Deep] {
            assert_eq!(Budget::parse(b.as_str()).unwrap(), b);
        }
        assert!(Budget::parse("ultra").is_err());
    }
}
