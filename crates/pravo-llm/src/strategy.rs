//! Model tier selection by budget.

use pravo_core::Budget;
use serde::{Deserialize, Serialize};

/// A concrete model choice for a budget tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStrategy {
    /// Provider key ("openai" or any compatible endpoint).
    pub provider: String,
    /// Model identifier sent on the wire.
    pub model: String,
    /// Completion token ceiling.
    pub max_tokens: u32,
    /// Whether the model honors a JSON response format.
    pub supports_json: bool,
}

/// Selects the strategy for a budget. Pure function of the budget; the
/// model names are deployment configuration, not behavior.
pub fn select_strategy(budget: Budget) -> ModelStrategy {
    match budget {
        Budget::Quick => ModelStrategy {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            max_tokens: 2048,
            supports_json: true,
        },
        Budget::Standard => ModelStrategy {
            provider: "openai".into(),
            model: "gpt-4o".into(),
            max_tokens: 4096,
            supports_json: true,
        },
        Budget::Deep => ModelStrategy {
            provider: "openai".into(),
            model: "gpt-4o".into(),
            max_tokens: 8192,
            supports_json: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_pure_and_total() {
        for b in [Budget::Quick, Budget::Standard, Budget::Deep] {
            let a = select_strategy(b);
            let c = select_strategy(b);
            assert_eq!(a, c);
            assert!(a.max_tokens > 0);
        }
    }

    #[test]
    fn test_deep_gets_the_largest_ceiling() {
        assert!(
            select_strategy(Budget::Deep).max_tokens
                > select_strategy(Budget::Quick).max_tokens
        );
    }
}
