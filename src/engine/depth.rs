//! Explicit recursion budget threaded through every recursive traversal.

use crate::engine::error::ExprError;

/// Default maximum recursion depth for reduction, validation and evaluation.
pub const DEFAULT_DEPTH_LIMIT: usize = 50;

/// A countdown passed down recursive calls; exhausting it is a deterministic,
/// catchable failure instead of a stack overflow.
#[derive(Debug, Clone, Copy)]
pub struct DepthBudget {
    limit: usize,
    remaining: usize,
}

impl DepthBudget {
    pub fn new(limit: usize) -> Self {
        DepthBudget {
            limit,
            remaining: limit,
        }
    }

    /// Consume one level of depth, failing once the budget is exhausted.
    pub fn descend(self) -> Result<Self, ExprError> {
        if self.remaining == 0 {
            return Err(ExprError::DepthLimitExceeded { limit: self.limit });
        }
        Ok(DepthBudget {
            limit: self.limit,
            remaining: self.remaining - 1,
        })
    }
}

impl Default for DepthBudget {
    fn default() -> Self {
        DepthBudget::new(DEFAULT_DEPTH_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_allows_limit_levels() {
        let mut budget = DepthBudget::new(3);
        for _ in 0..3 {
            budget = budget.descend().unwrap();
        }
        assert!(matches!(
            budget.descend(),
            Err(ExprError::DepthLimitExceeded { limit: 3 })
        ));
    }

    #[test]
    fn test_default_budget_uses_default_limit() {
        let budget = DepthBudget::default();
        assert!(budget.descend().is_ok());
    }
}
