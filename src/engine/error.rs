//! Structured failures surfaced by tokenizing, reducing and evaluating.
//!
//! Every error is raised at the point of first detection and propagated to
//! the caller; nothing is retried or silently swallowed. Grammar errors
//! (stray tokens, unmatched wrappers, arity problems) are kept distinct from
//! resource exhaustion (`DepthLimitExceeded`), which signals a degenerate
//! input rather than a semantic problem with the expression.

use std::fmt;

/// Errors raised while building a grammar table, tokenizing an input,
/// reducing the token sequence, or evaluating the resulting tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// No token definition matched at the given codepoint offset.
    UnknownToken { position: usize, snippet: String },
    /// A raw token survived every reduction pass.
    StrayToken { lexeme: String, position: usize },
    /// An opening wrap token has no corresponding closing token.
    UnmatchedWrapper {
        element: String,
        position: usize,
        expected: String,
    },
    /// An operator token run was found but not enough arguments surround it.
    NotEnoughArguments {
        element: String,
        position: usize,
        expected: Option<usize>,
    },
    /// A fully reduced node violates arity or definition-specific structure.
    MalformedExpression { element: String, message: String },
    /// A well-formed node received a non-boolean argument during evaluation.
    InvalidExpression { element: String, message: String },
    /// Reduction, validation or evaluation recursed past the configured limit.
    DepthLimitExceeded { limit: usize },
    /// A token or element definition was constructed with inconsistent data.
    InvalidDefinition { message: String },
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::UnknownToken { position, snippet } => {
                write!(f, "Unknown token \"{}\" at position {}", snippet, position)
            }
            ExprError::StrayToken { lexeme, position } => {
                write!(
                    f,
                    "Stray token \"{}\" encountered at position {}",
                    lexeme, position
                )
            }
            ExprError::UnmatchedWrapper {
                element,
                position,
                expected,
            } => {
                write!(
                    f,
                    "Unmatched opening token for wrapping operator {} at position {}; the missing closing token is {}",
                    element, position, expected
                )
            }
            ExprError::NotEnoughArguments {
                element,
                position,
                expected,
            } => {
                write!(
                    f,
                    "Not enough arguments for operator {} at position {}",
                    element, position
                )?;
                if let Some(n) = expected {
                    write!(f, " (expected {})", n)?;
                }
                Ok(())
            }
            ExprError::MalformedExpression { element, message } => {
                write!(f, "Malformed expression at {}: {}", element, message)
            }
            ExprError::InvalidExpression { element, message } => {
                write!(f, "Invalid expression at {}: {}", element, message)
            }
            ExprError::DepthLimitExceeded { limit } => {
                write!(f, "Recursion depth limit of {} exceeded", limit)
            }
            ExprError::InvalidDefinition { message } => {
                write!(f, "Invalid definition: {}", message)
            }
        }
    }
}

impl std::error::Error for ExprError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_token_display() {
        let err = ExprError::UnknownToken {
            position: 5,
            snippet: "|&".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown token \"|&\" at position 5");
    }

    #[test]
    fn test_not_enough_arguments_display_with_arity() {
        let err = ExprError::NotEnoughArguments {
            element: "Not".to_string(),
            position: 0,
            expected: Some(1),
        };
        assert_eq!(
            err.to_string(),
            "Not enough arguments for operator Not at position 0 (expected 1)"
        );
    }

    #[test]
    fn test_depth_limit_display() {
        let err = ExprError::DepthLimitExceeded { limit: 50 };
        assert_eq!(err.to_string(), "Recursion depth limit of 50 exceeded");
    }
}
