//! The engine instantiated for boolean access expressions.

pub mod context;
pub mod grammar;

pub use context::{AccessContext, EvaluationContext};
pub use grammar::{access_grammar, AccessExpression, AccessOp, Grammar};

use crate::engine::ExprError;

/// Parse an access expression with the default grammar and depth limit.
pub fn parse_expression(text: &str) -> Result<AccessExpression, ExprError> {
    access_grammar().parse(text)
}
