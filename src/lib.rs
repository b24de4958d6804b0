//! # authex
//!
//! A grammar-driven tokenizer, parser and evaluator for boolean access
//! expressions such as `alice && @staff || !@guests`.
//!
//! The crate is split in two layers:
//!
//! - [`engine`]: a generic operator-precedence machine. Grammars are data
//!   (tables of element definitions with a fixing, an arity and a priority);
//!   the reducer splices matched token runs into tree nodes in ascending
//!   priority order.
//! - [`authex`]: the engine instantiated for access expressions, with the
//!   concrete operator set, the default grammar table and the identity
//!   context the expressions are evaluated against.
//!
//! ## Quick start
//!
//! ```text
//! let expr = authex::parse_expression("alice && @staff")?;
//! let ctx = authex::AccessContext::with_identity("alice", ["staff"]);
//! assert_eq!(expr.evaluate(&ctx)?, authex::Value::Bool(true));
//! ```

pub mod authex;
pub mod engine;

pub use crate::authex::{
    access_grammar, parse_expression, AccessContext, AccessExpression, AccessOp,
    EvaluationContext, Grammar,
};
pub use crate::engine::{ExprError, Value};
