//! Grammar-driven expression engine.
//!
//! The engine is generic over the operator set: a grammar is a table of
//! `ElementDefinition`s whose kind type implements `ElementSemantics`.
//! Parsing runs in two stages, a regex-table tokenizer followed by a
//! priority-ordered reduction pass over a flat argument array. No grammar
//! knowledge is baked into this module.

pub mod depth;
pub mod element;
pub mod error;
pub mod node;
pub mod reduce;
pub mod token;

pub use depth::{DepthBudget, DEFAULT_DEPTH_LIMIT};
pub use element::{Arity, ElementDefinition, ElementSemantics, Fixing, Value};
pub use error::ExprError;
pub use node::{Argument, ElementInstance};
pub use reduce::{parse, parse_with_depth};
pub use token::{tokenize, TokenDefinition, TokenInstance};
