//! Grammar element definitions.
//!
//! An `ElementDefinition` is one row of a grammar table: a fixing kind, an
//! arity, a reduction priority and the token definitions that spell the
//! operator. Definitions carry no semantics of their own; behavior lives in
//! the `ElementSemantics` implementation of the kind type `K`.

use crate::engine::depth::DepthBudget;
use crate::engine::error::ExprError;
use crate::engine::node::{Argument, ElementInstance};
use crate::engine::token::TokenDefinition;
use std::sync::Arc;

/// How an element's tokens sit relative to its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixing {
    /// A leaf: a single token and no arguments.
    None,
    /// Token(s) before the argument(s), e.g. negation.
    Prefix,
    /// Token(s) after the argument(s).
    Postfix,
    /// Tokens between arguments; chains fold into one n-ary node.
    Infix,
    /// An open/close token pair around a subsequence.
    Wrap,
}

/// Number of arguments an element takes once reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

/// Result of evaluating an expression node.
///
/// `Empty` is the neutral value of an empty root; boolean operators treat it
/// as a type error rather than coercing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Empty,
}

impl Value {
    pub fn is_true(self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(b),
            Value::Empty => None,
        }
    }
}

/// Per-kind behavior hooks: extra well-formedness constraints and evaluation.
///
/// The engine stays generic over the kind type; an instantiation supplies a
/// closed enum of operators and pattern-matches here.
pub trait ElementSemantics: Sized {
    /// Evaluation input. `?Sized` so a trait object can serve as context.
    type Context: ?Sized;

    /// Kind-specific structural checks beyond arity, run after the generic
    /// shape check. Default: nothing extra.
    fn ensure_well_formed(&self, _node: &ElementInstance<Self>) -> Result<(), ExprError> {
        Ok(())
    }

    fn evaluate(
        &self,
        node: &ElementInstance<Self>,
        ctx: &Self::Context,
        budget: DepthBudget,
    ) -> Result<Value, ExprError>;
}

/// One grammar-table row. Immutable once built; shared via `Arc`.
#[derive(Debug)]
pub struct ElementDefinition<K> {
    name: String,
    kind: K,
    fixing: Fixing,
    arity: Arity,
    priority: u32,
    token_defs: Vec<Arc<TokenDefinition>>,
    nested: bool,
}

impl<K> ElementDefinition<K> {
    /// Build a non-wrapping definition with the default arity for its fixing:
    /// leaves take zero arguments, prefix and postfix operators one, infix
    /// operators fold variadically.
    pub fn new(
        name: &str,
        kind: K,
        fixing: Fixing,
        priority: u32,
        token_defs: Vec<Arc<TokenDefinition>>,
    ) -> Result<Arc<Self>, ExprError> {
        let arity = match fixing {
            Fixing::None => Arity::Fixed(0),
            Fixing::Prefix | Fixing::Postfix => Arity::Fixed(1),
            Fixing::Infix => Arity::Variadic,
            Fixing::Wrap => {
                return Err(ExprError::InvalidDefinition {
                    message: format!(
                        "element {} is wrapping; use ElementDefinition::wrapping",
                        name
                    ),
                })
            }
        };
        Self::with_arity(name, kind, fixing, arity, priority, token_defs)
    }

    /// Build a non-wrapping definition with an explicit arity.
    pub fn with_arity(
        name: &str,
        kind: K,
        fixing: Fixing,
        arity: Arity,
        priority: u32,
        token_defs: Vec<Arc<TokenDefinition>>,
    ) -> Result<Arc<Self>, ExprError> {
        match fixing {
            Fixing::None if token_defs.len() != 1 => {
                return Err(ExprError::InvalidDefinition {
                    message: format!("leaf element {} needs exactly one token", name),
                });
            }
            Fixing::Prefix | Fixing::Postfix => {
                if token_defs.is_empty() {
                    return Err(ExprError::InvalidDefinition {
                        message: format!("operator element {} needs at least one token", name),
                    });
                }
                if let Arity::Fixed(n) = arity {
                    if n == 0 {
                        return Err(ExprError::InvalidDefinition {
                            message: format!(
                                "operator element {} cannot take zero arguments",
                                name
                            ),
                        });
                    }
                    if token_defs.len() != 1 && token_defs.len() != n {
                        return Err(ExprError::InvalidDefinition {
                            message: format!(
                                "a {}-ary prefix or postfix element needs 1 or {} tokens",
                                n, n
                            ),
                        });
                    }
                }
            }
            Fixing::Infix => {
                if token_defs.is_empty() {
                    return Err(ExprError::InvalidDefinition {
                        message: format!("operator element {} needs at least one token", name),
                    });
                }
                if let Arity::Fixed(n) = arity {
                    if n < 2 {
                        return Err(ExprError::InvalidDefinition {
                            message: format!("infix element {} needs at least two arguments", name),
                        });
                    }
                    if token_defs.len() != 1 && token_defs.len() != n - 1 {
                        return Err(ExprError::InvalidDefinition {
                            message: format!(
                                "a {}-ary infix element needs 1 or {} tokens",
                                n,
                                n - 1
                            ),
                        });
                    }
                }
            }
            Fixing::Wrap => {
                return Err(ExprError::InvalidDefinition {
                    message: format!(
                        "element {} is wrapping; use ElementDefinition::wrapping",
                        name
                    ),
                });
            }
            _ => {}
        }
        Ok(Arc::new(ElementDefinition {
            name: name.to_string(),
            kind,
            fixing,
            arity,
            priority,
            token_defs,
            nested: false,
        }))
    }

    /// Build a wrapping definition from an open/close token pair.
    ///
    /// `nested` selects the pairing policy: a nested wrapper pairs the first
    /// open token with the outermost close token (supports nesting, rejects
    /// sibling pairs at the same level); a non-nested wrapper pairs with the
    /// nearest close token (supports siblings, rejects nesting).
    pub fn wrapping(
        name: &str,
        kind: K,
        open: Arc<TokenDefinition>,
        close: Arc<TokenDefinition>,
        priority: u32,
        nested: bool,
    ) -> Result<Arc<Self>, ExprError> {
        if Arc::ptr_eq(&open, &close) {
            return Err(ExprError::InvalidDefinition {
                message: format!(
                    "wrapping element {} needs distinct open and close tokens",
                    name
                ),
            });
        }
        Ok(Arc::new(ElementDefinition {
            name: name.to_string(),
            kind,
            fixing: Fixing::Wrap,
            arity: Arity::Variadic,
            priority,
            token_defs: vec![open, close],
            nested,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn fixing(&self) -> Fixing {
        self.fixing
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn token_defs(&self) -> &[Arc<TokenDefinition>] {
        &self.token_defs
    }

    pub fn nested(&self) -> bool {
        self.nested
    }

    /// Generic structural check on a reduced node carrying this definition.
    pub(crate) fn check_shape(&self, node: &ElementInstance<K>) -> Result<(), ExprError>
    where
        K: ElementSemantics,
    {
        let args = node.args();
        match self.fixing {
            Fixing::None => {
                let ok = args.len() == 1
                    && matches!(
                        &args[0],
                        Argument::Token(t) if Arc::ptr_eq(t.definition(), &self.token_defs[0])
                    );
                if !ok {
                    return Err(ExprError::MalformedExpression {
                        element: self.name.clone(),
                        message: "a leaf element must hold exactly its own token".to_string(),
                    });
                }
            }
            Fixing::Prefix | Fixing::Postfix | Fixing::Infix => {
                let min = if self.fixing == Fixing::Infix { 2 } else { 1 };
                let ok = match self.arity {
                    Arity::Fixed(n) => args.len() == n,
                    Arity::Variadic => args.len() >= min,
                };
                if !ok {
                    return Err(ExprError::MalformedExpression {
                        element: self.name.clone(),
                        message: format!("wrong number of arguments ({})", args.len()),
                    });
                }
                if args.iter().any(|a| matches!(a, Argument::Token(_))) {
                    return Err(ExprError::MalformedExpression {
                        element: self.name.clone(),
                        message: "operator arguments must be reduced elements".to_string(),
                    });
                }
            }
            // Kind hooks constrain wrapped content; any interior is
            // structurally valid here.
            Fixing::Wrap => {}
        }
        Ok(())
    }
}
