//! The access-expression grammar: six elements over seven token classes.
//!
//! | element | spelling        | fixing | priority |
//! |---------|-----------------|--------|----------|
//! | Literal | `\w+` or `"…"`  | leaf   | 0        |
//! | SubExpr | `( … )`         | wrap   | 1        |
//! | InGroup | `@name`         | prefix | 2        |
//! | Not     | `!expr`         | prefix | 3        |
//! | And     | `a && b`        | infix  | 4        |
//! | Or      | `a || b`, `a,b` | infix  | 5        |
//!
//! Literals reduce first so that operators always see reduced arguments;
//! disjunction reduces last and therefore binds loosest. The comma is an
//! alias spelling of `||` and re-serializes as `||`.

use crate::authex::context::EvaluationContext;
use crate::engine::{
    parse, parse_with_depth, tokenize, ElementDefinition, ElementInstance, ElementSemantics,
    ExprError, Fixing, TokenDefinition, TokenInstance, Value,
};
use crate::engine::{Argument, DepthBudget};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// A reduced access expression, ready to validate and evaluate.
pub type AccessExpression = ElementInstance<AccessOp>;

/// The closed set of access-expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Literal,
    SubExpr,
    InGroup,
    Not,
    And,
    Or,
}

/// Strip the quoted form of a literal lexeme, resolving backslash escapes.
/// Bare `\w+` lexemes pass through unchanged.
fn literal_text(raw: &str) -> String {
    let inner = match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) if raw.len() >= 2 => inner,
        _ => return raw.to_string(),
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn invalid(node: &AccessExpression, message: &str) -> ExprError {
    ExprError::InvalidExpression {
        element: node.name().to_string(),
        message: message.to_string(),
    }
}

impl ElementSemantics for AccessOp {
    type Context = dyn EvaluationContext;

    fn ensure_well_formed(&self, node: &ElementInstance<Self>) -> Result<(), ExprError> {
        match self {
            AccessOp::SubExpr => {
                if node.args().len() != 1 {
                    return Err(ExprError::MalformedExpression {
                        element: node.name().to_string(),
                        message: "a subexpression must have exactly one root".to_string(),
                    });
                }
            }
            AccessOp::InGroup => {
                let is_literal = matches!(
                    node.args().first(),
                    Some(Argument::Element(e))
                        if e.definition().map(|d| *d.kind()) == Some(AccessOp::Literal)
                );
                if !is_literal {
                    return Err(ExprError::MalformedExpression {
                        element: node.name().to_string(),
                        message: "the group operator takes exactly one literal argument"
                            .to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn evaluate(
        &self,
        node: &ElementInstance<Self>,
        ctx: &Self::Context,
        budget: DepthBudget,
    ) -> Result<Value, ExprError> {
        match self {
            AccessOp::Literal => {
                let user = literal_text(&node.string_value());
                Ok(Value::Bool(ctx.is_user(&user)))
            }
            AccessOp::SubExpr => node.evaluate_arg(0, ctx, budget),
            AccessOp::InGroup => {
                // string_value sees only the literal; the @ token was
                // consumed by the reduction.
                let group = literal_text(&node.string_value());
                Ok(Value::Bool(ctx.belongs_to_group(&group)))
            }
            AccessOp::Not => match node.evaluate_arg(0, ctx, budget)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                Value::Empty => Err(invalid(node, "negation of a non-boolean argument")),
            },
            AccessOp::And => {
                for idx in 0..node.args().len() {
                    match node.evaluate_arg(idx, ctx, budget)? {
                        Value::Bool(false) => return Ok(Value::Bool(false)),
                        Value::Bool(true) => {}
                        Value::Empty => {
                            return Err(invalid(node, "conjunction of non-boolean arguments"))
                        }
                    }
                }
                Ok(Value::Bool(true))
            }
            AccessOp::Or => {
                for idx in 0..node.args().len() {
                    match node.evaluate_arg(idx, ctx, budget)? {
                        Value::Bool(true) => return Ok(Value::Bool(true)),
                        Value::Bool(false) => {}
                        Value::Empty => {
                            return Err(invalid(node, "disjunction of non-boolean arguments"))
                        }
                    }
                }
                Ok(Value::Bool(false))
            }
        }
    }
}

/// An immutable grammar table: element definitions plus the token definitions
/// they use, in tokenizer precedence order.
#[derive(Debug)]
pub struct Grammar {
    elements: Vec<Arc<ElementDefinition<AccessOp>>>,
    tokens: Vec<Arc<TokenDefinition>>,
    strip: Vec<Arc<TokenDefinition>>,
}

impl Grammar {
    /// Build the access-expression grammar table.
    pub fn access_expressions() -> Result<Self, ExprError> {
        let lit = TokenDefinition::new(None, "LIT", r#"\w+|"(?:[^"\\]|\\.)*""#)?;
        let open = TokenDefinition::literal("(", "OPENP")?;
        let close = TokenDefinition::literal(")", "CLOSEP")?;
        let at = TokenDefinition::literal("@", "AT")?;
        let excl = TokenDefinition::literal("!", "EXCL")?;
        let and = TokenDefinition::literal("&&", "AND")?;
        let or = TokenDefinition::new(Some("||"), "OR", r"\|\||,")?;
        let space = TokenDefinition::new(Some(" "), "SPC", r"\s+")?;

        let elements = vec![
            ElementDefinition::new("Literal", AccessOp::Literal, Fixing::None, 0, vec![lit.clone()])?,
            ElementDefinition::wrapping(
                "SubExpr",
                AccessOp::SubExpr,
                open.clone(),
                close.clone(),
                1,
                true,
            )?,
            ElementDefinition::new("InGroup", AccessOp::InGroup, Fixing::Prefix, 2, vec![at.clone()])?,
            ElementDefinition::new("Not", AccessOp::Not, Fixing::Prefix, 3, vec![excl.clone()])?,
            ElementDefinition::new("And", AccessOp::And, Fixing::Infix, 4, vec![and.clone()])?,
            ElementDefinition::new("Or", AccessOp::Or, Fixing::Infix, 5, vec![or.clone()])?,
        ];
        Ok(Grammar {
            elements,
            strip: vec![space.clone()],
            tokens: vec![space, lit, open, close, at, excl, and, or],
        })
    }

    pub fn elements(&self) -> &[Arc<ElementDefinition<AccessOp>>] {
        &self.elements
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<TokenInstance>, ExprError> {
        tokenize(text, &self.tokens, &self.strip)
    }

    pub fn parse(&self, text: &str) -> Result<AccessExpression, ExprError> {
        parse(self.tokenize(text)?, &self.elements)
    }

    pub fn parse_with_depth(
        &self,
        text: &str,
        depth_limit: usize,
    ) -> Result<AccessExpression, ExprError> {
        parse_with_depth(self.tokenize(text)?, &self.elements, depth_limit)
    }
}

static DEFAULT_GRAMMAR: Lazy<Grammar> =
    Lazy::new(|| Grammar::access_expressions().expect("builtin grammar table is valid"));

/// The shared default grammar table.
pub fn access_grammar() -> &'static Grammar {
    &DEFAULT_GRAMMAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authex::context::AccessContext;

    fn eval(text: &str, ctx: &AccessContext) -> Result<Value, ExprError> {
        access_grammar().parse(text)?.evaluate(ctx)
    }

    #[test]
    fn test_precedence_not_binds_tighter_than_and() {
        let ctx = AccessContext::with_identity("alice", ["staff"]);
        assert_eq!(
            eval("!bob && alice", &ctx).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_comma_is_an_alias_for_or() {
        let root = access_grammar().parse("a, b").unwrap();
        let Argument::Element(or) = &root.args()[0] else {
            panic!("expected element");
        };
        assert_eq!(or.name(), "Or");
        assert_eq!(root.representation().unwrap(), "a||b");
    }

    #[test]
    fn test_representation_restores_canonical_spelling() {
        let root = access_grammar().parse("  ! @staff  && alice ").unwrap();
        assert_eq!(root.representation().unwrap(), "!@staff&&alice");
    }

    #[test]
    fn test_group_operator_requires_literal_argument() {
        let root = access_grammar().parse("@(staff)").unwrap();
        assert!(matches!(
            root.ensure_well_formed(),
            Err(ExprError::MalformedExpression { element, .. }) if element == "InGroup"
        ));
    }

    #[test]
    fn test_empty_subexpression_is_malformed() {
        let root = access_grammar().parse("()").unwrap();
        assert!(matches!(
            root.ensure_well_formed(),
            Err(ExprError::MalformedExpression { element, .. }) if element == "SubExpr"
        ));
    }

    #[test]
    fn test_quoted_literal_unescapes_for_lookup() {
        let ctx = AccessContext::with_identity(r#"we"ird"#, Vec::<String>::new());
        assert_eq!(
            eval(r#""we\"ird""#, &ctx).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_quoted_literal_keeps_raw_lexeme_in_string_value() {
        let root = access_grammar().parse(r#""a b""#).unwrap();
        assert_eq!(root.string_value(), r#""a b""#);
    }

    #[test]
    fn test_literal_text_passthrough_for_bare_words() {
        assert_eq!(literal_text("alice"), "alice");
        assert_eq!(literal_text(r#""a\\b""#), r"a\b");
    }
}
