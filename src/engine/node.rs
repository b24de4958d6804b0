//! The expression tree.
//!
//! Reduction works in place on a flat argument array: the root starts out
//! holding every token as an `Argument::Token`, and each expansion pass
//! splices matched runs into `Argument::Element` nodes until only elements
//! remain. The same `ElementInstance` type serves as the root (no definition)
//! and as every reduced operator node (a definition plus its arguments).

use crate::engine::depth::DepthBudget;
use crate::engine::element::{ElementDefinition, ElementSemantics, Fixing, Value};
use crate::engine::error::ExprError;
use crate::engine::reduce;
use crate::engine::token::TokenInstance;
use std::fmt::Write as _;
use std::sync::Arc;

/// One slot of an instance's argument array: either a raw token awaiting
/// reduction, or an already reduced element.
#[derive(Debug, Clone)]
pub enum Argument<K> {
    Token(TokenInstance),
    Element(ElementInstance<K>),
}

impl<K> Argument<K> {
    /// Codepoint offset of the leftmost token under this argument, used to
    /// anchor error messages.
    pub fn start_position(&self) -> Option<usize> {
        match self {
            Argument::Token(t) => Some(t.position()),
            Argument::Element(e) => e.args().iter().find_map(Argument::start_position),
        }
    }
}

/// A node of the expression tree.
///
/// The root carries no definition and at most one argument once reduction
/// finishes; every other node carries the `ElementDefinition` it was reduced
/// by. Leaf nodes keep their matched token as their single argument.
#[derive(Debug, Clone)]
pub struct ElementInstance<K> {
    definition: Option<Arc<ElementDefinition<K>>>,
    args: Vec<Argument<K>>,
}

impl<K> ElementInstance<K> {
    pub fn new(definition: Option<Arc<ElementDefinition<K>>>, args: Vec<Argument<K>>) -> Self {
        ElementInstance { definition, args }
    }

    pub fn definition(&self) -> Option<&Arc<ElementDefinition<K>>> {
        self.definition.as_ref()
    }

    pub fn args(&self) -> &[Argument<K>] {
        &self.args
    }

    pub fn name(&self) -> &str {
        match &self.definition {
            Some(def) => def.name(),
            None => "root",
        }
    }

    /// True once no raw token is left anywhere below this node. Leaf elements
    /// legitimately hold their own token and count as expanded.
    pub fn is_expanded(&self) -> bool {
        if let Some(def) = &self.definition {
            if def.fixing() == Fixing::None {
                return true;
            }
        }
        self.args.iter().all(|arg| match arg {
            Argument::Token(_) => false,
            Argument::Element(e) => e.is_expanded(),
        })
    }

    /// Run one definition's reduction pass over this subtree.
    pub(crate) fn expand(
        &mut self,
        def: &Arc<ElementDefinition<K>>,
        budget: DepthBudget,
    ) -> Result<(), ExprError> {
        let budget = budget.descend()?;
        if self.is_expanded() {
            return Ok(());
        }
        reduce::splice_instances_in(&mut self.args, def)?;
        for arg in &mut self.args {
            if let Argument::Element(child) = arg {
                child.expand(def, budget)?;
            }
        }
        Ok(())
    }

    /// First raw token that survived every reduction pass, if any.
    pub(crate) fn find_unexpanded_token(
        &self,
        budget: DepthBudget,
    ) -> Result<Option<&TokenInstance>, ExprError> {
        let budget = budget.descend()?;
        if self.is_expanded() {
            return Ok(None);
        }
        for arg in &self.args {
            match arg {
                Argument::Token(t) => return Ok(Some(t)),
                Argument::Element(e) => {
                    if let Some(t) = e.find_unexpanded_token(budget)? {
                        return Ok(Some(t));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Concatenation of every token match below this node, in source order.
    pub fn string_value(&self) -> String {
        let mut out = String::new();
        self.collect_string_value(&mut out);
        out
    }

    fn collect_string_value(&self, out: &mut String) {
        for arg in &self.args {
            match arg {
                Argument::Token(t) => out.push_str(t.match_text()),
                Argument::Element(e) => e.collect_string_value(out),
            }
        }
    }

    /// Canonical textual form of the reduced tree. Operator tokens are
    /// re-emitted from their definitions' canonical spellings, so aliases
    /// normalize (e.g. a comma-spelled disjunction prints as `||`) and
    /// stripped whitespace does not reappear.
    pub fn representation(&self) -> Result<String, ExprError> {
        self.representation_with_depth(DepthBudget::default())
    }

    pub fn representation_with_depth(&self, budget: DepthBudget) -> Result<String, ExprError> {
        let mut out = String::new();
        self.write_representation(&mut out, budget)?;
        Ok(out)
    }

    fn write_representation(&self, out: &mut String, budget: DepthBudget) -> Result<(), ExprError> {
        let budget = budget.descend()?;
        let def = match &self.definition {
            None => {
                for arg in &self.args {
                    write_argument_representation(arg, out, budget)?;
                }
                return Ok(());
            }
            Some(def) => def,
        };
        match def.fixing() {
            Fixing::None => {
                for arg in &self.args {
                    write_argument_representation(arg, out, budget)?;
                }
            }
            Fixing::Prefix => {
                for (i, arg) in self.args.iter().enumerate() {
                    out.push_str(token_spelling(def, i));
                    write_argument_representation(arg, out, budget)?;
                }
            }
            Fixing::Postfix => {
                for (i, arg) in self.args.iter().enumerate() {
                    write_argument_representation(arg, out, budget)?;
                    out.push_str(token_spelling(def, i));
                }
            }
            Fixing::Infix => {
                for (i, arg) in self.args.iter().enumerate() {
                    write_argument_representation(arg, out, budget)?;
                    if i + 1 < self.args.len() {
                        out.push_str(token_spelling(def, i));
                    }
                }
            }
            Fixing::Wrap => {
                out.push_str(token_spelling(def, 0));
                for arg in &self.args {
                    write_argument_representation(arg, out, budget)?;
                }
                out.push_str(token_spelling(def, 1));
            }
        }
        Ok(())
    }

    /// Indented textual dump of the tree, one node or token per line.
    pub fn tree_string(&self) -> Result<String, ExprError> {
        self.tree_string_with_depth(DepthBudget::default())
    }

    pub fn tree_string_with_depth(&self, budget: DepthBudget) -> Result<String, ExprError> {
        let mut out = String::new();
        self.write_tree(&mut out, 0, budget)?;
        Ok(out)
    }

    fn write_tree(
        &self,
        out: &mut String,
        indent: usize,
        budget: DepthBudget,
    ) -> Result<(), ExprError> {
        let budget = budget.descend()?;
        let _ = writeln!(out, "{:indent$}{}", "", self.name(), indent = indent);
        for arg in &self.args {
            match arg {
                Argument::Token(t) => {
                    let _ = writeln!(out, "{:indent$}{}", "", t, indent = indent + 2);
                }
                Argument::Element(e) => e.write_tree(out, indent + 2, budget)?,
            }
        }
        Ok(())
    }
}

fn token_spelling<K>(def: &ElementDefinition<K>, idx: usize) -> &str {
    let defs = def.token_defs();
    let tok = if defs.len() == 1 { &defs[0] } else { &defs[idx.min(defs.len() - 1)] };
    tok.representation().unwrap_or("")
}

fn write_argument_representation<K>(
    arg: &Argument<K>,
    out: &mut String,
    budget: DepthBudget,
) -> Result<(), ExprError> {
    match arg {
        Argument::Token(t) => {
            out.push_str(t.match_text());
            Ok(())
        }
        Argument::Element(e) => e.write_representation(out, budget),
    }
}

impl<K: ElementSemantics> ElementInstance<K> {
    fn ensure_own_shape(&self) -> Result<(), ExprError> {
        match &self.definition {
            None => {
                if self.args.len() > 1 {
                    return Err(ExprError::MalformedExpression {
                        element: "root".to_string(),
                        message: format!(
                            "{} sibling expressions at the top level",
                            self.args.len()
                        ),
                    });
                }
                Ok(())
            }
            Some(def) => {
                def.check_shape(self)?;
                def.kind().ensure_well_formed(self)
            }
        }
    }

    /// Validate the whole tree structurally: arity per definition, the root
    /// holding at most one expression, and kind-specific constraints.
    pub fn ensure_well_formed(&self) -> Result<(), ExprError> {
        self.ensure_well_formed_with_depth(DepthBudget::default())
    }

    pub fn ensure_well_formed_with_depth(&self, budget: DepthBudget) -> Result<(), ExprError> {
        let budget = budget.descend()?;
        self.ensure_own_shape()?;
        for arg in &self.args {
            if let Argument::Element(e) = arg {
                e.ensure_well_formed_with_depth(budget)?;
            }
        }
        Ok(())
    }

    /// Evaluate the tree against a context. Validation runs along the way,
    /// so an ill-formed tree fails here with the same errors
    /// `ensure_well_formed` would raise.
    pub fn evaluate(&self, ctx: &K::Context) -> Result<Value, ExprError> {
        self.evaluate_with_depth(ctx, DepthBudget::default())
    }

    pub fn evaluate_with_depth(
        &self,
        ctx: &K::Context,
        budget: DepthBudget,
    ) -> Result<Value, ExprError> {
        let budget = budget.descend()?;
        self.ensure_own_shape()?;
        match &self.definition {
            None => match self.args.first() {
                None => Ok(Value::Empty),
                Some(arg) => evaluate_argument(self, arg, ctx, budget),
            },
            Some(def) => def.kind().evaluate(self, ctx, budget),
        }
    }

    /// Evaluate one argument of this node; kinds call this from their
    /// `evaluate` hooks.
    pub fn evaluate_arg(
        &self,
        idx: usize,
        ctx: &K::Context,
        budget: DepthBudget,
    ) -> Result<Value, ExprError> {
        match self.args.get(idx) {
            Some(arg) => evaluate_argument(self, arg, ctx, budget),
            None => Err(ExprError::InvalidExpression {
                element: self.name().to_string(),
                message: format!("missing argument {}", idx),
            }),
        }
    }
}

fn evaluate_argument<K: ElementSemantics>(
    parent: &ElementInstance<K>,
    arg: &Argument<K>,
    ctx: &K::Context,
    budget: DepthBudget,
) -> Result<Value, ExprError> {
    match arg {
        Argument::Element(e) => e.evaluate_with_depth(ctx, budget),
        Argument::Token(t) => Err(ExprError::InvalidExpression {
            element: parent.name().to_string(),
            message: format!("argument {} is an unreduced token", t),
        }),
    }
}
