//! The reduction pass: splice-at-position over a flat argument array.
//!
//! `parse` sorts the element definitions by ascending priority and runs each
//! one over the root's arguments in turn. A definition scans left to right
//! for its token pattern, cuts the matched run out of the array and splices a
//! single reduced element back in its place, then continues scanning after
//! the splice point. Operator runs alternate token and argument slots, so a
//! variadic infix chain like `a||b||c` folds into one n-ary node in a single
//! pass. After every definition has run, any surviving raw token is a stray.

use crate::engine::depth::{DepthBudget, DEFAULT_DEPTH_LIMIT};
use crate::engine::element::{Arity, ElementDefinition, Fixing};
use crate::engine::error::ExprError;
use crate::engine::node::{Argument, ElementInstance};
use crate::engine::token::{TokenDefinition, TokenInstance};
use std::sync::Arc;

/// Reduce a token sequence into an expression tree using the default depth
/// limit.
pub fn parse<K>(
    tokens: Vec<TokenInstance>,
    defs: &[Arc<ElementDefinition<K>>],
) -> Result<ElementInstance<K>, ExprError> {
    parse_with_depth(tokens, defs, DEFAULT_DEPTH_LIMIT)
}

/// Reduce a token sequence into an expression tree.
///
/// Each definition gets a fresh depth budget; degenerate nesting fails with
/// `DepthLimitExceeded` instead of exhausting the real stack. The returned
/// root is fully reduced but not yet validated; `ensure_well_formed` and
/// `evaluate` perform the structural checks.
pub fn parse_with_depth<K>(
    tokens: Vec<TokenInstance>,
    defs: &[Arc<ElementDefinition<K>>],
    depth_limit: usize,
) -> Result<ElementInstance<K>, ExprError> {
    let mut ordered = defs.to_vec();
    ordered.sort_by_key(|def| def.priority());
    let mut root = ElementInstance::new(None, tokens.into_iter().map(Argument::Token).collect());
    for def in &ordered {
        root.expand(def, DepthBudget::new(depth_limit))?;
    }
    if let Some(tok) = root.find_unexpanded_token(DepthBudget::new(depth_limit))? {
        return Err(ExprError::StrayToken {
            lexeme: tok.match_text().to_string(),
            position: tok.position(),
        });
    }
    Ok(root)
}

fn arg_matches_token<K>(arg: &Argument<K>, tok_def: &Arc<TokenDefinition>) -> bool {
    matches!(arg, Argument::Token(t) if Arc::ptr_eq(t.definition(), tok_def))
}

/// Length of the run of `tok_def` tokens found at `position`, `position + 2`,
/// `position + 4`, ... (token slots of an alternating token/argument chain),
/// optionally capped at `stop_at`.
fn longest_alternate_chain<K>(
    args: &[Argument<K>],
    position: usize,
    tok_def: &Arc<TokenDefinition>,
    stop_at: Option<usize>,
) -> usize {
    let mut found = 0;
    let mut i = position;
    while i < args.len() && arg_matches_token(&args[i], tok_def) {
        if stop_at.is_some_and(|cap| found >= cap) {
            break;
        }
        found += 1;
        i += 2;
    }
    found
}

/// True when the token slots starting at `position` spell out `tok_defs` in
/// order, one definition per slot.
fn is_matching_alternate_chain<K>(
    args: &[Argument<K>],
    position: usize,
    tok_defs: &[Arc<TokenDefinition>],
) -> bool {
    let mut def_idx = 0;
    let mut i = position;
    while i < args.len() && def_idx < tok_defs.len() {
        if !arg_matches_token(&args[i], &tok_defs[def_idx]) {
            return false;
        }
        def_idx += 1;
        i += 2;
    }
    def_idx == tok_defs.len()
}

/// Length of the wrapped run starting at `position`, including both wrap
/// tokens. Returns 0 when `position` is not an opening token, 1 when the
/// opening token has no matching close.
///
/// A nested wrapper pairs with the outermost closing token (scan from the
/// end), a non-nested one with the nearest (scan forward).
fn wrapped_sequence<K>(
    args: &[Argument<K>],
    position: usize,
    def: &ElementDefinition<K>,
) -> usize {
    let open = &def.token_defs()[0];
    let close = &def.token_defs()[1];
    if !arg_matches_token(&args[position], open) {
        return 0;
    }
    let mut candidates: Box<dyn Iterator<Item = usize>> = if def.nested() {
        Box::new((position + 1..args.len()).rev())
    } else {
        Box::new(position + 1..args.len())
    };
    match candidates.find(|&i| arg_matches_token(&args[i], close)) {
        Some(i) => i - position + 1,
        None => 1,
    }
}

fn not_enough<K>(def: &ElementDefinition<K>, at: &Argument<K>) -> ExprError {
    ExprError::NotEnoughArguments {
        element: def.name().to_string(),
        position: at.start_position().unwrap_or(0),
        expected: match def.arity() {
            Arity::Fixed(n) => Some(n),
            Arity::Variadic => None,
        },
    }
}

/// Cut `removed[first]`, `removed[first + 2]`, ... out of a removed run:
/// the argument slots of an alternating chain.
fn alternate_items<K>(removed: Vec<Argument<K>>, first: usize) -> Vec<Argument<K>> {
    removed
        .into_iter()
        .enumerate()
        .filter_map(|(i, arg)| {
            if i >= first && (i - first) % 2 == 0 {
                Some(arg)
            } else {
                None
            }
        })
        .collect()
}

fn splice_prefix<K>(
    args: &mut Vec<Argument<K>>,
    first_tok: usize,
    chain_len: usize,
    def: &Arc<ElementDefinition<K>>,
) -> Result<usize, ExprError> {
    if first_tok + chain_len * 2 > args.len() {
        return Err(not_enough(def, &args[first_tok]));
    }
    let removed: Vec<_> = args
        .splice(first_tok..first_tok + chain_len * 2, std::iter::empty())
        .collect();
    let elm_args = alternate_items(removed, 1);
    args.insert(
        first_tok,
        Argument::Element(ElementInstance::new(Some(def.clone()), elm_args)),
    );
    Ok(first_tok)
}

fn splice_postfix<K>(
    args: &mut Vec<Argument<K>>,
    first_tok: usize,
    chain_len: usize,
    def: &Arc<ElementDefinition<K>>,
) -> Result<usize, ExprError> {
    if first_tok == 0 {
        return Err(not_enough(def, &args[first_tok]));
    }
    if first_tok + chain_len * 2 - 1 > args.len() {
        return Err(not_enough(def, &args[first_tok - 1]));
    }
    let removed: Vec<_> = args
        .splice(first_tok - 1..first_tok - 1 + chain_len * 2, std::iter::empty())
        .collect();
    let elm_args = alternate_items(removed, 0);
    args.insert(
        first_tok - 1,
        Argument::Element(ElementInstance::new(Some(def.clone()), elm_args)),
    );
    Ok(first_tok - 1)
}

fn splice_infix<K>(
    args: &mut Vec<Argument<K>>,
    first_tok: usize,
    chain_len: usize,
    def: &Arc<ElementDefinition<K>>,
) -> Result<usize, ExprError> {
    if first_tok == 0 {
        return Err(not_enough(def, &args[first_tok]));
    }
    if first_tok + chain_len * 2 > args.len() {
        return Err(not_enough(def, &args[first_tok - 1]));
    }
    let removed: Vec<_> = args
        .splice(
            first_tok - 1..first_tok - 1 + chain_len * 2 + 1,
            std::iter::empty(),
        )
        .collect();
    let elm_args = alternate_items(removed, 0);
    args.insert(
        first_tok - 1,
        Argument::Element(ElementInstance::new(Some(def.clone()), elm_args)),
    );
    Ok(first_tok - 1)
}

fn splice_wrap<K>(
    args: &mut Vec<Argument<K>>,
    first_tok: usize,
    seq_len: usize,
    def: &Arc<ElementDefinition<K>>,
) -> usize {
    let mut removed: Vec<_> = args
        .splice(first_tok..first_tok + seq_len, std::iter::empty())
        .collect();
    // Drop the wrap tokens themselves, keep the interior.
    removed.pop();
    removed.remove(0);
    args.insert(
        first_tok,
        Argument::Element(ElementInstance::new(Some(def.clone()), removed)),
    );
    first_tok
}

fn splice_none<K>(
    args: &mut Vec<Argument<K>>,
    position: usize,
    def: &Arc<ElementDefinition<K>>,
) -> usize {
    let removed: Vec<_> = args
        .splice(position..position + 1, std::iter::empty())
        .collect();
    args.insert(
        position,
        Argument::Element(ElementInstance::new(Some(def.clone()), removed)),
    );
    position
}

/// Try to reduce one occurrence of `def` at `position`. On success returns
/// the index of the spliced-in element, so the caller resumes scanning right
/// after it.
fn try_splice_at<K>(
    args: &mut Vec<Argument<K>>,
    position: usize,
    def: &Arc<ElementDefinition<K>>,
) -> Result<Option<usize>, ExprError> {
    match def.fixing() {
        Fixing::None => {
            if arg_matches_token(&args[position], &def.token_defs()[0]) {
                return Ok(Some(splice_none(args, position, def)));
            }
        }
        Fixing::Prefix => match def.arity() {
            Arity::Variadic => {
                let chain = longest_alternate_chain(args, position, &def.token_defs()[0], None);
                if chain > 0 {
                    return splice_prefix(args, position, chain, def).map(Some);
                }
            }
            Arity::Fixed(n) => {
                if def.token_defs().len() == 1 {
                    let chain =
                        longest_alternate_chain(args, position, &def.token_defs()[0], Some(n));
                    if chain == n {
                        return splice_prefix(args, position, chain, def).map(Some);
                    }
                } else if is_matching_alternate_chain(args, position, def.token_defs()) {
                    return splice_prefix(args, position, n, def).map(Some);
                }
            }
        },
        Fixing::Postfix => match def.arity() {
            Arity::Variadic => {
                let chain =
                    longest_alternate_chain(args, position + 1, &def.token_defs()[0], None);
                if chain > 0 {
                    return splice_postfix(args, position + 1, chain, def).map(Some);
                }
            }
            Arity::Fixed(n) => {
                if def.token_defs().len() == 1 {
                    let chain =
                        longest_alternate_chain(args, position + 1, &def.token_defs()[0], Some(n));
                    if chain == n {
                        return splice_postfix(args, position + 1, chain, def).map(Some);
                    }
                } else if is_matching_alternate_chain(args, position + 1, def.token_defs()) {
                    return splice_postfix(args, position + 1, n, def).map(Some);
                }
            }
        },
        Fixing::Infix => match def.arity() {
            Arity::Variadic => {
                let chain =
                    longest_alternate_chain(args, position + 1, &def.token_defs()[0], None);
                if chain > 0 {
                    return splice_infix(args, position + 1, chain, def).map(Some);
                }
            }
            Arity::Fixed(n) => {
                if def.token_defs().len() == 1 {
                    let chain =
                        longest_alternate_chain(args, position + 1, &def.token_defs()[0], Some(n));
                    if chain == n - 1 {
                        return splice_infix(args, position + 1, chain, def).map(Some);
                    }
                } else if is_matching_alternate_chain(args, position + 1, def.token_defs()) {
                    return splice_infix(args, position + 1, n - 1, def).map(Some);
                }
            }
        },
        Fixing::Wrap => {
            let seq = wrapped_sequence(args, position, def);
            if seq >= 2 {
                return Ok(Some(splice_wrap(args, position, seq, def)));
            }
            if seq == 1 {
                return Err(ExprError::UnmatchedWrapper {
                    element: def.name().to_string(),
                    position: args[position].start_position().unwrap_or(0),
                    expected: def.token_defs()[1].to_string(),
                });
            }
        }
    }
    Ok(None)
}

/// One left-to-right reduction pass of `def` over an argument array.
pub(crate) fn splice_instances_in<K>(
    args: &mut Vec<Argument<K>>,
    def: &Arc<ElementDefinition<K>>,
) -> Result<(), ExprError> {
    let mut i = 0;
    while i < args.len() {
        if let Some(new_pos) = try_splice_at(args, i, def)? {
            i = new_pos;
        }
        i += 1;
    }
    Ok(())
}
