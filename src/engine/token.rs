//! Token model and tokenizer.
//!
//! Tokenizing is driven entirely by data: a priority-ordered list of
//! `TokenDefinition`s, each with a regex matcher tried at the current offset.
//! The scan is greedy and strict:
//! 1. At each offset, definitions are tried in list order; the first whose
//!    matcher succeeds at that exact offset wins. A match that starts later
//!    is rejected, so no input is ever skipped.
//! 2. Definitions listed in the strip set (whitespace) are consumed but not
//!    emitted.
//! 3. If nothing matches, tokenizing fails with `UnknownToken` at the
//!    offending offset.
//!
//! Positions and lengths are counted in codepoints, never bytes, so that
//! substring extraction stays stable for multi-byte input.

use crate::engine::error::ExprError;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// An immutable description of one lexical category.
///
/// Two definitions are equal by identity (`Arc::ptr_eq`), not by content;
/// the same definition value is shared between the grammar table and every
/// token instance it produces.
#[derive(Debug)]
pub struct TokenDefinition {
    representation: Option<String>,
    name: String,
    matcher: Regex,
}

impl TokenDefinition {
    /// Build a definition from an explicit regex pattern.
    ///
    /// `representation` is the canonical text re-emitted by
    /// `ElementInstance::representation`; classes without a single canonical
    /// spelling (e.g. literals) pass `None`.
    pub fn new(
        representation: Option<&str>,
        name: &str,
        pattern: &str,
    ) -> Result<Arc<Self>, ExprError> {
        let matcher = Regex::new(pattern).map_err(|e| ExprError::InvalidDefinition {
            message: format!("token {} has an invalid pattern: {}", name, e),
        })?;
        Ok(Arc::new(TokenDefinition {
            representation: representation.map(str::to_string),
            name: name.to_string(),
            matcher,
        }))
    }

    /// Build a definition that matches a fixed piece of text.
    pub fn literal(representation: &str, name: &str) -> Result<Arc<Self>, ExprError> {
        Self::new(Some(representation), name, &regex::escape(representation))
    }

    pub fn representation(&self) -> Option<&str> {
        self.representation.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Try to match this definition at the given byte offset.
    ///
    /// Returns the byte length of the match, or `None` if the matcher does
    /// not succeed exactly at the offset. Zero-length matches are rejected;
    /// they would stall the scan.
    pub(crate) fn try_match(&self, text: &str, byte_pos: usize) -> Option<usize> {
        let m = self.matcher.find(&text[byte_pos..])?;
        if m.start() != 0 || m.is_empty() {
            return None;
        }
        Some(m.end())
    }
}

impl fmt::Display for TokenDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

/// A concrete match produced by the tokenizer: a definition plus where in the
/// source it occurred. Immutable once created.
#[derive(Debug, Clone)]
pub struct TokenInstance {
    definition: Arc<TokenDefinition>,
    text: Arc<str>,
    position: usize,
    length: usize,
    byte_start: usize,
    byte_end: usize,
}

impl TokenInstance {
    pub fn definition(&self) -> &Arc<TokenDefinition> {
        &self.definition
    }

    /// The full source text the token was cut from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Start offset in codepoints.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Length in codepoints.
    pub fn length(&self) -> usize {
        self.length
    }

    /// The matched substring.
    pub fn match_text(&self) -> &str {
        &self.text[self.byte_start..self.byte_end]
    }
}

impl fmt::Display for TokenInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}>", self.definition.name(), self.match_text())
    }
}

fn is_stripped(def: &Arc<TokenDefinition>, strip_defs: &[Arc<TokenDefinition>]) -> bool {
    strip_defs.iter().any(|s| Arc::ptr_eq(s, def))
}

/// Convert raw text into an ordered token sequence.
///
/// Definitions are tried in `token_defs` order at every offset; matches of
/// definitions listed in `strip_defs` advance the scan without being emitted.
pub fn tokenize(
    text: &str,
    token_defs: &[Arc<TokenDefinition>],
    strip_defs: &[Arc<TokenDefinition>],
) -> Result<Vec<TokenInstance>, ExprError> {
    let shared: Arc<str> = Arc::from(text);
    let mut instances = Vec::new();
    let mut byte_pos = 0;
    let mut char_pos = 0;

    while byte_pos < text.len() {
        let matched = token_defs
            .iter()
            .find_map(|def| def.try_match(text, byte_pos).map(|len| (def, len)));

        let (def, byte_len) = match matched {
            Some(found) => found,
            None => {
                return Err(ExprError::UnknownToken {
                    position: char_pos,
                    snippet: text[byte_pos..].chars().take(4).collect(),
                });
            }
        };

        let char_len = text[byte_pos..byte_pos + byte_len].chars().count();
        if !is_stripped(def, strip_defs) {
            instances.push(TokenInstance {
                definition: Arc::clone(def),
                text: Arc::clone(&shared),
                position: char_pos,
                length: char_len,
                byte_start: byte_pos,
                byte_end: byte_pos + byte_len,
            });
        }
        byte_pos += byte_len;
        char_pos += char_len;
    }

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word() -> Arc<TokenDefinition> {
        TokenDefinition::new(None, "WORD", r"\w+").unwrap()
    }

    fn space() -> Arc<TokenDefinition> {
        TokenDefinition::new(Some(" "), "SPC", r"\s+").unwrap()
    }

    #[test]
    fn test_tokenize_strips_whitespace() {
        let space = space();
        let word = word();
        let defs = vec![space.clone(), word.clone()];
        let tokens = tokenize("foo  bar", &defs, &[space]).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].match_text(), "foo");
        assert_eq!(tokens[1].match_text(), "bar");
        assert_eq!(tokens[1].position(), 5);
    }

    #[test]
    fn test_tokenize_positions_are_codepoints() {
        let space = space();
        let word = word();
        let defs = vec![space.clone(), word.clone()];
        let tokens = tokenize("über zä", &defs, &[space]).unwrap();
        assert_eq!(tokens[0].match_text(), "über");
        assert_eq!(tokens[0].length(), 4);
        assert_eq!(tokens[1].position(), 5);
        assert_eq!(tokens[1].match_text(), "zä");
    }

    #[test]
    fn test_tokenize_unknown_token_reports_offset() {
        let space = space();
        let word = word();
        let defs = vec![space.clone(), word.clone()];
        let err = tokenize("ok ?rest", &defs, &[space]).unwrap_err();
        assert_eq!(
            err,
            ExprError::UnknownToken {
                position: 3,
                snippet: "?res".to_string(),
            }
        );
    }

    #[test]
    fn test_first_listed_definition_wins() {
        let ab = TokenDefinition::literal("ab", "AB").unwrap();
        let a = TokenDefinition::literal("a", "A").unwrap();
        let defs = vec![ab.clone(), a.clone()];
        let tokens = tokenize("ab", &defs, &[]).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(Arc::ptr_eq(tokens[0].definition(), &ab));
    }

    #[test]
    fn test_match_must_start_at_offset() {
        // "b" occurs later in the input, but a match that does not start at
        // the current offset must be rejected rather than skipping input.
        let b = TokenDefinition::literal("b", "B").unwrap();
        let err = tokenize("ab", &[b], &[]).unwrap_err();
        assert!(matches!(err, ExprError::UnknownToken { position: 0, .. }));
    }

    #[test]
    fn test_zero_length_match_is_rejected() {
        let empty = TokenDefinition::new(None, "EMPTY", r"x*").unwrap();
        let err = tokenize("y", &[empty], &[]).unwrap_err();
        assert!(matches!(err, ExprError::UnknownToken { .. }));
    }

    #[test]
    fn test_empty_input_yields_no_tokens() {
        let tokens = tokenize("", &[word()], &[]).unwrap();
        assert!(tokens.is_empty());
    }
}
