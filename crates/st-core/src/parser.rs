//! Parser for bracket notation → SyntaxTree.
//!
//! Built on `winnow` 0.7 for the lexemes. Grammar:
//!
//! ```text
//! tree := '[' label ws (tree | word)* ']'
//! ```
//!
//! Brackets are tracked on an explicit stack, so nesting depth is bounded
//! by memory rather than by the call stack. Only the bracket syntax is
//! validated: any label spelling is accepted and kept verbatim.

use crate::model::{StructuralViolation, SyntaxNode, SyntaxTree};
use petgraph::graph::NodeIndex;
use winnow::ascii::multispace0;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_till;

// ─── Errors ──────────────────────────────────────────────────────────────

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("nothing to parse")]
    Empty,
    #[error("expected `[`")]
    ExpectedOpenBracket,
    #[error("missing label after `[`")]
    EmptyLabel,
    #[error("illegal character `{0}` in label")]
    IllegalLabelChar(char),
    #[error("missing `]` for the bracket opened at {opened_at}")]
    UnclosedBracket { opened_at: usize },
    #[error("unexpected `]`")]
    UnexpectedCloseBracket,
    #[error("unexpected text after the closing bracket")]
    TrailingInput,
    #[error("bracket describes an invalid tree: {0}")]
    InvalidStructure(#[from] StructuralViolation),
}

/// Malformed bracket text. `offset` counts characters, not bytes, so hosts
/// can point at it in a text field directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} (at character {offset})")]
pub struct ParseError {
    pub offset: usize,
    pub kind: ParseErrorKind,
}

// ─── Public API ──────────────────────────────────────────────────────────

/// Parse a bracket-notation string into a `SyntaxTree` with a single
/// main root. On failure nothing is returned but the error.
#[must_use = "parsing result should be used"]
pub fn parse_bracket(input: &str) -> Result<SyntaxTree, ParseError> {
    let mut parser = BracketParser {
        src: input,
        rest: input,
        tree: SyntaxTree::new(),
        open: Vec::new(),
    };
    parser.run()?;
    log::debug!(
        "parsed bracket notation into {} nodes",
        parser.tree.node_count()
    );
    Ok(parser.tree)
}

/// Characters allowed in a category label besides letters and digits.
const LABEL_PUNCT: &[char] = &['-', '_', '\'', '.', '=', '$'];

pub fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || LABEL_PUNCT.contains(&c)
}

/// Characters that end a label or a word.
pub fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '[' || c == ']'
}

// ─── Low-level parsers ──────────────────────────────────────────────────

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_ws(input: &mut &str) {
    let _: Result<&str, ErrMode<ContextError>> = multispace0.parse_next(input);
}

/// A run of non-delimiter characters (possibly empty).
fn token<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_till(0.., is_delimiter).parse_next(input)
}

// ─── Bracket walker ─────────────────────────────────────────────────────

struct BracketParser<'a> {
    src: &'a str,
    rest: &'a str,
    tree: SyntaxTree,
    /// Open brackets: node and byte offset of its `[`.
    open: Vec<(NodeIndex, usize)>,
}

impl<'a> BracketParser<'a> {
    fn byte_pos(&self) -> usize {
        self.src.len() - self.rest.len()
    }

    fn char_offset(&self, byte: usize) -> usize {
        self.src[..byte].chars().count()
    }

    fn error_at(&self, byte: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            offset: self.char_offset(byte),
            kind,
        }
    }

    fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        self.error_at(self.byte_pos(), kind)
    }

    fn run(&mut self) -> Result<(), ParseError> {
        skip_ws(&mut self.rest);
        if self.rest.is_empty() {
            return Err(self.error_here(ParseErrorKind::Empty));
        }
        if !self.rest.starts_with('[') {
            return Err(self.error_here(ParseErrorKind::ExpectedOpenBracket));
        }

        loop {
            skip_ws(&mut self.rest);

            if self.open.is_empty() && self.tree.root.is_some() {
                return match self.rest.chars().next() {
                    None => Ok(()),
                    Some(']') => Err(self.error_here(ParseErrorKind::UnexpectedCloseBracket)),
                    Some(_) => Err(self.error_here(ParseErrorKind::TrailingInput)),
                };
            }

            match self.rest.chars().next() {
                None => {
                    let opened_at = self.open.last().map(|&(_, at)| at).unwrap_or(0);
                    let opened_at = self.char_offset(opened_at);
                    return Err(self.error_here(ParseErrorKind::UnclosedBracket { opened_at }));
                }
                Some('[') => self.open_bracket()?,
                Some(']') => {
                    self.open.pop();
                    self.rest = &self.rest[1..];
                }
                Some(_) => self.word()?,
            }
        }
    }

    fn open_bracket(&mut self) -> Result<(), ParseError> {
        let opened_at = self.byte_pos();
        self.rest = &self.rest[1..];

        let label_at = self.byte_pos();
        let label = token.parse_next(&mut self.rest).unwrap_or_default();
        if label.is_empty() {
            return Err(self.error_at(label_at, ParseErrorKind::EmptyLabel));
        }
        if let Some((i, c)) = label.char_indices().find(|&(_, c)| !is_label_char(c)) {
            return Err(self.error_at(label_at + i, ParseErrorKind::IllegalLabelChar(c)));
        }

        let node = SyntaxNode::category(label);
        let idx = match self.open.last() {
            Some(&(parent, _)) => self
                .tree
                .add_child(parent, node)
                .map_err(|e| self.error_at(opened_at, e.into()))?,
            None => self.tree.add_root(node),
        };
        self.open.push((idx, opened_at));
        Ok(())
    }

    fn word(&mut self) -> Result<(), ParseError> {
        let at = self.byte_pos();
        let word = token.parse_next(&mut self.rest).unwrap_or_default();
        let Some(&(parent, _)) = self.open.last() else {
            return Err(self.error_at(at, ParseErrorKind::TrailingInput));
        };
        self.tree
            .add_child(parent, SyntaxNode::terminal(word))
            .map_err(|e| self.error_at(at, e.into()))?;
        Ok(())
    }
}
