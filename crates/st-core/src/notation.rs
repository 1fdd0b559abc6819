//! Diagram lists: batches of named bracket strings.
//!
//! One entry per line, `name | bracket`. Blank lines and `#` comments are
//! skipped, as are lines without a `|`. Entries are not parsed until asked,
//! so one malformed diagram does not spoil the list.

use crate::emitter::emit_bracket;
use crate::model::SyntaxTree;
use crate::parser::{ParseError, parse_bracket};
use std::fmt::Write;

/// A named diagram from a list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramEntry {
    pub name: String,
    pub bracket: String,
}

impl DiagramEntry {
    pub fn new(name: impl Into<String>, bracket: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bracket: bracket.into(),
        }
    }

    pub fn parse_tree(&self) -> Result<SyntaxTree, ParseError> {
        parse_bracket(&self.bracket)
    }

    /// Same entry with its bracket string in canonical form.
    pub fn canonical(&self) -> Result<Self, ParseError> {
        let tree = self.parse_tree()?;
        Ok(Self::new(self.name.clone(), emit_bracket(&tree)))
    }
}

/// Read every entry of a diagram list.
pub fn parse_diagram_list(text: &str) -> Vec<DiagramEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('|'))
        .map(|(name, bracket)| DiagramEntry::new(name.trim(), bracket.trim()))
        .collect()
}

/// Write entries back as a diagram list, one per line.
#[must_use]
pub fn emit_diagram_list(entries: &[DiagramEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{} | {}", entry.name, entry.bracket);
    }
    out
}
