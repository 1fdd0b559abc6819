//! Integration tests: parse → emit → re-parse round-trip.
//!
//! Verifies that no structure is lost when converting bracket text →
//! SyntaxTree → bracket text.

use pretty_assertions::assert_eq;
use st_core::emitter::emit_bracket;
use st_core::model::*;
use st_core::notation::parse_diagram_list;
use st_core::parser::{ParseErrorKind, parse_bracket};
use st_core::NodeIndex;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Id-free view of a subtree, for structural comparison.
#[derive(Debug, PartialEq)]
struct Shape {
    kind: NodeKind,
    label: String,
    children: Vec<Shape>,
}

fn shape(tree: &SyntaxTree, idx: NodeIndex) -> Shape {
    let node = &tree.graph[idx];
    Shape {
        kind: node.kind,
        label: node.label.as_str().to_string(),
        children: tree.children(idx).iter().map(|&c| shape(tree, c)).collect(),
    }
}

/// Parse, emit, re-parse, and compare structure and text.
fn assert_roundtrip_preserves(input: &str) {
    let tree1 = parse_bracket(input).expect("first parse failed");
    let emitted = emit_bracket(&tree1);
    let tree2 = parse_bracket(&emitted).expect("re-parse failed");

    assert_eq!(
        shape(&tree1, tree1.root.unwrap()),
        shape(&tree2, tree2.root.unwrap()),
        "structure changed after round-trip.\nOriginal:\n{input}\nEmitted:\n{emitted}"
    );
    assert_eq!(emit_bracket(&tree2), emitted, "emit is not stable");
}

// ─── Fixture-based tests ─────────────────────────────────────────────────

#[test]
fn roundtrip_every_textbook_diagram() {
    let entries = parse_diagram_list(include_str!("fixtures/textbook.txt"));
    assert_eq!(entries.len(), 39);
    for entry in &entries {
        assert_roundtrip_preserves(&entry.bracket);
        // The fixtures are already canonical.
        let tree = entry.parse_tree().unwrap();
        assert_eq!(emit_bracket(&tree), entry.bracket, "{}", entry.name);
    }
}

// ─── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn simple_sentence_roundtrips_verbatim() {
    let input = "[S [NP [N Phillip]] [VP [V sleeps]]]";
    let tree = parse_bracket(input).unwrap();
    let root = tree.root.unwrap();
    assert_eq!(tree.graph[root].label, "S");
    let kids: Vec<&str> = tree
        .children(root)
        .iter()
        .map(|&c| tree.graph[c].label.as_str())
        .collect();
    assert_eq!(kids, vec!["NP", "VP"]);
    assert_eq!(emit_bracket(&tree), input);
}

#[test]
fn empty_relativizer_survives() {
    let input =
        "[S [NP [DET the] [N dog] [RC [REL _] [NP [N I]] [VP [V saw]]]] [VP [V sleeps]]]";
    let tree = parse_bracket(input).unwrap();
    let rel = tree.find_by_label("REL").unwrap();
    let marker = tree.children(rel)[0];
    assert_eq!(tree.graph[marker].kind, NodeKind::Terminal);
    assert_eq!(tree.graph[marker].label, "_");
    assert_eq!(emit_bracket(&tree), input);
}

#[test]
fn missing_complementizer_survives() {
    assert_roundtrip_preserves("[S [NP [N I]] [VP [V know] [CC [COMP _] [NP [N you]] [VP [V cry]]]]]");
}

#[test]
fn unknown_and_repeated_tags_survive() {
    assert_roundtrip_preserves("[S [WEIRD [WEIRD x] [WEIRD y]] [ZP [Z' z]]]");
}

#[test]
fn mixed_words_and_brackets_survive() {
    assert_roundtrip_preserves("[VP went [PP [PREP to] [NP home]] quickly]");
}

#[test]
fn missing_close_bracket_is_reported() {
    let err = parse_bracket("[S [NP [N Phillip]] [VP [V sleeps]").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::UnclosedBracket { .. }));
}

// ─── Kind inference ──────────────────────────────────────────────────────

#[test]
fn kinds_follow_tag_shape() {
    let tree = parse_bracket(
        "[S [DC [SUB because] [NP [N you]] [VP [V cry]]] [IC [NP [N I]] [VP [V laugh]]]]",
    )
    .unwrap();
    let kind_of = |label: &str| tree.graph[tree.find_by_label(label).unwrap()].kind;
    assert_eq!(kind_of("S"), NodeKind::Clause);
    assert_eq!(kind_of("DC"), NodeKind::Clause);
    assert_eq!(kind_of("IC"), NodeKind::Clause);
    assert_eq!(kind_of("NP"), NodeKind::Phrase);
    assert_eq!(kind_of("SUB"), NodeKind::PartOfSpeech);
    assert_eq!(kind_of("because"), NodeKind::Terminal);
}
