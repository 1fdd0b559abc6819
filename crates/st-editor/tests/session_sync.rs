//! Integration tests: text ingest ↔ bracket egress through a session.
//!
//! Exercises the st-editor ↔ st-core boundary: parsing, status reporting,
//! canonical output and relayout.

use pretty_assertions::assert_eq;
use st_core::notation::parse_diagram_list;
use st_core::parser::ParseErrorKind;
use st_editor::{EditorSession, EngineConfig, Status};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session(text: &str) -> EditorSession {
    init();
    EditorSession::from_text(text, EngineConfig::default()).unwrap()
}

fn labels(s: &EditorSession, ids: &[st_core::NodeId]) -> Vec<String> {
    ids.iter()
        .map(|&id| s.label_of(id).unwrap().to_string())
        .collect()
}

// ─── Text → tree ────────────────────────────────────────────────────────

#[test]
fn simple_sentence_syncs() {
    let s = session("[S [NP [N Phillip]] [VP [V sleeps]]]");
    assert_eq!(s.status(), &Status::Synced);
    let root = s.root().unwrap();
    assert_eq!(s.label_of(root), Some("S"));
    assert_eq!(labels(&s, &s.children_of(root).unwrap()), vec!["NP", "VP"]);
    assert_eq!(s.bracket(), "[S [NP [N Phillip]] [VP [V sleeps]]]");
}

#[test]
fn empty_relativizer_is_kept() {
    let input = "[S [NP [DET the] [N dog] [RC [REL _] [NP [N I]] [VP [V saw]]]] [VP [V sleeps]]]";
    let s = session(input);
    let rel = s.find_by_label("REL").unwrap();
    let kids = s.children_of(rel).unwrap();
    assert_eq!(labels(&s, &kids), vec!["_"]);
    assert_eq!(s.kind_of(kids[0]), Some(st_core::NodeKind::Terminal));
    assert_eq!(s.bracket(), input);
}

#[test]
fn every_textbook_diagram_syncs_verbatim() {
    init();
    let mut s = EditorSession::default();
    for entry in parse_diagram_list(include_str!("../../st-core/tests/fixtures/textbook.txt")) {
        s.ingest(&entry.bracket).unwrap();
        assert_eq!(s.status(), &Status::Synced, "{}", entry.name);
        assert_eq!(s.bracket(), entry.bracket, "{}", entry.name);
    }
}

#[test]
fn messy_spacing_is_canonicalized() {
    let s = session("  [S\n  [NP [N Phillip] ]\t[VP [V sleeps]]]  ");
    assert_eq!(s.bracket(), "[S [NP [N Phillip]] [VP [V sleeps]]]");
}

// ─── Parse errors ───────────────────────────────────────────────────────

#[test]
fn missing_bracket_keeps_previous_tree() {
    let mut s = session("[S [NP [N Phillip]] [VP [V sleeps]]]");
    let err = s.ingest("[S [NP [N Phillip]] [VP [V sleeps]").unwrap_err();
    assert_eq!(err.offset, 34);
    assert_eq!(err.kind, ParseErrorKind::UnclosedBracket { opened_at: 20 });
    assert_eq!(
        s.status(),
        &Status::ParseError {
            offset: 34,
            message: err.kind.to_string(),
        }
    );
    assert_eq!(s.bracket(), "[S [NP [N Phillip]] [VP [V sleeps]]]");

    // The next good edit clears the error.
    s.ingest("[S [NP [N Phillip]] [VP [V snores]]]").unwrap();
    assert_eq!(s.status(), &Status::Synced);
    assert_eq!(s.bracket(), "[S [NP [N Phillip]] [VP [V snores]]]");
}

#[test]
fn failed_first_ingest_leaves_session_empty() {
    init();
    let mut s = EditorSession::default();
    assert!(s.ingest("[S [").is_err());
    assert!(s.tree().is_empty());
    assert_eq!(s.bracket(), "");
    assert!(matches!(s.status(), Status::ParseError { .. }));
}

#[test]
fn unknown_tags_are_not_errors() {
    let s = session("[XYZ [QQ foo] [QQ bar]]");
    assert_eq!(s.status(), &Status::Synced);
    assert_eq!(s.bracket(), "[XYZ [QQ foo] [QQ bar]]");
}

// ─── Layout ─────────────────────────────────────────────────────────────

#[test]
fn relayout_is_idempotent() {
    let mut s = session("[S [NP [DET the] [N dog]] [VP [V ate] [NP [DET a] [N bone]]]]");
    let ids: Vec<_> = s.tree().preorder().iter().map(|&i| s.tree().graph[i].id).collect();
    let before: Vec<_> = ids.iter().map(|&id| s.position(id).unwrap()).collect();
    s.relayout(false);
    s.relayout(true);
    let after: Vec<_> = ids.iter().map(|&id| s.position(id).unwrap()).collect();
    assert_eq!(before, after);
}

#[test]
fn every_node_has_bounds_after_ingest() {
    let s = session("[S [NP [N I]] [VP [V know] [CC [COMP _] [NP [N you]] [VP [V cry]]]]]");
    for &idx in &s.tree().preorder() {
        let id = s.tree().graph[idx].id;
        let b = s.bounds_of(id).unwrap();
        assert_eq!(b.center(), s.position(id).unwrap());
    }
}

#[test]
fn deep_nesting_round_trips() {
    init();
    let depth = 100_000;
    let text = format!("{}x{}", "[VP ".repeat(depth), "]".repeat(depth));
    let mut s = EditorSession::default();
    s.ingest(&text).unwrap();
    assert_eq!(s.status(), &Status::Synced);
    assert_eq!(s.tree().node_count(), depth + 1);
    assert_eq!(s.bracket(), text);

    s.relayout(true);
    let x = s.find_by_label("x").unwrap();
    let root = s.root().unwrap();
    assert!(s.position(x).unwrap().y > s.position(root).unwrap().y);
}
