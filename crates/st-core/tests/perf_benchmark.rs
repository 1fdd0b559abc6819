use st_core::emitter::emit_bracket;
use st_core::layout::{LayoutConfig, resolve_layout};
use st_core::parser::parse_bracket;
use std::collections::HashMap;
use std::time::Instant;

#[test]
#[ignore] // Run manually with `cargo test --test perf_benchmark -- --nocapture --ignored`
fn benchmark_wide_tree() {
    let mut doc = String::from("[S");
    // 20,000 noun phrases under one clause
    for i in 0..20_000 {
        doc.push_str(&format!(" [NP [DET the] [N dog{i}]]"));
    }
    doc.push(']');

    let start = Instant::now();
    let tree = parse_bracket(&doc).expect("parse failed");
    let parsed = start.elapsed();

    let start = Instant::now();
    let bounds = resolve_layout(&tree, &LayoutConfig::default(), &HashMap::new());
    let laid_out = start.elapsed();

    let start = Instant::now();
    let emitted = emit_bracket(&tree);
    let emitted_in = start.elapsed();

    assert_eq!(bounds.len(), tree.node_count());
    assert_eq!(emitted, doc);
    println!(
        "{} nodes: parse {parsed:?}, layout {laid_out:?}, emit {emitted_in:?}",
        tree.node_count()
    );
}
