//! Engine benchmarks on singly-linked lists.
//!
//! Run with:
//! ```bash
//! cargo bench --bench engine
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use shape_rs::context::AnalysisContext;
use shape_rs::formula::{Formula, Var};
use shape_rs::kleene::Kleene;
use shape_rs::predicate::{PredicateId, Properties, Vocabulary};
use shape_rs::structure::Structure;
use shape_rs::types::Node;

fn list_context() -> (AnalysisContext, PredicateId, PredicateId, PredicateId) {
    let mut vocab = Vocabulary::new();
    let x = vocab
        .add(
            "x",
            1,
            Properties {
                abstraction: true,
                unique: true,
                ..Default::default()
            },
        )
        .unwrap();
    let y = vocab
        .add(
            "y",
            1,
            Properties {
                abstraction: true,
                unique: true,
                ..Default::default()
            },
        )
        .unwrap();
    let n = vocab
        .add(
            "n",
            2,
            Properties {
                function: true,
                ..Default::default()
            },
        )
        .unwrap();
    (AnalysisContext::new(vocab).unwrap(), x, y, n)
}

/// `x -> 0 -> ... -> len-1`, with `y` pointing to the middle.
fn list(ctx: &AnalysisContext, x: PredicateId, y: PredicateId, n: PredicateId, len: usize) -> Structure {
    let mut s = ctx.new_structure();
    let nodes: Vec<Node> = (0..len).map(|_| s.new_node()).collect();
    s.update(x, &[nodes[0]], Kleene::True);
    s.update(y, &[nodes[len / 2]], Kleene::True);
    for w in nodes.windows(2) {
        s.update(n, &[w[0], w[1]], Kleene::True);
    }
    s
}

// ============================================================================
// Blur
// ============================================================================

fn bench_blur(c: &mut Criterion) {
    let (ctx, x, y, n) = list_context();
    let mut group = c.benchmark_group("blur");
    for len in [8, 32, 128] {
        let s = list(&ctx, x, y, n, len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &s, |b, s| {
            b.iter(|| {
                let mut t = s.clone();
                ctx.blur(&mut t);
                t
            })
        });
    }
    group.finish();
}

// ============================================================================
// Coerce
// ============================================================================

fn bench_coerce(c: &mut Criterion) {
    let (ctx, x, y, n) = list_context();
    let mut group = c.benchmark_group("coerce");
    for len in [4, 8, 16] {
        let mut s = list(&ctx, x, y, n, len);
        // Unknown edges from the head, all but one forced to 0
        for u in s.node_list().into_iter().skip(2) {
            s.update(n, &[Node::new(0), u], Kleene::Unknown);
        }
        s.mark_all_modified();
        group.bench_with_input(BenchmarkId::from_parameter(len), &s, |b, s| {
            b.iter(|| {
                let mut t = s.clone();
                ctx.coerce(&mut t)
            })
        });
    }
    group.finish();
}

// ============================================================================
// Focus
// ============================================================================

fn bench_focus(c: &mut Criterion) {
    let (ctx, x, y, n) = list_context();
    let v = Var::new("v");
    let w = Var::new("w");
    let successor = Formula::and(Formula::atom(x, [v.clone()]), Formula::atom(n, [v, w]));
    let formula = ctx.focus_formula(&successor).unwrap();

    let mut group = c.benchmark_group("focus");
    for len in [8, 32] {
        let mut s = list(&ctx, x, y, n, len);
        ctx.blur(&mut s);
        group.bench_with_input(BenchmarkId::from_parameter(len), &s, |b, s| {
            b.iter(|| ctx.focus(s, &formula).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_blur, bench_coerce, bench_focus);
criterion_main!(benches);
