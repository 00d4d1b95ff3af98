// Criterion benchmarks for fsmorph-fst.
//
// Everything is built in memory, so no data files are required.
//
// Run:
//   cargo bench -p fsmorph-fst

use criterion::{criterion_group, criterion_main, Criterion};

use fsmorph_core::{FsSet, Semiring, Weight};
use fsmorph_fst::{compose, Fst, SegmentationUnits};

const FORMS: &[&str] = &[
    "bet", "beta", "better", "bid", "bind", "bird", "bit", "bite", "board",
    "boat", "bold", "bolt", "bond", "bone", "book", "boot", "born", "both",
    "cat", "catch", "cater", "cattle", "cave", "cell", "cent", "chain",
    "chair", "chalk", "chance", "change", "chant", "chase", "cheap", "check",
    "cheek", "cheer", "cheese", "chest", "chief", "child", "dark", "dart",
    "dash", "data", "date", "dawn", "dead", "deal", "dear", "debt",
];

fn uni(text: &str) -> Weight {
    Weight::Fs(FsSet::parse(text).unwrap())
}

/// A trie over FORMS, each entry weighted with a small feature set.
fn build_lexicon() -> Fst {
    let mut text = String::new();
    for (i, form) in FORMS.iter().enumerate() {
        let pos = if i % 3 == 0 { "+n" } else { "+v" };
        text.push_str(&format!("{form} [{pos}]\n"));
    }
    fsmorph_fst::lexicon::compile_lexicon(
        "bench-lex",
        &text,
        Semiring::Unification,
        &SegmentationUnits::none(),
        &fsmorph_core::TypeHierarchy::new(),
    )
    .expect("lexicon")
}

/// A one-state identity FST over the lowercase alphabet.
fn identity_fst(label: &str) -> Fst {
    let mut fst = Fst::new(label, Semiring::Unification);
    let s0 = fst.state("0");
    fst.set_final(s0);
    for c in 'a'..='z' {
        let sym = c.to_string();
        fst.add_arc(
            s0,
            s0,
            fsmorph_fst::Label::sym(sym.clone()),
            fsmorph_fst::Label::sym(sym),
            uni("[]"),
        );
    }
    fst
}

/// Transduce every form through the lexicon trie.
fn bench_transduce_lexicon(c: &mut Criterion) {
    let lex = build_lexicon();
    let units = SegmentationUnits::none();
    c.bench_function("transduce_50_forms", |b| {
        b.iter(|| {
            for form in FORMS {
                std::hint::black_box(lex.transduce(form, None, &units));
            }
        });
    });
}

/// Compose the lexicon with two identity layers, the shape a small
/// cascade produces.
fn bench_compose_cascade(c: &mut Criterion) {
    let lex = build_lexicon();
    let id1 = identity_fst("id1");
    let id2 = identity_fst("id2");
    c.bench_function("compose_lex_id_id", |b| {
        b.iter(|| {
            std::hint::black_box(compose(&[&lex, &id1, &id2], "bench").expect("compose"));
        });
    });
}

/// Cross-unification of two four-member feature sets, the hot path of
/// weight multiplication during transduction.
fn bench_unify_sets(c: &mut Criterion) {
    let a = FsSet::parse("[+n, num=sg];[+n, num=pl];[+v, tm=prf];[+v, tm=imf]").unwrap();
    let b = FsSet::parse("[sb=[+p1]];[sb=[+p2]];[ob=[+p1]];[ob=[+p2]]").unwrap();
    c.bench_function("unify_4x4_sets", |bch| {
        bch.iter(|| {
            std::hint::black_box(a.unify_sets(&b));
        });
    });
}

criterion_group!(
    benches,
    bench_transduce_lexicon,
    bench_compose_cascade,
    bench_unify_sets,
);
criterion_main!(benches);
