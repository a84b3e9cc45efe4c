// Criterion benchmarks for cascade assembly and restricted composition.
//
// Run:
//   cargo bench -p loanword-ot

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use loanword_core::weights::{BIAS, MAX_V, RO_MORPH};
use loanword_core::{Alphabet, LanguageProfile, WeightVector};
use loanword_fst::VectorFst;
use loanword_ot::{Mode, Pipeline, PipelineSpec, decode};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn alphabet() -> Alphabet {
    let profile = LanguageProfile::builtin("arabic-swahili").expect("built-in profile");
    let mut abc = Alphabet::new(&profile).expect("alphabet");
    let weights = WeightVector::from_pairs([(MAX_V, 1.0), (RO_MORPH, 2.0), (BIAS, 0.0)]);
    abc.register_constraint_weights(&weights, 10.0).expect("weights");
    abc
}

fn chain(abc: &Alphabet, phones: &str) -> Vec<u32> {
    let symbols: Vec<&str> = phones.split_whitespace().collect();
    abc.labels(&symbols).expect("known phones")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_build(c: &mut Criterion) {
    let abc = alphabet();
    let spec = PipelineSpec::standard(false, 1);
    for mode in [Mode::Annotate, Mode::Weighted] {
        c.bench_function(&format!("build_standard_{mode}"), |b| {
            b.iter(|| Pipeline::build(black_box(&spec), &abc, mode).expect("pipeline"))
        });
    }
}

fn bench_restrict_target(c: &mut Criterion) {
    let abc = alphabet();
    let spec = PipelineSpec::standard(false, 1);
    let pipeline = Pipeline::build(&spec, &abc, Mode::Weighted).expect("pipeline");
    let targets = pipeline.target_acceptor(&[chain(&abc, "k i t a b u")], &abc);
    c.bench_function("restrict_target_kitabu", |b| {
        b.iter(|| pipeline.restrict_target(black_box(&targets)))
    });
}

fn bench_trace_and_decode(c: &mut Criterion) {
    let abc = alphabet();
    let spec = PipelineSpec::standard(false, 1);
    let pipeline = Pipeline::build(&spec, &abc, Mode::Annotate).expect("pipeline");
    let source = chain(&abc, "k i t a a b");
    let target = chain(&abc, "k i t a b u");
    c.bench_function("trace_kitaab_kitabu", |b| {
        b.iter(|| pipeline.trace(black_box(&source), &target, &abc, 5).expect("trace"))
    });

    let vocab = VectorFst::linear_chain(&source);
    let all = loanword_fst::compose(
        &pipeline.restrict_source(&vocab),
        &pipeline.restrict_target(&pipeline.target_acceptor(&[target.clone()], &abc)),
    );
    let scored = pipeline.score(&all, &abc).expect("scoring");
    c.bench_function("decode_5_best", |b| b.iter(|| decode(black_box(&scored), &abc, 5)));
}

criterion_group!(benches, bench_build, bench_restrict_target, bench_trace_and_decode);
criterion_main!(benches);
