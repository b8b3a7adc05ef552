//! Batch and cache verification throughput
//!
//! Run: cargo bench -p pob-verifier --bench batch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pob_primitives::AccountId;
use pob_state::{StateTree, StateWriter};
use pob_storage::MemoryStore;
use pob_types::{Contract, Transaction};
use pob_verifier::BatchVerifier;
use pob_vm::{Assembler, ExecutionContext, Opcode};
use std::sync::Arc;

fn publisher() -> AccountId {
    AccountId::from("bench")
}

fn funded_tree() -> StateTree {
    let mut tree = StateTree::new(Arc::new(MemoryStore::new()));
    let root = tree.root();
    let _ = tree.view_mut(root).credit(&publisher(), i128::MAX / 2);
    tree
}

fn transactions(n: usize) -> Vec<Transaction> {
    let code = Assembler::new()
        .push_str("hello")
        .push_str("world")
        .op(Opcode::Put)
        .push_str("success")
        .op(Opcode::Return)
        .finish()
        .unwrap_or_default();
    (0..n)
        .map(|j| Transaction::new(publisher(), Contract::new(format!("c{j}"), code.clone()), 10_000, 1, j as u64))
        .collect()
}

fn bench_verify_batch(c: &mut Criterion) {
    let verifier = BatchVerifier::default();
    let ctx = ExecutionContext::default();
    let mut group = c.benchmark_group("verify_batch");

    for size in [10usize, 100, 1_000] {
        let txs = transactions(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &txs, |b, txs| {
            b.iter_batched(
                funded_tree,
                |mut tree| {
                    let base = tree.root();
                    black_box(verifier.verify_batch(&mut tree, txs, base, &ctx).map(|o| o.applied))
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_verify_single(c: &mut Criterion) {
    let verifier = BatchVerifier::default();
    let ctx = ExecutionContext::default();
    let txs = transactions(1);

    c.bench_function("verify_single", |b| {
        let mut tree = funded_tree();
        let pool = tree.root();
        b.iter(|| black_box(verifier.verify_single(&mut tree, &txs[0], pool, &ctx).is_ok()))
    });
}

criterion_group!(benches, bench_verify_batch, bench_verify_single);
criterion_main!(benches);
