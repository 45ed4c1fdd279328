use ark_bn254::Fr;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use zkp_credential_membership::artifacts::CircuitArtifacts;
use zkp_credential_membership::circuit::generate_parameters;
use zkp_credential_membership::config::Config;
use zkp_credential_membership::field::str_to_field;
use zkp_credential_membership::merkle::MerkleTree;
use zkp_credential_membership::prover::ZkProver;
use zkp_credential_membership::registry::{TrustedRootEntry, TrustedRootRegistry};
use zkp_credential_membership::sets::SetManager;
use zkp_credential_membership::verifier::ProofVerifier;

fn leaves(count: usize) -> Vec<Fr> {
    (0..count).map(|i| str_to_field(&format!("cred-{i}"))).collect()
}

fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");

    for leaf_count in [16, 64, 256, 1024].iter() {
        let input = leaves(*leaf_count);
        group.bench_with_input(
            BenchmarkId::from_parameter(leaf_count),
            leaf_count,
            |b, _| b.iter(|| black_box(MerkleTree::new(input.clone()).unwrap())),
        );
    }

    group.finish();
}

fn bench_witness_extraction(c: &mut Criterion) {
    let tree = MerkleTree::new(leaves(1024)).unwrap();

    c.bench_function("witness_1024", |b| {
        b.iter(|| black_box(tree.witness(512).unwrap()))
    });
}

fn bench_static_verify(c: &mut Criterion) {
    let tree = MerkleTree::new(leaves(1024)).unwrap();
    let witness = tree.witness(512).unwrap();

    c.bench_function("static_verify_1024", |b| {
        b.iter(|| black_box(MerkleTree::verify_witness(&witness)))
    });
}

fn bench_groth16(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let proving_key = generate_parameters(&mut rng).expect("parameter generation");
    let artifacts = Arc::new(CircuitArtifacts::from_parts("credential_membership", proving_key));

    let config = Config::default();
    let manager = SetManager::new(config.sets.max_credentials_per_set);
    let credentials: Vec<String> = (0..256).map(|i| format!("cred-{i}")).collect();
    let set = manager.create("bench", credentials, None, None).unwrap();
    let witness = manager.generate_witness(set.id, "cred-42").unwrap();

    let prover = ZkProver::new(Arc::clone(&artifacts), &config).unwrap();

    let mut group = c.benchmark_group("groth16");
    group.sample_size(10);

    group.bench_function("prove", |b| {
        b.iter(|| black_box(prover.generate(set.id, &witness, "cred-42").unwrap()))
    });

    let proof = prover.generate(set.id, &witness, "cred-42").unwrap();
    let registry = Arc::new(TrustedRootRegistry::new());
    registry
        .add(TrustedRootEntry::new(set.id, &set.merkle_root))
        .unwrap();
    let verifier = ProofVerifier::new(artifacts, registry);

    group.bench_function("verify", |b| {
        b.iter(|| {
            let report = verifier.verify(&proof);
            assert!(black_box(report).valid);
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tree_build,
    bench_witness_extraction,
    bench_static_verify,
    bench_groth16
);
criterion_main!(benches);
