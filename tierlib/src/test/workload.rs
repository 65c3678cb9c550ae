use std::collections::HashSet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::config::WorkloadProfile;
use crate::workload::WorkloadGenerator;

fn generator(profile: WorkloadProfile, seed: u64) -> WorkloadGenerator<StdRng> {
    WorkloadGenerator::new(profile, StdRng::seed_from_u64(seed)).unwrap()
}

fn profile(corpus_size: usize) -> WorkloadProfile {
    WorkloadProfile { corpus_size, ..WorkloadProfile::default() }
}

#[test]
fn corpus_has_unique_path_like_keys() {
    let corpus = generator(profile(2_000), 1).generate_corpus();
    assert_eq!(corpus.len(), 2_000);
    let keys = corpus.iter().map(|r| r.key.as_str()).collect::<HashSet<_>>();
    assert_eq!(keys.len(), corpus.len());
    for (sequence, record) in corpus.iter().enumerate() {
        assert!(record.key.starts_with('/'));
        assert!(record.key.ends_with(&format!(".{}", record.metadata.extension)));
        assert_eq!(record.metadata.sequence, sequence);
        assert_eq!(record.key.matches('/').count(), record.metadata.depth + 1);
        assert!(record.size > 0);
    }
}

#[test]
fn same_seed_same_corpus_and_sequence() {
    let mut first = generator(profile(500), 3);
    let mut second = generator(profile(500), 3);
    assert_eq!(first.generate_corpus(), second.generate_corpus());
    assert_eq!(first.access_sequence(500, 200), second.access_sequence(500, 200));
}

#[test]
fn most_accesses_go_to_the_hot_set() {
    let mut generator = generator(profile(10_000), 11);
    assert_eq!(generator.hot_range(10_000), 0..2_000);
    let sequence = generator.access_sequence(10_000, 1_000);
    assert_eq!(sequence.len(), 1_000);
    let hot = sequence.iter().filter(|&&i| i < 2_000).count();
    assert!(hot >= 600, "only {hot} of 1000 accesses were hot");
    assert!(sequence.iter().all(|&i| i < 10_000));
}

#[test]
fn empty_corpus_gives_empty_sequence() {
    let mut generator = generator(profile(0), 0);
    assert!(generator.generate_corpus().is_empty());
    assert!(generator.access_sequence(0, 100).is_empty());
}

#[test]
fn all_hot_or_all_cold_profiles_still_draw() {
    let mut all_hot = generator(WorkloadProfile { corpus_size: 10, hot_fraction: 1.0, hot_probability: 0.8 }, 5);
    assert!(all_hot.access_sequence(10, 100).iter().all(|&i| i < 10));

    let mut all_cold = generator(WorkloadProfile { corpus_size: 10, hot_fraction: 0.0, hot_probability: 0.8 }, 5);
    assert!(all_cold.hot_range(10).is_empty());
    assert_eq!(all_cold.access_sequence(10, 100).len(), 100);
}

#[test]
fn single_record_corpus() {
    let mut generator = generator(profile(1), 2);
    assert_eq!(generator.access_sequence(1, 5), vec![0; 5]);
}

#[test]
fn rejects_out_of_range_probabilities() {
    let bad = WorkloadProfile { hot_probability: 1.5, ..WorkloadProfile::default() };
    assert!(WorkloadGenerator::new(bad, StdRng::seed_from_u64(0)).is_err());
    let bad = WorkloadProfile { hot_fraction: -0.1, ..WorkloadProfile::default() };
    assert!(WorkloadGenerator::new(bad, StdRng::seed_from_u64(0)).is_err());
}
