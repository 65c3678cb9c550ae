//! Property-based tests for the cache, the backends, and the engine.
//!
//! These tests verify invariants that should hold for any workload.

use std::time::Duration;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tierlib::cache::{CacheLevel, MultiLevelCache, Tier};
use tierlib::clock::ManualClock;
use tierlib::config::{HierarchyConfig, LatencyBand, SimulationConfig, StructureKind, WorkloadProfile};
use tierlib::replacement_policies::LeastRecentlyUsed;
use tierlib::result::{rates, throughput, RunStatus};
use tierlib::search_structures::{Backend, SearchStructure};
use tierlib::simulator::SimulationEngine;

/// Strategy for short path-like keys, short enough that collisions and shared prefixes are common
fn path_key() -> impl Strategy<Value = String> {
    "/[a-c]{0,3}(/[a-c]{1,3}){0,2}"
}

fn structure() -> impl Strategy<Value = StructureKind> {
    prop_oneof![Just(StructureKind::Bst), Just(StructureKind::Hash), Just(StructureKind::Trie)]
}

proptest! {
    /// Property: A level never holds more entries than its capacity, whatever is written to it
    #[test]
    fn level_never_exceeds_capacity(capacity in 1..16usize, keys in prop::collection::vec(path_key(), 0..200)) {
        let mut level = CacheLevel::new("L", capacity, LatencyBand::new(1, 1), LeastRecentlyUsed).unwrap();
        for (i, key) in keys.iter().enumerate() {
            level.put(key, i);
            prop_assert!(level.len() <= capacity);
            prop_assert_eq!(level.peek(key), Some(&i));
        }
    }

    /// Property: With k + 1 distinct writes and no reads, the first key is the one evicted
    #[test]
    fn lru_evicts_first_of_k_plus_one(capacity in 1..32usize) {
        let mut level = CacheLevel::new("L", capacity, LatencyBand::new(1, 1), LeastRecentlyUsed).unwrap();
        for i in 0..=capacity {
            level.put(&format!("key-{i}"), i);
        }
        prop_assert!(!level.contains("key-0"));
        for i in 1..=capacity {
            let key = format!("key-{i}");
            prop_assert!(level.contains(&key));
        }
    }

    /// Property: A value found below L1 is an L1 hit on the very next lookup
    #[test]
    fn promoted_keys_hit_l1_next(keys in prop::collection::vec(path_key(), 1..300), seed in any::<u64>()) {
        let mut cache: MultiLevelCache<usize, StdRng> =
            MultiLevelCache::new(&HierarchyConfig::default(), StdRng::seed_from_u64(seed)).unwrap();
        for (i, key) in keys.iter().enumerate() {
            let lookup = cache.get(key);
            match lookup.tier {
                Tier::Memory => cache.put(key, i),
                Tier::L1 => {}
                Tier::L2 | Tier::L3 => {
                    let again = cache.get(key);
                    prop_assert_eq!(again.tier, Tier::L1);
                    prop_assert_eq!(again.value, lookup.value);
                }
            }
        }
    }

    /// Property: All three backends agree on what is found and the value returned
    #[test]
    fn backends_agree(
        inserts in prop::collection::vec((path_key(), any::<u16>()), 0..100),
        queries in prop::collection::vec(path_key(), 0..100),
    ) {
        let mut backends = StructureKind::ALL.map(|kind| Backend::new(kind, 7).unwrap());
        for backend in backends.iter_mut() {
            for (key, value) in &inserts {
                backend.insert(key, *value);
            }
        }
        prop_assert!(backends.iter().all(|b| b.len() == backends[0].len()));
        for query in inserts.iter().map(|(k, _)| k).chain(queries.iter()) {
            let expected = backends[0].search(query).0.copied();
            for backend in &backends[1..] {
                prop_assert_eq!(backend.search(query).0.copied(), expected);
            }
        }
    }

    /// Property: Rates add up to 100 whenever anything happened
    #[test]
    fn rates_sum_to_one_hundred(hits in 0..1_000_000u64, misses in 0..1_000_000u64) {
        let (hit_rate, miss_rate) = rates(hits, misses);
        prop_assert!((0.0..=100.0).contains(&hit_rate));
        if hits + misses > 0 {
            prop_assert!((hit_rate + miss_rate - 100.0).abs() < 1e-9);
        } else {
            prop_assert_eq!(miss_rate, 0.0);
        }
    }

    /// Property: Throughput is finite and non-negative for any elapsed time, including zero
    #[test]
    fn throughput_is_finite(operations in any::<u64>(), nanos in 0..10_000_000_000u64) {
        let value = throughput(operations, Duration::from_nanos(nanos));
        prop_assert!(value.is_finite() && value >= 0.0);
        if nanos == 0 {
            prop_assert_eq!(value, 0.0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: Completed and cancelled runs both satisfy the result invariants
    #[test]
    fn runs_are_internally_consistent(
        seed in any::<u64>(),
        kind in structure(),
        operations in 0..1_500usize,
        stop_after in prop::option::of(0..1_500usize),
    ) {
        let config = SimulationConfig {
            seed,
            workload: WorkloadProfile { corpus_size: 800, ..WorkloadProfile::default() },
            ..SimulationConfig::default()
        };
        let mut engine = SimulationEngine::with_clock(config, ManualClock::with_step(Duration::from_nanos(10))).unwrap();
        let mut run = engine.start(kind, operations);
        run.advance(stop_after.unwrap_or(usize::MAX));
        let result = run.finish();

        let expected_operations = stop_after.map_or(operations, |stop| stop.min(operations));
        prop_assert_eq!(result.operations_performed, expected_operations as u64);
        prop_assert_eq!(result.hits + result.misses, result.operations_performed);
        if result.operations_performed > 0 {
            prop_assert!((result.hit_rate + result.miss_rate - 100.0).abs() < 1e-9);
        }
        if expected_operations == operations {
            prop_assert_eq!(result.status, RunStatus::Completed);
        } else {
            prop_assert_eq!(result.status, RunStatus::Cancelled);
        }
        prop_assert!(result.throughput.is_finite() && result.throughput >= 0.0);
        let cache_stats = result.cache_stats.unwrap();
        for level in &cache_stats.levels {
            prop_assert!(level.occupancy <= level.capacity);
        }
    }
}
