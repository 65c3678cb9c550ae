use std::time::Duration;
use crate::clock::ManualClock;
use crate::config::StructureKind;
use crate::search_structures::{hash_key, Backend, Bst, CostMetric, HashTable, SearchStructure, Trie};

const PATHS: [&str; 8] = [
    "/home/docs/report_000001.txt",
    "/home/docs/report_000002.txt",
    "/var/logs/main_000003.log",
    "/usr/lib/module_000004.rs",
    "/opt/cache/image_000005.png",
    "/srv/data/archive_000006.tar",
    "/data/share/notes_000007.md",
    "/home/docs/index_000008.json",
];

fn all_backends() -> Vec<Backend<usize>> {
    StructureKind::ALL.iter().map(|kind| Backend::new(*kind, 16).unwrap()).collect()
}

#[test]
fn every_backend_finds_what_was_inserted() {
    for mut backend in all_backends() {
        for (value, key) in PATHS.iter().enumerate() {
            backend.insert(key, value);
        }
        assert_eq!(backend.len(), PATHS.len());
        for (value, key) in PATHS.iter().enumerate() {
            assert_eq!(backend.search(key).0, Some(&value), "{} lost {key}", backend.kind());
        }
        assert_eq!(backend.search("/home/docs/missing.txt").0, None);
    }
}

#[test]
fn reinsert_replaces_value() {
    for mut backend in all_backends() {
        backend.insert("/a/b", 1);
        backend.insert("/a/b", 2);
        assert_eq!(backend.len(), 1, "{} duplicated a key", backend.kind());
        assert_eq!(backend.search("/a/b").0, Some(&2));
    }
}

#[test]
fn backends_agree_on_hits_misses_and_values() {
    let mut backends = all_backends();
    for backend in backends.iter_mut() {
        for (value, key) in PATHS.iter().enumerate() {
            backend.insert(key, value * 10);
        }
    }
    let queries = PATHS
        .iter()
        .map(|p| p.to_string())
        .chain(["/home", "/home/docs/report_00000", "", "/zzz", "/home/docs/report_000001.txt.bak"].map(String::from))
        .collect::<Vec<_>>();
    for query in &queries {
        let answers = backends.iter().map(|b| b.search(query).0.copied()).collect::<Vec<_>>();
        assert!(answers.windows(2).all(|w| w[0] == w[1]), "backends disagree on {query}: {answers:?}");
    }
}

#[test]
fn bst_counts_comparisons() {
    let mut tree = Bst::new();
    for key in ["m", "c", "x"] {
        tree.insert(key, ());
    }
    assert_eq!(tree.search("m").1, CostMetric::Comparisons(1));
    assert_eq!(tree.search("c").1, CostMetric::Comparisons(2));
    assert_eq!(tree.search("a"), (None, CostMetric::Comparisons(2)));
    assert_eq!(tree.height(), 2);
}

#[test]
fn bst_survives_sorted_input() {
    // Sorted keys degenerate the tree into a list, one level per key
    let mut tree = Bst::new();
    let keys = (0..10_000).map(|i| format!("/file_{i:08}")).collect::<Vec<_>>();
    for (i, key) in keys.iter().enumerate() {
        tree.insert(key, i);
    }
    assert_eq!(tree.height(), keys.len());
    let last = keys.last().unwrap();
    assert_eq!(tree.search(last), (Some(&(keys.len() - 1)), CostMetric::Comparisons(keys.len() as u64)));
}

#[test]
fn hash_key_is_deterministic_and_in_range() {
    for key in PATHS {
        let bucket = hash_key(key, 97);
        assert!(bucket < 97);
        assert_eq!(bucket, hash_key(key, 97));
    }
    // 'a' is 97
    assert_eq!(hash_key("a", 1000), 97);
    assert_eq!(hash_key("ab", 1000), (97 * 31 + 98) % 1000);
}

#[test]
fn hash_cost_is_chain_scanned() {
    let mut table = HashTable::new(1).unwrap();
    for key in ["x", "y", "z"] {
        table.insert(key, ());
    }
    assert_eq!(table.search("x").1, CostMetric::ChainLength(1));
    assert_eq!(table.search("z").1, CostMetric::ChainLength(3));
    assert_eq!(table.search("w"), (None, CostMetric::ChainLength(3)));
    assert_eq!(table.longest_chain(), 3);
    assert_eq!(table.load_factor(), 3.0);
}

#[test]
fn hash_table_needs_buckets() {
    assert!(HashTable::<()>::new(0).is_err());
    assert!(Backend::<()>::new(StructureKind::Hash, 0).is_err());
}

#[test]
fn trie_prefix_is_not_a_hit() {
    let mut trie = Trie::new();
    trie.insert("/home/docs/a.txt", 1);
    assert_eq!(trie.search("/home"), (None, CostMetric::NodesTraversed(5)));
    let key = "/home/docs/a.txt";
    assert_eq!(trie.search(key), (Some(&1), CostMetric::NodesTraversed(key.chars().count() as u64)));
    // Walks "/h" then finds no 'x' below it
    assert_eq!(trie.search("/hx"), (None, CostMetric::NodesTraversed(2)));
    assert_eq!(trie.len(), 1);
}

#[test]
fn trie_shares_common_prefixes() {
    let mut trie = Trie::new();
    trie.insert("/ab", ());
    trie.insert("/ac", ());
    // root, '/', 'a', 'b', 'c'
    assert_eq!(trie.node_count(), 5);
}

#[test]
fn lookup_is_timed_with_the_given_clock() {
    let mut backend: Backend<u8> = Trie::new().into();
    backend.insert("/k", 1);
    let clock = ManualClock::with_step(Duration::from_micros(3));
    let outcome = backend.lookup("/k", &clock);
    assert!(outcome.found());
    assert_eq!(outcome.value, Some(1));
    assert_eq!(outcome.elapsed, Duration::from_micros(3));
}
