//! # TierLib
//!
//! TierLib simulates how search structures interact with a multi-level cache hierarchy
//!
//! It provides three interchangeable lookup backends (binary search tree, hash table, trie), a
//! three level cache with LRU eviction, inclusive promotion and write-through inserts, a generator
//! for synthetic file-access workloads with an 80/20 hot set, and an engine which runs workloads
//! through the cache and the backends and reports hit rates, latencies, and throughput
//!
//! Every source of randomness and time is injected, so a seed and a manual clock make a whole
//! simulation reproducible

/// Contains the cache level and the three level hierarchy built from it
pub mod cache;

/// Contains the injectable time source
pub mod clock;

/// Contains definitions for the JSON configuration format
pub mod config;

pub mod error;

/// Contains helpers to load configurations and external measurements from disk
pub mod io;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the result types produced by simulations
pub mod result;

/// Contains the binary search tree, hash table, and trie backends
pub mod search_structures;

/// Contains the engine used to run workloads against the cache and a backend
pub mod simulator;

/// Contains the synthetic record corpus and access sequence generator
pub mod workload;

#[cfg(test)]
mod test;

pub use error::{Result, SimulationError};
