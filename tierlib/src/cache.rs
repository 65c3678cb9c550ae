use std::collections::HashMap;
use std::fmt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;
use crate::config::{HierarchyConfig, LatencyBand, LevelConfig};
use crate::error::{Result, SimulationError};
use crate::replacement_policies::{GenericPolicy, ReplacementPolicy};

/// A single cached key/value pair, plus the metadata replacement policies need
///
/// Owned by the level holding it, dropped on eviction or reset
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    /// Logical tick of the last read or write, unique within a level
    pub last_access: u64,
    pub access_count: u64,
}

/// Outcome of probing a single level
#[derive(Debug, Clone)]
pub struct LevelLookup<V> {
    pub value: Option<V>,
    /// Cycles spent probing this level, drawn from its latency band. Charged on hits and misses
    pub latency_cycles: u32,
}

impl<V> LevelLookup<V> {
    pub fn hit(&self) -> bool {
        self.value.is_some()
    }
}

/// Counters for a single level at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    pub name: String,
    pub capacity: usize,
    pub occupancy: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Percentage of the capacity in use
    pub utilization: f64,
}

/// One bounded key/value cache, the building block of the hierarchy
///
/// Entries live in a dense vector with a key index on the side. An insert into a full level
/// overwrites the victim's slot in place, so the vector never grows beyond the capacity
#[derive(Debug, Clone)]
pub struct CacheLevel<V> {
    name: String,
    capacity: usize,
    latency: LatencyBand,
    entries: Vec<CacheEntry<V>>,
    index: HashMap<String, usize>,
    policy: GenericPolicy,
    // Logical time, bumped on every read or write of an entry
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V: Clone> CacheLevel<V> {
    /// Creates an empty level. Zero capacity is rejected, a level must be able to hold something
    pub fn new(name: impl Into<String>, capacity: usize, latency: LatencyBand, policy: impl Into<GenericPolicy>) -> Result<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimulationError::invalid_capacity(name, capacity, "capacity must be at least 1"));
        }
        Ok(Self {
            name,
            capacity,
            latency,
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            policy: policy.into(),
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        })
    }

    pub fn from_config(config: &LevelConfig) -> Result<Self> {
        Self::new(config.name.clone(), config.capacity, config.latency_cycles, config.replacement_policy)
    }

    /// Looks a key up, counting a hit or a miss and refreshing the entry's recency on a hit
    pub fn get<R: Rng + ?Sized>(&mut self, key: &str, rng: &mut R) -> LevelLookup<V> {
        let latency_cycles = rng.random_range(self.latency.min..=self.latency.max);
        let value = match self.index.get(key).copied() {
            Some(slot) => {
                self.hits += 1;
                let tick = self.next_tick();
                let entry = &mut self.entries[slot];
                entry.last_access = tick;
                entry.access_count += 1;
                Some(entry.value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        };
        LevelLookup { value, latency_cycles }
    }

    /// Inserts or replaces a value, returning the entry evicted to make room, if any
    ///
    /// Writing a key which is already present replaces its value and refreshes its recency, it
    /// never creates a second entry
    pub fn put(&mut self, key: &str, value: V) -> Option<CacheEntry<V>> {
        let tick = self.next_tick();
        if let Some(slot) = self.index.get(key).copied() {
            let entry = &mut self.entries[slot];
            entry.value = value;
            entry.last_access = tick;
            entry.access_count += 1;
            return None;
        }
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            last_access: tick,
            access_count: 1,
        };
        if self.entries.len() < self.capacity {
            self.index.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
            return None;
        }
        let victim_slot = self.policy.select_victim(&self.entries);
        let evicted = std::mem::replace(&mut self.entries[victim_slot], entry);
        self.index.remove(&evicted.key);
        self.index.insert(key.to_string(), victim_slot);
        self.evictions += 1;
        trace!(level = %self.name, evicted = %evicted.key, inserted = key, "evicted entry");
        debug_assert!(self.entries.len() <= self.capacity);
        Some(evicted)
    }

    /// Reads a value without touching counters or recency
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.entries[slot].value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> LevelStats {
        LevelStats {
            name: self.name.clone(),
            capacity: self.capacity,
            occupancy: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            utilization: self.entries.len() as f64 / self.capacity as f64 * 100.0,
        }
    }

    /// Drops every entry and zeroes the counters
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.tick = 0;
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// The tier which served a hierarchy lookup
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    L1,
    L2,
    L3,
    Memory,
}

impl Tier {
    fn from_depth(depth: usize) -> Self {
        match depth {
            0 => Tier::L1,
            1 => Tier::L2,
            2 => Tier::L3,
            _ => Tier::Memory,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::L1 => "L1",
            Tier::L2 => "L2",
            Tier::L3 => "L3",
            Tier::Memory => "Memory",
        };
        f.write_str(name)
    }
}

/// Outcome of a full hierarchy lookup
#[derive(Debug, Clone)]
pub struct CacheLookup<V> {
    pub value: Option<V>,
    pub tier: Tier,
    /// Sum of the cycles charged by every tier probed
    pub latency_cycles: u64,
    /// `latency_cycles` converted to nanoseconds at the configured clock frequency
    pub total_latency_ns: f64,
}

impl<V> CacheLookup<V> {
    pub fn hit(&self) -> bool {
        self.value.is_some()
    }
}

/// Aggregated counters for the whole hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyStats {
    pub levels: Vec<LevelStats>,
    pub lookups: u64,
    /// Lookups which missed every level
    pub memory_accesses: u64,
    /// Percentage of lookups served by any level
    pub hit_rate: f64,
}

/// Three cache levels, fastest and smallest first, in front of a simulated main memory
///
/// Reads promote into every faster level (copying, the slower level keeps its entry), writes go
/// through to every level at once
pub struct MultiLevelCache<V, R> {
    levels: [CacheLevel<V>; 3],
    memory_latency: LatencyBand,
    ns_per_cycle: f64,
    rng: R,
    lookups: u64,
    memory_accesses: u64,
}

impl<V: Clone, R: Rng> MultiLevelCache<V, R> {
    /// Creates an empty hierarchy. The random number generator drives latency sampling, seed it to
    /// get reproducible latencies
    pub fn new(config: &HierarchyConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let [l1, l2, l3] = &config.levels;
        Ok(Self {
            levels: [CacheLevel::from_config(l1)?, CacheLevel::from_config(l2)?, CacheLevel::from_config(l3)?],
            memory_latency: config.memory_latency_cycles,
            ns_per_cycle: 1.0 / config.clock_ghz,
            rng,
            lookups: 0,
            memory_accesses: 0,
        })
    }

    /// Probes each level in turn, stopping at the first hit
    ///
    /// A hit below L1 copies the value into every faster level. A miss everywhere is charged the
    /// main memory latency on top and leaves the hierarchy untouched, the caller is expected to
    /// resolve the value and `put` it
    pub fn get(&mut self, key: &str) -> CacheLookup<V> {
        self.lookups += 1;
        let mut latency_cycles = 0u64;
        for depth in 0..self.levels.len() {
            let lookup = self.levels[depth].get(key, &mut self.rng);
            latency_cycles += lookup.latency_cycles as u64;
            if let Some(value) = lookup.value {
                for faster in self.levels[..depth].iter_mut() {
                    faster.put(key, value.clone());
                }
                return CacheLookup {
                    value: Some(value),
                    tier: Tier::from_depth(depth),
                    latency_cycles,
                    total_latency_ns: latency_cycles as f64 * self.ns_per_cycle,
                };
            }
        }
        self.memory_accesses += 1;
        latency_cycles += self.rng.random_range(self.memory_latency.min..=self.memory_latency.max) as u64;
        CacheLookup {
            value: None,
            tier: Tier::Memory,
            latency_cycles,
            total_latency_ns: latency_cycles as f64 * self.ns_per_cycle,
        }
    }

    /// Write-through insert into every level
    pub fn put(&mut self, key: &str, value: V) {
        for level in self.levels.iter_mut() {
            level.put(key, value.clone());
        }
    }

    pub fn levels(&self) -> &[CacheLevel<V>; 3] {
        &self.levels
    }

    pub fn overall_stats(&self) -> HierarchyStats {
        let served = self.lookups - self.memory_accesses;
        HierarchyStats {
            levels: self.levels.iter().map(CacheLevel::stats).collect(),
            lookups: self.lookups,
            memory_accesses: self.memory_accesses,
            hit_rate: if self.lookups == 0 { 0.0 } else { served as f64 / self.lookups as f64 * 100.0 },
        }
    }

    /// Empties every level and zeroes all counters. The random number generator keeps its state
    pub fn reset(&mut self) {
        self.levels.iter_mut().for_each(CacheLevel::reset);
        self.lookups = 0;
        self.memory_accesses = 0;
    }
}
