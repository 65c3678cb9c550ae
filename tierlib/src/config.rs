use std::fmt;
use std::str::FromStr;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SimulationError};

/// Default seed, used whenever a configuration doesn't provide one
pub const DEFAULT_SEED: u64 = 0x5EED;
pub const DEFAULT_HASH_BUCKETS: usize = 1024;
pub const DEFAULT_PROGRESS_STRIDE: usize = 100;

/// Top level simulation configuration, usually parsed from JSON
///
/// Every field has a default, so `{}` is a valid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seeds both the workload generator and the cache latency sampler
    pub seed: u64,
    /// Number of buckets in the hash table backend
    pub hash_buckets: usize,
    /// Number of operations between progress callbacks and cooperative checkpoints
    pub progress_stride: usize,
    pub workload: WorkloadProfile,
    pub hierarchy: HierarchyConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            hash_buckets: DEFAULT_HASH_BUCKETS,
            progress_stride: DEFAULT_PROGRESS_STRIDE,
            workload: WorkloadProfile::default(),
            hierarchy: HierarchyConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Checks every constraint which can't be expressed in the types themselves
    pub fn validate(&self) -> Result<()> {
        if self.hash_buckets == 0 {
            return Err(SimulationError::invalid_configuration("hash_buckets must be at least 1"));
        }
        if self.progress_stride == 0 {
            return Err(SimulationError::invalid_configuration("progress_stride must be at least 1"));
        }
        self.workload.validate()?;
        self.hierarchy.validate()
    }
}

/// Shape of the synthetic corpus and the access pattern drawn from it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadProfile {
    pub corpus_size: usize,
    /// Leading fraction of the corpus (in creation order) which is considered hot
    pub hot_fraction: f64,
    /// Probability of an access going to the hot set
    pub hot_probability: f64,
}

impl Default for WorkloadProfile {
    fn default() -> Self {
        Self {
            corpus_size: 10_000,
            hot_fraction: 0.2,
            hot_probability: 0.8,
        }
    }
}

impl WorkloadProfile {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.hot_fraction) {
            return Err(SimulationError::invalid_configuration(format!(
                "hot_fraction must be within [0, 1], got {}",
                self.hot_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.hot_probability) {
            return Err(SimulationError::invalid_configuration(format!(
                "hot_probability must be within [0, 1], got {}",
                self.hot_probability
            )));
        }
        Ok(())
    }
}

/// A three level cache hierarchy, fastest level first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub levels: [LevelConfig; 3],
    /// Cost of going all the way to main memory after missing every level
    pub memory_latency_cycles: LatencyBand,
    /// Used to convert cycles into nanoseconds
    pub clock_ghz: f64,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            levels: [
                LevelConfig::new("L1", 64, LatencyBand::new(1, 2)),
                LevelConfig::new("L2", 512, LatencyBand::new(10, 20)),
                LevelConfig::new("L3", 2048, LatencyBand::new(40, 75)),
            ],
            memory_latency_cycles: LatencyBand::new(200, 300),
            clock_ghz: 3.0,
        }
    }
}

impl HierarchyConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.clock_ghz.is_finite() || self.clock_ghz <= 0.0 {
            return Err(SimulationError::invalid_configuration(format!(
                "clock_ghz must be a positive number, got {}",
                self.clock_ghz
            )));
        }
        self.memory_latency_cycles.validate("memory")?;
        let mut previous_capacity = 0;
        for level in &self.levels {
            if level.capacity == 0 {
                return Err(SimulationError::invalid_capacity(&level.name, level.capacity, "capacity must be at least 1"));
            }
            if level.capacity <= previous_capacity {
                return Err(SimulationError::invalid_capacity(
                    &level.name,
                    level.capacity,
                    format!("capacity must be larger than the previous level's {previous_capacity}"),
                ));
            }
            level.latency_cycles.validate(&level.name)?;
            previous_capacity = level.capacity;
        }
        Ok(())
    }
}

/// A configuration for a single cache level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    /// Maximum number of entries
    pub capacity: usize,
    pub latency_cycles: LatencyBand,
    #[serde(default = "ReplacementPolicyConfig::default")]
    pub replacement_policy: ReplacementPolicyConfig,
}

impl LevelConfig {
    pub fn new(name: impl Into<String>, capacity: usize, latency_cycles: LatencyBand) -> Self {
        Self {
            name: name.into(),
            capacity,
            latency_cycles,
            replacement_policy: ReplacementPolicyConfig::default(),
        }
    }
}

/// An inclusive range of cycles, sampled uniformly on every access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyBand {
    pub min: u32,
    pub max: u32,
}

impl LatencyBand {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    fn validate(&self, owner: &str) -> Result<()> {
        if self.min > self.max {
            return Err(SimulationError::invalid_configuration(format!(
                "latency band for {owner} is inverted: min {} > max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// The replacement policy for a level - lru or lfu. Defaults to lru.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementPolicyConfig {
    #[default]
    #[serde(alias = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "lfu")]
    LeastFrequentlyUsed,
}

/// The three search structures which can back a simulation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum StructureKind {
    #[serde(rename = "BST", alias = "bst")]
    Bst,
    #[serde(rename = "Hash", alias = "hash")]
    Hash,
    #[serde(rename = "Trie", alias = "trie")]
    Trie,
}

impl StructureKind {
    /// Every backend, in the order comparative runs use
    pub const ALL: [StructureKind; 3] = [StructureKind::Bst, StructureKind::Hash, StructureKind::Trie];

    pub fn name(&self) -> &'static str {
        match self {
            StructureKind::Bst => "BST",
            StructureKind::Hash => "Hash",
            StructureKind::Trie => "Trie",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StructureKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bst" | "binary-search-tree" => Ok(StructureKind::Bst),
            "hash" | "hashtable" | "hash-table" => Ok(StructureKind::Hash),
            "trie" | "prefix-tree" => Ok(StructureKind::Trie),
            _ => Err(SimulationError::UnknownStructure(s.to_string())),
        }
    }
}

/// Number of operations to simulate. The presets match the sizes offered to users
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkloadSize {
    Small,
    Medium,
    Large,
    Custom(usize),
}

impl WorkloadSize {
    pub fn operations(&self) -> usize {
        match self {
            WorkloadSize::Small => 1_000,
            WorkloadSize::Medium => 5_000,
            WorkloadSize::Large => 10_000,
            WorkloadSize::Custom(n) => *n,
        }
    }
}

impl From<WorkloadSize> for usize {
    fn from(value: WorkloadSize) -> Self {
        value.operations()
    }
}

impl FromStr for WorkloadSize {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(WorkloadSize::Small),
            "medium" => Ok(WorkloadSize::Medium),
            "large" => Ok(WorkloadSize::Large),
            other => other
                .parse::<usize>()
                .map(WorkloadSize::Custom)
                .map_err(|_| SimulationError::invalid_configuration(format!(
                    "workload size must be small, medium, large, or a number of operations, got '{s}'"
                ))),
        }
    }
}

/// Where a result came from
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Simulated,
    /// Measured by an external hardware probe and normalised into the same shape
    Real,
}
