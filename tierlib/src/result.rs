use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::cache::HierarchyStats;
use crate::config::{Mode, StructureKind};
use crate::error::{Result, SimulationError};
use crate::search_structures::CostMetric;

/// Lifecycle of a simulation run: `Idle -> Running -> {Completed | Cancelled}`
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Cancelled)
    }
}

/// Running min/max/total over latency samples, in nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    count: u64,
    total: f64,
    min: f64,
    max: f64,
}

impl LatencySummary {
    pub fn record(&mut self, sample: f64) {
        if self.count == 0 {
            self.min = sample;
            self.max = sample;
        } else {
            self.min = self.min.min(sample);
            self.max = self.max.max(sample);
        }
        self.count += 1;
        self.total += sample;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// All three of these are 0 when nothing has been recorded
    pub fn average(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.total / self.count as f64 }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// How hard the backend had to work for the lookups which missed the cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStats {
    pub lookups: u64,
    pub not_found: u64,
    pub average_cost: f64,
    pub max_cost: u64,
    /// Total time spent inside the backend, in milliseconds
    pub total_time: f64,
}

/// Accumulates [`BackendStats`] during a run
#[derive(Debug, Clone, Default)]
pub(crate) struct BackendCounters {
    lookups: u64,
    not_found: u64,
    total_cost: u64,
    max_cost: u64,
    time: Duration,
}

impl BackendCounters {
    pub(crate) fn record(&mut self, found: bool, cost: CostMetric, elapsed: Duration) {
        self.lookups += 1;
        if !found {
            self.not_found += 1;
        }
        self.total_cost += cost.value();
        self.max_cost = self.max_cost.max(cost.value());
        self.time += elapsed;
    }

    pub(crate) fn snapshot(&self) -> BackendStats {
        BackendStats {
            lookups: self.lookups,
            not_found: self.not_found,
            average_cost: if self.lookups == 0 { 0.0 } else { self.total_cost as f64 / self.lookups as f64 },
            max_cost: self.max_cost,
            total_time: self.time.as_secs_f64() * 1e3,
        }
    }
}

/// Hit and miss rates as percentages. They add up to exactly 100, or are both 0 for no operations
pub fn rates(hits: u64, misses: u64) -> (f64, f64) {
    let total = hits + misses;
    if total == 0 {
        return (0.0, 0.0);
    }
    let hit_rate = hits as f64 / total as f64 * 100.0;
    (hit_rate, 100.0 - hit_rate)
}

/// Operations per second. Defined as 0 for a run which took no measurable time
pub fn throughput(operations: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if operations == 0 || seconds <= 0.0 {
        return 0.0;
    }
    let value = operations as f64 / seconds;
    if value.is_finite() { value } else { 0.0 }
}

/// Snapshot handed to progress callbacks while a run is still going
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResult {
    pub structure: StructureKind,
    pub operations_completed: u64,
    pub total_operations: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub avg_latency: f64,
}

impl PartialResult {
    /// Share of the run done so far, 100 for an empty run
    pub fn percent_complete(&self) -> f64 {
        if self.total_operations == 0 {
            100.0
        } else {
            self.operations_completed as f64 * 100.0 / self.total_operations as f64
        }
    }
}

/// The outcome of one simulation run. Serialises to the format the presentation layer reads
///
/// Latencies are in nanoseconds, total time in milliseconds, throughput in operations per second
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub structure: StructureKind,
    pub source: Mode,
    pub status: RunStatus,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub avg_latency: f64,
    pub max_latency: f64,
    pub min_latency: f64,
    pub throughput: f64,
    pub operations_performed: u64,
    pub hits: u64,
    pub misses: u64,
    pub total_time: f64,
    /// Absent for externally measured results
    pub cache_stats: Option<HierarchyStats>,
    pub backend_stats: Option<BackendStats>,
}

/// A result measured on real hardware by an external probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMeasurement {
    /// Percentage of accesses the probe considered cache friendly
    pub cache_efficiency: f64,
    /// Average latency, in nanoseconds
    pub real_latency: f64,
    /// Operations per second
    pub real_throughput: f64,
    #[serde(default)]
    pub operations_performed: u64,
    /// Milliseconds
    #[serde(default)]
    pub total_time: f64,
}

impl SimulationResult {
    /// Normalises an external measurement into the same shape as a simulated result
    ///
    /// The efficiency is clamped to [0, 100]. The reported latency stands in for the average, the
    /// minimum, and the maximum, as the probe only reports one figure
    pub fn from_external(structure: StructureKind, measurement: &ExternalMeasurement) -> Result<Self> {
        let fields = [
            ("cacheEfficiency", measurement.cache_efficiency),
            ("realLatency", measurement.real_latency),
            ("realThroughput", measurement.real_throughput),
            ("totalTime", measurement.total_time),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::InvalidMeasurement(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        let hit_rate = measurement.cache_efficiency.min(100.0);
        // Keep hits + misses == operations, the probe only reports a percentage
        let operations = measurement.operations_performed;
        let hits = ((operations as f64 * hit_rate / 100.0).round() as u64).min(operations);
        Ok(Self {
            structure,
            source: Mode::Real,
            status: RunStatus::Completed,
            hit_rate,
            miss_rate: 100.0 - hit_rate,
            avg_latency: measurement.real_latency,
            max_latency: measurement.real_latency,
            min_latency: measurement.real_latency,
            throughput: measurement.real_throughput,
            operations_performed: operations,
            hits,
            misses: operations - hits,
            total_time: measurement.total_time,
            cache_stats: None,
            backend_stats: None,
        })
    }
}
