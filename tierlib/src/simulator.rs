use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use crate::cache::MultiLevelCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{Mode, SimulationConfig, StructureKind};
use crate::error::{Result, SimulationError};
use crate::result::{rates, throughput, BackendCounters, LatencySummary, PartialResult, RunStatus, SimulationResult};
use crate::search_structures::{Backend, SearchStructure};
use crate::workload::{Record, WorkloadGenerator};

// Keeps the cache's latency stream independent of the workload stream for the same seed
const CACHE_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Error type progress callbacks may fail with. Failures are logged, never propagated
pub type ProgressError = Box<dyn Error + Send + Sync>;

/// Shared flag used to stop a run between two operations
///
/// Clones share the flag, so a handle can be given to another thread or captured by a progress
/// callback while the engine itself is busy running
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives access sequences through the cache hierarchy and the search structures
///
/// The corpus is generated and inserted into all three backends up front; backends are read-only
/// from then on. Each run starts from an empty cache, so runs never influence each other
///
/// The simulator supports running multiple times, and accumulates the time spent simulating
pub struct SimulationEngine<C: Clock = SystemClock> {
    config: SimulationConfig,
    corpus: Vec<Arc<Record>>,
    // Indexed in StructureKind::ALL order
    backends: [Backend<Arc<Record>>; 3],
    cache: MultiLevelCache<Arc<Record>, StdRng>,
    workload: WorkloadGenerator<StdRng>,
    clock: C,
    cancellation: CancellationToken,
    status: RunStatus,
    simulation_time: Duration,
}

impl SimulationEngine<SystemClock> {
    /// Creates an engine timed by the system clock
    ///
    /// # Arguments
    ///
    /// * `config`: A simulation configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<SimulationEngine, SimulationError>
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> SimulationEngine<C> {
    /// Creates an engine with an explicit clock. Tests pass a manual clock here
    pub fn with_clock(config: SimulationConfig, clock: C) -> Result<Self> {
        config.validate()?;
        debug!(?config, "building simulation engine");
        let mut workload = WorkloadGenerator::new(config.workload.clone(), StdRng::seed_from_u64(config.seed))?;
        let cache = MultiLevelCache::new(&config.hierarchy, StdRng::seed_from_u64(config.seed ^ CACHE_SEED_MIX))?;
        let corpus = workload.generate_corpus();
        let mut backends = [
            Backend::new(StructureKind::Bst, config.hash_buckets)?,
            Backend::new(StructureKind::Hash, config.hash_buckets)?,
            Backend::new(StructureKind::Trie, config.hash_buckets)?,
        ];
        for backend in backends.iter_mut() {
            for record in &corpus {
                backend.insert(&record.key, Arc::clone(record));
            }
        }
        debug!(records = corpus.len(), "populated search structures");
        Ok(Self {
            config,
            corpus,
            backends,
            cache,
            workload,
            clock,
            cancellation: CancellationToken::default(),
            status: RunStatus::Idle,
            simulation_time: Duration::ZERO,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn corpus(&self) -> &[Arc<Record>] {
        &self.corpus
    }

    pub fn backend(&self, kind: StructureKind) -> &Backend<Arc<Record>> {
        &self.backends[backend_index(kind)]
    }

    pub fn cache(&self) -> &MultiLevelCache<Arc<Record>, StdRng> {
        &self.cache
    }

    /// Status of the current or most recent run
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Handle which can cancel runs from outside the engine
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Asks the current run to stop after the operation in progress
    ///
    /// The flag belongs to one run and is cleared when that run finishes, whatever its status.
    /// Cancelling while idle stops the next run before its first operation
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Wall-clock time spent inside runs, accumulated over the engine's lifetime
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Draws a fresh access sequence of `operations` indices into the corpus
    pub fn generate_access_sequence(&mut self, operations: usize) -> Vec<usize> {
        self.workload.access_sequence(self.corpus.len(), operations)
    }

    /// Starts a run over a freshly drawn access sequence. The run does nothing until advanced
    pub fn start(&mut self, kind: StructureKind, operations: usize) -> SimulationRun<'_, C> {
        let sequence = self.generate_access_sequence(operations);
        self.begin(kind, sequence)
    }

    /// Starts a run over a given sequence of corpus indices, against an empty cache
    ///
    /// Fails with [`SimulationError::InvalidConfiguration`] if an index is past the end of the
    /// corpus, before any work is done
    pub fn start_with_sequence(&mut self, kind: StructureKind, sequence: Vec<usize>) -> Result<SimulationRun<'_, C>> {
        if let Some(position) = sequence.iter().position(|&index| index >= self.corpus.len()) {
            return Err(SimulationError::invalid_configuration(format!(
                "access {position} refers to record {} but the corpus holds {} records",
                sequence[position],
                self.corpus.len()
            )));
        }
        Ok(self.begin(kind, sequence))
    }

    fn begin(&mut self, kind: StructureKind, sequence: Vec<usize>) -> SimulationRun<'_, C> {
        info!(structure = %kind, operations = sequence.len(), "starting simulation");
        self.cache.reset();
        self.status = RunStatus::Running;
        let started_at = self.clock.now();
        SimulationRun {
            engine: self,
            kind,
            sequence,
            cursor: 0,
            hits: 0,
            misses: 0,
            latency: LatencySummary::default(),
            backend: BackendCounters::default(),
            started_at,
            finished_at: None,
            status: RunStatus::Running,
        }
    }

    /// Runs a whole simulation without progress reporting
    pub fn run(&mut self, kind: StructureKind, operations: usize) -> SimulationResult {
        let mut run = self.start(kind, operations);
        run.advance(usize::MAX);
        run.finish()
    }

    /// Like [`SimulationEngine::run`], with the structure given by name. Unknown names fail before
    /// any work is done
    pub fn run_named(&mut self, structure: &str, operations: usize) -> Result<SimulationResult> {
        let kind = structure.parse::<StructureKind>()?;
        Ok(self.run(kind, operations))
    }

    /// Runs a whole simulation, calling `on_progress` after every `stride` operations
    ///
    /// Without a stride the configured `progress_stride` is used. The callback receives the
    /// percentage complete and a snapshot of the statistics so far. A failing callback is logged and
    /// the run carries on
    pub fn run_with_progress<F>(&mut self, kind: StructureKind, operations: usize, stride: Option<usize>, on_progress: F) -> Result<SimulationResult>
    where
        F: FnMut(f64, &PartialResult) -> std::result::Result<(), ProgressError>,
    {
        let stride = self.stride_or_default(stride)?;
        let sequence = self.generate_access_sequence(operations);
        let mut on_progress = on_progress;
        Ok(self.begin(kind, sequence).drive(stride, &mut on_progress))
    }

    /// Runs every backend in turn over the same access sequence, each against an empty cache
    ///
    /// If a run is cancelled the remaining backends are skipped and the results so far returned,
    /// the last of which is the partial, cancelled one
    pub fn run_comparative(&mut self, operations: usize) -> Vec<SimulationResult> {
        self.comparative(operations, usize::MAX, &mut |_: f64, _: &PartialResult| Ok(()))
    }

    /// Comparative run with progress reporting, see [`SimulationEngine::run_with_progress`]
    pub fn run_comparative_with_progress<F>(&mut self, operations: usize, stride: Option<usize>, on_progress: F) -> Result<Vec<SimulationResult>>
    where
        F: FnMut(f64, &PartialResult) -> std::result::Result<(), ProgressError>,
    {
        let stride = self.stride_or_default(stride)?;
        let mut on_progress = on_progress;
        Ok(self.comparative(operations, stride, &mut on_progress))
    }

    fn comparative(
        &mut self,
        operations: usize,
        stride: usize,
        on_progress: &mut dyn FnMut(f64, &PartialResult) -> std::result::Result<(), ProgressError>,
    ) -> Vec<SimulationResult> {
        let sequence = self.generate_access_sequence(operations);
        let mut results = Vec::with_capacity(StructureKind::ALL.len());
        for kind in StructureKind::ALL {
            let result = self.begin(kind, sequence.clone()).drive(stride, on_progress);
            let cancelled = result.status == RunStatus::Cancelled;
            results.push(result);
            if cancelled {
                info!("comparative run cancelled, skipping remaining structures");
                break;
            }
        }
        results
    }

    fn stride_or_default(&self, stride: Option<usize>) -> Result<usize> {
        match stride.unwrap_or(self.config.progress_stride) {
            0 => Err(SimulationError::invalid_configuration("progress stride must be at least 1")),
            stride => Ok(stride),
        }
    }
}

fn backend_index(kind: StructureKind) -> usize {
    match kind {
        StructureKind::Bst => 0,
        StructureKind::Hash => 1,
        StructureKind::Trie => 2,
    }
}

/// A run in progress
///
/// Nothing happens until [`SimulationRun::advance`] is called, and each call does a bounded amount
/// of work before handing control back. Callers who need to stay responsive advance in small
/// steps; [`SimulationRun::finish`] turns the run into its result, cancelling it if it is still
/// going
pub struct SimulationRun<'e, C: Clock> {
    engine: &'e mut SimulationEngine<C>,
    kind: StructureKind,
    sequence: Vec<usize>,
    cursor: usize,
    hits: u64,
    misses: u64,
    latency: LatencySummary,
    backend: BackendCounters,
    started_at: Duration,
    finished_at: Option<Duration>,
    status: RunStatus,
}

impl<'e, C: Clock> SimulationRun<'e, C> {
    pub fn kind(&self) -> StructureKind {
        self.kind
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn operations_completed(&self) -> usize {
        self.cursor
    }

    pub fn total_operations(&self) -> usize {
        self.sequence.len()
    }

    /// Performs at most `max_operations` operations, checking for cancellation before each one
    ///
    /// returns: the status after this step, `Running` if there is more work left
    pub fn advance(&mut self, max_operations: usize) -> RunStatus {
        if self.status != RunStatus::Running {
            return self.status;
        }
        let end = self.cursor.saturating_add(max_operations).min(self.sequence.len());
        while self.cursor < end {
            if self.engine.cancellation.is_cancelled() {
                self.stop(RunStatus::Cancelled);
                return self.status;
            }
            let index = self.sequence[self.cursor];
            self.step(index);
            self.cursor += 1;
        }
        if self.cursor == self.sequence.len() {
            self.stop(RunStatus::Completed);
        }
        self.status
    }

    /// One access: cache first, then the backend on a miss
    fn step(&mut self, index: usize) {
        let engine = &mut *self.engine;
        let record = &engine.corpus[index];
        let key = record.key.as_str();
        let lookup = engine.cache.get(key);
        if lookup.hit() {
            self.hits += 1;
            self.latency.record(lookup.total_latency_ns);
            return;
        }
        self.misses += 1;
        let outcome = engine.backends[backend_index(self.kind)].lookup(key, &engine.clock);
        self.backend.record(outcome.found(), outcome.cost, outcome.elapsed);
        self.latency.record(lookup.total_latency_ns + outcome.elapsed.as_secs_f64() * 1e9);
        // Keys the backend doesn't know about are never cached
        if let Some(value) = outcome.value {
            engine.cache.put(key, value);
        }
    }

    fn stop(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(self.engine.clock.now());
    }

    /// Statistics gathered so far
    pub fn partial(&self) -> PartialResult {
        let (hit_rate, miss_rate) = rates(self.hits, self.misses);
        PartialResult {
            structure: self.kind,
            operations_completed: self.cursor as u64,
            total_operations: self.sequence.len() as u64,
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            miss_rate,
            avg_latency: self.latency.average(),
        }
    }

    /// Advances to the end, reporting after every `stride` completed operations
    fn drive(
        mut self,
        stride: usize,
        on_progress: &mut dyn FnMut(f64, &PartialResult) -> std::result::Result<(), ProgressError>,
    ) -> SimulationResult {
        loop {
            let status = self.advance(stride);
            let completed = self.cursor;
            if completed > 0 && completed % stride == 0 && status != RunStatus::Cancelled {
                let partial = self.partial();
                if let Err(e) = on_progress(partial.percent_complete(), &partial) {
                    warn!(structure = %self.kind, operation = completed, error = %e, "progress callback failed");
                }
            }
            if status.is_finished() {
                return self.finish();
            }
        }
    }

    /// Turns the run into its result. A run which hasn't reached the end is marked cancelled
    pub fn finish(mut self) -> SimulationResult {
        if self.status == RunStatus::Running {
            self.stop(RunStatus::Cancelled);
        }
        let finished_at = self.finished_at.unwrap_or_else(|| self.engine.clock.now());
        let elapsed = finished_at.saturating_sub(self.started_at);
        let operations = self.hits + self.misses;
        let (hit_rate, miss_rate) = rates(self.hits, self.misses);
        let result = SimulationResult {
            structure: self.kind,
            source: Mode::Simulated,
            status: self.status,
            hit_rate,
            miss_rate,
            avg_latency: self.latency.average(),
            max_latency: self.latency.max(),
            min_latency: self.latency.min(),
            throughput: throughput(operations, elapsed),
            operations_performed: operations,
            hits: self.hits,
            misses: self.misses,
            total_time: elapsed.as_secs_f64() * 1e3,
            cache_stats: Some(self.engine.cache.overall_stats()),
            backend_stats: Some(self.backend.snapshot()),
        };
        self.engine.simulation_time += elapsed;
        self.engine.status = self.status;
        self.engine.cancellation.clear();
        info!(
            structure = %self.kind,
            status = ?self.status,
            operations,
            hit_rate = format_args!("{hit_rate:.2}"),
            avg_latency_ns = format_args!("{:.2}", result.avg_latency),
            "simulation finished"
        );
        result
    }
}
