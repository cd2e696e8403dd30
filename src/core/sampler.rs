use crate::core::aggregate::PointMonthAggregator;
use crate::io::provider::SceneProvider;
use crate::types::{PointMonthKey, PointMonthResult, ValidationPoint, WofsError, WofsResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// What to do when two catalog rows map to the same point-month key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// The result merged last replaces the earlier one
    LastWriteWins,
    /// The result merged first is kept
    KeepFirst,
    /// Collided keys are dropped from the output
    Reject,
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Number of worker threads
    pub workers: usize,
    pub collision_policy: CollisionPolicy,
    /// Log progress every N completed tasks
    pub progress_interval: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            collision_policy: CollisionPolicy::LastWriteWins,
            progress_interval: 100,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> WofsResult<()> {
        if self.workers == 0 {
            return Err(WofsError::Config("worker pool needs at least one worker".to_string()));
        }
        Ok(())
    }
}

/// Monotonic count of completed sampling tasks, shareable across threads
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicUsize>);

impl ProgressCounter {
    pub fn completed(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// Merged output of a sampling run, keyed by `{plot_id}_{month}`
#[derive(Debug, Clone, Default)]
pub struct SamplingResults {
    pub wet: HashMap<String, bool>,
    pub clear_count: HashMap<String, u32>,
    /// Point-months for which the provider had no usable scene
    pub missing: Vec<String>,
    /// Point-months whose task failed
    pub failed: Vec<String>,
    /// Keys produced more than once
    pub collisions: Vec<String>,
    pub completed: usize,
}

impl SamplingResults {
    /// Reassemble the result for one point-month, if it was recorded
    pub fn get(&self, key: &PointMonthKey) -> Option<PointMonthResult> {
        let name = key.to_string();
        let wet = *self.wet.get(&name)?;
        let clear_count = *self.clear_count.get(&name)?;
        Some(PointMonthResult { key: key.clone(), wet, clear_count })
    }

    pub fn len(&self) -> usize {
        self.wet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wet.is_empty()
    }

    /// Fail if any point-month key was produced more than once
    pub fn ensure_unique_keys(&self) -> WofsResult<()> {
        if self.collisions.is_empty() {
            return Ok(());
        }
        Err(WofsError::KeyCollision(self.collisions.join(", ")))
    }
}

/// Message sent from a worker to the collector
#[derive(Debug)]
enum TaskOutcome {
    Sampled(PointMonthResult),
    Missing(PointMonthKey),
    Failed(PointMonthKey, WofsError),
}

type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Runs one point-month task per validation point on a worker pool.
///
/// Workers never touch the result maps: each sends its outcome over a
/// channel to a single collector thread that owns them.
pub struct ParallelSampler<P> {
    provider: P,
    aggregator: PointMonthAggregator,
    config: SamplerConfig,
    progress: ProgressCounter,
    on_progress: Option<ProgressCallback>,
}

impl<P: SceneProvider> ParallelSampler<P> {
    pub fn new(provider: P, aggregator: PointMonthAggregator, config: SamplerConfig) -> Self {
        Self {
            provider,
            aggregator,
            config,
            progress: ProgressCounter::default(),
            on_progress: None,
        }
    }

    /// Called by the collector as `(completed, total)` after every task
    pub fn with_progress_callback<C>(mut self, callback: C) -> Self
    where
        C: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Handle for observing progress from another thread
    pub fn progress(&self) -> ProgressCounter {
        self.progress.clone()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Sample every point and merge the results
    pub fn run(&self, points: &[ValidationPoint]) -> WofsResult<SamplingResults> {
        self.config.validate()?;
        self.aggregator.params().validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("sampler-{}", i))
            .build()
            .map_err(|e| WofsError::Processing(format!("failed to build worker pool: {}", e)))?;

        let total = points.len();
        self.progress.reset();
        log::info!("Sampling {} point-months on {} workers", total, self.config.workers);

        let (tx, rx) = mpsc::channel::<TaskOutcome>();
        let results = std::thread::scope(|scope| {
            let collector = scope.spawn(move || self.collect(rx, total));

            // the last sender drops with this closure, which ends the collector loop
            pool.scope(move |s| {
                for point in points {
                    let tx = tx.clone();
                    s.spawn(move |_| {
                        // the collector only hangs up if it panicked; join reports that
                        let _ = tx.send(self.run_task(point));
                    });
                }
            });

            collector.join()
        })
        .map_err(|_| WofsError::Processing("result collector panicked".to_string()))?;

        log::info!(
            "Sampling finished: {} recorded, {} without scenes, {} failed, {} collisions",
            results.len(),
            results.missing.len(),
            results.failed.len(),
            results.collisions.len()
        );
        Ok(results)
    }

    fn run_task(&self, point: &ValidationPoint) -> TaskOutcome {
        // a panicking provider or kernel fails this point-month only
        let sampled = panic::catch_unwind(AssertUnwindSafe(|| self.aggregator.sample(&self.provider, point)))
            .unwrap_or_else(|payload| {
                Err(WofsError::Processing(format!("task panicked: {}", panic_message(payload.as_ref()))))
            });

        match sampled {
            Ok(Some(result)) => TaskOutcome::Sampled(result),
            Ok(None) => TaskOutcome::Missing(point.key()),
            Err(e) => TaskOutcome::Failed(point.key(), e),
        }
    }

    fn collect(&self, rx: Receiver<TaskOutcome>, total: usize) -> SamplingResults {
        let mut results = SamplingResults::default();
        let mut rejected = HashSet::new();
        let interval = self.config.progress_interval.max(1);

        for outcome in rx {
            match outcome {
                TaskOutcome::Sampled(result) => self.merge(&mut results, &mut rejected, result),
                TaskOutcome::Missing(key) => results.missing.push(key.to_string()),
                TaskOutcome::Failed(key, e) => {
                    log::warn!("Sampling {} failed: {}", key, e);
                    results.failed.push(key.to_string());
                }
            }

            let done = self.progress.increment();
            results.completed = done;
            if let Some(callback) = &self.on_progress {
                callback(done, total);
            }
            if done % interval == 0 || done == total {
                log::info!(
                    "Progress: {}/{} ({:.1}%)",
                    done,
                    total,
                    done as f64 / total.max(1) as f64 * 100.0
                );
            }
        }

        results
    }

    fn merge(&self, results: &mut SamplingResults, rejected: &mut HashSet<String>, result: PointMonthResult) {
        let key = result.key.to_string();

        if results.wet.contains_key(&key) || rejected.contains(&key) {
            log::warn!(
                "Point-month {} produced more than once ({:?})",
                key,
                self.config.collision_policy
            );
            results.collisions.push(key.clone());

            match self.config.collision_policy {
                CollisionPolicy::LastWriteWins => {}
                CollisionPolicy::KeepFirst => return,
                CollisionPolicy::Reject => {
                    results.wet.remove(&key);
                    results.clear_count.remove(&key);
                    rejected.insert(key);
                    return;
                }
            }
        }

        results.wet.insert(key.clone(), result.wet);
        results.clear_count.insert(key, result.clear_count);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
