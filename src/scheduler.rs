//! Test-run scheduler: job expansion, artifact reuse, bounded concurrency
//!
//! The run is planned up front: every (model, test) pair expands into
//! `runs_per_test` invocations. Prior artifacts matching a job's content
//! signature are consumed first and re-scored; only the remainder is
//! enqueued. A fixed pool of workers pulls jobs from the queue, races each
//! backend call against the per-job timeout (no retries), and reports
//! outcomes over a channel to a single aggregator that updates statistics
//! incrementally and persists fresh artifacts.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::artifacts::{signature, ArtifactStore, RunArtifact};
use crate::backend::{Backend, TokenUsage};
use crate::models::Model;
use crate::score::Score;
use crate::suite::Suite;

/// Knobs for one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub models: Vec<String>,
    pub runs_per_test: usize,
    pub max_concurrent: usize,
    pub timeout_secs: u64,
    pub reuse_artifacts: bool,
}

/// One planned model invocation
#[derive(Debug, Clone)]
struct Job {
    model: String,
    test_id: String,
    run_index: usize,
    prompt: String,
    max_tokens: u32,
    signature: String,
}

/// How an invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Fresh backend call completed
    Completed,
    /// Served from a prior run artifact
    Reused,
    /// Lost the timeout race
    TimedOut,
    /// Backend returned an error
    Failed,
}

/// One scored invocation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub model: String,
    pub test_id: String,
    pub run_index: usize,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub score: Score,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub cost: f64,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::TimedOut | OutcomeStatus::Failed)
    }
}

/// Result of a full scheduler run
#[derive(Debug)]
pub struct RunResult {
    pub stats: crate::stats::RunStats,
    pub outcomes: Vec<Outcome>,
    pub cancelled: bool,
}

/// The scheduler itself
pub struct Scheduler {
    backend: Arc<dyn Backend>,
    suite: Arc<Suite>,
    pricing: Arc<HashMap<String, Model>>,
    stop: Arc<AtomicBool>,
    quiet: bool,
}

impl Scheduler {
    pub fn new(backend: Arc<dyn Backend>, suite: Suite, models: &[Model]) -> Self {
        let pricing = models
            .iter()
            .map(|m| (m.id.clone(), m.clone()))
            .collect::<HashMap<_, _>>();
        Self {
            backend,
            suite: Arc::new(suite),
            pricing: Arc::new(pricing),
            stop: Arc::new(AtomicBool::new(false)),
            quiet: false,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Shared stop flag; flip it (e.g. from a Ctrl-C handler) to drain the
    /// queue and finish with whatever completed.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run the suite against every configured model
    pub async fn run(&self, config: &RunConfig, store: &mut ArtifactStore) -> Result<RunResult> {
        if config.models.is_empty() {
            anyhow::bail!("No models to benchmark");
        }
        self.suite.validate()?;

        let runs = config.runs_per_test.max(1);
        let workers = config.max_concurrent.max(1);
        let timeout = Duration::from_secs(config.timeout_secs.max(1));

        // Plan: reuse first, enqueue the remainder
        let mut reused_outcomes = Vec::new();
        let mut queue = VecDeque::new();

        for model in &config.models {
            for test in &self.suite.tests {
                let prompt = test.full_prompt();
                let sig = signature(model, &prompt, test.max_tokens);

                let cached = if config.reuse_artifacts {
                    store.take(&sig, runs)
                } else {
                    Vec::new()
                };

                for (run_index, artifact) in cached.iter().enumerate() {
                    // Re-score against the current test definition; the
                    // signature only covers what the backend was asked.
                    let score = Score::compute(test, &artifact.response);
                    reused_outcomes.push(Outcome {
                        model: model.clone(),
                        test_id: test.id.clone(),
                        run_index,
                        status: OutcomeStatus::Reused,
                        error: None,
                        score,
                        usage: artifact.usage,
                        latency_ms: artifact.latency_ms,
                        cost: artifact.cost,
                    });
                }

                for run_index in cached.len()..runs {
                    queue.push_back(Job {
                        model: model.clone(),
                        test_id: test.id.clone(),
                        run_index,
                        prompt: prompt.clone(),
                        max_tokens: test.max_tokens,
                        signature: sig.clone(),
                    });
                }
            }
        }

        let total = reused_outcomes.len() + queue.len();
        if !self.quiet {
            println!(
                "Planned {} invocations: {} reused, {} live ({} workers, {}s timeout)",
                total,
                reused_outcomes.len(),
                queue.len(),
                workers,
                timeout.as_secs()
            );
        }

        let mut stats = crate::stats::RunStats::default();
        let mut outcomes = Vec::with_capacity(total);
        let mut done = 0usize;

        // Reused outcomes go through the same aggregation path as live ones
        for outcome in reused_outcomes {
            done += 1;
            self.progress(done, total, &outcome);
            absorb(&mut stats, &outcome);
            outcomes.push(outcome);
        }

        // Worker pool: N tasks pulling from the shared queue
        let queue = Arc::new(Mutex::new(queue));
        let (tx, mut rx) = mpsc::channel::<(Outcome, Option<RunArtifact>)>(64);

        let mut handles = Vec::new();
        for _ in 0..workers {
            let queue = queue.clone();
            let tx = tx.clone();
            let backend = self.backend.clone();
            let suite = self.suite.clone();
            let pricing = self.pricing.clone();
            let stop = self.stop.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let job = { queue.lock().expect("queue lock").pop_front() };
                    let Some(job) = job else { break };

                    let (outcome, artifact) =
                        run_job(&*backend, &suite, &pricing, &job, timeout).await;
                    if tx.send((outcome, artifact)).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        // Aggregator: single consumer, incremental stats, artifact writes
        while let Some((outcome, artifact)) = rx.recv().await {
            done += 1;
            self.progress(done, total, &outcome);
            absorb(&mut stats, &outcome);
            if let Some(artifact) = artifact {
                if let Err(e) = store.append(artifact) {
                    eprintln!("warning: failed to persist artifact: {}", e);
                }
            }
            outcomes.push(outcome);
        }

        let _ = futures::future::join_all(handles).await;

        let cancelled = self.stop.load(Ordering::Relaxed);
        if cancelled && !self.quiet {
            println!("Cancelled after {}/{} invocations", done, total);
        }

        Ok(RunResult {
            stats,
            outcomes,
            cancelled,
        })
    }

    fn progress(&self, done: usize, total: usize, outcome: &Outcome) {
        if self.quiet {
            return;
        }
        let tag = match outcome.status {
            OutcomeStatus::Completed => "ok",
            OutcomeStatus::Reused => "reused",
            OutcomeStatus::TimedOut => "timeout",
            OutcomeStatus::Failed => "failed",
        };
        println!(
            "[{}/{}] {} {} #{} {} score:{:.2} {}ms",
            done,
            total,
            outcome.model,
            outcome.test_id,
            outcome.run_index,
            tag,
            outcome.score.weighted,
            outcome.latency_ms
        );
    }
}

/// Execute one job: timeout race, scoring, artifact construction.
/// Failures and timeouts never produce an artifact.
async fn run_job(
    backend: &dyn Backend,
    suite: &Suite,
    pricing: &HashMap<String, Model>,
    job: &Job,
    timeout: Duration,
) -> (Outcome, Option<RunArtifact>) {
    let start = Instant::now();

    match tokio::time::timeout(timeout, backend.complete(&job.model, &job.prompt, job.max_tokens))
        .await
    {
        Ok(Ok(completion)) => {
            let latency_ms = start.elapsed().as_millis() as u64;
            let cost = pricing
                .get(&job.model)
                .map(|m| {
                    m.cost(
                        completion.usage.prompt_tokens,
                        completion.usage.completion_tokens,
                    )
                })
                .unwrap_or(0.0);

            // Planner guarantees the test exists; a missing id means the
            // suite changed mid-run, score it as failed.
            let score = match suite.get(&job.test_id) {
                Some(test) => Score::compute(test, &completion.text),
                None => Score::failed(),
            };

            let artifact = RunArtifact {
                signature: job.signature.clone(),
                model: job.model.clone(),
                test_id: job.test_id.clone(),
                response: completion.text,
                usage: completion.usage,
                latency_ms,
                cost,
                created_at: Utc::now(),
            };

            (
                Outcome {
                    model: job.model.clone(),
                    test_id: job.test_id.clone(),
                    run_index: job.run_index,
                    status: OutcomeStatus::Completed,
                    error: None,
                    score,
                    usage: completion.usage,
                    latency_ms,
                    cost,
                },
                Some(artifact),
            )
        }
        Ok(Err(e)) => (
            Outcome {
                model: job.model.clone(),
                test_id: job.test_id.clone(),
                run_index: job.run_index,
                status: OutcomeStatus::Failed,
                error: Some(e.to_string()),
                score: Score::failed(),
                usage: TokenUsage::default(),
                latency_ms: start.elapsed().as_millis() as u64,
                cost: 0.0,
            },
            None,
        ),
        Err(_) => (
            Outcome {
                model: job.model.clone(),
                test_id: job.test_id.clone(),
                run_index: job.run_index,
                status: OutcomeStatus::TimedOut,
                error: Some(format!("timed out after {}s", timeout.as_secs())),
                score: Score::failed(),
                usage: TokenUsage::default(),
                latency_ms: timeout.as_millis() as u64,
                cost: 0.0,
            },
            None,
        ),
    }
}

/// Fold one outcome into the running stats
fn absorb(stats: &mut crate::stats::RunStats, outcome: &Outcome) {
    if outcome.is_failure() {
        stats.record_failure(&outcome.model, &outcome.test_id, outcome.latency_ms);
    } else {
        stats.record(
            &outcome.model,
            &outcome.test_id,
            outcome.score.raw,
            outcome.score.weighted,
            outcome.score.passed,
            outcome.latency_ms,
            outcome.usage.total_tokens as u64,
            outcome.cost,
            outcome.status == OutcomeStatus::Reused,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Completion;
    use crate::suite::TestCase;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Backend that answers from a canned map and counts invocations
    struct CannedBackend {
        responses: HashMap<String, String>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl CannedBackend {
        fn new(responses: HashMap<String, String>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: Duration::from_millis(10),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for CannedBackend {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _model: &str,
            prompt: &str,
            _max_tokens: u32,
        ) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let key = self
                .responses
                .keys()
                .find(|k| prompt.contains(k.as_str()))
                .cloned();
            match key {
                Some(k) => Ok(Completion {
                    text: self.responses[&k].clone(),
                    usage: TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 20,
                        total_tokens: 30,
                    },
                }),
                None => anyhow::bail!("no canned response"),
            }
        }
    }

    fn tiny_suite() -> Suite {
        Suite {
            name: "tiny".into(),
            version: 1,
            tests: vec![
                TestCase {
                    id: "greeting".into(),
                    prompt: "Say the word greeting".into(),
                    context: None,
                    expect: vec!["hello".into()],
                    forbid: vec!["goodbye".into()],
                    max_tokens: 50,
                    weight: 1.0,
                },
                TestCase {
                    id: "farewell".into(),
                    prompt: "Say the word farewell".into(),
                    context: None,
                    expect: vec!["bye".into()],
                    forbid: vec![],
                    max_tokens: 50,
                    weight: 1.0,
                },
            ],
        }
    }

    fn canned() -> CannedBackend {
        let mut responses = HashMap::new();
        responses.insert("greeting".to_string(), "Hello there!".to_string());
        responses.insert("farewell".to_string(), "Bye for now".to_string());
        CannedBackend::new(responses)
    }

    fn run_config(models: &[&str], runs: usize, reuse: bool) -> RunConfig {
        RunConfig {
            models: models.iter().map(|s| s.to_string()).collect(),
            runs_per_test: runs,
            max_concurrent: 2,
            timeout_secs: 5,
            reuse_artifacts: reuse,
        }
    }

    #[tokio::test]
    async fn test_run_all_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let scheduler =
            Scheduler::new(Arc::new(canned()), tiny_suite(), &[]).quiet(true);
        let result = scheduler
            .run(&run_config(&["m/a"], 1, true), &mut store)
            .await
            .unwrap();

        assert_eq!(result.outcomes.len(), 2);
        assert!(result.outcomes.iter().all(|o| !o.is_failure()));
        assert_eq!(result.stats.models["m/a"].overall.passes, 2);
        assert!(!result.cancelled);
        // Both successes cached
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_reuses_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        let config = run_config(&["m/a"], 1, true);

        let backend = Arc::new(canned());
        let scheduler = Scheduler::new(backend.clone(), tiny_suite(), &[]).quiet(true);
        scheduler.run(&config, &mut store).await.unwrap();
        assert_eq!(backend.calls(), 2);

        let result = scheduler.run(&config, &mut store).await.unwrap();
        // No new backend calls; everything served from artifacts
        assert_eq!(backend.calls(), 2);
        assert_eq!(result.stats.total_reused(), 2);
        assert!(result
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Reused));
        // Reused outcomes are not re-persisted
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_run_ignores_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let backend = Arc::new(canned());
        let scheduler = Scheduler::new(backend.clone(), tiny_suite(), &[]).quiet(true);

        scheduler
            .run(&run_config(&["m/a"], 1, true), &mut store)
            .await
            .unwrap();
        scheduler
            .run(&run_config(&["m/a"], 1, false), &mut store)
            .await
            .unwrap();

        assert_eq!(backend.calls(), 4);
        // Fresh runs still record new artifacts
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_partial_reuse_tops_up() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        let backend = Arc::new(canned());
        let scheduler = Scheduler::new(backend.clone(), tiny_suite(), &[]).quiet(true);

        // One artifact per (model, test)
        scheduler
            .run(&run_config(&["m/a"], 1, true), &mut store)
            .await
            .unwrap();
        assert_eq!(backend.calls(), 2);

        // Asking for 3 runs reuses 1 and fires 2 live per test
        let result = scheduler
            .run(&run_config(&["m/a"], 3, true), &mut store)
            .await
            .unwrap();
        assert_eq!(backend.calls(), 2 + 4);
        assert_eq!(result.stats.total_runs(), 6);
        assert_eq!(result.stats.total_reused(), 2);
    }

    #[tokio::test]
    async fn test_reused_artifact_rescored_against_edited_suite() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        let backend = Arc::new(canned());

        let scheduler = Scheduler::new(backend.clone(), tiny_suite(), &[]).quiet(true);
        scheduler
            .run(&run_config(&["m/a"], 1, true), &mut store)
            .await
            .unwrap();

        // Same prompts, flipped expectations: cached "Hello there!" now fails
        let mut edited = tiny_suite();
        edited.tests[0].expect = vec!["howdy".into()];
        let scheduler2 = Scheduler::new(backend.clone(), edited, &[]).quiet(true);
        let result = scheduler2
            .run(&run_config(&["m/a"], 1, true), &mut store)
            .await
            .unwrap();

        // Still no new backend calls: signature ignores expectations
        assert_eq!(backend.calls(), 2);
        let greeting = result
            .outcomes
            .iter()
            .find(|o| o.test_id == "greeting")
            .unwrap();
        assert_eq!(greeting.status, OutcomeStatus::Reused);
        assert!(!greeting.score.passed);
    }

    #[tokio::test]
    async fn test_backend_error_not_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        // Backend only knows "greeting"; "farewell" errors
        let mut responses = HashMap::new();
        responses.insert("greeting".to_string(), "Hello there!".to_string());
        let backend = Arc::new(CannedBackend::new(responses));

        let scheduler = Scheduler::new(backend, tiny_suite(), &[]).quiet(true);
        let result = scheduler
            .run(&run_config(&["m/a"], 1, true), &mut store)
            .await
            .unwrap();

        let failed: Vec<_> = result.outcomes.iter().filter(|o| o.is_failure()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].status, OutcomeStatus::Failed);
        assert!(failed[0].error.is_some());
        // Only the success was persisted
        assert_eq!(store.len(), 1);
        assert_eq!(result.stats.models["m/a"].overall.failures, 1);
    }

    #[tokio::test]
    async fn test_timeout_race() {
        struct SlowBackend;

        #[async_trait]
        impl Backend for SlowBackend {
            fn name(&self) -> &str {
                "slow"
            }
            async fn complete(&self, _: &str, _: &str, _: u32) -> Result<Completion> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!()
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let scheduler = Scheduler::new(Arc::new(SlowBackend), tiny_suite(), &[]).quiet(true);
        let mut config = run_config(&["m/a"], 1, true);
        config.timeout_secs = 1;

        let result = scheduler.run(&config, &mut store).await.unwrap();
        assert!(result
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::TimedOut));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let backend = Arc::new(canned());
        let scheduler = Scheduler::new(backend.clone(), tiny_suite(), &[]).quiet(true);

        let mut config = run_config(&["m/a", "m/b", "m/c"], 2, false);
        config.max_concurrent = 2;
        scheduler.run(&config, &mut store).await.unwrap();

        assert_eq!(backend.calls(), 12);
        assert!(backend.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_zero_runs_and_workers_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let backend = Arc::new(canned());
        let scheduler = Scheduler::new(backend.clone(), tiny_suite(), &[]).quiet(true);

        let mut config = run_config(&["m/a"], 0, false);
        config.max_concurrent = 0;
        let result = scheduler.run(&config, &mut store).await.unwrap();

        // Both knobs clamp to 1: one run per (model, test), executed by a
        // single worker
        assert_eq!(result.stats.total_runs(), 2);
        assert_eq!(backend.calls(), 2);
        assert!(result.outcomes.iter().all(|o| !o.is_failure()));
    }

    #[tokio::test]
    async fn test_no_models_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        let scheduler = Scheduler::new(Arc::new(canned()), tiny_suite(), &[]).quiet(true);

        let result = scheduler.run(&run_config(&[], 1, true), &mut store).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stop_flag_drains_queue() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let backend = Arc::new(canned());
        let scheduler = Scheduler::new(backend.clone(), tiny_suite(), &[]).quiet(true);
        // Stop before starting: workers exit without pulling anything
        scheduler.stop_flag().store(true, Ordering::SeqCst);

        let result = scheduler
            .run(&run_config(&["m/a"], 5, false), &mut store)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(backend.calls(), 0);
        assert!(result.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_cost_from_pricing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let priced = Model {
            id: "m/a".into(),
            name: "a".into(),
            context_length: 8192,
            pricing_prompt: 0.001,
            pricing_completion: 0.002,
        };
        let scheduler =
            Scheduler::new(Arc::new(canned()), tiny_suite(), &[priced]).quiet(true);
        let result = scheduler
            .run(&run_config(&["m/a"], 1, false), &mut store)
            .await
            .unwrap();

        // usage is 10 prompt + 20 completion per call
        let expected = 10.0 * 0.001 + 20.0 * 0.002;
        for outcome in &result.outcomes {
            assert!((outcome.cost - expected).abs() < 1e-12);
        }
        assert!((result.stats.total_cost() - 2.0 * expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reused_run_bills_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();

        let priced = Model {
            id: "m/a".into(),
            name: "a".into(),
            context_length: 8192,
            pricing_prompt: 0.001,
            pricing_completion: 0.002,
        };
        let scheduler =
            Scheduler::new(Arc::new(canned()), tiny_suite(), &[priced]).quiet(true);
        let config = run_config(&["m/a"], 1, true);

        let first = scheduler.run(&config, &mut store).await.unwrap();
        let spent = first.stats.total_cost();
        assert!(spent > 0.0);

        // Fully-reused second run: nothing billed, the historical spend
        // shows up as savings instead
        let second = scheduler.run(&config, &mut store).await.unwrap();
        assert_eq!(second.stats.total_reused(), 2);
        assert_eq!(second.stats.total_cost(), 0.0);
        assert!((second.stats.total_saved() - spent).abs() < 1e-9);
    }
}
