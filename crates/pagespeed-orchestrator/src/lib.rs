//! Batch orchestration: paired measurements per iteration, pacing, and aggregation.

pub mod observer;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use pagespeed_analysis::{compute_averages, extract_metrics};
use pagespeed_client::{client_error, MeasurementClient, MeasurementRequest};
use pagespeed_types::{
    config::PacingConfig,
    events::{ProgressEvent, ProgressStage},
    metrics::{MetricSet, Strategy},
    run::{BatchRun, IterationResult, RunState},
    validation::{validate_count, validate_url},
    BatchError, Result,
};
use tokio::{
    task::{JoinError, JoinSet},
    time::{sleep_until, timeout, Instant},
};
use tracing::{info, warn};
use uuid::Uuid;

pub use observer::{
    BroadcastObserver, ChannelObserver, CompositeObserver, NoopObserver, ProgressObserver,
    TracingObserver,
};

/// Slack on top of the transport deadline before the orchestrator gives up on a call.
const DEADLINE_GRACE: Duration = Duration::from_secs(5);

pub struct BatchOrchestrator<C>
where
    C: MeasurementClient + 'static,
{
    client: Arc<C>,
    pacing: PacingConfig,
    call_deadline: Duration,
    state: Mutex<RunState>,
}

impl<C> BatchOrchestrator<C>
where
    C: MeasurementClient + 'static,
{
    /// `request_timeout` is the transport deadline; each call is abandoned shortly after it.
    pub fn new(client: C, pacing: PacingConfig, request_timeout: Duration) -> Self {
        Self {
            client: Arc::new(client),
            pacing,
            call_deadline: request_timeout + DEADLINE_GRACE,
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        self.state.lock().map(|s| *s).unwrap_or(RunState::Failed)
    }

    /// Returns to `Idle`. Refused while a run is in progress.
    pub fn reset(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| orchestrator_error("run state lock poisoned"))?;
        if *state == RunState::Running {
            return Err(BatchError::ResetWhileRunning);
        }
        *state = RunState::Idle;
        Ok(())
    }

    /// Validates the inputs, runs every iteration, and returns the finished batch.
    ///
    /// Per-iteration failures are recorded in the returned run. Only validation
    /// errors, a concurrent start, or an orchestration fault surface as `Err`.
    pub async fn start(
        &self,
        url: &str,
        requested_count: i64,
        observer: &dyn ProgressObserver,
    ) -> Result<BatchRun> {
        let url = validate_url(url)?;
        let count = validate_count(requested_count)?;
        let guard = RunGuard::enter(&self.state)?;

        match self.execute(url, count, observer).await {
            Ok(run) => {
                guard.finish(RunState::Completed);
                Ok(run)
            }
            Err(err) => {
                guard.finish(RunState::Failed);
                let fault = match err {
                    BatchError::OrchestrationFault(_) => err,
                    other => BatchError::OrchestrationFault(other.to_string()),
                };
                warn!(error = %fault, "Batch run failed");
                Err(fault)
            }
        }
    }

    async fn execute(
        &self,
        url: String,
        count: u32,
        observer: &dyn ProgressObserver,
    ) -> Result<BatchRun> {
        let mut run = BatchRun::new(url, count);
        info!(run_id = %run.run_id, url = %run.target_url, count, "Starting batch run");

        for index in 1..=count {
            observer.on_progress(&ProgressEvent::new(
                run.completed_count(),
                count,
                ProgressStage::IterationStarted { index },
                format!("Running test {index} of {count}..."),
            ));

            let result = self.run_iteration(&run.target_url, index).await?;
            let failed = result.error.is_some();
            let (stage, message) = if failed {
                (
                    ProgressStage::IterationFailed { index },
                    format!("Test {index} of {count} failed"),
                )
            } else {
                (
                    ProgressStage::IterationCompleted { index },
                    format!("Completed test {index} of {count}"),
                )
            };
            run.results.push(result.clone());
            observer.on_progress(
                &ProgressEvent::new(run.completed_count(), count, stage, message)
                    .with_iteration(result),
            );

            if index < count {
                self.pace(run.completed_count(), count, failed, observer)
                    .await;
            }
        }

        if run.results.len() != count as usize {
            return Err(orchestrator_error(format!(
                "expected {count} iteration results, recorded {}",
                run.results.len()
            )));
        }

        observer.on_progress(&ProgressEvent::new(
            run.completed_count(),
            count,
            ProgressStage::Averaging,
            "Calculating averages...",
        ));
        run.averages = compute_averages(&run.results);
        if run.averages.is_none() {
            warn!(run_id = %run.run_id, "{}", BatchError::AggregationEmpty);
        }
        run.finished_at = Some(Utc::now());

        info!(
            run_id = %run.run_id,
            usable = run.usable_count(),
            failed = run.failed_count(),
            "Batch run complete"
        );
        observer.on_progress(&ProgressEvent::new(
            run.completed_count(),
            count,
            ProgressStage::Finished,
            format!("Finished {count} tests"),
        ));
        Ok(run)
    }

    async fn run_iteration(&self, url: &str, index: u32) -> Result<IterationResult> {
        let timestamp = Utc::now();
        // Dropping the set aborts calls still in flight.
        let mut calls = JoinSet::new();
        for strategy in Strategy::ALL {
            self.spawn_measurement(&mut calls, url, strategy);
        }
        let (mut desktop, mut mobile) = (None, None);
        while let Some(joined) = calls.join_next().await {
            let (strategy, outcome) = joined.map_err(join_fault)?;
            match strategy {
                Strategy::Desktop => desktop = Some(outcome),
                Strategy::Mobile => mobile = Some(outcome),
            }
        }
        let (Some(desktop), Some(mobile)) = (desktop, mobile) else {
            return Err(orchestrator_error(format!(
                "iteration {index} lost a measurement result"
            )));
        };

        match (desktop, mobile) {
            (Ok(desktop), Ok(mobile)) => {
                info!(iteration = index, "Iteration succeeded");
                Ok(IterationResult::success(index, timestamp, desktop, mobile))
            }
            (desktop, mobile) => {
                let mut causes = Vec::new();
                for (strategy, outcome) in [(Strategy::Desktop, desktop), (Strategy::Mobile, mobile)] {
                    if let Err(err) = outcome {
                        if !err.is_per_iteration() {
                            return Err(err);
                        }
                        causes.push(format!("{strategy}: {}", err.cause()));
                    }
                }
                let message = format!("Test {index} failed: {}", causes.join("; "));
                warn!(iteration = index, "{message}");
                Ok(IterationResult::failure(index, timestamp, message))
            }
        }
    }

    fn spawn_measurement(
        &self,
        calls: &mut JoinSet<(Strategy, Result<MetricSet>)>,
        url: &str,
        strategy: Strategy,
    ) {
        let client = Arc::clone(&self.client);
        let deadline = self.call_deadline;
        let request = MeasurementRequest {
            url: url.to_string(),
            strategy,
            cache_buster: cache_buster(),
        };
        calls.spawn(async move {
            let outcome = match timeout(deadline, client.measure(&request)).await {
                Ok(report) => report.and_then(|report| extract_metrics(&report)),
                Err(_) => Err(client_error(format!(
                    "{strategy} measurement did not finish within {deadline:?}"
                ))),
            };
            (strategy, outcome)
        });
    }

    async fn pace(
        &self,
        completed: u32,
        total: u32,
        after_failure: bool,
        observer: &dyn ProgressObserver,
    ) {
        let mut wait_secs = self.pacing.interval_secs;
        if after_failure {
            wait_secs += self.pacing.failure_delay_secs;
        }
        if wait_secs == 0 {
            return;
        }
        info!(wait_secs, "Waiting for provider cache to expire");

        let started = Instant::now();
        if !self.pacing.countdown {
            observer.on_progress(&ProgressEvent::new(
                completed,
                total,
                ProgressStage::Waiting {
                    remaining_secs: wait_secs,
                },
                format!("Waiting {wait_secs} seconds for cache to clear..."),
            ));
            sleep_until(started + Duration::from_secs(wait_secs)).await;
            return;
        }

        for elapsed in 0..wait_secs {
            let remaining_secs = wait_secs - elapsed;
            observer.on_progress(&ProgressEvent::new(
                completed,
                total,
                ProgressStage::Waiting { remaining_secs },
                format!("Waiting {remaining_secs} seconds for cache to clear..."),
            ));
            // Anchored to the start so the total wait does not drift.
            sleep_until(started + Duration::from_secs(elapsed + 1)).await;
        }
    }
}

/// Holds the `Running` state; anything but an explicit finish leaves the run `Failed`.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    fn enter(state: &'a Mutex<RunState>) -> Result<Self> {
        let mut current = state
            .lock()
            .map_err(|_| orchestrator_error("run state lock poisoned"))?;
        if *current == RunState::Running {
            return Err(BatchError::AlreadyRunning);
        }
        *current = RunState::Running;
        Ok(Self {
            state,
            finished: false,
        })
    }

    fn finish(mut self, outcome: RunState) {
        self.set(outcome);
        self.finished = true;
    }

    fn set(&self, outcome: RunState) {
        if let Ok(mut current) = self.state.lock() {
            *current = outcome;
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.set(RunState::Failed);
        }
    }
}

fn cache_buster() -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

fn join_fault(err: JoinError) -> BatchError {
    orchestrator_error(format!("measurement task aborted: {err}"))
}

pub fn orchestrator_error(message: impl Into<String>) -> BatchError {
    BatchError::OrchestrationFault(message.into())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use pagespeed_types::ValidationField;
    use serde_json::{json, Value};

    use super::*;

    enum Outcome {
        Report(Value),
        Fail(BatchError),
        Hang,
        Panic,
    }

    type Script = Box<dyn Fn(Strategy, u32) -> Outcome + Send + Sync>;

    /// In-memory provider; `script` decides each call from its strategy and 1-based call number.
    struct ScriptedClient {
        desktop_calls: AtomicU32,
        mobile_calls: AtomicU32,
        cache_busters: Mutex<Vec<String>>,
        in_flight: AtomicU32,
        script: Script,
    }

    struct InFlight<'a>(&'a AtomicU32);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl ScriptedClient {
        fn new(script: impl Fn(Strategy, u32) -> Outcome + Send + Sync + 'static) -> Self {
            Self {
                desktop_calls: AtomicU32::new(0),
                mobile_calls: AtomicU32::new(0),
                cache_busters: Mutex::new(Vec::new()),
                in_flight: AtomicU32::new(0),
                script: Box::new(script),
            }
        }

        fn healthy() -> Self {
            Self::new(|_, call| Outcome::Report(report(call)))
        }
    }

    #[async_trait]
    impl MeasurementClient for ScriptedClient {
        async fn measure(&self, request: &MeasurementRequest) -> Result<Value> {
            let counter = match request.strategy {
                Strategy::Desktop => &self.desktop_calls,
                Strategy::Mobile => &self.mobile_calls,
            };
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let _in_flight = InFlight(&self.in_flight);
            self.cache_busters
                .lock()
                .unwrap()
                .push(request.cache_buster.clone());
            match (self.script)(request.strategy, call) {
                Outcome::Report(report) => Ok(report),
                Outcome::Fail(err) => Err(err),
                Outcome::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Outcome::Panic => panic!("scripted panic"),
            }
        }
    }

    fn report(call: u32) -> Value {
        json!({
            "lighthouseResult": {
                "audits": {
                    "first-contentful-paint": { "displayValue": format!("{call}.0 s") },
                    "total-blocking-time": { "displayValue": format!("{} ms", call * 100) }
                },
                "categories": { "performance": { "score": 0.5 } }
            }
        })
    }

    fn pacing(interval_secs: u64, countdown: bool) -> PacingConfig {
        PacingConfig {
            interval_secs,
            countdown,
            failure_delay_secs: 0,
        }
    }

    fn orchestrator(client: ScriptedClient, pacing: PacingConfig) -> BatchOrchestrator<ScriptedClient> {
        BatchOrchestrator::new(client, pacing, Duration::from_secs(30))
    }

    fn assert_elapsed(started: Instant, secs: u64) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1),
            "expected ~{secs}s, waited {elapsed:?}"
        );
    }

    fn recorder() -> (Arc<Mutex<Vec<ProgressEvent>>>, impl ProgressObserver) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let observer = move |event: &ProgressEvent| sink.lock().unwrap().push(event.clone());
        (events, observer)
    }

    #[tokio::test(start_paused = true)]
    async fn produces_exactly_requested_iterations() {
        let orch = orchestrator(ScriptedClient::healthy(), pacing(0, false));
        let run = orch.start("https://example.com", 4, &NoopObserver).await.unwrap();

        assert_eq!(run.results.len(), 4);
        let indices: Vec<u32> = run.results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert!(run.results.iter().all(IterationResult::is_usable));
        assert_eq!(orch.state(), RunState::Completed);

        let desktop = run.averages.unwrap().desktop.unwrap();
        assert_eq!(desktop.fcp, Some(2.5));
        assert_eq!(desktop.tbt, Some(250.0));
        assert_eq!(desktop.performance_score, Some(50.0));
        assert_eq!(desktop.cls, None);
        assert!(run.finished_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn mobile_failure_in_one_iteration_is_isolated() {
        let client = ScriptedClient::new(|strategy, call| match (strategy, call) {
            (Strategy::Mobile, 2) => Outcome::Fail(client_error("API request failed: 503 Service Unavailable")),
            (_, call) => Outcome::Report(report(call)),
        });
        let orch = orchestrator(client, pacing(35, false));
        let run = orch.start("https://example.com", 3, &NoopObserver).await.unwrap();

        assert_eq!(run.results.len(), 3);
        assert!(run.results[0].is_usable());
        assert!(run.results[2].is_usable());

        let failed = &run.results[1];
        assert!(failed.desktop.is_none() && failed.mobile.is_none());
        let error = failed.error.as_deref().unwrap();
        assert!(error.starts_with("Test 2 failed: mobile: API request failed: 503"));

        let averages = run.averages.unwrap();
        assert_eq!(averages.desktop.unwrap().fcp, Some(2.0));
        assert_eq!(averages.mobile.unwrap().fcp, Some(2.0));
        assert_eq!(orch.state(), RunState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn all_iterations_failing_leaves_averages_absent() {
        let client = ScriptedClient::new(|_, _| {
            Outcome::Fail(BatchError::MalformedReport("missing lighthouseResult section".into()))
        });
        let orch = orchestrator(client, pacing(1, true));
        let run = orch.start("https://example.com", 2, &NoopObserver).await.unwrap();

        assert_eq!(run.results.len(), 2);
        assert!(run.results.iter().all(|r| r.error.is_some()));
        assert!(run.averages.is_none());
        assert_eq!(orch.state(), RunState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn report_missing_audits_fails_iteration() {
        let client = ScriptedClient::new(|strategy, call| match strategy {
            Strategy::Desktop if call == 1 => Outcome::Report(json!({ "lighthouseResult": {} })),
            _ => Outcome::Report(report(call)),
        });
        let orch = orchestrator(client, pacing(0, false));
        let run = orch.start("https://example.com", 2, &NoopObserver).await.unwrap();

        assert!(run.results[0]
            .error
            .as_deref()
            .unwrap()
            .starts_with("Test 1 failed: desktop: missing lighthouseResult.audits"));
        assert!(run.results[1].is_usable());
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_waits_full_interval_between_iterations() {
        let (events, observer) = recorder();
        let orch = orchestrator(ScriptedClient::healthy(), pacing(35, true));

        let started = Instant::now();
        orch.start("https://example.com", 3, &observer).await.unwrap();
        assert_elapsed(started, 70);

        let events = events.lock().unwrap();
        let ticks: Vec<u64> = events
            .iter()
            .filter_map(|e| match e.stage {
                ProgressStage::Waiting { remaining_secs } => Some(remaining_secs),
                _ => None,
            })
            .collect();
        assert_eq!(ticks.len(), 70);
        assert_eq!(ticks[0], 35);
        assert_eq!(ticks[34], 1);
        assert_eq!(ticks[35], 35);
    }

    #[tokio::test(start_paused = true)]
    async fn single_sleep_pacing_emits_one_wait_event() {
        let (events, observer) = recorder();
        let orch = orchestrator(ScriptedClient::healthy(), pacing(35, false));

        let started = Instant::now();
        orch.start("https://example.com", 2, &observer).await.unwrap();
        assert_elapsed(started, 35);

        let waits = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e.stage, ProgressStage::Waiting { .. }))
            .count();
        assert_eq!(waits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_delay_is_added_after_failed_iteration() {
        let client = ScriptedClient::new(|strategy, call| match (strategy, call) {
            (Strategy::Desktop, 1) => Outcome::Fail(client_error("boom")),
            (_, call) => Outcome::Report(report(call)),
        });
        let mut config = pacing(10, false);
        config.failure_delay_secs = 5;
        let orch = orchestrator(client, config);

        let started = Instant::now();
        orch.start("https://example.com", 3, &NoopObserver).await.unwrap();
        assert_elapsed(started, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_events_follow_protocol() {
        let (events, observer) = recorder();
        let orch = orchestrator(ScriptedClient::healthy(), pacing(0, false));
        orch.start("https://example.com", 2, &observer).await.unwrap();

        let events = events.lock().unwrap();
        let stages: Vec<ProgressStage> = events.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![
                ProgressStage::IterationStarted { index: 1 },
                ProgressStage::IterationCompleted { index: 1 },
                ProgressStage::IterationStarted { index: 2 },
                ProgressStage::IterationCompleted { index: 2 },
                ProgressStage::Averaging,
                ProgressStage::Finished,
            ]
        );
        assert_eq!(events[0].message, "Running test 1 of 2...");
        assert_eq!(events[0].completed_count, 0);
        assert_eq!(events[1].completed_count, 1);
        assert_eq!(events[1].iteration.as_ref().map(|it| it.index), Some(1));
        assert!(events.iter().all(|e| e.total_count == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn every_call_gets_a_fresh_cache_buster() {
        let orch = orchestrator(ScriptedClient::healthy(), pacing(0, false));
        orch.start("https://example.com", 3, &NoopObserver).await.unwrap();

        let busters = orch.client.cache_busters.lock().unwrap().clone();
        assert_eq!(busters.len(), 6);
        let mut unique = busters.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_call_hits_deadline() {
        let client = ScriptedClient::new(|strategy, call| match (strategy, call) {
            (Strategy::Mobile, 1) => Outcome::Hang,
            (_, call) => Outcome::Report(report(call)),
        });
        let orch = BatchOrchestrator::new(client, pacing(0, false), Duration::from_secs(10));
        let run = orch.start("https://example.com", 2, &NoopObserver).await.unwrap();

        let error = run.results[0].error.as_deref().unwrap();
        assert!(error.contains("mobile measurement did not finish"));
        assert!(run.results[1].is_usable());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_call_is_an_orchestration_fault() {
        let client = ScriptedClient::new(|_, _| Outcome::Panic);
        let orch = orchestrator(client, pacing(0, false));
        let err = orch
            .start("https://example.com", 2, &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::OrchestrationFault(_)));
        assert_eq!(orch.state(), RunState::Failed);

        orch.reset().unwrap();
        assert_eq!(orch.state(), RunState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn non_iteration_error_is_escalated() {
        let client = ScriptedClient::new(|_, _| {
            Outcome::Fail(BatchError::Configuration("invalid measurement endpoint".into()))
        });
        let orch = orchestrator(client, pacing(0, false));
        let err = orch
            .start("https://example.com", 2, &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::OrchestrationFault(_)));
        assert_eq!(orch.state(), RunState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_never_starts() {
        let orch = orchestrator(ScriptedClient::healthy(), pacing(0, false));

        let err = orch.start("example.com", 2, &NoopObserver).await.unwrap_err();
        assert!(matches!(
            err,
            BatchError::Validation {
                field: ValidationField::Url,
                ..
            }
        ));
        let err = orch
            .start("https://example.com", 21, &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::Validation {
                field: ValidationField::Count,
                ..
            }
        ));
        assert_eq!(orch.state(), RunState::Idle);
        assert_eq!(orch.client.desktop_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_and_reset_are_refused_while_running() {
        let orch = Arc::new(orchestrator(ScriptedClient::healthy(), pacing(35, false)));
        let running = Arc::clone(&orch);
        let handle =
            tokio::spawn(async move { running.start("https://example.com", 2, &NoopObserver).await });

        // Lands inside the pacing wait after the first iteration.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(orch.state(), RunState::Running);
        assert!(matches!(
            orch.start("https://example.com", 1, &NoopObserver).await,
            Err(BatchError::AlreadyRunning)
        ));
        assert!(matches!(orch.reset(), Err(BatchError::ResetWhileRunning)));

        let run = handle.await.unwrap().unwrap();
        assert_eq!(run.results.len(), 2);
        assert_eq!(orch.state(), RunState::Completed);
        orch.reset().unwrap();
        assert_eq!(orch.state(), RunState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_run_is_marked_failed() {
        let orch = orchestrator(ScriptedClient::healthy(), pacing(35, false));
        let outcome = timeout(
            Duration::from_secs(5),
            orch.start("https://example.com", 2, &NoopObserver),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(orch.state(), RunState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_run_aborts_in_flight_calls() {
        let orch = orchestrator(ScriptedClient::new(|_, _| Outcome::Hang), pacing(0, false));
        let outcome = timeout(
            Duration::from_secs(5),
            orch.start("https://example.com", 2, &NoopObserver),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(orch.client.desktop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.client.mobile_calls.load(Ordering::SeqCst), 1);

        // Give the runtime a turn to cancel the aborted tasks.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(orch.client.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(orch.state(), RunState::Failed);
    }
}
