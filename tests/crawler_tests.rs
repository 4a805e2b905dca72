use std::sync::Arc;
use std::time::Duration;

use ui_crawler::backend::device::BackendError;
use ui_crawler::backend::sim::{SharedDevice, SimAppSpec, SimBackend, SimScreenSource, SimulatedDevice};
use ui_crawler::crawler::config::{CrawlMode, CrawlerConfig};
use ui_crawler::crawler::orchestrator::{CrawlReport, Crawler};
use ui_crawler::crawler::session::{CrawlControl, Lifecycle, TerminationReason};
use ui_crawler::model::action::{ActionDescriptor, ActionKind};
use ui_crawler::model::screen::StepOutcome;
use ui_crawler::oracle::oracle::{DecisionOracle, OracleError, ScriptedOracle};
use ui_crawler::trace::logger::EventLogger;

// ============================================================================
// Helpers
// ============================================================================

const TWO_SCREEN_APP: &str = r#"
name: demo
start: home
screens:
  - name: home
    ui_tree:
      class: FrameLayout
      children:
        - class: Button
          resource-id: "app:id/open_detail"
          text: "Open detail"
          clickable: true
  - name: detail
    ui_tree:
      class: FrameLayout
      children:
        - class: TextView
          text: "Detail page"
edges:
  - from: home
    trigger: "open_detail"
    to: detail
"#;

const ONE_SCREEN_APP: &str = r#"
name: static
start: only
screens:
  - name: only
    ui_tree:
      class: FrameLayout
      children:
        - class: TextView
          text: "Nothing to do here"
edges: []
"#;

fn device_for(yaml: &str) -> SharedDevice {
    let spec = SimAppSpec::from_yaml(yaml).expect("app yaml must parse");
    SimulatedDevice::new(spec).expect("app spec must be valid").shared()
}

fn test_config(max_steps: u64) -> CrawlerConfig {
    CrawlerConfig {
        max_steps,
        wait_after_action: Duration::ZERO,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        ..CrawlerConfig::default()
    }
}

fn crawler_for(
    device: &SharedDevice,
    cfg: CrawlerConfig,
    oracle: Box<dyn DecisionOracle>,
    control: Arc<CrawlControl>,
) -> Crawler {
    Crawler::new(
        cfg,
        oracle,
        Box::new(SimScreenSource(device.clone())),
        Box::new(SimBackend(device.clone())),
        control,
        EventLogger::disabled(),
    )
}

fn run(device: &SharedDevice, cfg: CrawlerConfig, oracle: Box<dyn DecisionOracle>) -> (CrawlReport, Crawler) {
    let mut crawler = crawler_for(device, cfg, oracle, CrawlControl::new());
    let report = crawler.run();
    (report, crawler)
}

fn back() -> ActionDescriptor {
    ActionDescriptor::gesture(ActionKind::Back)
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn terminates_exactly_at_max_steps() {
    let device = device_for(ONE_SCREEN_APP);
    let oracle = ScriptedOracle::new(vec![]).with_exhausted(Ok(back()));

    let (report, crawler) = run(&device, test_config(10), Box::new(oracle));

    assert_eq!(report.reason, TerminationReason::MaxStepsReached);
    assert_eq!(report.lifecycle, Lifecycle::Completed);
    assert_eq!(report.steps, 10, "step budget is exact");
    assert_eq!(report.unique_screens, 1);
    assert_eq!(crawler.transitions().len(), 10);
}

#[test]
fn time_mode_ends_with_max_duration_reached() {
    let device = device_for(ONE_SCREEN_APP);
    let oracle = ScriptedOracle::new(vec![]).with_exhausted(Ok(back()));
    let cfg = CrawlerConfig {
        crawl_mode: CrawlMode::Time,
        max_duration: Duration::from_millis(40),
        max_steps: 10_000,
        wait_after_action: Duration::from_millis(5),
        base_delay: Duration::from_millis(1),
        ..CrawlerConfig::default()
    };

    let (report, _) = run(&device, cfg, Box::new(oracle));

    assert_eq!(report.reason, TerminationReason::MaxDurationReached);
    assert_eq!(report.lifecycle, Lifecycle::Completed, "running out of time is not a failure");
    assert!(report.steps >= 1, "at least one step fits in the budget");
    assert!(report.steps < 10_000, "the step cap must not be what ended the run");
}

#[test]
fn pause_parks_the_crawl_and_resume_continues_it() {
    let device = device_for(ONE_SCREEN_APP);
    let oracle = ScriptedOracle::new(vec![]).with_exhausted(Ok(back()));
    let control = CrawlControl::new();
    let trace_path = std::env::temp_dir().join(format!("pause_trace_{}.jsonl", std::process::id()));

    // Pause is already requested when the loop starts, so the crawler must
    // park before its first step; a supervisor thread resumes it later.
    control.request_pause();
    let started = std::time::Instant::now();
    let supervisor = {
        let control = control.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            control.request_resume();
        })
    };

    let mut crawler = Crawler::new(
        test_config(3),
        Box::new(oracle),
        Box::new(SimScreenSource(device.clone())),
        Box::new(SimBackend(device)),
        control,
        EventLogger::new(trace_path.to_str().unwrap()),
    );
    let report = crawler.run();
    supervisor.join().unwrap();

    assert!(
        started.elapsed() >= Duration::from_millis(50),
        "the run must wait for the resume signal"
    );
    assert_eq!(report.reason, TerminationReason::MaxStepsReached);
    assert_eq!(report.lifecycle, Lifecycle::Completed);
    assert_eq!(report.steps, 3, "pausing must not consume steps");
    assert_eq!(crawler.session().ai_failures, 0, "counters survive the pause intact");
    assert_eq!(crawler.session().mapping_failures, 0);
    assert_eq!(crawler.session().execution_failures, 0);

    // The event log shows the Crawling -> Paused -> Crawling round trip.
    let log = std::fs::read_to_string(&trace_path).unwrap();
    let lifecycle_moves: Vec<(String, String)> = log
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter(|event| event["event"] == "lifecycle_changed")
        .map(|event| {
            (
                event["from"].as_str().unwrap_or_default().to_string(),
                event["to"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert!(
        lifecycle_moves.contains(&("Crawling".to_string(), "Paused".to_string())),
        "missing pause transition in {:?}",
        lifecycle_moves
    );
    assert!(
        lifecycle_moves.contains(&("Paused".to_string(), "Crawling".to_string())),
        "missing resume transition in {:?}",
        lifecycle_moves
    );

    let _ = std::fs::remove_file(&trace_path);
}

#[test]
fn stop_request_ends_the_run_before_any_step() {
    let device = device_for(ONE_SCREEN_APP);
    let control = CrawlControl::new();
    control.request_stop();

    let oracle = ScriptedOracle::new(vec![]).with_exhausted(Ok(back()));
    let mut crawler = crawler_for(&device, test_config(10), Box::new(oracle), control);
    let report = crawler.run();

    assert_eq!(report.reason, TerminationReason::StopRequested);
    assert_eq!(report.lifecycle, Lifecycle::Completed, "a stop is not a failure");
    assert_eq!(report.steps, 0);
}

// ============================================================================
// Screen deduplication across the loop
// ============================================================================

#[test]
fn revisited_screens_are_not_duplicated() {
    let device = device_for(TWO_SCREEN_APP);
    // Bounce home -> detail -> home three times.
    let script: Vec<_> = (0..3)
        .flat_map(|_| vec![Ok(ActionDescriptor::tap("app:id/open_detail")), Ok(back())])
        .collect();
    let oracle = ScriptedOracle::new(script);

    let (report, crawler) = run(&device, test_config(6), Box::new(oracle));

    assert_eq!(report.reason, TerminationReason::MaxStepsReached);
    assert_eq!(report.unique_screens, 2, "revisits must merge into known states");
    assert!(
        crawler
            .transitions()
            .iter()
            .all(|t| t.outcome == StepOutcome::Success { screen_changed: true }),
        "every scripted action navigates"
    );

    // Home starts steps 1, 3 and 5. Detail is first registered by the
    // post-action observation (one visit), then starts steps 2, 4 and 6.
    let states = crawler.store().states();
    assert_eq!(states[0].visit_count, 3);
    assert_eq!(states[1].visit_count, 4);
    assert_eq!(device.borrow().current_screen_name(), "home");
}

#[test]
fn seeded_screens_survive_into_the_report() {
    let device = device_for(ONE_SCREEN_APP);
    let oracle = ScriptedOracle::new(vec![]).with_exhausted(Ok(back()));
    let mut crawler = crawler_for(&device, test_config(2), Box::new(oracle), CrawlControl::new());
    crawler.seed_screens(vec![("feedface00".to_string(), 0x42, 9)]);

    let report = crawler.run();

    assert_eq!(
        report.unique_screens, 2,
        "one seeded screen plus the live one"
    );
    assert_eq!(crawler.store().states()[0].visit_count, 9);
}

// ============================================================================
// Failure counters
// ============================================================================

#[test]
fn consecutive_oracle_failures_fail_the_run() {
    let device = device_for(ONE_SCREEN_APP);
    let oracle = ScriptedOracle::new(vec![]); // exhausted default: Unavailable

    let (report, crawler) = run(&device, test_config(50), Box::new(oracle));

    assert_eq!(report.reason, TerminationReason::MaxAiFailures);
    assert_eq!(report.lifecycle, Lifecycle::Failed);
    assert_eq!(report.steps, 3, "default tolerance is three consecutive failures");
    assert!(
        crawler
            .transitions()
            .iter()
            .all(|t| matches!(t.outcome, StepOutcome::OracleFailed { .. }))
    );
}

#[test]
fn oracle_success_resets_the_ai_failure_counter() {
    let device = device_for(ONE_SCREEN_APP);
    // Failures interleaved with successes never reach three in a row.
    let script: Vec<_> = (0..5)
        .flat_map(|_| {
            vec![
                Err(OracleError::Unavailable("provider down".into())),
                Ok(back()),
            ]
        })
        .collect();
    let oracle = ScriptedOracle::new(script).with_exhausted(Ok(back()));

    let (report, _) = run(&device, test_config(12), Box::new(oracle));

    assert_eq!(
        report.reason,
        TerminationReason::MaxStepsReached,
        "interleaved failures must not accumulate"
    );
    assert_eq!(report.lifecycle, Lifecycle::Completed);
}

#[test]
fn unresolvable_actions_count_as_mapping_failures() {
    let device = device_for(ONE_SCREEN_APP);
    let oracle =
        ScriptedOracle::new(vec![]).with_exhausted(Ok(ActionDescriptor::tap("app:id/ghost")));

    let (report, crawler) = run(&device, test_config(50), Box::new(oracle));

    assert_eq!(report.reason, TerminationReason::MaxMappingFailures);
    assert_eq!(report.lifecycle, Lifecycle::Failed);
    assert_eq!(report.steps, 3);
    assert!(
        crawler
            .transitions()
            .iter()
            .all(|t| matches!(t.outcome, StepOutcome::MappingFailed { .. }))
    );
    assert_eq!(
        device.borrow().executed_commands,
        0,
        "an unresolvable action must never reach the device"
    );
}

#[test]
fn successful_mapping_resets_the_mapping_counter() {
    let device = device_for(ONE_SCREEN_APP);
    // Unresolvable taps interleaved with mappable gestures: the counter is
    // reset only once a device command is actually built, and two failures
    // in a row never become three.
    let script: Vec<_> = (0..4)
        .flat_map(|_| {
            vec![
                Ok(ActionDescriptor::tap("app:id/ghost")),
                Ok(ActionDescriptor::tap("app:id/ghost")),
                Ok(back()),
            ]
        })
        .collect();
    let oracle = ScriptedOracle::new(script).with_exhausted(Ok(back()));

    let (report, _) = run(&device, test_config(12), Box::new(oracle));

    assert_eq!(
        report.reason,
        TerminationReason::MaxStepsReached,
        "interleaved mapping failures must not accumulate"
    );
    assert_eq!(report.lifecycle, Lifecycle::Completed);
}

#[test]
fn persistent_backend_failures_fail_the_run() {
    let device = device_for(ONE_SCREEN_APP);
    device.borrow_mut().inject_failures(vec![
        BackendError::permanent("session dead"),
        BackendError::permanent("session dead"),
        BackendError::permanent("session dead"),
    ]);
    let oracle = ScriptedOracle::new(vec![]).with_exhausted(Ok(back()));

    let (report, crawler) = run(&device, test_config(50), Box::new(oracle));

    assert_eq!(report.reason, TerminationReason::MaxExecutionFailures);
    assert_eq!(report.lifecycle, Lifecycle::Failed);
    assert_eq!(report.steps, 3);
    assert!(
        crawler
            .transitions()
            .iter()
            .all(|t| matches!(t.outcome, StepOutcome::ExecutionFailed { .. }))
    );
}

#[test]
fn execution_recovery_resets_the_counter() {
    let device = device_for(ONE_SCREEN_APP);
    // Two permanent failures, then the backend recovers.
    device.borrow_mut().inject_failures(vec![
        BackendError::permanent("hiccup"),
        BackendError::permanent("hiccup"),
    ]);
    let oracle = ScriptedOracle::new(vec![]).with_exhausted(Ok(back()));

    let (report, _) = run(&device, test_config(8), Box::new(oracle));

    assert_eq!(report.reason, TerminationReason::MaxStepsReached);
    assert_eq!(report.lifecycle, Lifecycle::Completed);
}
