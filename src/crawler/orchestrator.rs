use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::backend::device::{DeviceBackend, DeviceCommand, RawScreen, ScreenSource};
use crate::crawler::config::CrawlerConfig;
use crate::crawler::session::{CrawlControl, CrawlSession, Lifecycle, TerminationReason};
use crate::guard::loop_guard::LoopGuard;
use crate::hash::codec::{perceptual_hash, structural_hash_of};
use crate::model::action::{ActionDescriptor, ActionKind};
use crate::model::screen::{ScreenId, StepOutcome, Transition};
use crate::model::ui_tree::{ScreenGeometry, UiNode};
use crate::oracle::oracle::{DecisionOracle, OracleRequest};
use crate::resilience::breaker::CircuitBreaker;
use crate::resilience::executor::{ExecutionError, ResilientExecutor};
use crate::resolve::resolver::ActionResolver;
use crate::resolve::target::ResolvedTarget;
use crate::store::screen_store::ScreenStore;
use crate::trace::event::{now_ms, CrawlEvent};
use crate::trace::logger::EventLogger;

/// Poll interval while paused.
const PAUSE_POLL: Duration = Duration::from_millis(25);

/// Final summary returned by `Crawler::run`.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub lifecycle: Lifecycle,
    pub reason: TerminationReason,
    pub steps: u64,
    pub unique_screens: usize,
    pub transitions: usize,
}

/// The crawl lifecycle state machine: sequences capture, identification,
/// decision, guarding, resolution and execution each step, and enforces
/// termination. All step failures are absorbed locally; no error crosses
/// `run()`.
pub struct Crawler {
    cfg: CrawlerConfig,
    store: ScreenStore,
    guard: LoopGuard,
    resolver: ActionResolver,
    executor: ResilientExecutor,
    oracle: Box<dyn DecisionOracle>,
    source: Box<dyn ScreenSource>,
    control: Arc<CrawlControl>,
    events: EventLogger,

    session: CrawlSession,
    transitions: Vec<Transition>,
    action_history: HashMap<ScreenId, Vec<String>>,
    last_feedback: Option<String>,
}

impl Crawler {
    pub fn new(
        cfg: CrawlerConfig,
        oracle: Box<dyn DecisionOracle>,
        source: Box<dyn ScreenSource>,
        backend: Box<dyn DeviceBackend>,
        control: Arc<CrawlControl>,
        events: EventLogger,
    ) -> Self {
        let store = ScreenStore::new(cfg.similarity_threshold);
        let guard = LoopGuard::new(cfg.loop_guard());
        let resolver = ActionResolver::new(cfg.resolver());
        let breaker = CircuitBreaker::new(cfg.failure_threshold, cfg.reset_timeout);
        let executor = ResilientExecutor::new(backend, breaker, cfg.retry());

        Self {
            cfg,
            store,
            guard,
            resolver,
            executor,
            oracle,
            source,
            control,
            events,
            session: CrawlSession::new(),
            transitions: Vec::new(),
            action_history: HashMap::new(),
            last_feedback: None,
        }
    }

    /// Seed the screen store from a previous run (resume bootstrap).
    pub fn seed_screens(&mut self, screens: impl IntoIterator<Item = (String, u64, u32)>) {
        self.store.seed(screens);
    }

    pub fn store(&self) -> &ScreenStore {
        &self.store
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    /// Drive the session to completion. Always returns a report; termination
    /// is a state transition, never an error.
    pub fn run(&mut self) -> CrawlReport {
        self.set_lifecycle(Lifecycle::Connecting);
        if let Err(e) = self.executor.connect() {
            println!("Failed to connect to device backend: {}", e);
            return self.finish(TerminationReason::ConnectFailed);
        }

        self.set_lifecycle(Lifecycle::LaunchingApp);
        if let Err(e) = self.executor.launch_app() {
            println!("Failed to launch app: {}", e);
            return self.finish(TerminationReason::LaunchFailed);
        }

        self.set_lifecycle(Lifecycle::Crawling);
        self.session.started = Instant::now();

        let reason = loop {
            // Pause takes effect only at step boundaries.
            if self.control.pause_requested() && !self.control.stop_requested() {
                self.set_lifecycle(Lifecycle::Paused);
                while self.control.pause_requested() && !self.control.stop_requested() {
                    thread::sleep(PAUSE_POLL);
                }
                self.set_lifecycle(Lifecycle::Crawling);
            }

            if let Some(reason) =
                self.session
                    .check_termination(&self.cfg, &self.control, Instant::now())
            {
                break reason;
            }

            self.session.step_count += 1;
            self.step();
        };

        self.finish(reason)
    }

    fn finish(&mut self, reason: TerminationReason) -> CrawlReport {
        self.set_lifecycle(Lifecycle::Finalizing);
        self.session.termination = Some(reason);

        self.events.log(&CrawlEvent::RunFinished {
            timestamp_ms: now_ms(),
            reason,
            steps: self.session.step_count,
            unique_screens: self.store.len(),
        });

        let final_state = if reason.is_failure() {
            Lifecycle::Failed
        } else {
            Lifecycle::Completed
        };
        self.set_lifecycle(final_state);

        println!(
            "Crawl finished: {:?} ({}) after {} steps, {} unique screens, {} transitions",
            final_state,
            reason.as_str(),
            self.session.step_count,
            self.store.len(),
            self.transitions.len()
        );

        CrawlReport {
            lifecycle: final_state,
            reason,
            steps: self.session.step_count,
            unique_screens: self.store.len(),
            transitions: self.transitions.len(),
        }
    }

    fn set_lifecycle(&mut self, to: Lifecycle) {
        let from = self.session.lifecycle;
        if from == to {
            return;
        }
        self.session.lifecycle = to;
        self.events.log(&CrawlEvent::LifecycleChanged {
            timestamp_ms: now_ms(),
            from,
            to,
        });
    }

    // ------------------------------------------------------------------
    // One crawl step
    // ------------------------------------------------------------------

    fn step(&mut self) {
        let step = self.session.step_count;
        println!("--- Crawl step {} ---", step);

        // Capture + identify. A capture that cannot be turned into a screen
        // state counts as a mapping failure.
        let Some((raw, tree, from)) = self.capture_and_identify(step, true) else {
            self.session.record_mapping_failure();
            self.last_feedback =
                Some("CAPTURE FAILED: the screen state could not be determined.".into());
            return;
        };

        let geometry = ScreenGeometry {
            width: raw.image.width,
            height: raw.image.height,
        };
        let visit_count = self.store.visit_count(from);

        // Decision.
        let history = self.action_history.get(&from).cloned().unwrap_or_default();
        let request = OracleRequest {
            ui_tree: &tree,
            screenshot: &raw.image,
            previous_actions: &history,
            visit_count,
            last_feedback: self.last_feedback.as_deref(),
        };
        let proposed = match self.oracle.suggest(&request) {
            Ok(action) => {
                self.session.record_ai_success();
                action
            }
            Err(e) => {
                println!("Oracle failure: {}", e);
                self.session.record_ai_failure();
                self.last_feedback =
                    Some("DECISION FAILED: no valid action was proposed. Choose a new action.".into());
                self.record_transition(
                    from,
                    None,
                    None,
                    "oracle_no_suggestion".into(),
                    step,
                    StepOutcome::OracleFailed { message: e.to_string() },
                );
                return;
            }
        };

        // Loop guarding.
        let action = self.guard.guard(from, proposed.clone());
        if action != proposed {
            println!("Loop guard override: {} -> {}", proposed.describe(), action.describe());
        }

        // Resolution. Gestures need no target; everything else runs the
        // strategy chain.
        let resolved = if action.kind.needs_target() {
            match self.resolver.resolve(&action, &tree, geometry) {
                ResolvedTarget::Unresolvable(reason) => {
                    println!("Could not resolve '{}': {}", action.describe(), reason.as_str());
                    self.session.record_mapping_failure();
                    self.last_feedback = Some(format!(
                        "MAPPING FAILED: action '{}' matched no element ({}). Choose a new action.",
                        action.describe(),
                        reason.as_str()
                    ));
                    self.record_transition(
                        from,
                        None,
                        Some(action.kind),
                        action.describe(),
                        step,
                        StepOutcome::MappingFailed { reason: reason.as_str().into() },
                    );
                    return;
                }
                target => Some(target),
            }
        } else {
            None
        };

        let Some(command) = DeviceCommand::from_resolution(&action, resolved.as_ref()) else {
            // Resolver admitted the action but no primitive exists for the
            // combination; treated as a mapping failure.
            self.session.record_mapping_failure();
            self.record_transition(
                from,
                None,
                Some(action.kind),
                action.describe(),
                step,
                StepOutcome::MappingFailed { reason: "no_primitive".into() },
            );
            return;
        };
        self.session.record_mapping_success();

        // Execution through the resilience layer.
        match self.executor.execute(&command, &self.control) {
            Ok(()) => self.session.record_execution_success(),
            Err(ExecutionError::Cancelled) => {
                // Interrupted between retries; not a backend failure and not
                // counted. The pause/stop is honored at the loop boundary.
                self.record_transition(
                    from,
                    None,
                    Some(action.kind),
                    action.describe(),
                    step,
                    StepOutcome::ExecutionFailed { message: "interrupted".into() },
                );
                return;
            }
            Err(e) => {
                println!("Execution failure: {}", e);
                self.session.record_execution_failure();
                self.guard.record_action(from, &action);
                self.remember_action(from, &action, false);
                self.last_feedback = Some(format!(
                    "EXECUTION FAILED: '{}' failed ({}). Choose a different action.",
                    action.describe(),
                    e
                ));
                let outcome = match e {
                    ExecutionError::CircuitOpen => StepOutcome::BackendUnavailable,
                    other => StepOutcome::ExecutionFailed { message: other.to_string() },
                };
                self.record_transition(
                    from,
                    None,
                    Some(action.kind),
                    action.describe(),
                    step,
                    outcome,
                );
                return;
            }
        }

        // Let the UI settle, then determine where the action landed.
        thread::sleep(self.cfg.wait_after_action);
        let to = self.capture_and_identify(step, false).map(|(_, _, id)| id);

        let effective = to.is_some_and(|t| t != from);
        self.guard.record_action(from, &action);
        self.guard.record_outcome(effective);
        self.remember_action(from, &action, true);

        self.last_feedback = Some(match (to, effective) {
            (Some(_), true) => "SUCCESS: the last action changed the screen.".into(),
            (Some(_), false) => format!(
                "NO CHANGE: '{}' was executed but the screen did not change. Suggest a different action.",
                action.describe()
            ),
            (None, _) => "UNKNOWN: the action was executed but the next state could not be determined.".into(),
        });

        self.record_transition(
            from,
            to,
            Some(action.kind),
            action.describe(),
            step,
            StepOutcome::Success { screen_changed: effective },
        );
    }

    /// Capture the current screen and run it through the store. `count_visit`
    /// selects between `identify` (start of step) and `observe` (post-action
    /// re-identification), so one physical visit is counted once.
    fn capture_and_identify(
        &mut self,
        step: u64,
        count_visit: bool,
    ) -> Option<(RawScreen, UiNode, ScreenId)> {
        let raw = match self.source.capture() {
            Ok(r) => r,
            Err(e) => {
                println!("Screen capture failed: {}", e);
                return None;
            }
        };
        let tree: UiNode = match serde_json::from_str(&raw.ui_tree_json) {
            Ok(t) => t,
            Err(e) => {
                println!("UI tree unparsable: {}", e);
                return None;
            }
        };
        let structural = structural_hash_of(&tree);
        let perceptual = match perceptual_hash(&raw.image) {
            Ok(p) => p,
            Err(e) => {
                println!("Screenshot unusable: {}", e);
                return None;
            }
        };

        let identified = if count_visit {
            self.store.identify(&structural, perceptual, step)
        } else {
            self.store.observe(&structural, perceptual, step)
        };

        if identified.is_new {
            let state = self.store.get(identified.id);
            println!("New screen discovered: {} ({})", state.id, state.composite_hash);
            self.events.log(&CrawlEvent::ScreenDiscovered {
                timestamp_ms: now_ms(),
                id: state.id,
                composite_hash: state.composite_hash.clone(),
                first_seen_step: state.first_seen_step,
            });
        }

        Some((raw, tree, identified.id))
    }

    fn remember_action(&mut self, screen: ScreenId, action: &ActionDescriptor, success: bool) {
        self.action_history
            .entry(screen)
            .or_default()
            .push(format!("{} (success: {})", action.describe(), success));
    }

    #[allow(clippy::too_many_arguments)]
    fn record_transition(
        &mut self,
        from: ScreenId,
        to: Option<ScreenId>,
        action_kind: Option<ActionKind>,
        action: String,
        step: u64,
        outcome: StepOutcome,
    ) {
        let transition = Transition {
            from,
            to,
            action_kind,
            action,
            step,
            timestamp_ms: now_ms(),
            outcome,
        };
        self.events.log(&CrawlEvent::TransitionRecorded {
            transition: transition.clone(),
        });
        self.transitions.push(transition);
    }
}
