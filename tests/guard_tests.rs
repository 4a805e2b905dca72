use ui_crawler::guard::loop_guard::{GuardVerdict, LoopGuard, LoopGuardConfig};
use ui_crawler::model::action::{ActionDescriptor, ActionKind};
use ui_crawler::model::screen::ScreenId;

fn guard() -> LoopGuard {
    LoopGuard::new(LoopGuardConfig::default())
}

fn tap_login() -> ActionDescriptor {
    ActionDescriptor::tap("app:id/login")
}

const SCREEN: ScreenId = ScreenId(0);
const OTHER_SCREEN: ScreenId = ScreenId(1);

// ============================================================================
// Repeat substitution
// ============================================================================

#[test]
fn fresh_proposal_passes_through() {
    let mut guard = guard();
    let (action, verdict) = guard.guard_with_verdict(SCREEN, tap_login());

    assert_eq!(verdict, GuardVerdict::PassedThrough);
    assert_eq!(action, tap_login());
}

#[test]
fn substitutes_after_max_same_action_repeats() {
    let mut guard = guard();

    // Three recorded attempts of the identical action on the same screen.
    for _ in 0..3 {
        let (action, verdict) = guard.guard_with_verdict(SCREEN, tap_login());
        assert_eq!(verdict, GuardVerdict::PassedThrough);
        guard.record_action(SCREEN, &action);
    }

    let (action, verdict) = guard.guard_with_verdict(SCREEN, tap_login());
    assert_eq!(verdict, GuardVerdict::RepeatSubstituted);
    assert_eq!(action.kind, ActionKind::Back, "first fallback is back");
}

#[test]
fn repeat_counting_is_per_screen() {
    let mut guard = guard();
    for _ in 0..3 {
        guard.record_action(SCREEN, &tap_login());
    }

    // The same proposal on a different screen is untouched.
    let (_, verdict) = guard.guard_with_verdict(OTHER_SCREEN, tap_login());
    assert_eq!(verdict, GuardVerdict::PassedThrough);
}

#[test]
fn same_kind_different_target_is_not_a_repeat() {
    let mut guard = guard();
    for _ in 0..3 {
        guard.record_action(SCREEN, &tap_login());
    }

    let (_, verdict) = guard.guard_with_verdict(SCREEN, ActionDescriptor::tap("app:id/signup"));
    assert_eq!(verdict, GuardVerdict::PassedThrough);
}

// ============================================================================
// Forced fallback after consecutive no-ops
// ============================================================================

#[test]
fn forces_fallback_burst_after_no_op_threshold() {
    let mut guard = guard();
    for _ in 0..3 {
        guard.record_outcome(false);
    }

    // Burst of three forced fallbacks cycling through the sequence.
    let expected = [ActionKind::Back, ActionKind::ScrollDown, ActionKind::ScrollUp];
    for kind in expected {
        let (action, verdict) = guard.guard_with_verdict(SCREEN, tap_login());
        assert_eq!(verdict, GuardVerdict::ForcedFallback);
        assert_eq!(action.kind, kind);
        guard.record_action(SCREEN, &action);
        guard.record_outcome(false);
    }
}

#[test]
fn fallback_sequence_wraps_around() {
    let mut guard = LoopGuard::new(LoopGuardConfig {
        max_consecutive_no_op: 1,
        max_fallback_burst: 4,
        ..LoopGuardConfig::default()
    });
    guard.record_outcome(false);

    let kinds: Vec<ActionKind> = (0..4)
        .map(|_| guard.guard(SCREEN, tap_login()).kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ActionKind::Back,
            ActionKind::ScrollDown,
            ActionKind::ScrollUp,
            ActionKind::Back
        ],
        "fallback sequence is cyclic"
    );
}

#[test]
fn effective_transition_resets_no_op_counter_and_cursor() {
    let mut guard = guard();
    guard.record_outcome(false);
    guard.record_outcome(false);
    guard.record_outcome(true);
    assert_eq!(guard.consecutive_no_op(), 0);

    // Counter restarted: two more no-ops stay under the threshold.
    guard.record_outcome(false);
    guard.record_outcome(false);
    let (_, verdict) = guard.guard_with_verdict(SCREEN, tap_login());
    assert_eq!(verdict, GuardVerdict::PassedThrough);
}

#[test]
fn success_during_burst_ends_the_burst() {
    let mut guard = guard();
    for _ in 0..3 {
        guard.record_outcome(false);
    }

    let (action, verdict) = guard.guard_with_verdict(SCREEN, tap_login());
    assert_eq!(verdict, GuardVerdict::ForcedFallback);
    guard.record_action(SCREEN, &action);
    guard.record_outcome(true);

    let (_, verdict) = guard.guard_with_verdict(SCREEN, tap_login());
    assert_eq!(
        verdict,
        GuardVerdict::PassedThrough,
        "an effective fallback cancels the remaining burst"
    );
}
