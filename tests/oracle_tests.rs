use ui_crawler::hash::codec::GrayImage;
use ui_crawler::model::action::ActionKind;
use ui_crawler::model::ui_tree::UiNode;
use ui_crawler::oracle::heuristic::{guess_value, HeuristicOracle};
use ui_crawler::oracle::oracle::{DecisionOracle, OracleRequest};

// ============================================================================
// Helpers
// ============================================================================

fn login_tree() -> UiNode {
    serde_json::from_str(
        r#"{
            "class": "FrameLayout",
            "children": [
                {"class": "EditText", "resource-id": "app:id/email", "text": "Email", "editable": true},
                {"class": "Button", "resource-id": "app:id/login", "text": "Log in", "clickable": true}
            ]
        }"#,
    )
    .unwrap()
}

fn request<'a>(tree: &'a UiNode, image: &'a GrayImage, previous: &'a [String], visits: u32) -> OracleRequest<'a> {
    OracleRequest {
        ui_tree: tree,
        screenshot: image,
        previous_actions: previous,
        visit_count: visits,
        last_feedback: None,
    }
}

// ============================================================================
// Heuristic oracle
// ============================================================================

#[test]
fn fills_editable_fields_before_tapping() {
    let tree = login_tree();
    let image = GrayImage::new(1, 1, vec![0]);
    let action = HeuristicOracle.suggest(&request(&tree, &image, &[], 1)).unwrap();

    assert_eq!(action.kind, ActionKind::Input);
    assert_eq!(action.target_identifier.as_deref(), Some("app:id/email"));
    assert_eq!(
        action.input_text.as_deref(),
        Some("user@example.com"),
        "value guessed from the field label"
    );
}

#[test]
fn taps_untried_clickables_after_fields_are_done() {
    let tree = login_tree();
    let image = GrayImage::new(1, 1, vec![0]);
    let previous = vec!["input 'app:id/email' <- \"user@example.com\" (success: true)".to_string()];

    let action = HeuristicOracle.suggest(&request(&tree, &image, &previous, 2)).unwrap();
    assert_eq!(action.kind, ActionKind::Tap);
    assert_eq!(action.target_identifier.as_deref(), Some("app:id/login"));
}

#[test]
fn scrolls_when_everything_was_tried() {
    let tree = login_tree();
    let image = GrayImage::new(1, 1, vec![0]);
    let previous = vec![
        "input 'app:id/email' <- \"user@example.com\" (success: true)".to_string(),
        "tap 'app:id/login' (success: false)".to_string(),
    ];

    let odd = HeuristicOracle.suggest(&request(&tree, &image, &previous, 3)).unwrap();
    assert_eq!(odd.kind, ActionKind::ScrollDown);

    let even = HeuristicOracle.suggest(&request(&tree, &image, &previous, 4)).unwrap();
    assert_eq!(even.kind, ActionKind::ScrollUp, "direction alternates with visits");
}

// ============================================================================
// Value guessing
// ============================================================================

#[test]
fn guesses_values_by_label_keyword() {
    assert_eq!(guess_value("Email address"), "user@example.com");
    assert_eq!(guess_value("Choose a PASSWORD"), "TestPass123!");
    assert_eq!(guess_value("Search products"), "test query");
    assert_eq!(guess_value("mystery field"), "test");
}
