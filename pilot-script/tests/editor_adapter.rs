mod common;

use std::time::Duration;

use common::{fast_limits, init_test_tracing, FakePage};
use pilot_drivers::Locator;
use pilot_script::editor;
use pilot_script::EditorKind;

#[tokio::test]
async fn write_read_clear_round_trip_for_every_widget() {
    init_test_tracing();
    for kind in EditorKind::DETECT_ORDER {
        let page = FakePage::new("https://ide.example/").with_editor(kind);

        assert_eq!(editor::detect_kind(&page).await, kind);
        assert_eq!(editor::write_with(&page, "print(42)").await, Some(kind));
        assert_eq!(editor::read_value(&page).await, "print(42)", "{kind:?}");

        assert!(editor::clear(&page).await, "{kind:?}");
        assert_eq!(editor::read_value(&page).await, "", "{kind:?}");
    }
}

#[tokio::test]
async fn textarea_text_reads_back_past_a_comment_box() {
    let page = FakePage::new("https://judge.example/")
        .with_editor(EditorKind::Textarea)
        .with_element(Locator::css("[contenteditable='true']"), "Leave a comment");

    assert_eq!(editor::write_with(&page, "print(1)").await, Some(EditorKind::Textarea));
    assert_eq!(editor::read_value(&page).await, "print(1)");

    assert!(editor::clear(&page).await);
    assert_eq!(editor::read_value(&page).await, "");
    assert_eq!(editor::read_written(&page).await.as_deref(), Some(""));
}

#[tokio::test]
async fn clear_falls_back_to_select_all_delete() {
    let page = FakePage::new("https://ide.example/").with_editor(EditorKind::Ace);
    page.state().editor_value = "stale".into();
    page.state().write_blocked = true;

    assert!(editor::clear(&page).await);
    assert_eq!(page.state().editor_value, "");
    assert!(page.logged("press:Control+A"));
    assert!(page.logged("press:Delete"));
}

#[tokio::test]
async fn missing_editor_reports_failure_and_reads_body() {
    let page = FakePage::new("https://news.example/").with_body("News", "headline text");

    assert!(!editor::write_value(&page, "x").await);
    assert!(!editor::clear(&page).await);
    assert!(!editor::detect_and_focus(&page).await);
    assert_eq!(editor::read_value(&page).await, "headline text");
}

#[tokio::test]
async fn scroll_search_finds_editor_below_the_fold() {
    let page = FakePage::new("https://ide.example/").with_editor(EditorKind::CodeMirror6);
    page.state().editor_revealed_at = 1200;

    assert!(editor::find_and_focus(&page, &fast_limits()).await);
    let state = page.state();
    assert_eq!(state.scroll_y, 1200);
    assert!(state.focused);
    assert_eq!(state.log.iter().filter(|l| *l == "scroll:400").count(), 3);
}

#[tokio::test]
async fn scroll_search_gives_up_after_two_passes() {
    let page = FakePage::new("https://ide.example/");

    assert!(!editor::find_and_focus(&page, &fast_limits()).await);
    let scrolls = page
        .state()
        .log
        .iter()
        .filter(|l| l.starts_with("scroll:"))
        .count();
    assert_eq!(scrolls, 20);
}

#[tokio::test]
async fn simulated_typing_lands_in_focused_editor() {
    let page = FakePage::new("https://ide.example/").with_editor(EditorKind::Monaco);

    assert!(editor::simulate_typing(&page, "let x = 1;", Duration::from_millis(5)).await);
    assert_eq!(editor::read_value(&page).await, "let x = 1;");
}
