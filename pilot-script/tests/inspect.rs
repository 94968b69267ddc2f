mod common;

use common::{init_test_tracing, FakePage};
use pilot_script::inspect;

#[tokio::test]
async fn side_tab_is_read_then_closed() {
    init_test_tracing();
    let page = FakePage::new("https://search.example/?q=rust").with_body("Result", "  page text  ");

    let reading = inspect::read_in_tab(&page, "https://docs.example/", 1, 0, 100)
        .await
        .unwrap();
    assert_eq!(reading.chunks, vec!["page text".to_string()]);
    assert!(!reading.pdf);
    assert_eq!(
        page.state().log,
        vec!["open_tab:https://docs.example/", "close_tab"]
    );
}

#[tokio::test]
async fn failed_tab_load_still_closes_the_tab() {
    init_test_tracing();
    let page = FakePage::new("https://search.example/?q=rust");
    page.state().tab_load_fails = true;

    let err = inspect::read_in_tab(&page, "https://slow.example/", 3, 1200, 100)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"));
    assert_eq!(
        page.state().log,
        vec!["open_tab:https://slow.example/", "close_tab"]
    );
}
