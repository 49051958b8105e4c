//! Tests for the central log ring

use thalamus_protocol::TextFrame;

use super::logging::LogRing;

#[tokio::test]
async fn test_append_retains_and_fans_out() {
    let ring = LogRing::new();
    let mut tail = ring.subscribe();

    ring.append(TextFrame::new("first", 1)).await;
    ring.append(TextFrame::new("second", 2)).await;

    assert_eq!(ring.len(), 2);
    assert_eq!(ring.recent()[0].text, "first");

    assert_eq!(tail.recv().await.unwrap().text, "first");
    assert_eq!(tail.recv().await.unwrap().text, "second");
}

#[tokio::test]
async fn test_tail_is_live_only() {
    let ring = LogRing::new();
    ring.append(TextFrame::new("before", 1)).await;

    let mut tail = ring.subscribe();
    ring.append(TextFrame::new("after", 2)).await;

    // The subscriber sees only records appended after it joined
    assert_eq!(tail.recv().await.unwrap().text, "after");
}

#[tokio::test]
async fn test_close_ends_tails() {
    let ring = LogRing::new();
    let mut tail = ring.subscribe();
    ring.append(TextFrame::new("last", 1)).await;
    ring.close();

    assert_eq!(tail.recv().await.unwrap().text, "last");
    assert!(tail.recv().await.is_none());
}

#[tokio::test]
async fn test_ring_is_bounded() {
    let ring = LogRing::new();
    for i in 0..5000u64 {
        ring.append(TextFrame::new(format!("m{i}"), i)).await;
    }
    // Old records were evicted; the newest survives
    assert!(ring.len() <= 4096);
    assert_eq!(ring.recent().last().unwrap().text, "m4999");
}
