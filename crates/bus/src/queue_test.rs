//! Tests for subscriber queue policies

use std::sync::Arc;
use std::time::Duration;

use super::queue::*;

fn frame(id: u32) -> Arc<u32> {
    Arc::new(id)
}

// ============================================================================
// Drop-oldest
// ============================================================================

#[tokio::test]
async fn test_drop_oldest_evicts_from_front() {
    let queue = FrameQueue::new(QueuePolicy::DropOldest(2));
    queue.push(frame(1), Some(2));
    queue.push(frame(2), Some(2));
    queue.push(frame(3), Some(2));

    assert_eq!(queue.dropped(), 1);
    assert_eq!(*queue.pop().await.unwrap(), 2);
    assert_eq!(*queue.pop().await.unwrap(), 3);
}

#[tokio::test]
async fn test_delivery_is_prefix_preserving_subsequence() {
    let queue = FrameQueue::new(QueuePolicy::DropOldest(3));
    for i in 0..10u32 {
        queue.push(frame(i), Some(3));
    }
    queue.close();

    let mut delivered = Vec::new();
    while let Some(f) = queue.pop().await {
        delivered.push(*f);
    }
    // Strictly increasing subsequence of the production order
    assert!(delivered.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(delivered.last(), Some(&9));
}

// ============================================================================
// Backpressure
// ============================================================================

#[tokio::test]
async fn test_backpressure_blocks_until_pop() {
    let queue = Arc::new(FrameQueue::new(QueuePolicy::Backpressure(1)));
    queue.push_wait(frame(1)).await;

    let producer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue.push_wait(frame(2)).await;
        })
    };

    // The producer cannot finish until the consumer frees a slot
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!producer.is_finished());

    assert_eq!(*queue.pop().await.unwrap(), 1);
    producer.await.unwrap();
    assert_eq!(*queue.pop().await.unwrap(), 2);
    assert_eq!(queue.dropped(), 0);
}

#[tokio::test]
async fn test_backpressure_never_drops() {
    let queue = Arc::new(FrameQueue::new(QueuePolicy::Backpressure(4)));

    let producer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            for i in 0..100u32 {
                queue.push_wait(frame(i)).await;
            }
            queue.close();
        })
    };

    let mut delivered = Vec::new();
    while let Some(f) = queue.pop().await {
        delivered.push(*f);
    }
    producer.await.unwrap();

    let expected: Vec<u32> = (0..100).collect();
    assert_eq!(delivered, expected);
}

#[tokio::test]
async fn test_close_unblocks_waiting_producer() {
    let queue = Arc::new(FrameQueue::new(QueuePolicy::Backpressure(1)));
    queue.push_wait(frame(1)).await;

    let producer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue.push_wait(frame(2)).await;
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    queue.close();
    // Producer must not hang on a closed queue
    tokio::time::timeout(Duration::from_secs(1), producer)
        .await
        .unwrap()
        .unwrap();
}

// ============================================================================
// Close semantics
// ============================================================================

#[tokio::test]
async fn test_close_drains_then_ends() {
    let queue = FrameQueue::new(QueuePolicy::Unbounded);
    queue.push(frame(1), None);
    queue.push(frame(2), None);
    queue.close();

    assert_eq!(*queue.pop().await.unwrap(), 1);
    assert_eq!(*queue.pop().await.unwrap(), 2);
    assert!(queue.pop().await.is_none());
}

#[tokio::test]
async fn test_push_after_close_is_ignored() {
    let queue = FrameQueue::new(QueuePolicy::Unbounded);
    queue.close();
    queue.push(frame(1), None);
    assert!(queue.pop().await.is_none());
}
