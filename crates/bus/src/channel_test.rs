//! Tests for the broadcast channel

use std::sync::Arc;

use super::channel::Channel;
use super::queue::QueuePolicy;

#[tokio::test]
async fn test_publish_without_subscribers_is_noop() {
    let channel: Channel<u32> = Channel::new(QueuePolicy::Unbounded);
    channel.publish(Arc::new(1)).await;
    assert_eq!(channel.stats().published, 0);
}

#[tokio::test]
async fn test_fan_out_in_order_to_all_subscribers() {
    let channel: Channel<u32> = Channel::new(QueuePolicy::Backpressure(16));
    let mut a = channel.subscribe();
    let mut b = channel.subscribe();

    for i in 0..5u32 {
        channel.publish(Arc::new(i)).await;
    }
    channel.close();

    for subscription in [&mut a, &mut b] {
        let mut seen = Vec::new();
        while let Some(frame) = subscription.recv().await {
            seen.push(*frame);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}

#[tokio::test]
async fn test_dropped_subscription_is_cleaned_up() {
    let channel: Channel<u32> = Channel::new(QueuePolicy::Unbounded);
    let subscription = channel.subscribe();
    assert_eq!(channel.subscriber_count(), 1);

    drop(subscription);
    // Cleanup happens lazily on the next publish
    channel.publish(Arc::new(1)).await;
    assert_eq!(channel.subscriber_count(), 0);

    // And the channel goes back to the zero-cost path
    channel.publish(Arc::new(2)).await;
    let stats = channel.stats();
    assert_eq!(stats.subscriber_count, 0);
}

#[tokio::test]
async fn test_close_ends_subscriber_streams() {
    let channel: Channel<u32> = Channel::new(QueuePolicy::Unbounded);
    let mut subscription = channel.subscribe();

    channel.publish(Arc::new(7)).await;
    channel.close();

    assert_eq!(*subscription.recv().await.unwrap(), 7);
    assert!(subscription.recv().await.is_none());
}

#[tokio::test]
async fn test_subscribe_after_close_ends_immediately() {
    let channel: Channel<u32> = Channel::new(QueuePolicy::Unbounded);
    channel.close();
    let mut subscription = channel.subscribe();
    assert!(subscription.recv().await.is_none());
}

#[tokio::test]
async fn test_drop_oldest_counts_in_stats() {
    let channel: Channel<u32> = Channel::new(QueuePolicy::DropOldest(2));
    let mut subscription = channel.subscribe();

    for i in 0..5u32 {
        channel.publish(Arc::new(i)).await;
    }

    assert_eq!(channel.stats().dropped, 3);
    assert_eq!(*subscription.recv().await.unwrap(), 3);
    assert_eq!(*subscription.recv().await.unwrap(), 4);
}

#[tokio::test]
async fn test_slow_subscriber_does_not_stall_drop_oldest_peer() {
    let channel: Channel<u32> = Channel::new(QueuePolicy::DropOldest(2));
    let mut fast = channel.subscribe();
    let _slow = channel.subscribe();

    for i in 0..10u32 {
        channel.publish(Arc::new(i)).await;
        // Fast consumer keeps up
        let frame = fast.recv().await.unwrap();
        assert_eq!(*frame, i);
    }
}
