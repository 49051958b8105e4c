//! Tests for the iterable queue

use std::time::Duration;

use super::iterable::IterableQueue;

#[tokio::test]
async fn test_put_then_close_delivers_all() {
    let queue = IterableQueue::new();
    queue.put(1).unwrap();
    queue.put(2).unwrap();
    queue.close();

    assert_eq!(queue.next().await, Some(1));
    assert_eq!(queue.next().await, Some(2));
    assert_eq!(queue.next().await, None);
    // End-of-stream is sticky
    assert_eq!(queue.next().await, None);
}

#[tokio::test]
async fn test_put_after_close_fails() {
    let queue = IterableQueue::new();
    queue.close();
    assert!(queue.put(1).is_err());
}

#[tokio::test]
async fn test_consumer_blocks_until_item() {
    let queue = IterableQueue::new();
    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.next().await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!consumer.is_finished());

    queue.put(42).unwrap();
    assert_eq!(consumer.await.unwrap(), Some(42));
}

#[tokio::test]
async fn test_cancelled_next_loses_nothing() {
    let queue: IterableQueue<u32> = IterableQueue::new();

    // A next() future dropped before completion must not consume
    {
        let pending = queue.next();
        tokio::pin!(pending);
        let poll = futures_poll_once(pending.as_mut()).await;
        assert!(poll.is_none());
    }

    queue.put(5).unwrap();
    assert_eq!(queue.next().await, Some(5));
}

/// Poll a future exactly once
async fn futures_poll_once<F: std::future::Future>(future: std::pin::Pin<&mut F>) -> Option<F::Output> {
    let mut future = Some(future);
    std::future::poll_fn(move |cx| {
        let polled = future.take().map(|f| f.poll(cx));
        match polled {
            Some(std::task::Poll::Ready(output)) => std::task::Poll::Ready(Some(output)),
            _ => std::task::Poll::Ready(None),
        }
    })
    .await
}

#[tokio::test]
async fn test_join_waits_for_drain() {
    let queue = IterableQueue::new();
    queue.put(1).unwrap();
    queue.put(2).unwrap();
    queue.close();

    let joiner = {
        let queue = queue.clone();
        tokio::spawn(async move {
            queue.join().await;
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!joiner.is_finished());

    assert_eq!(queue.next().await, Some(1));
    assert_eq!(queue.next().await, Some(2));
    tokio::time::timeout(Duration::from_secs(1), joiner)
        .await
        .unwrap()
        .unwrap();
}
