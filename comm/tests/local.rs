use std::future::Future;
use std::time::Duration;

use comm::{COLLECTIVE_TAG_BASE, Communicator, Error, LocalUniverse, RequestList};

/// Runs `body` once per rank, each on its own task, and returns the results in
/// rank order.
async fn run_ranks<F, Fut, T>(universe: &LocalUniverse, body: F) -> Vec<T>
where
    F: Fn(Communicator) -> Fut,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = universe
        .communicators()
        .into_iter()
        .map(|world| tokio::spawn(body(world)))
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    results
}

#[tokio::test]
async fn test_send_recv_preserves_order_per_tag() {
    let universe = LocalUniverse::new(2);
    let ranks = universe.communicators();

    for value in 0..5u64 {
        ranks[0].send(&value, 1, 1).await.unwrap();
    }
    ranks[0].send(&100u64, 1, 2).await.unwrap();

    let other_tag: u64 = ranks[1].recv(0, 2).await.unwrap();
    assert_eq!(other_tag, 100);
    for expected in 0..5u64 {
        let value: u64 = ranks[1].recv(0, 1).await.unwrap();
        assert_eq!(value, expected);
    }
    assert_eq!(universe.delivered(), 6);
}

#[tokio::test]
async fn test_invalid_rank_and_reserved_tag_send_nothing() {
    let universe = LocalUniverse::new(2);
    let ranks = universe.communicators();

    assert!(matches!(
        ranks[0].send(&1u64, 2, 0).await,
        Err(Error::InvalidRank { rank: 2, size: 2 })
    ));
    assert!(matches!(
        ranks[0].send(&1u64, 1, COLLECTIVE_TAG_BASE).await,
        Err(Error::ReservedTag(_))
    ));
    assert!(matches!(
        ranks[1].irecv::<u64>(5, 0),
        Err(Error::InvalidRank { .. })
    ));
    assert_eq!(universe.delivered(), 0);
}

#[tokio::test]
async fn test_nonblocking_receives_match_in_post_order_under_jitter() {
    let universe = LocalUniverse::new(2).with_latency(Duration::from_millis(15));
    let ranks = universe.communicators();

    let receives: RequestList<u64> = (0..20)
        .map(|_| ranks[1].irecv::<u64>(0, 4).unwrap())
        .collect();
    let sends: RequestList<()> = (0..20u64)
        .map(|value| ranks[0].isend(&value, 1, 4).unwrap())
        .collect();

    sends.wait_all().await.unwrap();
    assert_eq!(receives.wait_all().await.unwrap(), (0..20).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_receive_completes_only_after_matching_send() {
    let universe = LocalUniverse::new(2);
    let ranks = universe.communicators();

    let receive = ranks[1].irecv::<String>(0, 9).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!receive.is_finished());

    ranks[0].isend(&"late".to_string(), 1, 9).unwrap().wait().await.unwrap();
    assert_eq!(receive.wait().await.unwrap(), "late");
}

#[tokio::test]
async fn test_broadcast_copies_root_value() {
    let universe = LocalUniverse::new(4);
    let values = run_ranks(&universe, |world| async move {
        let mut value = if world.rank() == 2 { 77u64 } else { 0 };
        world.broadcast(&mut value, 2).await?;
        Ok::<_, Error>(value)
    })
    .await;

    assert_eq!(values, vec![77; 4]);
}

#[tokio::test]
async fn test_scatter_hands_each_rank_its_part() {
    let universe = LocalUniverse::new(3);
    let parts = run_ranks(&universe, |world| async move {
        let parts = (world.rank() == 0).then(|| vec![10u64, 11, 12]);
        world.scatter(parts, 0).await
    })
    .await;

    assert_eq!(parts, vec![10, 11, 12]);
}

#[tokio::test]
async fn test_scatter_with_wrong_part_count_fails_at_root() {
    let universe = LocalUniverse::new(1);
    let world = universe.communicators().remove(0);

    let result = world.scatter(Some(vec![1u64, 2]), 0).await;
    assert!(matches!(
        result,
        Err(Error::InvalidCount {
            expected: 1,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn test_gather_collects_in_rank_order_at_root_only() {
    let universe = LocalUniverse::new(4).with_latency(Duration::from_millis(10));
    let gathered = run_ranks(&universe, |world| async move {
        let value = (world.rank() as u64 + 1) * 100;
        world.gather(&value, 1).await
    })
    .await;

    assert_eq!(gathered[0], None);
    assert_eq!(gathered[1], Some(vec![100, 200, 300, 400]));
    assert_eq!(gathered[2], None);
    assert_eq!(gathered[3], None);
}

#[tokio::test]
async fn test_all_gather_is_identical_on_every_rank() {
    let universe = LocalUniverse::new(3).with_latency(Duration::from_millis(10));
    let gathered = run_ranks(&universe, |world| async move {
        let value = format!("rank-{}", world.rank());
        world.all_gather(&value).await
    })
    .await;

    let expected = vec!["rank-0", "rank-1", "rank-2"];
    for view in gathered {
        assert_eq!(view, expected);
    }
}

#[tokio::test]
async fn test_barrier_holds_until_everyone_arrives() {
    let universe = LocalUniverse::new(3);
    let mut ranks = universe.communicators();
    let late = ranks.pop().unwrap();

    let early: Vec<_> = ranks
        .into_iter()
        .map(|world| tokio::spawn(async move { world.barrier().await }))
        .collect();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(early.iter().all(|handle| !handle.is_finished()));

    late.barrier().await.unwrap();
    for handle in early {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_repeated_collectives_do_not_mix() {
    let universe = LocalUniverse::new(3).with_latency(Duration::from_millis(5));
    let rounds = run_ranks(&universe, |world| async move {
        let mut seen = Vec::new();
        for round in 0..4u64 {
            let mut value = if world.rank() == 0 { round } else { u64::MAX };
            world.broadcast(&mut value, 0).await?;
            seen.push(value);
        }
        Ok::<_, Error>(seen)
    })
    .await;

    for seen in rounds {
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
