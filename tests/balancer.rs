//! End-to-end behaviour of the load balancer: selection, retry and the
//! failure-rate breaker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use endpoint_balancer::{
    AsyncCache, BalancerConfig, BalancerError, FailureRateConfig, LoadBalancer, PolicyKind,
};

mod common;
use common::{manual_clock, EndpointDown};

fn down(index: usize) -> EndpointDown {
    EndpointDown {
        index,
        reason: "connection refused",
    }
}

#[tokio::test]
async fn test_round_robin_visits_each_endpoint_once() {
    let urls = ["url1", "url2", "url3"];
    let mut config = BalancerConfig::with_endpoints(urls.len());
    config.failure_rate = Some(FailureRateConfig::new(
        10,
        Duration::from_secs(30),
        Duration::from_secs(60),
    ));
    let lb = LoadBalancer::new(config).unwrap();

    let mut results = Vec::new();
    for _ in 0..urls.len() {
        let url = lb
            .wrap_indexed(|index| async move { Ok::<_, EndpointDown>(urls[index]) })
            .await
            .unwrap();
        results.push(url);
    }
    assert_eq!(results, urls);

    // Rotation continues from where the cursor left off.
    let next = lb
        .wrap_indexed(|index| async move { Ok::<_, EndpointDown>(index) })
        .await
        .unwrap();
    assert_eq!(next, 0);
}

#[tokio::test]
async fn test_retry_then_success() {
    let urls = ["url1", "url2", "url3"];
    let mut config = BalancerConfig::with_endpoints(urls.len());
    config.retry_count = 2;
    config.failure_rate = Some(FailureRateConfig::new(
        10,
        Duration::from_secs(30),
        Duration::from_secs(60),
    ));
    let lb = LoadBalancer::new(config).unwrap();

    let result = lb
        .wrap_with(|index, attempts_remaining| async move {
            if attempts_remaining > 0 {
                Err(down(index))
            } else {
                Ok(urls[index])
            }
        })
        .await;

    assert_eq!(result.unwrap(), "url3");
    assert_eq!(lb.in_flight(), 0);

    let snapshot = lb.snapshot();
    assert_eq!(snapshot[0].failures, 1);
    assert_eq!(snapshot[1].failures, 1);
    assert_eq!(snapshot[2].successes, 1);
}

#[tokio::test]
async fn test_retry_exhaustion_returns_original_error() {
    let mut config = BalancerConfig::with_endpoints(3);
    config.retry_count = 4;
    let lb = LoadBalancer::new(config).unwrap();
    let attempts = AtomicUsize::new(0);

    let result: Result<(), _> = lb
        .wrap_indexed(|index| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(down(index)) }
        })
        .await;

    // Five attempts over three endpoints: the last one lands on index 1.
    match result {
        Err(BalancerError::Endpoint(e)) => assert_eq!(e, down(1)),
        other => panic!("expected endpoint error, got {:?}", other),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 5);
    assert_eq!(lb.in_flight(), 0);
}

#[tokio::test]
async fn test_suspension_after_single_failure() {
    let clock = manual_clock();
    let mut config = BalancerConfig::default();
    config.failure_rate = Some(FailureRateConfig::new(
        1,
        Duration::from_secs(30),
        Duration::from_secs(1000),
    ));
    let lb = LoadBalancer::build(config, None, clock.clone()).unwrap();

    let mut results = Vec::new();
    for _ in 0..3 {
        let result: Result<(), _> = lb.wrap(|| async { Err(down(0)) }).await;
        results.push(result.unwrap_err());
    }

    assert!(matches!(&results[0], BalancerError::Endpoint(e) if *e == down(0)));
    assert_eq!(results[0].to_string(), "endpoint 0 failed: connection refused");
    assert!(results[1].is_exhausted());
    assert!(results[2].is_exhausted());
    assert_eq!(results[1].to_string(), "All backends suspended");
    assert_eq!(lb.snapshot()[0].failures, 1);

    // Suspension expires on its own.
    clock.advance(Duration::from_secs(1001));
    let ok = lb.wrap(|| async { Ok::<_, EndpointDown>(()) }).await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_breaker_trips_on_failures_within_window() {
    let clock = manual_clock();
    let mut config = BalancerConfig::default();
    config.failure_rate = Some(FailureRateConfig::new(
        3,
        Duration::from_secs(10),
        Duration::from_secs(60),
    ));
    let lb = LoadBalancer::build(config, None, clock.clone()).unwrap();

    for _ in 0..2 {
        let _ = lb.wrap(|| async { Err::<(), _>(down(0)) }).await;
        clock.advance(Duration::from_secs(1));
    }
    assert!(lb.is_eligible(0));

    let _ = lb.wrap(|| async { Err::<(), _>(down(0)) }).await;
    assert!(!lb.is_eligible(0));

    let next = lb.wrap(|| async { Ok::<_, EndpointDown>(()) }).await;
    assert!(next.unwrap_err().is_exhausted());
}

#[tokio::test]
async fn test_failures_outside_window_do_not_count() {
    let clock = manual_clock();
    let mut config = BalancerConfig::default();
    config.failure_rate = Some(FailureRateConfig::new(
        2,
        Duration::from_secs(10),
        Duration::from_secs(60),
    ));
    let lb = LoadBalancer::build(config, None, clock.clone()).unwrap();

    let _ = lb.wrap(|| async { Err::<(), _>(down(0)) }).await;
    clock.advance(Duration::from_secs(15));
    let _ = lb.wrap(|| async { Err::<(), _>(down(0)) }).await;
    assert!(lb.is_eligible(0));

    let ok = lb.wrap(|| async { Ok::<_, EndpointDown>(7) }).await;
    assert_eq!(ok.unwrap(), 7);
}

#[tokio::test]
async fn test_retries_route_around_suspended_endpoint() {
    let clock = manual_clock();
    let mut config = BalancerConfig::with_endpoints(2);
    config.retry_count = 1;
    config.failure_rate = Some(FailureRateConfig::new(
        1,
        Duration::from_secs(30),
        Duration::from_secs(60),
    ));
    let lb = LoadBalancer::build(config, None, clock).unwrap();

    // Endpoint 0 fails once and is suspended; the retry goes to 1.
    let result = lb
        .wrap_indexed(|index| async move {
            if index == 0 {
                Err(down(0))
            } else {
                Ok(index)
            }
        })
        .await;
    assert_eq!(result.unwrap(), 1);

    // Every later request skips 0.
    for _ in 0..4 {
        let index = lb
            .wrap_indexed(|index| async move { Ok::<_, EndpointDown>(index) })
            .await
            .unwrap();
        assert_eq!(index, 1);
    }
}

#[tokio::test]
async fn test_latency_bias_prefers_measured_endpoint() {
    let mut config = BalancerConfig::with_endpoints(3);
    config.policy = PolicyKind::LatencyBiased;
    let lb = LoadBalancer::new(config).unwrap();

    // 0 fails, 1 succeeds slowly, 2 succeeds quickly.
    let _ = lb.wrap_indexed(|index| async move { Err::<(), _>(down(index)) }).await;
    let slow = lb
        .wrap_indexed(|index| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, EndpointDown>(index)
        })
        .await
        .unwrap();
    assert_eq!(slow, 1);

    let fast = lb
        .wrap_indexed(|index| async move { Ok::<_, EndpointDown>(index) })
        .await
        .unwrap();
    assert_eq!(fast, 2);

    let next = lb
        .wrap_indexed(|index| async move { Ok::<_, EndpointDown>(index) })
        .await
        .unwrap();
    assert_eq!(next, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_keep_separate_budgets() {
    let mut config = BalancerConfig::with_endpoints(4);
    config.retry_count = 3;
    let lb = Arc::new(LoadBalancer::new(config).unwrap());

    let mut handles = Vec::new();
    for _ in 0..32 {
        let lb = lb.clone();
        handles.push(tokio::spawn(async move {
            lb.wrap_with(|index, attempts_remaining| async move {
                tokio::task::yield_now().await;
                if attempts_remaining > 0 {
                    Err(down(index))
                } else {
                    Ok(attempts_remaining)
                }
            })
            .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 0);
    }
    assert_eq!(lb.in_flight(), 0);

    let snapshot = lb.snapshot();
    let failures: u64 = snapshot.iter().map(|s| s.failures).sum();
    let successes: u64 = snapshot.iter().map(|s| s.successes).sum();
    assert_eq!(failures, 32 * 3);
    assert_eq!(successes, 32);
    // The shared cursor spreads the 128 attempts evenly.
    assert!(snapshot.iter().all(|s| s.failures + s.successes == 32));
}

#[tokio::test]
async fn test_cancelled_request_releases_budget() {
    let mut config = BalancerConfig::with_endpoints(2);
    config.retry_count = 1;
    let lb = LoadBalancer::new(config).unwrap();

    let never = lb.wrap(|| std::future::pending::<Result<(), EndpointDown>>());
    let timed_out = tokio::time::timeout(Duration::from_millis(20), never).await;
    assert!(timed_out.is_err());
    assert_eq!(lb.in_flight(), 0);
}

#[tokio::test]
async fn test_cache_decorates_endpoint_calls() {
    let lb = LoadBalancer::new(BalancerConfig::with_endpoints(2)).unwrap();
    let cache: AsyncCache<&str, usize> = AsyncCache::new(Duration::from_secs(60));

    for _ in 0..3 {
        let value = lb
            .wrap_indexed(|index| {
                let cache = cache.clone();
                async move {
                    cache
                        .wrap("profile", || async move { Ok::<_, EndpointDown>(index) })
                        .await
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 0);
    }

    let snapshot = lb.snapshot();
    assert_eq!(snapshot[0].successes + snapshot[1].successes, 3);
}
