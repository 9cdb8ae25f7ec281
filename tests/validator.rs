mod common;

use common::{
    candidate, closed_port, spawn_blackhole, spawn_slow_closer, spawn_socks5_relay, ConnectionGauge,
};
use parking_lot::Mutex;
use socks_hunter::{Candidate, ValidatedOrder, Validator, ValidatorConfig};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn target(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(status).set_body_string("pong"))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer, timeout: Duration) -> ValidatorConfig {
    ValidatorConfig::builder()
        .test_url(format!("{}/ping", server.uri()))
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
}

#[tokio::test]
async fn working_proxy_is_validated() {
    let server = target(200).await;
    let relay = spawn_socks5_relay().await;
    let validator = Validator::new(config(&server, Duration::from_secs(5)));

    let validated = validator.probe(&candidate(relay)).await.expect("relay should pass");
    assert_eq!(validated.candidate, candidate(relay));
    assert!(validated.latency > Duration::ZERO);
    assert!(!server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_200_status_fails() {
    let server = target(404).await;
    let relay = spawn_socks5_relay().await;
    let validator = Validator::new(config(&server, Duration::from_secs(5)));

    assert!(validator.probe(&candidate(relay)).await.is_none());
}

#[tokio::test]
async fn unresponsive_proxy_is_bounded_by_timeout() {
    let server = target(200).await;
    let hole = spawn_blackhole().await;
    let validator = Validator::new(config(&server, Duration::from_millis(300)));

    let start = Instant::now();
    assert!(validator.probe(&candidate(hole)).await.is_none());
    assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn mixed_candidates_keep_only_working_ones() {
    let server = target(200).await;
    let good_a = spawn_socks5_relay().await;
    let good_b = spawn_socks5_relay().await;
    let dead = closed_port().await;
    let hole_a = spawn_blackhole().await;
    let hole_b = spawn_blackhole().await;

    let validator = Validator::new(config(&server, Duration::from_millis(500)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_cb = Arc::clone(&seen);

    let start = Instant::now();
    let validated = validator
        .validate_with(
            vec![candidate(hole_a), candidate(good_a), candidate(dead), candidate(hole_b), candidate(good_b)],
            move |proxy| seen_cb.lock().push(proxy.candidate.clone()),
        )
        .await;

    // both blackholes run concurrently, so the run takes about one timeout
    assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());

    let got: HashSet<Candidate> = validated.iter().map(|v| v.candidate.clone()).collect();
    let want: HashSet<Candidate> = [candidate(good_a), candidate(good_b)].into_iter().collect();
    assert_eq!(got, want);

    let reported: Vec<Candidate> = seen.lock().clone();
    let returned: Vec<Candidate> = validated.iter().map(|v| v.candidate.clone()).collect();
    assert_eq!(reported, returned, "completion order matches callback order");
}

#[tokio::test]
async fn concurrency_and_rate_limits_still_check_everything() {
    let server = target(200).await;
    let mut candidates = Vec::new();
    for _ in 0..4 {
        candidates.push(candidate(spawn_socks5_relay().await));
    }
    candidates.push(candidate(closed_port().await));

    let config = ValidatorConfig::builder()
        .test_url(format!("{}/ping", server.uri()))
        .timeout(Duration::from_secs(5))
        .max_concurrency(2)
        .probes_per_second(100.0)
        .order(ValidatedOrder::Fastest)
        .build();
    let validated = Validator::new(config).validate(candidates).await;

    assert_eq!(validated.len(), 4);
    assert!(validated.windows(2).all(|w| w[0].latency <= w[1].latency));
}

#[tokio::test]
async fn max_concurrency_caps_checks_in_flight() {
    let server = target(200).await;
    let gauge = Arc::new(ConnectionGauge::default());
    let slow = spawn_slow_closer(Duration::from_millis(300), Arc::clone(&gauge)).await;

    let config = ValidatorConfig::builder()
        .test_url(format!("{}/ping", server.uri()))
        .timeout(Duration::from_secs(5))
        .max_concurrency(2)
        .build();

    let start = Instant::now();
    let validated = Validator::new(config).validate(vec![candidate(slow); 6]).await;

    assert!(validated.is_empty());
    assert_eq!(gauge.total(), 6);
    assert!(gauge.peak() <= 2, "peak {} exceeds cap", gauge.peak());
    // three waves of two
    assert!(start.elapsed() >= Duration::from_millis(850), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn launch_rate_is_capped() {
    let server = target(200).await;
    let dead = closed_port().await;

    let config = ValidatorConfig::builder()
        .test_url(format!("{}/ping", server.uri()))
        .timeout(Duration::from_secs(5))
        .probes_per_second(2.0)
        .build();

    let start = Instant::now();
    Validator::new(config).validate(vec![candidate(dead); 3]).await;

    // launches at 0s, 0.5s and 1s
    assert!(start.elapsed() >= Duration::from_millis(900), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn fractional_rate_is_not_rounded_up() {
    let server = target(200).await;
    let dead = closed_port().await;

    let config = ValidatorConfig::builder()
        .test_url(format!("{}/ping", server.uri()))
        .timeout(Duration::from_secs(5))
        .probes_per_second(0.5)
        .build();

    let start = Instant::now();
    Validator::new(config).validate(vec![candidate(dead); 2]).await;

    // one launch every two seconds
    assert!(start.elapsed() >= Duration::from_millis(1900), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn panicking_task_counts_as_failure() {
    let server = target(200).await;
    let relay = spawn_socks5_relay().await;
    let validator = Validator::new(config(&server, Duration::from_secs(5)));

    let validated = validator
        .validate_with(vec![candidate(relay), candidate(closed_port().await)], |_| {
            panic!("callback failure")
        })
        .await;

    assert!(validated.is_empty());
    // the validator is still usable afterwards
    assert_eq!(validator.validate(vec![candidate(relay)]).await.len(), 1);
}
