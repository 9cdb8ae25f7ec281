//! Concurrent reachability validation of proxy candidates.

use crate::config::{ValidatedOrder, ValidatorConfig};
use crate::proxy::{Candidate, ValidatedProxy};

use futures::future;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use reqwest::StatusCode;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;
type OnAvailable = Arc<dyn Fn(&ValidatedProxy) + Send + Sync>;

/// Probes candidates through a real HTTP request and keeps the ones that answer.
pub struct Validator {
    config: Arc<ValidatorConfig>,
    limiter: Option<Arc<Limiter>>,
}

impl Validator {
    /// Create a validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        let limiter = config
            .probes_per_second
            .and_then(launch_quota)
            .map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { config: Arc::new(config), limiter }
    }

    /// The configuration this validator was built with.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Probe a single candidate.
    ///
    /// Returns `Some` only when `test_url` answered `200 OK` through the
    /// candidate within the configured timeouts.
    pub async fn probe(&self, candidate: &Candidate) -> Option<ValidatedProxy> {
        probe_candidate(&self.config, candidate).await
    }

    /// Validate every candidate concurrently.
    pub async fn validate(&self, candidates: Vec<Candidate>) -> Vec<ValidatedProxy> {
        self.validate_with(candidates, |_| {}).await
    }

    /// Validate every candidate concurrently, calling `on_available` as soon
    /// as each one passes.
    ///
    /// Returns after all probes have finished, ordered per the configured
    /// `ValidatedOrder`.
    pub async fn validate_with<F>(&self, candidates: Vec<Candidate>, on_available: F) -> Vec<ValidatedProxy>
    where
        F: Fn(&ValidatedProxy) + Send + Sync + 'static,
    {
        if candidates.is_empty() {
            return Vec::new();
        }

        let total = candidates.len();
        info!(
            "Validating {} candidates against {} (timeout {:?})",
            total, self.config.test_url, self.config.timeout
        );

        let available: Arc<Mutex<Vec<ValidatedProxy>>> = Arc::new(Mutex::new(Vec::new()));
        let on_available: OnAvailable = Arc::new(on_available);
        let permits = self.config.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        let handles: Vec<_> = candidates
            .into_iter()
            .map(|candidate| {
                let config = Arc::clone(&self.config);
                let limiter = self.limiter.clone();
                let permits = permits.clone();
                let available = Arc::clone(&available);
                let on_available = Arc::clone(&on_available);

                tokio::spawn(async move {
                    let _permit = match permits {
                        Some(sem) => match sem.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => return,
                        },
                        None => None,
                    };
                    if let Some(limiter) = limiter {
                        limiter.until_ready().await;
                    }

                    if let Some(validated) = probe_candidate(&config, &candidate).await {
                        // report under the lock so callbacks see list order
                        let mut list = available.lock();
                        on_available(&validated);
                        list.push(validated);
                    }
                })
            })
            .collect();

        for result in future::join_all(handles).await {
            if let Err(e) = result {
                warn!("Probe task failed: {}", e);
            }
        }

        let mut validated = std::mem::take(&mut *available.lock());
        info!(
            "Validation completed: {} available, {} unavailable",
            validated.len(),
            total - validated.len()
        );

        order_validated(&mut validated, self.config.order);
        validated
    }
}

/// One launch every `1 / rate` seconds, without bursts.
///
/// `None` when the rate is not a positive finite number or is too high to
/// be represented, i.e. unlimited.
fn launch_quota(rate: f64) -> Option<Quota> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let period = Duration::try_from_secs_f64(1.0 / rate).ok()?;
    Quota::with_period(period).map(|quota| quota.allow_burst(NonZeroU32::MIN))
}

/// Reorder validated proxies in place.
pub fn order_validated(validated: &mut [ValidatedProxy], order: ValidatedOrder) {
    match order {
        ValidatedOrder::Completion => {}
        ValidatedOrder::Fastest => validated.sort_by_key(|v| v.latency),
        ValidatedOrder::Random => validated.shuffle(&mut rand::rng()),
    }
}

async fn probe_candidate(config: &ValidatorConfig, candidate: &Candidate) -> Option<ValidatedProxy> {
    let start = Instant::now();

    let proxy = match candidate.to_reqwest_proxy() {
        Ok(proxy) => proxy,
        Err(e) => {
            debug!("{}: unusable proxy: {}", candidate, e);
            return None;
        }
    };

    let client = match reqwest::Client::builder()
        .proxy(proxy)
        .connect_timeout(config.connect_timeout)
        .timeout(config.timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            debug!("{}: failed to build client: {}", candidate, e);
            return None;
        }
    };

    match client.get(&config.test_url).send().await {
        Ok(resp) if resp.status() == StatusCode::OK => Some(ValidatedProxy {
            candidate: candidate.clone(),
            latency: start.elapsed(),
        }),
        Ok(resp) => {
            debug!("{}: unexpected status {}", candidate, resp.status());
            None
        }
        Err(e) => {
            debug!("{}: {}", candidate, e);
            None
        }
    }
}
