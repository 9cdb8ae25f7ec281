//! Validate a local list of SOCKS5 candidates without touching FOFA or v2ray.
//!
//! ```text
//! cargo run --example validate_file -- proxies.txt
//! ```

use socks_hunter::{CandidateSource, StaticSource, ValidatedOrder, Validator, ValidatorConfig};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "proxies.txt".to_string())
        .into();

    let source = StaticSource::from_file(&path).await?;
    let candidates = source.fetch(source.total_count().await?).await?;
    println!("Checking {} candidates from {}...", candidates.len(), path.display());

    let config = ValidatorConfig::builder()
        .test_url("https://httpbin.org/ip")
        .connect_timeout(Duration::from_secs(3))
        .timeout(Duration::from_secs(8))
        // be gentle with the test endpoint
        .max_concurrency(200)
        .probes_per_second(50.0)
        .order(ValidatedOrder::Fastest)
        .build();

    let validated = Validator::new(config).validate(candidates).await;

    for proxy in &validated {
        println!("{:>6} ms  {}", proxy.latency.as_millis(), proxy);
    }
    println!("{} available", validated.len());

    Ok(())
}
