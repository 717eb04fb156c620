use std::net::Ipv4Addr;
use std::time::Duration;

use sysinfo::System;

/// Timeout applied to every outbound HTTP request (sinks and webhooks).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert a byte count to gigabytes (1024³), rounded to two decimals.
pub fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GB)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / total` as a percentage; `0.0` for an empty total.
pub fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

pub fn hostname() -> String {
    System::host_name().unwrap_or_else(|| String::from("unknown"))
}

pub fn http_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?)
}

const INGEST_PORT: &str = "INGEST_PORT";

const DEFAULT_PORT: u16 = 8000;

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(INGEST_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const INGEST_ADDR: &str = "INGEST_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(INGEST_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

const INGEST_API_KEY: &str = "INGEST_API_KEY";

pub fn get_api_key() -> Option<String> {
    std::env::var(INGEST_API_KEY)
        .ok()
        .filter(|key| !key.is_empty())
}
