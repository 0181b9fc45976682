use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com/";
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60 * 24;
pub const DEFAULT_CAROUSEL_SECS: u64 = 6;
const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub retry: RetryPolicy,
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub session_ttl: chrono::Duration,
    pub carousel_interval: Duration,
}

/// Fixed-delay retry: no growth, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OMDB_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .context("OMDB_API_KEY not set")?;
        let base_url = env::var("OMDB_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let attempts: u32 = parse_or("OMDB_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS);
        let delay_ms: u64 = parse_or("OMDB_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS);
        let retry = RetryPolicy {
            attempts: attempts.clamp(1, MAX_RETRY_ATTEMPTS),
            delay: Duration::from_millis(delay_ms),
        };

        let data_dir = env::var("CINESCOPE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let bind: SocketAddr = parse_or(
            "CINESCOPE_BIND",
            SocketAddr::from(([0, 0, 0, 0], 3146)),
        );
        let ttl_secs: i64 = parse_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS);
        let carousel_secs: u64 = parse_or("CAROUSEL_INTERVAL_SECS", DEFAULT_CAROUSEL_SECS);

        Ok(Self {
            api_key,
            base_url,
            retry,
            data_dir,
            bind,
            session_ttl: session_ttl_from_secs(ttl_secs),
            carousel_interval: Duration::from_secs(carousel_secs.max(1)),
        })
    }
}

/// Out-of-range values fall back to the default instead of overflowing.
fn session_ttl_from_secs(secs: i64) -> chrono::Duration {
    chrono::Duration::try_seconds(secs.max(1)).unwrap_or_else(|| {
        warn!(
            "SESSION_TTL_SECS={} is out of range, using {}",
            secs, DEFAULT_SESSION_TTL_SECS
        );
        chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS)
    })
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!("Ignoring unparseable {}={:?}, using {:?}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_policy_is_three_attempts_one_second_apart() {
        let p = RetryPolicy::default();
        assert_eq!(p.attempts, 3);
        assert_eq!(p.delay, Duration::from_secs(1));
    }

    #[test]
    fn session_ttl_is_clamped_and_never_overflows() {
        assert_eq!(session_ttl_from_secs(90), chrono::Duration::seconds(90));
        assert_eq!(session_ttl_from_secs(-5), chrono::Duration::seconds(1));
        assert_eq!(session_ttl_from_secs(i64::MAX), chrono::Duration::hours(24));
    }

    #[test]
    fn parse_or_falls_back_on_garbage() {
        env::set_var("CINESCOPE_TEST_PARSE_OR", "not-a-number");
        let v: u64 = parse_or("CINESCOPE_TEST_PARSE_OR", 42);
        assert_eq!(v, 42);
        env::set_var("CINESCOPE_TEST_PARSE_OR", " 7 ");
        let v: u64 = parse_or("CINESCOPE_TEST_PARSE_OR", 42);
        assert_eq!(v, 7);
        env::remove_var("CINESCOPE_TEST_PARSE_OR");
    }
}
