use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

const BACKOFF_LADDER_MS: [u64; 4] = [250, 500, 1_000, 2_000];

/// Transport settings shared by every outbound adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) max_attempts: u32,
}

impl RetryPolicy {
    pub(crate) fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub(crate) fn backoff(attempt: u32) -> Duration {
        let index = (attempt.saturating_sub(1) as usize).min(BACKOFF_LADDER_MS.len() - 1);
        Duration::from_millis(BACKOFF_LADDER_MS[index])
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("dscr-scout/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub(crate) fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send the request built by `build`, retrying transport errors, 429 and 5xx.
///
/// The final response is returned as-is once attempts run out, so callers still see the
/// last status code.
pub(crate) async fn send_with_retry<F>(
    policy: RetryPolicy,
    label: &str,
    build: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 1;
    loop {
        let last = attempt >= policy.max_attempts;
        match build().send().await {
            Ok(response) if is_retryable(response.status()) && !last => {
                warn!(
                    adapter = label,
                    status = response.status().as_u16(),
                    attempt,
                    "retryable status"
                );
            }
            Ok(response) => {
                debug!(adapter = label, status = response.status().as_u16(), attempt, "response");
                return Ok(response);
            }
            Err(err) if !last => {
                warn!(adapter = label, error = %err, attempt, "transport error");
            }
            Err(err) => return Err(err),
        }
        tokio::time::sleep(RetryPolicy::backoff(attempt)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_follows_ladder_then_caps() {
        let delays: Vec<u64> = (1..=6)
            .map(|attempt| RetryPolicy::backoff(attempt).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![250, 500, 1_000, 2_000, 2_000, 2_000]);
    }

    #[test]
    fn only_throttling_and_server_errors_retry() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn policy_always_allows_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::new(3).max_attempts, 3);
    }
}
