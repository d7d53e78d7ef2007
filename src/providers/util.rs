use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async request with a fixed delay between attempts
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay`: Pause between attempts
///
/// # Returns
/// Either the successful result or the error of the last attempt
pub async fn with_retry<F, Fut, T>(mut operation: F, retries: usize, delay: Duration) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if attempt > retries => return Err(err.into()),
            Err(err) => {
                debug!(attempt, retries, error = %err, "Request failed, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let calls = AtomicUsize::new(0);
        let client = reqwest::Client::new();

        // Nothing listens on port 9 of the loopback interface.
        let result = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                client.get("http://127.0.0.1:9/").send()
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
