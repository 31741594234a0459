//! Bounded retry with exponential backoff for backend calls.

use std::future::Future;
use tracing::warn;

use crate::error::Result;
use crate::types::config::RetryPolicy;

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// Only transient backend errors are retried.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient backend failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgmapError, BackendError};
    use crate::traits::model::{GenerationRequest, LanguageModel, Message, MockLanguageModel};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut model = MockLanguageModel::new();
        let counter = calls.clone();
        model.expect_generate().times(3).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(BackendError::Timeout.into())
            } else {
                Ok("done".to_string())
            }
        });

        let request = GenerationRequest::new(vec![Message::user("hi")]);
        let out = with_retry(&RetryPolicy::immediate(3), "generate", || model.generate(&request))
            .await
            .unwrap();
        assert_eq!(out, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .times(2)
            .returning(|_| Err(BackendError::RateLimited.into()));

        let request = GenerationRequest::new(vec![Message::user("hi")]);
        let err = with_retry(&RetryPolicy::immediate(2), "generate", || model.generate(&request))
            .await
            .unwrap_err();
        assert!(matches!(err, ArgmapError::Backend(BackendError::RateLimited)));
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .times(1)
            .returning(|_| Err(BackendError::InvalidResponse("bad".into()).into()));

        let request = GenerationRequest::new(vec![Message::user("hi")]);
        let result = with_retry(&RetryPolicy::immediate(5), "generate", || model.generate(&request)).await;
        assert!(result.is_err());
    }
}
