//! Rate-limited backend wrapper.
//!
//! Wraps any `LanguageModel` or `Classifier` with a shared governor limiter,
//! so concurrent relation queries never exceed the provider's quota.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use indexmap::IndexMap;
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{ConfigError, Result};
use crate::traits::classifier::{Classification, ClassificationRequest, Classifier};
use crate::traits::model::{GenerationRequest, LanguageModel, Message};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Default sustained rate (requests per second).
pub const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = nonzero!(5u32);

/// A backend wrapper that enforces rate limits.
pub struct RateLimited<T> {
    inner: T,
    limiter: Arc<DefaultRateLimiter>,
}

impl<T> RateLimited<T> {
    /// Wrap `inner` with a limit of `requests_per_second`.
    pub fn new(inner: T, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(inner, Quota::per_second(requests_per_second))
    }

    /// Like [`RateLimited::new`], rejecting a zero rate.
    pub fn per_second(inner: T, requests_per_second: u32) -> Result<Self> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            ConfigError::Invalid("requests_per_second must be > 0".into())
        })?;
        Ok(Self::new(inner, rate))
    }

    /// Wrap with a custom quota (e.g. with burst).
    pub fn with_quota(inner: T, quota: Quota) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<T: LanguageModel> LanguageModel for RateLimited<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.wait_for_permit().await;
        self.inner.generate(request).await
    }

    async fn label_probs(
        &self,
        messages: &[Message],
        labels: &[String],
    ) -> Result<IndexMap<String, f64>> {
        self.wait_for_permit().await;
        self.inner.label_probs(messages, labels).await
    }
}

#[async_trait]
impl<T: Classifier> Classifier for RateLimited<T> {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Vec<Option<Classification>>> {
        self.wait_for_permit().await;
        self.inner.classify(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::classifier::MockClassifier;
    use crate::traits::model::MockLanguageModel;

    #[tokio::test]
    async fn test_calls_pass_through() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .times(2)
            .returning(|_| Ok("answer".to_string()));
        let limited = RateLimited::new(model, nonzero!(100u32));

        let request = GenerationRequest::new(vec![Message::user("x")]);
        assert_eq!(limited.generate(&request).await.unwrap(), "answer");
        assert_eq!(limited.generate(&request).await.unwrap(), "answer");
    }

    #[tokio::test]
    async fn test_classifier_pass_through() {
        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify()
            .times(1)
            .returning(|req| Ok(vec![None; req.premises.len()]));
        let limited = RateLimited::new(classifier, DEFAULT_REQUESTS_PER_SECOND);

        let request = ClassificationRequest::new(vec!["p".into()], "{}", vec!["a".into()]);
        assert_eq!(limited.classify(&request).await.unwrap(), vec![None]);
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        assert!(RateLimited::per_second((), 0).is_err());
        assert!(RateLimited::per_second((), 3).is_ok());
    }
}
