use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::provider::{
    error::{ProviderError, ProviderErrorKind},
    ports::LlmProvider,
    types::{Generation, GenerationRequest, ProviderId, ReliabilityConfig},
};

/// Per-provider circuit breaker plus retry backoff.
#[derive(Clone)]
pub struct ReliabilityLayer {
    config: ReliabilityConfig,
    breakers: Arc<Mutex<HashMap<ProviderId, BreakerState>>>,
}

#[derive(Debug, Clone, Default)]
struct BreakerState {
    failure_streak: u32,
    open_until: Option<Instant>,
    probe_in_flight: bool,
}

impl ReliabilityLayer {
    pub fn new(config: ReliabilityConfig) -> Self {
        Self {
            config,
            breakers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ReliabilityConfig {
        &self.config
    }

    pub async fn ensure_allowed(&self, provider_id: &str) -> Result<(), ProviderError> {
        let now = Instant::now();
        let mut guard = self.breakers.lock().await;
        let state = guard.entry(provider_id.to_string()).or_default();

        if let Some(open_until) = state.open_until {
            if now < open_until {
                return Err(ProviderError::new(
                    ProviderErrorKind::CircuitOpen,
                    format!("circuit breaker is open for provider '{provider_id}'"),
                )
                .with_retryable(false)
                .with_provider_id(provider_id));
            }
            if state.probe_in_flight {
                return Err(ProviderError::new(
                    ProviderErrorKind::CircuitOpen,
                    format!("circuit probe is already in-flight for provider '{provider_id}'"),
                )
                .with_retryable(false)
                .with_provider_id(provider_id));
            }
            state.probe_in_flight = true;
        }
        Ok(())
    }

    pub async fn record_success(&self, provider_id: &str) {
        let mut guard = self.breakers.lock().await;
        let state = guard.entry(provider_id.to_string()).or_default();
        state.failure_streak = 0;
        state.open_until = None;
        state.probe_in_flight = false;
    }

    pub async fn record_failure(&self, provider_id: &str, count_toward_breaker: bool) {
        let mut guard = self.breakers.lock().await;
        let state = guard.entry(provider_id.to_string()).or_default();
        state.probe_in_flight = false;
        if !count_toward_breaker {
            return;
        }

        state.failure_streak = state.failure_streak.saturating_add(1);
        if state.failure_streak >= self.config.breaker_failure_threshold.max(1) {
            state.open_until =
                Some(Instant::now() + Duration::from_millis(self.config.breaker_open_ms.max(1)));
        }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base_ms.max(1) as f64;
        let max = self.config.backoff_max_ms.max(1) as f64;
        let exp = (attempt as i32).max(0);
        let without_jitter = (base * 2f64.powi(exp)).min(max);
        let jitter_factor = 0.9 + (attempt as f64 % 3.0) * 0.05;
        Duration::from_millis((without_jitter * jitter_factor) as u64)
    }

    pub fn can_retry(&self, err: &ProviderError, attempt: u32) -> bool {
        err.retryable && attempt < self.config.max_retries
    }

    pub fn counts_toward_breaker(err: &ProviderError) -> bool {
        matches!(
            err.kind,
            ProviderErrorKind::BackendTransient
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::RateLimited
        )
    }
}

/// Wraps a provider with timeout, retry and the shared circuit breaker.
pub struct ReliableProvider {
    inner: Arc<dyn LlmProvider>,
    reliability: ReliabilityLayer,
}

impl ReliableProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, reliability: ReliabilityLayer) -> Self {
        Self { inner, reliability }
    }
}

#[async_trait]
impl LlmProvider for ReliableProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let provider_id = self.inner.id().to_string();
        let timeout = Duration::from_millis(self.reliability.config().request_timeout_ms.max(1));
        let mut attempt = 0u32;

        loop {
            self.reliability.ensure_allowed(&provider_id).await?;
            let result = tokio::time::timeout(timeout, self.inner.generate(request))
                .await
                .unwrap_or_else(|_| {
                    Err(ProviderError::new(
                        ProviderErrorKind::Timeout,
                        format!("provider timed out after {}ms", timeout.as_millis()),
                    )
                    .with_provider_id(provider_id.clone()))
                });

            match result {
                Ok(generation) => {
                    self.reliability.record_success(&provider_id).await;
                    return Ok(generation);
                }
                Err(err) => {
                    self.reliability
                        .record_failure(&provider_id, ReliabilityLayer::counts_toward_breaker(&err))
                        .await;
                    if !self.reliability.can_retry(&err, attempt) {
                        return Err(err);
                    }
                    let delay = self.reliability.backoff_delay(attempt);
                    tracing::warn!(
                        target: "provider",
                        provider_id = %provider_id,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "provider_attempt_failed_retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
