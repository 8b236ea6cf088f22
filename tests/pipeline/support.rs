#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use gatehouse::{
    ack::{KvStore, StoreError, error::store_unavailable},
    audit::MemoryAuditSink,
    clock::ManualClock,
    intent::ClassificationError,
    lens::{EvidenceProvider, RetrievalError, SourceDocument, VerificationTier},
    pipeline::{GateSequencer, PersonalityContext, PersonalityPort, StyledText},
    provider::{Generation, GenerationRequest, LlmProvider, ProviderError, ProviderErrorKind},
    registry::{ServiceRegistry, ServiceRegistryBuilder},
    shield::{RiskClassification, RiskClassifier},
    types::ConversationContext,
};

pub const START_MS: i64 = 1_760_000_000_000;

/// Replays scripted outcomes in order, then repeats the fallback text.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(fallback: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then_text(self, text: &str) -> Self {
        self.script
            .lock()
            .expect("script lock")
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let next = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        next.map(|text| Generation {
            text,
            provider_id: "scripted".to_string(),
            model: "scripted-model".to_string(),
            tokens_used: Some(12),
            fallback_used: false,
        })
    }
}

pub struct DownProvider;

#[async_trait]
impl LlmProvider for DownProvider {
    fn id(&self) -> &str {
        "down"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, ProviderError> {
        Err(ProviderError::new(
            ProviderErrorKind::BackendPermanent,
            "upstream refused the request with a secret diagnostic",
        ))
    }
}

/// Never answers within any reasonable test timeout.
pub struct StalledProvider;

#[async_trait]
impl LlmProvider for StalledProvider {
    fn id(&self) -> &str {
        "stalled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Err(ProviderError::new(ProviderErrorKind::Timeout, "stalled"))
    }
}

pub struct SlowEvidence {
    pub id: String,
    pub delay: Duration,
}

#[async_trait]
impl EvidenceProvider for SlowEvidence {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(
        &self,
        _query: &str,
        _tier: VerificationTier,
        _timeout: Duration,
    ) -> Result<Vec<SourceDocument>, RetrievalError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![SourceDocument {
            url: format!("https://{}.example.org/quote", self.id),
            title: "quote".to_string(),
            snippet: "ACME last traded at 412.50".to_string(),
        }])
    }
}

pub struct FixedRisk(pub RiskClassification);

#[async_trait]
impl RiskClassifier for FixedRisk {
    async fn classify(
        &self,
        _message: &str,
        _context: &ConversationContext,
    ) -> Result<RiskClassification, ClassificationError> {
        Ok(self.0.clone())
    }
}

/// Personality that objects to every draft, forcing a regeneration each time.
#[derive(Default)]
pub struct AlwaysObjecting {
    pub calls: AtomicUsize,
}

impl PersonalityPort for AlwaysObjecting {
    fn style(&self, draft: &str, _context: &PersonalityContext) -> StyledText {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        StyledText {
            text: draft.to_string(),
            avoid_phrases: vec![format!("objection {call}")],
        }
    }
}

pub struct UnavailableStore;

#[async_trait]
impl KvStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(store_unavailable("connection refused"))
    }

    async fn set(
        &self,
        _key: &str,
        _value: String,
        _ttl_seconds: Option<u64>,
    ) -> Result<(), StoreError> {
        Err(store_unavailable("connection refused"))
    }

    async fn set_if_not_exists(
        &self,
        _key: &str,
        _value: String,
        _ttl_seconds: Option<u64>,
    ) -> Result<bool, StoreError> {
        Err(store_unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(store_unavailable("connection refused"))
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(store_unavailable("connection refused"))
    }

    async fn take(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(store_unavailable("connection refused"))
    }
}

pub struct Harness {
    pub sequencer: GateSequencer,
    pub audit: Arc<MemoryAuditSink>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn build(configure: impl FnOnce(ServiceRegistryBuilder) -> ServiceRegistryBuilder) -> Self {
        let audit = Arc::new(MemoryAuditSink::new());
        let clock = Arc::new(ManualClock::new(START_MS));
        let builder = ServiceRegistry::builder()
            .with_audit_sink(audit.clone())
            .with_clock(clock.clone());
        let services = configure(builder).build();
        Self {
            sequencer: GateSequencer::new(Arc::new(services)),
            audit,
            clock,
        }
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self::build(|builder| {
            builder
                .with_llm_providers(vec![provider])
                .with_mock_fallback(false)
        })
    }
}

pub fn contains_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Personality that slips a phone number into every styled draft.
#[derive(Default)]
pub struct AppendsFigure {
    pub calls: AtomicUsize,
}

impl PersonalityPort for AppendsFigure {
    fn style(&self, draft: &str, _context: &PersonalityContext) -> StyledText {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StyledText {
            text: format!("{draft} Ring our helpdesk on 5550100."),
            avoid_phrases: Vec::new(),
        }
    }
}
