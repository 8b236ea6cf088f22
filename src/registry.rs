use std::{collections::HashSet, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    ack::{AckStoreConfig, AckTokenManager, InMemoryKvStore, KvStore},
    audit::{AuditBuilder, AuditSink, PolicyVersions, TracingAuditSink},
    capability::CapabilityChecker,
    clock::{Clock, SystemClock},
    config::Config,
    intent::{IntentClassifier, KeywordIntentClassifier},
    invariant::InvariantEvaluator,
    lens::{
        ClaimExtractor, EvidenceProvider, EvidenceRetriever, HttpSearchProvider,
        LensClassifierAssist, LensConfig, LensRiskClassifier, LlmLensAssist, RetrievalSettings,
        TieredVerifier,
    },
    pipeline::{
        error::ServiceError,
        gates::{PersonaStyler, PersonalityPort},
    },
    provider::{
        CredentialProvider, EnvCredentialProvider, FallbackGenerator, LlmProvider,
        OpenAiCompatibleProvider, ReliabilityLayer, ReliableProvider,
    },
    shield::{PatternRiskClassifier, RiskAssessor, RiskClassifier, ShieldConfig},
};

fn default_enabled_true() -> bool {
    true
}

/// Optional behaviour resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    #[serde(default = "default_enabled_true")]
    pub web_retrieval: bool,
    #[serde(default)]
    pub llm_assisted_lens: bool,
    #[serde(default = "default_enabled_true")]
    pub spark: bool,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            web_retrieval: true,
            llm_assisted_lens: false,
            spark: true,
        }
    }
}

fn default_max_regenerations() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_regenerations")]
    pub max_regenerations: u32,
    #[serde(default)]
    pub debug_trace: bool,
    #[serde(default)]
    pub policy_versions: PolicyVersions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_regenerations: default_max_regenerations(),
            debug_trace: false,
            policy_versions: PolicyVersions::default(),
        }
    }
}

/// Every collaborator the sequencer needs, built once per process and shared by `Arc`.
pub struct ServiceRegistry {
    pub(crate) intent_classifier: Arc<dyn IntentClassifier>,
    pub(crate) risk_assessor: RiskAssessor,
    pub(crate) verifier: TieredVerifier,
    pub(crate) capability_checker: CapabilityChecker,
    pub(crate) generator: FallbackGenerator,
    pub(crate) personality: Arc<dyn PersonalityPort>,
    pub(crate) invariants: InvariantEvaluator,
    pub(crate) ack_manager: AckTokenManager,
    pub(crate) audit_builder: AuditBuilder,
    pub(crate) audit_sink: Arc<dyn AuditSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) flags: CapabilityFlags,
    pub(crate) pipeline: PipelineConfig,
}

impl ServiceRegistry {
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::default()
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let credentials: Arc<dyn CredentialProvider> = Arc::new(EnvCredentialProvider);

        let mut seen = HashSet::new();
        let mut llm_providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
        for backend in &config.providers.backends {
            if !seen.insert(backend.id.as_str()) {
                return Err(ServiceError::Config(format!(
                    "duplicate provider backend id '{}'",
                    backend.id
                )));
            }
            reqwest::Url::parse(&backend.endpoint).map_err(|err| {
                ServiceError::Config(format!(
                    "provider backend '{}' has an invalid endpoint: {err}",
                    backend.id
                ))
            })?;
            let adapter = OpenAiCompatibleProvider::new(backend.clone(), credentials.clone());
            llm_providers.push(Arc::new(ReliableProvider::new(
                Arc::new(adapter),
                ReliabilityLayer::new(config.providers.reliability.clone()),
            )));
        }

        let mut seen = HashSet::new();
        let mut evidence_providers: Vec<Arc<dyn EvidenceProvider>> = Vec::new();
        for provider in &config.lens.evidence_providers {
            if !seen.insert(provider.id.as_str()) {
                return Err(ServiceError::Config(format!(
                    "duplicate evidence provider id '{}'",
                    provider.id
                )));
            }
            reqwest::Url::parse(&provider.endpoint).map_err(|err| {
                ServiceError::Config(format!(
                    "evidence provider '{}' has an invalid endpoint: {err}",
                    provider.id
                ))
            })?;
            evidence_providers.push(Arc::new(HttpSearchProvider::new(
                provider.clone(),
                credentials.clone(),
            )));
        }

        let mut builder = Self::builder()
            .with_shield_config(config.shield.clone())
            .with_lens_config(config.lens.clone())
            .with_ack_store_config(config.ack_store.clone())
            .with_pipeline_config(config.pipeline.clone())
            .with_flags(config.features)
            .with_mock_fallback(config.providers.mock_fallback)
            .with_evidence_providers(evidence_providers);
        if let Some(primary) = llm_providers.first() {
            builder = builder.with_lens_assist(Arc::new(LlmLensAssist::new(primary.clone())));
        }
        Ok(builder.with_llm_providers(llm_providers).build())
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn shield_config(&self) -> &ShieldConfig {
        self.risk_assessor.config()
    }

    pub fn ack_manager(&self) -> &AckTokenManager {
        &self.ack_manager
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// Defaults are the in-process ones: keyword and pattern classifiers, memory store, tracing audit sink.
pub struct ServiceRegistryBuilder {
    intent_classifier: Option<Arc<dyn IntentClassifier>>,
    risk_classifier: Option<Arc<dyn RiskClassifier>>,
    shield: ShieldConfig,
    lens: LensConfig,
    lens_assist: Option<Arc<dyn LensClassifierAssist>>,
    claim_extractor: Option<Arc<dyn ClaimExtractor>>,
    evidence_providers: Vec<Arc<dyn EvidenceProvider>>,
    llm_providers: Vec<Arc<dyn LlmProvider>>,
    mock_fallback: bool,
    personality: Option<Arc<dyn PersonalityPort>>,
    invariants: Option<InvariantEvaluator>,
    kv_store: Option<Arc<dyn KvStore>>,
    ack_store: AckStoreConfig,
    audit_sink: Option<Arc<dyn AuditSink>>,
    clock: Option<Arc<dyn Clock>>,
    flags: CapabilityFlags,
    pipeline: PipelineConfig,
}

impl Default for ServiceRegistryBuilder {
    fn default() -> Self {
        Self {
            intent_classifier: None,
            risk_classifier: None,
            shield: ShieldConfig::default(),
            lens: LensConfig::default(),
            lens_assist: None,
            claim_extractor: None,
            evidence_providers: Vec::new(),
            llm_providers: Vec::new(),
            mock_fallback: true,
            personality: None,
            invariants: None,
            kv_store: None,
            ack_store: AckStoreConfig::default(),
            audit_sink: None,
            clock: None,
            flags: CapabilityFlags::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServiceRegistryBuilder {
    pub fn with_intent_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.intent_classifier = Some(classifier);
        self
    }

    pub fn with_risk_classifier(mut self, classifier: Arc<dyn RiskClassifier>) -> Self {
        self.risk_classifier = Some(classifier);
        self
    }

    pub fn with_shield_config(mut self, config: ShieldConfig) -> Self {
        self.shield = config;
        self
    }

    pub fn with_lens_config(mut self, config: LensConfig) -> Self {
        self.lens = config;
        self
    }

    pub fn with_lens_assist(mut self, assist: Arc<dyn LensClassifierAssist>) -> Self {
        self.lens_assist = Some(assist);
        self
    }

    pub fn with_claim_extractor(mut self, extractor: Arc<dyn ClaimExtractor>) -> Self {
        self.claim_extractor = Some(extractor);
        self
    }

    pub fn with_evidence_providers(mut self, providers: Vec<Arc<dyn EvidenceProvider>>) -> Self {
        self.evidence_providers = providers;
        self
    }

    pub fn with_llm_providers(mut self, providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        self.llm_providers = providers;
        self
    }

    pub fn with_mock_fallback(mut self, enabled: bool) -> Self {
        self.mock_fallback = enabled;
        self
    }

    pub fn with_personality(mut self, personality: Arc<dyn PersonalityPort>) -> Self {
        self.personality = Some(personality);
        self
    }

    pub fn with_invariants(mut self, evaluator: InvariantEvaluator) -> Self {
        self.invariants = Some(evaluator);
        self
    }

    pub fn with_kv_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.kv_store = Some(store);
        self
    }

    pub fn with_ack_store_config(mut self, config: AckStoreConfig) -> Self {
        self.ack_store = config;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_flags(mut self, flags: CapabilityFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    pub fn build(self) -> ServiceRegistry {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let kv_store = self
            .kv_store
            .unwrap_or_else(|| Arc::new(InMemoryKvStore::new(clock.clone())));
        let risk_classifier = self.risk_classifier.unwrap_or_else(|| {
            Arc::new(PatternRiskClassifier::new(self.shield.context_window_turns))
        });

        let assist = if self.flags.llm_assisted_lens {
            self.lens_assist
        } else {
            None
        };
        let lens_classifier =
            LensRiskClassifier::new(assist, self.lens.llm_assist_confidence_threshold);
        let retriever = EvidenceRetriever::new(
            self.evidence_providers,
            RetrievalSettings::from(&self.lens),
        );
        let mut verifier = TieredVerifier::new(lens_classifier, retriever, self.lens)
            .with_retrieval_enabled(self.flags.web_retrieval);
        if let Some(extractor) = self.claim_extractor {
            verifier = verifier.with_claim_extractor(extractor);
        }

        tracing::info!(
            target: "pipeline",
            llm_providers = self.llm_providers.len(),
            mock_fallback = self.mock_fallback,
            web_retrieval = self.flags.web_retrieval,
            llm_assisted_lens = self.flags.llm_assisted_lens,
            spark = self.flags.spark,
            max_regenerations = self.pipeline.max_regenerations,
            "service_registry_built"
        );

        ServiceRegistry {
            intent_classifier: self
                .intent_classifier
                .unwrap_or_else(|| Arc::new(KeywordIntentClassifier)),
            risk_assessor: RiskAssessor::new(risk_classifier, self.shield),
            verifier,
            capability_checker: CapabilityChecker,
            generator: FallbackGenerator::new(self.llm_providers, self.mock_fallback),
            personality: self
                .personality
                .unwrap_or_else(|| Arc::new(PersonaStyler::default())),
            invariants: self.invariants.unwrap_or_default(),
            ack_manager: AckTokenManager::new(kv_store, clock.clone(), self.ack_store),
            audit_builder: AuditBuilder::new(self.pipeline.policy_versions.clone(), clock.clone()),
            audit_sink: self
                .audit_sink
                .unwrap_or_else(|| Arc::new(TracingAuditSink)),
            clock,
            flags: self.flags,
            pipeline: self.pipeline,
        }
    }
}
