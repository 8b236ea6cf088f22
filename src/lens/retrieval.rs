use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{StreamExt, stream::FuturesUnordered};
use reqwest::Url;

use crate::lens::{
    error::{RetrievalError, retrieval_timeout},
    types::{
        EvidenceItem, EvidencePack, LensConfig, ProviderFailureNote, RetrievalOutcome,
        SourceDocument, VerificationTier,
    },
};

#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn fetch(
        &self,
        query: &str,
        tier: VerificationTier,
        timeout: Duration,
    ) -> Result<Vec<SourceDocument>, RetrievalError>;
}

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub provider_timeout: Duration,
    pub global_timeout: Duration,
    pub max_items: usize,
    pub official_domains: Vec<String>,
}

impl From<&LensConfig> for RetrievalSettings {
    fn from(config: &LensConfig) -> Self {
        Self {
            provider_timeout: Duration::from_millis(config.provider_timeout_ms.max(1)),
            global_timeout: Duration::from_millis(config.global_timeout_ms.max(1)),
            max_items: config.max_evidence_items.max(1),
            official_domains: config
                .official_domains
                .iter()
                .map(|domain| domain.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

/// Gathers evidence across the configured providers for one query.
pub struct EvidenceRetriever {
    providers: Vec<Arc<dyn EvidenceProvider>>,
    settings: RetrievalSettings,
}

impl EvidenceRetriever {
    pub fn new(providers: Vec<Arc<dyn EvidenceProvider>>, settings: RetrievalSettings) -> Self {
        Self {
            providers,
            settings,
        }
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Medium tier: the primary provider, then the next one only if the primary fails.
    pub async fn retrieve_single(&self, query: &str) -> (RetrievalOutcome, EvidencePack) {
        let mut pack = EvidencePack::empty(query);
        let mut documents = Vec::new();

        for provider in self.providers.iter().take(2) {
            pack.providers_attempted.push(provider.id().to_string());
            let result = tokio::time::timeout(
                self.settings.provider_timeout,
                provider.fetch(query, VerificationTier::Medium, self.settings.provider_timeout),
            )
            .await
            .unwrap_or_else(|_| {
                Err(retrieval_timeout(
                    provider.id(),
                    self.settings.provider_timeout.as_millis() as u64,
                ))
            });

            match result {
                Ok(found) => {
                    pack.providers_succeeded.push(provider.id().to_string());
                    documents.push((provider.id().to_string(), found));
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        target: "lens",
                        provider_id = provider.id(),
                        error = %err,
                        "evidence_provider_failed"
                    );
                    pack.failures.push(ProviderFailureNote {
                        provider_id: provider.id().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let outcome = if pack.providers_succeeded.is_empty() {
            RetrievalOutcome::Failed
        } else {
            RetrievalOutcome::Ok
        };
        pack.items = self.normalize(documents);
        (outcome, pack)
    }

    /// High tier: every provider in parallel, each with its own timeout, under one global deadline.
    /// Results that arrive before the deadline are kept even if others never finish.
    pub async fn retrieve_fan_out(&self, query: &str) -> (RetrievalOutcome, EvidencePack) {
        let mut pack = EvidencePack::empty(query);
        let provider_timeout = self.settings.provider_timeout;
        let mut pending = FuturesUnordered::new();
        for provider in &self.providers {
            pack.providers_attempted.push(provider.id().to_string());
            let provider = Arc::clone(provider);
            let query = query.to_string();
            pending.push(async move {
                let result = tokio::time::timeout(
                    provider_timeout,
                    provider.fetch(&query, VerificationTier::High, provider_timeout),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(retrieval_timeout(
                        provider.id(),
                        provider_timeout.as_millis() as u64,
                    ))
                });
                (provider.id().to_string(), result)
            });
        }

        let deadline = tokio::time::sleep(self.settings.global_timeout);
        tokio::pin!(deadline);
        let mut documents = Vec::new();
        let mut finished = HashSet::new();

        loop {
            tokio::select! {
                next = pending.next() => {
                    let Some((provider_id, result)) = next else {
                        break;
                    };
                    finished.insert(provider_id.clone());
                    match result {
                        Ok(found) => {
                            pack.providers_succeeded.push(provider_id.clone());
                            documents.push((provider_id, found));
                        }
                        Err(err) => {
                            tracing::warn!(
                                target: "lens",
                                provider_id = %provider_id,
                                error = %err,
                                "evidence_provider_failed"
                            );
                            pack.failures.push(ProviderFailureNote {
                                provider_id,
                                reason: err.to_string(),
                            });
                        }
                    }
                }
                _ = &mut deadline => {
                    tracing::warn!(
                        target: "lens",
                        pending = pending.len(),
                        "evidence_global_deadline_reached"
                    );
                    break;
                }
            }
        }

        for provider_id in &pack.providers_attempted {
            if !finished.contains(provider_id) {
                pack.failures.push(ProviderFailureNote {
                    provider_id: provider_id.clone(),
                    reason: "global retrieval deadline reached".to_string(),
                });
            }
        }

        let outcome = if pack.providers_succeeded.is_empty() {
            RetrievalOutcome::Failed
        } else if pack.providers_succeeded.len() < pack.providers_attempted.len() {
            RetrievalOutcome::Partial
        } else {
            RetrievalOutcome::Ok
        };
        pack.items = self.normalize(documents);
        (outcome, pack)
    }

    fn normalize(&self, documents: Vec<(String, Vec<SourceDocument>)>) -> Vec<EvidenceItem> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for (provider_id, found) in documents {
            for document in found {
                let Some(source_domain) = source_domain(&document.url) else {
                    tracing::debug!(target: "lens", url = %document.url, "evidence_url_rejected");
                    continue;
                };
                if !seen.insert(dedup_key(&document.url)) {
                    continue;
                }
                items.push(EvidenceItem {
                    official: is_official_domain(&source_domain, &self.settings.official_domains),
                    url: document.url,
                    title: document.title,
                    snippet: document.snippet,
                    source_domain,
                    provider_id: provider_id.clone(),
                });
                if items.len() >= self.settings.max_items {
                    return items;
                }
            }
        }
        items
    }
}

pub fn source_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn dedup_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
            format!("{}{}", host, parsed.path().trim_end_matches('/'))
        }
        Err(_) => url.trim().to_ascii_lowercase(),
    }
}

pub fn is_official_domain(source_domain: &str, configured: &[String]) -> bool {
    const OFFICIAL_SUFFIXES: [&str; 4] = [".gov", ".mil", ".int", ".edu"];
    if OFFICIAL_SUFFIXES
        .iter()
        .any(|suffix| source_domain.ends_with(suffix))
    {
        return true;
    }
    configured.iter().any(|domain| {
        source_domain == domain || source_domain.ends_with(&format!(".{domain}"))
    })
}
