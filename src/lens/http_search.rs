use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;

use crate::{
    lens::{
        error::{RetrievalError, RetrievalErrorKind},
        retrieval::EvidenceProvider,
        types::{EvidenceProviderConfig, SourceDocument, VerificationTier},
    },
    provider::CredentialProvider,
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "content", alias = "description")]
    snippet: String,
}

/// Evidence provider backed by a JSON search endpoint returning `{"results": [{url, title, snippet}]}`.
pub struct HttpSearchProvider {
    client: Client,
    config: EvidenceProviderConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpSearchProvider {
    pub fn new(config: EvidenceProviderConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client must build"),
            config,
            credentials,
        }
    }
}

fn max_results(tier: VerificationTier) -> u32 {
    match tier {
        VerificationTier::Low => 0,
        VerificationTier::Medium => 5,
        VerificationTier::High => 8,
    }
}

#[async_trait]
impl EvidenceProvider for HttpSearchProvider {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn fetch(
        &self,
        query: &str,
        tier: VerificationTier,
        timeout: Duration,
    ) -> Result<Vec<SourceDocument>, RetrievalError> {
        let credential = self
            .credentials
            .resolve(&self.config.credential, &self.config.id)
            .await
            .map_err(|err| {
                RetrievalError::new(RetrievalErrorKind::Authentication, err.message)
                    .with_provider_id(self.config.id.clone())
            })?;

        let mut builder = self
            .client
            .get(&self.config.endpoint)
            .timeout(timeout)
            .header(header::ACCEPT, "application/json")
            .query(&[("q", query.to_string()), ("limit", max_results(tier).to_string())]);
        if let Some(auth_header) = credential.auth_header {
            builder = builder.header(header::AUTHORIZATION, auth_header);
        }
        for (key, value) in credential.extra_headers {
            builder = builder.header(key, value);
        }

        let response = builder.send().await.map_err(|err| {
            let kind = if err.is_timeout() {
                RetrievalErrorKind::Timeout
            } else {
                RetrievalErrorKind::Unavailable
            };
            RetrievalError::new(kind, format!("search request failed: {err}"))
                .with_provider_id(self.config.id.clone())
        })?;

        let status = response.status();
        if !status.is_success() {
            let kind = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    RetrievalErrorKind::Authentication
                }
                StatusCode::TOO_MANY_REQUESTS => RetrievalErrorKind::RateLimited,
                _ => RetrievalErrorKind::Unavailable,
            };
            return Err(RetrievalError::new(
                kind,
                format!("search provider returned status {}", status.as_u16()),
            )
            .with_provider_id(self.config.id.clone()));
        }

        let payload = response.json::<SearchResponse>().await.map_err(|err| {
            RetrievalError::new(
                RetrievalErrorKind::ProtocolViolation,
                format!("search response decode failed: {err}"),
            )
            .with_provider_id(self.config.id.clone())
        })?;

        Ok(payload
            .results
            .into_iter()
            .map(|hit| SourceDocument {
                url: hit.url,
                title: hit.title,
                snippet: hit.snippet,
            })
            .collect())
    }
}
