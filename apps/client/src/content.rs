//! Vocabulary content download with an offline cache.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use wortschatz_core::types::VocabularyItem;

use crate::db::{CachedVocabulary, ContentRepository, DbError, LocalRepository, SharedRepository};
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("vocabulary unavailable: {0}, and no cached copy exists")]
    Unavailable(String),

    #[error("http client error: {0}")]
    Client(String),

    #[error("local storage error: {0}")]
    Local(#[from] DbError),
}

/// Where a vocabulary list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    Network,
    Cache,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vocabulary {
    pub items: Vec<VocabularyItem>,
    pub origin: ContentOrigin,
    pub fetched_at: DateTime<Utc>,
}

/// Fetches the vocabulary list and keeps the last good copy locally.
pub struct ContentSource {
    client: Client,
    url: String,
    repo: SharedRepository,
}

impl ContentSource {
    pub fn new(
        repo: SharedRepository,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ContentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ContentError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            repo,
        })
    }

    /// Download the vocabulary, falling back to the cached copy on failure.
    pub async fn fetch_vocabulary(&self) -> Result<Vocabulary, ContentError> {
        let failure = match self.download().await {
            Ok(payload) => match serde_json::from_str::<Vec<VocabularyItem>>(&payload) {
                Ok(items) => {
                    let fetched_at = Utc::now();
                    self.store_cache(payload, fetched_at);
                    tracing::info!(items = items.len(), "downloaded vocabulary");
                    return Ok(Vocabulary {
                        items,
                        origin: ContentOrigin::Network,
                        fetched_at,
                    });
                }
                Err(e) => format!("invalid vocabulary payload: {}", e),
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!(error = %failure, "vocabulary download failed, trying cache");
        self.load_cache(failure)
    }

    async fn download(&self) -> Result<String, RemoteError> {
        let resp = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout
            } else {
                RemoteError::Network(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Backend { status, message });
        }

        resp.text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))
    }

    fn store_cache(&self, payload: String, fetched_at: DateTime<Utc>) {
        let cache = CachedVocabulary {
            sha256: hash_content(&payload),
            payload,
            fetched_at,
        };
        let saved = LocalRepository::lock(&self.repo)
            .and_then(|repo| repo.save_cached_vocabulary(&cache));
        if let Err(e) = saved {
            tracing::warn!(error = %e, "failed to cache vocabulary");
        }
    }

    fn load_cache(&self, failure: String) -> Result<Vocabulary, ContentError> {
        let cached = LocalRepository::lock(&self.repo)?.load_cached_vocabulary()?;
        let Some(cache) = cached else {
            return Err(ContentError::Unavailable(failure));
        };

        if hash_content(&cache.payload) != cache.sha256 {
            tracing::warn!("cached vocabulary digest mismatch, ignoring cache");
            return Err(ContentError::Unavailable(failure));
        }

        match serde_json::from_str::<Vec<VocabularyItem>>(&cache.payload) {
            Ok(items) => Ok(Vocabulary {
                items,
                origin: ContentOrigin::Cache,
                fetched_at: cache.fetched_at,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "cached vocabulary unreadable");
                Err(ContentError::Unavailable(failure))
            }
        }
    }
}

/// Calculate SHA256 hash of content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
