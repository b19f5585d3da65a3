//! Appwrite-style REST document store.
//!
//! Each account owns one document in a collection. The snapshot travels as
//! a JSON string in the `progress` attribute:
//!
//! ```text
//! GET   {endpoint}/databases/{db}/collections/{col}/documents/{id}
//! POST  {endpoint}/databases/{db}/collections/{col}/documents   {"documentId", "data"}
//! PATCH {endpoint}/databases/{db}/collections/{col}/documents/{id}   {"data"}
//! ```

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use wortschatz_core::types::{AccountSnapshot, SnapshotPatch};

use super::{DocumentStore, RemoteError};
use crate::config::RemoteConfig;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";

#[derive(Debug, Serialize, Deserialize)]
struct DocumentData {
    progress: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocumentRequest<'a> {
    document_id: &'a str,
    data: DocumentData,
}

#[derive(Debug, Serialize)]
struct UpdateDocumentRequest {
    data: DocumentData,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    progress: Option<String>,
}

/// HTTP client for the account progress collection.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    documents_url: Url,
    project_id: String,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            RemoteError::Network(format!("invalid endpoint {}: {}", config.endpoint, e))
        })?;
        let documents_url = with_segments(
            &endpoint,
            &[
                "databases",
                &config.database_id,
                "collections",
                &config.collection_id,
                "documents",
            ],
        )?;

        Ok(Self {
            client,
            documents_url,
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(PROJECT_HEADER, &self.project_id);
        match &self.api_key {
            Some(key) => builder.header(KEY_HEADER, key),
            None => builder,
        }
    }

    /// Ids are percent-encoded as a single path segment.
    fn document_url(&self, account_id: &str) -> Result<Url, RemoteError> {
        with_segments(&self.documents_url, &[account_id])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        request.send().await.map_err(map_transport_error)
    }

    fn encode(snapshot: &AccountSnapshot) -> Result<DocumentData, RemoteError> {
        serde_json::to_string(snapshot)
            .map(|progress| DocumentData { progress })
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

fn with_segments(base: &Url, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RemoteError::Network(format!("endpoint {} cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Network(error.to_string())
    }
}

async fn backend_error(response: Response) -> RemoteError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    RemoteError::Backend { status, message }
}

impl DocumentStore for HttpDocumentStore {
    async fn get_document(&self, account_id: &str) -> Result<Option<SnapshotPatch>, RemoteError> {
        let url = self.document_url(account_id)?;
        let resp = self.send(self.request(Method::GET, url)).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(backend_error(resp).await);
        }

        let document: DocumentResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        match document.progress.as_deref() {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| RemoteError::Parse(e.to_string())),
            _ => Ok(Some(SnapshotPatch::default())),
        }
    }

    async fn create_document(
        &self,
        account_id: &str,
        snapshot: &AccountSnapshot,
    ) -> Result<(), RemoteError> {
        let body = CreateDocumentRequest {
            document_id: account_id,
            data: Self::encode(snapshot)?,
        };
        let resp = self
            .send(self.request(Method::POST, self.documents_url.clone()).json(&body))
            .await?;

        if !resp.status().is_success() {
            return Err(backend_error(resp).await);
        }
        Ok(())
    }

    async fn update_document(
        &self,
        account_id: &str,
        snapshot: &AccountSnapshot,
    ) -> Result<(), RemoteError> {
        let body = UpdateDocumentRequest {
            data: Self::encode(snapshot)?,
        };
        let url = self.document_url(account_id)?;
        let resp = self
            .send(self.request(Method::PATCH, url).json(&body))
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(account_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(backend_error(resp).await);
        }
        Ok(())
    }
}
