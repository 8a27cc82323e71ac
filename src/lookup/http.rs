//! HTTP catalog lookup

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{Resource, ResourceLookup};
use crate::document::{DocumentError, DocumentResult};

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Resolves identifiers against `GET <base_url>/<id>`
#[derive(Debug, Clone)]
pub struct HttpLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookup {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn resource_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(id))
    }
}

#[async_trait]
impl ResourceLookup for HttpLookup {
    async fn lookup(&self, id: &str) -> DocumentResult<Option<Resource>> {
        let response = self.client.get(self.resource_url(id)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: LookupResponse = response.json().await?;
                Ok(Some(Resource { url: body.url }))
            }
            status => Err(DocumentError::Io(format!(
                "resource lookup for '{}' returned {}",
                id, status
            ))),
        }
    }
}
