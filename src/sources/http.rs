use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;
use crate::config::BackendConfig;
use crate::models::Token;
use super::{BackendError, TokenBackend};

/// reqwest client for `GET /tokens` and `POST /mark_scam`.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    with_twitter: bool,
}

#[derive(Debug, Serialize)]
struct MarkScamRequest<'a> {
    pair_address: &'a str,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::Parse(format!("base url {}: {}", config.base_url, e)))?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            with_twitter: config.with_twitter,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        // Keep any path prefix of the base url ("http://host/api" + "tokens").
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        base.join(path)
            .map_err(|e| BackendError::Parse(format!("endpoint {}: {}", path, e)))
    }

    pub(crate) fn tokens_url(&self) -> Result<Url, BackendError> {
        let mut url = self.endpoint("tokens")?;
        if self.with_twitter {
            url.query_pairs_mut().append_pair("with_twitter", "true");
        }
        Ok(url)
    }
}

#[async_trait]
impl TokenBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_tokens(&self) -> Result<Vec<Token>, BackendError> {
        let url = self.tokens_url()?;

        let resp = self.client.get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BackendError::Status(resp.status().as_u16()));
        }

        let body = resp.bytes()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let tokens: Vec<Token> = serde_json::from_slice(&body)
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        tracing::debug!("fetched {} tokens", tokens.len());
        Ok(tokens)
    }

    async fn mark_scam(&self, pair_address: &str) -> Result<(), BackendError> {
        let url = self.endpoint("mark_scam")?;

        let resp = self.client.post(url)
            .json(&MarkScamRequest { pair_address })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BackendError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}
