use crate::config::AppConfig;
use crate::error::{AppError, SearchError};
use crate::provider::{ImageProvider, ProviderQuery, ProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Google Custom Search JSON API, image mode.
pub struct GoogleImageProvider {
    client: Client,
    endpoint: Url,
}

impl GoogleImageProvider {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        log::debug!("Creating image search client for endpoint: {}", config.provider_endpoint);
        let endpoint = Url::parse(&config.provider_endpoint)
            .map_err(|e| ::config::ConfigError::Message(format!("provider_endpoint: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, endpoint })
    }

    fn request_url(&self, query: &ProviderQuery<'_>) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", query.credential.expose())
            .append_pair("cx", &query.route.scope_id)
            .append_pair("q", query.query)
            .append_pair("searchType", "image")
            .append_pair("num", &query.limit.to_string())
            .append_pair("imgType", "photo")
            .append_pair("imgSize", "large")
            .append_pair("imgColorType", "color");
        url
    }
}

#[async_trait]
impl ImageProvider for GoogleImageProvider {
    async fn fetch(&self, query: ProviderQuery<'_>) -> Result<ProviderResponse, SearchError> {
        log::trace!(
            "Requesting images for '{}' (category '{}') with {:?}",
            query.query,
            query.route.label,
            query.credential
        );
        let response = self.client.get(self.request_url(&query)).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        log::trace!("Provider answered {} ({} bytes)", status, body.len());
        Ok(ProviderResponse { status, body })
    }
}
