use crate::credentials::Credential;
use crate::error::SearchError;
use crate::router::RouteConfig;
use async_trait::async_trait;

/// One attempt against the image-search provider.
#[derive(Debug, Clone)]
pub struct ProviderQuery<'a> {
    pub query: &'a str,
    pub route: &'a RouteConfig,
    pub credential: &'a Credential,
    pub limit: usize,
}

/// Raw provider reply; classification happens in the search client.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Performs a single HTTP exchange. Only transport failures are errors here.
    async fn fetch(&self, query: ProviderQuery<'_>) -> Result<ProviderResponse, SearchError>;
}
