use crate::credentials::CredentialPool;
use crate::error::SearchError;
use crate::provider::{ImageProvider, ProviderQuery, ProviderResponse};
use crate::router::RouteConfig;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ImageSearchPayload {
    #[serde(default)]
    items: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    #[serde(default)]
    link: String,
}

/// Runs one logical search, rotating through the credential pool.
pub struct SearchClient {
    pool: Arc<CredentialPool>,
    provider: Arc<dyn ImageProvider>,
}

impl SearchClient {
    pub fn new(pool: Arc<CredentialPool>, provider: Arc<dyn ImageProvider>) -> Self {
        Self { pool, provider }
    }

    /// Tries at most one full cycle of the pool. Retryable failures move on to
    /// the next credential; anything else ends the search immediately.
    pub async fn search(
        &self,
        query: &str,
        route: &RouteConfig,
        limit: usize,
    ) -> Result<Vec<String>, SearchError> {
        let attempts = self.pool.len();
        for attempt in 1..=attempts {
            let credential = self.pool.next();
            let outcome = self
                .provider
                .fetch(ProviderQuery {
                    query,
                    route,
                    credential: &credential,
                    limit,
                })
                .await
                .and_then(|response| classify(response, limit));

            match outcome {
                Ok(links) => {
                    log::debug!("'{}' returned {} images on attempt {}", query, links.len(), attempt);
                    return Ok(links);
                }
                Err(e) if e.is_retryable() => {
                    log::debug!("Attempt {}/{} for '{}' with {:?}: {}", attempt, attempts, query, credential, e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(SearchError::Exhausted { attempts })
    }
}

fn signals_quota(body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    body.contains("quota") || body.contains("ratelimitexceeded")
}

pub(crate) fn classify(response: ProviderResponse, limit: usize) -> Result<Vec<String>, SearchError> {
    match response.status {
        // A 200 is never read as a quota signal: image URLs may contain the word.
        200 => {
            let payload: ImageSearchPayload = serde_json::from_str(&response.body)?;
            Ok(payload
                .items
                .into_iter()
                .map(|item| item.link)
                .filter(|link| !link.is_empty())
                .take(limit)
                .collect())
        }
        429 => Err(SearchError::RateLimited { status: 429 }),
        status if signals_quota(&response.body) => Err(SearchError::RateLimited { status }),
        status => Err(SearchError::Status {
            status,
            body: response.body,
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn ok(links: &[&str]) -> ProviderResponse {
        let items: Vec<_> = links.iter().map(|l| serde_json::json!({ "link": l })).collect();
        ProviderResponse {
            status: 200,
            body: serde_json::json!({ "items": items }).to_string(),
        }
    }

    pub(crate) fn quota() -> ProviderResponse {
        ProviderResponse {
            status: 403,
            body: r#"{"error":{"code":403,"message":"Quota exceeded for quota metric 'Queries'"}}"#.into(),
        }
    }

    /// Answers per credential; unknown credentials get a transport error.
    #[derive(Default)]
    pub(crate) struct ScriptedProvider {
        pub(crate) replies: HashMap<String, ProviderResponse>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub(crate) fn with(mut self, key: &str, reply: ProviderResponse) -> Self {
            self.replies.insert(key.into(), reply);
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageProvider for ScriptedProvider {
        async fn fetch(&self, query: ProviderQuery<'_>) -> Result<ProviderResponse, SearchError> {
            let key = query.credential.expose().to_string();
            self.calls.lock().unwrap().push(key.clone());
            self.replies
                .get(&key)
                .cloned()
                .ok_or_else(|| SearchError::Transport("connection refused".into()))
        }
    }

    fn route() -> RouteConfig {
        RouteConfig {
            label: "Оборудование".into(),
            scope_id: "cx".into(),
        }
    }

    fn client(keys: &str, provider: Arc<ScriptedProvider>) -> SearchClient {
        SearchClient::new(Arc::new(CredentialPool::from_list(keys).unwrap()), provider)
    }

    #[tokio::test]
    async fn rotates_past_quota_to_next_credential() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with("k1", quota())
                .with("k2", ok(&["u1", "u2"])),
        );
        let links = client("k1,k2", provider.clone())
            .search("chair photo", &route(), 5)
            .await
            .unwrap();
        assert_eq!(links, vec!["u1", "u2"]);
        assert_eq!(provider.calls(), vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn exhaustion_is_bounded_by_pool_size() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with("k1", quota())
                .with("k2", ProviderResponse { status: 429, body: String::new() }),
        );
        // k3 has no reply and fails at the transport level.
        let err = client("k1,k2,k3", provider.clone())
            .search("chair", &route(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Exhausted { attempts: 3 }));
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn fatal_status_short_circuits() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with("k1", ProviderResponse { status: 400, body: "bad cx".into() })
                .with("k2", ok(&["u1"])),
        );
        let err = client("k1,k2", provider.clone())
            .search("chair", &route(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Status { status: 400, .. }));
        assert_eq!(provider.calls(), vec!["k1"]);
    }

    #[test]
    fn success_respects_limit_and_order() {
        let links = classify(ok(&["a", "b", "c", "d"]), 2).unwrap();
        assert_eq!(links, vec!["a", "b"]);
    }

    #[test]
    fn items_without_link_are_ignored() {
        let response = ProviderResponse {
            status: 200,
            body: r#"{"items":[{"title":"no link"},{"link":"u1"}]}"#.into(),
        };
        assert_eq!(classify(response, 5).unwrap(), vec!["u1"]);
    }

    #[test]
    fn success_without_items_is_empty() {
        let response = ProviderResponse {
            status: 200,
            body: r#"{"kind":"customsearch#search"}"#.into(),
        };
        assert!(classify(response, 5).unwrap().is_empty());
    }

    #[test]
    fn malformed_success_payload_is_fatal() {
        let err = classify(ProviderResponse { status: 200, body: "<html>".into() }, 5).unwrap_err();
        assert!(matches!(err, SearchError::Payload(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn quota_body_is_retryable_but_links_mentioning_it_are_not() {
        assert!(classify(quota(), 5).unwrap_err().is_retryable());
        let links = classify(ok(&["https://example.com/quota.jpg"]), 5).unwrap();
        assert_eq!(links.len(), 1);
    }
}
