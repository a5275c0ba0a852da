use crate::error::{AppError, SearchError};
use crate::router::{CategoryRouter, RouteConfig};
use crate::search_client::SearchClient;
use crate::throttle::Throttle;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub type ResultMap = HashMap<String, Vec<String>>;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BatchRequest {
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

/// Per-query account of what happened; `/batch` only exposes `results`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Found { count: usize },
    Empty,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Serialize, Default)]
pub struct BatchOutcome {
    pub results: ResultMap,
    pub statuses: HashMap<String, ItemStatus>,
}

impl BatchOutcome {
    /// Duplicate queries: a success is never replaced by a later skip or
    /// failure; between successes the later one in input order wins. Both
    /// maps always describe the same item.
    fn record(&mut self, query: String, status: ItemStatus, links: Option<Vec<String>>) {
        match links {
            Some(links) => {
                self.results.insert(query.clone(), links);
            }
            None if self.results.contains_key(&query) => {
                log::debug!("Keeping earlier result for duplicate query '{}'", query);
                return;
            }
            None => {}
        }
        self.statuses.insert(query, status);
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub max_concurrency: usize,
    pub result_limit: usize,
    pub query_suffix: String,
    pub default_category: Option<String>,
}

impl DispatchSettings {
    fn embellish(&self, query: &str) -> String {
        let suffix = self.query_suffix.trim();
        if suffix.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", query, suffix)
        }
    }
}

pub struct BatchDispatcher {
    client: Arc<SearchClient>,
    router: Arc<CategoryRouter>,
    throttle: Arc<Throttle>,
    settings: DispatchSettings,
}

impl BatchDispatcher {
    pub fn new(
        client: Arc<SearchClient>,
        router: Arc<CategoryRouter>,
        throttle: Arc<Throttle>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            client,
            router,
            throttle,
            settings,
        }
    }

    fn pair_up(&self, request: BatchRequest) -> Result<Vec<(String, String)>, AppError> {
        let BatchRequest { queries, categories } = request;
        let categories = match (categories, &self.settings.default_category) {
            (Some(categories), _) => categories,
            (None, Some(default)) => vec![default.clone(); queries.len()],
            (None, None) => Vec::new(),
        };
        if queries.len() != categories.len() {
            return Err(AppError::CountMismatch {
                queries: queries.len(),
                categories: categories.len(),
            });
        }
        Ok(queries.into_iter().zip(categories).collect())
    }

    /// Runs every item of the batch and returns once all of them finished.
    /// Only a malformed batch is an error; item failures are recorded in the
    /// outcome's status map and leave the item out of `results`.
    pub async fn dispatch(&self, request: BatchRequest) -> Result<BatchOutcome, AppError> {
        let pairs = self.pair_up(request)?;
        log::info!("Dispatching batch of {} items", pairs.len());

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency));
        // Items in input order; `None` marks one whose search task is running.
        let mut items: Vec<(String, Option<ItemStatus>)> = Vec::with_capacity(pairs.len());
        let mut handles = Vec::new();

        for (query, category) in pairs {
            let query = query.trim().to_string();
            if query.is_empty() {
                log::debug!("Skipping empty query (category '{}')", category.trim());
                items.push((query, Some(ItemStatus::Skipped { reason: "empty query".into() })));
                continue;
            }
            let route = match self.router.resolve(&category) {
                Some(route) => route.clone(),
                None => {
                    log::debug!("Skipping '{}': category '{}' is not routable", query, category.trim());
                    let reason = format!("unknown category '{}'", category.trim());
                    items.push((query, Some(ItemStatus::Skipped { reason })));
                    continue;
                }
            };

            let client = self.client.clone();
            let throttle = self.throttle.clone();
            let semaphore = semaphore.clone();
            let search_text = self.settings.embellish(&query);
            let limit = self.settings.result_limit;

            handles.push(tokio::spawn(async move {
                run_item(semaphore, client, throttle, search_text, route, limit).await
            }));
            items.push((query, None));
        }

        let mut joined = join_all(handles).await.into_iter();
        let mut outcome = BatchOutcome::default();
        for (query, settled) in items {
            if let Some(status) = settled {
                outcome.record(query, status, None);
                continue;
            }
            match joined.next() {
                Some(Ok(Ok(links))) => {
                    let status = if links.is_empty() {
                        ItemStatus::Empty
                    } else {
                        ItemStatus::Found { count: links.len() }
                    };
                    outcome.record(query, status, Some(links));
                }
                Some(Ok(Err(e))) => {
                    log::warn!("Search for '{}' failed: {}", query, e);
                    outcome.record(query, ItemStatus::Failed { error: e.to_string() }, None);
                }
                Some(Err(e)) => {
                    let e = AppError::from(e);
                    log::error!("Search task for '{}' did not complete: {}", query, e);
                    outcome.record(query, ItemStatus::Failed { error: e.to_string() }, None);
                }
                None => break,
            }
        }

        log::info!(
            "Batch finished: {} of {} items returned results",
            outcome.results.len(),
            outcome.statuses.len()
        );
        Ok(outcome)
    }
}

/// One batch item: waits for a slot, searches, then cools down before the
/// slot is released.
async fn run_item(
    gate: Arc<Semaphore>,
    client: Arc<SearchClient>,
    throttle: Arc<Throttle>,
    search_text: String,
    route: RouteConfig,
    limit: usize,
) -> Result<Vec<String>, SearchError> {
    let _permit = gate
        .acquire_owned()
        .await
        .map_err(|e| SearchError::Admission(e.to_string()))?;
    throttle.admit().await;
    let result = client.search(&search_text, &route, limit).await;
    throttle.cool_down().await;
    result
}
