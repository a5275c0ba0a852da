use crate::config::CategoryConfig;
use std::collections::HashMap;

/// Provider-side routing for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub label: String,
    pub scope_id: String,
}

#[derive(Debug, Default)]
pub struct CategoryRouter {
    routes: HashMap<String, RouteConfig>,
}

impl CategoryRouter {
    /// Resolves every category once. `lookup_env` is consulted for entries
    /// that name an environment variable instead of a literal scope id.
    pub fn from_config<F>(categories: &[CategoryConfig], lookup_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut routes = HashMap::new();
        for category in categories {
            let label = category.label.trim();
            let scope_id = category
                .scope_id
                .clone()
                .or_else(|| category.scope_env.as_deref().and_then(&lookup_env))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());

            match scope_id {
                Some(scope_id) => {
                    log::debug!("Category '{}' routed", label);
                    routes.insert(
                        label.to_string(),
                        RouteConfig {
                            label: label.to_string(),
                            scope_id,
                        },
                    );
                }
                None => log::warn!(
                    "Category '{}' has no scope id configured (env: {:?}); its items will be skipped",
                    label,
                    category.scope_env
                ),
            }
        }
        log::info!("Category router ready with {} of {} categories", routes.len(), categories.len());
        Self { routes }
    }

    pub fn from_env(categories: &[CategoryConfig]) -> Self {
        Self::from_config(categories, |name| std::env::var(name).ok())
    }

    pub fn resolve(&self, category: &str) -> Option<&RouteConfig> {
        self.routes.get(category.trim())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
