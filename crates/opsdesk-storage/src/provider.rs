//! Internal data provider backed by the local store.
//!
//! Answers the `externalData` references forms may declare. The only
//! reference known today is [`PREVIOUS_ROUTES`], the route history of the
//! unit named by the task's `unidad` variable.

use serde_json::Value;
use tracing::debug;

use opsdesk_forms::{DataProvider, ProviderError};

use crate::sqlite::schema::ROUTE_HISTORY_LIMIT_KEY;
use crate::traits::TaskStore;

/// Reference resolving to the previous routes of a unit.
pub const PREVIOUS_ROUTES: &str = "recorridosAnteriores";

/// Number of previous routes returned when the store has no setting.
pub const DEFAULT_ROUTE_HISTORY_LIMIT: usize = 2;

/// [`DataProvider`] over any [`TaskStore`].
pub struct SqliteDataProvider<'a> {
    store: &'a dyn TaskStore,
}

impl<'a> SqliteDataProvider<'a> {
    pub fn new(store: &'a dyn TaskStore) -> Self {
        Self { store }
    }

    fn history_limit(&self) -> usize {
        self.store
            .get_config(ROUTE_HISTORY_LIMIT_KEY)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_ROUTE_HISTORY_LIMIT)
    }

    fn previous_routes(&self, variables: &Value) -> Result<Vec<Value>, ProviderError> {
        let unidad = match variables.get("unidad") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ProviderError::MissingVariable {
                    reference: PREVIOUS_ROUTES.to_owned(),
                    variable: "unidad".to_owned(),
                });
            }
        };
        let routes = self
            .store
            .recent_routes(&unidad, self.history_limit())
            .map_err(|e| ProviderError::backend(PREVIOUS_ROUTES, e.to_string()))?;
        debug!(%unidad, count = routes.len(), "previous routes loaded");
        routes
            .iter()
            .map(|r| {
                serde_json::to_value(r)
                    .map_err(|e| ProviderError::backend(PREVIOUS_ROUTES, e.to_string()))
            })
            .collect()
    }
}

impl DataProvider for SqliteDataProvider<'_> {
    fn fetch(
        &self,
        reference: &str,
        variables: &Value,
    ) -> Result<Option<Vec<Value>>, ProviderError> {
        match reference {
            PREVIOUS_ROUTES => self.previous_routes(variables).map(Some),
            other => {
                debug!(reference = other, "unknown external data reference");
                Ok(None)
            }
        }
    }
}
