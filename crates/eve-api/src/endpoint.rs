use std::sync::Arc;

use serde_json::Value;

use crate::error::EndpointResult;
use crate::types::{Item, QueryResult};

pub type SharedEndpoint = Arc<dyn Endpoint>;

/// Operations every backend answers, whether it keeps records in memory or talks HTTP.
///
/// Writes mutate the caller's item in place with the persisted state and return a copy of it.
/// Callers must not touch an item while a write on it is pending.
#[async_trait::async_trait]
pub trait Endpoint: Send + Sync {
    /// Name the API was registered under.
    fn name(&self) -> &str;

    /// Mock backends return a [`crate::Cursor`], HTTP backends the raw response document.
    async fn query(&self, criteria: &Item) -> EndpointResult<QueryResult>;

    async fn find(&self, id: &Value) -> EndpointResult<Item>;

    async fn save(&self, item: &mut Item, diff: Option<&Item>) -> EndpointResult<Item>;

    async fn remove(&self, item: &Item) -> EndpointResult<Item>;

    async fn get_url(&self) -> EndpointResult<Option<String>>;
}
