use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::error::{EndpointError, EndpointResult};
use crate::types::{Cursor, ID_FIELD, Item, QueryResult, has_identity, matches, merge_into};

/// Identity handed to the first record saved into a store without numeric ids.
///
/// Later ids are one past the largest integral `_id` in the store. Floats with no fractional
/// part count as integers; any other `_id` (strings, fractional numbers) is ignored.
pub const FIRST_ID: i64 = 1;

/// Settings of a `mock` backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MockBackendConfig {
    #[serde(default)]
    pub data: Vec<Item>,
    #[serde(default)]
    pub url: Option<String>,
}

/// In-memory record store for one named resource. Each endpoint owns its copy of the
/// fixture data; clones share it.
#[derive(Clone, Debug)]
pub struct MockEndpoint {
    name: String,
    url: Option<String>,
    records: Arc<Mutex<Vec<Item>>>,
}

impl MockEndpoint {
    pub fn new(name: impl Into<String>, config: MockBackendConfig) -> Self {
        Self {
            name: name.into(),
            url: config.url,
            records: Arc::new(Mutex::new(config.data)),
        }
    }

    /// Current records in store order.
    pub fn snapshot(&self) -> EndpointResult<Vec<Item>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> EndpointResult<MutexGuard<'_, Vec<Item>>> {
        self.records
            .lock()
            .map_err(|_| EndpointError::Backend("mock store mutex poisoned".to_string()))
    }
}

fn next_id(records: &[Item]) -> EndpointResult<i64> {
    let Some(max) = records
        .iter()
        .filter_map(|record| record.get(ID_FIELD).and_then(integral_id))
        .max()
    else {
        return Ok(FIRST_ID);
    };
    max.checked_add(1)
        .ok_or_else(|| EndpointError::Backend(format!("mock id space exhausted after {max}")))
}

fn integral_id(id: &Value) -> Option<i64> {
    id.as_i64().or_else(|| {
        id.as_f64()
            .filter(|id| id.fract() == 0.0 && *id >= i64::MIN as f64 && *id < i64::MAX as f64)
            .map(|id| id as i64)
    })
}

#[async_trait::async_trait]
impl Endpoint for MockEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, criteria: &Item) -> EndpointResult<QueryResult> {
        let records = self.lock()?;
        let matched = records
            .iter()
            .filter(|record| matches(record, criteria))
            .cloned()
            .collect();
        Ok(QueryResult::Cursor(Cursor::new(matched)))
    }

    async fn find(&self, id: &Value) -> EndpointResult<Item> {
        let records = self.lock()?;
        records
            .iter()
            .find(|record| record.get(ID_FIELD) == Some(id))
            .cloned()
            .ok_or_else(|| EndpointError::NotFound { id: id.clone() })
    }

    /// Merges `diff` into `item`. New items get the next numeric id and are appended;
    /// persisted items overwrite the stored record with the same id, if there is one.
    async fn save(&self, item: &mut Item, diff: Option<&Item>) -> EndpointResult<Item> {
        if let Some(diff) = diff {
            merge_into(item, diff);
        }

        let mut records = self.lock()?;
        if has_identity(item) {
            if let Some(stored) = records
                .iter_mut()
                .find(|record| record.get(ID_FIELD) == item.get(ID_FIELD))
            {
                *stored = item.clone();
            }
        } else {
            let id = next_id(&records)?;
            item.insert(ID_FIELD.to_string(), Value::from(id));
            records.push(item.clone());
            tracing::debug!(endpoint = %self.name, id, "mock record created");
        }

        Ok(item.clone())
    }

    async fn remove(&self, item: &Item) -> EndpointResult<Item> {
        let mut records = self.lock()?;
        records.retain(|record| !matches(record, item));
        Ok(item.clone())
    }

    async fn get_url(&self) -> EndpointResult<Option<String>> {
        Ok(self.url.clone())
    }
}
