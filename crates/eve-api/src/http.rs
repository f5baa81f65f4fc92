use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::error::{EndpointError, EndpointResult};
use crate::transport::{Headers, HttpMethod, HttpRequest, HttpResponse, SharedTransport};
use crate::types::{
    ETAG_FIELD, Item, QueryResult, STATUS_FIELD, has_identity, merge_into, merge_value_into,
    self_href, strip_reserved,
};
use crate::urls::UrlResolver;

pub const IF_MATCH: &str = "If-Match";

/// Settings of an `http` backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpBackendConfig {
    /// Resource name looked up in the root document; defaults to the API name.
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub headers: Headers,
}

/// A remote resource collection reached through links discovered by a [`UrlResolver`].
#[derive(Clone, Debug)]
pub struct HttpEndpoint {
    name: String,
    rel: String,
    headers: Headers,
    resolver: Arc<UrlResolver>,
    transport: SharedTransport,
}

impl HttpEndpoint {
    pub fn new(
        name: impl Into<String>,
        config: HttpBackendConfig,
        resolver: Arc<UrlResolver>,
        transport: SharedTransport,
    ) -> Self {
        let name = name.into();
        Self {
            rel: config.rel.unwrap_or_else(|| name.clone()),
            name,
            headers: config.headers,
            resolver,
            transport,
        }
    }

    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// Collection URL from the root document.
    pub async fn resource_url(&self) -> EndpointResult<String> {
        self.resolver.resolve(&self.rel).await
    }

    /// Default headers configured for this resource.
    pub fn get_headers(&self) -> Headers {
        self.headers.clone()
    }

    /// Default headers plus `If-Match` when the item carries an etag.
    pub fn headers_for(&self, item: Option<&Item>) -> Headers {
        let mut headers = self.headers.clone();
        let etag = item.and_then(|item| item.get(ETAG_FIELD));
        match etag {
            None | Some(Value::Null) => {}
            Some(Value::String(etag)) => {
                headers.insert(IF_MATCH.to_string(), etag.clone());
            }
            Some(other) => {
                headers.insert(IF_MATCH.to_string(), other.to_string());
            }
        }
        headers
    }

    pub async fn query_document(&self, params: &Item) -> EndpointResult<Value> {
        let url = self.resource_url().await?;
        let request = HttpRequest::new(HttpMethod::Get, url)
            .with_params(query_params(params))
            .with_headers(self.get_headers());
        Ok(self.request(request).await?.body.unwrap_or(Value::Null))
    }

    pub async fn get_by_id(&self, id: &str, params: &Item) -> EndpointResult<Value> {
        let resource_url = self.resource_url().await?;
        let url = format!("{}/{id}", resource_url.trim_end_matches('/'));
        let request = HttpRequest::new(HttpMethod::Get, url).with_params(query_params(params));
        Ok(self.request(request).await?.body.unwrap_or(Value::Null))
    }

    /// GET an item the caller already holds a link to.
    pub async fn get_by_url(&self, url: &str) -> EndpointResult<Value> {
        let request = HttpRequest::new(HttpMethod::Get, url);
        Ok(self.request(request).await?.body.unwrap_or(Value::Null))
    }

    pub async fn create(&self, item: &mut Item) -> EndpointResult<Item> {
        let url = self.resource_url().await?;
        let request = HttpRequest::new(HttpMethod::Post, url)
            .with_headers(self.headers_for(None))
            .with_body(Value::Object(item.clone()));
        let response = self.request(request).await?;
        merge_value_into(item, response.body.as_ref());
        Ok(item.clone())
    }

    /// PATCH the item's self link. Without an explicit diff the item minus its reserved
    /// fields is sent.
    pub async fn update(&self, item: &mut Item, diff: Option<&Item>) -> EndpointResult<Item> {
        let diff = diff.cloned().unwrap_or_else(|| strip_reserved(item));
        let url = item_url(item)?;
        let request = HttpRequest::new(HttpMethod::Patch, url)
            .with_headers(self.headers_for(Some(&*item)))
            .with_body(Value::Object(diff));
        let response = self.request(request).await?;
        merge_value_into(item, response.body.as_ref());
        Ok(item.clone())
    }

    /// PUT the whole item to `destination`.
    pub async fn replace(&self, destination: &str, item: &mut Item) -> EndpointResult<Item> {
        let request = HttpRequest::new(HttpMethod::Put, destination)
            .with_headers(self.headers_for(Some(&*item)))
            .with_body(Value::Object(item.clone()));
        let response = self.request(request).await?;
        merge_value_into(item, response.body.as_ref());
        Ok(item.clone())
    }

    /// DELETE the item's self link. A 404 counts as already deleted.
    pub async fn delete(&self, item: &Item) -> EndpointResult<HttpResponse> {
        let url = item_url(item)?;
        let request =
            HttpRequest::new(HttpMethod::Delete, url).with_headers(self.headers_for(Some(item)));
        match self.request(request).await {
            Err(EndpointError::Status(response)) if response.status == 404 => Ok(response),
            other => other,
        }
    }

    async fn request(&self, request: HttpRequest) -> EndpointResult<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        tracing::debug!(
            endpoint = %self.name,
            method = method.as_str(),
            %url,
            status = response.status,
            "http exchange"
        );
        classify(response)
    }
}

/// Success iff the status is 2xx and the body does not carry `_status: "ERR"`.
pub fn classify(response: HttpResponse) -> EndpointResult<HttpResponse> {
    if !response.is_success() {
        return Err(EndpointError::Status(response));
    }
    let application_error = response
        .body
        .as_ref()
        .and_then(|body| body.get(STATUS_FIELD))
        .and_then(Value::as_str)
        == Some("ERR");
    if application_error {
        return Err(EndpointError::Application(response));
    }
    Ok(response)
}

fn item_url(item: &Item) -> EndpointResult<String> {
    self_href(item)
        .map(str::to_string)
        .ok_or_else(|| EndpointError::InvalidItem("item has no _links.self.href".to_string()))
}

/// String values pass through verbatim; anything else is JSON-encoded, e.g. Eve's `where`.
fn query_params(params: &Item) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn id_segment(id: &Value) -> String {
    match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl Endpoint for HttpEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, criteria: &Item) -> EndpointResult<QueryResult> {
        Ok(QueryResult::Document(self.query_document(criteria).await?))
    }

    async fn find(&self, id: &Value) -> EndpointResult<Item> {
        match self.get_by_id(&id_segment(id), &Item::new()).await? {
            Value::Object(item) => Ok(item),
            _ => Err(EndpointError::NotFound { id: id.clone() }),
        }
    }

    /// Persisted items are patched with `diff`; new items get `diff` merged in first and are
    /// posted whole.
    async fn save(&self, item: &mut Item, diff: Option<&Item>) -> EndpointResult<Item> {
        if has_identity(item) {
            return self.update(item, diff).await;
        }
        if let Some(diff) = diff {
            merge_into(item, diff);
        }
        self.create(item).await
    }

    async fn remove(&self, item: &Item) -> EndpointResult<Item> {
        self.delete(item).await?;
        Ok(item.clone())
    }

    async fn get_url(&self) -> EndpointResult<Option<String>> {
        self.resource_url().await.map(Some)
    }
}
