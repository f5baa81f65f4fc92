use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Deserialize;

use crate::error::{EndpointError, EndpointResult};
use crate::transport::{HttpMethod, HttpRequest, SharedTransport};

/// Resource name to URL, as advertised by the root document.
pub type LinkMap = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct RootDocument {
    #[serde(rename = "_links")]
    links: RootLinks,
}

#[derive(Debug, Deserialize)]
struct RootLinks {
    #[serde(default)]
    child: Vec<ChildLink>,
}

#[derive(Debug, Deserialize)]
struct ChildLink {
    title: String,
    href: String,
}

type RootFetch = Shared<BoxFuture<'static, EndpointResult<LinkMap>>>;

/// Discovers resource URLs from the server root document. The document is fetched on the
/// first lookup and the map is kept for the lifetime of the resolver. Lookups that overlap
/// an in-flight fetch await it and share its outcome, success or failure. A failed fetch
/// caches nothing; the next lookup after it settles fetches again.
pub struct UrlResolver {
    root_url: String,
    transport: SharedTransport,
    links: OnceLock<LinkMap>,
    in_flight: Mutex<Option<RootFetch>>,
}

impl UrlResolver {
    pub fn new(root_url: impl Into<String>, transport: SharedTransport) -> Self {
        Self {
            root_url: root_url.into(),
            transport,
            links: OnceLock::new(),
            in_flight: Mutex::new(None),
        }
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub async fn resolve(&self, resource: &str) -> EndpointResult<String> {
        let links = self.links().await?;
        links
            .get(resource)
            .cloned()
            .ok_or_else(|| EndpointError::ResourceNotFound(resource.to_string()))
    }

    /// The discovered links, fetching them if this is the first lookup.
    pub async fn links(&self) -> EndpointResult<&LinkMap> {
        if let Some(links) = self.links.get() {
            return Ok(links);
        }

        let attempt = {
            let mut slot = self.lock_in_flight()?;
            if let Some(links) = self.links.get() {
                return Ok(links);
            }
            slot.get_or_insert_with(|| {
                fetch_links(self.root_url.clone(), self.transport.clone())
                    .boxed()
                    .shared()
            })
            .clone()
        };

        let outcome = attempt.clone().await;
        let links = outcome.map(|links| self.links.get_or_init(|| links));

        let mut slot = self.lock_in_flight()?;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&attempt)) {
            *slot = None;
        }
        links
    }

    /// `None` until a fetch has succeeded.
    pub fn cached(&self) -> Option<&LinkMap> {
        self.links.get()
    }

    fn lock_in_flight(&self) -> EndpointResult<MutexGuard<'_, Option<RootFetch>>> {
        self.in_flight
            .lock()
            .map_err(|_| EndpointError::Backend("root fetch mutex poisoned".to_string()))
    }
}

async fn fetch_links(root_url: String, transport: SharedTransport) -> EndpointResult<LinkMap> {
    tracing::debug!(%root_url, "fetching root document");
    let response = transport
        .send(HttpRequest::new(HttpMethod::Get, root_url.clone()))
        .await?;

    if response.status != 200 {
        tracing::warn!(%root_url, status = response.status, "root document unavailable");
        return Err(EndpointError::RootDocument {
            status: response.status,
        });
    }

    let body = response.body.ok_or_else(|| {
        EndpointError::InvalidRootDocument("root document body is empty".to_string())
    })?;
    let document: RootDocument = serde_json::from_value(body)
        .map_err(|err| EndpointError::InvalidRootDocument(err.to_string()))?;

    let links: LinkMap = document
        .links
        .child
        .into_iter()
        .map(|link| (link.title, link.href))
        .collect();
    tracing::debug!(resources = links.len(), "root document links cached");
    Ok(links)
}

impl std::fmt::Debug for UrlResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlResolver")
            .field("root_url", &self.root_url)
            .field("links", &self.links.get())
            .finish()
    }
}
