use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ApiConfig, EndpointConfig, ServerConfig};
use crate::endpoint::SharedEndpoint;
use crate::error::{EndpointError, EndpointResult};
use crate::http::{HttpBackendConfig, HttpEndpoint};
use crate::memory::{MockBackendConfig, MockEndpoint};
use crate::transport::{ReqwestTransport, SharedTransport};
use crate::urls::UrlResolver;

/// Builds a decorating service around the typed backend it is handed. The factory may reach
/// backend-specific operations through [`Backend::as_http`] or [`Backend::as_mock`], and may
/// refuse a backend kind it cannot wrap.
pub type ServiceFactory = Arc<dyn Fn(Backend) -> EndpointResult<SharedEndpoint> + Send + Sync>;

type BackendConstructor = fn(&str, Value, &mut BackendContext) -> EndpointResult<Backend>;

const BACKENDS: [(&str, BackendConstructor); 2] = [("mock", build_mock), ("http", build_http)];

/// The concrete backend behind a registered API.
#[derive(Clone, Debug)]
pub enum Backend {
    Mock(Arc<MockEndpoint>),
    Http(Arc<HttpEndpoint>),
}

impl Backend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::Http(_) => "http",
        }
    }

    pub fn as_endpoint(&self) -> SharedEndpoint {
        match self {
            Self::Mock(endpoint) => endpoint.clone(),
            Self::Http(endpoint) => endpoint.clone(),
        }
    }

    pub fn as_mock(&self) -> Option<&Arc<MockEndpoint>> {
        match self {
            Self::Mock(endpoint) => Some(endpoint),
            Self::Http(_) => None,
        }
    }

    pub fn as_http(&self) -> Option<&Arc<HttpEndpoint>> {
        match self {
            Self::Http(endpoint) => Some(endpoint),
            Self::Mock(_) => None,
        }
    }
}

/// Shared pieces handed to backend constructors. The transport and resolver are created on
/// first use so registries with only mock APIs never build an HTTP client.
struct BackendContext {
    server: ServerConfig,
    transport: Option<SharedTransport>,
    resolver: Option<Arc<UrlResolver>>,
}

impl BackendContext {
    fn transport(&mut self) -> SharedTransport {
        self.transport
            .get_or_insert_with(|| Arc::new(ReqwestTransport::new()))
            .clone()
    }

    fn resolver(&mut self) -> Arc<UrlResolver> {
        if let Some(resolver) = &self.resolver {
            return resolver.clone();
        }
        let resolver = Arc::new(UrlResolver::new(self.server.url.clone(), self.transport()));
        self.resolver = Some(resolver.clone());
        resolver
    }
}

fn parse_backend<T: DeserializeOwned + Default>(name: &str, backend: Value) -> EndpointResult<T> {
    if backend.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(backend).map_err(|err| {
        EndpointError::Configuration(format!("invalid backend settings for {name}: {err}"))
    })
}

fn build_mock(name: &str, backend: Value, _: &mut BackendContext) -> EndpointResult<Backend> {
    let config: MockBackendConfig = parse_backend(name, backend)?;
    Ok(Backend::Mock(Arc::new(MockEndpoint::new(name, config))))
}

fn build_http(name: &str, backend: Value, context: &mut BackendContext) -> EndpointResult<Backend> {
    let config: HttpBackendConfig = parse_backend(name, backend)?;
    let resolver = context.resolver();
    let transport = context.transport();
    Ok(Backend::Http(Arc::new(HttpEndpoint::new(
        name, config, resolver, transport,
    ))))
}

fn backend_constructor(kind: &str) -> Option<BackendConstructor> {
    BACKENDS
        .iter()
        .find(|(tag, _)| *tag == kind)
        .map(|(_, constructor)| *constructor)
}

/// Collects API registrations and turns them into endpoints once, via [`ApiRegistry::build`].
///
/// ```ignore
/// let apis = ApiRegistry::new(ServerConfig::from_env())
///     .register("users", EndpointConfig::http(HttpBackendConfig::default())?)
///     .build()?;
/// ```
#[derive(Clone, Default)]
pub struct ApiRegistry {
    server: ServerConfig,
    transport: Option<SharedTransport>,
    apis: BTreeMap<String, EndpointConfig>,
    services: BTreeMap<String, ServiceFactory>,
}

impl ApiRegistry {
    pub fn new(server: ServerConfig) -> Self {
        Self {
            server,
            ..Self::default()
        }
    }

    pub fn from_config(config: ApiConfig) -> Self {
        config
            .apis
            .into_iter()
            .fold(Self::new(config.server), |registry, (name, api)| {
                registry.register(name, api)
            })
    }

    /// Transport used by every HTTP backend; defaults to [`ReqwestTransport`].
    pub fn with_transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Registers `name`, replacing an earlier registration of the same name.
    pub fn register(mut self, name: impl Into<String>, config: EndpointConfig) -> Self {
        self.apis.insert(name.into(), config);
        self
    }

    /// Makes a decorator available to configurations naming it in `service`.
    pub fn service<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Backend) -> EndpointResult<SharedEndpoint> + Send + Sync + 'static,
    {
        self.services.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn build(self) -> EndpointResult<Apis> {
        let mut context = BackendContext {
            server: self.server,
            transport: self.transport,
            resolver: None,
        };

        let mut apis = BTreeMap::new();
        for (name, config) in self.apis {
            let constructor = backend_constructor(&config.kind).ok_or_else(|| {
                EndpointError::Configuration(format!(
                    "unknown backend type '{}' for api {name}",
                    config.kind
                ))
            })?;
            let backend = constructor(&name, config.backend, &mut context)?;

            let endpoint = match &config.service {
                Some(service) => {
                    let factory = self.services.get(service).ok_or_else(|| {
                        EndpointError::Configuration(format!(
                            "unknown service '{service}' for api {name}"
                        ))
                    })?;
                    factory(backend.clone())?
                }
                None => backend.as_endpoint(),
            };

            tracing::debug!(api = %name, backend = backend.kind(), "api registered");
            apis.insert(name, RegisteredApi { backend, endpoint });
        }

        Ok(Apis {
            apis,
            resolver: context.resolver,
        })
    }
}

impl std::fmt::Debug for ApiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRegistry")
            .field("server", &self.server)
            .field("apis", &self.apis)
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone)]
struct RegisteredApi {
    backend: Backend,
    endpoint: SharedEndpoint,
}

/// Endpoints by API name, as produced by [`ApiRegistry::build`].
#[derive(Clone)]
pub struct Apis {
    apis: BTreeMap<String, RegisteredApi>,
    resolver: Option<Arc<UrlResolver>>,
}

impl Apis {
    /// The endpoint callers use: the decorating service if one was configured, otherwise the
    /// backend itself.
    pub fn get(&self, name: &str) -> Option<SharedEndpoint> {
        self.apis.get(name).map(|api| api.endpoint.clone())
    }

    pub fn endpoint(&self, name: &str) -> EndpointResult<SharedEndpoint> {
        self.get(name)
            .ok_or_else(|| EndpointError::Configuration(format!("api {name} is not registered")))
    }

    /// The undecorated backend, for backend-specific operations.
    pub fn backend(&self, name: &str) -> Option<&Backend> {
        self.apis.get(name).map(|api| &api.backend)
    }

    pub fn http(&self, name: &str) -> Option<Arc<HttpEndpoint>> {
        self.backend(name)?.as_http().cloned()
    }

    pub fn mock(&self, name: &str) -> Option<Arc<MockEndpoint>> {
        self.backend(name)?.as_mock().cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.apis.keys().map(String::as_str)
    }

    /// Resolver shared by all HTTP backends; `None` when no HTTP API is registered.
    pub fn resolver(&self) -> Option<&Arc<UrlResolver>> {
        self.resolver.as_ref()
    }
}

impl std::fmt::Debug for Apis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.apis
                    .iter()
                    .map(|(name, api)| (name, api.backend.kind())),
            )
            .finish()
    }
}
