#![doc = r#"
Named CRUD endpoints over either an in-memory fixture or an Eve-style HTTP resource.

| Operation | Mock backend | HTTP backend |
| --- | --- | --- |
| `Endpoint::query` | filter in memory, `Cursor` | `GET <resource>?params`, raw document |
| `Endpoint::find` | match on `_id` | `GET <resource>/<id>` |
| `Endpoint::save` | merge diff, allocate `max(_id) + 1` for new items | `PATCH _links.self.href` with `If-Match`, or `POST <resource>` |
| `Endpoint::remove` | drop matching records | `DELETE _links.self.href`, 404 tolerated |
| `Endpoint::get_url` | configured url | resource link from the root document |

Notes:
- Resource URLs come from the root document `_links.child`, fetched once per `UrlResolver`.
- A 2xx response whose body carries `_status: "ERR"` is a failure.
- Writes merge the stored state into the caller's item in place.
"#]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod memory;
pub mod registry;
pub mod testing;
pub mod transport;
pub mod types;
pub mod urls;

pub use config::{ApiConfig, DEFAULT_SERVER_URL, EndpointConfig, SERVER_URL_ENV, ServerConfig};
pub use endpoint::{Endpoint, SharedEndpoint};
pub use error::{EndpointError, EndpointResult};
pub use http::{HttpBackendConfig, HttpEndpoint, IF_MATCH, classify};
pub use memory::{FIRST_ID, MockBackendConfig, MockEndpoint};
pub use registry::{ApiRegistry, Apis, Backend, ServiceFactory};
pub use testing::MockTransport;
pub use transport::{
    Headers, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    SharedTransport,
};
pub use types::{Cursor, Item, QueryResult, RESERVED_FIELDS, has_identity, strip_reserved};
pub use urls::{LinkMap, UrlResolver};
