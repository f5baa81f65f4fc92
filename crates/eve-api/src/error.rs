use serde_json::Value;

use crate::transport::HttpResponse;

#[derive(Clone, Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("item not found: {id}")]
    NotFound { id: Value },

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("root document request failed with status {status}")]
    RootDocument { status: u16 },

    #[error("invalid root document: {0}")]
    InvalidRootDocument(String),

    #[error("request failed with status {}", .0.status)]
    Status(HttpResponse),

    #[error("application error in response with status {}", .0.status)]
    Application(HttpResponse),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("invalid item: {0}")]
    InvalidItem(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl EndpointError {
    /// The response a rejected request carried, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Status(response) | Self::Application(response) => Some(response),
            _ => None,
        }
    }
}

pub type EndpointResult<T> = Result<T, EndpointError>;
