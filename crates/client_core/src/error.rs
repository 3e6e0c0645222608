use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("unsupported API url scheme '{0}'; expected http or https")]
    UnsupportedScheme(String),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("query client already initialized")]
    AlreadyInitialized,
    #[error("query client not initialized")]
    NotInitialized,
}
