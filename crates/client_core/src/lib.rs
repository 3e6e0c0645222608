//! REST data source and process-wide clients used by dashboard views.

pub mod api;
pub mod error;
pub mod pinning;
pub mod query_client;

pub use api::{failure_from_reqwest, ApiClient, ListResource};
pub use error::ClientError;
pub use pinning::{PinnedContent, PinningClient, PinningError};
