//! Remote speed-limit provider abstraction
//!
//! This module provides the HTTP client trait used for every remote request
//! and the description of the speed-limit endpoint.
//!
//! ```ignore
//! use speedwatch::provider::{AsyncReqwestClient, SpeedLimitApi};
//!
//! let client = AsyncReqwestClient::new()?;
//! let api = SpeedLimitApi::new("https://example.com/api");
//! let body = client.get(&api.url_for(40.71, -74.0)).await?;
//! let response = SpeedLimitApi::parse_response(&body)?;
//! ```

mod http;
mod speed_limit;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_REQUEST_TIMEOUT};
pub use speed_limit::{SpeedLimitApi, SpeedLimitResponse, ERROR_SOURCE};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
