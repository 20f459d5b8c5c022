//! Feature provider abstraction
//!
//! A [`FeatureSource`] turns a layer name and bounding box into a
//! [`FeatureCollection`](crate::feature::FeatureCollection). The production
//! source is [`WfsProvider`] over an [`AsyncReqwestClient`]; tests substitute
//! their own sources or a mock HTTP client.
//!
//! ```ignore
//! use featurelayer::provider::{AsyncReqwestClient, WfsProvider};
//!
//! let provider = WfsProvider::new(AsyncReqwestClient::new()?);
//! let buildings = provider.fetch("global3D:lod1_global", &bbox).await?;
//! ```

mod http;
mod types;
mod wfs;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use types::{FeatureSource, FetchError};
pub use wfs::{WfsProvider, WfsQuery, DEFAULT_LAYER, DEFAULT_SRS, DEFAULT_WFS_URL};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
