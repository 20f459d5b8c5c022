//! WFS GetFeature provider.
//!
//! Builds OGC WFS 2.0.0 GetFeature URLs and decodes the GeoJSON response
//! into a [`FeatureCollection`].

use reqwest::Url;
use tracing::debug;

use super::http::AsyncHttpClient;
use super::types::{FeatureSource, FetchError};
use crate::bbox::BoundingBox;
use crate::feature::FeatureCollection;

/// Default WFS endpoint.
pub const DEFAULT_WFS_URL: &str = "https://tubvsig-so2sat-vm1.srv.mwn.de/geoserver/ows";

/// Default building layer.
pub const DEFAULT_LAYER: &str = "global3D:lod1_global";

/// Coordinate reference system used for requests and bounding boxes.
pub const DEFAULT_SRS: &str = "EPSG:4326";

/// A single GetFeature query.
#[derive(Debug, Clone, PartialEq)]
pub struct WfsQuery<'a> {
    pub type_name: &'a str,
    pub bbox: Option<BoundingBox>,
    pub max_features: Option<u32>,
    pub srs_name: &'a str,
}

impl<'a> WfsQuery<'a> {
    pub fn new(type_name: &'a str) -> Self {
        Self {
            type_name,
            bbox: None,
            max_features: None,
            srs_name: DEFAULT_SRS,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_max_features(mut self, max_features: Option<u32>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Build the request URL against `base_url`.
    pub fn to_url(&self, base_url: &str) -> Result<Url, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", self.type_name.to_string()),
            ("outputFormat", "application/json".to_string()),
            ("srsName", self.srs_name.to_string()),
        ];

        if let Some(count) = self.max_features {
            params.push(("count", count.to_string()));
        }

        if let Some(bbox) = &self.bbox {
            params.push(("bbox", format!("{},{}", bbox, self.srs_name)));
        }

        Url::parse_with_params(base_url, &params)
            .map_err(|e| FetchError::Transport(format!("Invalid WFS URL '{}': {}", base_url, e)))
    }
}

/// Feature source backed by a WFS endpoint.
pub struct WfsProvider<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    max_features: Option<u32>,
}

impl<C: AsyncHttpClient> WfsProvider<C> {
    /// Creates a provider against the default endpoint.
    pub fn new(http_client: C) -> Self {
        Self::with_url(http_client, DEFAULT_WFS_URL)
    }

    /// Creates a provider against `base_url`.
    pub fn with_url(http_client: C, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            max_features: None,
        }
    }

    /// Limit the number of features per response.
    pub fn with_max_features(mut self, max_features: Option<u32>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL that a fetch for `layer` and `bbox` would request.
    pub fn url_for(&self, layer: &str, bbox: &BoundingBox) -> Result<Url, FetchError> {
        WfsQuery::new(layer)
            .with_bbox(*bbox)
            .with_max_features(self.max_features)
            .to_url(&self.base_url)
    }
}

impl<C: AsyncHttpClient + 'static> FeatureSource for WfsProvider<C> {
    async fn fetch(&self, layer: &str, bbox: &BoundingBox) -> Result<FeatureCollection, FetchError> {
        let url = self.url_for(layer, bbox)?;
        let body = self.http_client.get(url.as_str()).await?;
        let collection = FeatureCollection::from_slice(&body)?;

        debug!(
            layer = layer,
            bbox = %bbox,
            features = collection.len(),
            "WFS response decoded"
        );

        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    const BODY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "lod1.1",
                "geometry": {"type": "Polygon", "coordinates": [[[11.0, 48.0], [11.001, 48.0], [11.001, 48.001], [11.0, 48.0]]]},
                "properties": {"ogc_fid": 1, "height": 12.5}
            }
        ]
    }"#;

    fn bbox() -> BoundingBox {
        BoundingBox::new(11.575, 48.137, 11.59, 48.145)
    }

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_url_without_bbox() {
        let url = WfsQuery::new("global3D:lod1_global")
            .to_url(DEFAULT_WFS_URL)
            .unwrap();
        let pairs = query_pairs(&url);

        assert_eq!(pairs.len(), 6);
        assert!(pairs.contains(&("service".into(), "WFS".into())));
        assert!(pairs.contains(&("version".into(), "2.0.0".into())));
        assert!(pairs.contains(&("request".into(), "GetFeature".into())));
        assert!(pairs.contains(&("typeName".into(), "global3D:lod1_global".into())));
        assert!(pairs.contains(&("outputFormat".into(), "application/json".into())));
        assert!(pairs.contains(&("srsName".into(), "EPSG:4326".into())));
    }

    #[test]
    fn test_url_with_bbox_and_count() {
        let url = WfsQuery::new("buildings")
            .with_bbox(bbox())
            .with_max_features(Some(5000))
            .to_url("https://example.com/ows")
            .unwrap();
        let pairs = query_pairs(&url);

        assert_eq!(url.path(), "/ows");
        assert!(pairs.contains(&("count".into(), "5000".into())));
        assert!(pairs.contains(&(
            "bbox".into(),
            "11.575,48.137,11.59,48.145,EPSG:4326".into()
        )));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = WfsQuery::new("buildings").to_url("not a url");
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_decodes_collection() {
        let client = MockAsyncHttpClient::new(Ok(BODY.as_bytes().to_vec()));
        let provider = WfsProvider::with_url(client.clone(), "https://example.com/ows");

        let collection = provider.fetch("buildings", &bbox()).await.unwrap();

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features[0].properties.height, Some(12.5));

        let urls = client.requested_urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("typeName=buildings"));
    }

    #[tokio::test]
    async fn test_fetch_http_error_passes_through() {
        let client = MockAsyncHttpClient::new(Err(FetchError::Http {
            status: 503,
            url: "https://example.com/ows".to_string(),
        }));
        let provider = WfsProvider::with_url(client, "https://example.com/ows");

        match provider.fetch("buildings", &bbox()).await {
            Err(FetchError::Http { status, .. }) => assert_eq!(status, 503),
            other => panic!("Expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let client = MockAsyncHttpClient::new(Ok(b"<html>oops</html>".to_vec()));
        let provider = WfsProvider::new(client);

        let result = provider.fetch("buildings", &bbox()).await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }
}
