use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::FetchError;
use crate::config::Config;

/// Errors building the HTTP listing source from configuration.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid listing URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid request header {name}")]
    InvalidHeader { name: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The remote paginated listing, one page of markup per request.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the raw markup of `page` (1-based) of `subject`'s favorites.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-success status.
    async fn fetch_page(&self, subject: &str, page: u32) -> Result<String, FetchError>;
}

/// Listing source backed by the forum's favorites endpoint.
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: Client,
    listing_url: Url,
}

impl HttpListingSource {
    /// Build a source sending the configured header bundle with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing URL or a header is malformed.
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let listing_url = Url::parse(&config.site_origin)?.join(&config.listing_path)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.request_headers {
            let invalid = || SourceError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(config.fetch_timeout.min(Duration::from_secs(10)))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            listing_url,
        })
    }

    /// URL of one listing page. `_` is a cache buster the site's own XHR sends.
    #[must_use]
    pub fn page_url(&self, subject: &str, page: u32) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut()
            .append_pair("_", &chrono::Utc::now().timestamp_millis().to_string())
            .append_pair("p", &page.to_string())
            .append_pair("nick", subject);
        url
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, subject: &str, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(subject, page);
        debug!(url = %url, "Requesting listing page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(page, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(page, e))
    }
}
