//! HTTP directory scraper.

use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, info};

use super::listing::parse_listing;
use super::types::{Contents, ScrapeError, ScrapeRequest};
use crate::config::ScraperConfig;

/// Fetches and parses directory listings.
pub struct DirectoryScraper {
    client: Client,
}

impl DirectoryScraper {
    /// Creates a new scraper.
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `request.url` and returns the folders and files it lists.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<Contents, ScrapeError> {
        let url = parse_url(&request.url)?;

        let mut builder = self.client.get(url.clone());
        if let Some((username, password)) = request.credentials() {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let contents = parse_listing(&html);
        info!(
            "Scraped {}: {} folders, {} files",
            url,
            contents.folders.len(),
            contents.files.len()
        );
        Ok(contents)
    }
}

fn parse_url(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw.trim()).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => {
            debug!("Rejecting scrape of {} URL", other);
            Err(ScrapeError::InvalidUrl(format!(
                "unsupported scheme: {}",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("http://media.local/movies/").is_ok());
        assert!(parse_url(" https://media.local/ ").is_ok());
        assert!(matches!(
            parse_url("not a url"),
            Err(ScrapeError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_url("ftp://media.local/"),
            Err(ScrapeError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_scrape_rejects_invalid_url_without_request() {
        let scraper = DirectoryScraper::new(&ScraperConfig::default()).unwrap();
        let result = scraper.scrape(&ScrapeRequest::new("file:///etc")).await;
        assert!(matches!(result, Err(ScrapeError::InvalidUrl(_))));
    }
}
