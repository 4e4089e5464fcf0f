//! Upstream job board access
//!
//! Two capabilities are needed from the job board: listing candidate ids
//! page by page and fetching the raw JSON of one posting.
//! [`NoFluffJobsClient`] provides both over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};

/// Discovers posting ids
#[async_trait]
pub trait IdDiscovery: Send + Sync {
    /// Ids listed on one page; an empty page means the listing is exhausted
    async fn list_candidate_ids(&self, page: u32) -> Result<Vec<String>>;
}

/// Retrieves the raw JSON text of one posting
#[async_trait]
pub trait PostingFetcher: Send + Sync {
    async fn fetch_raw_document(&self, external_id: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct NoFluffJobsClient {
    client: Client,
    listing_url: String,
    api_url: String,
}

impl NoFluffJobsClient {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            listing_url: config.listing_url.clone(),
            api_url: config.api_url.clone(),
        })
    }

    pub fn listing_page_url(&self, page: u32) -> String {
        format!("{}{}", self.listing_url, page)
    }

    /// The API expects ids in upper case
    pub fn posting_url(&self, external_id: &str) -> String {
        format!("{}{}", self.api_url, external_id.to_uppercase())
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(IngestError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl IdDiscovery for NoFluffJobsClient {
    async fn list_candidate_ids(&self, page: u32) -> Result<Vec<String>> {
        let url = self.listing_page_url(page);
        let html = self.get_text(&url).await?;
        let ids = parse_listing_ids(&html)?;
        debug!(page, count = ids.len(), "Parsed listing page");
        Ok(ids)
    }
}

#[async_trait]
impl PostingFetcher for NoFluffJobsClient {
    async fn fetch_raw_document(&self, external_id: &str) -> Result<String> {
        let url = self.posting_url(external_id);
        self.get_text(&url).await
    }
}

/// Extract posting ids from a listing page
///
/// Postings are links carrying a `posting-list-item` class; the id is the
/// last `-`-separated segment of the link target
/// (`/pl/job/rust-developer-acme-warszawa-ab12cd34` -> `ab12cd34`).
/// Duplicates are dropped, first occurrence wins.
pub fn parse_listing_ids(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"a[class*="posting-list-item"]"#)
        .map_err(|e| IngestError::Html(e.to_string()))?;

    let mut ids: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(href) => href,
            None => continue,
        };

        let path = href.split(['?', '#']).next().unwrap_or(href).trim_end_matches('/');
        let id = match path.rsplit('-').next() {
            Some(id) if !id.is_empty() && !id.contains('/') => id,
            _ => continue,
        };

        if !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }

    Ok(ids)
}
