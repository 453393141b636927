//! Paginated article search against the Reuters content API.
//!
//! The fetcher turns [`SearchFilters`] into one or more page requests,
//! validates each response, and maps every raw record into an [`Article`]
//! enriched by [`crate::analysis`].
//!
//! # Request Shape
//!
//! ```text
//! GET {site_url}{search_path}?query={"end_date":..,"keyword":..,"offset":"0",..}&d=201&_website=reuters
//! ```
//!
//! Pages are requested strictly one after another. The run succeeds only
//! when every article the provider reported has been retrieved and mapped.

use crate::analysis::{contains_currency, count_occurrences};
use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::models::{Article, NO_CAPTION, SearchFilters, SearchResult};
use crate::utils::truncate_for_log;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Records requested per page.
pub const PAGE_SIZE: usize = 100;

const SUCCESS_MESSAGE: &str = "Success";
const SORT_ORDER: &str = "display_date:desc";
const THUMBNAIL_WIDTH: &str = "120w";

/// How a search that reached the provider without a hard failure ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Every reported article was retrieved.
    Found(SearchResult),
    /// The provider matched nothing.
    NoResults,
}

/// The JSON object sent in the `query` parameter. Numbers travel as strings.
#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    end_date: String,
    keyword: &'a str,
    offset: String,
    orderby: &'static str,
    size: String,
    start_date: String,
    website: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    message: String,
    #[serde(default)]
    result: Option<SearchPayload>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    pagination: Pagination,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total_size: usize,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    id: String,
    canonical_url: String,
    title: String,
    basic_headline: String,
    description: String,
    published_time: String,
    updated_time: String,
    #[serde(default)]
    thumbnail: Option<RawThumbnail>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    renditions: Renditions,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Renditions {
    original: HashMap<String, String>,
    square: HashMap<String, String>,
}

/// One validated page of raw records.
struct Page {
    total_size: usize,
    articles: Vec<RawArticle>,
}

/// Client for the provider's article search endpoint.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    http: reqwest::Client,
    config: ProviderConfig,
    site: Url,
}

impl ArticleFetcher {
    pub fn new(config: ProviderConfig) -> Result<Self, FetchError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: ProviderConfig) -> Result<Self, FetchError> {
        let site = Url::parse(&config.site_url)?;
        Ok(Self { http, config, site })
    }

    /// Retrieve every article matching `filters`, in provider order.
    ///
    /// Returns [`FetchOutcome::NoResults`] when the provider reports zero
    /// matches. Any [`FetchError`] means nothing usable was collected.
    #[instrument(level = "info", skip_all, fields(phrase = %filters.phrase(), start = %filters.start_date(), end = %filters.end_date()))]
    pub async fn fetch_all(&self, filters: &SearchFilters) -> Result<FetchOutcome, FetchError> {
        info!(
            "Getting the news from {} until {}. Searching for '{}'",
            filters.start_date(),
            filters.end_date(),
            filters.phrase()
        );
        if filters.is_inverted() {
            warn!("Start date is after end date; leaving validation to the provider");
        }

        let mut articles: Vec<Article> = Vec::new();
        let mut offset = 0usize;
        let mut total: Option<usize> = None;

        loop {
            let page = self.fetch_page(filters, offset).await?;
            let total_size = *total.get_or_insert(page.total_size);
            if total_size == 0 {
                info!("The search returned 0 results");
                return Ok(FetchOutcome::NoResults);
            }

            let received = page.articles.len();
            for raw in page.articles {
                articles.push(self.map_article(raw, filters)?);
            }
            offset += received;
            debug!(offset, received, total_size, "Page mapped");

            if offset >= total_size {
                if offset > total_size {
                    warn!(offset, total_size, "Provider returned more articles than reported; truncating");
                    articles.truncate(total_size);
                }
                info!(count = articles.len(), "Retrieved all articles");
                return Ok(FetchOutcome::Found(SearchResult {
                    articles,
                    total_size,
                }));
            }
            if received < PAGE_SIZE {
                warn!(offset, total_size, received, "Short page before reaching the reported total");
                return Err(FetchError::Incomplete {
                    fetched: offset,
                    total: total_size,
                });
            }
        }
    }

    /// Request and validate the page starting at `offset`.
    #[instrument(level = "debug", skip(self, filters))]
    async fn fetch_page(&self, filters: &SearchFilters, offset: usize) -> Result<Page, FetchError> {
        let query = SearchQuery {
            end_date: filters.end_date().format("%Y-%m-%d").to_string(),
            keyword: filters.phrase(),
            offset: offset.to_string(),
            orderby: SORT_ORDER,
            size: PAGE_SIZE.to_string(),
            start_date: filters.start_date().format("%Y-%m-%d").to_string(),
            website: &self.config.website,
        };
        let query = serde_json::to_string(&query)?;
        let endpoint = self.site.join(&self.config.search_path)?;
        let deployment = self.config.deployment.to_string();

        let body = self
            .http
            .get(endpoint)
            .query(&[
                ("query", query.as_str()),
                ("d", deployment.as_str()),
                ("_website", self.config.website.as_str()),
            ])
            .send()
            .await?
            .text()
            .await?;

        let response: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, body = %truncate_for_log(&body, 300), "Undecodable provider response");
            e
        })?;

        if response.message != SUCCESS_MESSAGE {
            warn!(message = %response.message, offset, "Provider rejected the search");
            return Err(FetchError::ProviderStatus(response.message));
        }
        let payload = response.result.ok_or(FetchError::MissingResult)?;

        debug!(
            offset,
            total_size = payload.pagination.total_size,
            count = payload.articles.len(),
            "Fetched page"
        );
        Ok(Page {
            total_size: payload.pagination.total_size,
            articles: payload.articles,
        })
    }

    /// Resolve `canonical_url` against the site URL (RFC 3986 reference
    /// resolution). Results that leave the site's origin are rejected.
    fn article_url(&self, article_id: &str, canonical_url: &str) -> Result<String, FetchError> {
        let url = self.site.join(canonical_url)?;
        if url.origin() != self.site.origin() {
            return Err(FetchError::ForeignArticleUrl {
                article_id: article_id.to_string(),
                url: url.to_string(),
            });
        }
        Ok(url.to_string())
    }

    fn map_article(&self, raw: RawArticle, filters: &SearchFilters) -> Result<Article, FetchError> {
        let width = filters.image_size().as_str();
        let missing = |rendition: &'static str, width: &str| FetchError::MissingRendition {
            article_id: raw.id.clone(),
            rendition,
            width: width.to_string(),
        };

        let thumbnail = raw.thumbnail.as_ref().ok_or_else(|| missing("original", width))?;
        let image_url = thumbnail
            .renditions
            .original
            .get(width)
            .cloned()
            .ok_or_else(|| missing("original", width))?;
        let thumbnail_url = thumbnail
            .renditions
            .square
            .get(THUMBNAIL_WIDTH)
            .cloned()
            .ok_or_else(|| missing("square", THUMBNAIL_WIDTH))?;
        let image_caption = thumbnail
            .caption
            .clone()
            .unwrap_or_else(|| NO_CAPTION.to_string());
        let url = self.article_url(&raw.id, &raw.canonical_url)?;

        let phrase = filters.phrase();
        let phrase_count =
            count_occurrences(phrase, &raw.title) + count_occurrences(phrase, &raw.description);
        let contains_money = contains_currency(&raw.title) || contains_currency(&raw.description);

        Ok(Article {
            id: raw.id,
            url,
            title: raw.title,
            headline: raw.basic_headline,
            description: raw.description,
            published_at: raw.published_time,
            updated_at: raw.updated_time,
            image_url,
            thumbnail_url,
            image_caption,
            phrase_count,
            contains_money,
        })
    }
}
