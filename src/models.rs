//! Data models for search filters and normalized news articles.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchFilters`]: What the user asked for (phrase, date range, image width)
//! - [`ImageSize`]: The fixed set of image width tokens the provider serves
//! - [`Article`]: One normalized, enriched search hit
//! - [`SearchResult`]: The complete ordered set of hits for a search
//!
//! Articles are produced once by the fetcher and never mutated afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Caption stored when the provider omits one for an article image.
pub const NO_CAPTION: &str = "No Caption";

/// Rejections raised while building [`SearchFilters`] from user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("search phrase must not be empty")]
    EmptyPhrase,

    #[error("unknown image width '{0}' (expected one of 60w,120w,240w,480w,960w,1080w,1200w,1920w)")]
    UnknownImageSize(String),
}

/// Image width token selecting which rendition of an article image to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "60w")]
    W60,
    #[serde(rename = "120w")]
    W120,
    #[serde(rename = "240w")]
    W240,
    #[serde(rename = "480w")]
    W480,
    #[serde(rename = "960w")]
    W960,
    #[default]
    #[serde(rename = "1080w")]
    W1080,
    #[serde(rename = "1200w")]
    W1200,
    #[serde(rename = "1920w")]
    W1920,
}

impl ImageSize {
    /// Every width the provider offers, smallest first.
    pub const ALL: [ImageSize; 8] = [
        ImageSize::W60,
        ImageSize::W120,
        ImageSize::W240,
        ImageSize::W480,
        ImageSize::W960,
        ImageSize::W1080,
        ImageSize::W1200,
        ImageSize::W1920,
    ];

    /// The rendition key used by the provider, e.g. `"1080w"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W60 => "60w",
            ImageSize::W120 => "120w",
            ImageSize::W240 => "240w",
            ImageSize::W480 => "480w",
            ImageSize::W960 => "960w",
            ImageSize::W1080 => "1080w",
            ImageSize::W1200 => "1200w",
            ImageSize::W1920 => "1920w",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        ImageSize::ALL
            .iter()
            .copied()
            .find(|size| size.as_str() == token)
            .ok_or_else(|| FilterError::UnknownImageSize(token.to_string()))
    }
}

/// The user's search request. Immutable once built.
///
/// A start date after the end date is accepted here; the provider decides
/// whether such a range is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFilters {
    phrase: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    image_size: ImageSize,
}

impl SearchFilters {
    /// Build filters, trimming the phrase and rejecting an empty one.
    pub fn new(
        phrase: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        image_size: ImageSize,
    ) -> Result<Self, FilterError> {
        let phrase = phrase.into().trim().to_string();
        if phrase.is_empty() {
            return Err(FilterError::EmptyPhrase);
        }
        Ok(Self {
            phrase,
            start_date,
            end_date,
            image_size,
        })
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    /// `true` when the range runs backwards.
    pub fn is_inverted(&self) -> bool {
        self.start_date > self.end_date
    }
}

/// A normalized news article with derived text metrics.
///
/// Field order matches the report columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Provider-unique identifier.
    pub id: String,
    /// Absolute article URL.
    pub url: String,
    pub title: String,
    pub headline: String,
    pub description: String,
    pub published_at: String,
    pub updated_at: String,
    /// Image rendition at the requested width.
    pub image_url: String,
    /// Fixed 120px square rendition.
    pub thumbnail_url: String,
    pub image_caption: String,
    /// Case-insensitive occurrences of the search phrase in title + description.
    pub phrase_count: usize,
    /// Whether title or description mentions a dollar amount.
    pub contains_money: bool,
}

/// The complete, provider-ordered result of a search.
///
/// `articles.len() == total_size` whenever a fetch completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub articles: Vec<Article>,
    pub total_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_image_size_round_trips_tokens() {
        for size in ImageSize::ALL {
            assert_eq!(size.as_str().parse::<ImageSize>().unwrap(), size);
        }
        assert_eq!(ImageSize::default(), ImageSize::W1080);
    }

    #[test]
    fn test_image_size_rejects_unknown_token() {
        assert_eq!(
            "100w".parse::<ImageSize>(),
            Err(FilterError::UnknownImageSize("100w".to_string()))
        );
    }

    #[test]
    fn test_filters_trim_phrase() {
        let filters = SearchFilters::new(
            "  coffee  ",
            date("2024-06-30"),
            date("2024-07-02"),
            ImageSize::W480,
        )
        .unwrap();
        assert_eq!(filters.phrase(), "coffee");
        assert_eq!(filters.image_size(), ImageSize::W480);
        assert!(!filters.is_inverted());
    }

    #[test]
    fn test_filters_reject_blank_phrase() {
        let err = SearchFilters::new("   ", date("2024-06-30"), date("2024-07-02"), ImageSize::W60)
            .unwrap_err();
        assert_eq!(err, FilterError::EmptyPhrase);
    }

    #[test]
    fn test_filters_accept_inverted_range() {
        let filters =
            SearchFilters::new("tea", date("2024-07-02"), date("2024-06-30"), ImageSize::W60)
                .unwrap();
        assert!(filters.is_inverted());
    }

    #[test]
    fn test_article_serialization_uses_snake_case_fields() {
        let article = Article {
            id: "ABC".to_string(),
            url: "https://www.reuters.com/world/abc".to_string(),
            title: "Coffee prices".to_string(),
            headline: "Coffee".to_string(),
            description: "Up $5".to_string(),
            published_at: "2024-07-01T10:00:00Z".to_string(),
            updated_at: "2024-07-01T11:00:00Z".to_string(),
            image_url: "https://img/1080".to_string(),
            thumbnail_url: "https://img/sq120".to_string(),
            image_caption: NO_CAPTION.to_string(),
            phrase_count: 1,
            contains_money: true,
        };

        let json = serde_json::to_string(&article).unwrap();
        assert!(json.contains("\"phrase_count\":1"));
        assert!(json.contains("\"contains_money\":true"));
    }
}
