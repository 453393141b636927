use thiserror::Error;

/// Hard failures of a search run. Any of these aborts the run before a
/// report is written.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The provider answered with a status other than `"Success"`.
    #[error("{0}")]
    ProviderStatus(String),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Provider reported success without a result payload")]
    MissingResult,

    #[error("Invalid article URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Article {article_id} points off-site: {url}")]
    ForeignArticleUrl { article_id: String, url: String },

    #[error("Article {article_id} has no '{rendition}' rendition at {width}")]
    MissingRendition {
        article_id: String,
        rendition: &'static str,
        width: String,
    },

    #[error("Provider stopped after {fetched} of {total} articles")]
    Incomplete { fetched: usize, total: usize },
}

impl FetchError {
    /// `true` when the provider itself rejected the search; its message is
    /// shown to the user verbatim instead of a generic notice.
    pub fn is_provider_rejection(&self) -> bool {
        matches!(self, FetchError::ProviderStatus(_))
    }
}

/// Non-2xx answer from the chat completions endpoint.
#[derive(Error, Debug)]
#[error("chat API error ({status}): {body}")]
pub struct ChatApiError {
    pub status: reqwest::StatusCode,
    pub body: String,
}

impl ChatApiError {
    /// Client errors other than 429 fail the same way on every retry.
    pub fn is_permanent(&self) -> bool {
        self.status.is_client_error() && self.status != reqwest::StatusCode::TOO_MANY_REQUESTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_provider_status_passes_message_through() {
        let err = FetchError::ProviderStatus("Invalid date range".to_string());
        assert_eq!(err.to_string(), "Invalid date range");
        assert!(err.is_provider_rejection());
    }

    #[test]
    fn test_missing_rendition_message() {
        let err = FetchError::MissingRendition {
            article_id: "XYZ".to_string(),
            rendition: "original",
            width: "1920w".to_string(),
        };
        assert_eq!(err.to_string(), "Article XYZ has no 'original' rendition at 1920w");
        assert!(!err.is_provider_rejection());
    }

    #[test]
    fn test_incomplete_message() {
        let err = FetchError::Incomplete { fetched: 180, total: 250 };
        assert_eq!(err.to_string(), "Provider stopped after 180 of 250 articles");
    }

    #[test]
    fn test_chat_api_error_permanence() {
        let err = |status| ChatApiError {
            status,
            body: String::new(),
        };
        assert!(err(StatusCode::UNAUTHORIZED).is_permanent());
        assert!(err(StatusCode::BAD_REQUEST).is_permanent());
        assert!(!err(StatusCode::TOO_MANY_REQUESTS).is_permanent());
        assert!(!err(StatusCode::INTERNAL_SERVER_ERROR).is_permanent());
        assert!(!err(StatusCode::BAD_GATEWAY).is_permanent());
    }
}
