//! Error types surfaced by the weather client and the icon fetcher.
//!
//! Both enums carry owned strings instead of source errors so that they can be
//! cloned into a [`crate::session::Snapshot`] and compared in tests.

use thiserror::Error;

/// Failures of a single current-weather lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// The city name was empty or whitespace-only; no request was sent.
    #[error("Please enter a city name")]
    EmptyQuery,

    /// Transport failure: DNS, connect, TLS, timeout or a truncated body.
    #[error("Could not reach the weather service: {0}")]
    Network(String),

    /// The provider answered, but does not know the city.
    #[error("No matching location found for '{0}'")]
    NotFound(String),

    /// The provider rejected the API key.
    #[error("The weather service rejected the API key: {0}")]
    Unauthorized(String),

    /// Any other non-success answer from the provider.
    #[error("Weather request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The configured provider URL cannot be used to build a request.
    #[error("Invalid weather service URL: {0}")]
    InvalidBaseUrl(String),

    /// The response body did not have the expected shape.
    #[error("Unexpected response from the weather service: {0}")]
    Parse(String),
}

/// Failures of a single icon download.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("Invalid image URL '{0}'")]
    InvalidUrl(String),

    #[error("Could not download image: {0}")]
    Network(String),

    #[error("Image request failed with status {0}")]
    Status(u16),

    /// The bytes are not an image in a supported format.
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not save image: {0}")]
    Encode(String),
}

// `without_url` keeps the API key out of messages.
impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            WeatherError::Parse(err.to_string())
        } else {
            WeatherError::Network(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        ImageError::Network(err.without_url().to_string())
    }
}
