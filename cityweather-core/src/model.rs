use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A validated city name to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    city: String,
}

impl WeatherQuery {
    /// Trims `city` and rejects empty input before any request is made.
    pub fn new(city: &str) -> Result<Self, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }

        Ok(Self { city: city.to_string() })
    }

    pub fn city(&self) -> &str {
        &self.city
    }
}

/// The values shown on the weather card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub condition: String,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Apparent temperature in °C.
    pub feels_like: f64,
    /// Icon URL exactly as the provider sent it, usually protocol-relative.
    pub icon_url: String,
}

impl CurrentWeather {
    /// Icon URL with a scheme, ready to fetch. `None` when the provider sent no
    /// icon or one that is not an absolute http(s) URL.
    pub fn resolved_icon_url(&self) -> Option<String> {
        resolve_icon_url(&self.icon_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub country: String,
    /// Local time at the location, as formatted by the provider.
    pub localtime: Option<String>,
}

impl Location {
    /// "London, United Kingdom", or just the name when the country is missing.
    pub fn display_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

/// A parsed current-weather response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub location: Location,
    pub current: CurrentWeather,
    pub humidity_pct: u8,
    pub wind_kph: f64,
    pub wind_dir: String,
    pub is_day: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Only absolute `http`/`https` URLs are worth fetching.
fn resolve_icon_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = match raw.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => raw.to_string(),
    };

    let url = Url::parse(&candidate).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(candidate)
}
