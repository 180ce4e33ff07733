use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    config::DEFAULT_BASE_URL,
    error::WeatherError,
    model::{CurrentWeather, Location, WeatherQuery, WeatherResult},
};

use super::WeatherClient;

/// WeatherAPI.com error code for an unknown location.
const NO_MATCHING_LOCATION: u32 = 1006;
/// Key not provided, key invalid, key disabled.
const KEY_ERRORS: [u32; 3] = [1002, 2006, 2008];

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Request URL for `city`. The same city always yields the same URL.
    pub fn current_weather_url(&self, city: &str) -> Result<Url, WeatherError> {
        let endpoint = format!("{}/current.json", self.base_url);

        Url::parse_with_params(
            &endpoint,
            &[("key", self.api_key.as_str()), ("q", city), ("aqi", "no")],
        )
        .map_err(|e| WeatherError::InvalidBaseUrl(format!("'{endpoint}': {e}")))
    }
}

#[async_trait]
impl WeatherClient for WeatherApiClient {
    #[instrument(skip(self, query), fields(city = %query.city()))]
    async fn fetch_current_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<WeatherResult, WeatherError> {
        let url = self.current_weather_url(query.city())?;
        debug!(url = %redact_key(&url), "Fetching current weather");

        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let err = classify_failure(status, &body, query.city());
            warn!(%status, error = %err, "WeatherAPI request failed");
            return Err(err);
        }

        parse_current(&body)
    }
}

fn parse_current(body: &str) -> Result<WeatherResult, WeatherError> {
    let parsed: WaResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let condition = parsed.current.condition.text.trim().to_string();
    if condition.is_empty() {
        return Err(WeatherError::Parse("condition text is empty".to_string()));
    }

    let last_updated =
        parsed.current.last_updated_epoch.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

    Ok(WeatherResult {
        location: Location {
            name: parsed.location.name,
            region: parsed.location.region,
            country: parsed.location.country,
            localtime: parsed.location.localtime,
        },
        current: CurrentWeather {
            condition,
            temperature: parsed.current.temp_c,
            feels_like: parsed.current.feelslike_c,
            icon_url: parsed.current.condition.icon,
        },
        humidity_pct: parsed.current.humidity,
        wind_kph: parsed.current.wind_kph,
        wind_dir: parsed.current.wind_dir,
        is_day: parsed.current.is_day == 1,
        last_updated,
    })
}

fn classify_failure(status: StatusCode, body: &str, city: &str) -> WeatherError {
    let envelope = serde_json::from_str::<WaErrorEnvelope>(body).ok().map(|e| e.error);
    let code = envelope.as_ref().map(|e| e.code);

    let message = match envelope {
        Some(e) if !e.message.is_empty() => e.message,
        _ if !body.trim().is_empty() => truncate_body(body),
        _ => status.canonical_reason().unwrap_or("no details").to_string(),
    };

    match (status, code) {
        (_, Some(NO_MATCHING_LOCATION)) | (StatusCode::NOT_FOUND, _) => {
            WeatherError::NotFound(city.to_string())
        }
        (_, Some(c)) if KEY_ERRORS.contains(&c) => WeatherError::Unauthorized(message),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            WeatherError::Unauthorized(message)
        }
        _ => WeatherError::Api { status: status.as_u16(), message },
    }
}

/// Copy of `url` that is safe to log.
fn redact_key(url: &Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    localtime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    #[serde(default)]
    wind_dir: String,
    is_day: u8,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    code: u32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct WaErrorEnvelope {
    error: WaErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: &str = r#"{
        "location": {
            "name": "London",
            "region": "City of London, Greater London",
            "country": "United Kingdom",
            "localtime_epoch": 1700000000,
            "localtime": "2023-11-14 22:13"
        },
        "current": {
            "last_updated_epoch": 1699999200,
            "temp_c": 14.0,
            "is_day": 0,
            "condition": { "text": "Cloudy", "icon": "//cdn/64.png", "code": 1006 },
            "wind_kph": 13.0,
            "wind_dir": "SW",
            "humidity": 82,
            "feelslike_c": 12.5
        }
    }"#;

    #[test]
    fn parses_current_response() {
        let result = parse_current(LONDON).expect("valid body");

        assert_eq!(result.current.condition, "Cloudy");
        assert_eq!(result.current.temperature, 14.0);
        assert_eq!(result.current.feels_like, 12.5);
        assert_eq!(result.current.icon_url, "//cdn/64.png");
        assert_eq!(result.location.name, "London");
        assert_eq!(result.humidity_pct, 82);
        assert_eq!(result.wind_dir, "SW");
        assert!(!result.is_day);
        assert_eq!(result.last_updated.map(|t| t.timestamp()), Some(1699999200));
    }

    #[test]
    fn missing_field_is_parse_error() {
        let body = LONDON.replace("\"feelslike_c\": 12.5", "\"feelslike_f\": 54.5");
        assert!(matches!(parse_current(&body), Err(WeatherError::Parse(_))));
    }

    #[test]
    fn mistyped_field_is_parse_error() {
        let body = LONDON.replace("\"temp_c\": 14.0", "\"temp_c\": \"warm\"");
        assert!(matches!(parse_current(&body), Err(WeatherError::Parse(_))));
    }

    #[test]
    fn empty_condition_is_parse_error() {
        let body = LONDON.replace("\"text\": \"Cloudy\"", "\"text\": \" \"");
        assert!(matches!(parse_current(&body), Err(WeatherError::Parse(_))));
    }

    #[test]
    fn unknown_location_code_is_not_found() {
        let body = r#"{"error":{"code":1006,"message":"No matching location found."}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body, "Atlantis");
        assert_eq!(err, WeatherError::NotFound("Atlantis".into()));
    }

    #[test]
    fn http_404_is_not_found() {
        let err = classify_failure(StatusCode::NOT_FOUND, "", "Atlantis");
        assert_eq!(err, WeatherError::NotFound("Atlantis".into()));
    }

    #[test]
    fn key_errors_are_unauthorized() {
        let body = r#"{"error":{"code":2006,"message":"API key provided is invalid"}}"#;
        let err = classify_failure(StatusCode::UNAUTHORIZED, body, "London");
        assert_eq!(err, WeatherError::Unauthorized("API key provided is invalid".into()));

        let err = classify_failure(StatusCode::FORBIDDEN, "", "London");
        assert_eq!(err, WeatherError::Unauthorized("Forbidden".into()));
    }

    #[test]
    fn other_failures_keep_status_and_truncated_body() {
        let body = "x".repeat(500);
        let err = classify_failure(StatusCode::BAD_GATEWAY, &body, "London");

        match err {
            WeatherError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), 203);
                assert!(message.ends_with("..."));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn url_escapes_city_and_is_stable() {
        let client = WeatherApiClient::new("KEY".into()).with_base_url("http://localhost/v1/");

        let first = client.current_weather_url("São Paulo & Co").unwrap();
        let second = client.current_weather_url("São Paulo & Co").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.path(), "/v1/current.json");

        let pairs: Vec<(String, String)> =
            first.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert!(pairs.contains(&("key".into(), "KEY".into())));
        assert!(pairs.contains(&("q".into(), "São Paulo & Co".into())));
        assert!(!first.as_str().contains(' '));
        assert!(!first.as_str().contains("& Co"));
    }

    #[test]
    fn malformed_base_url_is_not_a_network_error() {
        let client = WeatherApiClient::new("KEY".into()).with_base_url("nonsense");

        let err = client.current_weather_url("London").unwrap_err();
        assert!(matches!(err, WeatherError::InvalidBaseUrl(_)), "got {err:?}");
    }

    #[test]
    fn redacted_url_hides_key() {
        let client = WeatherApiClient::new("SECRET".into());
        let url = client.current_weather_url("London").unwrap();

        let redacted = redact_key(&url).to_string();
        assert!(!redacted.contains("SECRET"));
        assert!(redacted.contains("q=London"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(300);
        let out = truncate_body(&body);
        assert_eq!(out.chars().count(), 203);
    }
}
