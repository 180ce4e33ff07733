use crate::{
    Config, WeatherError, WeatherQuery, WeatherResult, provider::weatherapi::WeatherApiClient,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod weatherapi;

/// Looks up current conditions for one city per call.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_current_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<WeatherResult, WeatherError>;
}

/// Construct the WeatherAPI.com client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherClient>> {
    let api_key = config.api_key()?;
    let base_url = config.validated_base_url()?;

    let client = WeatherApiClient::new(api_key.to_owned())
        .with_base_url(base_url)
        .with_http_client(config.http_client()?);

    Ok(Arc::new(client))
}
