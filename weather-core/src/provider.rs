use crate::{
    Config, Temperature,
    error::ProviderError,
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug, sync::Arc, time::Duration};

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// A source of temperature readings for a city.
///
/// Implementations issue exactly one outbound request per call and return the
/// reading in kelvin. Retries are not performed at this layer.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    async fn temperature(&self, city: &str) -> Result<Temperature, ProviderError>;
}

/// Build the HTTP client shared by providers created from `config`.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build().context("Failed to build HTTP client")
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    http: Client,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider_config = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weather configure {id}` and enter your API key."
        )
    })?;

    let api_key = provider_config.api_key.clone();
    let base_url = provider_config.base_url.as_deref();

    let provider: Arc<dyn WeatherProvider> = match id {
        ProviderId::OpenWeather => {
            let p = OpenWeatherProvider::with_client(api_key, http);
            Arc::new(match base_url {
                Some(url) => p.with_base_url(url),
                None => p,
            })
        }
        ProviderId::WeatherApi => {
            let p = WeatherApiProvider::with_client(api_key, http);
            Arc::new(match base_url {
                Some(url) => p.with_base_url(url),
                None => p,
            })
        }
    };

    Ok(provider)
}

/// Construct every configured provider, in `ProviderId::all()` order.
///
/// Returns an empty vector when nothing is configured; the aggregator rejects that.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Vec<Arc<dyn WeatherProvider>>> {
    for name in config.unknown_providers() {
        tracing::warn!(provider = name, "ignoring unknown provider in configuration");
    }

    let http = http_client(config)?;
    config
        .configured_providers()
        .into_iter()
        .map(|id| provider_from_config(id, config, http.clone()))
        .collect()
}
