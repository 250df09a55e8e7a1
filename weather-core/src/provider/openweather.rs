use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{ProviderError, truncate_body},
    model::Temperature,
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// OpenWeather current conditions. Requested without a `units` parameter,
/// so the API answers in kelvin.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn name(&self) -> &str {
        "openweather"
    }

    async fn temperature(&self, city: &str) -> Result<Temperature, ProviderError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;
        let temp = Temperature::from_kelvin(parsed.main.temp);

        tracing::debug!(provider = self.name(), city, kelvin = temp.kelvin(), "reading received");
        Ok(temp)
    }
}
