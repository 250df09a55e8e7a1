use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{ProviderError, truncate_body},
    model::Temperature,
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn name(&self) -> &str {
        "weatherapi"
    }

    async fn temperature(&self, city: &str) -> Result<Temperature, ProviderError> {
        let url = format!("{}/v1/current.json", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", city)])
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

        let parsed: WaResponse = serde_json::from_str(&body)?;
        // Celsius on the wire
        let temp = Temperature::from_celsius(parsed.current.temp_c);

        tracing::debug!(provider = self.name(), city, kelvin = temp.kelvin(), "reading received");
        Ok(temp)
    }
}
