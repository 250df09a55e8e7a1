//! HTTP front end for the aggregator.
//!
//! Each [`Server`] owns its aggregator and builds its own router, so several
//! instances can coexist in one process.

use std::{future::Future, sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use weather_core::{Aggregator, Temperature, WeatherError};

/// Successful `/weather/{city}` payload.
#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    pub city: String,
    /// Kelvin.
    pub temp: Temperature,
    pub took: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub providers: Vec<String>,
}

/// Aggregate failures are reported as 500 with the message verbatim.
#[derive(Debug)]
pub struct AppError(WeatherError);

impl From<WeatherError> for AppError {
    fn from(err: WeatherError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct Server {
    aggregator: Arc<Aggregator>,
}

impl Server {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self { aggregator }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/weather/{*city}", get(weather))
            .route("/health", get(health))
            .with_state(Arc::clone(&self.aggregator))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

async fn weather(
    State(aggregator): State<Arc<Aggregator>>,
    Path(city): Path<String>,
) -> Result<Json<WeatherResponse>, AppError> {
    let begin = Instant::now();

    let temp = aggregator.temperature(&city).await?;
    let took = format!("{:?}", begin.elapsed());

    tracing::info!(city = %city, kelvin = temp.kelvin(), took = %took, "temperature served");

    Ok(Json(WeatherResponse { city, temp, took }))
}

async fn health(State(aggregator): State<Arc<Aggregator>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        providers: aggregator.provider_names().into_iter().map(str::to_owned).collect(),
    })
}
