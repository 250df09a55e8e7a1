//! Core library for the `weather` service.
//!
//! This crate defines:
//! - The kelvin-normalized [`Temperature`] model
//! - The [`WeatherProvider`] capability and its concrete backends
//! - The concurrent [`Aggregator`] that averages readings across providers
//! - Configuration & credentials handling
//!
//! It is used by `weather-server`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;

pub use aggregator::Aggregator;
pub use config::{Config, ProviderConfig};
pub use error::{ProviderError, WeatherError};
pub use model::Temperature;
pub use provider::{ProviderId, WeatherProvider, providers_from_config};
