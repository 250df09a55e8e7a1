use serde::{Deserialize, Serialize};
use std::fmt;

const CELSIUS_OFFSET: f64 = 273.15;

/// A temperature reading, always stored in kelvin.
///
/// Every provider converts its native unit through one of the constructors
/// below, so values crossing the aggregator boundary are comparable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub const fn from_kelvin(kelvin: f64) -> Self {
        Self(kelvin)
    }

    pub fn from_celsius(celsius: f64) -> Self {
        Self(celsius + CELSIUS_OFFSET)
    }

    pub fn from_fahrenheit(fahrenheit: f64) -> Self {
        Self((fahrenheit - 32.0) * 5.0 / 9.0 + CELSIUS_OFFSET)
    }

    pub const fn kelvin(self) -> f64 {
        self.0
    }

    pub fn celsius(self) -> f64 {
        self.0 - CELSIUS_OFFSET
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} K", self.0)
    }
}
