//! Weather lookup — city geocoding and current temperature.
//!
//! The tracker only needs two questions answered: where is this city, and
//! how warm is it there right now. `OpenWeatherClient` answers both against
//! the OpenWeatherMap API; tests substitute stubs.

pub mod openweather;

pub use openweather::OpenWeatherClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Geographic coordinates of a resolved city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Geocoding and current-weather collaborator.
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Resolve a free-form city name to coordinates.
    async fn geocode(&self, city: &str) -> Result<Coordinates, WeatherError>;

    /// Current air temperature in °C at the given coordinates.
    async fn current_temperature(&self, coords: Coordinates) -> Result<f64, WeatherError>;
}
