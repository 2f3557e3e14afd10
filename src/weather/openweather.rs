//! OpenWeatherMap client — direct geocoding and current weather.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{Coordinates, WeatherService};
use crate::error::WeatherError;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// One entry of the `/geo/1.0/direct` response.
#[derive(Debug, Deserialize)]
struct GeoEntry {
    lat: f64,
    lon: f64,
}

/// The subset of `/data/2.5/weather` we read.
#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: CurrentWeatherMain,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherMain {
    temp: f64,
}

/// OpenWeatherMap API client.
pub struct OpenWeatherClient {
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host (self-hosted proxy, tests).
    pub fn with_base_url(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn geocode_url(&self) -> String {
        format!("{}/geo/1.0/direct", self.base_url)
    }

    fn weather_url(&self) -> String {
        format!("{}/data/2.5/weather", self.base_url)
    }
}

/// Map non-success statuses to `WeatherError`. 401 gets its own variant so
/// the user sees "Invalid API key" rather than a bare status code.
fn check_status(status: StatusCode) -> Result<(), WeatherError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(WeatherError::InvalidApiKey);
    }
    if !status.is_success() {
        return Err(WeatherError::BadStatus {
            status: status.as_u16(),
        });
    }
    Ok(())
}

fn first_coordinates(entries: Vec<GeoEntry>) -> Result<Coordinates, WeatherError> {
    entries
        .into_iter()
        .next()
        .map(|e| Coordinates {
            lat: e.lat,
            lon: e.lon,
        })
        .ok_or(WeatherError::CityNotFound)
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn geocode(&self, city: &str) -> Result<Coordinates, WeatherError> {
        let resp = self
            .client
            .get(self.geocode_url())
            .query(&[
                ("q", city),
                ("limit", "1"),
                ("appid", self.api_key.expose_secret()),
            ])
            .send()
            .await?;

        check_status(resp.status())?;

        let entries: Vec<GeoEntry> = resp
            .json()
            .await
            .map_err(|e| WeatherError::MalformedResponse(e.to_string()))?;

        let coords = first_coordinates(entries)?;
        tracing::debug!(city = %city, lat = coords.lat, lon = coords.lon, "Geocoded city");
        Ok(coords)
    }

    async fn current_temperature(&self, coords: Coordinates) -> Result<f64, WeatherError> {
        let resp = self
            .client
            .get(self.weather_url())
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("appid", self.api_key.expose_secret().to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        check_status(resp.status())?;

        let body: CurrentWeatherResponse = resp
            .json()
            .await
            .map_err(|e| WeatherError::MalformedResponse(e.to_string()))?;

        Ok(body.main.temp)
    }
}
