//! Device position and reverse geocoding seams.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::domain::Coordinates;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Stored in place of an address when the geocoder cannot resolve one.
pub const UNRESOLVED_ADDRESS: &str = "No se pudo obtener la dirección";

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const GEOCODE_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, ClientError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, coords: Coordinates) -> Result<String, ClientError>;
}

/// Position supplied up front (flags, tests). `None` behaves like a device
/// whose location permission was refused.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Option<Coordinates>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, ClientError> {
        let coords = self
            .0
            .ok_or_else(|| ClientError::PermissionDenied("la ubicación".into()))?;
        if !coords.is_valid() {
            return Err(ClientError::Validation(vec!["coordinates".into()]));
        }
        Ok(coords)
    }
}

/// Renders the coordinate itself; used when no geocoding key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateGeocoder;

#[async_trait]
impl Geocoder for CoordinateGeocoder {
    async fn reverse(&self, coords: Coordinates) -> Result<String, ClientError> {
        Ok(format!("{:.5}, {:.5}", coords.latitude, coords.longitude))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

pub struct GoogleGeocoder {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_endpoint(GOOGLE_GEOCODE_URL, api_key)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(GEOCODE_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build geocoding client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn reverse(&self, coords: Coordinates) -> Result<String, ClientError> {
        let response: GeocodeResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("latlng", coords.to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "OK" {
            return Err(ClientError::InvalidResponse(format!(
                "geocoding status {}: {}",
                response.status,
                response.error_message.unwrap_or_default()
            )));
        }
        response
            .results
            .into_iter()
            .next()
            .map(|result| result.formatted_address)
            .ok_or_else(|| ClientError::NotFound(format!("address for {coords}")))
    }
}

/// Resolves an address for a dropped pin; failures degrade to a placeholder
/// so the form stays usable.
pub async fn resolve_address(geocoder: &dyn Geocoder, coords: Coordinates) -> String {
    match geocoder.reverse(coords).await {
        Ok(address) => {
            debug!(%coords, %address, "resolved pin address");
            address
        }
        Err(err) => {
            warn!(%coords, error = %err, "reverse geocoding failed");
            UNRESOLVED_ADDRESS.to_string()
        }
    }
}

#[cfg(test)]
#[path = "tests/location_tests.rs"]
mod tests;
