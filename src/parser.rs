//! JSON parser for the live-bus endpoint.
//!
//! The upstream answers with an array whose first element carries a `buses`
//! list; any further elements are ignored.

use chrono::DateTime;
use serde::Deserialize;

use crate::error::SourceError;
use crate::model::{BusPosition, LastStop, Route};

#[derive(Debug, Deserialize)]
struct LiveBusEnvelope {
    #[serde(default)]
    buses: Vec<RawBus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBus {
    id: String,
    route_short_name: String,
    route_name: Option<String>,
    latitude: f64,
    longitude: f64,
    direction: Option<String>,
    #[serde(default)]
    passengers: u32,
    last_stop_code: Option<String>,
    last_stop_name: Option<String>,
    /// Epoch milliseconds.
    timestamp: i64,
}

impl RawBus {
    fn into_position(self) -> Result<BusPosition, SourceError> {
        let updated_at = DateTime::from_timestamp_millis(self.timestamp).ok_or_else(|| {
            SourceError::Payload(format!(
                "bus {}: timestamp {} out of range",
                self.id, self.timestamp
            ))
        })?;

        let route = match self.route_name {
            Some(name) => Route::with_name(self.route_short_name, name),
            None => Route::new(self.route_short_name),
        };

        let last_stop = self.last_stop_code.map(|code| LastStop {
            code,
            name: self.last_stop_name,
        });

        Ok(BusPosition {
            id: self.id,
            route,
            latitude: self.latitude,
            longitude: self.longitude,
            direction: self.direction,
            passengers: self.passengers,
            last_stop,
            updated_at,
        })
    }
}

/// Decodes the live-bus payload into positions.
///
/// # Errors
///
/// Returns an error if the bytes are not JSON of the expected shape or a bus
/// carries a timestamp that cannot be represented.
pub fn parse_live_buses(bytes: &[u8]) -> Result<Vec<BusPosition>, SourceError> {
    let envelopes: Vec<LiveBusEnvelope> = serde_json::from_slice(bytes)?;

    let Some(first) = envelopes.into_iter().next() else {
        return Ok(Vec::new());
    };

    first
        .buses
        .into_iter()
        .map(RawBus::into_position)
        .collect()
}
