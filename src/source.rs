//! Transit data sources: where live bus positions come from.

use tracing::debug;

use crate::error::SourceError;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::model::{BusPosition, Route};
use crate::parser::parse_live_buses;

/// Synchronous provider of the current bus positions for a route.
///
/// Calls block for the duration of the network round trip and must be made
/// off any latency-sensitive thread.
pub trait TransitDataSource: Send + Sync {
    fn fetch_bus_positions(&self, route: &Route) -> Result<Vec<BusPosition>, SourceError>;
}

/// Fetches positions from the route-scoped live-bus HTTP endpoint.
pub struct LiveBusSource<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> LiveBusSource<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Builds `<base_url>/buses?routeShortName=<route>`.
    pub fn endpoint(&self, route: &Route) -> Result<reqwest::Url, SourceError> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = reqwest::Url::parse(&format!("{base}/buses"))
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("routeShortName", &route.short_name);
        Ok(url)
    }
}

impl<C: HttpClient> TransitDataSource for LiveBusSource<C> {
    #[tracing::instrument(skip_all, fields(route = %route))]
    fn fetch_bus_positions(&self, route: &Route) -> Result<Vec<BusPosition>, SourceError> {
        let url = self.endpoint(route)?;
        let bytes = fetch_bytes(&self.client, url.as_str())?;
        debug!(bytes = bytes.len(), "Live bus payload received, parsing");
        parse_live_buses(&bytes)
    }
}
