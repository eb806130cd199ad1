use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{BusPosition, Route};

/// Summary of one batch of bus positions for a route.
#[derive(Debug, Default, Serialize)]
pub struct FleetStats {
    pub timestamp: DateTime<Utc>,
    pub route: String,
    pub buses: usize,
    pub total_passengers: u64,
    pub max_passengers: u32,

    // freshness
    pub oldest_update: Option<DateTime<Utc>>,
    pub newest_update: Option<DateTime<Utc>>,
}

impl FleetStats {
    pub fn from_positions(route: &Route, positions: &[BusPosition]) -> Self {
        let mut s = FleetStats {
            timestamp: Utc::now(),
            route: route.short_name.clone(),
            buses: positions.len(),
            ..Default::default()
        };

        for p in positions {
            s.total_passengers += u64::from(p.passengers);
            s.max_passengers = s.max_passengers.max(p.passengers);
            s.oldest_update = Some(s.oldest_update.map_or(p.updated_at, |t| t.min(p.updated_at)));
            s.newest_update = Some(s.newest_update.map_or(p.updated_at, |t| t.max(p.updated_at)));
        }

        s
    }

    pub fn mean_passengers(&self) -> f64 {
        if self.buses == 0 {
            0.0
        } else {
            self.total_passengers as f64 / self.buses as f64
        }
    }

    /// Age of the stalest position relative to when the stats were taken.
    pub fn max_staleness(&self) -> Option<chrono::Duration> {
        self.oldest_update.map(|t| self.timestamp - t)
    }
}
