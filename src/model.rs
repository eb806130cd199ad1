//! Core data types: routes and live bus positions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named bus line.
///
/// Two routes are equal when their short names match; the display name is
/// informational only.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub short_name: String,
    pub name: Option<String>,
}

impl Route {
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            name: None,
        }
    }

    pub fn with_name(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            name: Some(name.into()),
        }
    }

    /// Returns the full name when known, otherwise the short name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.short_name)
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.short_name == other.short_name
    }
}

impl Eq for Route {}

impl Hash for Route {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.short_name.hash(state);
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name)
    }
}

/// The stop a bus most recently served.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastStop {
    pub code: String,
    pub name: Option<String>,
}

/// One bus's live state at poll time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusPosition {
    pub id: String,
    pub route: Route,
    pub latitude: f64,
    pub longitude: f64,
    pub direction: Option<String>,
    pub passengers: u32,
    pub last_stop: Option<LastStop>,
    pub updated_at: DateTime<Utc>,
}
