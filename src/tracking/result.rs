use serde::{Deserialize, Serialize};

use super::job::Category;

/// Normalized shipment status, independent of which carrier produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingResult {
    pub category: Category,
    pub carrier_name: String,
    pub status_label: String,
    pub key_dates: Vec<KeyDate>,
    pub route: Route,
    /// Containers tracked under a bill of lading; empty for other categories.
    pub sub_units: Vec<SubUnit>,
}

impl TrackingResult {
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            carrier_name: String::new(),
            status_label: String::new(),
            key_dates: Vec::new(),
            route: Route::default(),
            sub_units: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDate {
    pub label: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

/// A container tracked beneath a bill of lading, with its own status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUnit {
    pub number: String,
    pub status: String,
}
