//! Projection of raw provider tracking objects into [`TrackingResult`].
//!
//! Carriers return loosely shaped JSON; every field read here is optional
//! and absent fields fall back to empty values instead of failing.

use serde_json::Value;

use crate::tracking::{Category, KeyDate, Route, SubUnit, TrackingResult};

pub struct ResultProjector;

impl ResultProjector {
    pub fn project(category: Category, raw: &Value) -> TrackingResult {
        let sub_units = match category {
            Category::BillOfLading => sub_units(raw),
            Category::Container | Category::Booking => Vec::new(),
        };

        TrackingResult {
            category,
            carrier_name: carrier_name(raw),
            status_label: str_at(raw, "status").unwrap_or_default(),
            key_dates: key_dates(raw),
            route: Route {
                origin: port_name(raw, "port_of_loading"),
                destination: port_name(raw, "port_of_discharge"),
            },
            sub_units,
        }
    }
}

fn str_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

// `carrier` is either a plain string or an object with a `name`.
fn carrier_name(raw: &Value) -> String {
    match raw.get("carrier") {
        Some(Value::String(name)) => name.clone(),
        Some(obj @ Value::Object(_)) => str_at(obj, "name").unwrap_or_default(),
        _ => String::new(),
    }
}

fn key_dates(raw: &Value) -> Vec<KeyDate> {
    raw.get("dates")
        .and_then(Value::as_array)
        .map(|dates| {
            dates
                .iter()
                .filter_map(|entry| {
                    let label = str_at(entry, "type").or_else(|| str_at(entry, "label"))?;
                    Some(KeyDate {
                        label,
                        date: str_at(entry, "date"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn port_name(raw: &Value, port: &str) -> Option<String> {
    raw.get("route")
        .and_then(|route| route.get(port))
        .and_then(|p| str_at(p, "name"))
}

fn sub_units(raw: &Value) -> Vec<SubUnit> {
    raw.get("containers")
        .and_then(Value::as_array)
        .map(|containers| {
            containers
                .iter()
                .filter_map(|c| {
                    Some(SubUnit {
                        number: str_at(c, "number")?,
                        status: str_at(c, "status").unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
