// Plain data structures handed across the wasm boundary
use serde::{Deserialize, Serialize};

/// One row of the list view, ready to render.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub key: String,
    pub name: String,
    /// Category label, lowercased for display
    pub kind: String,
    pub positional_index: usize,
    pub selected: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRecord {
    pub positional_index: usize,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRecord {
    pub positional_index: usize,
    pub first_index: usize,
}

/// Outcome of normalizing one response.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub raw_count: usize,
    pub published: usize,
    pub dropped: Vec<DroppedRecord>,
    pub duplicates: Vec<DuplicateRecord>,
}

/// Lng/lat extent of everything that was published.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}
