// Configuration passed in from the page. Every field has a default so the
// page only needs to send what it wants to change.
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATASET_URL: &str = "https://data.cityoforlando.net/resource/j3uy-fhhx.json";

/// How records with identical name and geometry are treated at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicatePolicy {
    /// Duplicates share one identity and are selected together.
    #[default]
    Merge,
    /// Every duplicate gets its own identity through an occurrence counter.
    Distinct,
    /// Only the first record is kept; later copies are dropped from both views.
    Reject,
}

/// Names of the record fields that carry the label, the category and the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordFields {
    pub name: String,
    pub kind: String,
    pub geometry: String,
}

impl Default for RecordFields {
    fn default() -> Self {
        RecordFields {
            name: "hydroname".to_string(),
            kind: "hydrotype".to_string(),
            geometry: "the_geom".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RasterPaint {
    pub opacity: f64,
    pub brightness_min: f64,
    pub brightness_max: f64,
    pub contrast: f64,
    pub saturation: f64,
}

impl Default for RasterPaint {
    fn default() -> Self {
        RasterPaint {
            opacity: 0.7,
            brightness_min: 0.2,
            brightness_max: 0.8,
            contrast: 0.3,
            saturation: -0.4,
        }
    }
}

/// Raster base map underneath the features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseTiles {
    pub url: String,
    pub tile_size: u32,
    pub attribution: String,
    pub paint: RasterPaint,
}

impl Default for BaseTiles {
    fn default() -> Self {
        BaseTiles {
            url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            tile_size: 256,
            attribution: "© OpenStreetMap Contributors".to_string(),
            paint: RasterPaint::default(),
        }
    }
}

/// Default and highlighted paint of the feature layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturePaint {
    pub fill_color: String,
    pub fill_color_selected: String,
    pub fill_opacity: f64,
    pub fill_opacity_selected: f64,
    pub line_color: String,
    pub line_color_selected: String,
    pub line_width: f64,
    pub line_width_selected: f64,
}

impl Default for FeaturePaint {
    fn default() -> Self {
        FeaturePaint {
            fill_color: "#1976D2".to_string(),
            fill_color_selected: "#2196F3".to_string(),
            fill_opacity: 0.8,
            fill_opacity_selected: 0.9,
            line_color: "#64B5F6".to_string(),
            line_color_selected: "#FDD835".to_string(),
            line_width: 1.0,
            line_width_selected: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapConfig {
    pub dataset_url: String,
    pub fields: RecordFields,
    pub duplicate_policy: DuplicatePolicy,
    pub source_id: String,
    pub fill_layer_id: String,
    pub outline_layer_id: String,
    /// [lng, lat]
    pub center: [f64; 2],
    pub zoom: f64,
    pub max_zoom: f64,
    pub base_tiles: BaseTiles,
    pub paint: FeaturePaint,
    /// One of "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            fields: RecordFields::default(),
            duplicate_policy: DuplicatePolicy::default(),
            source_id: "hydrology".to_string(),
            fill_layer_id: "hydrology-fill".to_string(),
            outline_layer_id: "hydrology-outline".to_string(),
            center: [-81.3792, 28.5383],
            zoom: 11.0,
            max_zoom: 18.0,
            base_tiles: BaseTiles::default(),
            paint: FeaturePaint::default(),
            log_level: "info".to_string(),
        }
    }
}

impl MapConfig {
    /// Unknown level names fall back to `Info`.
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }
}
