// Style JSON for the map engine: the raster base style, the feature source
// and the two paint layers driven by the `selected` feature state.
use serde_json::{json, Value};

use crate::config::{FeaturePaint, MapConfig};
use crate::dataset::Dataset;
use crate::geometry::polygon_value;
use crate::spatial_view::RenderedShape;

const BASE_SOURCE_ID: &str = "osm";
const BASE_LAYER_ID: &str = "osm-tiles";

/// Map options for the engine constructor: raster style plus initial camera.
pub fn base_style(config: &MapConfig) -> Value {
    let tiles = &config.base_tiles;
    json!({
        "style": {
            "version": 8,
            "sources": {
                "osm": {
                    "type": "raster",
                    "tiles": [tiles.url],
                    "tileSize": tiles.tile_size,
                    "attribution": tiles.attribution
                }
            },
            "layers": [{
                "id": BASE_LAYER_ID,
                "type": "raster",
                "source": BASE_SOURCE_ID,
                "paint": {
                    "raster-opacity": tiles.paint.opacity,
                    "raster-brightness-min": tiles.paint.brightness_min,
                    "raster-brightness-max": tiles.paint.brightness_max,
                    "raster-contrast": tiles.paint.contrast,
                    "raster-saturation": tiles.paint.saturation
                }
            }]
        },
        "center": config.center,
        "zoom": config.zoom,
        "maxZoom": config.max_zoom
    })
}

/// GeoJSON source with one feature per rendered shape. Feature ids are the
/// shape ids so feature state can be addressed directly. Record fields are
/// kept as-is; `featureName`, `featureKind` and `featureIndex` are added.
pub fn shape_source(shapes: &[RenderedShape], dataset: &Dataset) -> Value {
    let features: Vec<Value> = shapes
        .iter()
        .filter_map(|shape| {
            let feature = dataset.feature_at(shape.positional_index)?;
            let mut properties = feature.properties().clone();
            properties.insert("featureName".to_string(), json!(feature.name()));
            properties.insert("featureKind".to_string(), json!(feature.kind()));
            properties.insert("featureIndex".to_string(), json!(shape.positional_index));
            Some(json!({
                "type": "Feature",
                "id": shape.shape_id,
                "geometry": polygon_value(shape.polygon()),
                "properties": properties
            }))
        })
        .collect();

    json!({
        "type": "geojson",
        "data": {
            "type": "FeatureCollection",
            "features": features
        }
    })
}

// ["case", ["boolean", ["feature-state", "selected"], false], selected, default]
fn when_selected(selected: Value, default: Value) -> Value {
    json!([
        "case",
        ["boolean", ["feature-state", "selected"], false],
        selected,
        default
    ])
}

pub fn fill_layer(layer_id: &str, source_id: &str, paint: &FeaturePaint) -> Value {
    json!({
        "id": layer_id,
        "type": "fill",
        "source": source_id,
        "paint": {
            "fill-color": when_selected(json!(paint.fill_color_selected), json!(paint.fill_color)),
            "fill-opacity": when_selected(json!(paint.fill_opacity_selected), json!(paint.fill_opacity))
        }
    })
}

pub fn outline_layer(layer_id: &str, source_id: &str, paint: &FeaturePaint) -> Value {
    json!({
        "id": layer_id,
        "type": "line",
        "source": source_id,
        "paint": {
            "line-color": when_selected(json!(paint.line_color_selected), json!(paint.line_color)),
            "line-width": when_selected(json!(paint.line_width_selected), json!(paint.line_width))
        }
    })
}
