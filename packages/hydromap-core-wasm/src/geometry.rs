// Geometry payloads as they arrive from the dataset endpoint, and the single
// normalized form every other module works with.
use geo::{BoundingRect, Contains};
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GeometryError;

/// The geometry field of a raw record: either a nested GeoJSON geometry
/// object or a string containing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawGeometry {
    Encoded(String),
    Structured(Value),
}

impl RawGeometry {
    /// Resolve the payload once into a normalized [`Geometry`].
    pub fn parse(&self) -> Result<Geometry, GeometryError> {
        match self {
            RawGeometry::Encoded(text) => {
                let value: Value =
                    serde_json::from_str(text).map_err(|e| GeometryError::Json(e.to_string()))?;
                Geometry::from_value(&value)
            }
            RawGeometry::Structured(value) => Geometry::from_value(value),
        }
    }
}

// GeoJSON geometry object, coordinates still untyped
#[derive(Deserialize)]
struct GeometryPayload {
    r#type: String,
    coordinates: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Polygon,
    MultiPolygon,
}

/// A fillable area. Polygons are stored as single-part multipolygons so the
/// rest of the crate only deals with one shape type.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    kind: GeometryKind,
    shape: MultiPolygon<f64>,
}

impl Geometry {
    pub fn from_value(value: &Value) -> Result<Self, GeometryError> {
        let payload: GeometryPayload = serde_json::from_value(value.clone())
            .map_err(|e| GeometryError::Json(e.to_string()))?;

        match payload.r#type.as_str() {
            "Polygon" => {
                let rings = serde_json::from_value::<Vec<Vec<Vec<f64>>>>(payload.coordinates)
                    .map_err(|e| GeometryError::InvalidCoordinates(e.to_string()))?;
                let polygon = polygon_from_rings(rings)?;
                Ok(Geometry {
                    kind: GeometryKind::Polygon,
                    shape: MultiPolygon::new(vec![polygon]),
                })
            }
            "MultiPolygon" => {
                let polygons =
                    serde_json::from_value::<Vec<Vec<Vec<Vec<f64>>>>>(payload.coordinates)
                        .map_err(|e| GeometryError::InvalidCoordinates(e.to_string()))?;
                if polygons.is_empty() {
                    return Err(GeometryError::Empty);
                }
                let parts = polygons
                    .into_iter()
                    .map(polygon_from_rings)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Geometry {
                    kind: GeometryKind::MultiPolygon,
                    shape: MultiPolygon::new(parts),
                })
            }
            other => Err(GeometryError::UnsupportedType(other.to_string())),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// One polygon per part, in source order.
    pub fn parts(&self) -> &[Polygon<f64>] {
        &self.shape.0
    }

    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        self.shape.contains(&Point::new(lng, lat))
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.shape.bounding_rect()
    }

    /// GeoJSON object for this geometry, in the type it arrived as.
    pub fn to_value(&self) -> Value {
        let coordinates = match self.kind {
            GeometryKind::Polygon => match self.shape.0.first() {
                Some(polygon) => polygon_coordinates(polygon),
                None => Value::Array(Vec::new()),
            },
            GeometryKind::MultiPolygon => {
                Value::Array(self.shape.0.iter().map(polygon_coordinates).collect())
            }
        };
        let mut object = serde_json::Map::new();
        object.insert("coordinates".to_string(), coordinates);
        object.insert("type".to_string(), Value::String(type_name(self.kind).to_string()));
        Value::Object(object)
    }

    /// Compact, key-sorted JSON text. Equal shapes always yield equal text,
    /// whether they arrived as an object or as an encoded string.
    pub fn canonical(&self) -> String {
        self.to_value().to_string()
    }
}

/// GeoJSON object for a single polygon part.
pub fn polygon_value(polygon: &Polygon<f64>) -> Value {
    let mut object = serde_json::Map::new();
    object.insert("coordinates".to_string(), polygon_coordinates(polygon));
    object.insert("type".to_string(), Value::String("Polygon".to_string()));
    Value::Object(object)
}

fn type_name(kind: GeometryKind) -> &'static str {
    match kind {
        GeometryKind::Polygon => "Polygon",
        GeometryKind::MultiPolygon => "MultiPolygon",
    }
}

fn polygon_from_rings(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.into_iter().map(ring_from_positions);
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => return Err(GeometryError::Empty),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(positions: Vec<Vec<f64>>) -> Result<LineString<f64>, GeometryError> {
    if positions.is_empty() {
        return Err(GeometryError::Empty);
    }
    let coords = positions
        .into_iter()
        .map(|position| {
            // Extra dimensions (altitude) are ignored
            if position.len() < 2 {
                return Err(GeometryError::InvalidCoordinates(format!(
                    "position has {} values, expected at least 2",
                    position.len()
                )));
            }
            let (x, y) = (position[0], position[1]);
            if !x.is_finite() || !y.is_finite() {
                return Err(GeometryError::InvalidCoordinates(format!(
                    "non-finite position [{}, {}]",
                    x, y
                )));
            }
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> Value {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(|ring| {
            ring.coords()
                .map(|c| serde_json::json!([c.x, c.y]))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into()
}
