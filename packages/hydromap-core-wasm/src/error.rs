// Error types shared by the loader, the geometry parser and the map surface.
use thiserror::Error;

/// Failure to obtain the feature collection from the remote endpoint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("network error while fetching {url}: {message}")]
    Network { url: String, message: String },
    #[error("dataset endpoint {url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("dataset body is not a JSON array of records: {0}")]
    Decode(String),
}

/// A geometry payload that cannot be turned into a fillable shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry is not valid JSON: {0}")]
    Json(String),
    #[error("unsupported geometry type '{0}'")]
    UnsupportedType(String),
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("geometry has no rings")]
    Empty,
}

/// Why a single raw record was left out of the published dataset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no usable '{0}' field")]
    MissingField(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("duplicate of the record at index {0}")]
    Duplicate(usize),
}

/// Errors reported by the spatial rendering engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("map surface rejected the call: {0}")]
    Js(String),
    #[error("failed to serialize map style: {0}")]
    Style(String),
    #[error("map surface is not ready for this mount")]
    NotReady,
}
