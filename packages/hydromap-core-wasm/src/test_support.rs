// Test doubles for the three seams: map surface, dataset client, list rows.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::MapConfig;
use crate::dataset::{DatasetClient, Feature, FetchResponse};
use crate::error::{LoadError, SurfaceError};
use crate::geometry::Geometry;
use crate::list_view::{ScrollOptions, ScrollTarget};
use crate::spatial_view::{Cursor, MapSurface, ShapeId, SpatialView, SurfaceReady};

/// Unit square with its lower-left corner at (offset, offset).
pub fn square(offset: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [offset, offset],
            [offset + 1.0, offset],
            [offset + 1.0, offset + 1.0],
            [offset, offset + 1.0],
            [offset, offset]
        ]]
    })
}

/// "Lake A" (geometry as an encoded string) and "Pond B" (nested object).
pub fn lake_records() -> Vec<Value> {
    vec![
        json!({ "hydroname": "Lake A", "hydrotype": "LAKE", "the_geom": square(0.0).to_string() }),
        json!({ "hydroname": "Pond B", "hydrotype": "POND", "the_geom": square(2.0) }),
    ]
}

pub fn feature(name: &str, kind: &str, offset: f64, positional_index: usize) -> Feature {
    let geometry = Geometry::from_value(&square(offset)).expect("square geometry");
    Feature::new(name, kind, geometry, positional_index)
}

pub fn ready_token() -> SurfaceReady {
    SpatialView::new(RecordingSurface::default(), &MapConfig::default()).mark_ready()
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    AddSource(String, Value),
    AddLayer(Value),
    SetFeatureState(String, ShapeId, bool),
}

/// Records every call made against the map.
#[derive(Debug)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
    pub cursor: Cursor,
    pub removed: bool,
    pub fail_add_source: bool,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        RecordingSurface {
            calls: Vec::new(),
            cursor: Cursor::Default,
            removed: false,
            fail_add_source: false,
        }
    }
}

impl RecordingSurface {
    /// Most recent feature state set for a shape.
    pub fn feature_state(&self, shape_id: ShapeId) -> Option<bool> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::SetFeatureState(_, id, selected) if *id == shape_id => Some(*selected),
            _ => None,
        })
    }

    pub fn sources_added(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::AddSource(..)))
            .count()
    }
}

impl MapSurface for RecordingSurface {
    fn add_source(&mut self, id: &str, source: &Value) -> Result<(), SurfaceError> {
        if self.fail_add_source {
            return Err(SurfaceError::Js(format!("source '{}' rejected", id)));
        }
        self.calls.push(SurfaceCall::AddSource(id.to_string(), source.clone()));
        Ok(())
    }

    fn add_layer(&mut self, layer: &Value) -> Result<(), SurfaceError> {
        self.calls.push(SurfaceCall::AddLayer(layer.clone()));
        Ok(())
    }

    fn set_feature_state(&mut self, source_id: &str, shape_id: ShapeId, selected: bool) {
        self.calls.push(SurfaceCall::SetFeatureState(
            source_id.to_string(),
            shape_id,
            selected,
        ));
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn remove(&mut self) {
        self.removed = true;
    }
}

/// Answers with a fixed response and counts requests.
#[derive(Debug)]
pub struct CountingClient {
    pub requests: Rc<Cell<usize>>,
    response: Result<FetchResponse, LoadError>,
}

impl CountingClient {
    pub fn ok(records: &[Value]) -> Self {
        CountingClient {
            requests: Rc::new(Cell::new(0)),
            response: Ok(FetchResponse {
                status: 200,
                body: Value::Array(records.to_vec()).to_string(),
            }),
        }
    }

    pub fn status(status: u16) -> Self {
        CountingClient {
            requests: Rc::new(Cell::new(0)),
            response: Ok(FetchResponse {
                status,
                body: "Internal Server Error".to_string(),
            }),
        }
    }

    pub fn network_error() -> Self {
        CountingClient {
            requests: Rc::new(Cell::new(0)),
            response: Err(LoadError::Network {
                url: "http://test".to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[async_trait(?Send)]
impl DatasetClient for CountingClient {
    async fn get(&self, _url: &str) -> Result<FetchResponse, LoadError> {
        self.requests.set(self.requests.get() + 1);
        self.response.clone()
    }
}

/// List row that remembers every scroll request.
#[derive(Debug, Default, Clone)]
pub struct RecordingRow {
    pub scrolls: Rc<RefCell<Vec<ScrollOptions>>>,
}

impl ScrollTarget for RecordingRow {
    fn scroll_into_view(&self, options: ScrollOptions) {
        self.scrolls.borrow_mut().push(options);
    }
}
