// Map side of the selection sync: renders features as shapes, keeps a
// highlight flag per shape and turns shape clicks back into features.
use std::rc::Rc;

use geo::Contains;
use geo_types::{Point, Polygon};
use log::{debug, info};
use serde_json::Value;

use crate::config::{FeaturePaint, MapConfig};
use crate::dataset::{Dataset, Feature};
use crate::error::SurfaceError;
use crate::map_style;
use crate::selection::Selection;

pub type ShapeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Pointer,
}

impl Cursor {
    /// CSS cursor value.
    pub fn css(&self) -> &'static str {
        match self {
            Cursor::Default => "",
            Cursor::Pointer => "pointer",
        }
    }
}

/// The rendering engine the shapes are drawn on.
pub trait MapSurface {
    fn add_source(&mut self, id: &str, source: &Value) -> Result<(), SurfaceError>;
    fn add_layer(&mut self, layer: &Value) -> Result<(), SurfaceError>;
    fn set_feature_state(&mut self, source_id: &str, shape_id: ShapeId, selected: bool);
    fn set_cursor(&mut self, cursor: Cursor);
    /// Release the engine and everything it holds.
    fn remove(&mut self);
}

/// Witness that the surface finished its own style initialization.
///
/// Only [`SpatialView::mark_ready`] creates one, and adding sources or layers
/// requires it, so nothing can be added to a surface that is not ready yet.
/// A token only opens the mount it was issued for.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceReady {
    mount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotReady,
    Ready,
}

/// One drawn polygon, tied to its source feature by positional index.
#[derive(Debug, Clone)]
pub struct RenderedShape {
    pub shape_id: ShapeId,
    pub positional_index: usize,
    polygon: Polygon<f64>,
    highlighted: bool,
}

impl RenderedShape {
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }
}

pub struct SpatialView<S: MapSurface> {
    surface: S,
    source_id: String,
    fill_layer_id: String,
    outline_layer_id: String,
    paint: FeaturePaint,
    readiness: Readiness,
    mount: u64,
    installed: bool,
    shapes: Vec<RenderedShape>,
}

impl<S: MapSurface> SpatialView<S> {
    pub fn new(surface: S, config: &MapConfig) -> Self {
        SpatialView {
            surface,
            source_id: config.source_id.clone(),
            fill_layer_id: config.fill_layer_id.clone(),
            outline_layer_id: config.outline_layer_id.clone(),
            paint: config.paint.clone(),
            readiness: Readiness::NotReady,
            mount: 0,
            installed: false,
            shapes: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Record that the surface's style has loaded. Safe to call repeatedly.
    pub(crate) fn mark_ready(&mut self) -> SurfaceReady {
        if self.readiness == Readiness::NotReady {
            debug!("Map surface ready");
            self.readiness = Readiness::Ready;
        }
        SurfaceReady { mount: self.mount }
    }

    /// Add the feature source and its fill and outline layers. A second call
    /// within the same mount does nothing. Fails with `NotReady` when the
    /// surface is not ready or the token belongs to an earlier mount.
    pub fn install(&mut self, ready: SurfaceReady, dataset: &Dataset) -> Result<(), SurfaceError> {
        if self.readiness != Readiness::Ready || ready.mount != self.mount {
            return Err(SurfaceError::NotReady);
        }
        if self.installed {
            return Ok(());
        }

        let mut shapes = Vec::new();
        for feature in dataset.iter() {
            for part in feature.geometry().parts() {
                shapes.push(RenderedShape {
                    shape_id: shapes.len() as ShapeId,
                    positional_index: feature.positional_index(),
                    polygon: part.clone(),
                    highlighted: false,
                });
            }
        }

        let source = map_style::shape_source(&shapes, dataset);
        self.surface.add_source(&self.source_id, &source)?;
        self.surface.add_layer(&map_style::fill_layer(
            &self.fill_layer_id,
            &self.source_id,
            &self.paint,
        ))?;
        self.surface.add_layer(&map_style::outline_layer(
            &self.outline_layer_id,
            &self.source_id,
            &self.paint,
        ))?;

        info!(
            "Rendered {} shapes for {} features",
            shapes.len(),
            dataset.len()
        );
        self.shapes = shapes;
        self.installed = true;
        Ok(())
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn shapes(&self) -> &[RenderedShape] {
        &self.shapes
    }

    /// Reflect `selection` in the per-shape highlight flags: clear every
    /// shape, then flag the shapes of the first feature matching the selected
    /// identity. Returns how many shapes end up highlighted.
    pub fn apply_selection(&mut self, dataset: &Dataset, selection: &Selection) -> usize {
        for shape in self.shapes.iter_mut() {
            shape.highlighted = false;
            self.surface
                .set_feature_state(&self.source_id, shape.shape_id, false);
        }

        let target = selection
            .feature()
            .and_then(|selected| dataset.resolve(selected.identity()))
            .map(|feature| feature.positional_index());
        let Some(target) = target else {
            return 0;
        };

        let mut highlighted = 0;
        for shape in self.shapes.iter_mut().filter(|s| s.positional_index == target) {
            shape.highlighted = true;
            self.surface
                .set_feature_state(&self.source_id, shape.shape_id, true);
            highlighted += 1;
        }
        highlighted
    }

    pub fn highlighted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .shapes
            .iter()
            .filter(|s| s.highlighted)
            .map(|s| s.positional_index)
            .collect();
        indices.dedup();
        indices
    }

    /// Feature behind a clicked shape.
    pub fn feature_for_shape<'d>(
        &self,
        dataset: &'d Dataset,
        shape_id: ShapeId,
    ) -> Option<&'d Rc<Feature>> {
        let shape = self.shapes.iter().find(|s| s.shape_id == shape_id)?;
        dataset.feature_at(shape.positional_index)
    }

    /// Topmost feature under a lng/lat position. Later shapes draw on top.
    pub fn pick<'d>(&self, dataset: &'d Dataset, lng: f64, lat: f64) -> Option<&'d Rc<Feature>> {
        let point = Point::new(lng, lat);
        let shape = self
            .shapes
            .iter()
            .rev()
            .find(|s| s.polygon.contains(&point))?;
        dataset.feature_at(shape.positional_index)
    }

    pub fn hover(&mut self, inside: bool) {
        let cursor = if inside { Cursor::Pointer } else { Cursor::Default };
        self.surface.set_cursor(cursor);
    }

    /// Release the surface and return to `NotReady`.
    pub fn teardown(&mut self) {
        self.surface.remove();
        self.shapes.clear();
        self.installed = false;
        self.readiness = Readiness::NotReady;
        self.mount += 1;
    }
}
