// Container for one mounted map + list pair. Owns the dataset, the selection
// and both views; every selection change goes through here and is pushed to
// both views before control returns to the page.
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use log::{error, warn};

use crate::config::MapConfig;
use crate::dataset::{Dataset, DatasetClient, DatasetLoader, Feature, FetchResponse, LoadTicket};
use crate::error::LoadError;
use crate::list_view::{ListView, ScrollTarget};
use crate::models::{Bounds, ListRow, LoadReport};
use crate::selection::{Selection, SelectionState};
use crate::spatial_view::{MapSurface, ShapeId, SpatialView};

pub type FetchFuture = LocalBoxFuture<'static, Result<FetchResponse, LoadError>>;

/// A started dataset request. The caller drives `fetch` and hands the result
/// back with [`HydroApp::on_fetch_complete`].
pub struct PendingLoad {
    pub ticket: LoadTicket,
    pub fetch: FetchFuture,
}

pub struct HydroApp<S, C, T>
where
    S: MapSurface,
    C: DatasetClient + 'static,
    T: ScrollTarget,
{
    client: Rc<C>,
    loader: DatasetLoader,
    spatial: SpatialView<S>,
    list: ListView<T>,
    dataset: Dataset,
    selection: SelectionState,
}

impl<S, C, T> HydroApp<S, C, T>
where
    S: MapSurface,
    C: DatasetClient + 'static,
    T: ScrollTarget,
{
    pub fn new(config: MapConfig, surface: S, client: C) -> Self {
        let loader = DatasetLoader::new(
            &config.dataset_url,
            config.fields.clone(),
            config.duplicate_policy,
        );
        let spatial = SpatialView::new(surface, &config);
        HydroApp {
            client: Rc::new(client),
            loader,
            spatial,
            list: ListView::new(),
            dataset: Dataset::default(),
            selection: SelectionState::new(),
        }
    }

    /// Surface style finished loading. Returns the dataset request the first
    /// time only; later calls within the same mount return `None`.
    pub fn on_surface_ready(&mut self) -> Option<PendingLoad> {
        let ready = self.spatial.mark_ready();
        let ticket = self.loader.begin(ready)?;
        let client = Rc::clone(&self.client);
        let url = ticket.url().to_string();
        let fetch = async move { client.get(&url).await }.boxed_local();
        Some(PendingLoad { ticket, fetch })
    }

    /// Publish the fetched dataset to both views. Failures leave both views
    /// empty. Returns whether a dataset was published.
    pub fn on_fetch_complete(
        &mut self,
        ticket: &LoadTicket,
        outcome: Result<FetchResponse, LoadError>,
    ) -> bool {
        let dataset = match self.loader.finish(ticket, outcome) {
            Some(Ok(dataset)) => dataset,
            Some(Err(_)) | None => return false,
        };

        if let Err(e) = self.spatial.install(ticket.surface_ready(), &dataset) {
            error!("Failed to add features to the map: {}", e);
        }
        self.dataset = dataset;
        self.propagate();
        true
    }

    /// The only way the selection changes.
    pub fn select(&mut self, feature: Option<Rc<Feature>>) -> bool {
        if !self.selection.select(feature) {
            return false;
        }
        self.propagate();
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        self.select(None)
    }

    /// List row clicked.
    pub fn select_row(&mut self, key: &str) -> bool {
        match self.list.row_for_key(&self.dataset, key).cloned() {
            Some(feature) => self.select(Some(feature)),
            None => {
                warn!("No feature for list row '{}'", key);
                false
            }
        }
    }

    /// Map shape clicked, identified by its shape id.
    pub fn select_shape(&mut self, shape_id: ShapeId) -> bool {
        match self.spatial.feature_for_shape(&self.dataset, shape_id).cloned() {
            Some(feature) => self.select(Some(feature)),
            None => false,
        }
    }

    /// Map shape clicked, identified by the `featureIndex` property it carries.
    pub fn select_feature_index(&mut self, positional_index: usize) -> bool {
        match self.dataset.feature_at(positional_index).cloned() {
            Some(feature) => self.select(Some(feature)),
            None => false,
        }
    }

    /// Map clicked at a position; selects the topmost shape there, if any.
    pub fn select_at(&mut self, lng: f64, lat: f64) -> bool {
        match self.spatial.pick(&self.dataset, lng, lat).cloned() {
            Some(feature) => self.select(Some(feature)),
            None => false,
        }
    }

    pub fn hover(&mut self, inside: bool) {
        self.spatial.hover(inside);
    }

    pub fn rows(&self) -> Vec<ListRow> {
        self.list.rows(&self.dataset, &self.selection)
    }

    /// Register the rendered element for a row key. Unknown keys are ignored.
    pub fn register_row(&mut self, key: &str, target: T) -> bool {
        match self.dataset.resolve_key(key) {
            Some(feature) => {
                self.list.register_row(feature.identity().clone(), target);
                true
            }
            None => false,
        }
    }

    pub fn unregister_row(&mut self, key: &str) {
        if let Some(feature) = self.dataset.resolve_key(key) {
            self.list.unregister_row(feature.identity());
        }
    }

    pub fn selection(&self) -> &Selection {
        self.selection.current()
    }

    pub fn selection_revision(&self) -> u64 {
        self.selection.revision()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn load_report(&self) -> &LoadReport {
        self.dataset.report()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.dataset.bounds()
    }

    pub fn spatial(&self) -> &SpatialView<S> {
        &self.spatial
    }

    pub fn list(&self) -> &ListView<T> {
        &self.list
    }

    /// Release the surface and forget everything from this mount. The load
    /// latch is rearmed so a later mount fetches again.
    pub fn unmount(&mut self) {
        self.spatial.teardown();
        self.loader.reset();
        self.list.clear();
        self.selection.clear();
        self.dataset = Dataset::default();
    }

    fn propagate(&mut self) {
        let selection = self.selection.current();
        self.spatial.apply_selection(&self.dataset, selection);
        self.list.on_selection_changed(&self.dataset, selection);
    }
}
