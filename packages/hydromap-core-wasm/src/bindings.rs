// Browser glue: a maplibre-gl map behind `MapSurface`, window.fetch behind
// `DatasetClient`, DOM elements behind `ScrollTarget`, and the exported
// `HydroMap` handle the page drives.
use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Function, Reflect};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Element, Response, ScrollIntoViewOptions, ScrollLogicalPosition};

use crate::app::HydroApp;
use crate::config::MapConfig;
use crate::console;
use crate::dataset::{DatasetClient, FetchResponse};
use crate::error::{LoadError, SurfaceError};
use crate::list_view::{ScrollBehavior, ScrollBlock, ScrollOptions, ScrollTarget};
use crate::map_style;
use crate::spatial_view::{Cursor, MapSurface, ShapeId};

#[wasm_bindgen]
extern "C" {
    /// A maplibre-gl `Map` created by the page.
    #[derive(Debug, Clone)]
    pub type MaplibreMap;

    #[wasm_bindgen(method, catch, js_name = addSource)]
    fn add_source(this: &MaplibreMap, id: &str, source: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = addLayer)]
    fn add_layer(this: &MaplibreMap, layer: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = setFeatureState)]
    fn set_feature_state(this: &MaplibreMap, target: &JsValue, state: &JsValue);

    #[wasm_bindgen(method, js_name = getCanvas)]
    fn get_canvas(this: &MaplibreMap) -> web_sys::HtmlElement;

    #[wasm_bindgen(method, js_name = isStyleLoaded)]
    fn is_style_loaded(this: &MaplibreMap) -> JsValue;

    #[wasm_bindgen(method)]
    fn on(this: &MaplibreMap, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = on)]
    fn on_layer(this: &MaplibreMap, event: &str, layer_id: &str, handler: &Function);

    #[wasm_bindgen(method)]
    fn remove(this: &MaplibreMap);
}

fn describe(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => String::from(err.message()),
        None => format!("{:?}", value),
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

pub struct JsMapSurface {
    map: MaplibreMap,
    removed: bool,
}

impl JsMapSurface {
    pub fn new(map: MaplibreMap) -> Self {
        JsMapSurface { map, removed: false }
    }
}

impl MapSurface for JsMapSurface {
    fn add_source(&mut self, id: &str, source: &Value) -> Result<(), SurfaceError> {
        let source = to_js(source).map_err(|e| SurfaceError::Style(e.to_string()))?;
        self.map
            .add_source(id, &source)
            .map_err(|e| SurfaceError::Js(describe(&e)))
    }

    fn add_layer(&mut self, layer: &Value) -> Result<(), SurfaceError> {
        let layer = to_js(layer).map_err(|e| SurfaceError::Style(e.to_string()))?;
        self.map
            .add_layer(&layer)
            .map_err(|e| SurfaceError::Js(describe(&e)))
    }

    fn set_feature_state(&mut self, source_id: &str, shape_id: ShapeId, selected: bool) {
        let target = to_js(&json!({ "source": source_id, "id": shape_id }));
        let state = to_js(&json!({ "selected": selected }));
        match (target, state) {
            (Ok(target), Ok(state)) => self.map.set_feature_state(&target, &state),
            (Err(e), _) | (_, Err(e)) => warn!("Could not set state for shape {}: {}", shape_id, e),
        }
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        let style = self.map.get_canvas().style();
        if let Err(e) = style.set_property("cursor", cursor.css()) {
            warn!("Could not set map cursor: {}", describe(&e));
        }
    }

    fn remove(&mut self) {
        if !self.removed {
            self.map.remove();
            self.removed = true;
        }
    }
}

/// Plain GET through `window.fetch`.
#[derive(Debug, Default)]
pub struct FetchClient;

#[async_trait(?Send)]
impl DatasetClient for FetchClient {
    async fn get(&self, url: &str) -> Result<FetchResponse, LoadError> {
        let network = |e: JsValue| LoadError::Network {
            url: url.to_string(),
            message: describe(&e),
        };

        let window = web_sys::window()
            .ok_or_else(|| network(JsValue::from_str("no window available")))?;
        let response: Response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(network)?
            .dyn_into()
            .map_err(network)?;

        let status = response.status();
        let body = JsFuture::from(response.text().map_err(network)?)
            .await
            .map_err(network)?
            .as_string()
            .unwrap_or_default();

        Ok(FetchResponse { status, body })
    }
}

impl ScrollTarget for Element {
    fn scroll_into_view(&self, options: ScrollOptions) {
        let js_options = ScrollIntoViewOptions::new();
        js_options.set_behavior(match options.behavior {
            ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
            ScrollBehavior::Instant => web_sys::ScrollBehavior::Instant,
        });
        js_options.set_block(match options.block {
            ScrollBlock::Start => ScrollLogicalPosition::Start,
            ScrollBlock::Center => ScrollLogicalPosition::Center,
            ScrollBlock::End => ScrollLogicalPosition::End,
            ScrollBlock::Nearest => ScrollLogicalPosition::Nearest,
        });
        self.scroll_into_view_with_scroll_into_view_options(&js_options);
    }
}

type WebApp = HydroApp<JsMapSurface, FetchClient, Element>;
type Handler = Closure<dyn FnMut(JsValue)>;

fn notify(on_change: &Function) {
    if let Err(e) = on_change.call0(&JsValue::NULL) {
        error!("Change callback failed: {}", describe(&e));
    }
}

// Style finished loading: start the one dataset request of this mount.
fn surface_ready(app: &Rc<RefCell<WebApp>>, on_change: &Function) {
    let pending = app.borrow_mut().on_surface_ready();
    let Some(pending) = pending else {
        return;
    };

    let app = Rc::clone(app);
    let on_change = on_change.clone();
    spawn_local(async move {
        let outcome = pending.fetch.await;
        let published = app.borrow_mut().on_fetch_complete(&pending.ticket, outcome);
        if published {
            notify(&on_change);
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Click {
    Feature(usize),
    At(f64, f64),
}

// featureIndex of the first clicked feature, or the clicked lng/lat.
fn clicked_target(event: &JsValue) -> Option<Click> {
    let features = Reflect::get(event, &JsValue::from_str("features")).ok()?;
    if let Some(first) = features.dyn_ref::<js_sys::Array>().map(|a| a.get(0)) {
        let index = Reflect::get(&first, &JsValue::from_str("properties"))
            .and_then(|props| Reflect::get(&props, &JsValue::from_str("featureIndex")))
            .ok()
            .and_then(|v| v.as_f64());
        if let Some(index) = index {
            return Some(Click::Feature(index as usize));
        }
    }

    let lng_lat = Reflect::get(event, &JsValue::from_str("lngLat")).ok()?;
    let lng = Reflect::get(&lng_lat, &JsValue::from_str("lng")).ok()?.as_f64()?;
    let lat = Reflect::get(&lng_lat, &JsValue::from_str("lat")).ok()?.as_f64()?;
    Some(Click::At(lng, lat))
}

/// One mounted map + list pair, driven from the page.
///
/// `onChange` is called with no arguments whenever the rows or the selection
/// change; the page re-reads `rows()` and re-renders.
///
/// `unmount()` removes the map, so a handle mounts at most once. A new mount
/// needs a new map and a new `HydroMap`.
#[wasm_bindgen]
pub struct HydroMap {
    app: Rc<RefCell<WebApp>>,
    map: MaplibreMap,
    fill_layer_id: String,
    on_change: Function,
    handlers: Vec<Handler>,
    unmounted: bool,
}

#[wasm_bindgen]
impl HydroMap {
    #[wasm_bindgen(constructor)]
    pub fn new(map: MaplibreMap, config: JsValue, on_change: Function) -> Result<HydroMap, JsValue> {
        let config: MapConfig = if config.is_undefined() || config.is_null() {
            MapConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        console::init(config.log_level());

        let fill_layer_id = config.fill_layer_id.clone();
        let surface = JsMapSurface::new(map.clone());
        let app = HydroApp::new(config, surface, FetchClient);
        Ok(HydroMap {
            app: Rc::new(RefCell::new(app)),
            map,
            fill_layer_id,
            on_change,
            handlers: Vec::new(),
            unmounted: false,
        })
    }

    /// Subscribe to the map's events. If the style already loaded, the
    /// dataset request starts right away.
    pub fn mount(&mut self) {
        if self.unmounted {
            warn!("Map was removed by unmount(); create a new HydroMap to mount again");
            return;
        }
        if !self.handlers.is_empty() {
            return;
        }

        let app = Rc::clone(&self.app);
        let on_change = self.on_change.clone();
        let on_style_load: Handler = Closure::new(move |_event: JsValue| {
            surface_ready(&app, &on_change);
        });
        self.map.on("style.load", on_style_load.as_ref().unchecked_ref());
        self.handlers.push(on_style_load);

        let app = Rc::clone(&self.app);
        let on_change = self.on_change.clone();
        let on_click: Handler = Closure::new(move |event: JsValue| {
            let changed = match clicked_target(&event) {
                Some(Click::Feature(index)) => app.borrow_mut().select_feature_index(index),
                Some(Click::At(lng, lat)) => app.borrow_mut().select_at(lng, lat),
                None => false,
            };
            if changed {
                notify(&on_change);
            }
        });
        self.map
            .on_layer("click", &self.fill_layer_id, on_click.as_ref().unchecked_ref());
        self.handlers.push(on_click);

        for (event, inside) in [("mouseenter", true), ("mouseleave", false)] {
            let app = Rc::clone(&self.app);
            let on_hover: Handler = Closure::new(move |_event: JsValue| {
                app.borrow_mut().hover(inside);
            });
            self.map
                .on_layer(event, &self.fill_layer_id, on_hover.as_ref().unchecked_ref());
            self.handlers.push(on_hover);
        }

        if self.map.is_style_loaded().is_truthy() {
            surface_ready(&self.app, &self.on_change);
        }
        info!("Hydrology map mounted");
    }

    /// Current list rows in load order.
    pub fn rows(&self) -> Result<JsValue, JsValue> {
        Ok(to_js(&self.app.borrow().rows())?)
    }

    #[wasm_bindgen(js_name = registerRow)]
    pub fn register_row(&self, key: &str, element: Element) -> bool {
        self.app.borrow_mut().register_row(key, element)
    }

    #[wasm_bindgen(js_name = unregisterRow)]
    pub fn unregister_row(&self, key: &str) {
        self.app.borrow_mut().unregister_row(key);
    }

    #[wasm_bindgen(js_name = selectRow)]
    pub fn select_row(&self, key: &str) -> bool {
        let changed = self.app.borrow_mut().select_row(key);
        if changed {
            notify(&self.on_change);
        }
        changed
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&self) -> bool {
        let changed = self.app.borrow_mut().clear_selection();
        if changed {
            notify(&self.on_change);
        }
        changed
    }

    #[wasm_bindgen(js_name = selectedKey)]
    pub fn selected_key(&self) -> Option<String> {
        self.app.borrow().selection().identity().map(|id| id.key())
    }

    #[wasm_bindgen(js_name = loadReport)]
    pub fn load_report(&self) -> Result<JsValue, JsValue> {
        Ok(to_js(self.app.borrow().load_report())?)
    }

    /// Extent of the loaded features, or `undefined` before a load.
    pub fn bounds(&self) -> Result<JsValue, JsValue> {
        match self.app.borrow().bounds() {
            Some(bounds) => Ok(to_js(&bounds)?),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Remove the map and drop the event handlers.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;
        self.app.borrow_mut().unmount();
        self.handlers.clear();
        info!("Hydrology map unmounted");
    }
}

/// Initial map options (`style`, `center`, `zoom`, `maxZoom`) for `new maplibregl.Map`.
#[wasm_bindgen(js_name = baseStyle)]
pub fn base_style(config: JsValue) -> Result<JsValue, JsValue> {
    let config: MapConfig = if config.is_undefined() || config.is_null() {
        MapConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };
    Ok(to_js(&map_style::base_style(&config))?)
}
