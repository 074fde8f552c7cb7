// Loading the feature collection: one fetch per mount, record normalization,
// and the immutable feature list both views read from.
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};

use crate::config::{DuplicatePolicy, RecordFields};
use crate::error::{LoadError, RecordError};
use crate::geometry::{Geometry, RawGeometry};
use crate::identity::FeatureIdentity;
use crate::models::{Bounds, DroppedRecord, DuplicateRecord, LoadReport};
use crate::spatial_view::SurfaceReady;

/// Status and body of the dataset response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the single GET for the dataset.
///
/// Browser futures are not `Send`, so neither is this trait.
#[async_trait(?Send)]
pub trait DatasetClient {
    async fn get(&self, url: &str) -> Result<FetchResponse, LoadError>;
}

/// One water body.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    name: String,
    kind: String,
    geometry: Geometry,
    positional_index: usize,
    occurrence: u32,
    properties: Map<String, Value>,
    identity: FeatureIdentity,
}

impl Feature {
    pub fn new(name: &str, kind: &str, geometry: Geometry, positional_index: usize) -> Self {
        Feature::with_occurrence(name, kind, geometry, positional_index, 0)
    }

    fn with_occurrence(
        name: &str,
        kind: &str,
        geometry: Geometry,
        positional_index: usize,
        occurrence: u32,
    ) -> Self {
        let identity = FeatureIdentity::new(name, &geometry).with_occurrence(occurrence);
        Feature {
            name: name.to_string(),
            kind: kind.to_string(),
            geometry,
            positional_index,
            occurrence,
            properties: Map::new(),
            identity,
        }
    }

    fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Category as shown in the list.
    pub fn kind_label(&self) -> String {
        self.kind.to_lowercase()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn positional_index(&self) -> usize {
        self.positional_index
    }

    pub fn occurrence(&self) -> u32 {
        self.occurrence
    }

    /// Record fields other than name, kind and geometry.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn identity(&self) -> &FeatureIdentity {
        &self.identity
    }
}

/// The published feature list. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    features: Vec<Rc<Feature>>,
    by_index: HashMap<usize, usize>,
    by_key: HashMap<String, usize>,
    report: LoadReport,
}

impl Dataset {
    /// Normalize raw records in response order. Indices are assigned before
    /// filtering, so a dropped record leaves a gap.
    pub fn from_records(records: Vec<Value>, fields: &RecordFields, policy: DuplicatePolicy) -> Self {
        let mut report = LoadReport {
            raw_count: records.len(),
            ..LoadReport::default()
        };
        let mut features: Vec<Rc<Feature>> = Vec::with_capacity(records.len());
        // base identity -> (first positional index, copies seen so far)
        let mut seen: HashMap<FeatureIdentity, (usize, u32)> = HashMap::new();

        for (positional_index, record) in records.into_iter().enumerate() {
            let (name, kind, geometry, properties) = match parse_record(record, fields) {
                Ok(parts) => parts,
                Err(e) => {
                    warn!("Dropping record {}: {}", positional_index, e);
                    report.dropped.push(DroppedRecord {
                        positional_index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let base = FeatureIdentity::new(&name, &geometry);
            let mut occurrence = 0;
            if let Some((first_index, copies)) = seen.get_mut(&base) {
                warn!(
                    "Record {} '{}' duplicates record {} ({:?} policy)",
                    positional_index, name, first_index, policy
                );
                report.duplicates.push(DuplicateRecord {
                    positional_index,
                    first_index: *first_index,
                });
                match policy {
                    DuplicatePolicy::Merge => {}
                    DuplicatePolicy::Distinct => {
                        occurrence = *copies;
                        *copies += 1;
                    }
                    DuplicatePolicy::Reject => {
                        report.dropped.push(DroppedRecord {
                            positional_index,
                            reason: RecordError::Duplicate(*first_index).to_string(),
                        });
                        continue;
                    }
                }
            } else {
                seen.insert(base, (positional_index, 1));
            }

            let feature =
                Feature::with_occurrence(&name, &kind, geometry, positional_index, occurrence)
                    .with_properties(properties);
            features.push(Rc::new(feature));
        }

        report.published = features.len();
        Dataset::from_features(features, report)
    }

    fn from_features(features: Vec<Rc<Feature>>, report: LoadReport) -> Self {
        let mut by_index = HashMap::with_capacity(features.len());
        let mut by_key = HashMap::with_capacity(features.len());
        for (slot, feature) in features.iter().enumerate() {
            by_index.insert(feature.positional_index(), slot);
            by_key.entry(feature.identity().key()).or_insert(slot);
        }
        Dataset {
            features,
            by_index,
            by_key,
            report,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Published features in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Feature>> {
        self.features.iter()
    }

    pub fn feature_at(&self, positional_index: usize) -> Option<&Rc<Feature>> {
        self.by_index
            .get(&positional_index)
            .map(|&slot| &self.features[slot])
    }

    /// First feature in load order carrying `identity`.
    pub fn resolve(&self, identity: &FeatureIdentity) -> Option<&Rc<Feature>> {
        self.features.iter().find(|f| f.identity() == identity)
    }

    /// Same as [`Dataset::resolve`], keyed by the row key string.
    pub fn resolve_key(&self, key: &str) -> Option<&Rc<Feature>> {
        self.by_key.get(key).map(|&slot| &self.features[slot])
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.features
            .iter()
            .filter_map(|f| f.geometry().bounding_rect())
            .fold(None, |acc: Option<Bounds>, rect| {
                let (min, max) = (rect.min(), rect.max());
                Some(match acc {
                    None => Bounds {
                        min_lng: min.x,
                        min_lat: min.y,
                        max_lng: max.x,
                        max_lat: max.y,
                    },
                    Some(b) => Bounds {
                        min_lng: b.min_lng.min(min.x),
                        min_lat: b.min_lat.min(min.y),
                        max_lng: b.max_lng.max(max.x),
                        max_lat: b.max_lat.max(max.y),
                    },
                })
            })
    }
}

fn parse_record(
    record: Value,
    fields: &RecordFields,
) -> Result<(String, String, Geometry, Map<String, Value>), RecordError> {
    let mut object = match record {
        Value::Object(object) => object,
        _ => return Err(RecordError::NotAnObject),
    };

    let name = take_string(&mut object, &fields.name)?;
    let kind = take_string(&mut object, &fields.kind)?;
    let raw = match object.remove(&fields.geometry) {
        Some(Value::Null) | None => return Err(RecordError::MissingField(fields.geometry.clone())),
        Some(Value::String(text)) => RawGeometry::Encoded(text),
        Some(value) => RawGeometry::Structured(value),
    };
    let geometry = raw.parse()?;

    Ok((name, kind, geometry, object))
}

fn take_string(object: &mut Map<String, Value>, field: &str) -> Result<String, RecordError> {
    match object.remove(field) {
        Some(Value::String(text)) => Ok(text),
        _ => Err(RecordError::MissingField(field.to_string())),
    }
}

/// Proof that a fetch was started for a particular mount, on a ready surface.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    url: String,
    ready: SurfaceReady,
}

impl LoadTicket {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn surface_ready(&self) -> SurfaceReady {
        self.ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    InFlight,
    Published,
    Failed,
}

/// Owns the load latch for one mount.
pub struct DatasetLoader {
    url: String,
    fields: RecordFields,
    policy: DuplicatePolicy,
    generation: u64,
    phase: LoadPhase,
}

impl DatasetLoader {
    pub fn new(url: &str, fields: RecordFields, policy: DuplicatePolicy) -> Self {
        DatasetLoader {
            url: url.to_string(),
            fields,
            policy,
            generation: 0,
            phase: LoadPhase::Idle,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Start the load. Only possible once the surface is ready, and only once
    /// per mount: every later call returns `None`.
    pub fn begin(&mut self, ready: SurfaceReady) -> Option<LoadTicket> {
        if self.phase != LoadPhase::Idle {
            debug!("Dataset load already requested ({:?}), ignoring", self.phase);
            return None;
        }
        self.phase = LoadPhase::InFlight;
        info!("Fetching dataset from {}", self.url);
        Some(LoadTicket {
            generation: self.generation,
            url: self.url.clone(),
            ready,
        })
    }

    /// Turn the fetch outcome into a dataset. Returns `None` when the ticket
    /// belongs to an earlier mount.
    pub fn finish(
        &mut self,
        ticket: &LoadTicket,
        outcome: Result<FetchResponse, LoadError>,
    ) -> Option<Result<Dataset, LoadError>> {
        if ticket.generation != self.generation || self.phase != LoadPhase::InFlight {
            debug!("Discarding dataset response from a previous mount");
            return None;
        }

        let result = outcome.and_then(|response| self.decode(response));
        match &result {
            Ok(dataset) => {
                self.phase = LoadPhase::Published;
                let report = dataset.report();
                info!(
                    "Loaded {} of {} records ({} dropped, {} duplicates)",
                    report.published,
                    report.raw_count,
                    report.dropped.len(),
                    report.duplicates.len()
                );
            }
            Err(e) => {
                self.phase = LoadPhase::Failed;
                error!("Error loading hydrology data: {}", e);
            }
        }
        Some(result)
    }

    /// Rearm the latch for the next mount.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = LoadPhase::Idle;
    }

    fn decode(&self, response: FetchResponse) -> Result<Dataset, LoadError> {
        if !response.is_success() {
            return Err(LoadError::Status {
                url: self.url.clone(),
                status: response.status,
            });
        }
        let records: Vec<Value> =
            serde_json::from_str(&response.body).map_err(|e| LoadError::Decode(e.to_string()))?;
        Ok(Dataset::from_records(records, &self.fields, self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lake_records, ready_token};
    use serde_json::json;

    fn load(records: Vec<Value>, policy: DuplicatePolicy) -> Dataset {
        Dataset::from_records(records, &RecordFields::default(), policy)
    }

    #[test]
    fn assigns_indices_in_response_order() {
        let dataset = load(lake_records(), DuplicatePolicy::Merge);
        assert_eq!(dataset.len(), 2);

        let lake = dataset.feature_at(0).expect("lake");
        assert_eq!(lake.name(), "Lake A");
        assert_eq!(lake.kind_label(), "lake");
        let pond = dataset.feature_at(1).expect("pond");
        assert_eq!(pond.name(), "Pond B");
        assert_eq!(pond.kind_label(), "pond");
    }

    #[test]
    fn dropped_records_leave_a_gap() {
        let mut records = lake_records();
        records.insert(
            1,
            json!({ "hydroname": "Broken", "hydrotype": "LAKE", "the_geom": "{oops" }),
        );
        let dataset = load(records, DuplicatePolicy::Merge);

        assert_eq!(dataset.len(), 2);
        assert!(dataset.feature_at(1).is_none());
        assert_eq!(dataset.feature_at(2).map(|f| f.name()), Some("Pond B"));
        assert!(dataset.iter().all(|f| f.name() != "Broken"));

        let report = dataset.report();
        assert_eq!(report.raw_count, 3);
        assert_eq!(report.published, 2);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].positional_index, 1);
    }

    #[test]
    fn records_missing_fields_are_dropped() {
        let records = vec![
            json!({ "hydrotype": "LAKE", "the_geom": lake_records()[0]["the_geom"].clone() }),
            json!({ "hydroname": "No shape", "hydrotype": "POND" }),
            json!("not a record"),
        ];
        let dataset = load(records, DuplicatePolicy::Merge);
        assert!(dataset.is_empty());
        assert_eq!(dataset.report().dropped.len(), 3);
        assert!(dataset.report().dropped[0].reason.contains("hydroname"));
    }

    #[test]
    fn keeps_extra_properties_and_custom_field_names() {
        let fields = RecordFields {
            name: "name".to_string(),
            kind: "kind".to_string(),
            geometry: "geometry".to_string(),
        };
        let records = vec![json!({
            "name": "Lake Eola",
            "kind": "LAKE",
            "objectid": "17",
            "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] }
        })];
        let dataset = Dataset::from_records(records, &fields, DuplicatePolicy::Merge);
        let feature = dataset.feature_at(0).expect("feature");
        assert_eq!(feature.properties().get("objectid"), Some(&json!("17")));
        assert!(feature.properties().get("name").is_none());
    }

    #[test]
    fn duplicate_policies() {
        let mut records = lake_records();
        records.push(records[0].clone());

        let merged = load(records.clone(), DuplicatePolicy::Merge);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.feature_at(0).unwrap().identity(), merged.feature_at(2).unwrap().identity());
        assert_eq!(merged.report().duplicates, vec![DuplicateRecord { positional_index: 2, first_index: 0 }]);
        let resolved = merged.resolve(merged.feature_at(2).unwrap().identity()).unwrap();
        assert_eq!(resolved.positional_index(), 0);

        let distinct = load(records.clone(), DuplicatePolicy::Distinct);
        assert_eq!(distinct.len(), 3);
        let copy = distinct.feature_at(2).unwrap();
        assert_eq!(copy.occurrence(), 1);
        assert_ne!(copy.identity(), distinct.feature_at(0).unwrap().identity());
        assert_eq!(distinct.resolve(copy.identity()).unwrap().positional_index(), 2);

        let rejected = load(records, DuplicatePolicy::Reject);
        assert_eq!(rejected.len(), 2);
        assert!(rejected.feature_at(2).is_none());
        assert_eq!(rejected.report().dropped[0].positional_index, 2);
    }

    #[test]
    fn resolve_by_key_and_bounds() {
        let dataset = load(lake_records(), DuplicatePolicy::Merge);
        let pond = dataset.feature_at(1).unwrap();
        let key = pond.identity().key();
        assert_eq!(dataset.resolve_key(&key).map(|f| f.positional_index()), Some(1));
        assert!(dataset.resolve_key("nothing").is_none());

        let bounds = dataset.bounds().expect("bounds");
        assert!(bounds.min_lng < bounds.max_lng);
        assert!(bounds.min_lat < bounds.max_lat);
        assert!(Dataset::default().bounds().is_none());
    }

    #[test]
    fn loader_latch_opens_once_per_mount() {
        let ready = ready_token();
        let mut loader = DatasetLoader::new("http://data", RecordFields::default(), DuplicatePolicy::Merge);

        let ticket = loader.begin(ready).expect("first request");
        assert_eq!(ticket.url(), "http://data");
        assert!(loader.begin(ready).is_none());
        assert!(loader.begin(ready).is_none());
        assert_eq!(loader.phase(), LoadPhase::InFlight);

        let body = serde_json::to_string(&lake_records()).unwrap();
        let dataset = loader
            .finish(&ticket, Ok(FetchResponse { status: 200, body }))
            .expect("current ticket")
            .expect("dataset");
        assert_eq!(dataset.len(), 2);
        assert_eq!(loader.phase(), LoadPhase::Published);
        assert!(loader.begin(ready).is_none());
    }

    #[test]
    fn loader_reports_failures() {
        let ready = ready_token();
        let mut loader = DatasetLoader::new("http://data", RecordFields::default(), DuplicatePolicy::Merge);

        let ticket = loader.begin(ready).unwrap();
        let outcome = loader.finish(&ticket, Ok(FetchResponse { status: 500, body: String::new() }));
        assert!(matches!(outcome, Some(Err(LoadError::Status { status: 500, .. }))));
        assert_eq!(loader.phase(), LoadPhase::Failed);
        assert!(loader.begin(ready).is_none());

        loader.reset();
        let ticket = loader.begin(ready).unwrap();
        let outcome = loader.finish(
            &ticket,
            Ok(FetchResponse { status: 200, body: "{\"not\": \"an array\"}".to_string() }),
        );
        assert!(matches!(outcome, Some(Err(LoadError::Decode(_)))));
    }

    #[test]
    fn stale_ticket_is_discarded_after_reset() {
        let ready = ready_token();
        let mut loader = DatasetLoader::new("http://data", RecordFields::default(), DuplicatePolicy::Merge);

        let stale = loader.begin(ready).unwrap();
        loader.reset();
        let body = serde_json::to_string(&lake_records()).unwrap();
        assert!(loader.finish(&stale, Ok(FetchResponse { status: 200, body })).is_none());
        assert_eq!(loader.phase(), LoadPhase::Idle);
        assert!(loader.begin(ready).is_some());
    }
}
