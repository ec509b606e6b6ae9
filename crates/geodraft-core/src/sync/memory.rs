//! In-memory feature store for tests and offline use.

use super::{
    BoxFuture, CHILDREN_PATH, DELETE_PATH, DeleteRequest, GET_PATH, SAVE_PATH, SaveRequest, SyncError,
    SyncResult, Transport, encode_segment, write_feature,
};
use crate::feature::{Feature, FeatureId};
use futures::channel::oneshot;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;
use url::form_urlencoded;

/// A request received by a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct State {
    /// GeoJSON features in insertion order, each with its id set.
    features: Vec<(FeatureId, Value)>,
    children: HashMap<FeatureId, Vec<FeatureId>>,
    next_id: i64,
    requests: Vec<RecordedRequest>,
    failures: VecDeque<SyncError>,
    holding: bool,
    held: VecDeque<(oneshot::Sender<SyncResult<Value>>, SyncResult<Value>)>,
}

/// Serves the store endpoints from memory and records every request.
///
/// Clones share the same store, so a test can keep a handle while a
/// workspace owns another.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Rc<RefCell<State>>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryTransport")
            .field("features", &state.features.len())
            .field("requests", &state.requests.len())
            .finish()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a feature directly, assigning it an id. Not recorded as a request.
    pub fn insert(&self, feature: Feature) -> FeatureId {
        let mut state = self.state.borrow_mut();
        let id = state.assign_id();
        let mut value = write_feature(&feature);
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), json!(id));
        }
        state.features.push((id.clone(), value));
        id
    }

    /// Declare the children returned for `parent`.
    pub fn set_children(&self, parent: &FeatureId, children: Vec<FeatureId>) {
        self.state.borrow_mut().children.insert(parent.clone(), children);
    }

    /// Number of features in the store.
    pub fn len(&self) -> usize {
        self.state.borrow().features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.state.borrow().features.iter().any(|(stored, _)| stored == id)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().requests.len()
    }

    /// Make the next request fail with `error`.
    pub fn fail_next(&self, error: SyncError) {
        self.state.borrow_mut().failures.push_back(error);
    }

    /// Hold responses until [`release`](Self::release) is called.
    pub fn hold(&self) {
        self.state.borrow_mut().holding = true;
    }

    /// Number of responses waiting to be released.
    pub fn held(&self) -> usize {
        self.state.borrow().held.len()
    }

    /// Deliver held responses, newest first if `reverse`, and stop holding.
    pub fn release(&self, reverse: bool) -> usize {
        let held: Vec<_> = {
            let mut state = self.state.borrow_mut();
            state.holding = false;
            state.held.drain(..).collect()
        };
        let count = held.len();
        let deliver = |(tx, result): (oneshot::Sender<SyncResult<Value>>, SyncResult<Value>)| {
            let _ = tx.send(result);
        };
        if reverse {
            held.into_iter().rev().for_each(deliver);
        } else {
            held.into_iter().for_each(deliver);
        }
        count
    }

    fn respond(&self, method: &'static str, path: &str, body: Option<Value>) -> BoxFuture<'static, SyncResult<Value>> {
        let mut state = self.state.borrow_mut();
        state.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.clone(),
        });
        let result = match state.failures.pop_front() {
            Some(error) => Err(error),
            None => state.handle(method, path, body),
        };
        if !state.holding {
            return Box::pin(async move { result });
        }
        let (tx, rx) = oneshot::channel();
        state.held.push_back((tx, result));
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(SyncError::Transport("request dropped".to_string())))
        })
    }
}

impl State {
    fn assign_id(&mut self) -> FeatureId {
        self.next_id += 1;
        FeatureId::Number(self.next_id)
    }

    fn handle(&mut self, method: &str, path: &str, body: Option<Value>) -> SyncResult<Value> {
        match (method, path) {
            ("GET", _) if path.starts_with(GET_PATH) => self.get_features(&path[GET_PATH.len()..]),
            ("GET", _) if path.starts_with(CHILDREN_PATH) => {
                let id = path[CHILDREN_PATH.len()..].trim_start_matches('/');
                let children = self
                    .children
                    .iter()
                    .find(|(parent, _)| encode_segment(&parent.to_string()) == id)
                    .map(|(_, children)| children.clone())
                    .unwrap_or_default();
                Ok(json!({ "children": children }))
            }
            ("POST", SAVE_PATH) => {
                let request: SaveRequest = serde_json::from_value(body.unwrap_or_default())?;
                let mut ids = Vec::with_capacity(request.features.len());
                for mut feature in request.features {
                    let id = self.assign_id();
                    if let Value::Object(map) = &mut feature {
                        map.insert("id".to_string(), json!(id));
                        let properties = map.entry("properties").or_insert_with(|| json!({}));
                        if !properties.is_object() {
                            *properties = json!({});
                        }
                        if let Value::Object(properties) = properties {
                            properties
                                .entry("layer_type")
                                .or_insert_with(|| json!(request.layer));
                            properties
                                .entry("color")
                                .or_insert_with(|| json!(request.color));
                        }
                    }
                    self.features.push((id.clone(), feature));
                    ids.push(id);
                }
                Ok(json!({ "ids": ids }))
            }
            ("POST", DELETE_PATH) => {
                let request: DeleteRequest = serde_json::from_value(body.unwrap_or_default())?;
                let before = self.features.len();
                if let Some(id) = &request.id {
                    self.features.retain(|(stored, _)| stored != id);
                }
                Ok(json!({ "deleted": self.features.len() != before }))
            }
            _ => Err(SyncError::Status {
                status: 404,
                body: format!("no route for {} {}", method, path),
            }),
        }
    }

    fn get_features(&self, query: &str) -> SyncResult<Value> {
        let show: Option<BTreeSet<String>> = query.strip_prefix('?').and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "show")
                .map(|(_, list)| {
                    list.split(',')
                        .map(|c| c.trim().trim_matches('\'').to_string())
                        .collect()
                })
        });
        let features: Vec<&Value> = self
            .features
            .iter()
            .map(|(_, value)| value)
            .filter(|value| {
                show.as_ref().is_none_or(|show| {
                    value["properties"]["layer_type"]
                        .as_str()
                        .is_some_and(|layer| show.contains(layer))
                })
            })
            .collect();
        Ok(json!({ "type": "FeatureCollection", "features": features }))
    }
}

impl Transport for MemoryTransport {
    fn get(&self, path: &str) -> BoxFuture<'static, SyncResult<Value>> {
        self.respond("GET", path, None)
    }

    fn post(&self, path: &str, body: Value) -> BoxFuture<'static, SyncResult<Value>> {
        self.respond("POST", path, Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use futures::executor::block_on;
    use kurbo::Point;

    fn triangle() -> Geometry {
        Geometry::polygon(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)])
    }

    #[test]
    fn test_unknown_route() {
        let transport = MemoryTransport::new();
        let result = block_on(transport.get("/api/gis/nope"));
        assert!(matches!(result, Err(SyncError::Status { status: 404, .. })));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_save_assigns_ids_and_category() {
        let transport = MemoryTransport::new();
        let body = json!({
            "layer": "Parcels",
            "color": "blue",
            "features": [{ "type": "Feature", "geometry": null }]
        });
        let response = block_on(transport.post(SAVE_PATH, body)).unwrap();
        assert_eq!(response["ids"], json!([1]));

        let collection = block_on(transport.get("/api/gis/get?show='Parcels'")).unwrap();
        let stored = &collection["features"][0];
        assert_eq!(stored["id"], 1);
        assert_eq!(stored["properties"]["layer_type"], "Parcels");
        assert_eq!(stored["properties"]["color"], "blue");
    }

    #[test]
    fn test_delete_removes_feature() {
        let transport = MemoryTransport::new();
        let id = transport.insert(Feature::new(triangle(), "Buildings"));
        block_on(transport.post(DELETE_PATH, json!({ "id": id }))).unwrap();
        assert!(transport.is_empty());
    }

    #[test]
    fn test_held_responses_wait_for_release() {
        let transport = MemoryTransport::new();
        transport.hold();
        let mut first = transport.get(GET_PATH);
        let mut second = transport.get("/api/gis/children/1");
        assert_eq!(transport.held(), 2);

        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        assert!(first.as_mut().poll(&mut cx).is_pending());

        assert_eq!(transport.release(true), 2);
        assert!(block_on(first).is_ok());
        assert_eq!(block_on(second.as_mut()).unwrap(), json!({ "children": [] }));
    }
}
