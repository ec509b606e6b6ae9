//! Synchronization with the remote feature store.
//!
//! Every operation is a single request/response round trip with no retry.
//! Requests go through a [`Transport`], which returns `'static` futures so
//! they can run as local tasks on the interaction thread.

mod geojson;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod http;

pub use geojson::{read_features, write_feature};
pub use memory::{MemoryTransport, RecordedRequest};

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpTransport;

use crate::feature::{Feature, FeatureId, category_color};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use url::form_urlencoded;

/// Fetch all features, or those of the `show` categories.
pub const GET_PATH: &str = "/api/gis/get";
/// Child ids of a feature: `/api/gis/children/{id}`.
pub const CHILDREN_PATH: &str = "/api/gis/children";
pub const SAVE_PATH: &str = "/api/gis/save";
pub const DELETE_PATH: &str = "/api/gis/delete";

/// Feature store errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Store responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

/// Result type for store operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Boxed future for store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A request/response channel to the store. Bodies are JSON.
pub trait Transport {
    /// GET `path` (including any query string).
    fn get(&self, path: &str) -> BoxFuture<'static, SyncResult<Value>>;

    /// POST `body` to `path`.
    fn post(&self, path: &str, body: Value) -> BoxFuture<'static, SyncResult<Value>>;
}

/// Body of a save request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRequest {
    pub layer: String,
    pub features: Vec<Value>,
    pub color: String,
}

/// Body of a delete request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub id: Option<FeatureId>,
}

/// Response of a children lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChildrenResponse {
    #[serde(default)]
    pub children: Vec<FeatureId>,
}

/// The `show` query value: each category single-quoted, comma-joined.
/// Category names are form-encoded.
pub fn show_query(categories: &BTreeSet<String>) -> String {
    categories
        .iter()
        .map(|category| format!("'{}'", form_urlencoded::byte_serialize(category.as_bytes()).collect::<String>()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Percent-encode a single path segment.
pub fn encode_segment(segment: &str) -> String {
    // Form encoding writes spaces as '+' and escapes a literal '+' as %2B.
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Request/response translation for the five store operations.
#[derive(Debug, Clone)]
pub struct FeatureSyncClient<T> {
    transport: T,
}

impl<T: Transport> FeatureSyncClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Every feature in the store.
    pub fn fetch_all(&self) -> BoxFuture<'static, SyncResult<Vec<Feature>>> {
        log::debug!("GET {}", GET_PATH);
        let response = self.transport.get(GET_PATH);
        Box::pin(async move { read_features(response.await?) })
    }

    /// Features in any of `categories`. An empty set resolves to no features
    /// without contacting the store.
    pub fn fetch_by_categories(
        &self,
        categories: &BTreeSet<String>,
    ) -> BoxFuture<'static, SyncResult<Vec<Feature>>> {
        if categories.is_empty() {
            log::debug!("Empty category filter, skipping fetch");
            return Box::pin(async { Ok(Vec::new()) });
        }
        let path = format!("{}?show={}", GET_PATH, show_query(categories));
        log::debug!("GET {}", path);
        let response = self.transport.get(&path);
        Box::pin(async move { read_features(response.await?) })
    }

    /// Ids of the features contained in feature `id`.
    pub fn fetch_children(&self, id: &FeatureId) -> BoxFuture<'static, SyncResult<Vec<FeatureId>>> {
        let path = format!("{}/{}", CHILDREN_PATH, encode_segment(&id.to_string()));
        log::debug!("GET {}", path);
        let response = self.transport.get(&path);
        Box::pin(async move {
            let response: ChildrenResponse = serde_json::from_value(response.await?)?;
            Ok(response.children)
        })
    }

    /// Save the features without a store id under `category`. Resolves to the
    /// number of features sent; persisted features are never resent.
    pub fn save_new(&self, category: &str, features: &[Feature]) -> BoxFuture<'static, SyncResult<usize>> {
        let features: Vec<Value> = features
            .iter()
            .filter(|feature| !feature.is_persisted())
            .map(write_feature)
            .collect();
        let count = features.len();
        let request = SaveRequest {
            layer: category.to_string(),
            features,
            color: category_color(category).to_string(),
        };
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => return Box::pin(async move { Err(SyncError::from(e)) }),
        };
        log::debug!("POST {} ({} features)", SAVE_PATH, count);
        let response = self.transport.post(SAVE_PATH, body);
        Box::pin(async move {
            response.await?;
            Ok(count)
        })
    }

    /// Delete feature `id`; `None` is sent as a null id.
    pub fn delete_by_id(&self, id: Option<&FeatureId>) -> BoxFuture<'static, SyncResult<()>> {
        let body = serde_json::json!({ "id": id });
        log::debug!("POST {} (id {:?})", DELETE_PATH, id);
        let response = self.transport.post(DELETE_PATH, body);
        Box::pin(async move {
            response.await?;
            Ok(())
        })
    }
}
