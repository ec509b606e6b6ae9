//! HTTP transport for native platforms.
//!
//! Each request runs on its own short-lived thread; the response comes back
//! through a oneshot channel, so the returned future never blocks the
//! interaction thread.

use super::{BoxFuture, SyncError, SyncResult, Transport};
use futures::channel::oneshot;
use serde_json::Value;
use std::thread;
use url::Url;

/// Talks to a feature store over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    base: Url,
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").field("base", &self.base.as_str()).finish()
    }
}

impl HttpTransport {
    /// Create a transport for the store at `base` (e.g. `http://127.0.0.1:8090`).
    pub fn new(base: &str) -> SyncResult<Self> {
        let base = Url::parse(base).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", base, e)))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "unsupported scheme: {}",
                base.scheme()
            )));
        }
        Ok(Self {
            base,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of a store path.
    pub fn endpoint(&self, path: &str) -> SyncResult<Url> {
        self.base
            .join(path)
            .map_err(|e| SyncError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn send(&self, method: &'static str, path: &str, body: Option<Value>) -> BoxFuture<'static, SyncResult<Value>> {
        let url = match self.endpoint(path) {
            Ok(url) => url,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let agent = self.agent.clone();
        let (tx, rx) = oneshot::channel();

        let spawned = thread::Builder::new()
            .name("geodraft-http".to_string())
            .spawn(move || {
                let _ = tx.send(execute(&agent, method, &url, body));
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn request thread: {}", e);
        }

        Box::pin(async move {
            rx.await.unwrap_or_else(|_| {
                Err(SyncError::Transport(
                    "request thread ended without a response".to_string(),
                ))
            })
        })
    }
}

fn execute(agent: &ureq::Agent, method: &str, url: &Url, body: Option<Value>) -> SyncResult<Value> {
    let request = agent.request(method, url.as_str());
    let response = match body {
        Some(body) => request.send_json(body),
        None => request.call(),
    };

    match response {
        Ok(response) => {
            let text = response
                .into_string()
                .map_err(|e| SyncError::Transport(e.to_string()))?;
            if text.trim().is_empty() {
                Ok(Value::Null)
            } else {
                Ok(serde_json::from_str(&text)?)
            }
        }
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            log::warn!("{} {} returned {}: {}", method, url, status, body);
            Err(SyncError::Status { status, body })
        }
        Err(ureq::Error::Transport(e)) => {
            log::error!("{} {} failed: {}", method, url, e);
            Err(SyncError::Transport(e.to_string()))
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str) -> BoxFuture<'static, SyncResult<Value>> {
        self.send("GET", path, None)
    }

    fn post(&self, path: &str, body: Value) -> BoxFuture<'static, SyncResult<Value>> {
        self.send("POST", path, Some(body))
    }
}
