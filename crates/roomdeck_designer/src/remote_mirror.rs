use ehttp::Request;
use poll_promise::Promise;
use tracing::{info, warn};

use crate::codec::RoomConfiguration;
use crate::error::Result;

type MirrorResult = std::result::Result<(), String>;

/// Best-effort copy of saved configurations to the remote "create/update
/// room" endpoint. A failed mirror is logged and otherwise ignored; the
/// local save has already succeeded by the time we get here.
pub struct RemoteMirror {
    endpoint: Option<String>,
    in_flight: Vec<(String, Promise<MirrorResult>)>,
}

pub fn build_request(endpoint: &str, config: &RoomConfiguration) -> Result<Request> {
    let body = serde_json::to_vec(config)?;
    let headers = ehttp::Headers::new(&[
        ("Content-Type", "application/json"),
        ("Accept", "application/json"),
    ]);

    Ok(Request {
        method: "POST".to_string(),
        url: endpoint.to_string(),
        headers,
        body,
    })
}

impl RemoteMirror {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            in_flight: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Send a configuration. Returns false when no endpoint is configured
    /// or the request could not be built.
    pub fn push(&mut self, config: &RoomConfiguration) -> bool {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return false;
        };

        let request = match build_request(endpoint, config) {
            Ok(request) => request,
            Err(err) => {
                warn!("could not mirror configuration {}: {err}", config.id);
                return false;
            }
        };

        let (sender, promise) = Promise::new();
        ehttp::fetch(request, move |response: ehttp::Result<ehttp::Response>| {
            let result = match response {
                Ok(resp) if resp.ok => Ok(()),
                Ok(resp) => Err(format!("HTTP {}: {}", resp.status, resp.status_text)),
                Err(e) => Err(format!("HTTP error: {e}")),
            };
            sender.send(result);
        });

        self.in_flight.push((config.id.clone(), promise));
        true
    }

    /// Log finished mirror requests. Returns how many finished.
    pub fn poll(&mut self) -> usize {
        let before = self.in_flight.len();
        let mut still_running = Vec::with_capacity(before);

        for (id, promise) in self.in_flight.drain(..) {
            if promise.ready().is_none() {
                still_running.push((id, promise));
                continue;
            }
            match promise.block_and_take() {
                Ok(()) => info!("mirrored configuration {id}"),
                Err(err) => warn!("remote mirror failed for {id}: {err}"),
            }
        }

        self.in_flight = still_running;
        before - self.in_flight.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
