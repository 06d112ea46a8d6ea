//! Collaboration channel: a request/response polling relay.
//!
//! Not a persistent socket. The client POSTs a `sync` message on a fixed
//! interval and receives the authoritative full element list; local
//! mutations are posted immediately and fire-and-forget. Reconciliation is
//! last-full-sync-wins, with no merge.

use crate::element::{Element, ElementId};
use crate::presence::{Presence, PresenceMap};
use crate::providers::Identity;
use crate::timer::{Interval, Throttle};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Poll period for full sync.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum spacing between cursor broadcasts.
pub const CURSOR_THROTTLE: Duration = Duration::from_millis(50);

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Bad response: {0}")]
    BadResponse(String),
    #[error("Relay unavailable")]
    Unavailable,
}

/// Messages accepted by the relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RelayMessage {
    /// Request the authoritative element list for a canvas.
    Sync { canvas_id: String, user_id: String },
    /// Create or replace one element, carried in full.
    UpdateElement {
        canvas_id: String,
        user_id: String,
        data: Element,
    },
    /// Remove one element by id.
    DeleteElement {
        canvas_id: String,
        user_id: String,
        data: ElementId,
    },
}

/// Relay response; `elements` is populated for `sync` only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl SyncResponse {
    /// Ack for mutation messages.
    pub fn accepted() -> Self {
        Self {
            success: true,
            elements: Vec::new(),
        }
    }
}

/// Transport boundary for the relay.
///
/// `post` is awaited (the sync poll needs the response); `post_detached` is
/// fire-and-forget for mutations. Failures are logged, never retried, and
/// never roll back the optimistic local state.
pub trait Relay: Send {
    fn post(&self, message: &RelayMessage) -> Result<SyncResponse, RelayError>;

    fn post_detached(&self, message: RelayMessage) {
        if let Err(e) = self.post(&message) {
            log::warn!("Relay post failed: {}", e);
        }
    }
}

/// Shared in-memory relay for tests and single-process multi-session use.
/// All clones observe the same canvas table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelay {
    canvases: Arc<Mutex<HashMap<String, Vec<Element>>>>,
}

impl InMemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Relay for InMemoryRelay {
    fn post(&self, message: &RelayMessage) -> Result<SyncResponse, RelayError> {
        let mut canvases = self
            .canvases
            .lock()
            .map_err(|e| RelayError::Transport(format!("Lock error: {}", e)))?;
        match message {
            RelayMessage::Sync { canvas_id, .. } => Ok(SyncResponse {
                success: true,
                elements: canvases.get(canvas_id).cloned().unwrap_or_default(),
            }),
            RelayMessage::UpdateElement {
                canvas_id, data, ..
            } => {
                let elements = canvases.entry(canvas_id.clone()).or_default();
                // Same upsert rule as the relay server: elements arriving
                // without an id get one assigned here.
                let mut data = data.clone();
                if data.id.is_none() {
                    data.id = Some(ElementId::new_v4());
                }
                match elements.iter_mut().find(|e| e.id == data.id) {
                    Some(existing) => *existing = data,
                    None => elements.push(data),
                }
                Ok(SyncResponse::accepted())
            }
            RelayMessage::DeleteElement {
                canvas_id, data, ..
            } => {
                if let Some(elements) = canvases.get_mut(canvas_id) {
                    elements.retain(|e| e.id != Some(*data));
                }
                Ok(SyncResponse::accepted())
            }
        }
    }
}

/// HTTP relay transport backed by a blocking client.
///
/// Detached posts go through a background worker thread so pointer handlers
/// never wait on the network.
pub struct HttpRelay {
    endpoint: String,
    client: reqwest::blocking::Client,
    detached_tx: Sender<RelayMessage>,
    _worker: JoinHandle<()>,
}

impl HttpRelay {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RelayError> {
        let endpoint = endpoint.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let (detached_tx, detached_rx) = channel::<RelayMessage>();
        let worker_client = client.clone();
        let worker_endpoint = endpoint.clone();
        let worker = thread::spawn(move || {
            // Exits when the sender side is dropped with the relay.
            while let Ok(message) = detached_rx.recv() {
                if let Err(e) = post_blocking(&worker_client, &worker_endpoint, &message) {
                    log::warn!("Relay post failed: {}", e);
                }
            }
        });

        Ok(Self {
            endpoint,
            client,
            detached_tx,
            _worker: worker,
        })
    }
}

fn post_blocking(
    client: &reqwest::blocking::Client,
    endpoint: &str,
    message: &RelayMessage,
) -> Result<SyncResponse, RelayError> {
    let response = client
        .post(endpoint)
        .json(message)
        .send()
        .map_err(|e| RelayError::Transport(e.to_string()))?;
    if !response.status().is_success() {
        return Err(RelayError::BadResponse(format!(
            "HTTP {}",
            response.status()
        )));
    }
    response
        .json::<SyncResponse>()
        .map_err(|e| RelayError::BadResponse(e.to_string()))
}

impl Relay for HttpRelay {
    fn post(&self, message: &RelayMessage) -> Result<SyncResponse, RelayError> {
        post_blocking(&self.client, &self.endpoint, message)
    }

    fn post_detached(&self, message: RelayMessage) {
        if self.detached_tx.send(message).is_err() {
            log::warn!("Relay worker has stopped; dropping message");
        }
    }
}

/// Per-session collaboration client.
///
/// Owns the presence map and the poll/throttle timers; both are released
/// when the session drops.
pub struct CollabClient {
    canvas_id: String,
    identity: Identity,
    relay: Box<dyn Relay>,
    presence: PresenceMap,
    cursor_throttle: Throttle,
    poll_interval: Interval,
    connected: bool,
}

impl CollabClient {
    pub fn new(
        canvas_id: impl Into<String>,
        identity: Identity,
        relay: Box<dyn Relay>,
        now: Instant,
    ) -> Self {
        let presence = PresenceMap::new(identity.user_id.clone());
        Self {
            canvas_id: canvas_id.into(),
            identity,
            relay,
            presence,
            cursor_throttle: Throttle::new(CURSOR_THROTTLE),
            poll_interval: Interval::new(SYNC_INTERVAL, now),
            connected: false,
        }
    }

    /// Run one immediate sync round trip. Returns the authoritative element
    /// list on success; a failure leaves local state untouched.
    pub fn sync(&mut self) -> Option<Vec<Element>> {
        let message = RelayMessage::Sync {
            canvas_id: self.canvas_id.clone(),
            user_id: self.identity.user_id.clone(),
        };
        match self.relay.post(&message) {
            Ok(response) if response.success => {
                self.connected = true;
                let mut elements = response.elements;
                elements.sort_by_key(|e| e.z_index);
                Some(elements)
            }
            Ok(_) => {
                log::warn!("Sync rejected for canvas {}", self.canvas_id);
                None
            }
            Err(e) => {
                log::warn!("Sync failed for canvas {}: {}", self.canvas_id, e);
                self.connected = false;
                None
            }
        }
    }

    /// Drive the poll interval and presence expiry. Returns a fresh element
    /// list when a poll tick elapsed and the sync succeeded.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<Element>> {
        self.presence.expire(now);
        if self.poll_interval.tick(now) {
            self.sync()
        } else {
            None
        }
    }

    /// Broadcast a created or updated element. Fire-and-forget.
    pub fn send_update(&self, element: &Element) {
        self.relay.post_detached(RelayMessage::UpdateElement {
            canvas_id: self.canvas_id.clone(),
            user_id: self.identity.user_id.clone(),
            data: element.clone(),
        });
    }

    /// Broadcast a deletion. Fire-and-forget.
    pub fn send_delete(&self, id: ElementId) {
        self.relay.post_detached(RelayMessage::DeleteElement {
            canvas_id: self.canvas_id.clone(),
            user_id: self.identity.user_id.clone(),
            data: id,
        });
    }

    /// Throttled local cursor update feeding the presence map.
    pub fn cursor_moved(&mut self, cursor: Point, selected: Option<ElementId>, now: Instant) {
        if self.cursor_throttle.allow(now) {
            let user_id = self.identity.user_id.clone();
            let user_name = self.identity.user_name.clone();
            self.presence
                .observe(&user_id, &user_name, Some(cursor), selected, now);
        }
    }

    /// Record a remote participant, e.g. from a relay-side presence feed.
    pub fn observe_peer(
        &mut self,
        user_id: &str,
        user_name: &str,
        cursor: Option<Point>,
        selected: Option<ElementId>,
        now: Instant,
    ) {
        self.presence.observe(user_id, user_name, cursor, selected, now);
    }

    /// Peers for remote-cursor rendering; self is always excluded.
    pub fn peers(&self) -> Vec<&Presence> {
        self.presence.peers()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ShapeData;
    use uuid::Uuid;

    fn identity(id: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            user_name: format!("User {}", id),
        }
    }

    fn element(z: i64) -> Element {
        let mut el = Element::new(ShapeData::Path {
            points: vec![Point::new(0.0, 0.0)],
        })
        .with_z_index(z);
        el.id = Some(Uuid::new_v4());
        el
    }

    #[test]
    fn test_message_wire_format() {
        let msg = RelayMessage::Sync {
            canvas_id: "c1".to_string(),
            user_id: "u1".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"sync""#));
        assert!(json.contains(r#""canvasId":"c1""#));
        assert!(json.contains(r#""userId":"u1""#));

        let msg = RelayMessage::UpdateElement {
            canvas_id: "c1".to_string(),
            user_id: "u1".to_string(),
            data: element(0),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"update-element""#));
        assert!(json.contains(r#""kind":"path""#));
    }

    #[test]
    fn test_sync_response_tolerates_missing_elements() {
        let response: SyncResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(response.success);
        assert!(response.elements.is_empty());
    }

    #[test]
    fn test_two_clients_converge() {
        let t0 = Instant::now();
        let relay = InMemoryRelay::new();
        let mut alice = CollabClient::new("c1", identity("alice"), Box::new(relay.clone()), t0);
        let mut bob = CollabClient::new("c1", identity("bob"), Box::new(relay.clone()), t0);

        let el = element(1);
        alice.send_update(&el);

        let seen = bob.sync().unwrap();
        assert_eq!(seen, vec![el.clone()]);

        bob.send_delete(el.id.unwrap());
        assert!(alice.sync().unwrap().is_empty());
    }

    #[test]
    fn test_update_is_upsert() {
        let relay = InMemoryRelay::new();
        let t0 = Instant::now();
        let mut client = CollabClient::new("c1", identity("a"), Box::new(relay.clone()), t0);

        let mut el = element(0);
        client.send_update(&el);
        el.color = "#ff0000".to_string();
        client.send_update(&el);

        let elements = client.sync().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].color, "#ff0000");
    }

    #[test]
    fn test_update_assigns_missing_id() {
        let relay = InMemoryRelay::new();
        let t0 = Instant::now();
        let mut client = CollabClient::new("c1", identity("a"), Box::new(relay), t0);

        let el = Element::new(ShapeData::Path {
            points: vec![Point::new(0.0, 0.0)],
        });
        assert!(el.id.is_none());
        client.send_update(&el);

        let elements = client.sync().unwrap();
        assert_eq!(elements.len(), 1);
        assert!(elements[0].id.is_some());
    }

    #[test]
    fn test_sync_orders_by_z_index() {
        let relay = InMemoryRelay::new();
        let t0 = Instant::now();
        let mut client = CollabClient::new("c1", identity("a"), Box::new(relay.clone()), t0);

        client.send_update(&element(5));
        client.send_update(&element(1));
        client.send_update(&element(3));

        let z: Vec<i64> = client.sync().unwrap().iter().map(|e| e.z_index).collect();
        assert_eq!(z, vec![1, 3, 5]);
    }

    #[test]
    fn test_poll_respects_interval() {
        let t0 = Instant::now();
        let relay = InMemoryRelay::new();
        let mut client = CollabClient::new("c1", identity("a"), Box::new(relay), t0);

        assert!(client.poll(t0 + Duration::from_secs(10)).is_none());
        assert!(client.poll(t0 + Duration::from_secs(30)).is_some());
        assert!(client.poll(t0 + Duration::from_secs(31)).is_none());
    }

    #[test]
    fn test_cursor_throttle_coalesces() {
        let t0 = Instant::now();
        let relay = InMemoryRelay::new();
        let mut client = CollabClient::new("c1", identity("me"), Box::new(relay), t0);
        let mut other = PresenceMap::new("someone-else");

        client.cursor_moved(Point::new(1.0, 1.0), None, t0);
        client.cursor_moved(Point::new(2.0, 2.0), None, t0 + Duration::from_millis(10));

        // Second move was inside the throttle window; self entry still holds
        // the first position. Peers always exclude self regardless.
        assert!(client.peers().is_empty());
        other.observe("me", "Me", Some(Point::new(1.0, 1.0)), None, t0);
        assert_eq!(other.peers().len(), 1);
    }

    #[test]
    fn test_peer_expiry_via_poll() {
        let t0 = Instant::now();
        let relay = InMemoryRelay::new();
        let mut client = CollabClient::new("c1", identity("me"), Box::new(relay), t0);

        client.observe_peer("p", "Peer", Some(Point::new(0.0, 0.0)), None, t0);
        client.poll(t0 + Duration::from_secs(59));
        assert_eq!(client.peers().len(), 1);

        client.poll(t0 + Duration::from_secs(61));
        assert!(client.peers().is_empty());
    }
}
