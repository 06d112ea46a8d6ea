//! Slateboard HTTP Relay Server
//!
//! A simple polling relay that holds the authoritative element state per
//! canvas. Clients POST messages to `/collaborate` and always get a JSON
//! response back.
//!
//! ## Protocol
//!
//! Messages are JSON with the following format:
//! ```json
//! { "type": "sync", "canvasId": "c1", "userId": "u1" }
//! { "type": "update-element", "canvasId": "c1", "userId": "u1", "data": { ... } }
//! { "type": "delete-element", "canvasId": "c1", "userId": "u1", "data": "<uuid>" }
//! ```
//!
//! `sync` answers with the full element list; mutations answer with a bare
//! ack. There is no merge: the stored element state is last-write-wins per
//! element, and clients reconcile through full sync.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use dashmap::DashMap;
use slate_core::collab::{RelayMessage, SyncResponse};
use slate_core::element::{Element, ElementId};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use uuid::Uuid;

/// Shared application state
struct AppState {
    /// Element state per canvas
    canvases: DashMap<String, Vec<Element>>,
}

impl AppState {
    fn new() -> Self {
        Self {
            canvases: DashMap::new(),
        }
    }

    /// Full element list for a canvas, in z order. Unknown canvases are
    /// empty, not errors.
    fn sync(&self, canvas_id: &str) -> Vec<Element> {
        let mut elements = self
            .canvases
            .get(canvas_id)
            .map(|e| e.clone())
            .unwrap_or_default();
        elements.sort_by_key(|e| e.z_index);
        elements
    }

    /// Insert or replace one element. Elements arriving without an id get
    /// one assigned here.
    fn upsert(&self, canvas_id: &str, mut element: Element) {
        if element.id.is_none() {
            element.id = Some(Uuid::new_v4());
        }
        let mut elements = self.canvases.entry(canvas_id.to_string()).or_default();
        match elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => elements.push(element),
        }
    }

    /// Remove one element. Absent ids are ignored.
    fn delete(&self, canvas_id: &str, id: ElementId) {
        if let Some(mut elements) = self.canvases.get_mut(canvas_id) {
            elements.retain(|e| e.id != Some(id));
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slate_relay=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/collaborate", post(collaborate))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3030));
    info!("Slateboard relay server listening on {}", addr);
    info!("Collaboration endpoint: http://localhost:3030/collaborate");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Index page
async fn index() -> &'static str {
    "Slateboard Relay Server - POST collaboration messages to /collaborate"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Single collaboration endpoint; the message type selects the operation.
async fn collaborate(
    State(state): State<Arc<AppState>>,
    Json(message): Json<RelayMessage>,
) -> Json<SyncResponse> {
    match message {
        RelayMessage::Sync { canvas_id, user_id } => {
            debug!("Sync canvas {} for {}", canvas_id, user_id);
            Json(SyncResponse {
                success: true,
                elements: state.sync(&canvas_id),
            })
        }
        RelayMessage::UpdateElement {
            canvas_id,
            user_id,
            data,
        } => {
            debug!("Update on canvas {} from {}", canvas_id, user_id);
            state.upsert(&canvas_id, data);
            Json(SyncResponse::accepted())
        }
        RelayMessage::DeleteElement {
            canvas_id,
            user_id,
            data,
        } => {
            debug!("Delete {} on canvas {} from {}", data, canvas_id, user_id);
            state.delete(&canvas_id, data);
            Json(SyncResponse::accepted())
        }
    }
}
