//! REST and WebSocket API over the current topology snapshot.
//!
//! # Endpoints
//!
//! - `GET /` - HTML page with the rendered forest
//! - `GET /api/place` - the current snapshot document
//! - `PUT /api/place` - replace the snapshot (last write wins)
//! - `GET /api/tree?root=KEY&lenient=true` - JSON tree or forest
//! - `GET /api/tree/html?root=KEY` - rendered HTML fragment
//! - `GET /api/device/{key}` - device detail
//! - `POST /api/search` - `{"query": "<mac or ipv4>"}`
//! - `GET /api/stats` - snapshot and WebSocket statistics
//! - `WS /ws/updates` - [`TopologyEvent`] stream
//!
//! The snapshot lives behind `Arc<RwLock<..>>` as an `Arc<TopologySnapshot>`.
//! Handlers clone the inner `Arc` and release the lock before building, so
//! every build works on one immutable snapshot while a concurrent replace
//! swaps in the next one.

use crate::detail::{device_detail, DeviceDetail};
use crate::error::{Error, Result};
use crate::events::{EventBroadcaster, TopologyEvent};
use crate::render::{render_forest_html, render_html, render_page};
use crate::search::{search, SearchHit};
use crate::snapshot::TopologySnapshot;
use crate::tree::{BuildOptions, ForestEntry, TreeBuilder, ViewNode, ROOT_LEVEL};

use axum::extract::ws::{Message, WebSocket};
use axum::http::StatusCode;
use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::{
    sink::{Sink, SinkExt},
    stream::StreamExt,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

/// The current snapshot and how many times it has been replaced.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    /// The snapshot, once one has been loaded.
    pub snapshot: Option<Arc<TopologySnapshot>>,
    /// Number of snapshots loaded so far.
    pub generation: u64,
}

/// Shared state for the Axum application.
///
/// # Examples
///
/// ```
/// use topology_viz::{ApiState, TopologySnapshot};
///
/// #[tokio::main]
/// async fn main() {
///     let state = ApiState::new();
///     assert!(state.current().await.is_err());
///
///     let generation = state.replace_snapshot(TopologySnapshot::default()).await;
///     assert_eq!(generation, 1);
///     assert!(state.current().await.is_ok());
/// }
/// ```
#[derive(Clone)]
pub struct ApiState {
    /// The current snapshot.
    pub slot: Arc<RwLock<SnapshotSlot>>,
    /// Notifies WebSocket clients of replacements.
    pub broadcaster: EventBroadcaster,
    /// Options for every tree build.
    pub options: BuildOptions,
}

impl ApiState {
    /// Creates a state with no snapshot and default build options.
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    /// Creates a state with no snapshot.
    pub fn with_options(options: BuildOptions) -> Self {
        Self {
            slot: Arc::new(RwLock::new(SnapshotSlot::default())),
            broadcaster: EventBroadcaster::new(),
            options,
        }
    }

    /// Creates a state holding `snapshot` as generation 1.
    pub fn with_snapshot(snapshot: TopologySnapshot, options: BuildOptions) -> Self {
        Self {
            slot: Arc::new(RwLock::new(SnapshotSlot {
                snapshot: Some(Arc::new(snapshot)),
                generation: 1,
            })),
            broadcaster: EventBroadcaster::new(),
            options,
        }
    }

    /// Returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSnapshot`] if none has been loaded.
    pub async fn current(&self) -> Result<Arc<TopologySnapshot>> {
        self.slot
            .read()
            .await
            .snapshot
            .clone()
            .ok_or(Error::NoSnapshot)
    }

    /// Current generation; 0 before the first snapshot.
    pub async fn generation(&self) -> u64 {
        self.slot.read().await.generation
    }

    /// Replaces the snapshot, notifies clients and returns the new generation.
    ///
    /// A snapshot whose forest does not build is still stored; clients get
    /// a [`TopologyEvent::Error`] right after the replace notification.
    pub async fn replace_snapshot(&self, snapshot: TopologySnapshot) -> u64 {
        let snapshot = Arc::new(snapshot);
        let devices = snapshot.devices.len();
        let roots: Vec<String> = snapshot.root_keys().map(str::to_string).collect();
        let generation = {
            let mut slot = self.slot.write().await;
            slot.snapshot = Some(Arc::clone(&snapshot));
            slot.generation += 1;
            slot.generation
        };
        log::info!(
            "Snapshot generation {} loaded: {} devices, {} roots",
            generation,
            devices,
            roots.len()
        );
        self.broadcaster
            .broadcast(TopologyEvent::snapshot_replaced(generation, devices, roots))
            .await;

        let built = TreeBuilder::for_snapshot(&snapshot, self.options).build_forest(&snapshot.tree);
        if let Err(e) = built {
            log::warn!("Snapshot generation {} does not build: {}", generation, e);
            self.broadcaster
                .broadcast(TopologyEvent::error(format!("generation {}: {}", generation, e)))
                .await;
        }
        generation
    }
}

impl Default for ApiState {
    fn default() -> Self {
        Self::new()
    }
}

fn error_response(e: Error) -> (StatusCode, String) {
    let status = match &e {
        Error::NoSnapshot => StatusCode::SERVICE_UNAVAILABLE,
        Error::UnknownDevice(_) => StatusCode::NOT_FOUND,
        Error::UnrecognizedQuery(_) => StatusCode::BAD_REQUEST,
        Error::MalformedTopology { .. } | Error::CyclicTopology { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::error!("Request failed: {}", e);
    } else {
        log::warn!("Request rejected: {}", e);
    }
    (status, e.to_string())
}

/// Query parameters for the tree endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    /// Build only the tree rooted here.
    pub root: Option<String>,
    /// Report failed roots instead of failing the whole forest.
    #[serde(default)]
    pub lenient: bool,
}

/// Body of `POST /api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// A MAC or IPv4 address.
    pub query: String,
}

/// Constructs the [`Router`] for the server.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/place", get(get_place).put(put_place))
        .route("/api/tree", get(get_tree))
        .route("/api/tree/html", get(get_tree_html))
        .route("/api/device/{key}", get(get_device))
        .route("/api/search", post(post_search))
        .route("/api/stats", get(get_stats))
        .route("/ws/updates", get(ws_handler))
        .route("/", get(serve_index))
        .with_state(state)
}

/// `GET /api/place`.
async fn get_place(State(state): State<ApiState>) -> ApiResult<Json<serde_json::Value>> {
    let snapshot = state.current().await.map_err(error_response)?;
    serde_json::to_value(&*snapshot)
        .map(Json)
        .map_err(|e| error_response(e.into()))
}

/// `PUT /api/place`.
async fn put_place(
    State(state): State<ApiState>,
    Json(snapshot): Json<TopologySnapshot>,
) -> Json<serde_json::Value> {
    let generation = state.replace_snapshot(snapshot).await;
    Json(serde_json::json!({ "status": "ok", "generation": generation }))
}

/// `GET /api/tree`.
async fn get_tree(
    State(state): State<ApiState>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let snapshot = state.current().await.map_err(error_response)?;
    let builder = TreeBuilder::for_snapshot(&snapshot, state.options);

    let value = match (query.root, query.lenient) {
        (Some(root), _) => {
            let tree: ViewNode = builder
                .build(&root, &snapshot.tree, ROOT_LEVEL)
                .map_err(error_response)?;
            serde_json::to_value(tree)
        }
        (None, true) => {
            let forest: Vec<ForestEntry> = builder.build_forest_lenient(&snapshot.tree);
            serde_json::to_value(forest)
        }
        (None, false) => {
            let forest = builder.build_forest(&snapshot.tree).map_err(error_response)?;
            serde_json::to_value(forest)
        }
    }
    .map_err(|e| error_response(e.into()))?;

    Ok(Json(value))
}

/// `GET /api/tree/html`.
async fn get_tree_html(
    State(state): State<ApiState>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Html<String>> {
    let snapshot = state.current().await.map_err(error_response)?;
    let builder = TreeBuilder::for_snapshot(&snapshot, state.options);

    let html = match query.root {
        Some(root) => render_html(
            &builder
                .build(&root, &snapshot.tree, ROOT_LEVEL)
                .map_err(error_response)?,
        ),
        None => render_forest_html(&builder.build_forest(&snapshot.tree).map_err(error_response)?),
    };
    Ok(Html(html))
}

/// `GET /api/device/{key}`.
async fn get_device(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> ApiResult<Json<DeviceDetail>> {
    let snapshot = state.current().await.map_err(error_response)?;
    device_detail(&snapshot, &key).map(Json).map_err(error_response)
}

/// `POST /api/search`.
async fn post_search(
    State(state): State<ApiState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<SearchHit>> {
    let snapshot = state.current().await.map_err(error_response)?;
    search(&snapshot, &req.query).map(Json).map_err(error_response)
}

/// `GET /api/stats`.
async fn get_stats(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let (generation, snapshot) = {
        let slot = state.slot.read().await;
        (slot.generation, slot.snapshot.clone())
    };
    let place = snapshot.map(|s| {
        serde_json::json!({
            "devices": s.devices.len(),
            "roots": s.tree.len(),
            "active_ports": s.active_port_count(),
            "known_macs": s.macs.len(),
        })
    });

    Json(serde_json::json!({
        "generation": generation,
        "place": place,
        "websocket": {
            "connected_clients": state.broadcaster.client_count().await,
            "total_events": state.broadcaster.event_count().await,
        }
    }))
}

/// `GET /`.
async fn serve_index(State(state): State<ApiState>) -> Html<String> {
    let body = match state.current().await {
        Ok(snapshot) => TreeBuilder::for_snapshot(&snapshot, state.options)
            .build_forest_lenient(&snapshot.tree)
            .iter()
            .map(|entry| match entry {
                ForestEntry::Built { tree } => render_html(tree),
                ForestEntry::Failed { key, error } => format!(
                    "<p class=\"error\">{}: {}</p>",
                    crate::render::escape_html(key),
                    crate::render::escape_html(error)
                ),
            })
            .collect(),
        Err(e) => format!("<p>{}</p>", crate::render::escape_html(&e.to_string())),
    };
    Html(render_page("Network place", &body))
}

/// `GET /ws/updates`.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: ApiState) {
    let client_id = uuid::Uuid::new_v4().to_string();
    log::info!("WebSocket client connected: {}", client_id);

    state.broadcaster.register_client(client_id.clone()).await;

    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.broadcaster.subscribe();

    let initial = serde_json::json!({
        "type": "initial_state",
        "generation": state.generation().await,
    });
    if let Err(e) = sender.send(Message::Text(initial.to_string().into())).await {
        log::error!("Failed to send initial state to {}: {}", client_id, e);
        state.broadcaster.unregister_client(&client_id).await;
        return;
    }

    let broadcaster = state.broadcaster.clone();
    let client_id_clone = client_id.clone();
    let send_task = tokio::spawn(async move {
        if let Err(e) = forward_events(&mut event_rx, &mut sender).await {
            log::info!("Stopped forwarding to {}: {}", client_id_clone, e);
        }
        broadcaster.unregister_client(&client_id_clone).await;
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                log::debug!("Received from {}: {}", client_id, text.as_str());
                if text.as_str() == "ping" {
                    let _ = state.broadcaster.broadcast(TopologyEvent::ping()).await;
                }
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket client {} closed gracefully", client_id);
                break;
            }
            Err(e) => {
                log::error!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    state.broadcaster.unregister_client(&client_id).await;
    log::info!("WebSocket client disconnected: {}", client_id);
}

/// Forwards events to `sink` until the channel closes.
///
/// A receiver that lagged skips the events it missed and carries on.
async fn forward_events<S>(
    events: &mut broadcast::Receiver<TopologyEvent>,
    sink: &mut S,
) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    loop {
        match events.recv().await {
            Ok(event) => sink
                .send(Message::Text(event.to_json().into()))
                .await
                .map_err(|e| Error::WebSocket(e.to_string()))?,
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("WebSocket client lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
