use crate::monitor::ScanMonitor;
use crate::registry::{SharedRegistry, WatchRegistry};
use crate::traits::WatchStore;
use crate::Error;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Web 服务器状态
pub struct AppState {
    pub registry: SharedRegistry,
    pub monitor: ScanMonitor,
    pub store: Option<Arc<dyn WatchStore>>,
    // 修改、快照、保存三步在这把锁内完成，保存顺序与修改顺序一致
    persist_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    pub fn new(
        registry: SharedRegistry,
        monitor: ScanMonitor,
        store: Option<Arc<dyn WatchStore>>,
    ) -> Self {
        Self {
            registry,
            monitor,
            store,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Applies one edit to the watched set and, if it changed anything,
    /// saves the resulting list. Save failures are logged only.
    async fn edit_and_persist<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut WatchRegistry) -> bool,
    {
        let _persist = self.persist_lock.lock().await;
        let snapshot = {
            let mut registry = self.registry.lock();
            if !edit(&mut registry) {
                return false;
            }
            registry.watched()
        };

        if let Some(store) = &self.store {
            let store = store.clone();
            match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Failed to persist watch list: {}", e),
                Err(e) => tracing::error!("Persist task failed: {}", e),
            }
        }
        true
    }
}

/// /api/watched 的请求体
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRequest {
    pub ssid: String,
}

#[derive(Debug, Serialize)]
struct WatchedResponse {
    watched: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    watched: usize,
    present: Vec<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/watched", get(api_list_watched).post(api_add_watched))
        .route("/api/watched/{ssid}", delete(api_remove_watched))
        .route("/api/scan", post(api_scan_now))
        .route("/api/status", get(api_status))
        .with_state(state)
}

/// 绑定控制 API 的监听地址；端口被占用等错误在这里直接返回
pub async fn bind(bind_addr: SocketAddr) -> crate::Result<TcpListener> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("🌐 Control API listening on {}", bind_addr);
    Ok(listener)
}

/// 在已绑定的监听器上提供控制 API，直到 `shutdown` 完成
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> crate::Result<()> {
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn api_list_watched(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let watched = state.registry.watched();
    (StatusCode::OK, Json(WatchedResponse { watched }))
}

/// 空 SSID 不是错误，只是不做任何改变
async fn api_add_watched(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WatchRequest>,
) -> impl IntoResponse {
    let ssid = payload.ssid.clone();
    let added = state.edit_and_persist(move |registry| registry.add(ssid)).await;
    tracing::debug!(ssid = %payload.ssid, added, "Handled add request");
    (StatusCode::OK, Json(serde_json::json!({ "added": added })))
}

async fn api_remove_watched(
    State(state): State<Arc<AppState>>,
    Path(ssid): Path<String>,
) -> impl IntoResponse {
    let removed = state
        .edit_and_persist(|registry| registry.remove(&ssid))
        .await;
    tracing::debug!(ssid = %ssid, removed, "Handled remove request");
    (StatusCode::OK, Json(serde_json::json!({ "removed": removed })))
}

/// "Scan now": one full cycle, answering with the networks that just
/// appeared.
async fn api_scan_now(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.monitor.scan_once().await {
        Ok(appeared) => {
            let mut new: Vec<String> = appeared.into_iter().collect();
            new.sort();
            (StatusCode::OK, Json(serde_json::json!({ "new": new }))).into_response()
        }
        Err(Error::PermissionDenied(msg)) => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": msg })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("❌ Scan request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn api_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.lock();
    let status = StatusResponse {
        watched: registry.len(),
        present: registry.present(),
    };
    drop(registry);
    (StatusCode::OK, Json(status))
}
