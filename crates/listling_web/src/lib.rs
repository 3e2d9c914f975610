//! HTTP boundary for Listling: init-data auth middleware and the JSON API.
//!
//! # Responsibility
//! - Require a valid `X-Telegram-Init-Data` header on every API call and
//!   thread the verified identity to handlers via request extensions.
//! - Map service errors onto HTTP status codes without leaking auth detail.
//!
//! # Invariants
//! - A missing or invalid signature is always one opaque 401; the reason is
//!   logged server side only.
//! - Handlers never see an unauthenticated request.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use listling_core::{
    verify_init_data, ItemListQuery, ItemRepoError, ListItem, ListRepoError, ListService,
    ServiceError, SqliteItemRepository, SqliteListRepository, UserId,
};
use log::{error, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

/// Shared state for the API: one serialized SQLite connection plus the bot
/// token the signature check is keyed on.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    bot_token: Arc<str>,
}

impl AppState {
    pub fn new(conn: Connection, bot_token: impl Into<Arc<str>>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            bot_token: bot_token.into(),
        }
    }
}

/// Verified numeric identity of the caller, inserted by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub UserId);

/// Builds the API router with auth middleware applied to every route.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/items", get(get_items))
        .route("/api/delete", post(delete_item))
        .route("/api/reorder", post(reorder_items))
        .route("/api/undo", post(undo_last))
        .route("/api/undo-all", post(undo_all))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_init_data,
        ))
        .with_state(state)
}

async fn require_init_data(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let header = request
        .headers()
        .get(INIT_DATA_HEADER)
        .and_then(|value| value.to_str().ok());

    let raw = match header {
        Some(raw) => raw,
        None => {
            warn!("event=web_auth module=web status=denied path={path} reason=missing_header");
            return unauthorized();
        }
    };

    match verify_init_data(raw, &state.bot_token) {
        Ok(user) => {
            request.extensions_mut().insert(CallerIdentity(user.id));
            next.run(request).await
        }
        Err(err) => {
            warn!("event=web_auth module=web status=denied path={path} reason={err}");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    ApiError {
        status: StatusCode::UNAUTHORIZED,
        message: "unauthorized".to_string(),
    }
    .into_response()
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::PermissionDenied { .. } => StatusCode::UNAUTHORIZED,
            ServiceError::Item(item_err) => match item_err {
                ItemRepoError::EmptyName => StatusCode::BAD_REQUEST,
                ItemRepoError::ItemNotFound { .. } | ItemRepoError::NothingToRestore { .. } => {
                    StatusCode::NOT_FOUND
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServiceError::List(list_err) => match list_err {
                ListRepoError::EmptyName
                | ListRepoError::DuplicateName { .. }
                | ListRepoError::NoSelection(_) => StatusCode::BAD_REQUEST,
                ListRepoError::ListNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("event=web_request module=web status=error error={err}");
            return Self::internal();
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Runs one service operation against the shared connection.
fn with_service<T>(
    state: &AppState,
    op: impl FnOnce(
        &ListService<SqliteItemRepository<'_>, SqliteListRepository<'_>>,
    ) -> Result<T, ServiceError>,
) -> Result<T, ApiError> {
    let conn = state.conn.lock().map_err(|_| {
        error!("event=web_request module=web status=error error=connection_lock_poisoned");
        ApiError::internal()
    })?;

    let items = SqliteItemRepository::try_new(&conn).map_err(|err| {
        error!("event=web_request module=web status=error error={err}");
        ApiError::internal()
    })?;
    let lists = SqliteListRepository::try_new(&conn).map_err(|err| {
        error!("event=web_request module=web status=error error={err}");
        ApiError::internal()
    })?;

    op(&ListService::new(items, lists)).map_err(ApiError::from)
}

#[derive(Serialize)]
struct ItemsResponse {
    #[serde(rename = "listName")]
    list_name: String,
    items: Vec<ListItem>,
}

async fn get_items(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let response = with_service(&state, |service| {
        let list = match service.selected_list(caller.0)? {
            Some(list) => list,
            None => return Ok(None),
        };
        let items = service.items(caller.0, list.id, ItemListQuery::default())?;
        Ok(Some(ItemsResponse {
            list_name: list.name,
            items,
        }))
    })?;

    response
        .map(Json)
        .ok_or_else(|| ApiError::bad_request("no active list"))
}

#[derive(Deserialize)]
struct DeleteRequest {
    #[serde(rename = "listId")]
    list_id: i64,
    #[serde(rename = "itemId")]
    item_id: i64,
}

async fn delete_item(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<DeleteRequest>,
) -> Result<StatusCode, ApiError> {
    with_service(&state, |service| {
        service.delete_item(caller.0, request.list_id, request.item_id)
    })?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct ReorderRequest {
    #[serde(rename = "listId")]
    list_id: i64,
    #[serde(rename = "itemIds")]
    item_ids: Vec<i64>,
}

async fn reorder_items(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<ReorderRequest>,
) -> Result<StatusCode, ApiError> {
    with_service(&state, |service| {
        service.reorder(caller.0, request.list_id, &request.item_ids)
    })?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct UndoRequest {
    #[serde(rename = "listId")]
    list_id: i64,
}

async fn undo_last(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<UndoRequest>,
) -> Result<Json<ListItem>, ApiError> {
    let restored = with_service(&state, |service| {
        service.undo_last(caller.0, request.list_id)
    })?;
    Ok(Json(restored))
}

#[derive(Serialize)]
struct UndoAllResponse {
    restored: usize,
}

async fn undo_all(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<UndoRequest>,
) -> Result<Json<UndoAllResponse>, ApiError> {
    let restored = with_service(&state, |service| {
        service.undo_all(caller.0, request.list_id)
    })?;
    Ok(Json(UndoAllResponse { restored }))
}
