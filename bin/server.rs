// Subtracker - Web Server
// REST API over the same subscription book the CLI and TUI use

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use subtracker::{
    init_logging, AppConfig, BackupDocument, BookError, LogTarget, MergeReport, Settings,
    SqliteStore, Subscription, SubscriptionBook, SubscriptionForm, Summary, Theme,
};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    book: Arc<Mutex<SubscriptionBook<SqliteStore>>>,
}

impl AppState {
    fn book(&self) -> MutexGuard<'_, SubscriptionBook<SqliteStore>> {
        // A panic while holding the lock leaves the book itself consistent
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn api_error(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
    )
        .into_response()
}

fn book_error(err: BookError) -> Response {
    let status = match err {
        BookError::NotFound(_) => StatusCode::NOT_FOUND,
        BookError::Form(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    api_error(status, err.to_string())
}

/// Subscription plus its projected following billing date
#[derive(Serialize)]
struct SubscriptionResponse {
    #[serde(flatten)]
    subscription: Subscription,
    next_due: NaiveDate,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        Self {
            next_due: sub.next_due(),
            subscription: sub.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ThemeRequest {
    #[serde(rename = "selectedTheme")]
    selected_theme: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/subscriptions - All subscriptions in display order
async fn list_subscriptions(State(state): State<AppState>) -> Response {
    let book = state.book();
    let response: Vec<SubscriptionResponse> =
        book.subscriptions().iter().map(SubscriptionResponse::from).collect();
    ApiResponse::ok(response)
}

/// POST /api/subscriptions - Add from form input
async fn create_subscription(
    State(state): State<AppState>,
    Json(form): Json<SubscriptionForm>,
) -> Response {
    let mut book = state.book();
    match book.add(&form) {
        Ok(sub) => {
            let body = SubscriptionResponse::from(sub);
            let mut response = ApiResponse::ok(body);
            *response.status_mut() = StatusCode::CREATED;
            response
        }
        Err(e) => book_error(e),
    }
}

/// GET /api/subscriptions/:id
async fn get_subscription(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let book = state.book();
    match book.get(&id) {
        Some(sub) => ApiResponse::ok(SubscriptionResponse::from(sub)),
        None => book_error(BookError::NotFound(id)),
    }
}

/// PUT /api/subscriptions/:id - Replace values, keep identity
async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<SubscriptionForm>,
) -> Response {
    let mut book = state.book();
    match book.update(&id, &form) {
        Ok(sub) => ApiResponse::ok(SubscriptionResponse::from(sub)),
        Err(e) => book_error(e),
    }
}

/// DELETE /api/subscriptions/:id
async fn delete_subscription(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut book = state.book();
    match book.remove(&id) {
        Ok(removed) => ApiResponse::ok(SubscriptionResponse::from(&removed)),
        Err(e) => book_error(e),
    }
}

/// GET /api/summary - Count and normalised totals
async fn get_summary(State(state): State<AppState>) -> Response {
    let summary: Summary = state.book().summary();
    ApiResponse::ok(summary)
}

/// GET /api/settings
async fn get_settings(State(state): State<AppState>) -> Response {
    let settings: Settings = *state.book().settings();
    ApiResponse::ok(settings)
}

/// PUT /api/settings - Change the appearance
async fn put_settings(
    State(state): State<AppState>,
    Json(request): Json<ThemeRequest>,
) -> Response {
    let Some(theme) = Theme::parse(&request.selected_theme) else {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("unknown theme '{}'", request.selected_theme),
        );
    };

    let mut book = state.book();
    book.set_theme(theme);
    ApiResponse::ok(*book.settings())
}

/// GET /api/backup - Export the backup document as `data`
async fn export_backup(State(state): State<AppState>) -> Response {
    let document: BackupDocument = state.book().export();
    ApiResponse::ok(document)
}

/// POST /api/backup - Merge a bare backup document (undecodable bodies import nothing)
async fn import_backup(State(state): State<AppState>, body: String) -> Response {
    let document = BackupDocument::from_json_or_empty(&body);
    let report: MergeReport = state.book().import(document);
    ApiResponse::ok(report)
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
        .route("/summary", get(get_summary))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/backup", get(export_backup).post(import_backup))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_logging(config.log_format, &LogTarget::Stderr, "info")?;

    let store = SqliteStore::open(&config.db_path)?;
    let state = AppState {
        book: Arc::new(Mutex::new(SubscriptionBook::open(store))),
    };

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    tracing::info!(
        addr = %config.server_addr,
        db = %config.db_path.display(),
        "subtracker API listening"
    );

    axum::serve(listener, router(state))
        .await
        .context("Server stopped")?;

    Ok(())
}
