use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::fetcher;
use crate::login;
use crate::mapper;
use crate::store::{FileStore, StatusStore};
use crate::tracker;

/// Shared application state: configuration, the outbound HTTP client, and
/// the tracker's status store behind a mutex (recompute is a wholesale
/// read-modify-write).
pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
    pub store: Mutex<Box<dyn StatusStore>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CeoMessageBody {
    pub group: String,
    pub message: String,
}

#[derive(Serialize)]
struct MediaFile {
    name: String,
    size: u64,
    modified: u64,
}

/// Build the router and serve until shutdown
///
/// # Arguments
/// * `config` - Environment configuration loaded at startup
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or a bind/serve error
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Make sure the status store's directory exists before first save
    if let Some(parent) = config.status_store_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let bind_addr = config.bind_addr.clone();
    let store: Box<dyn StatusStore> = Box::new(FileStore::new(&config.status_store_path));
    let state = Arc::new(AppState {
        config,
        client: reqwest::Client::new(),
        store: Mutex::new(store),
    });

    let app = Router::new()
        .route("/", get(serve_dashboard))
        .route("/login", get(serve_login_page))
        .route("/api/data", get(get_data))
        .route("/api/technical", get(get_technical))
        .route("/api/supply", get(get_supply))
        .route("/api/events", get(get_events))
        .route("/api/news", get(get_news))
        .route("/api/news-en", get(get_news_en))
        .route("/api/rates", get(get_rates))
        .route("/api/login", post(login::handle_login))
        .route("/api/logout", post(login::handle_logout))
        .route("/api/ceo-message", post(post_ceo_message))
        .nest_service("/static", ServeDir::new("static"))
        .layer(axum::middleware::from_fn(login::require_auth))
        .with_state(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("../static/dashboard.html"))
}

async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("../static/login.html"))
}

/// Primary payload: six sheets fetched, shaped, and served
///
/// If any required sheet fails the whole response falls back to the bundled
/// sample. The failure is logged, never surfaced to the client.
async fn get_data(State(state): State<Arc<AppState>>) -> Json<Value> {
    match fetch_data_payload(&state).await {
        Ok(payload) => Json(serde_json::to_value(payload).unwrap_or_default()),
        Err(e) => {
            warn!("serving bundled sample, {}", e);
            Json(fetcher::sample_payload())
        }
    }
}

async fn fetch_data_payload(state: &AppState) -> Result<mapper::Payload, String> {
    let cfg = &state.config;
    let client = &state.client;

    let weekly =
        fetcher::fetch_required(client, cfg.sheet_weekly_csv_url.as_deref(), "weekly").await?;
    let members =
        fetcher::fetch_required(client, cfg.sheet_members_csv_url.as_deref(), "members").await?;
    let latest =
        fetcher::fetch_required(client, cfg.sheet_latest_csv_url.as_deref(), "latest").await?;
    let groups =
        fetcher::fetch_required(client, cfg.sheet_groups_csv_url.as_deref(), "groups").await?;
    let deals =
        fetcher::fetch_required(client, cfg.sheet_deals_csv_url.as_deref(), "deals").await?;
    let ceo = fetcher::fetch_required(client, cfg.sheet_ceo_csv_url.as_deref(), "ceo").await?;

    Ok(mapper::build_payload(
        &weekly, &members, &latest, &groups, &deals, &ceo,
    ))
}

/// Technical dashboard: sheet rows, latest row, and the logistics rows with
/// countdown statuses computed against the persisted store
async fn get_technical(State(state): State<Arc<AppState>>) -> Json<Value> {
    let records = fetch_optional_sheet(
        &state,
        state.config.sheet_tech_csv_url.as_deref(),
        "technical",
    )
    .await;

    let ceo_message = fetch_technical_ceo_message(&state).await;
    let payload = mapper::map_technical(&records, ceo_message);

    let now_ms = Utc::now().timestamp_millis();
    let statuses = {
        let mut store = state.store.lock().unwrap();
        let prior = store.load();
        let (statuses, next) = tracker::recompute(&payload.logistics, &prior, now_ms);
        store.save(&next);
        statuses
    };

    let logistics: Vec<Value> = payload
        .logistics
        .iter()
        .zip(&statuses)
        .map(|(row, status)| json!({ "row": row, "status": status }))
        .collect();

    Json(json!({
        "rows": payload.rows,
        "latest": payload.latest,
        "ceo_message": payload.ceo_message,
        "logistics": logistics,
    }))
}

async fn get_supply(State(state): State<Arc<AppState>>) -> Json<Value> {
    let records = fetch_optional_sheet(
        &state,
        state.config.sheet_supply_csv_url.as_deref(),
        "supply",
    )
    .await;
    let payload = mapper::map_supply(&records);
    Json(serde_json::to_value(payload).unwrap_or_default())
}

// Single-sheet endpoints fail to an empty row set; only /api/data has the
// cross-sheet consistency concern that warrants the sample fallback.
async fn fetch_optional_sheet(
    state: &AppState,
    url: Option<&str>,
    name: &str,
) -> Vec<crate::loader::Record> {
    match url {
        Some(url) => match fetcher::fetch_sheet(&state.client, url).await {
            Ok(records) => records,
            Err(e) => {
                warn!("{} sheet unavailable: {}", name, e);
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}

// The technical dashboard's CEO note lives on the shared CEO sheet under
// the TECHNICAL group key.
async fn fetch_technical_ceo_message(state: &AppState) -> String {
    let records =
        fetch_optional_sheet(state, state.config.sheet_ceo_csv_url.as_deref(), "ceo").await;
    mapper::map_ceo_messages(&records)
        .remove("TECHNICAL")
        .unwrap_or_default()
}

/// Media file listing for the events screen
async fn get_events(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut files = Vec::new();

    if let Ok(entries) = fs::read_dir(&state.config.media_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                let metadata = match fs::metadata(&path) {
                    Ok(meta) => meta,
                    Err(_) => continue,
                };
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                files.push(MediaFile {
                    name: name.to_string(),
                    size: metadata.len(),
                    modified,
                });
            }
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Json(json!({ "files": files }))
}

async fn get_news(State(state): State<Arc<AppState>>) -> Json<Value> {
    let items = crate::news::aggregate(&state.client, &state.config.news_feed_urls).await;
    Json(serde_json::to_value(items).unwrap_or_default())
}

async fn get_news_en(State(state): State<Arc<AppState>>) -> Json<Value> {
    let items = crate::news::aggregate(&state.client, &state.config.news_en_feed_urls).await;
    Json(serde_json::to_value(items).unwrap_or_default())
}

/// Best-effort FX rates relay; failures collapse to an empty object
async fn get_rates(State(state): State<Arc<AppState>>) -> Json<Value> {
    let url = match &state.config.rates_url {
        Some(url) => url,
        None => return Json(json!({})),
    };

    match state.client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            Json(response.json::<Value>().await.unwrap_or_else(|_| json!({})))
        }
        Ok(response) => {
            warn!("rates source returned HTTP {}", response.status());
            Json(json!({}))
        }
        Err(e) => {
            warn!("rates source unavailable: {}", e);
            Json(json!({}))
        }
    }
}

/// Forward a CEO message to the configured webhook and relay its reply
///
/// The webhook persists the message back into the sheet; we pass its JSON
/// through untouched, or wrap its raw text when it isn't JSON.
async fn post_ceo_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CeoMessageBody>,
) -> impl IntoResponse {
    let url = match &state.config.ceo_msg_webhook_url {
        Some(url) => url.clone(),
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "ok": false, "message": "webhook not configured" })),
            )
                .into_response();
        }
    };

    match state.client.post(&url).json(&body).send().await {
        Ok(response) => {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => Json(value).into_response(),
                Err(_) => (
                    if status.is_success() {
                        StatusCode::OK
                    } else {
                        StatusCode::BAD_GATEWAY
                    },
                    Json(json!({ "ok": status.is_success(), "message": text })),
                )
                    .into_response(),
            }
        }
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "ok": false, "message": format!("webhook unreachable: {}", e) })),
        )
            .into_response(),
    }
}
