use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "docs-api-key";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub notify_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub label: String,
    pub media_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateBundle {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub notify_url: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBundle {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub notify_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTrack {
    pub media_url: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTrack {
    pub label: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateInsight {
    pub insight: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

struct Record {
    bundle: Bundle,
    tracks: Vec<Track>,
    metadata: Map<String, Value>,
    insights: Vec<Insight>,
}

type Db = Arc<RwLock<Vec<Record>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    token: Arc<str>,
}

/// Error body in the shape the Clarify API uses.
struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn not_found(what: &str, id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{what} {id} not found"),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({
            "status": self.status.canonical_reason().unwrap_or("Error"),
            "code": self.status.as_u16(),
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    app_with_token(DEFAULT_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Vec::new())),
        token: Arc::from(token),
    };

    let api = Router::new()
        .route("/bundles", get(list_bundles).post(create_bundle))
        .route("/bundles/{id}", get(get_bundle).put(update_bundle).delete(delete_bundle))
        .route(
            "/bundles/{id}/metadata",
            get(get_metadata).put(update_metadata).delete(delete_metadata),
        )
        .route("/bundles/{id}/tracks", get(list_tracks).post(create_track))
        .route("/bundles/{id}/tracks/{track}", put(update_track).delete(delete_track))
        .route("/bundles/{id}/insights", get(list_insights).post(create_insight))
        .route("/bundles/{id}/insights/{insight_id}", get(get_insight))
        .route("/search", get(search))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .with_state(state);

    Router::new().nest("/v1", api)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);

    if !authorized {
        tracing::debug!(uri = %request.uri(), "rejecting request without valid bearer token");
        return Failure {
            status: StatusCode::UNAUTHORIZED,
            message: "invalid or missing API key".to_string(),
        }
        .into_response();
    }
    next.run(request).await
}

fn bundle_href(id: &str) -> String {
    format!("/v1/bundles/{id}")
}

fn find<'a>(records: &'a [Record], id: &str) -> Result<&'a Record, Failure> {
    records
        .iter()
        .find(|r| r.bundle.id == id)
        .ok_or_else(|| Failure::not_found("bundle", id))
}

fn find_mut<'a>(records: &'a mut [Record], id: &str) -> Result<&'a mut Record, Failure> {
    records
        .iter_mut()
        .find(|r| r.bundle.id == id)
        .ok_or_else(|| Failure::not_found("bundle", id))
}

/// Resolve a track reference that is either a positional index or a label.
fn track_index(tracks: &[Track], track: &str) -> Option<usize> {
    match track.parse::<usize>() {
        Ok(index) if index < tracks.len() => Some(index),
        Ok(_) => None,
        Err(_) => tracks.iter().position(|t| t.label == track),
    }
}

fn bundle_view(bundle: &Bundle) -> Value {
    let mut view = serde_json::to_value(bundle).unwrap_or_default();
    if let Value::Object(fields) = &mut view {
        let href = bundle_href(&bundle.id);
        fields.insert(
            "_links".to_string(),
            json!({
                "self": {"href": href},
                "clarify:metadata": {"href": format!("{href}/metadata")},
                "clarify:tracks": {"href": format!("{href}/tracks")},
                "clarify:insights": {"href": format!("{href}/insights")},
            }),
        );
    }
    view
}

fn tracks_view(record: &Record) -> Value {
    json!({
        "bundle_id": record.bundle.id,
        "tracks": record.tracks,
        "_links": {"self": {"href": format!("{}/tracks", bundle_href(&record.bundle.id))}},
    })
}

fn metadata_view(record: &Record) -> Value {
    json!({
        "bundle_id": record.bundle.id,
        "data": record.metadata,
        "_links": {"self": {"href": format!("{}/metadata", bundle_href(&record.bundle.id))}},
    })
}

// --- bundles ---

async fn list_bundles(State(state): State<AppState>) -> Json<Value> {
    let records = state.db.read().await;
    let items: Vec<Value> = records
        .iter()
        .map(|r| json!({"href": bundle_href(&r.bundle.id)}))
        .collect();
    let body = json!({
        "total": records.len(),
        "_links": {"self": {"href": "/v1/bundles"}, "items": items},
    });
    Json(body)
}

async fn create_bundle(
    State(state): State<AppState>,
    Json(input): Json<CreateBundle>,
) -> (StatusCode, Json<Value>) {
    let bundle = Bundle {
        id: Uuid::new_v4().simple().to_string(),
        name: input.name.unwrap_or_default(),
        external_id: input.external_id,
        notify_url: input.notify_url,
    };
    let tracks = input
        .media_url
        .map(|media_url| Track {
            label: String::new(),
            media_url,
        })
        .into_iter()
        .collect();

    let view = bundle_view(&bundle);
    tracing::info!(id = %bundle.id, "created bundle");
    state.db.write().await.push(Record {
        bundle,
        tracks,
        metadata: Map::new(),
        insights: Vec::new(),
    });
    (StatusCode::CREATED, Json(view))
}

async fn get_bundle(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    let records = state.db.read().await;
    let record = find(&records, &id)?;
    Ok(Json(bundle_view(&record.bundle)))
}

async fn update_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateBundle>,
) -> Result<Json<Value>, Failure> {
    let mut records = state.db.write().await;
    let record = find_mut(&mut records, &id)?;
    if let Some(name) = input.name {
        record.bundle.name = name;
    }
    if let Some(external_id) = input.external_id {
        record.bundle.external_id = Some(external_id);
    }
    if let Some(notify_url) = input.notify_url {
        record.bundle.notify_url = Some(notify_url);
    }
    Ok(Json(bundle_view(&record.bundle)))
}

async fn delete_bundle(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, Failure> {
    let mut records = state.db.write().await;
    let index = records
        .iter()
        .position(|r| r.bundle.id == id)
        .ok_or_else(|| Failure::not_found("bundle", &id))?;
    records.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

// --- metadata ---

async fn get_metadata(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    let records = state.db.read().await;
    let record = find(&records, &id)?;
    Ok(Json(metadata_view(record)))
}

async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, Failure> {
    let Value::Object(data) = input else {
        return Err(Failure::bad_request("metadata must be a JSON object"));
    };
    let mut records = state.db.write().await;
    let record = find_mut(&mut records, &id)?;
    record.metadata = data;
    Ok(Json(metadata_view(record)))
}

async fn delete_metadata(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, Failure> {
    let mut records = state.db.write().await;
    find_mut(&mut records, &id)?.metadata.clear();
    Ok(StatusCode::NO_CONTENT)
}

// --- tracks ---

async fn list_tracks(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    let records = state.db.read().await;
    let record = find(&records, &id)?;
    Ok(Json(tracks_view(record)))
}

async fn create_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateTrack>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut records = state.db.write().await;
    let record = find_mut(&mut records, &id)?;
    record.tracks.push(Track {
        label: input.label.unwrap_or_default(),
        media_url: input.media_url,
    });
    Ok((StatusCode::CREATED, Json(tracks_view(record))))
}

async fn update_track(
    State(state): State<AppState>,
    Path((id, track)): Path<(String, String)>,
    Json(input): Json<UpdateTrack>,
) -> Result<Json<Value>, Failure> {
    let mut records = state.db.write().await;
    let record = find_mut(&mut records, &id)?;
    let index = track_index(&record.tracks, &track).ok_or_else(|| Failure::not_found("track", &track))?;
    let target = &mut record.tracks[index];
    if let Some(label) = input.label {
        target.label = label;
    }
    if let Some(media_url) = input.media_url {
        target.media_url = media_url;
    }
    Ok(Json(tracks_view(record)))
}

async fn delete_track(
    State(state): State<AppState>,
    Path((id, track)): Path<(String, String)>,
) -> Result<StatusCode, Failure> {
    let mut records = state.db.write().await;
    let record = find_mut(&mut records, &id)?;
    let index = track_index(&record.tracks, &track).ok_or_else(|| Failure::not_found("track", &track))?;
    record.tracks.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

// --- insights ---

async fn list_insights(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    let records = state.db.read().await;
    let record = find(&records, &id)?;
    let href = format!("{}/insights", bundle_href(&id));
    let items: Vec<Value> = record
        .insights
        .iter()
        .map(|i| json!({"href": format!("{href}/{}", i.id), "name": i.name}))
        .collect();
    let body = json!({
        "bundle_id": id,
        "total": items.len(),
        "_links": {"self": {"href": href}, "items": items},
    });
    Ok(Json(body))
}

async fn create_insight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateInsight>,
) -> Result<(StatusCode, Json<Insight>), Failure> {
    let mut records = state.db.write().await;
    let record = find_mut(&mut records, &id)?;
    let insight = Insight {
        id: Uuid::new_v4().simple().to_string(),
        name: input.insight,
        status: "queued".to_string(),
    };
    record.insights.push(insight.clone());
    Ok((StatusCode::ACCEPTED, Json(insight)))
}

async fn get_insight(
    State(state): State<AppState>,
    Path((id, insight_id)): Path<(String, String)>,
) -> Result<Json<Insight>, Failure> {
    let records = state.db.read().await;
    let record = find(&records, &id)?;
    let insight = record.insights.iter().find(|i| i.id == insight_id).cloned();
    insight.map(Json).ok_or_else(|| Failure::not_found("insight", &insight_id))
}

// --- search ---

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<Value> {
    let needle = params.query.unwrap_or_default().to_lowercase();
    let records = state.db.read().await;
    let hits: Vec<&Bundle> = records
        .iter()
        .map(|r| &r.bundle)
        .filter(|b| b.name.to_lowercase().contains(&needle))
        .take(params.limit.unwrap_or(usize::MAX))
        .collect();

    let item_results: Vec<Value> = hits.iter().map(|b| json!({"score": 1.0, "bundle_id": b.id})).collect();
    let items: Vec<Value> = hits.iter().map(|b| json!({"href": bundle_href(&b.id)})).collect();
    let body = json!({
        "total": hits.len(),
        "item_results": item_results,
        "_links": {"self": {"href": "/v1/search"}, "items": items},
    });
    Json(body)
}
