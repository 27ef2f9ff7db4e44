use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_KEY: &str = "mock-key";

/// Largest media part the upload endpoint accepts (files are capped at 20MB).
pub const MAX_MEDIA_BYTES: usize = 20 * 1024 * 1024;
/// Room for the multipart delimiters and part headers around the media.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub const ERR_INVALID_MEDIA_TYPE: i64 = 40004;
pub const ERR_INVALID_MEDIA_ID: i64 = 40007;
pub const ERR_INVALID_MESSAGE_TYPE: i64 = 40008;
pub const ERR_INVALID_PARAMETER: i64 = 40035;
pub const ERR_EMPTY_MEDIA: i64 = 44001;
pub const ERR_INVALID_WEBHOOK_URL: i64 = 93000;

const MSG_TYPES: &[&str] = &["text", "markdown", "image", "news", "file", "voice", "template_card"];

/// Reply body shared by every endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    pub errcode: i64,
    pub errmsg: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadReply {
    pub errcode: i64,
    pub errmsg: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub media_id: String,
    pub created_at: String,
}

/// An uploaded media part as stored by the mock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredMedia {
    pub media_id: String,
    pub kind: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Deserialize)]
pub struct SendQuery {
    pub key: Option<String>,
}

#[derive(Deserialize)]
pub struct UploadQuery {
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<Value>,
    uploads: HashMap<String, StoredMedia>,
    forced: Option<ErrorReply>,
}

#[derive(Clone)]
pub struct AppState {
    key: Arc<str>,
    inner: Arc<RwLock<Inner>>,
}

impl AppState {
    pub fn new(key: &str) -> Self {
        Self {
            key: Arc::from(key),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub async fn messages(&self) -> Vec<Value> {
        self.inner.read().await.messages.clone()
    }

    pub async fn uploads(&self) -> Vec<StoredMedia> {
        self.inner.read().await.uploads.values().cloned().collect()
    }

    fn key_matches(&self, key: Option<&str>) -> bool {
        key == Some(&*self.key)
    }
}

fn reply(errcode: i64, errmsg: &str) -> Json<Value> {
    Json(json!({ "errcode": errcode, "errmsg": errmsg }))
}

fn invalid_key() -> Json<Value> {
    reply(
        ERR_INVALID_WEBHOOK_URL,
        "invalid webhook url, hint: key is missing or unknown",
    )
}

pub fn app() -> Router {
    app_with_state(AppState::new(DEFAULT_KEY))
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/cgi-bin/webhook/send", post(send))
        .route(
            "/cgi-bin/webhook/upload_media",
            post(upload_media).layer(DefaultBodyLimit::max(MAX_MEDIA_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/_mock/messages", get(list_messages))
        .route("/_mock/uploads", get(list_uploads))
        .route("/_mock/fail", post(force_failure))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_key(listener, DEFAULT_KEY).await
}

pub async fn run_with_key(listener: TcpListener, key: &str) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock webhook server listening");
    axum::serve(listener, app_with_state(AppState::new(key))).await
}

async fn send(State(state): State<AppState>, Query(query): Query<SendQuery>, body: Bytes) -> Json<Value> {
    if !state.key_matches(query.key.as_deref()) {
        return invalid_key();
    }
    let mut inner = state.inner.write().await;
    if let Some(forced) = inner.forced.take() {
        return reply(forced.errcode, &forced.errmsg);
    }

    let message: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => return reply(ERR_INVALID_PARAMETER, &format!("invalid json body: {err}")),
    };
    let msgtype = message["msgtype"].as_str().unwrap_or_default().to_string();
    if !MSG_TYPES.contains(&msgtype.as_str()) {
        return reply(ERR_INVALID_MESSAGE_TYPE, "invalid message type");
    }
    if msgtype == "file" || msgtype == "voice" {
        let media_id = message[&msgtype]["media_id"].as_str().unwrap_or_default();
        match inner.uploads.get(media_id) {
            Some(media) if media.kind == msgtype => {}
            _ => return reply(ERR_INVALID_MEDIA_ID, "invalid media_id"),
        }
    }

    debug!(%msgtype, "accepted message");
    inner.messages.push(message);
    reply(0, "ok")
}

async fn upload_media(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadReply>, Json<Value>> {
    if !state.key_matches(query.key.as_deref()) {
        return Err(invalid_key());
    }
    let kind = match query.kind.as_deref() {
        Some(kind @ ("file" | "voice")) => kind.to_string(),
        _ => return Err(reply(ERR_INVALID_MEDIA_TYPE, "invalid media type")),
    };
    if let Some(forced) = state.inner.write().await.forced.take() {
        return Err(reply(forced.errcode, &forced.errmsg));
    }

    let mut stored = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(reply(ERR_INVALID_PARAMETER, &format!("malformed multipart body: {err}"))),
        };
        if field.name() != Some("media") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(err) => return Err(reply(ERR_INVALID_PARAMETER, &format!("malformed media part: {err}"))),
        };
        stored = Some((filename, content_type, data.len()));
    }

    let Some((filename, content_type, size)) = stored else {
        return Err(reply(ERR_INVALID_PARAMETER, "missing media field"));
    };
    if size == 0 {
        return Err(reply(ERR_EMPTY_MEDIA, "empty media data"));
    }

    let media = StoredMedia {
        media_id: Uuid::new_v4().simple().to_string(),
        kind: kind.clone(),
        filename,
        content_type,
        size,
    };
    debug!(media_id = %media.media_id, %kind, size, "stored media");
    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string();
    let media_id = media.media_id.clone();
    state.inner.write().await.uploads.insert(media_id.clone(), media);

    Ok(Json(UploadReply {
        errcode: 0,
        errmsg: "ok".to_string(),
        kind,
        media_id,
        created_at,
    }))
}

async fn list_messages(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(state.messages().await)
}

async fn list_uploads(State(state): State<AppState>) -> Json<Vec<StoredMedia>> {
    Json(state.uploads().await)
}

/// Make the next send or upload answer with the given envelope.
async fn force_failure(State(state): State<AppState>, Json(forced): Json<ErrorReply>) -> Json<Value> {
    state.inner.write().await.forced = Some(forced);
    reply(0, "ok")
}
