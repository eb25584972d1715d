//! Page and API handlers.

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue,
    },
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Date;
use tracing::info;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::downloader::{
    FailureReason, FetchMode, MetadataLookup, StreamDescriptor, StreamPolicy, TransferSink,
};
use crate::session::SessionContext;

pub const SESSION_COOKIE: &str = "tubedrop_session";

static INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Session from the request cookie, plus a `Set-Cookie` value when a new one was created
fn session_for(state: &AppState, headers: &HeaderMap) -> (Arc<SessionContext>, Option<HeaderValue>) {
    let id = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok());

    let (session, created) = state.sessions.get_or_create(id);
    let cookie = created
        .then(|| {
            HeaderValue::from_str(&format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE,
                session.id()
            ))
            .ok()
        })
        .flatten();

    (session, cookie)
}

fn with_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (_, cookie) = session_for(&state, &headers);
    with_cookie(Html(INDEX_HTML).into_response(), cookie)
}

#[derive(Debug, Deserialize)]
pub struct MetadataParams {
    pub url: String,
}

/// The one-row metadata table; streams and view count are left out
#[derive(Debug, Serialize)]
pub struct MetadataRow {
    pub title: String,
    pub author: String,
    pub length: u64,
    pub publish_date: Option<Date>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetadataResponse {
    Resolved {
        metadata: MetadataRow,
        streams: Vec<StreamDescriptor>,
    },
    Failed {
        reason: FailureReason,
        description: &'static str,
        message: String,
        hint: Option<&'static str>,
    },
}

impl From<MetadataLookup> for MetadataResponse {
    fn from(lookup: MetadataLookup) -> Self {
        match lookup {
            MetadataLookup::Resolved(meta) => Self::Resolved {
                metadata: MetadataRow {
                    title: meta.title,
                    author: meta.author,
                    length: meta.length,
                    publish_date: meta.publish_date,
                },
                streams: meta.streams,
            },
            MetadataLookup::Failed(failure) => Self::Failed {
                reason: failure.reason,
                description: failure.reason.description(),
                message: failure.message,
                hint: failure.reason.hint(),
            },
        }
    }
}

/// GET /api/metadata?url=...
///
/// A failed lookup is still a 200; the body says what went wrong.
pub async fn metadata(
    State(state): State<AppState>,
    params: Result<Query<MetadataParams>, QueryRejection>,
) -> ApiResult<Json<MetadataResponse>> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let url = params.url.trim();
    let lookup = state.service.lookup_metadata(url).await;
    info!(url, resolved = lookup.is_resolved(), "metadata lookup");
    Ok(Json(lookup.into()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    #[default]
    Attachment,
    Inline,
}

impl Disposition {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub url: String,
    pub policy: StreamPolicy,
    #[serde(default)]
    pub sink: TransferSink,
    #[serde(default)]
    pub disposition: Disposition,
}

fn sanitize_ascii_filename(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn content_disposition(disposition: Disposition, file_name: &str) -> String {
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        sanitize_ascii_filename(file_name),
        urlencoding::encode(file_name)
    )
}

/// GET /api/download?url=...&policy=audio|video&sink=buffer|file&disposition=attachment|inline
pub async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<DownloadParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (session, cookie) = session_for(&state, &headers);
    let mode = FetchMode {
        policy: params.policy,
        sink: params.sink,
    };

    let delivery = state
        .service
        .download(params.url.trim(), mode, &session)
        .await?;
    let bytes = delivery.selected.bytes.clone();

    let mut out = HeaderMap::new();
    out.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&delivery.mime_type)
            .map_err(|_| ApiError::internal("Invalid MIME type"))?,
    );
    out.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    out.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(params.disposition, &delivery.file_name))
            .map_err(|_| ApiError::internal("Invalid file name"))?,
    );
    out.insert(
        HeaderName::from_static("x-stream-itag"),
        HeaderValue::from_str(&delivery.selected.descriptor.itag)
            .map_err(|_| ApiError::internal("Invalid stream tag"))?,
    );

    Ok(with_cookie((out, Body::from(bytes)).into_response(), cookie))
}
