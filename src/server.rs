//! HTTP summary service
//!
//! `GET /v1/summary?url=<page>` fetches the page and answers with its
//! [`PageSummary`] as JSON. Every response allows any origin.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::Error;
use crate::http::HttpOptions;
use crate::summary::PageSummary;

/// Shared state for request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub http: Arc<HttpOptions>,
}

impl AppState {
    pub fn new(http: HttpOptions) -> Self {
        Self {
            http: Arc::new(http),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/summary", get(get_summary))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub url: Option<String>,
}

/// GET /v1/summary?url=<encoded-url>
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<PageSummary>> {
    let url = query
        .url
        .filter(|url| !url.is_empty())
        .ok_or(ApiError::MissingUrl)?;

    let summary = PageSummary::fetch_with_options(&url, &state.http).await?;
    tracing::debug!(%url, images = summary.images.len(), "summarized page");
    Ok(Json(summary))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing `url` query parameter")]
    MissingUrl,

    #[error("error summarizing page: {0}")]
    Summary(#[from] Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl => StatusCode::BAD_REQUEST,
            ApiError::Summary(err) => match err {
                Error::InvalidUrl(_) | Error::SsrfBlocked(_) => StatusCode::BAD_REQUEST,
                Error::Http(_) | Error::Status(_) => StatusCode::BAD_GATEWAY,
                Error::InvalidContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Error::Tokenize { .. } => StatusCode::BAD_REQUEST,
                Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "summary request failed");
        } else {
            tracing::warn!(error = %self, "summary request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_url_returns_400() {
        let response = ApiError::MissingUrl.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["error"], "missing `url` query parameter");
    }

    #[tokio::test]
    async fn test_upstream_status_returns_502() {
        let response = ApiError::from(Error::Status(503)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response.into_body()).await;
        assert_eq!(
            json["error"],
            "error summarizing page: response status code was 503"
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidUrl("x".into()), StatusCode::BAD_REQUEST),
            (Error::SsrfBlocked("x".into()), StatusCode::BAD_REQUEST),
            (
                Error::InvalidContentType("application/pdf".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                Error::Tokenize {
                    source: std::io::Error::other("reset"),
                    partial: None,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Io(std::io::Error::other("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
