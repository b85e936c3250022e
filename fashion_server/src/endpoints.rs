//! Endpoints of HTTP server.
//!
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use bytes::Bytes;
use common::protocol::{ErrorMsg, Prediction};
use image::DynamicImage;

use crate::{
    classifier::{decode_image, Classifier},
    meter::METER,
    preview::{render_preview, MAX_PREVIEW_WIDTH},
};

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Build the router with all endpoints.
pub fn app(classifier: Arc<Classifier>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/index", get(index))
        .route("/healthcheck", get(healthcheck))
        .route("/api/classify", post(classify))
        .route("/api/preview", post(preview))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(Extension(classifier))
}

/// Failed request, rendered as JSON `ErrorMsg`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("Request failed ({}): {}", self.status, self.message);
        (self.status, Json(ErrorMsg::new(self.message))).into_response()
    }
}

/// Index page with the upload form.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint.
pub async fn healthcheck() -> &'static str {
    "healthy"
}

/// Classify the uploaded image.
pub async fn classify(
    Extension(classifier): Extension<Arc<Classifier>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let image = read_image(multipart).await?;

    let prediction = tokio::task::spawn_blocking(move || classifier.classify_image(&image))
        .await
        .map_err(ApiError::internal)?
        .map_err(|err| ApiError::internal(format!("{err:#}")))?;

    log::info!("Predicted {}", prediction.label);

    Ok(Json(prediction))
}

/// Scaled down PNG of the uploaded image.
pub async fn preview(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let image = read_image(multipart).await?;

    let png = tokio::task::spawn_blocking(move || render_preview(&image, MAX_PREVIEW_WIDTH))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// Extract and decode the image field of a multipart upload.
async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<DynamicImage, ApiError> {
    let multipart =
        multipart.map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.body_text()))?;
    let data = read_image_field(multipart).await?;
    METER.tick_upload();
    log::debug!("Received upload of {} bytes", data.len());

    decode_image(&data).map_err(|err| {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("failed to decode image: {err}"),
        )
    })
}

async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))?;
        if data.is_empty() {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "please select an image",
            ));
        }

        return Ok(data);
    }

    Err(ApiError::new(
        StatusCode::BAD_REQUEST,
        format!("missing multipart field `{IMAGE_FIELD}`"),
    ))
}
