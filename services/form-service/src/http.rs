//! HTTP surface.
//!
//! Thin handlers over [`FormService`]: multipart parsing, id parsing and the
//! response envelope live here, everything else is delegated.

use crate::export::ExportedPdf;
use crate::service::{CreateFormRequest, FormService, SaveSubmissionRequest, TemplateUpload};
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use formflow_models::ApiResponse;
use formflow_utils::FormFlowError;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

/// `max_upload_bytes` replaces the framework's default body limit, which is
/// far below a typical template upload.
pub fn router(service: Arc<FormService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/forms", post(create_form))
        .route("/api/v1/forms/:id/fields", get(form_fields))
        .route("/api/v1/forms/:id/export", get(export_form))
        .route("/api/v1/forms/:id/submissions", post(save_submission))
        .route(
            "/api/v1/forms/:id/submissions/latest",
            get(latest_submission),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Serialize)]
struct HealthStatus {
    service: &'static str,
    status: &'static str,
}

async fn health() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::ok(
        "healthy",
        HealthStatus {
            service: "form-service",
            status: "up",
        },
    ))
}

/// Envelope for a failed request; the HTTP status mirrors the envelope's
/// status_code field.
fn failure<T: Serialize>(err: &FormFlowError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ApiResponse::error(status.as_u16(), err.to_string())),
    )
}

fn bad_request<T: Serialize>(message: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(400, message)),
    )
}

/// An over-limit body surfaces as 413 with a message naming the cause; every
/// other multipart failure stays a 400.
fn multipart_failure(part: &str, err: &MultipartError) -> Response {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return (
            status,
            Json(ApiResponse::<()>::error(
                status.as_u16(),
                "upload exceeds the configured size limit",
            )),
        )
            .into_response();
    }
    bad_request::<()>(&format!("unreadable part '{part}': {err}")).into_response()
}

async fn create_form(
    State(service): State<Arc<FormService>>,
    mut multipart: Multipart,
) -> Response {
    let mut name = None;
    let mut category = None;
    let mut user_id_raw = None;
    let mut template = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_failure("body", &e),
        };
        let part = field.name().unwrap_or_default().to_string();
        match part.as_str() {
            "name" => match field.text().await {
                Ok(v) => name = Some(v),
                Err(e) => return multipart_failure(&part, &e),
            },
            "category" => match field.text().await {
                Ok(v) => category = Some(v),
                Err(e) => return multipart_failure(&part, &e),
            },
            "user_id" => match field.text().await {
                Ok(v) => user_id_raw = Some(v),
                Err(e) => return multipart_failure(&part, &e),
            },
            "template" => {
                let file_name = field.file_name().unwrap_or("template").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        template = Some(TemplateUpload {
                            file_name,
                            bytes: bytes.to_vec(),
                        })
                    }
                    Err(e) => return multipart_failure(&part, &e),
                }
            }
            _ => {}
        }
    }

    let Some(name) = name else {
        return bad_request::<()>("missing multipart part 'name'").into_response();
    };
    let Some(user_id_raw) = user_id_raw else {
        return bad_request::<()>("missing multipart part 'user_id'").into_response();
    };
    let Ok(user_id) = Uuid::parse_str(user_id_raw.trim()) else {
        return bad_request::<()>("'user_id' is not a valid uuid").into_response();
    };

    let request = CreateFormRequest {
        name,
        category: category.unwrap_or_else(|| "General".to_string()),
        user_id,
        template,
    };
    match service.create_form(request).await {
        Ok(created) => (
            StatusCode::OK,
            Json(ApiResponse::ok("form created", created)),
        )
            .into_response(),
        Err(e) => failure::<()>(&e).into_response(),
    }
}

async fn form_fields(
    State(service): State<Arc<FormService>>,
    Path(form_id): Path<Uuid>,
) -> Response {
    match service.form_fields(form_id).await {
        Ok(fields) => (StatusCode::OK, Json(ApiResponse::ok("form fields", fields))).into_response(),
        Err(e) => failure::<()>(&e).into_response(),
    }
}

async fn export_form(
    State(service): State<Arc<FormService>>,
    Path(form_id): Path<Uuid>,
) -> Response {
    match service.export_form_pdf(form_id).await {
        Ok(pdf) => pdf_response(pdf),
        Err(e) => failure::<()>(&e).into_response(),
    }
}

/// Raw PDF bytes; metadata rides in headers instead of an envelope.
fn pdf_response(pdf: ExportedPdf) -> Response {
    let built = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", pdf.file_name),
        )
        .header("x-file-name", &pdf.file_name)
        .header("x-field-count", pdf.field_count.to_string())
        .body(Body::from(pdf.bytes));
    match built {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "failed to assemble pdf response");
            failure::<()>(&FormFlowError::internal("failed to assemble pdf response"))
                .into_response()
        }
    }
}

async fn save_submission(
    State(service): State<Arc<FormService>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SaveSubmissionRequest>,
) -> Response {
    match service.save_submission(form_id, request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::ok("submission saved", outcome)),
        )
            .into_response(),
        Err(e) => failure::<()>(&e).into_response(),
    }
}

async fn latest_submission(
    State(service): State<Arc<FormService>>,
    Path(form_id): Path<Uuid>,
) -> Response {
    match service.latest_submission(form_id).await {
        Ok(latest) => (
            StatusCode::OK,
            Json(ApiResponse::ok("latest submission", latest)),
        )
            .into_response(),
        Err(e) => failure::<()>(&e).into_response(),
    }
}
