use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{ChurnMetrics, Dataset, UploadedFile},
    services::{
        assembler,
        file_loader::{self, CappedBody},
    },
    AppState,
};

/// Example upload offered to users; matches the required schema.
pub const SAMPLE_TEMPLATE: &str = "\
CustomerID,gender,SeniorCitizen,Partner,Dependents,Tenure,InternetService,OnlineSecurity,TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,MonthlyCharges,TotalCharges,Churn
7590-VHVEG,Female,0,Yes,No,1,DSL,No,No,No,No,Month-to-month,Yes,Electronic check,29.85,29.85,No
5575-GNVDE,Male,0,No,No,34,DSL,Yes,No,No,No,One year,No,Mailed check,56.95,1889.5,No
3668-QPYBK,Male,0,No,No,2,DSL,Yes,No,No,No,Month-to-month,Yes,Mailed check,53.85,108.15,Yes
7795-CFOCW,Male,0,No,No,45,DSL,Yes,Yes,No,No,One year,No,Bank transfer (automatic),42.3,1840.75,No
9237-HQITU,Female,0,No,No,2,Fiber optic,No,No,No,No,Month-to-month,Yes,Electronic check,70.7,151.65,Yes
9305-CDSKC,Female,0,No,No,8,Fiber optic,No,No,Yes,Yes,Month-to-month,Yes,Electronic check,99.65,820.5,Yes
1452-KIOVK,Male,0,No,Yes,22,Fiber optic,No,No,Yes,No,Month-to-month,Yes,Credit card (automatic),89.1,1949.4,No
6713-OKOMC,Female,0,No,No,10,DSL,Yes,No,No,No,Month-to-month,No,Mailed check,29.75,301.9,No
7892-POOKP,Female,0,Yes,No,28,Fiber optic,No,Yes,Yes,Yes,Month-to-month,Yes,Electronic check,104.8,3046.05,Yes
6388-TABGU,Male,0,No,Yes,62,DSL,Yes,No,No,No,One year,No,Bank transfer (automatic),56.15,3487.95,No
9763-GRSKD,Male,0,Yes,Yes,13,DSL,Yes,No,No,No,Month-to-month,Yes,Mailed check,49.95,587.45,No
7469-LKBCI,Male,0,No,No,16,No,No internet service,No internet service,No internet service,No internet service,Two year,No,Credit card (automatic),18.95,326.8,No
";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/upload/url", post(upload_from_url))
        .route("/template", get(download_template))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlUploadRequest {
    file_name: Option<String>,
    signed_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    source_file: String,
    row_count: usize,
    uploaded_at: DateTime<Utc>,
    metrics: ChurnMetrics,
    /// True when a later upload was published first and this one was dropped.
    superseded: bool,
}

impl UploadResponse {
    fn new(dataset: &Dataset) -> Self {
        Self {
            source_file: dataset.source_file.clone(),
            row_count: dataset.records.len(),
            uploaded_at: dataset.uploaded_at,
            metrics: dataset.metrics.clone(),
            superseded: false,
        }
    }
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);

        let mut body = CappedBody::new(state.config.max_file_size);
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            body.push(&chunk);
        }

        let (bytes, size) = body.finish();
        upload = Some(UploadedFile::new(file_name, content_type, bytes).with_size(size));
        break;
    }

    let file = upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    process_upload(&state, file).await
}

async fn upload_from_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UrlUploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    tracing::info!("Downloading upload from signed URL, length: {}", request.signed_url.len());

    let file_name = request
        .file_name
        .or_else(|| file_loader::file_name_from_url(&request.signed_url))
        .ok_or_else(|| AppError::InvalidInput("Could not determine file name".to_string()))?;

    let download =
        file_loader::load_file_from_url(&request.signed_url, state.config.max_file_size).await?;
    tracing::info!("File downloaded, size: {}KB", download.size / 1024);

    let file = UploadedFile::new(file_name, download.content_type, download.bytes)
        .with_size(download.size);
    process_upload(&state, file).await
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Malformed multipart body: {}", err))
}

/// Ingest on the blocking pool, then publish unless a newer upload won.
async fn process_upload(
    state: &Arc<AppState>,
    file: UploadedFile,
) -> Result<Json<UploadResponse>, AppError> {
    let ticket = state.store.begin_upload();
    let limits = state.config.upload_limits();

    let dataset = tokio::task::spawn_blocking(move || assembler::ingest(&file, &limits))
        .await
        .map_err(|e| AppError::Internal(format!("Ingest task failed: {}", e)))??;

    let mut response = UploadResponse::new(&dataset);
    if state.store.publish(ticket, dataset).is_none() {
        tracing::warn!(
            "Upload '{}' finished after a newer upload; discarded",
            response.source_file
        );
        response.superseded = true;
    }

    Ok(Json(response))
}

async fn download_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"churn_template.csv\"",
            ),
        ],
        SAMPLE_TEMPLATE,
    )
}
