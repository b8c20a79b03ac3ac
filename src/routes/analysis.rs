use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{columns, ChurnMetrics, Dataset, Segment},
    services::breakdown,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dataset", get(get_dataset))
        .route("/churn-summary", get(get_churn_summary))
        .route("/demographic-analysis", get(get_demographic_analysis))
        .route("/services-analysis", get(get_services_analysis))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnSummary {
    source_file: String,
    metrics: ChurnMetrics,
    contract_breakdown: BTreeMap<String, Segment>,
    tenure_breakdown: BTreeMap<String, Segment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownResponse {
    source_file: String,
    breakdowns: BTreeMap<String, BTreeMap<String, Segment>>,
}

fn live_dataset(state: &AppState) -> Result<Arc<Dataset>, AppError> {
    state.store.current().ok_or(AppError::NoDataset)
}

async fn get_dataset(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let dataset = live_dataset(&state)?;
    Ok(Json(dataset.as_ref()).into_response())
}

async fn get_churn_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChurnSummary>, AppError> {
    let dataset = live_dataset(&state)?;

    Ok(Json(ChurnSummary {
        source_file: dataset.source_file.clone(),
        metrics: dataset.metrics.clone(),
        contract_breakdown: dataset.segments.by_contract_type.clone(),
        tenure_breakdown: dataset.segments.by_tenure_bucket.clone(),
    }))
}

async fn get_demographic_analysis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BreakdownResponse>, AppError> {
    breakdown_response(&state, &columns::DEMOGRAPHIC)
}

async fn get_services_analysis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BreakdownResponse>, AppError> {
    breakdown_response(&state, &columns::SERVICES)
}

fn breakdown_response(
    state: &AppState,
    columns: &[&str],
) -> Result<Json<BreakdownResponse>, AppError> {
    let dataset = live_dataset(state)?;
    let breakdowns = breakdown::breakdown_columns(&dataset.records, columns)?;

    Ok(Json(BreakdownResponse {
        source_file: dataset.source_file.clone(),
        breakdowns,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::UploadedFile;
    use crate::routes::uploads::SAMPLE_TEMPLATE;
    use crate::services::assembler;
    use crate::services::validator::UploadLimits;
    use axum::http::StatusCode;

    fn loaded_state() -> Arc<AppState> {
        let state = Arc::new(AppState::new(Config::default()));
        let file = UploadedFile::new("template.csv", None, SAMPLE_TEMPLATE);
        let dataset = assembler::ingest(&file, &UploadLimits::default()).unwrap();
        state.store.publish(state.store.begin_upload(), dataset);
        state
    }

    #[tokio::test]
    async fn endpoints_report_missing_dataset() {
        let state = Arc::new(AppState::new(Config::default()));

        let err = get_churn_summary(State(state.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::NoDataset));

        let response = get_dataset(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn churn_summary_reflects_live_dataset() {
        let Json(summary) = get_churn_summary(State(loaded_state())).await.unwrap();

        assert_eq!(summary.source_file, "template.csv");
        assert_eq!(summary.metrics.total_customers, 12);
        assert_eq!(summary.tenure_breakdown.len(), 6);
        assert_eq!(summary.contract_breakdown["month-to-month"].total, 8);
        assert_eq!(summary.contract_breakdown["one-year"].total, 3);
        assert_eq!(summary.contract_breakdown["two-year"].total, 1);
    }

    #[tokio::test]
    async fn services_analysis_covers_service_columns() {
        let Json(response) = get_services_analysis(State(loaded_state())).await.unwrap();

        assert_eq!(response.breakdowns.len(), 5);
        let internet = &response.breakdowns["InternetService"];
        assert_eq!(internet["Fiber optic"], Segment::new(4, 3));
        assert_eq!(internet["No"], Segment::new(1, 0));
    }

    #[tokio::test]
    async fn demographic_analysis_groups_by_gender() {
        let Json(response) = get_demographic_analysis(State(loaded_state())).await.unwrap();

        let gender = &response.breakdowns["gender"];
        assert_eq!(gender["Female"].total + gender["Male"].total, 12);
    }
}
