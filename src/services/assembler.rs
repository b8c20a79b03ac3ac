use chrono::Utc;
use std::time::Instant;
use tracing::info;

use crate::error::{AppError, ValidationError};
use crate::models::{Dataset, RawTable, UploadedFile};
use crate::services::{aggregator, normalizer, reader, segmenter, validator};
use crate::services::validator::UploadLimits;

/// Build a dataset from an already parsed table.
///
/// Fails only when the table itself is structurally invalid; individual bad
/// cells are defaulted by the normalizer.
pub fn assemble(table: &RawTable, source_file: &str) -> Result<Dataset, ValidationError> {
    validator::validate_table(table)?;

    let records = normalizer::normalize(&table.rows);
    let metrics = aggregator::aggregate(&records);
    let segments = segmenter::segment(&records);

    Ok(Dataset {
        source_file: source_file.to_string(),
        uploaded_at: Utc::now(),
        records,
        metrics,
        segments,
    })
}

/// Run the whole pipeline for one upload: checks, parsing, assembly.
pub fn ingest(file: &UploadedFile, limits: &UploadLimits) -> Result<Dataset, AppError> {
    let start = Instant::now();
    info!(
        "Ingesting upload '{}' ({}KB)",
        file.file_name,
        file.size / 1024
    );

    validator::validate_upload(file, limits)?;

    let parse_start = Instant::now();
    let table = reader::read_table(&file.bytes)?;
    info!(
        "Parsed {} rows x {} columns in {:?}",
        table.rows.len(),
        table.headers.len(),
        parse_start.elapsed()
    );

    let dataset = assemble(&table, &file.file_name)?;
    info!(
        "Assembled dataset from '{}': {} customers, churn rate {:.3}, took {:?}",
        dataset.source_file,
        dataset.metrics.total_customers,
        dataset.metrics.churn_rate,
        start.elapsed()
    );

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "CustomerID,Tenure,MonthlyCharges,TotalCharges,Contract,InternetService,OnlineSecurity,TechSupport,PaperlessBilling,PaymentMethod,Churn";

    fn upload(body: &str) -> UploadedFile {
        UploadedFile::new("customers.csv", Some("text/csv".to_string()), body.to_string())
    }

    #[test]
    fn ingest_builds_metrics_and_segments() {
        let body = format!(
            "{HEADER}\n\
             c1,5,70,350,Month-to-month,DSL,No,No,Yes,Electronic check,Yes\n\
             c2,40,50,2000,Two year,DSL,Yes,Yes,No,Mailed check,No\n"
        );
        let dataset = ingest(&upload(&body), &UploadLimits::default()).unwrap();

        assert_eq!(dataset.source_file, "customers.csv");
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.metrics.churned_count, 1);
        assert_eq!(dataset.segments.by_contract_type["two-year"].total, 1);
        assert_eq!(dataset.segments.by_tenure_bucket["37-48"].total, 1);
        assert_eq!(dataset.records[0].attribute("PaymentMethod"), Some("Electronic check"));
    }

    #[test]
    fn validation_error_kind_is_preserved() {
        let body = "CustomerID,Tenure,MonthlyCharges,InternetService,OnlineSecurity,TechSupport,PaperlessBilling,PaymentMethod,Churn\nc1,1,1,DSL,No,No,No,Mailed check,No\n";
        let err = ingest(&upload(body), &UploadLimits::default()).unwrap_err();

        match err {
            AppError::Validation(ValidationError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["TotalCharges".to_string(), "Contract".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn header_only_upload_is_empty() {
        let err = ingest(&upload(&format!("{HEADER}\n")), &UploadLimits::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyFile)));

        let err = ingest(&upload(""), &UploadLimits::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyFile)));
    }

    #[test]
    fn assemble_rejects_invalid_table_untouched() {
        let table = RawTable::default();
        assert_eq!(assemble(&table, "x.csv").unwrap_err(), ValidationError::EmptyFile);
    }
}
