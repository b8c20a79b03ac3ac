//! Churn breakdowns over pass-through columns (demographics, services).

use polars::prelude::*;
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::models::{NormalizedRecord, Segment};

const VALUE_COLUMN: &str = "value";
const CHURNED_COLUMN: &str = "churned";
const UNKNOWN: &str = "unknown";

fn group_key(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Churn segments keyed by each distinct value of `column`.
pub fn breakdown_by(
    records: &[NormalizedRecord],
    column: &str,
) -> Result<BTreeMap<String, Segment>, AppError> {
    if records.is_empty() {
        return Ok(BTreeMap::new());
    }

    let values: Vec<String> = records.iter().map(|r| group_key(r.attribute(column))).collect();
    let churned: Vec<bool> = records.iter().map(|r| r.churned).collect();

    let df = DataFrame::new(vec![
        Series::new(VALUE_COLUMN, values),
        Series::new(CHURNED_COLUMN, churned),
    ])?;

    let grouped = df
        .lazy()
        .group_by([col(VALUE_COLUMN)])
        .agg([
            col(CHURNED_COLUMN).count().cast(DataType::UInt64).alias("total"),
            col(CHURNED_COLUMN).cast(DataType::UInt64).sum().alias("churned_count"),
        ])
        .collect()?;

    let keys = grouped.column(VALUE_COLUMN)?.str()?;
    let totals = grouped.column("total")?.u64()?;
    let churned_counts = grouped.column("churned_count")?.u64()?;

    let segments = keys
        .into_iter()
        .zip(totals.into_iter())
        .zip(churned_counts.into_iter())
        .map(|((key, total), churned)| {
            (
                key.unwrap_or(UNKNOWN).to_string(),
                Segment::new(total.unwrap_or(0) as usize, churned.unwrap_or(0) as usize),
            )
        })
        .collect();

    Ok(segments)
}

/// Breakdowns for each of `columns` the upload actually carries.
pub fn breakdown_columns(
    records: &[NormalizedRecord],
    columns: &[&str],
) -> Result<BTreeMap<String, BTreeMap<String, Segment>>, AppError> {
    let mut breakdowns = BTreeMap::new();
    for &column in columns {
        if !records.iter().any(|r| r.attributes.contains_key(column)) {
            tracing::debug!("Skipping breakdown for absent column {}", column);
            continue;
        }
        breakdowns.insert(column.to_string(), breakdown_by(records, column)?);
    }
    Ok(breakdowns)
}
