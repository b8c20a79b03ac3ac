//! Row cleaning and type coercion.
//!
//! Turns untyped CSV rows into [`NormalizedRecord`]s. A malformed cell never
//! fails the batch: the affected field falls back to its default and the rest
//! of the row is kept.

use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{columns, ContractType, NormalizedRecord, RawRow};

/// Rows with fewer populated cells than this are blank-line artifacts.
const MIN_POPULATED_FIELDS: usize = 1;

pub fn normalize(rows: &[RawRow]) -> Vec<NormalizedRecord> {
    let records: Vec<NormalizedRecord> = rows.iter().filter_map(normalize_row).collect();

    let dropped = rows.len() - records.len();
    if dropped > 0 {
        debug!("Dropped {} blank rows during normalization", dropped);
    }
    records
}

/// Normalize a single row, or `None` when the row is a blank artifact.
pub fn normalize_row(row: &RawRow) -> Option<NormalizedRecord> {
    if row.populated_fields() < MIN_POPULATED_FIELDS {
        return None;
    }

    let customer_id = row
        .get(columns::CUSTOMER_ID)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let mut attributes = BTreeMap::new();
    for (column, value) in row.iter() {
        if !columns::CORE.contains(&column) {
            attributes
                .entry(column.to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    Some(NormalizedRecord {
        customer_id,
        tenure_months: parse_months(row.get(columns::TENURE)),
        monthly_charges: parse_amount(row.get(columns::MONTHLY_CHARGES)),
        total_charges: parse_amount(row.get(columns::TOTAL_CHARGES)),
        contract_type: ContractType::parse(row.get(columns::CONTRACT).unwrap_or_default()),
        churned: parse_churn_flag(row.get(columns::CHURN)),
        attributes,
    })
}

/// Non-negative finite decimal, else 0.
pub fn parse_amount(raw: Option<&str>) -> f64 {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0.0;
    };

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => {
            debug!("Defaulting unparseable amount '{}' to 0", text);
            0.0
        }
    }
}

/// Whole months; fractions are truncated, anything unparseable or negative is 0.
/// Values past `u32::MAX` clamp to `u32::MAX`.
pub fn parse_months(raw: Option<&str>) -> u32 {
    let months = parse_amount(raw);
    months.trunc().min(u32::MAX as f64) as u32
}

pub fn parse_churn_flag(raw: Option<&str>) -> bool {
    raw.map(|value| value.trim().to_lowercase() == "yes")
        .unwrap_or(false)
}
