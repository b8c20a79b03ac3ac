use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Column names of the canonical upload schema.
pub mod columns {
    pub const CUSTOMER_ID: &str = "CustomerID";
    pub const TENURE: &str = "Tenure";
    pub const MONTHLY_CHARGES: &str = "MonthlyCharges";
    pub const TOTAL_CHARGES: &str = "TotalCharges";
    pub const CONTRACT: &str = "Contract";
    pub const CHURN: &str = "Churn";

    pub const INTERNET_SERVICE: &str = "InternetService";
    pub const ONLINE_SECURITY: &str = "OnlineSecurity";
    pub const TECH_SUPPORT: &str = "TechSupport";
    pub const PAPERLESS_BILLING: &str = "PaperlessBilling";
    pub const PAYMENT_METHOD: &str = "PaymentMethod";

    /// Every upload must carry these, spelled exactly like this.
    pub const REQUIRED: [&str; 11] = [
        CUSTOMER_ID,
        TENURE,
        MONTHLY_CHARGES,
        TOTAL_CHARGES,
        CONTRACT,
        INTERNET_SERVICE,
        ONLINE_SECURITY,
        TECH_SUPPORT,
        PAPERLESS_BILLING,
        PAYMENT_METHOD,
        CHURN,
    ];

    /// Columns mapped onto typed fields of a normalized record.
    pub const CORE: [&str; 6] = [CUSTOMER_ID, TENURE, MONTHLY_CHARGES, TOTAL_CHARGES, CONTRACT, CHURN];

    pub const DEMOGRAPHIC: [&str; 4] = ["gender", "SeniorCitizen", "Partner", "Dependents"];

    pub const SERVICES: [&str; 5] = [
        INTERNET_SERVICE,
        ONLINE_SECURITY,
        TECH_SUPPORT,
        "StreamingTV",
        "StreamingMovies",
    ];
}

/// An upload as received from a client, before anything is parsed.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    /// Bytes the client sent. Exceeds `bytes.len()` when the body was capped.
    pub size: usize,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            file_name: file_name.into(),
            content_type,
            size: bytes.len(),
            bytes,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size.max(self.bytes.len());
        self
    }
}

/// One CSV data row: column name to cell text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// First value stored under `column`, if any.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of cells holding something other than whitespace.
    pub fn populated_fields(&self) -> usize {
        self.fields.iter().filter(|(_, v)| !v.trim().is_empty()).count()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A parsed but untyped upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractType {
    MonthToMonth,
    OneYear,
    TwoYear,
    Unknown,
    /// A literal outside the canonical set, kept as its own bucket.
    Other(String),
}

impl ContractType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => ContractType::Unknown,
            "Month-to-month" | "month-to-month" => ContractType::MonthToMonth,
            "One year" | "one-year" => ContractType::OneYear,
            "Two year" | "two-year" => ContractType::TwoYear,
            "unknown" => ContractType::Unknown,
            other => ContractType::Other(other.to_string()),
        }
    }

    /// Segment key for this contract type.
    pub fn key(&self) -> &str {
        match self {
            ContractType::MonthToMonth => "month-to-month",
            ContractType::OneYear => "one-year",
            ContractType::TwoYear => "two-year",
            ContractType::Unknown => "unknown",
            ContractType::Other(literal) => literal,
        }
    }

    /// Spelling used in uploaded files.
    pub fn source_label(&self) -> &str {
        match self {
            ContractType::MonthToMonth => "Month-to-month",
            ContractType::OneYear => "One year",
            ContractType::TwoYear => "Two year",
            ContractType::Unknown => "",
            ContractType::Other(literal) => literal,
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for ContractType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

/// One customer after cleaning. Every typed field is always defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub customer_id: Option<String>,
    pub tenure_months: u32,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub contract_type: ContractType,
    pub churned: bool,
    /// Source columns outside the core schema, unmodified.
    pub attributes: BTreeMap<String, String>,
}

impl NormalizedRecord {
    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes.get(column).map(String::as_str)
    }

    /// Render back into the upload shape using canonical column names.
    pub fn to_raw_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.push(columns::CUSTOMER_ID, self.customer_id.clone().unwrap_or_default());
        row.push(columns::TENURE, self.tenure_months.to_string());
        row.push(columns::MONTHLY_CHARGES, self.monthly_charges.to_string());
        row.push(columns::TOTAL_CHARGES, self.total_charges.to_string());
        row.push(columns::CONTRACT, self.contract_type.source_label());
        row.push(columns::CHURN, if self.churned { "Yes" } else { "No" });
        for (column, value) in &self.attributes {
            row.push(column.as_str(), value.as_str());
        }
        row
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnMetrics {
    pub total_customers: usize,
    pub churned_count: usize,
    pub retained_count: usize,
    pub churn_rate: f64,
    pub retention_rate: f64,
    pub average_monthly_charges: f64,
    pub average_tenure: f64,
    pub average_monthly_charges_churned: f64,
    pub average_monthly_charges_retained: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub total: usize,
    pub churned_count: usize,
    pub churn_rate: f64,
}

impl Segment {
    pub fn new(total: usize, churned_count: usize) -> Self {
        let churn_rate = if total > 0 {
            churned_count as f64 / total as f64
        } else {
            0.0
        };
        Self {
            total,
            churned_count,
            churn_rate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segments {
    pub by_contract_type: BTreeMap<String, Segment>,
    pub by_tenure_bucket: BTreeMap<String, Segment>,
}

/// Everything derived from one successful upload. Never mutated after assembly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub source_file: String,
    pub uploaded_at: DateTime<Utc>,
    pub records: Vec<NormalizedRecord>,
    pub metrics: ChurnMetrics,
    pub segments: Segments,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_literals_map_to_canonical_keys() {
        assert_eq!(ContractType::parse("Month-to-month").key(), "month-to-month");
        assert_eq!(ContractType::parse(" One year ").key(), "one-year");
        assert_eq!(ContractType::parse("Two year").key(), "two-year");
        assert_eq!(ContractType::parse("").key(), "unknown");
        assert_eq!(ContractType::parse("   ").key(), "unknown");
    }

    #[test]
    fn unexpected_contract_literal_is_its_own_bucket() {
        let contract = ContractType::parse("Three year");
        assert_eq!(contract, ContractType::Other("Three year".to_string()));
        assert_eq!(contract.key(), "Three year");
        // Matching is exact, not case-insensitive.
        assert_eq!(ContractType::parse("ONE YEAR").key(), "ONE YEAR");
    }

    #[test]
    fn raw_row_lookup_returns_first_match() {
        let row: RawRow = vec![("Churn", "Yes"), ("Tenure", "3"), ("Churn", "No")]
            .into_iter()
            .collect();
        assert_eq!(row.get("Churn"), Some("Yes"));
        assert_eq!(row.get("churn"), None);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn populated_fields_ignores_blank_cells() {
        let row: RawRow = vec![("A", " "), ("B", ""), ("C", "x")].into_iter().collect();
        assert_eq!(row.populated_fields(), 1);
    }

    #[test]
    fn empty_segment_has_zero_rate() {
        let segment = Segment::new(0, 0);
        assert_eq!(segment.churn_rate, 0.0);
        assert!((Segment::new(4, 1).churn_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn contract_type_serializes_as_key() {
        let json = serde_json::to_string(&ContractType::TwoYear).unwrap();
        assert_eq!(json, "\"two-year\"");
    }
}
