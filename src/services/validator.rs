//! Upload and table structure checks.
//!
//! Checks run in priority order: file type, file size, empty table, required
//! columns. The first failing check is reported; type and size are decided
//! before the bytes are ever parsed.

use crate::error::ValidationError;
use crate::models::{columns, RawTable, UploadedFile};

const CSV_CONTENT_TYPES: [&str; 2] = ["text/csv", "application/csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_size: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

pub fn validate(
    file: &UploadedFile,
    table: &RawTable,
    limits: &UploadLimits,
) -> Result<(), ValidationError> {
    validate_upload(file, limits)?;
    validate_table(table)
}

pub fn validate_upload(file: &UploadedFile, limits: &UploadLimits) -> Result<(), ValidationError> {
    if !is_csv(file) {
        return Err(ValidationError::WrongFileType {
            file_name: file.file_name.clone(),
        });
    }

    if file.size > limits.max_file_size {
        return Err(ValidationError::FileTooLarge {
            size: file.size,
            limit: limits.max_file_size,
        });
    }

    Ok(())
}

pub fn validate_table(table: &RawTable) -> Result<(), ValidationError> {
    if !table.rows.iter().any(|row| row.populated_fields() > 0) {
        return Err(ValidationError::EmptyFile);
    }

    let missing = missing_columns(&table.headers);
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns(missing));
    }

    Ok(())
}

/// Required columns absent from `headers`, in declaration order.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    columns::REQUIRED
        .iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|required| required.to_string())
        .collect()
}

fn is_csv(file: &UploadedFile) -> bool {
    let by_extension = file.file_name.trim().to_lowercase().ends_with(".csv");

    let by_mime = file.content_type.as_deref().is_some_and(|mime| {
        let essence = mime.split(';').next().unwrap_or_default().trim().to_lowercase();
        CSV_CONTENT_TYPES.contains(&essence.as_str())
    });

    by_extension || by_mime
}
