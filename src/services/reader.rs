use crate::error::AppError;
use crate::models::{RawRow, RawTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse CSV bytes into a header row plus order-preserving raw rows.
///
/// Rows may be ragged: short rows are padded with empty cells and cells past
/// the last header are ignored. Cell text is decoded lossily so a stray
/// non-UTF-8 byte degrades one value instead of the whole upload.
pub fn read_table(data: &[u8]) -> Result<RawTable, AppError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        tracing::debug!("CSV has no header row");
        return Ok(RawTable::default());
    }

    let mut rows = Vec::new();
    for (line_num, result) in reader.byte_records().enumerate() {
        let record = result.map_err(|e| {
            AppError::FileProcessingError(format!("CSV parse error at line {}: {}", line_num + 2, e))
        })?;

        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let value = record
                    .get(idx)
                    .map(|cell| String::from_utf8_lossy(cell).into_owned())
                    .unwrap_or_default();
                (header.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    tracing::debug!("Read CSV with {} columns and {} rows", headers.len(), rows.len());
    Ok(RawTable { headers, rows })
}
