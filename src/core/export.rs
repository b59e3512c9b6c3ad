use crate::core::error::{AppError, AppResult};
use crate::storage::leads::Lead;

/// Header line of the lead export
pub const LEADS_CSV_HEADER: &str = "date,utm_source,username,video_generate_name";

/// Exports leads to CSV with the [`LEADS_CSV_HEADER`] columns
pub fn leads_to_csv(leads: &[Lead]) -> AppResult<String> {
    // Header is written by hand so an empty export still carries it
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(LEADS_CSV_HEADER.split(','))?;
    for lead in leads {
        writer.serialize(lead)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Validation(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Validation(format!("CSV is not UTF-8: {}", e)))
}

/// Exports leads to pretty-printed JSON
pub fn leads_to_json(leads: &[Lead]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(leads)
}

/// Parses a lead export produced by [`leads_to_csv`]
pub fn parse_leads_csv(content: &str) -> AppResult<Vec<Lead>> {
    let mut reader = csv::ReaderBuilder::new().from_reader(content.as_bytes());

    let headers = reader.headers()?;
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let header_line = headers.iter().collect::<Vec<_>>().join(",");
    if header_line != LEADS_CSV_HEADER {
        return Err(AppError::Validation(format!("unexpected CSV header: {}", header_line)));
    }

    reader
        .deserialize::<Lead>()
        .map(|row| row.map_err(AppError::from))
        .collect()
}
