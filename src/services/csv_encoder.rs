//! CSV serialization of visitor records

use crate::{error::ExportError, models::VisitorRecord};

pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "date",
    "time",
    "visitor_count",
    "day_of_week",
    "hour",
];

/// Encode records as UTF-8 CSV, header first, one `\n` terminated line per record
pub fn encode(records: &[VisitorRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| ExportError::Encoding(e.to_string()))?;

    for record in records {
        let timestamp = record.timestamp();
        writer
            .write_record([
                timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                timestamp.format("%Y-%m-%d").to_string(),
                timestamp.format("%H:%M").to_string(),
                record.visitor_count().to_string(),
                record.day_of_week(),
                record.hour().to_string(),
            ])
            .map_err(|e| ExportError::Encoding(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Encoding(e.to_string()))
}

/// First `limit` characters of the CSV text, with `...` when cut short
pub fn preview(buffer: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(buffer);
    let cut = text.char_indices().nth(limit).map(|(index, _)| index);
    match cut {
        Some(cut) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
