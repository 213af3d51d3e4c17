use crate::recap::RecapRow;
use serde_json::{json, Value};
use std::path::Path;

/// Column order for the spreadsheet export. Fixed; shells must not reorder.
pub const SHEET_HEADERS: [&str; 9] = [
    "Nama Siswa",
    "Kelas",
    "Hadir",
    "Sakit",
    "Izin",
    "Alpa",
    "Tidur",
    "Total Pertemuan",
    "Persentase Hadir (%)",
];

/// Column order for the paginated table document.
pub const TABLE_HEADERS: [&str; 9] = [
    "Nama Siswa",
    "Kelas",
    "Hadir",
    "Sakit",
    "Izin",
    "Alpa",
    "Tidur",
    "Total",
    "% Hadir",
];

/// Sheet-form records aligned with SHEET_HEADERS. Numeric cells stay numeric;
/// nothing is recomputed here.
pub fn recap_sheet_records(rows: &[RecapRow]) -> Vec<Vec<Value>> {
    rows.iter()
        .map(|row| {
            vec![
                json!(row.student_name),
                json!(row.class_name),
                json!(row.present),
                json!(row.sick),
                json!(row.excused),
                json!(row.absent),
                json!(row.sleeping),
                json!(row.total_hours),
                json!(row.presence_percentage),
            ]
        })
        .collect()
}

/// Table-form body aligned with TABLE_HEADERS. Same source rows as the sheet
/// form; only the percentage gains its "%" suffix for rendering.
pub fn recap_table_body(rows: &[RecapRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            vec![
                row.student_name.clone(),
                row.class_name.clone(),
                row.present.to_string(),
                row.sick.to_string(),
                row.excused.to_string(),
                row.absent.to_string(),
                row.sleeping.to_string(),
                row.total_hours.to_string(),
                format!("{}%", row.presence_percentage),
            ]
        })
        .collect()
}

/// Writes the sheet form as CSV for the download sink.
pub fn write_recap_csv(path: &Path, rows: &[RecapRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(SHEET_HEADERS)?;
    for row in rows {
        let record = vec![
            row.student_name.clone(),
            row.class_name.clone(),
            row.present.to_string(),
            row.sick.to_string(),
            row.excused.to_string(),
            row.absent.to_string(),
            row.sleeping.to_string(),
            row.total_hours.to_string(),
            row.presence_percentage.to_string(),
        ];
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
