use anyhow::Context;
use std::path::Path;

/// Narrow spreadsheet adapter: a parsed sheet is a header row followed by
/// data rows, every cell a trimmed string. Import handlers accept either a
/// CSV path read through this adapter or rows the shell already parsed from
/// a workbook, so the normalizers never see a parser API.
pub fn read_sheet(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open sheet {}", path.to_string_lossy()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read sheet row")?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(rows)
}

/// Converts a JSON array-of-arrays of primitive cells into sheet rows.
/// Numbers keep their shortest decimal rendering; null becomes the empty
/// cell. Non-array input yields None.
pub fn rows_from_json(value: &serde_json::Value) -> Option<Vec<Vec<String>>> {
    let rows = value.as_array()?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row.as_array()?;
        out.push(cells.iter().map(cell_to_string).collect());
    }
    Some(out)
}

fn cell_to_string(cell: &serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
