use serde::Serialize;

/// Required roster columns, matched case-insensitively after trimming.
pub const REQUIRED_HEADERS: [&str; 3] = ["nama", "kelas", "jenis kelamin"];

const NISN_HEADER: &str = "nisn";

/// Validation failure for a whole import. Individual malformed rows are
/// dropped silently; only structural problems (missing columns, nothing left
/// after filtering) surface as errors.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportError {
    pub code: String,
    pub message: String,
}

impl ImportError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub full_name: String,
    pub class_name: String,
    pub gender: Option<String>,
    pub nisn: Option<String>,
    pub email: Option<String>,
}

/// Full roster import: header row first, then one student per row.
///
/// A row survives when the name is non-empty, the grade cell parses as an
/// integer and the gender code starts with L or P. The section letter is
/// derived from the gender code (L -> A, P -> B); the class designator is
/// `{grade}{letter}`.
pub fn normalize_roster(rows: &[Vec<String>]) -> Result<Vec<NewStudent>, ImportError> {
    let Some(header_row) = rows.first() else {
        return Err(missing_headers_error(&REQUIRED_HEADERS));
    };
    let header: Vec<String> = header_row
        .iter()
        .map(|cell| cell.trim().to_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|name| !header.iter().any(|cell| cell == name))
        .collect();
    if !missing.is_empty() {
        return Err(missing_headers_error(&missing));
    }

    let name_idx = column_index(&header, REQUIRED_HEADERS[0]);
    let grade_idx = column_index(&header, REQUIRED_HEADERS[1]);
    let gender_idx = column_index(&header, REQUIRED_HEADERS[2]);
    let nisn_idx = header.iter().position(|cell| cell == NISN_HEADER);

    let mut students = Vec::new();
    for row in &rows[1..] {
        let Some(student) = normalize_row(row, name_idx, grade_idx, gender_idx, nisn_idx) else {
            continue;
        };
        students.push(student);
    }

    if students.is_empty() {
        return Err(ImportError::new(
            "no_valid_rows",
            "tidak ada data siswa yang valid di dalam file",
        ));
    }
    Ok(students)
}

/// Quick import: a pre-supplied class plus a single column of names.
/// Blank and whitespace-only entries are dropped.
pub fn normalize_name_list(
    class_name: &str,
    cells: &[String],
) -> Result<Vec<NewStudent>, ImportError> {
    let class_name = class_name.trim();
    let students: Vec<NewStudent> = cells
        .iter()
        .map(|cell| cell.trim())
        .filter(|name| !name.is_empty())
        .map(|name| NewStudent {
            full_name: name.to_string(),
            class_name: class_name.to_string(),
            gender: None,
            nisn: None,
            email: None,
        })
        .collect();

    if students.is_empty() {
        return Err(ImportError::new(
            "no_valid_rows",
            "tidak ada nama siswa yang valid di dalam file",
        ));
    }
    Ok(students)
}

fn missing_headers_error(missing: &[&str]) -> ImportError {
    ImportError::new(
        "missing_headers",
        format!("kolom wajib tidak ditemukan: {}", missing.join(", ")),
    )
}

fn column_index(header: &[String], name: &str) -> usize {
    // Caller has already verified presence.
    header
        .iter()
        .position(|cell| cell == name)
        .unwrap_or_default()
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|c| c.trim()).unwrap_or("")
}

fn normalize_row(
    row: &[String],
    name_idx: usize,
    grade_idx: usize,
    gender_idx: usize,
    nisn_idx: Option<usize>,
) -> Option<NewStudent> {
    let full_name = cell(row, name_idx);
    if full_name.is_empty() {
        return None;
    }

    let grade = cell(row, grade_idx).parse::<i64>().ok()?;

    let gender = cell(row, gender_idx)
        .chars()
        .next()?
        .to_ascii_uppercase();
    let section = match gender {
        'L' => 'A',
        'P' => 'B',
        _ => return None,
    };

    let nisn = nisn_idx.and_then(|idx| {
        let value = cell(row, idx);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    });

    Some(NewStudent {
        full_name: full_name.to_string(),
        class_name: format!("{}{}", grade, section),
        gender: Some(gender.to_string()),
        nisn,
        email: None,
    })
}
