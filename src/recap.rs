use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Canonical attendance status set. Wire values match the backend enum the
/// shells already speak; `Alfa` is accepted on parse as the older spelling
/// of `Alpa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Sick,
    Excused,
    Absent,
    Sleeping,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 5] = [
        AttendanceStatus::Present,
        AttendanceStatus::Sick,
        AttendanceStatus::Excused,
        AttendanceStatus::Absent,
        AttendanceStatus::Sleeping,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Hadir",
            AttendanceStatus::Sick => "Sakit",
            AttendanceStatus::Excused => "Izin",
            AttendanceStatus::Absent => "Alpa",
            AttendanceStatus::Sleeping => "Tidur",
        }
    }

    pub fn parse(raw: &str) -> Option<AttendanceStatus> {
        match raw.trim() {
            "Hadir" => Some(AttendanceStatus::Present),
            "Sakit" => Some(AttendanceStatus::Sick),
            "Izin" => Some(AttendanceStatus::Excused),
            "Alpa" | "Alfa" => Some(AttendanceStatus::Absent),
            "Tidur" => Some(AttendanceStatus::Sleeping),
            _ => None,
        }
    }
}

/// Closed calendar interval; both endpoints are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Expands a `YYYY-MM` key into the full calendar month.
pub fn month_interval(key: &str) -> Option<DateInterval> {
    let t = key.trim();
    let (y, m) = t.split_once('-')?;
    let year = y.parse::<i32>().ok()?;
    let month = m.parse::<u32>().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(DateInterval {
        start,
        end: first_of_next.pred_opt()?,
    })
}

/// The Monday-through-Sunday week containing `day`.
pub fn week_interval(day: NaiveDate) -> DateInterval {
    let offset = day.weekday().num_days_from_monday() as i64;
    let start = day - Duration::days(offset);
    DateInterval {
        start,
        end: start + Duration::days(6),
    }
}

#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub id: String,
    pub full_name: String,
    pub class_name: String,
}

#[derive(Debug, Clone)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub date: NaiveDate,
    pub lesson_hour: i64,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub present: i64,
    pub sick: i64,
    pub excused: i64,
    pub absent: i64,
    pub sleeping: i64,
}

impl StatusCounts {
    pub fn bump(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Sick => self.sick += 1,
            AttendanceStatus::Excused => self.excused += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Sleeping => self.sleeping += 1,
        }
    }

    pub fn total(&self) -> i64 {
        self.present + self.sick + self.excused + self.absent + self.sleeping
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecapRow {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub present: i64,
    pub sick: i64,
    pub excused: i64,
    pub absent: i64,
    pub sleeping: i64,
    pub total_hours: i64,
    pub presence_percentage: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub present: i64,
    pub sick: i64,
    pub excused: i64,
    pub absent: i64,
    pub sleeping: i64,
    pub total_hours: i64,
    pub presence_percentage: i64,
}

/// Rounded integer percentage of present hours. `empty_default` applies when
/// there is nothing to divide by: 0 for the class-wide recap, 100 for an
/// individual's empty history. The two contexts intentionally disagree.
pub fn presence_percentage(present: i64, total: i64, empty_default: i64) -> i64 {
    if total > 0 {
        ((present as f64 / total as f64) * 100.0).round() as i64
    } else {
        empty_default
    }
}

/// One recap row per student passing the class filter. Students with no
/// records inside the interval get an all-zero row; students outside the
/// filter are excluded entirely. Row order follows the student list.
pub fn class_recap(
    students: &[RosterEntry],
    records: &[AttendanceEntry],
    interval: DateInterval,
    class_filter: Option<&str>,
) -> Vec<RecapRow> {
    let mut by_student: HashMap<&str, StatusCounts> = HashMap::new();
    for record in records.iter().filter(|r| interval.contains(r.date)) {
        by_student
            .entry(record.student_id.as_str())
            .or_default()
            .bump(record.status);
    }

    students
        .iter()
        .filter(|s| class_filter.map_or(true, |c| s.class_name == c))
        .map(|s| {
            let counts = by_student
                .get(s.id.as_str())
                .copied()
                .unwrap_or_default();
            let total = counts.total();
            RecapRow {
                student_id: s.id.clone(),
                student_name: s.full_name.clone(),
                class_name: s.class_name.clone(),
                present: counts.present,
                sick: counts.sick,
                excused: counts.excused,
                absent: counts.absent,
                sleeping: counts.sleeping,
                total_hours: total,
                presence_percentage: presence_percentage(counts.present, total, 0),
            }
        })
        .collect()
}

/// Stats over one student's already-scoped history. An optional interval
/// narrows the records; an empty result reads as fully present (100).
pub fn student_recap(records: &[AttendanceEntry], interval: Option<DateInterval>) -> StudentStats {
    let mut counts = StatusCounts::default();
    for record in records {
        if interval.map_or(true, |iv| iv.contains(record.date)) {
            counts.bump(record.status);
        }
    }
    let total = counts.total();
    StudentStats {
        present: counts.present,
        sick: counts.sick,
        excused: counts.excused,
        absent: counts.absent,
        sleeping: counts.sleeping,
        total_hours: total,
        presence_percentage: presence_percentage(counts.present, total, 100),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PresenceTier {
    Good,
    Fair,
    NeedsAttention,
}

impl PresenceTier {
    pub fn label(self) -> &'static str {
        match self {
            PresenceTier::Good => "Baik",
            PresenceTier::Fair => "Cukup",
            PresenceTier::NeedsAttention => "Perlu Perhatian",
        }
    }
}

/// Thresholds evaluated highest-first; both boundaries are inclusive.
pub fn classify_presence(percentage: i64) -> PresenceTier {
    if percentage >= 90 {
        PresenceTier::Good
    } else if percentage >= 75 {
        PresenceTier::Fair
    } else {
        PresenceTier::NeedsAttention
    }
}
