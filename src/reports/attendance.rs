//! Community attendance report.
//!
//! Reshapes a game authorization export into three tables:
//!
//! 1. a per-reservation summary (tickets drawn vs. people who attended),
//! 2. the attendees, enriched from the directory,
//! 3. the non-attendees who consented to marketing, enriched the same way.
//!
//! Output headers carry the Hebrew display labels the report is read with.

use tracing::info;

use crate::aggregate::{self, COUNT_COLUMN, MATCHED_COLUMN};
use crate::config::ReportColumns;
use crate::directory::DirectoryLookup;
use crate::enrich::{
    self, AGE_COLUMN, CONSENT_COLUMN, EMAIL_COLUMN, EnrichOptions, PHONE_COLUMN,
};
use crate::error::{AppError, Warning};
use crate::export;
use crate::table::{Cell, Column, Table};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Attendance value that counts as "showed up".
const ATTENDED: &str = "Yes";

/// Attendance values (trimmed, lowercased) that count as "did not show up".
const NOT_ATTENDED: [&str; 2] = ["no", "false"];

/// Name of the derived full-name column before relabeling.
const FULL_NAME_COLUMN: &str = "Full Name";

/// Hebrew display labels.
const LABEL_RESERVATION: &str = "שם העמותה";
const LABEL_TICKETS_DRAWN: &str = "כמות כרטיסים שנמשכו";
const LABEL_ATTENDED: &str = "כמות אנשים שהגיעו מכל עמותה";
const LABEL_FULL_NAME: &str = "שם מלא";
const LABEL_CONSENT: &str = "אישור דיוור";
const LABEL_PHONE: &str = "טלפון נייד";
const LABEL_EMAIL: &str = "כתובת אימייל";
const LABEL_AGE: &str = "גיל";

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// The three tables of the attendance report plus lookup warnings.
#[derive(Debug, Clone)]
pub struct AttendanceReport {
    /// Per-reservation summary: tickets drawn and attendance counts.
    pub summary: Table,
    /// Enriched list of people who attended.
    pub attendees: Table,
    /// Enriched list of consenting people who drew a ticket but did not attend.
    pub non_attendees: Table,
    pub warnings: Vec<Warning>,
}

impl AttendanceReport {
    /// Renders the report as a three-sheet workbook.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, AppError> {
        export::to_xlsx_bytes(&[
            ("Summary".to_string(), self.summary.clone()),
            ("Attendees".to_string(), self.attendees.clone()),
            ("Non-attendees".to_string(), self.non_attendees.clone()),
        ])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the attendance report from a loaded authorization export.
///
/// Rows without a reservation name are dropped up front; missing identifiers
/// are filled with 0, which the joiner in turn never queries. The attendee
/// list keeps everyone with a known consent flag; the non-attendee list keeps
/// only those who consented.
pub async fn build(
    table: &Table,
    columns: &ReportColumns,
    directory: &dyn DirectoryLookup,
    reference_year: i32,
) -> Result<AttendanceReport, AppError> {
    let working = prepare(table, columns)?;
    info!(
        "[ATTENDANCE] {} of {} row(s) carry a reservation name",
        working.n_rows(),
        table.n_rows()
    );

    let summary = aggregate::count_by_group(
        &working,
        &columns.reservation,
        &columns.attendance,
        ATTENDED,
    )?
    .rename_columns(&[
        (columns.reservation.as_str(), LABEL_RESERVATION),
        (COUNT_COLUMN, LABEL_TICKETS_DRAWN),
        (MATCHED_COLUMN, LABEL_ATTENDED),
    ]);

    let attendance = working.find_column(&columns.attendance)?;
    let attendees_raw = working.filter_rows(|row| working.cell(row, attendance).matches_text(ATTENDED));
    let non_attendees_raw = working.filter_rows(|row| match working.cell(row, attendance) {
        Cell::Text(s) => NOT_ATTENDED.contains(&s.trim().to_lowercase().as_str()),
        _ => false,
    });

    let mut options = EnrichOptions::new(reference_year);
    options.relabel = display_relabel(columns);

    let attendees = enrich::cross_reference(&attendees_raw, &columns.identifier, directory, &options)
        .await?;

    options.require_consent = true;
    let non_attendees =
        enrich::cross_reference(&non_attendees_raw, &columns.identifier, directory, &options)
            .await?;

    let keep = [
        LABEL_FULL_NAME,
        columns.identifier.as_str(),
        LABEL_RESERVATION,
        LABEL_CONSENT,
        LABEL_PHONE,
        LABEL_EMAIL,
        LABEL_AGE,
    ];
    let mut warnings = attendees.warnings;
    warnings.extend(non_attendees.warnings);

    Ok(AttendanceReport {
        summary,
        attendees: attendees.table.select_columns(&keep)?,
        non_attendees: non_attendees.table.select_columns(&keep)?,
        warnings,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Narrows the export to the report's working columns: derived full name,
/// zero-filled identifier, reservation name, attendance. Rows without a
/// reservation name are dropped.
fn prepare(table: &Table, columns: &ReportColumns) -> Result<Table, AppError> {
    let first = table.find_column(&columns.first_name)?;
    let last = table.find_column(&columns.last_name)?;
    let id = table.find_column(&columns.identifier)?;
    let reservation = table.find_column(&columns.reservation)?;
    let attendance = table.find_column(&columns.attendance)?;

    let mut names = Vec::new();
    let mut ids = Vec::new();
    let mut reservations = Vec::new();
    let mut attendances = Vec::new();

    for row in 0..table.n_rows() {
        if table.cell(row, reservation).is_missing() {
            continue;
        }
        names.push(Cell::Text(full_name(
            table.cell(row, first),
            table.cell(row, last),
        )));
        ids.push(match table.cell(row, id).as_number() {
            Some(v) => Cell::Number(v),
            None => Cell::Number(0.0),
        });
        reservations.push(table.cell(row, reservation).clone());
        attendances.push(table.cell(row, attendance).clone());
    }

    Table::from_columns(vec![
        Column::new(FULL_NAME_COLUMN, names),
        Column::new(columns.identifier.clone(), ids),
        Column::new(columns.reservation.clone(), reservations),
        Column::new(columns.attendance.clone(), attendances),
    ])
}

fn full_name(first: &Cell, last: &Cell) -> String {
    let first = first.display();
    let last = last.display();
    if first.is_empty() {
        last
    } else if last.is_empty() {
        first
    } else {
        format!("{} {}", first, last)
    }
}

fn display_relabel(columns: &ReportColumns) -> Vec<(String, String)> {
    vec![
        (FULL_NAME_COLUMN.to_string(), LABEL_FULL_NAME.to_string()),
        (columns.reservation.clone(), LABEL_RESERVATION.to_string()),
        (CONSENT_COLUMN.to_string(), LABEL_CONSENT.to_string()),
        (PHONE_COLUMN.to_string(), LABEL_PHONE.to_string()),
        (EMAIL_COLUMN.to_string(), LABEL_EMAIL.to_string()),
        (AGE_COLUMN.to_string(), LABEL_AGE.to_string()),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
