//! Per-game payments report.
//!
//! Filters a detailed payment export down to active rows matching a selected
//! payment method and an inclusive date range, then totals the price per
//! identifier with a ticket count and a first-seen display name.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::aggregate;
use crate::config::ReportColumns;
use crate::error::AppError;
use crate::export;
use crate::table::{Cell, Table};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Sheet name of the exported workbook.
pub const SHEET_NAME: &str = "Filtered_Data";

/// Status value a payment row must carry to be counted.
const ACTIVE: &str = "Active";

/// Date layouts accepted in the date column, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Filter selection for a payments report run.
#[derive(Debug, Clone)]
pub struct PaymentsFilter {
    /// Exact payment-method value to keep.
    pub payment_method: String,
    /// Inclusive lower date bound; `None` leaves the lower end open.
    pub start: Option<NaiveDate>,
    /// Inclusive upper date bound; `None` leaves the upper end open.
    pub end: Option<NaiveDate>,
}

/// Aggregated payments plus the grand total of the summed price column.
#[derive(Debug, Clone)]
pub struct PaymentsReport {
    /// One row per identifier: display name, identifier, summed price,
    /// ticket count.
    pub table: Table,
    pub total: f64,
}

impl PaymentsReport {
    /// Renders the report as a single-sheet workbook.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, AppError> {
        export::to_xlsx_bytes(&[(SHEET_NAME.to_string(), self.table.clone())])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Distinct payment-method values in first-seen order, for filter selection.
pub fn payment_methods(table: &Table, columns: &ReportColumns) -> Result<Vec<String>, AppError> {
    let method = table.find_column(&columns.payment_method)?;
    let mut seen = Vec::new();
    for row in 0..table.n_rows() {
        let cell = table.cell(row, method);
        if cell.is_missing() {
            continue;
        }
        let value = cell.display();
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    Ok(seen)
}

/// Earliest and latest parseable dates in the date column, for presetting the
/// filter range. `None` when no row carries a parseable date.
pub fn date_range(
    table: &Table,
    columns: &ReportColumns,
) -> Result<Option<(NaiveDate, NaiveDate)>, AppError> {
    let date = table.find_column(&columns.date)?;
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for row in 0..table.n_rows() {
        if let Some(d) = parse_date(table.cell(row, date)) {
            range = Some(match range {
                None => (d, d),
                Some((min, max)) => (min.min(d), max.max(d)),
            });
        }
    }
    Ok(range)
}

/// Builds the payments report: keeps active rows matching the filter, sums
/// the price per identifier and attaches the first-seen display name.
///
/// When a date bound is set, rows whose date does not parse are excluded.
pub fn build(
    table: &Table,
    columns: &ReportColumns,
    filter: &PaymentsFilter,
) -> Result<PaymentsReport, AppError> {
    let status = table.find_column(&columns.status)?;
    let method = table.find_column(&columns.payment_method)?;
    let date = table.find_column(&columns.date)?;

    let filtered = table.filter_rows(|row| {
        if !table.cell(row, status).matches_text(ACTIVE) {
            return false;
        }
        if !table.cell(row, method).matches_text(&filter.payment_method) {
            return false;
        }
        if filter.start.is_none() && filter.end.is_none() {
            return true;
        }
        let Some(d) = parse_date(table.cell(row, date)) else {
            return false;
        };
        filter.start.map_or(true, |start| d >= start) && filter.end.map_or(true, |end| d <= end)
    });

    info!(
        "[PAYMENTS] {} of {} row(s) match '{}'",
        filtered.n_rows(),
        table.n_rows(),
        filter.payment_method
    );

    let aggregated = aggregate::sum_by_identifier(
        &filtered,
        &columns.identifier,
        &columns.price,
        &columns.fan_company,
    )?;

    let price = aggregated.find_column(&columns.price)?;
    let total = (0..aggregated.n_rows())
        .filter_map(|row| aggregated.cell(row, price).as_number())
        .sum();

    Ok(PaymentsReport {
        table: aggregated,
        total,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerant date parsing over the layouts the export has been seen to use.
fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    let Cell::Text(raw) = cell else {
        return None;
    };
    let raw = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            return Some(d);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
