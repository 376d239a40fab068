//! Multi-sheet XLSX export.
//!
//! Serializes a set of named tables into a single workbook held in memory.
//! Sheet names are sanitized to Excel's rules first; if two sanitized names
//! collide the export is refused rather than silently overwriting a sheet.

use std::collections::HashSet;

use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::error::AppError;
use crate::table::{Cell, Table};

/// Excel's hard limit on sheet name length.
const MAX_SHEET_NAME_LEN: usize = 31;

/// Characters Excel forbids in sheet names.
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Fallback name when sanitization leaves nothing.
const FALLBACK_SHEET_NAME: &str = "Sheet";

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Writes each `(name, table)` pair as one worksheet and returns the workbook
/// bytes. Sheets keep the given order; each sheet gets a header row followed
/// by the table's rows, with missing cells left blank.
pub fn to_xlsx_bytes(sheets: &[(String, Table)]) -> Result<Vec<u8>, AppError> {
    if sheets.is_empty() {
        return Err(AppError::ExportEmpty);
    }

    let mut seen = HashSet::new();
    let mut workbook = Workbook::new();

    for (requested, table) in sheets {
        let name = sanitize_sheet_name(requested);
        if !seen.insert(name.clone()) {
            return Err(AppError::SheetNameCollision { name });
        }

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;

        for (col, header) in table.column_names().iter().enumerate() {
            worksheet.write_string(0, col as u16, header)?;
        }
        for row in 0..table.n_rows() {
            let xlsx_row = (row + 1) as u32;
            for col in 0..table.n_cols() {
                match table.cell(row, col) {
                    Cell::Text(s) => {
                        worksheet.write_string(xlsx_row, col as u16, s)?;
                    }
                    Cell::Number(v) => {
                        worksheet.write_number(xlsx_row, col as u16, *v)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(xlsx_row, col as u16, *b)?;
                    }
                    Cell::Missing => {}
                }
            }
        }

        info!(
            "[EXPORT] Sheet '{}': {} row(s), {} column(s)",
            name,
            table.n_rows(),
            table.n_cols()
        );
    }

    let bytes = workbook.save_to_buffer()?;
    info!("[EXPORT] Workbook ready: {} byte(s)", bytes.len());
    Ok(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Maps an arbitrary string onto a legal Excel sheet name: forbidden
/// characters become underscores, boundary apostrophes are stripped, and the
/// result is cut to 31 characters. An empty result falls back to "Sheet".
fn sanitize_sheet_name(requested: &str) -> String {
    let cleaned: String = requested
        .chars()
        .map(|c| {
            if FORBIDDEN_SHEET_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed: String = cleaned.trim_matches('\'').chars().take(MAX_SHEET_NAME_LEN).collect();
    if trimmed.is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        trimmed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
