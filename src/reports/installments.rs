//! Installments block-split report.
//!
//! Splits a bookkeeping export into two sheets by the external payment
//! reference: blocks opened by the target reference go to one sheet,
//! everything else to the other. Block membership follows the forward-fill
//! rule in [`segment`](crate::segment).

use tracing::info;

use crate::config::ReportColumns;
use crate::error::AppError;
use crate::export;
use crate::segment;
use crate::table::Table;

/// Reference value the bookkeeping split defaults to.
pub const DEFAULT_TARGET: f64 = 79991.0;

/// The two halves of the split, named for the sheets they export to.
#[derive(Debug, Clone)]
pub struct InstallmentsReport {
    /// Rows of blocks opened by the target reference.
    pub only: Table,
    /// Rows of all other blocks.
    pub rest: Table,
    pub target: f64,
}

impl InstallmentsReport {
    /// Renders the split as a two-sheet workbook, the "except" sheet first.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, AppError> {
        let label = target_label(self.target);
        export::to_xlsx_bytes(&[
            (format!("except_{}", label), self.rest.clone()),
            (format!("only_{}", label), self.only.clone()),
        ])
    }
}

/// Splits `table` into target and non-target blocks on the external
/// reference column.
pub fn build(
    table: &Table,
    columns: &ReportColumns,
    target: f64,
) -> Result<InstallmentsReport, AppError> {
    let split = segment::split_by_key_block(table, &columns.ext_ref, target)?;
    info!(
        "[INSTALLMENTS] {} row(s) in target block(s), {} in the rest",
        split.matching.n_rows(),
        split.other.n_rows()
    );
    Ok(InstallmentsReport {
        only: split.matching,
        rest: split.other,
        target,
    })
}

/// Whole targets render without a decimal point, so the default produces
/// "only_79991" rather than "only_79991.0".
fn target_label(target: f64) -> String {
    if target.fract() == 0.0 && target.abs() < 1e15 {
        format!("{}", target as i64)
    } else {
        format!("{}", target)
    }
}
