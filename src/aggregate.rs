//! Group-wise reductions over a table.
//!
//! Two shapes cover the reports: a per-group row count paired with a
//! sentinel-matched count ([`count_by_group`], e.g. tickets drawn vs people
//! who attended), and a per-identifier sum/count with a display name
//! attached ([`sum_by_identifier`], e.g. payments per fan). Group order is
//! first-seen, which makes output deterministic for a given input.

use std::collections::HashMap;

use crate::error::AppError;
use crate::table::{Cell, Column, Table};

/// Output column name for the per-group row count.
pub const COUNT_COLUMN: &str = "Count";

/// Output column name for the per-group sentinel-matched count.
pub const MATCHED_COLUMN: &str = "Matched";

/// Output column name for the per-identifier row count.
pub const TICKETS_COLUMN: &str = "Total Tickets";

/// Per distinct value of `group_column`, counts all rows and the rows whose
/// `value_column` exactly equals `sentinel` (case-sensitive).
///
/// Rows with a missing group key are dropped before grouping. Groups with no
/// sentinel match report a matched count of 0, never a missing value; all
/// counts are whole numbers. An input with no groupable rows produces an
/// empty result, not an error.
///
/// Output columns: the group column (verbatim name), [`COUNT_COLUMN`],
/// [`MATCHED_COLUMN`].
pub fn count_by_group(
    table: &Table,
    group_column: &str,
    value_column: &str,
    sentinel: &str,
) -> Result<Table, AppError> {
    let group = table.find_column(group_column)?;
    let value = table.find_column(value_column)?;

    // First-seen group order; counts accumulated in one pass, which gives
    // the zero-fill of a left join for free.
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (u64, u64)> = HashMap::new();

    for row in 0..table.n_rows() {
        let Some(key) = table.cell(row, group).group_key() else {
            continue;
        };
        let entry = totals.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (0, 0)
        });
        entry.0 += 1;
        if table.cell(row, value).matches_text(sentinel) {
            entry.1 += 1;
        }
    }

    let mut keys = Vec::with_capacity(order.len());
    let mut counts = Vec::with_capacity(order.len());
    let mut matched = Vec::with_capacity(order.len());
    for key in order {
        let (count, hit) = totals[&key];
        keys.push(Cell::Text(key));
        counts.push(Cell::Number(count as f64));
        matched.push(Cell::Number(hit as f64));
    }

    Table::from_columns(vec![
        Column::new(table.column(group).name.clone(), keys),
        Column::new(COUNT_COLUMN, counts),
        Column::new(MATCHED_COLUMN, matched),
    ])
}

/// Per distinct identifier, sums the numeric value column and counts rows,
/// then attaches the first-seen display name for that identifier.
///
/// Missing or unparseable values contribute 0 to the sum but still count as
/// a row. Missing identifiers form their own single group. The name join is
/// one-to-one by construction: only the first name seen per identifier is
/// kept.
///
/// Output columns: the name column, the identifier column, the value column
/// (now holding sums), [`TICKETS_COLUMN`].
pub fn sum_by_identifier(
    table: &Table,
    id_column: &str,
    value_column: &str,
    name_column: &str,
) -> Result<Table, AppError> {
    let id = table.find_column(id_column)?;
    let value = table.find_column(value_column)?;
    let name = table.find_column(name_column)?;

    struct Group {
        id_cell: Cell,
        name_cell: Cell,
        sum: f64,
        count: u64,
    }

    // Keyed by display form; `None` gathers the missing-identifier rows.
    let mut order: Vec<Option<String>> = Vec::new();
    let mut groups: HashMap<Option<String>, Group> = HashMap::new();

    for row in 0..table.n_rows() {
        let key = table.cell(row, id).group_key();
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Group {
                id_cell: table.cell(row, id).clone(),
                name_cell: table.cell(row, name).clone(),
                sum: 0.0,
                count: 0,
            }
        });
        entry.sum += table.cell(row, value).as_number().unwrap_or(0.0);
        entry.count += 1;
    }

    let mut names = Vec::with_capacity(order.len());
    let mut ids = Vec::with_capacity(order.len());
    let mut sums = Vec::with_capacity(order.len());
    let mut counts = Vec::with_capacity(order.len());
    for key in order {
        let group = &groups[&key];
        names.push(group.name_cell.clone());
        ids.push(group.id_cell.clone());
        sums.push(Cell::Number(group.sum));
        counts.push(Cell::Number(group.count as f64));
    }

    Table::from_columns(vec![
        Column::new(table.column(name).name.clone(), names),
        Column::new(table.column(id).name.clone(), ids),
        Column::new(table.column(value).name.clone(), sums),
        Column::new(TICKETS_COLUMN, counts),
    ])
}
