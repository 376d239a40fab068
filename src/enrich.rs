//! Cross-referencing local rows against the directory.
//!
//! For every distinct identifier in a table, asks the [`DirectoryLookup`]
//! capability for contact records and inner-joins the results back onto the
//! local rows. Lookups may fan out (several records per identifier → one
//! output row each) and may partially fail: a failed identifier becomes a
//! [`Warning`] and the batch continues.
//!
//! Output order is deterministic regardless of lookup completion order:
//! identifiers ascending, local rows in original order within an identifier,
//! directory records in returned order within a row.

use std::collections::HashMap;

use futures_util::{stream, StreamExt};
use tracing::info;

use crate::directory::DirectoryLookup;
use crate::error::{AppError, Warning};
use crate::table::{Cell, Table};

/// Names of the columns the joiner appends, before any relabeling.
pub const CONTACT_NAME_COLUMN: &str = "Contact Name";
pub const ACCOUNT_NAME_COLUMN: &str = "Account Name";
pub const CONSENT_COLUMN: &str = "Marketing Allowed";
pub const PHONE_COLUMN: &str = "Phone";
pub const EMAIL_COLUMN: &str = "Email";
pub const AGE_COLUMN: &str = "Age";

/// Placeholder for a contact without an owning account.
const NO_ACCOUNT: &str = "N/A";

/// Default number of in-flight lookups.
const DEFAULT_CONCURRENCY: usize = 4;

/// Options for a cross-reference run.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Year the age derivation subtracts the birth year from.
    pub reference_year: i32,
    /// Keep only records whose consent flag is `true`. Records with a
    /// *missing* consent flag are dropped either way.
    pub require_consent: bool,
    /// Bound on concurrent directory lookups.
    pub concurrency: usize,
    /// Display-label renaming, applied exactly once after all merges and
    /// derivations.
    pub relabel: Vec<(String, String)>,
}

impl EnrichOptions {
    pub fn new(reference_year: i32) -> Self {
        Self {
            reference_year,
            require_consent: false,
            concurrency: DEFAULT_CONCURRENCY,
            relabel: Vec::new(),
        }
    }
}

/// An enriched table plus per-identifier lookup warnings.
#[derive(Debug, Clone)]
pub struct EnrichOutcome {
    pub table: Table,
    pub warnings: Vec<Warning>,
}

/// Inner-joins `table` with the directory on `id_column`.
///
/// Identifier `0` is the loader's "no identifier" sentinel: it is never
/// queried and never appears in the output. Rows whose identifier has no
/// directory match are dropped silently. Fatal errors abort the run;
/// per-identifier lookup failures are accumulated as warnings.
pub async fn cross_reference(
    table: &Table,
    id_column: &str,
    directory: &dyn DirectoryLookup,
    options: &EnrichOptions,
) -> Result<EnrichOutcome, AppError> {
    let id = table.find_column(id_column)?;

    // Distinct identifiers, ascending, with their local rows in row order.
    let mut rows_by_id: HashMap<i64, Vec<usize>> = HashMap::new();
    for row in 0..table.n_rows() {
        let Some(value) = table.cell(row, id).as_number() else {
            continue;
        };
        let identifier = value as i64;
        if identifier == 0 {
            continue;
        }
        rows_by_id.entry(identifier).or_default().push(row);
    }
    let mut identifiers: Vec<i64> = rows_by_id.keys().copied().collect();
    identifiers.sort_unstable();

    info!(
        "[ENRICH] Looking up {} distinct identifier(s)",
        identifiers.len()
    );

    // Bounded concurrency; `buffered` yields in input order, so results come
    // back sorted by identifier no matter which lookup finishes first.
    let concurrency = options.concurrency.max(1);
    let lookups: Vec<(i64, Result<_, AppError>)> = stream::iter(identifiers)
        .map(|identifier| async move { (identifier, directory.lookup(identifier).await) })
        .buffered(concurrency)
        .collect()
        .await;

    let mut names: Vec<String> = table.column_names();
    names.extend(
        [
            CONTACT_NAME_COLUMN,
            ACCOUNT_NAME_COLUMN,
            CONSENT_COLUMN,
            PHONE_COLUMN,
            EMAIL_COLUMN,
            AGE_COLUMN,
        ]
        .map(String::from),
    );
    let mut output = Table::with_names(names);
    let mut warnings = Vec::new();

    for (identifier, result) in lookups {
        let records = match result {
            Ok(records) => records,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warnings.push(Warning::from_lookup_error(identifier, &err));
                continue;
            }
        };

        for &row in &rows_by_id[&identifier] {
            for record in &records {
                if record.consent.is_none() {
                    continue;
                }
                if options.require_consent && record.consent != Some(true) {
                    continue;
                }

                let age = record
                    .birthdate
                    .map_or(0, |d| options.reference_year - chrono::Datelike::year(&d));

                let mut cells = table.row(row);
                cells.push(Cell::Text(record.name.clone()));
                cells.push(Cell::Text(
                    record
                        .account
                        .clone()
                        .unwrap_or_else(|| NO_ACCOUNT.to_string()),
                ));
                cells.push(Cell::Bool(record.consent == Some(true)));
                cells.push(record.phone.clone().map_or(Cell::Missing, Cell::Text));
                cells.push(record.email.clone().map_or(Cell::Missing, Cell::Text));
                cells.push(Cell::Number(age as f64));
                output.push_row(cells)?;
            }
        }
    }

    if !warnings.is_empty() {
        info!(
            "[ENRICH] {} identifier(s) skipped after lookup failures",
            warnings.len()
        );
    }

    let relabel: Vec<(&str, &str)> = options
        .relabel
        .iter()
        .map(|(from, to)| (from.as_str(), to.as_str()))
        .collect();
    Ok(EnrichOutcome {
        table: output.rename_columns(&relabel),
        warnings,
    })
}
