//! In-memory tabular data model.
//!
//! A [`Table`] is an ordered set of named columns of typed [`Cell`]s. Row
//! order is meaningful (block segmentation depends on it). Column names are
//! preserved verbatim for output, but looked up through a normalized index
//! (whitespace stripped, lowercased) built once at construction, so
//! `" Status "` and `"status"` resolve to the same column.

pub mod loader;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::AppError;

/// A single typed cell value.
///
/// Numeric coercion never fails: a [`Cell::Text`] that does not parse as a
/// number simply coerces to `None`, which downstream comparisons treat as a
/// non-match rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Missing,
}

impl Cell {
    /// True for the missing/blank cell.
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric view of the cell. Text is parsed after trimming; anything
    /// unparseable is `None`, never an error.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Bool(_) | Cell::Missing => None,
        }
    }

    /// Case-sensitive exact text match. Non-text cells never match.
    pub fn matches_text(&self, wanted: &str) -> bool {
        matches!(self, Cell::Text(s) if s == wanted)
    }

    /// Display form of the cell, as it would appear in an exported sheet.
    /// Whole numbers render without a trailing `.0`.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::Missing => String::new(),
        }
    }

    /// Canonical grouping key, or `None` for a missing cell.
    ///
    /// Numeric-looking cells are keyed through their coerced value, so
    /// `79991`, `"79991"`, and `"79991.0"` all land in the same group.
    pub fn group_key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            other => match other.as_number() {
                Some(n) => Some(format_number(n)),
                None => Some(other.display()),
            },
        }
    }
}

/// Renders a number the way spreadsheets show it: integral values without
/// a decimal point.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Header name, preserved verbatim.
    pub name: String,
    /// Cell values, one per row.
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// Normalizes a column name for lookup: strip all whitespace, lowercase.
pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<String>().to_lowercase()
}

/// A rectangular table of named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    by_normalized: HashMap<String, usize>,
}

impl Table {
    /// Builds a table from columns, validating that they are rectangular.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, AppError> {
        if let Some(first) = columns.first() {
            let expected = first.cells.len();
            for column in &columns {
                if column.cells.len() != expected {
                    return Err(AppError::Internal(format!(
                        "Column '{}' has {} rows, expected {}",
                        column.name,
                        column.cells.len(),
                        expected
                    )));
                }
            }
        }
        Ok(Self::from_columns_unchecked(columns))
    }

    /// Builds an empty table with the given column names.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_columns_unchecked(
            names
                .into_iter()
                .map(|name| Column::new(name, Vec::new()))
                .collect(),
        )
    }

    /// Internal constructor for columns already known to be rectangular.
    fn from_columns_unchecked(columns: Vec<Column>) -> Self {
        let mut by_normalized = HashMap::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            // First occurrence wins on duplicate normalized names.
            by_normalized
                .entry(normalize_name(&column.name))
                .or_insert(index);
        }
        Self {
            columns,
            by_normalized,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.cells.len())
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Resolves a column by name, ignoring whitespace and case.
    ///
    /// The error lists the available verbatim names to aid diagnosis.
    pub fn find_column(&self, wanted: &str) -> Result<usize, AppError> {
        self.by_normalized
            .get(&normalize_name(wanted))
            .copied()
            .ok_or_else(|| AppError::ColumnNotFound {
                wanted: wanted.to_string(),
                available: self.column_names(),
            })
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        &self.columns[column].cells[row]
    }

    /// Clones one row as a cell vector, in column order.
    pub fn row(&self, row: usize) -> Vec<Cell> {
        self.columns.iter().map(|c| c.cells[row].clone()).collect()
    }

    /// Appends a row. The row length must match the column count.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), AppError> {
        if row.len() != self.columns.len() {
            return Err(AppError::Internal(format!(
                "Row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        for (column, cell) in self.columns.iter_mut().zip(row) {
            column.cells.push(cell);
        }
        Ok(())
    }

    /// New table keeping only the rows for which the predicate holds,
    /// preserving order and all columns.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize) -> bool,
    {
        let kept: Vec<usize> = (0..self.n_rows()).filter(|&r| keep(r)).collect();
        self.take_rows(&kept)
    }

    /// New table containing exactly the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                cells: rows.iter().map(|&r| column.cells[r].clone()).collect(),
            })
            .collect();
        Self::from_columns_unchecked(columns)
    }

    /// New table with only the named columns, in the given order.
    pub fn select_columns(&self, names: &[&str]) -> Result<Table, AppError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let index = self.find_column(name)?;
            columns.push(self.columns[index].clone());
        }
        Ok(Self::from_columns_unchecked(columns))
    }

    /// Consumes the table, renaming columns whose verbatim name appears in
    /// the mapping. Unmatched entries are ignored.
    pub fn rename_columns(mut self, renames: &[(&str, &str)]) -> Table {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| *from == column.name) {
                column.name = (*to).to_string();
            }
        }
        Self::from_columns_unchecked(self.columns)
    }

    /// Appends a column. Must match the current row count (or define it for
    /// a table that has no columns yet).
    pub fn push_column(&mut self, column: Column) -> Result<(), AppError> {
        if !self.columns.is_empty() && column.cells.len() != self.n_rows() {
            return Err(AppError::Internal(format!(
                "Column '{}' has {} rows, table has {}",
                column.name,
                column.cells.len(),
                self.n_rows()
            )));
        }
        self.by_normalized
            .entry(normalize_name(&column.name))
            .or_insert(self.columns.len());
        self.columns.push(column);
        Ok(())
    }
}
