//! CSV ingestion: bytes in, [`Table`] out.
//!
//! Tolerates a UTF-8 byte-order mark and sniffs the delimiter when none is
//! given (ticketing systems export comma-, semicolon-, or tab-separated
//! files depending on locale). Structural problems — undecodable bytes,
//! rows with the wrong field count — are fatal; cell typing never fails.

use csv::ReaderBuilder;

use crate::error::AppError;
use crate::table::{Cell, Column, Table};

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Number of non-blank lines sampled for delimiter sniffing.
const SNIFF_LINES: usize = 16;

/// Delimiters tried by the sniffer, in tie-break preference order.
const CANDIDATE_DELIMITERS: &[u8] = &[b',', b';', b'\t'];

/// Options controlling how raw bytes are parsed into a table.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter. `None` enables sniffing.
    pub delimiter: Option<u8>,
    /// Whether the first row carries column names. When `false`, names
    /// `column_1..column_n` are synthesized and every row is data.
    pub has_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
        }
    }
}

/// Parses CSV bytes into a [`Table`].
///
/// # Errors
///
/// - [`AppError::NotUtf8`] when the bytes cannot be decoded.
/// - [`AppError::CsvInvalid`] when the input is empty (with a header
///   expected) or a row's field count disagrees with the header.
pub fn load(bytes: &[u8], options: &LoadOptions) -> Result<Table, AppError> {
    let data = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(data).map_err(|_| AppError::NotUtf8)?;

    let delimiter = match options.delimiter {
        Some(d) => d,
        None => sniff_delimiter(text),
    };

    // Headers are handled manually so the headerless mode shares one path.
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records = reader.records();

    let first = match records.next() {
        Some(record) => record.map_err(|e| AppError::CsvInvalid(e.to_string()))?,
        None => {
            if options.has_header {
                return Err(AppError::CsvInvalid("input contains no rows".into()));
            }
            return Ok(Table::with_names(Vec::<String>::new()));
        }
    };

    let (names, mut cells_by_column): (Vec<String>, Vec<Vec<Cell>>) = if options.has_header {
        (
            first.iter().map(String::from).collect(),
            vec![Vec::new(); first.len()],
        )
    } else {
        let names = (1..=first.len()).map(|i| format!("column_{}", i)).collect();
        let mut columns = vec![Vec::new(); first.len()];
        for (i, field) in first.iter().enumerate() {
            columns[i].push(parse_cell(field));
        }
        (names, columns)
    };

    for record in records {
        let record = record.map_err(|e| AppError::CsvInvalid(e.to_string()))?;
        for (i, field) in record.iter().enumerate() {
            cells_by_column[i].push(parse_cell(field));
        }
    }

    Table::from_columns(
        names
            .into_iter()
            .zip(cells_by_column)
            .map(|(name, cells)| Column::new(name, cells))
            .collect(),
    )
}

/// Types a raw field: empty → missing, numeric after trim → number,
/// anything else → text verbatim.
fn parse_cell(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::Missing;
    }
    match field.trim().parse::<f64>() {
        Ok(n) => Cell::Number(n),
        Err(_) => Cell::Text(field.to_string()),
    }
}

/// Picks the delimiter whose quote-aware per-line count is most consistently
/// high across the sampled lines. Falls back to a comma.
fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = b',';
    let mut best_score = 0usize;
    for &candidate in CANDIDATE_DELIMITERS {
        let score = sample
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .min()
            .unwrap_or(0);
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }
    best
}

/// Counts occurrences of `delimiter` outside double-quoted sections.
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b if b == delimiter && !in_quotes => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─────────────────────────────────────────────────────────────────────────
    // Decoding
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn strips_bom_before_header() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(UTF8_BOM);
        bytes.extend_from_slice(b"Name,Value\nAlice,100\n");

        let table = load(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["Name".to_string(), "Value".to_string()]
        );
        assert_eq!(table.n_rows(), 1);
    }

    #[test]
    fn non_utf8_is_a_parse_error() {
        let err = load(b"Name,Value\n\xff\xfe,1\n", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::NotUtf8));
    }

    #[test]
    fn inconsistent_row_width_is_a_parse_error() {
        let err = load(
            b"Name,Value\nAlice,100\nBob,200,extra\n",
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::CsvInvalid(_)), "got {:?}", err);
    }

    #[test]
    fn empty_input_with_header_is_an_error() {
        let err = load(b"", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::CsvInvalid(_)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cell typing
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn cells_are_typed_number_text_missing() {
        let table = load(
            b"Id,Name,Score\n1,Alice,95.5\n2,,\n",
            &LoadOptions::default(),
        )
        .unwrap();

        assert_eq!(table.cell(0, 0), &Cell::Number(1.0));
        assert_eq!(table.cell(0, 1), &Cell::Text("Alice".into()));
        assert_eq!(table.cell(0, 2), &Cell::Number(95.5));
        assert_eq!(table.cell(1, 1), &Cell::Missing);
        assert_eq!(table.cell(1, 2), &Cell::Missing);
    }

    #[test]
    fn quoted_fields_with_embedded_delimiters_survive() {
        let table = load(
            b"Name,Note\n\"Doe, John\",\"multi\nline\"\n",
            &LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.cell(0, 0), &Cell::Text("Doe, John".into()));
        assert_eq!(table.cell(0, 1), &Cell::Text("multi\nline".into()));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Headerless mode
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn headerless_load_synthesizes_names_and_keeps_first_row() {
        let options = LoadOptions {
            delimiter: Some(b','),
            has_header: false,
        };
        let table = load(b"1,Alice\n2,Bob\n", &options).unwrap();

        assert_eq!(
            table.column_names(),
            vec!["column_1".to_string(), "column_2".to_string()]
        );
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.cell(0, 1), &Cell::Text("Alice".into()));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delimiter sniffing
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn sniffs_semicolon_and_tab() {
        let semi = load(b"Name;Value\nAlice;100\nBob;200\n", &LoadOptions::default()).unwrap();
        assert_eq!(semi.n_cols(), 2);
        assert_eq!(semi.cell(1, 1), &Cell::Number(200.0));

        let tab = load(b"Name\tValue\nAlice\t100\n", &LoadOptions::default()).unwrap();
        assert_eq!(tab.n_cols(), 2);
    }

    #[test]
    fn sniffer_ignores_delimiters_inside_quotes() {
        // Semicolons only appear inside quoted text; commas are structural.
        let table = load(
            b"Name,Note\nAlice,\"a;b;c;d\"\nBob,\"e;f;g;h\"\n",
            &LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(table.n_cols(), 2);
    }

    #[test]
    fn explicit_delimiter_overrides_sniffing() {
        let options = LoadOptions {
            delimiter: Some(b';'),
            has_header: true,
        };
        let table = load(b"a;b,c\n1;2,3\n", &options).unwrap();
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.cell(0, 1), &Cell::Text("2,3".into()));
    }
}
