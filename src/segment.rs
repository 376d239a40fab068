//! Block and segment partitioning of a table.
//!
//! Installment exports group rows into *blocks*: a row with a value in the
//! key column opens a block, and the blank-keyed rows beneath it belong to
//! that block until the next keyed row. [`split_by_key_block`] separates the
//! blocks whose opening value equals a target from everything else.
//!
//! Nested *segments* use the opposite rule on a secondary marker column: a
//! **missing** marker starts a new segment. The asymmetry is intentional and
//! matches the source files these reports consume; do not "fix" it.

use crate::error::AppError;
use crate::table::Table;

/// Result of a block split: rows in target blocks and all remaining rows.
#[derive(Debug, Clone)]
pub struct BlockSplit {
    /// Rows belonging to blocks whose opening key equals the target.
    pub matching: Table,
    /// Every other row that belongs to a block.
    pub other: Table,
}

/// Result of a nested segment split.
#[derive(Debug, Clone)]
pub struct SegmentSplit {
    /// Rows of segments containing the sentinel marker anywhere.
    pub tagged: Table,
    /// Rows of segments without the sentinel.
    pub untagged: Table,
}

/// Splits `table` into the blocks opened by `target` in `key_column` and the
/// rest.
///
/// Block ids are assigned by a single top-to-bottom scan: a running counter
/// incremented on every non-missing key cell. The target comparison coerces
/// the opening key numerically, so `79991` and `"79991.0"` both match a
/// target of `79991.0`; an uncoercible key is a non-match, not an error.
///
/// Rows above the first keyed row belong to no block and appear in neither
/// output. A target matching no block yields an empty `matching` table and
/// leaves `other` identical to the blocked input.
pub fn split_by_key_block(
    table: &Table,
    key_column: &str,
    target: f64,
) -> Result<BlockSplit, AppError> {
    let key = table.find_column(key_column)?;
    let n_rows = table.n_rows();

    // Running block counter; 0 means "before the first block".
    let mut block_ids = Vec::with_capacity(n_rows);
    let mut current_block = 0usize;
    for row in 0..n_rows {
        if !table.cell(row, key).is_missing() {
            current_block += 1;
        }
        block_ids.push(current_block);
    }

    // A block matches when its opening (non-missing) key coerces to the
    // target. Exact float equality is intentional: keys are reference
    // numbers, not measurements.
    let mut matching_blocks = vec![false; current_block + 1];
    for row in 0..n_rows {
        let cell = table.cell(row, key);
        if cell.is_missing() {
            continue;
        }
        if cell.as_number() == Some(target) {
            matching_blocks[block_ids[row]] = true;
        }
    }

    let mut matching_rows = Vec::new();
    let mut other_rows = Vec::new();
    for row in 0..n_rows {
        let block = block_ids[row];
        if block == 0 {
            continue;
        }
        if matching_blocks[block] {
            matching_rows.push(row);
        } else {
            other_rows.push(row);
        }
    }

    Ok(BlockSplit {
        matching: table.take_rows(&matching_rows),
        other: table.take_rows(&other_rows),
    })
}

/// Partitions `table` into blank-delimited segments of `marker_column` and
/// splits them by whether any row's marker numerically equals `sentinel`.
///
/// Unlike blocks, a segment boundary is a **missing** marker: every blank
/// row starts a new segment, and rows up to (but excluding) the next blank
/// belong to it. Whole segments move together; the row holding the sentinel
/// drags its entire segment into `tagged`.
pub fn split_segments(
    table: &Table,
    marker_column: &str,
    sentinel: f64,
) -> Result<SegmentSplit, AppError> {
    let marker = table.find_column(marker_column)?;
    let n_rows = table.n_rows();

    let mut segment_ids = Vec::with_capacity(n_rows);
    let mut current_segment = 0usize;
    for row in 0..n_rows {
        if table.cell(row, marker).is_missing() {
            current_segment += 1;
        }
        segment_ids.push(current_segment);
    }

    let mut tagged_segments = vec![false; current_segment + 1];
    for row in 0..n_rows {
        if table.cell(row, marker).as_number() == Some(sentinel) {
            tagged_segments[segment_ids[row]] = true;
        }
    }

    let mut tagged_rows = Vec::new();
    let mut untagged_rows = Vec::new();
    for row in 0..n_rows {
        if tagged_segments[segment_ids[row]] {
            tagged_rows.push(row);
        } else {
            untagged_rows.push(row);
        }
    }

    Ok(SegmentSplit {
        tagged: table.take_rows(&tagged_rows),
        untagged: table.take_rows(&untagged_rows),
    })
}
