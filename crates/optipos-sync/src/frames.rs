//! # Frame Import De-duplication
//!
//! Frames have no natural id shared with the backend, so a bulk import
//! matches on `brand|model|color|size`, case-insensitive:
//!
//! ```text
//! remote rows ──► key set ──┐
//!                           ├──► new frames   → inserted ("added")
//! incoming frames ──────────┘    known frames → skipped  ("duplicates")
//! ```
//!
//! A frame repeated within the same import counts as a duplicate after its
//! first occurrence. A regular sync first sets aside the frames whose id the
//! backend already knows; those are upserted so edits reach the cloud.

use std::collections::HashSet;

use serde_json::Value;

use optipos_core::catalog::{frame_dedup_key, Frame};

/// Columns needed to recognise a remote row, by id or by key.
pub const KEY_COLUMNS: &str = "id,brand,model,color,size";

/// Split of an import into frames to insert and frames already known.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameImport<'a> {
    pub new: Vec<&'a Frame>,
    pub duplicates: usize,
}

/// Keys of the frames the backend already has.
pub fn remote_keys(rows: &[Value]) -> HashSet<String> {
    rows.iter()
        .map(|row| {
            let field = |name: &str| row.get(name).and_then(Value::as_str).unwrap_or_default();
            frame_dedup_key(field("brand"), field("model"), field("color"), field("size"))
        })
        .collect()
}

/// Ids of the frames the backend already has.
pub fn remote_ids(rows: &[Value]) -> HashSet<String> {
    rows.iter()
        .filter_map(|row| row.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

pub fn partition<'a>(
    frames: impl IntoIterator<Item = &'a Frame>,
    known: &HashSet<String>,
) -> FrameImport<'a> {
    let mut seen = known.clone();
    let mut new = Vec::new();
    let mut duplicates = 0;

    for frame in frames {
        if seen.insert(frame.dedup_key()) {
            new.push(frame);
        } else {
            duplicates += 1;
        }
    }

    FrameImport { new, duplicates }
}
