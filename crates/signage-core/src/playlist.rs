//! Playlist ordering.
//!
//! Every function here takes the collection by value (or reference) and
//! returns a new one; nothing mutates shared state. After any mutating call
//! the `order` values are exactly `1..=N`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One uploaded video in the playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    /// Name supplied by the uploader, for display only.
    pub original_name: String,
    /// Server-generated name of the file in the upload directory.
    pub stored_filename: String,
    pub uploaded_at: DateTime<Utc>,
    /// Position in the playback sequence, starting at 1.
    pub order: i64,
}

impl VideoRecord {
    /// A record for a file stored just now, with a fresh id.
    pub fn uploaded_now(original_name: &str, stored_filename: &str, order: i64) -> Self {
        Self {
            id: new_video_id(),
            original_name: original_name.to_string(),
            stored_filename: stored_filename.to_string(),
            uploaded_at: Utc::now(),
            order,
        }
    }
}

/// Stable-sorts by current `order`, then renumbers `1, 2, 3, ...`.
pub fn reindex(mut records: Vec<VideoRecord>) -> Vec<VideoRecord> {
    records.sort_by_key(|r| r.order);
    for (i, record) in records.iter_mut().enumerate() {
        record.order = i as i64 + 1;
    }
    records
}

/// Reorders the playlist to follow `ordered_ids`.
///
/// Records named in `ordered_ids` come first in exactly that sequence; ids
/// that match nothing are skipped and repeated ids count once. Records the
/// payload does not mention follow in their previous relative order, so a
/// stale or partial payload never drops a video.
pub fn apply_explicit_order<S: AsRef<str>>(
    records: Vec<VideoRecord>,
    ordered_ids: &[S],
) -> Vec<VideoRecord> {
    let mut slots: Vec<Option<VideoRecord>> = records.into_iter().map(Some).collect();
    let index: HashMap<String, usize> = slots
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().map(|r| (r.id.clone(), i)))
        .collect();

    let mut reordered = Vec::with_capacity(slots.len());
    for id in ordered_ids {
        if let Some(&i) = index.get(id.as_ref()) {
            if let Some(record) = slots[i].take() {
                reordered.push(record);
            }
        }
    }
    reordered.extend(slots.into_iter().flatten());

    // Positions, not the stale `order` values, now define the sequence.
    for (i, record) in reordered.iter_mut().enumerate() {
        record.order = i as i64 + 1;
    }
    reindex(reordered)
}

/// Order value for a newly uploaded video: one past the current maximum.
pub fn next_order(records: &[VideoRecord]) -> i64 {
    records.iter().map(|r| r.order).max().map_or(1, |max| max + 1)
}

/// Splits a comma-separated id payload, trimming entries and dropping empties.
pub fn parse_order_payload(payload: &str) -> Vec<String> {
    payload
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Removes the record with `id` and closes the gap it leaves.
///
/// Returns the remaining records and the removed one, or `None` when no
/// record has that id.
pub fn remove_video(
    records: Vec<VideoRecord>,
    id: &str,
) -> Option<(Vec<VideoRecord>, VideoRecord)> {
    let pos = records.iter().position(|r| r.id == id)?;
    let mut records = records;
    let removed = records.remove(pos);
    Some((reindex(records), removed))
}

/// Random 16-character lowercase hex identifier.
pub fn new_video_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
