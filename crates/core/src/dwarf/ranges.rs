//! Address-range normalization for subprogram DIEs.

use serde::{Deserialize, Serialize};

/// A half-open address range `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub low: u64,
    pub high: u64,
}

impl AddressRange {
    pub fn size(&self) -> u64 {
        self.high - self.low
    }
}

/// Normalize raw `[low, high)` segments into canonical form.
///
/// Drops empty segments, sorts by `low`, and merges overlapping or
/// adjacent segments. The result is sorted, non-empty, and pairwise
/// non-overlapping.
pub fn normalize_ranges(raw: &[AddressRange]) -> Vec<AddressRange> {
    let mut segments: Vec<AddressRange> =
        raw.iter().copied().filter(|r| r.high > r.low).collect();
    segments.sort_by_key(|r| (r.low, r.high));

    let mut merged: Vec<AddressRange> = Vec::with_capacity(segments.len());
    for seg in segments {
        match merged.last_mut() {
            Some(last) if seg.low <= last.high => {
                if seg.high > last.high {
                    last.high = seg.high;
                }
            }
            _ => merged.push(seg),
        }
    }
    merged
}

/// Total byte size across normalized segments.
pub fn total_range_bytes(ranges: &[AddressRange]) -> u64 {
    ranges.iter().map(|r| r.size()).sum()
}

/// Check whether `address` falls inside any of the `[low, high)` ranges.
pub fn in_ranges(address: u64, ranges: &[AddressRange]) -> bool {
    ranges.iter().any(|r| r.low <= address && address < r.high)
}
