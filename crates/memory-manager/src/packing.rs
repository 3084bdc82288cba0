// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lifetime packing: turning live intervals into pool layouts.
//!
//! Each managed buffer is an [`Interval`] `[start, end)` on the lifetime
//! manager's event clock. Two buffers whose intervals overlap are live at the
//! same time and must get disjoint bytes; two buffers whose intervals are
//! disjoint may share bytes. This is register allocation over an interval
//! graph, and both strategies below are greedy in interval-start order.
//!
//! - [`pack_offsets`]: one pool allocation; each interval gets the lowest
//!   aligned offset that does not intersect any already-placed interval it
//!   overlaps in time (first fit).
//! - [`pack_blobs`]: one allocation per blob; an interval reuses the most
//!   recently freed blob, otherwise opens a new one. Blobs are reported
//!   largest first so plans of different groups can be merged slot-wise.
//!
//! Both functions are pure, so the no-aliasing and reuse properties are
//! tested directly on random interval sets.

use crate::MemoryableId;
use std::collections::BTreeMap;

/// The live window of one memoryable, with its storage requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub id: MemoryableId,
    /// Clock value of `start_lifetime`.
    pub start: u64,
    /// Clock value of `end_lifetime` (exclusive).
    pub end: u64,
    pub size: usize,
    pub alignment: usize,
}

impl Interval {
    /// Returns `true` if both intervals are live at some common instant.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Rounds `value` up to a multiple of `alignment` (a power of two, or 0/1).
pub fn align_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// Sum of sizes: what the intervals would cost without any reuse.
pub fn naive_footprint(intervals: &[Interval]) -> usize {
    intervals.iter().map(|i| i.size).sum()
}

// ── Offset packing ─────────────────────────────────────────────

/// Result of [`pack_offsets`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetPlan {
    /// Byte offset of each memoryable inside the pool.
    pub offsets: BTreeMap<MemoryableId, usize>,
    /// Bytes the pool must provide.
    pub footprint: usize,
    /// Alignment the pool allocation must satisfy.
    pub alignment: usize,
}

/// Greedy first-fit offset assignment in interval-start order.
pub fn pack_offsets(intervals: &[Interval]) -> OffsetPlan {
    let mut order: Vec<&Interval> = intervals.iter().collect();
    order.sort_by_key(|i| (i.start, i.end, i.id));

    let mut placed: Vec<(&Interval, usize)> = Vec::with_capacity(order.len());
    let mut plan = OffsetPlan {
        alignment: 1,
        ..OffsetPlan::default()
    };

    for interval in order {
        let alignment = interval.alignment.max(1);

        let mut busy: Vec<(usize, usize)> = placed
            .iter()
            .filter(|(other, _)| other.overlaps(interval))
            .map(|(other, offset)| (*offset, offset + other.size))
            .collect();
        busy.sort_unstable();

        let mut offset = 0;
        for (lo, hi) in busy {
            if offset + interval.size <= lo {
                break;
            }
            offset = offset.max(align_up(hi, alignment));
        }

        plan.footprint = plan.footprint.max(offset + interval.size);
        plan.alignment = plan.alignment.max(alignment);
        plan.offsets.insert(interval.id, offset);
        placed.push((interval, offset));
    }

    plan
}

// ── Blob packing ───────────────────────────────────────────────

/// Size and alignment of one blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BlobInfo {
    pub size: usize,
    pub alignment: usize,
}

/// Result of [`pack_blobs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobPlan {
    /// Blob index of each memoryable (indices into `blobs`).
    pub blob_of: BTreeMap<MemoryableId, usize>,
    /// Blobs sorted by size, largest first.
    pub blobs: Vec<BlobInfo>,
}

impl BlobPlan {
    /// Total bytes of all blobs.
    pub fn footprint(&self) -> usize {
        self.blobs.iter().map(|b| b.size).sum()
    }
}

/// Greedy blob reuse: a starting interval takes the most recently freed blob.
pub fn pack_blobs(intervals: &[Interval]) -> BlobPlan {
    // (time, is_start, index). Ends sort before starts at equal times
    // because the intervals are half-open.
    let mut events: Vec<(u64, bool, usize)> = intervals
        .iter()
        .enumerate()
        .flat_map(|(i, iv)| [(iv.start, true, i), (iv.end, false, i)])
        .collect();
    events.sort_by_key(|&(time, is_start, i)| (time, is_start, intervals[i].id));

    let mut blobs: Vec<BlobInfo> = Vec::new();
    let mut assigned: Vec<Option<usize>> = vec![None; intervals.len()];
    let mut free: Vec<usize> = Vec::new();

    for (_, is_start, i) in events {
        let interval = &intervals[i];
        if is_start {
            let blob = free.pop().unwrap_or_else(|| {
                blobs.push(BlobInfo { size: 0, alignment: 1 });
                blobs.len() - 1
            });
            blobs[blob].size = blobs[blob].size.max(interval.size);
            blobs[blob].alignment = blobs[blob].alignment.max(interval.alignment.max(1));
            assigned[i] = Some(blob);
        } else if let Some(blob) = assigned[i] {
            free.push(blob);
        }
    }

    // Largest first; remap indices accordingly.
    let mut order: Vec<usize> = (0..blobs.len()).collect();
    order.sort_by(|&a, &b| blobs[b].size.cmp(&blobs[a].size).then(a.cmp(&b)));
    let mut remap = vec![0; blobs.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = new;
    }

    BlobPlan {
        blob_of: intervals
            .iter()
            .zip(&assigned)
            .filter_map(|(iv, blob)| blob.map(|b| (iv.id, remap[b])))
            .collect(),
        blobs: order.iter().map(|&old| blobs[old]).collect(),
    }
}

/// Slot-wise maximum of two largest-first blob lists.
pub fn merge_blobs(a: &[BlobInfo], b: &[BlobInfo]) -> Vec<BlobInfo> {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => BlobInfo {
                size: x.size.max(y.size),
                alignment: x.alignment.max(y.alignment),
            },
            (Some(x), None) | (None, Some(x)) => *x,
            (None, None) => unreachable!("index below the longer length"),
        })
        .collect()
}
