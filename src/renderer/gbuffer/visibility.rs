//! GPU Visibility Input
//!
//! The culling stage runs entirely on the GPU timeline and hands the G-Buffer
//! a [`VisibilityOutput`]. Nothing in here is ever read back to the host:
//! draws are issued indirectly, so visibility costs no CPU/GPU sync point.
//!
//! # Slot Layout
//!
//! ```text
//! draw slot:        0   1   2   3   4   5   6   7   ...
//! bucket:          [ A (pipeline 0)  ][ B (pipeline 3) ]
//! indirect args:   one DrawIndexedIndirect record per slot
//! instance stream: compacted GPU-scene indices, read via first_instance
//! draw counts:     one u32 per bucket (visible draws in that bucket)
//! ```
//!
//! The bucket table is layout metadata fixed when the culler allocated its
//! buffers, not a visibility result. Culled slots keep a zero instance count.

use std::ops::Range;
use std::sync::Arc;

use crate::renderer::graph::resource::{BindGroupId, BufferRange, PipelineId};

/// Contiguous run of draw slots sharing a pipeline and material bind group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawBucket {
    pub pipeline: PipelineId,
    pub bind_group: BindGroupId,
    pub first_slot: u32,
    pub slot_count: u32,
}

impl DrawBucket {
    #[inline]
    #[must_use]
    pub fn slots(&self) -> Range<u32> {
        self.first_slot..self.first_slot + self.slot_count
    }
}

/// Compacted visible-instance stream produced by the GPU culling stage.
///
/// Cheap to clone; the bucket table is shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityOutput {
    /// Unified `u32` index buffer the argument records index into.
    pub index_buffer: BufferRange,
    /// Compacted `u32` indices into the GPU scene's per-object store.
    pub instance_indices: BufferRange,
    /// One `DrawIndexedIndirect` argument record per draw slot.
    pub indirect_args: BufferRange,
    /// One visible-draw count per bucket. Read by `DrawMode::IndirectCount`.
    pub draw_counts: BufferRange,
    /// Bucket layout, sorted by `first_slot`, covering `0..slot_count()`.
    pub buckets: Arc<[DrawBucket]>,
    /// Visible AABB indices for debug drawing. Only produced when the culler
    /// was asked for it.
    pub visible_aabbs: Option<BufferRange>,
}

impl VisibilityOutput {
    /// Total number of draw slots.
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        self.buckets.last().map_or(0, |b| b.first_slot + b.slot_count)
    }

    /// Whether the bucket table is sorted, gap-free and starts at slot 0.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let mut next = 0;
        for bucket in self.buckets.iter() {
            if bucket.first_slot != next {
                return false;
            }
            next += bucket.slot_count;
        }
        true
    }

    /// Buckets intersecting `slots`, with the intersection.
    pub fn buckets_in(&self, slots: Range<u32>) -> impl Iterator<Item = (&DrawBucket, Range<u32>)> {
        self.buckets.iter().filter_map(move |bucket| {
            let start = bucket.first_slot.max(slots.start);
            let end = (bucket.first_slot + bucket.slot_count).min(slots.end);
            (start < end).then_some((bucket, start..end))
        })
    }
}
