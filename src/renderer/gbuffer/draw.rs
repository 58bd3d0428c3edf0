//! Parallel G-Buffer Draw Recording
//!
//! Splits the work of a [`VisibilityOutput`] into one contiguous sub-range per
//! worker and records each sub-range into its own secondary [`CommandList`]
//! on a dedicated rayon pool.
//!
//! | [`DrawMode`]    | Partitioned range | Per bucket                                  |
//! |-----------------|-------------------|---------------------------------------------|
//! | `PerSlot`       | draw slots        | pipeline, bind group, one draw per slot     |
//! | `IndirectCount` | buckets           | pipeline, bind group, one count-driven draw |
//!
//! # Determinism
//!
//! G-Buffer writes are opaque and depth-tested, so draw order across workers
//! cannot change pixels. The command stream is made reproducible anyway:
//!
//! 1. Secondary lists are collected in worker-index order.
//! 2. Concatenation runs through a [`TrackedCommandStream`], dropping the state
//!    bindings each worker had to repeat.
//!
//! The merged stream is therefore identical for any worker count.
//!
//! # Failure
//!
//! Recording is all-or-nothing. If any worker fails, or the primary list
//! cannot hold the merged stream, nothing reaches the primary list and the
//! error is returned to the executor as a frame-level failure.

use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use rayon::prelude::*;

use crate::errors::{FrameRenderError, InitError};
use crate::renderer::gbuffer::visibility::VisibilityOutput;
use crate::renderer::graph::command::{
    Command, CommandAllocator, CommandList, DRAW_COUNT_STRIDE, DRAW_INDEXED_INDIRECT_STRIDE,
};
use crate::renderer::graph::pass::TrackedCommandStream;
use crate::renderer::graph::resource::BindGroupId;
use crate::settings::DrawMode;

/// Vertex buffer slot the compacted instance-index stream is bound to.
pub const INSTANCE_INDEX_VERTEX_SLOT: u32 = 0;
/// Bind group slot of the frame-global group (camera + GPU scene).
pub const GLOBAL_BIND_GROUP_INDEX: u32 = 0;
/// Bind group slot of the per-bucket material group.
pub const BUCKET_BIND_GROUP_INDEX: u32 = 1;

/// Splits `range` into `workers` contiguous sub-ranges whose lengths differ by
/// at most one. Leading sub-ranges take the remainder. Sub-ranges may be empty
/// when there are fewer slots than workers.
#[must_use]
pub fn partition_range(range: Range<u32>, workers: usize) -> Vec<Range<u32>> {
    let workers = workers.max(1);
    let len = range.end.saturating_sub(range.start) as usize;
    let base = len / workers;
    let remainder = len % workers;

    let mut start = range.start;
    (0..workers)
        .map(|worker| {
            let size = (base + usize::from(worker < remainder)) as u32;
            let sub = start..start + size;
            start += size;
            sub
        })
        .collect()
}

// ─── Worker Pool ──────────────────────────────────────────────────────────────

/// Fixed-size pool of recording threads.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<rayon::ThreadPool>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, InitError> {
        let size = size.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|idx| format!("gbuffer-record-{idx}"))
            .build()
            .map_err(|e| InitError::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool: Arc::new(pool),
            size,
        })
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("size", &self.size).finish()
    }
}

// ─── Draw Recorder ────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct DrawRecorder {
    workers: WorkerPool,
    mode: DrawMode,
}

impl DrawRecorder {
    #[must_use]
    pub fn new(workers: WorkerPool, mode: DrawMode) -> Self {
        Self { workers, mode }
    }

    #[inline]
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.size()
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    /// Records every draw slot of `visibility` and returns the merged stream.
    pub fn record(
        &self,
        visibility: &VisibilityOutput,
        global_bind_group: BindGroupId,
        allocator: &dyn CommandAllocator,
    ) -> Result<Vec<Command>, FrameRenderError> {
        let work = match self.mode {
            DrawMode::PerSlot => 0..visibility.slot_count(),
            DrawMode::IndirectCount => 0..visibility.buckets.len() as u32,
        };
        let ranges = partition_range(work, self.worker_count());

        let recorded = catch_unwind(AssertUnwindSafe(|| {
            self.workers.pool.install(|| {
                (0..ranges.len())
                    .into_par_iter()
                    .map(|worker| {
                        record_worker(
                            worker,
                            ranges[worker].clone(),
                            self.mode,
                            visibility,
                            global_bind_group,
                            allocator,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
        }))
        .map_err(|payload| FrameRenderError::WorkerPanicked(panic_message(payload.as_ref())))?;

        let secondaries = recorded?;
        let merged = merge_secondaries(secondaries);

        log::debug!(
            "GBuffer: recorded {} draw slots ({:?}) on {} workers ({} commands)",
            visibility.slot_count(),
            self.mode,
            self.worker_count(),
            merged.len()
        );
        Ok(merged)
    }

    /// Records and appends to `primary`. `primary` is untouched on failure.
    pub fn record_into(
        &self,
        visibility: &VisibilityOutput,
        global_bind_group: BindGroupId,
        allocator: &dyn CommandAllocator,
        primary: &mut CommandList,
    ) -> Result<(), FrameRenderError> {
        let merged = self.record(visibility, global_bind_group, allocator)?;
        primary.append_all(merged)
    }
}

/// Concatenates secondary lists in worker order, dropping redundant bindings.
#[must_use]
pub fn merge_secondaries(secondaries: Vec<CommandList>) -> Vec<Command> {
    let total = secondaries.iter().map(CommandList::len).sum();
    let mut stream = TrackedCommandStream::with_capacity(total);
    for list in secondaries {
        stream.extend(list.into_commands());
    }
    stream.finish()
}

fn record_worker(
    worker: usize,
    range: Range<u32>,
    mode: DrawMode,
    visibility: &VisibilityOutput,
    global_bind_group: BindGroupId,
    allocator: &dyn CommandAllocator,
) -> Result<CommandList, FrameRenderError> {
    if range.is_empty() {
        return Ok(CommandList::new());
    }

    let estimated = match mode {
        DrawMode::PerSlot => range.len() + 3 + 2 * visibility.buckets.len(),
        DrawMode::IndirectCount => 3 + 3 * range.len(),
    };
    let mut list = allocator.allocate_secondary(worker, estimated)?;

    list.push(Command::SetBindGroup {
        index: GLOBAL_BIND_GROUP_INDEX,
        group: global_bind_group,
    })?;
    list.push(Command::SetVertexBuffer {
        slot: INSTANCE_INDEX_VERTEX_SLOT,
        buffer: visibility.instance_indices.buffer,
        offset: visibility.instance_indices.offset,
    })?;
    list.push(Command::SetIndexBuffer {
        buffer: visibility.index_buffer.buffer,
        offset: visibility.index_buffer.offset,
    })?;

    match mode {
        DrawMode::PerSlot => record_slot_draws(&mut list, range, visibility)?,
        DrawMode::IndirectCount => record_bucket_draws(&mut list, range, visibility)?,
    }
    Ok(list)
}

/// One `DrawIndexedIndirect` per slot in `slots`.
fn record_slot_draws(
    list: &mut CommandList,
    slots: Range<u32>,
    visibility: &VisibilityOutput,
) -> Result<(), FrameRenderError> {
    let args = visibility.indirect_args;
    for (bucket, bucket_slots) in visibility.buckets_in(slots) {
        list.push(Command::SetPipeline(bucket.pipeline))?;
        list.push(Command::SetBindGroup {
            index: BUCKET_BIND_GROUP_INDEX,
            group: bucket.bind_group,
        })?;

        for slot in bucket_slots {
            list.push(Command::DrawIndexedIndirect {
                buffer: args.buffer,
                offset: args.offset + u64::from(slot) * DRAW_INDEXED_INDIRECT_STRIDE,
            })?;
        }
    }
    Ok(())
}

/// One count-driven multi-draw per non-empty bucket in `buckets`.
fn record_bucket_draws(
    list: &mut CommandList,
    buckets: Range<u32>,
    visibility: &VisibilityOutput,
) -> Result<(), FrameRenderError> {
    let args = visibility.indirect_args;
    let counts = visibility.draw_counts;
    for index in buckets {
        let bucket = &visibility.buckets[index as usize];
        if bucket.slot_count == 0 {
            continue;
        }

        list.push(Command::SetPipeline(bucket.pipeline))?;
        list.push(Command::SetBindGroup {
            index: BUCKET_BIND_GROUP_INDEX,
            group: bucket.bind_group,
        })?;
        list.push(Command::MultiDrawIndexedIndirectCount {
            buffer: args.buffer,
            offset: args.offset + u64::from(bucket.first_slot) * DRAW_INDEXED_INDIRECT_STRIDE,
            count_buffer: counts.buffer,
            count_offset: counts.offset + u64::from(index) * DRAW_COUNT_STRIDE,
            max_count: bucket.slot_count,
        })?;
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_range_contiguously() {
        let parts = partition_range(3..20, 4);
        assert_eq!(parts, vec![3..8, 8..12, 12..16, 16..20]);
    }

    #[test]
    fn partition_with_more_workers_than_slots() {
        let parts = partition_range(0..2, 4);
        assert_eq!(parts, vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn partition_of_empty_range_is_all_empty() {
        let parts = partition_range(0..0, 3);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(Range::is_empty));
    }

    #[test]
    fn zero_workers_is_treated_as_one() {
        assert_eq!(partition_range(0..5, 0), vec![0..5]);
    }
}
