//! Draw Recording Benchmarks
//!
//! Measures parallel G-Buffer draw recording and the HZB CPU reference across
//! worker counts and scene sizes.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use myth_gbuffer::renderer::gbuffer::draw::{DrawRecorder, WorkerPool};
use myth_gbuffer::renderer::gbuffer::hzb::{DepthImage, HzbPyramid};
use myth_gbuffer::renderer::gbuffer::visibility::{DrawBucket, VisibilityOutput};
use myth_gbuffer::renderer::graph::{
    BindGroupId, BufferId, BufferRange, HeapCommandAllocator, PipelineId,
};
use myth_gbuffer::settings::{DepthReduction, DrawMode};

const SLOT_COUNTS: &[u32] = &[1_000, 10_000, 100_000];
const WORKER_COUNTS: &[usize] = &[1, 4, 8];
const SLOTS_PER_BUCKET: u32 = 256;
const DRAW_MODES: &[(&str, DrawMode)] = &[
    ("per_slot", DrawMode::PerSlot),
    ("indirect_count", DrawMode::IndirectCount),
];

fn visibility(slots: u32) -> VisibilityOutput {
    let buckets: Vec<DrawBucket> = (0..slots.div_ceil(SLOTS_PER_BUCKET))
        .map(|i| {
            let first_slot = i * SLOTS_PER_BUCKET;
            DrawBucket {
                pipeline: PipelineId(i % 16),
                bind_group: BindGroupId(i),
                first_slot,
                slot_count: SLOTS_PER_BUCKET.min(slots - first_slot),
            }
        })
        .collect();

    VisibilityOutput {
        index_buffer: BufferRange::new(BufferId(0), 0, 1 << 24),
        instance_indices: BufferRange::new(BufferId(1), 0, u64::from(slots) * 4),
        indirect_args: BufferRange::new(BufferId(2), 0, u64::from(slots) * 20),
        draw_counts: BufferRange::new(BufferId(3), 0, 4 * buckets.len() as u64),
        buckets: Arc::from(buckets),
        visible_aabbs: None,
    }
}

// ========================================
// Draw Recording
// ========================================

fn bench_draw_recording(c: &mut Criterion) {
    let allocator = HeapCommandAllocator::unbounded();

    for &(mode_name, mode) in DRAW_MODES {
        for &workers in WORKER_COUNTS {
            let recorder = DrawRecorder::new(WorkerPool::new(workers).expect("worker pool"), mode);
            let mut group = c.benchmark_group(format!("record_{mode_name}_{workers}_workers"));

            for &slots in SLOT_COUNTS {
                let vis = visibility(slots);
                group.bench_with_input(BenchmarkId::from_parameter(slots), &vis, |b, vis| {
                    b.iter(|| {
                        let stream = recorder
                            .record(black_box(vis), BindGroupId(0), &allocator)
                            .expect("recording");
                        black_box(stream.len())
                    });
                });
            }
            group.finish();
        }
    }
}

// ========================================
// HZB Reference
// ========================================

fn bench_hzb_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hzb_cpu_reference");
    for &(width, height) in &[(320, 180), (1280, 720)] {
        let depth = DepthImage::filled(width, height, 0.5);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &depth,
            |b, depth| {
                b.iter(|| HzbPyramid::build(black_box(depth), DepthReduction::Farthest, true));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_draw_recording, bench_hzb_build);
criterion_main!(benches);
