//! Hierarchical Z-Buffer
//!
//! Reduces the freshly written depth target into a mip pyramid that the next
//! frame's occlusion culling samples. One frame of latency is accepted;
//! visibility changes slowly relative to frame time.
//!
//! ```text
//! level 0   depth, full resolution (copy)
//! level 1   reduce(2×2 block of level 0)
//!   ⋮
//! level n   1 texel along the smaller axis
//! ```
//!
//! Level `k + 1` at `(x, y)` reduces level `k`'s 2×2 block at `(2x, 2y)`.
//! When level `k` has an odd extent the last column/row of level `k + 1` also
//! folds in the trailing source texels, so no depth sample is ever dropped.
//!
//! The GPU path records one dispatch per level (8×8 workgroups) and is
//! implemented by `hzb_reduce.wgsl` in the wgpu backend. [`HzbPyramid`] is the
//! CPU reference of the same reduction.

use std::ops::Range;

use glam::UVec2;

use crate::renderer::gbuffer::targets::hzb_mip_count;
use crate::renderer::graph::command::Command;
use crate::renderer::graph::resource::{BindGroupId, PipelineId};
use crate::settings::DepthReduction;

/// Threads per workgroup along each axis.
pub const HZB_WORKGROUP_SIZE: u32 = 8;

/// Extent of HZB level `level` for a base extent of `width × height`.
#[inline]
#[must_use]
pub fn hzb_level_extent(width: u32, height: u32, level: u32) -> UVec2 {
    UVec2::new((width >> level).max(1), (height >> level).max(1))
}

/// Source texels reduced into destination texel `x` along one axis.
#[inline]
fn source_span(x: u32, dst_len: u32, src_len: u32) -> Range<u32> {
    let start = (2 * x).min(src_len - 1);
    let end = if x + 1 == dst_len {
        src_len
    } else {
        (2 * x + 2).min(src_len)
    };
    start..end
}

// ─── CPU Reference ────────────────────────────────────────────────────────────

/// Row-major single-channel depth image.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthImage {
    width: u32,
    height: u32,
    texels: Vec<f32>,
}

impl DepthImage {
    /// Image filled with `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            texels: vec![value; (width * height) as usize],
        }
    }

    /// Wraps row-major texels. Returns `None` on a size mismatch.
    #[must_use]
    pub fn from_texels(width: u32, height: u32, texels: Vec<f32>) -> Option<Self> {
        (texels.len() == (width * height) as usize).then_some(Self {
            width,
            height,
            texels,
        })
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.texels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        self.texels[(y * self.width + x) as usize] = value;
    }

    #[must_use]
    pub fn texels(&self) -> &[f32] {
        &self.texels
    }
}

/// CPU-side HZB pyramid.
#[derive(Clone, Debug, PartialEq)]
pub struct HzbPyramid {
    levels: Vec<DepthImage>,
}

impl HzbPyramid {
    /// Builds the full pyramid from `depth`.
    #[must_use]
    pub fn build(depth: &DepthImage, reduction: DepthReduction, reverse_z: bool) -> Self {
        let count = hzb_mip_count(depth.width, depth.height);
        let mut levels = Vec::with_capacity(count as usize);
        levels.push(depth.clone());

        for level in 1..count {
            let src = &levels[level as usize - 1];
            let extent = hzb_level_extent(depth.width, depth.height, level);
            let next = reduce_level(src, extent, reduction, reverse_z);
            levels.push(next);
        }

        Self { levels }
    }

    #[inline]
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    #[must_use]
    pub fn level(&self, level: usize) -> &DepthImage {
        &self.levels[level]
    }
}

fn reduce_level(
    src: &DepthImage,
    extent: UVec2,
    reduction: DepthReduction,
    reverse_z: bool,
) -> DepthImage {
    let mut dst = DepthImage::filled(extent.x, extent.y, 0.0);
    for y in 0..extent.y {
        let rows = source_span(y, extent.y, src.height);
        for x in 0..extent.x {
            let cols = source_span(x, extent.x, src.width);
            let mut value = src.get(cols.start, rows.start);
            for sy in rows.clone() {
                for sx in cols.clone() {
                    value = reduction.reduce(value, src.get(sx, sy), reverse_z);
                }
            }
            dst.set(x, y, value);
        }
    }
    dst
}

// ─── GPU Recording ────────────────────────────────────────────────────────────

/// Backend objects the HZB pass binds.
///
/// The backend creates one bind group per level; level `k` uses
/// `first_level_group + k`, and level 0 copies depth into mip 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HzbBindings {
    pub pipeline: PipelineId,
    pub first_level_group: BindGroupId,
}

impl HzbBindings {
    #[inline]
    #[must_use]
    pub fn level_group(&self, level: u32) -> BindGroupId {
        BindGroupId(self.first_level_group.0 + level)
    }
}

/// Commands reducing a `width × height` depth target into `mip_count` levels.
#[must_use]
pub fn hzb_dispatch_commands(
    width: u32,
    height: u32,
    mip_count: u32,
    bindings: HzbBindings,
) -> Vec<Command> {
    let mut commands = Vec::with_capacity(1 + 2 * mip_count as usize);
    commands.push(Command::SetPipeline(bindings.pipeline));

    for level in 0..mip_count {
        let extent = hzb_level_extent(width, height, level);
        commands.push(Command::SetBindGroup {
            index: 0,
            group: bindings.level_group(level),
        });
        commands.push(Command::Dispatch {
            x: extent.x.div_ceil(HZB_WORKGROUP_SIZE),
            y: extent.y.div_ceil(HZB_WORKGROUP_SIZE),
            z: 1,
        });
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_span_folds_odd_tail() {
        assert_eq!(source_span(0, 2, 5), 0..2);
        assert_eq!(source_span(1, 2, 5), 2..5);
        assert_eq!(source_span(0, 1, 1), 0..1);
        assert_eq!(source_span(1, 2, 4), 2..4);
    }

    #[test]
    fn level_extent_clamps() {
        assert_eq!(hzb_level_extent(16, 4, 3), UVec2::new(2, 1));
    }

    #[test]
    fn dispatch_per_level_rounds_up() {
        let bindings = HzbBindings {
            pipeline: PipelineId(9),
            first_level_group: BindGroupId(100),
        };
        let cmds = hzb_dispatch_commands(20, 10, hzb_mip_count(20, 10), bindings);

        // Pipeline + (bind, dispatch) × 4 levels.
        assert_eq!(cmds.len(), 1 + 2 * 4);
        assert_eq!(cmds[1], Command::SetBindGroup { index: 0, group: BindGroupId(100) });
        assert_eq!(cmds[2], Command::Dispatch { x: 3, y: 2, z: 1 });
        assert_eq!(cmds[8], Command::Dispatch { x: 1, y: 1, z: 1 });
    }
}
