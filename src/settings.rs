//! G-Buffer Settings
//!
//! Runtime configuration for the G-Buffer stage.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_gbuffer::{DepthReduction, DrawMode, GBufferSettings};
//!
//! let settings = GBufferSettings {
//!     width: 1920,
//!     height: 1080,
//!     worker_count: 8,
//!     hzb_reduction: DepthReduction::Farthest,
//!     draw_mode: DrawMode::for_features(device.features()),
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::InitError;

// ---------------------------------------------------------------------------
// DepthReduction
// ---------------------------------------------------------------------------

/// Operator applied to each 2×2 block when building the HZB pyramid.
///
/// The operator is expressed in terms of *distance from the camera* so that it
/// stays correct regardless of the depth convention; [`DepthReduction::reduce`]
/// maps it onto `min`/`max` for the active convention.
///
/// | Variant    | Reverse-Z | Standard Z | Typical consumer                  |
/// |------------|-----------|------------|-----------------------------------|
/// | `Farthest` | `min`     | `max`      | Occlusion culling (conservative)  |
/// | `Nearest`  | `max`     | `min`      | Screen-space ray marching         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthReduction {
    /// Keep the depth farthest from the camera. An object is only rejected
    /// when it lies behind every texel its bounds cover.
    #[default]
    Farthest,
    /// Keep the depth nearest to the camera.
    Nearest,
}

impl DepthReduction {
    /// Reduces two depth samples.
    #[inline]
    #[must_use]
    pub fn reduce(self, a: f32, b: f32, reverse_z: bool) -> f32 {
        // Reverse-Z stores 1.0 at the near plane and 0.0 at the far plane.
        let keep_larger = matches!(
            (self, reverse_z),
            (Self::Nearest, true) | (Self::Farthest, false)
        );
        if keep_larger { a.max(b) } else { a.min(b) }
    }

    /// Shader-side selector: `0` selects `min`, `1` selects `max`.
    #[inline]
    #[must_use]
    pub fn shader_operator(self, reverse_z: bool) -> u32 {
        u32::from(self.reduce(0.0, 1.0, reverse_z) > 0.5)
    }
}

// ---------------------------------------------------------------------------
// DrawMode
// ---------------------------------------------------------------------------

/// How the geometry pass issues its indirect draws.
///
/// | Variant         | Commands per bucket         | Reads draw counts | Device feature              |
/// |-----------------|-----------------------------|-------------------|-----------------------------|
/// | `PerSlot`       | one draw per slot           | no                | none                        |
/// | `IndirectCount` | one count-driven multi-draw | yes               | `MULTI_DRAW_INDIRECT_COUNT` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrawMode {
    /// One `DrawIndexedIndirect` per draw slot. Culled slots carry a zero
    /// instance count.
    #[default]
    PerSlot,
    /// One multi-draw per bucket whose draw count the GPU reads from the
    /// bucket's entry in the draw-count buffer. The culler compacts visible
    /// argument records to the front of the bucket.
    IndirectCount,
}

impl DrawMode {
    /// The count-driven mode when `features` allow it, per-slot draws otherwise.
    #[must_use]
    pub fn for_features(features: wgpu::Features) -> Self {
        if features.contains(wgpu::Features::MULTI_DRAW_INDIRECT_COUNT) {
            Self::IndirectCount
        } else {
            Self::PerSlot
        }
    }

    /// Whether draws read the per-bucket draw-count buffer.
    #[inline]
    #[must_use]
    pub fn reads_draw_counts(self) -> bool {
        self == Self::IndirectCount
    }
}

// ---------------------------------------------------------------------------
// GBufferSettings
// ---------------------------------------------------------------------------

/// Configuration for a [`GBuffer`](crate::renderer::gbuffer::GBuffer) instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GBufferSettings {
    /// Render target width in pixels.
    pub width: u32,
    /// Render target height in pixels.
    pub height: u32,
    /// Number of parallel recording workers. `0` uses rayon's default.
    pub worker_count: usize,
    /// Reverse-Z depth (near = 1.0, far = 0.0, compare `Greater`).
    pub reverse_z: bool,
    /// HZB reduction operator.
    pub hzb_reduction: DepthReduction,
    /// Indirect draw style of the geometry pass.
    pub draw_mode: DrawMode,
    /// Expose the visible-AABB buffer for debug drawing.
    pub debug_visualization: bool,
    /// Format of the ping-pong depth targets.
    pub depth_format: wgpu::TextureFormat,
}

impl Default for GBufferSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            worker_count: 0,
            reverse_z: true,
            hzb_reduction: DepthReduction::default(),
            draw_mode: DrawMode::default(),
            debug_visualization: false,
            depth_format: wgpu::TextureFormat::Depth32Float,
        }
    }
}

impl GBufferSettings {
    /// Checks that the settings describe a usable G-Buffer.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.width == 0 || self.height == 0 {
            return Err(InitError::InvalidSettings(format!(
                "render extent must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.depth_format.is_depth_stencil_format() {
            return Err(InitError::InvalidSettings(format!(
                "{:?} is not a depth format",
                self.depth_format
            )));
        }
        Ok(())
    }

    /// Depth value of the far plane, used as the depth clear value.
    #[inline]
    #[must_use]
    pub fn far_depth(&self) -> f32 {
        if self.reverse_z { 0.0 } else { 1.0 }
    }

    /// Resolved worker count (never zero).
    #[must_use]
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count == 0 {
            rayon::current_num_threads().max(1)
        } else {
            self.worker_count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farthest_is_min_under_reverse_z() {
        assert_eq!(DepthReduction::Farthest.reduce(0.2, 0.7, true), 0.2);
        assert_eq!(DepthReduction::Farthest.reduce(0.2, 0.7, false), 0.7);
        assert_eq!(DepthReduction::Nearest.reduce(0.2, 0.7, true), 0.7);
        assert_eq!(DepthReduction::Nearest.reduce(0.2, 0.7, false), 0.2);
    }

    #[test]
    fn shader_operator_matches_cpu_reduction() {
        assert_eq!(DepthReduction::Farthest.shader_operator(true), 0);
        assert_eq!(DepthReduction::Nearest.shader_operator(true), 1);
        assert_eq!(DepthReduction::Farthest.shader_operator(false), 1);
    }

    #[test]
    fn validate_rejects_zero_extent_and_color_depth_format() {
        let zero = GBufferSettings {
            width: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let color = GBufferSettings {
            depth_format: wgpu::TextureFormat::Rgba8Unorm,
            ..Default::default()
        };
        assert!(color.validate().is_err());

        assert!(GBufferSettings::default().validate().is_ok());
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let json = r#"{ "width": 1920, "height": 1080, "hzb_reduction": "Nearest" }"#;
        let settings: GBufferSettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.width, 1920);
        assert_eq!(settings.hzb_reduction, DepthReduction::Nearest);
        assert!(settings.reverse_z);
        assert_eq!(settings.depth_format, wgpu::TextureFormat::Depth32Float);
    }

    #[test]
    fn config_round_trips_through_json() {
        let settings = GBufferSettings {
            worker_count: 6,
            debug_visualization: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: GBufferSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn draw_mode_follows_device_features() {
        assert_eq!(DrawMode::for_features(wgpu::Features::empty()), DrawMode::PerSlot);
        assert_eq!(
            DrawMode::for_features(wgpu::Features::MULTI_DRAW_INDIRECT_COUNT),
            DrawMode::IndirectCount
        );
        assert!(!DrawMode::PerSlot.reads_draw_counts());
        assert!(DrawMode::IndirectCount.reads_draw_counts());
    }

    #[test]
    fn far_depth_follows_convention() {
        let mut s = GBufferSettings::default();
        assert_eq!(s.far_depth(), 0.0);
        s.reverse_z = false;
        assert_eq!(s.far_depth(), 1.0);
    }
}
