//! G-Buffer Render Target Planning
//!
//! Builds the immutable descriptors of every G-Buffer target once, at init or
//! resize. Frames only reference these descriptors; they never change them.
//!
//! # Color Slot Layout
//!
//! | Slot | Content                         | Format          |
//! |------|---------------------------------|-----------------|
//! | 0    | Albedo (rgb) + subsurface (a)   | `Rgba8Unorm`    |
//! | 1    | Roughness / metallic / specular | `Rgba8Unorm`    |
//! | 2    | World normal (octahedral)       | `Rgb10a2Unorm`  |
//! | 3    | Screen-space velocity           | `Rg16Float`     |

use crate::renderer::graph::description::{
    ColorAttachmentDescription, DepthAttachmentDescription, FramebufferDescription,
    RenderTargetDescription,
};
use crate::settings::GBufferSettings;

/// Number of G-Buffer color targets.
pub const GBUFFER_COLOR_TARGET_COUNT: usize = 4;

pub const ALBEDO_SLOT: usize = 0;
pub const NORMAL_SLOT: usize = 2;
pub const VELOCITY_SLOT: usize = 3;

/// Formats of the color targets, indexed by slot.
pub const GBUFFER_COLOR_FORMATS: [wgpu::TextureFormat; GBUFFER_COLOR_TARGET_COUNT] = [
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgb10a2Unorm,
    wgpu::TextureFormat::Rg16Float,
];

const GBUFFER_COLOR_LABELS: [&str; GBUFFER_COLOR_TARGET_COUNT] = [
    "GBuffer Albedo",
    "GBuffer Material",
    "GBuffer Normals",
    "GBuffer Velocity",
];

/// Format of the HZB pyramid.
pub const HZB_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Clear value of each color slot. Normals clear to +Z with alpha 0 (no
/// geometry); velocity clears to zero motion.
pub const GBUFFER_CLEAR_COLORS: [wgpu::Color; GBUFFER_COLOR_TARGET_COUNT] = [
    wgpu::Color::TRANSPARENT,
    wgpu::Color::TRANSPARENT,
    wgpu::Color {
        r: 0.5,
        g: 0.5,
        b: 1.0,
        a: 0.0,
    },
    wgpu::Color::TRANSPARENT,
];

/// Number of HZB mip levels: `floor(log2(min(width, height))) + 1`.
#[inline]
#[must_use]
pub fn hzb_mip_count(width: u32, height: u32) -> u32 {
    let min = width.min(height).max(1);
    min.ilog2() + 1
}

/// Every descriptor the G-Buffer needs for one render extent.
#[derive(Clone, Debug, PartialEq)]
pub struct GBufferTargetPlan {
    pub color: [RenderTargetDescription; GBUFFER_COLOR_TARGET_COUNT],
    pub depth: [RenderTargetDescription; 2],
    pub hzb: RenderTargetDescription,
    pub framebuffer: FramebufferDescription,
}

impl GBufferTargetPlan {
    #[must_use]
    pub fn new(settings: &GBufferSettings) -> Self {
        let (width, height) = (settings.width, settings.height);

        let color = std::array::from_fn(|slot| {
            RenderTargetDescription::new(
                GBUFFER_COLOR_LABELS[slot],
                width,
                height,
                GBUFFER_COLOR_FORMATS[slot],
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            )
        });

        let depth_usage =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let depth = [
            RenderTargetDescription::new(
                "GBuffer Depth #0",
                width,
                height,
                settings.depth_format,
                depth_usage,
            ),
            RenderTargetDescription::new(
                "GBuffer Depth #1",
                width,
                height,
                settings.depth_format,
                depth_usage,
            ),
        ];

        let hzb = RenderTargetDescription::new(
            "GBuffer HZB",
            width,
            height,
            HZB_FORMAT,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        )
        .with_mip_level_count(hzb_mip_count(width, height));

        let framebuffer = FramebufferDescription {
            color_attachments: GBUFFER_CLEAR_COLORS
                .iter()
                .map(|&clear| ColorAttachmentDescription {
                    load: wgpu::LoadOp::Clear(clear),
                    store: true,
                })
                .collect(),
            depth_attachment: Some(DepthAttachmentDescription {
                load: wgpu::LoadOp::Clear(settings.far_depth()),
                store: true,
            }),
        };

        Self {
            color,
            depth,
            hzb,
            framebuffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hzb_mip_count_uses_smaller_dimension() {
        assert_eq!(hzb_mip_count(1, 1), 1);
        assert_eq!(hzb_mip_count(2, 2), 2);
        assert_eq!(hzb_mip_count(1920, 1080), 11);
        assert_eq!(hzb_mip_count(1024, 4096), 11);
        assert_eq!(hzb_mip_count(1023, 4096), 10);
    }

    #[test]
    fn plan_uses_far_plane_depth_clear() {
        let reverse = GBufferTargetPlan::new(&GBufferSettings::default());
        assert_eq!(
            reverse.framebuffer.depth_attachment.unwrap().load,
            wgpu::LoadOp::Clear(0.0)
        );

        let standard = GBufferTargetPlan::new(&GBufferSettings {
            reverse_z: false,
            ..Default::default()
        });
        assert_eq!(
            standard.framebuffer.depth_attachment.unwrap().load,
            wgpu::LoadOp::Clear(1.0)
        );
    }

    #[test]
    fn plan_allocates_every_color_slot() {
        let plan = GBufferTargetPlan::new(&GBufferSettings::default());
        assert_eq!(plan.framebuffer.color_attachments.len(), GBUFFER_COLOR_TARGET_COUNT);
        assert_eq!(plan.color[NORMAL_SLOT].format, wgpu::TextureFormat::Rgb10a2Unorm);
        assert_eq!(plan.color[VELOCITY_SLOT].format, wgpu::TextureFormat::Rg16Float);
        assert_eq!(plan.hzb.mip_level_count, hzb_mip_count(1280, 720));
    }
}
