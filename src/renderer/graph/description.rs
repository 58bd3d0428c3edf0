//! Render Target & Framebuffer Descriptions
//!
//! Immutable descriptors built once at initialization (and again on resize).
//! They are never mutated per frame; per-frame state lives in handles.

use crate::renderer::graph::resource::TextureId;

/// Description of a 2D render target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetDescription {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    pub mip_level_count: u32,
}

impl RenderTargetDescription {
    /// Single-mip render target.
    #[must_use]
    pub fn new(
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        Self {
            label,
            width,
            height,
            format,
            usage,
            mip_level_count: 1,
        }
    }

    #[must_use]
    pub fn with_mip_level_count(mut self, mip_level_count: u32) -> Self {
        self.mip_level_count = mip_level_count;
        self
    }
}

/// A texture allocated for the lifetime of its owner.
///
/// Identity changes only when the texture is reallocated (e.g. on resize).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistentTexture {
    pub id: TextureId,
    pub desc: RenderTargetDescription,
}

// ─── Attachments ──────────────────────────────────────────────────────────────

/// Color attachment slot of a framebuffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorAttachmentDescription {
    pub load: wgpu::LoadOp<wgpu::Color>,
    pub store: bool,
}

/// Depth attachment of a framebuffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthAttachmentDescription {
    pub load: wgpu::LoadOp<f32>,
    pub store: bool,
}

/// Load/store behavior of a graphics pass's attachments, independent of
/// which concrete targets are bound this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FramebufferDescription {
    pub color_attachments: Vec<ColorAttachmentDescription>,
    pub depth_attachment: Option<DepthAttachmentDescription>,
}
