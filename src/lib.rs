//! Myth G-Buffer
//!
//! The deferred G-Buffer stage of the Myth renderer: render-target planning,
//! render-graph integration, parallel GPU-driven draw recording and the
//! hierarchical Z-buffer for next frame's occlusion culling.
//!
//! ```text
//! GPU culling ──► VisibilityOutput ──► GBuffer ──► color[0..4], depth, HZB
//! ```
//!
//! The stage talks to the render-graph executor and the GPU through the
//! traits in [`renderer::graph`]; [`renderer::backend`] implements them on
//! wgpu.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use errors::{AllocationError, FrameRenderError, InitError, ReplayError};
pub use renderer::gbuffer::debug::{DebugRenderTarget, UnknownDebugTarget};
pub use renderer::gbuffer::hzb::{DepthImage, HzbBindings, HzbPyramid};
pub use renderer::gbuffer::visibility::{DrawBucket, VisibilityOutput};
pub use renderer::gbuffer::{FramePhase, GBuffer, RenderingContext};
pub use renderer::graph::{RecordingGraph, RenderGraphBuilder, RenderTargetHandle, ResourceAllocator};
pub use scene::{FogDensityVolume, FogVolumeShape};
pub use settings::{DepthReduction, DrawMode, GBufferSettings};
