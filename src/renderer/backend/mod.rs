//! wgpu Backend
//!
//! Concrete implementations of the capability interfaces on top of a
//! `wgpu::Device`:
//!
//! - [`WgpuTextureAllocator`]: persistent texture allocation with limit checks
//! - [`HzbComputePipeline`]: the HZB reduction shader and its per-level bind groups
//! - [`replay_render_commands`] / [`replay_compute_commands`]: command replay

pub mod allocator;
pub mod hzb_pipeline;
pub mod replay;

pub use allocator::{WgpuTextureAllocator, validate_texture_desc};
pub use hzb_pipeline::{HzbComputePipeline, HzbLevelParams, hzb_level_params};
pub use replay::{WgpuBindingTable, replay_compute_commands, replay_render_commands};
