//! Error Types
//!
//! The G-Buffer stage distinguishes two recoverable-error taxonomies that never
//! mix:
//!
//! - [`InitError`]: fatal. Returned from [`GBuffer::init`] and
//!   [`GBuffer::resize`] when a persistent resource cannot be allocated. The
//!   stage cannot operate without its depth pair and HZB texture, so startup
//!   halts.
//! - [`FrameRenderError`]: recoverable at frame granularity. Returned when
//!   command recording runs out of space. The whole frame is dropped; nothing
//!   is partially submitted.
//!
//! Caller sequencing bugs (reading targets before population, populating twice
//! in one frame, unknown debug target names) are not errors. They panic with a
//! message naming the violated contract.
//!
//! [`GBuffer::init`]: crate::renderer::gbuffer::GBuffer::init
//! [`GBuffer::resize`]: crate::renderer::gbuffer::GBuffer::resize

use thiserror::Error;

/// Failure reported by a [`ResourceAllocator`](crate::renderer::graph::ResourceAllocator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// A texture with a zero width, height or mip count was requested.
    #[error("texture extent must be non-zero (got {width}x{height}, {mip_level_count} mips)")]
    ZeroExtent {
        width: u32,
        height: u32,
        mip_level_count: u32,
    },

    /// The requested extent is larger than the device supports.
    #[error("texture extent {requested} exceeds the device limit of {limit}")]
    ExceedsDeviceLimit { requested: u32, limit: u32 },

    /// More mip levels were requested than the extent supports.
    #[error("{requested} mip levels requested, the extent allows at most {max}")]
    TooManyMips { requested: u32, max: u32 },

    /// The backend ran out of memory.
    #[error("out of device memory: {0}")]
    OutOfMemory(String),
}

/// Fatal initialization failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// A persistent render target could not be allocated.
    #[error("failed to allocate render target '{label}': {source}")]
    Allocation {
        /// Debug label of the texture that failed.
        label: &'static str,
        #[source]
        source: AllocationError,
    },

    /// The recording worker pool could not be started.
    #[error("failed to start recording worker pool: {0}")]
    WorkerPool(String),

    /// The supplied settings cannot describe a valid G-Buffer.
    #[error("invalid G-Buffer settings: {0}")]
    InvalidSettings(String),
}

/// Frame-level recording failure. The frame is dropped in its entirety.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameRenderError {
    /// A worker's secondary command list ran out of space.
    #[error("command buffer of worker {worker} exhausted (capacity {capacity})")]
    CommandBufferExhausted { worker: usize, capacity: usize },

    /// The primary command list cannot take the merged worker output.
    #[error("primary command buffer exhausted: {required} commands required, {available} available")]
    PrimaryCommandBufferExhausted { required: usize, available: usize },

    /// A recording worker panicked.
    #[error("recording worker panicked: {0}")]
    WorkerPanicked(String),
}

/// A recorded command could not be replayed on the wgpu backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("pipeline {0} is not registered with the binding table")]
    UnknownPipeline(u32),

    #[error("bind group {0} is not registered with the binding table")]
    UnknownBindGroup(u32),

    #[error("buffer {0} is not registered with the binding table")]
    UnknownBuffer(u32),

    /// A draw command in a compute stream, or a dispatch in a render stream.
    #[error("command {0} cannot be replayed in a {1} pass")]
    WrongPassKind(&'static str, &'static str),
}
