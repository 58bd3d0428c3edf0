//! Render Graph Interfaces
//!
//! - [`RenderGraphBuilder`] / [`ResourceAllocator`]: what a stage needs from
//!   the executor and the device
//! - [`CommandList`] / [`Command`]: plain-data recorded GPU work
//! - [`TrackedCommandStream`]: redundant-state filtering on merge
//! - [`RecordingGraph`]: in-memory executor

pub mod builder;
pub mod command;
pub mod description;
pub mod pass;
pub mod recording;
pub mod resource;

pub use builder::{
    BufferDependency, FramebufferBinding, PassCallback, PassDesc, PassKind, PassWorkContext,
    RenderGraphBuilder, ResourceAllocator, TextureDependency, pass_callback,
};
pub use command::{
    Command, CommandAllocator, CommandList, DRAW_COUNT_STRIDE, DRAW_INDEXED_INDIRECT_STRIDE,
    HeapCommandAllocator,
};
pub use description::{
    ColorAttachmentDescription, DepthAttachmentDescription, FramebufferDescription,
    PersistentTexture, RenderTargetDescription,
};
pub use pass::TrackedCommandStream;
pub use recording::RecordingGraph;
pub use resource::{
    BindGroupId, BufferHandle, BufferId, BufferRange, PassId, PipelineId, RenderTargetHandle,
    ResourceAccess, TextureId,
};
