//! Render Graph Capability Interfaces
//!
//! The G-Buffer stage does not own a render-graph executor or a GPU device.
//! It talks to both through the traits in this module, which keeps its own
//! logic (target planning, dependency declaration, draw partitioning, HZB
//! policy) testable against [`RecordingGraph`](super::RecordingGraph).
//!
//! # Frame Protocol
//!
//! ```text
//! import_texture / import_buffer     (persistent + upstream resources)
//!          │
//! new_render_target                  (transient, this frame only)
//!          │
//! add_pass { reads, writes, work }   (declaration, single-threaded)
//!          │
//!     executor runs `work` once the pass's dependencies are satisfied
//! ```

use smallvec::SmallVec;

use crate::errors::{AllocationError, FrameRenderError};
use crate::renderer::graph::command::{CommandAllocator, CommandList};
use crate::renderer::graph::description::{
    FramebufferDescription, PersistentTexture, RenderTargetDescription,
};
use crate::renderer::graph::resource::{
    BufferHandle, BufferRange, PassId, RenderTargetHandle, ResourceAccess,
};

/// Creates and releases persistent GPU textures.
pub trait ResourceAllocator {
    fn create_texture(
        &self,
        desc: &RenderTargetDescription,
    ) -> Result<PersistentTexture, AllocationError>;

    /// Releases a texture returned by [`create_texture`](Self::create_texture).
    /// Unknown ids are ignored.
    fn release_texture(&self, texture: &PersistentTexture);
}

/// Texture dependency of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDependency {
    pub handle: RenderTargetHandle,
    pub access: ResourceAccess,
}

impl TextureDependency {
    #[must_use]
    pub fn new(handle: RenderTargetHandle, access: ResourceAccess) -> Self {
        Self { handle, access }
    }
}

/// Buffer dependency of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDependency {
    pub handle: BufferHandle,
    pub access: ResourceAccess,
}

/// Attachments bound by a graphics pass.
#[derive(Clone, Debug, PartialEq)]
pub struct FramebufferBinding {
    pub description: FramebufferDescription,
    pub color_targets: SmallVec<[RenderTargetHandle; 8]>,
    pub depth_target: Option<RenderTargetHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PassKind {
    Graphics(FramebufferBinding),
    Compute,
}

/// Context handed to a pass's work callback when the executor runs it.
pub struct PassWorkContext<'a> {
    /// Allocator for per-worker secondary lists.
    pub allocator: &'a dyn CommandAllocator,
    /// The pass's primary command list.
    pub commands: &'a mut CommandList,
}

/// Work callback of a pass.
pub type PassCallback =
    Box<dyn Fn(&mut PassWorkContext<'_>) -> Result<(), FrameRenderError> + Send + Sync>;

/// Boxes a closure as a [`PassCallback`].
pub fn pass_callback<F>(work: F) -> PassCallback
where
    F: Fn(&mut PassWorkContext<'_>) -> Result<(), FrameRenderError> + Send + Sync + 'static,
{
    Box::new(work)
}

/// A pass declaration: what it touches and what it does.
pub struct PassDesc {
    pub name: &'static str,
    pub kind: PassKind,
    pub textures: SmallVec<[TextureDependency; 8]>,
    pub buffers: SmallVec<[BufferDependency; 4]>,
    pub work: PassCallback,
}

impl PassDesc {
    #[must_use]
    pub fn new(name: &'static str, kind: PassKind, work: PassCallback) -> Self {
        Self {
            name,
            kind,
            textures: SmallVec::new(),
            buffers: SmallVec::new(),
            work,
        }
    }

    pub fn texture(&mut self, dependency: TextureDependency) -> &mut Self {
        self.textures.push(dependency);
        self
    }

    pub fn buffer(&mut self, handle: BufferHandle, access: ResourceAccess) -> &mut Self {
        self.buffers.push(BufferDependency { handle, access });
        self
    }
}

impl std::fmt::Debug for PassDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassDesc")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("textures", &self.textures)
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

/// Declaration surface of a render-graph executor for one frame.
pub trait RenderGraphBuilder {
    /// Index of the frame being built.
    fn frame_index(&self) -> u64;

    /// Registers a persistent texture whose last known access is `access`.
    fn import_texture(
        &mut self,
        texture: &PersistentTexture,
        access: ResourceAccess,
    ) -> RenderTargetHandle;

    /// Creates a render target that lives for this frame only.
    fn new_render_target(&mut self, desc: &RenderTargetDescription) -> RenderTargetHandle;

    /// Registers an externally owned buffer range.
    fn import_buffer(&mut self, range: BufferRange, access: ResourceAccess) -> BufferHandle;

    /// Declares a pass. Passes are identified in declaration order.
    fn add_pass(&mut self, pass: PassDesc) -> PassId;
}
