//! Recording Render Graph
//!
//! An in-memory [`RenderGraphBuilder`] that records every import and pass
//! declaration, derives pass dependencies from the declared read/write sets,
//! and executes the work callbacks sequentially in declaration order.
//!
//! It stands in for a real executor wherever no GPU is available: tests use it
//! to inspect what the G-Buffer stage declared and to capture the command
//! lists each pass submits.
//!
//! # Dependency Rule
//!
//! Pass `B` depends on an earlier pass `A` when both touch the same handle
//! and at least one of them writes it
//! (read-after-write, write-after-write or write-after-read).

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::FrameRenderError;
use crate::renderer::graph::builder::{
    BufferDependency, PassDesc, PassKind, PassWorkContext, RenderGraphBuilder, TextureDependency,
};
use crate::renderer::graph::command::{CommandAllocator, CommandList, HeapCommandAllocator};
use crate::renderer::graph::description::{PersistentTexture, RenderTargetDescription};
use crate::renderer::graph::resource::{
    BufferHandle, BufferRange, PassId, RenderTargetHandle, ResourceAccess, TextureId,
};

// ─── Internal Types ───────────────────────────────────────────────────────────

enum TextureOrigin {
    Imported {
        id: TextureId,
        desc: RenderTargetDescription,
        access: ResourceAccess,
    },
    Transient(RenderTargetDescription),
}

struct ImportedBuffer {
    range: BufferRange,
    access: ResourceAccess,
}

// ─── Recording Graph ──────────────────────────────────────────────────────────

pub struct RecordingGraph {
    frame: u64,
    textures: Vec<TextureOrigin>,
    buffers: Vec<ImportedBuffer>,
    passes: Vec<PassDesc>,
    allocator: Box<dyn CommandAllocator>,
    primary_capacity: Option<usize>,
    submitted: FxHashMap<PassId, CommandList>,
}

impl RecordingGraph {
    /// Empty graph for `frame` with an unbounded command allocator.
    #[must_use]
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            textures: Vec::new(),
            buffers: Vec::new(),
            passes: Vec::new(),
            allocator: Box::new(HeapCommandAllocator::unbounded()),
            primary_capacity: None,
            submitted: FxHashMap::default(),
        }
    }

    /// Replaces the secondary command allocator used during execution.
    #[must_use]
    pub fn with_allocator(mut self, allocator: impl CommandAllocator + 'static) -> Self {
        self.allocator = Box::new(allocator);
        self
    }

    /// Limits every pass's primary command list to `capacity` commands.
    #[must_use]
    pub fn with_primary_capacity(mut self, capacity: usize) -> Self {
        self.primary_capacity = Some(capacity);
        self
    }

    // ── Declaration queries ────────────────────────────────────────────────

    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    #[must_use]
    pub fn pass_name(&self, id: PassId) -> &'static str {
        self.passes[id.0 as usize].name
    }

    #[must_use]
    pub fn pass_kind(&self, id: PassId) -> &PassKind {
        &self.passes[id.0 as usize].kind
    }

    #[must_use]
    pub fn pass_textures(&self, id: PassId) -> &[TextureDependency] {
        &self.passes[id.0 as usize].textures
    }

    #[must_use]
    pub fn pass_buffers(&self, id: PassId) -> &[BufferDependency] {
        &self.passes[id.0 as usize].buffers
    }

    /// First pass declared under `name`.
    #[must_use]
    pub fn find_pass(&self, name: &str) -> Option<PassId> {
        self.passes
            .iter()
            .position(|p| p.name == name)
            .map(|i| PassId(i as u32))
    }

    /// Persistent texture behind an imported handle.
    #[must_use]
    pub fn imported_texture(&self, handle: RenderTargetHandle) -> Option<TextureId> {
        match self.texture_origin(handle)? {
            TextureOrigin::Imported { id, .. } => Some(*id),
            TextureOrigin::Transient(_) => None,
        }
    }

    /// Access state an imported texture was registered with.
    #[must_use]
    pub fn import_access(&self, handle: RenderTargetHandle) -> Option<ResourceAccess> {
        match self.texture_origin(handle)? {
            TextureOrigin::Imported { access, .. } => Some(*access),
            TextureOrigin::Transient(_) => None,
        }
    }

    /// Description of any texture registered with the graph.
    #[must_use]
    pub fn texture_desc(&self, handle: RenderTargetHandle) -> Option<&RenderTargetDescription> {
        match self.texture_origin(handle)? {
            TextureOrigin::Imported { desc, .. } | TextureOrigin::Transient(desc) => Some(desc),
        }
    }

    /// Whether `handle` names a transient render target of this frame.
    #[must_use]
    pub fn is_transient(&self, handle: RenderTargetHandle) -> bool {
        matches!(self.texture_origin(handle), Some(TextureOrigin::Transient(_)))
    }

    #[must_use]
    pub fn imported_buffer(&self, handle: BufferHandle) -> Option<BufferRange> {
        if handle.frame() != self.frame {
            return None;
        }
        self.buffers.get(handle.index() as usize).map(|b| b.range)
    }

    #[must_use]
    pub fn buffer_import_access(&self, handle: BufferHandle) -> Option<ResourceAccess> {
        if handle.frame() != self.frame {
            return None;
        }
        self.buffers.get(handle.index() as usize).map(|b| b.access)
    }

    /// Earlier passes that `id` must run after.
    #[must_use]
    pub fn dependencies(&self, id: PassId) -> SmallVec<[PassId; 4]> {
        let pass = &self.passes[id.0 as usize];
        let mut deps = SmallVec::new();

        for (index, earlier) in self.passes[..id.0 as usize].iter().enumerate() {
            let texture_conflict = pass.textures.iter().any(|a| {
                earlier.textures.iter().any(|b| {
                    a.handle == b.handle && (a.access.is_write() || b.access.is_write())
                })
            });
            let buffer_conflict = pass.buffers.iter().any(|a| {
                earlier.buffers.iter().any(|b| {
                    a.handle == b.handle && (a.access.is_write() || b.access.is_write())
                })
            });

            if texture_conflict || buffer_conflict {
                deps.push(PassId(index as u32));
            }
        }
        deps
    }

    // ── Execution ──────────────────────────────────────────────────────────

    /// Runs every declared pass in order, stopping at the first failure.
    ///
    /// A failing pass submits nothing, and no later pass runs.
    pub fn execute(&mut self) -> Result<(), FrameRenderError> {
        for index in 0..self.passes.len() {
            let id = PassId(index as u32);
            let mut commands = match self.primary_capacity {
                Some(capacity) => CommandList::with_capacity_limit(usize::MAX, capacity),
                None => CommandList::new(),
            };

            let pass = &self.passes[index];
            let mut ctx = PassWorkContext {
                allocator: self.allocator.as_ref(),
                commands: &mut commands,
            };
            if let Err(err) = (pass.work)(&mut ctx) {
                log::error!("Pass '{}' failed: {err}", pass.name);
                return Err(err);
            }

            self.submitted.insert(id, commands);
        }
        Ok(())
    }

    /// Commands a pass submitted during [`execute`](Self::execute).
    #[must_use]
    pub fn submitted(&self, id: PassId) -> Option<&CommandList> {
        self.submitted.get(&id)
    }

    fn texture_origin(&self, handle: RenderTargetHandle) -> Option<&TextureOrigin> {
        if !handle.is_valid() || handle.frame() != self.frame {
            return None;
        }
        self.textures.get(handle.index() as usize)
    }

    fn assert_current(&self, pass: &PassDesc) {
        for dep in &pass.textures {
            assert!(
                dep.handle.frame() == self.frame
                    && (dep.handle.index() as usize) < self.textures.len(),
                "pass '{}' references render target {:?} not issued in frame {}",
                pass.name,
                dep.handle,
                self.frame
            );
        }
        for dep in &pass.buffers {
            assert!(
                dep.handle.frame() == self.frame
                    && (dep.handle.index() as usize) < self.buffers.len(),
                "pass '{}' references buffer {:?} not issued in frame {}",
                pass.name,
                dep.handle,
                self.frame
            );
        }
    }
}

impl RenderGraphBuilder for RecordingGraph {
    fn frame_index(&self) -> u64 {
        self.frame
    }

    fn import_texture(
        &mut self,
        texture: &PersistentTexture,
        access: ResourceAccess,
    ) -> RenderTargetHandle {
        let handle = RenderTargetHandle::new(self.frame, self.textures.len() as u32);
        self.textures.push(TextureOrigin::Imported {
            id: texture.id,
            desc: texture.desc.clone(),
            access,
        });
        handle
    }

    fn new_render_target(&mut self, desc: &RenderTargetDescription) -> RenderTargetHandle {
        let handle = RenderTargetHandle::new(self.frame, self.textures.len() as u32);
        self.textures.push(TextureOrigin::Transient(desc.clone()));
        handle
    }

    fn import_buffer(&mut self, range: BufferRange, access: ResourceAccess) -> BufferHandle {
        let handle = BufferHandle::new(self.frame, self.buffers.len() as u32);
        self.buffers.push(ImportedBuffer { range, access });
        handle
    }

    fn add_pass(&mut self, pass: PassDesc) -> PassId {
        self.assert_current(&pass);
        let id = PassId(self.passes.len() as u32);
        self.passes.push(pass);
        id
    }
}
