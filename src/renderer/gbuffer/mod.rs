//! Deferred G-Buffer Stage
//!
//! Allocates the G-Buffer targets, declares the geometry and HZB passes with
//! the render graph each frame, and exposes the resulting handles to lighting,
//! occlusion culling and debug tooling.
//!
//! # Frame Cycle
//!
//! ```text
//!            init
//!             │
//!        Initialized ──► import_render_targets ──► Imported
//!             ▲                                       │
//!             │                             populate_render_graph
//!         Consumed ◄──────── finish_frame ◄──── Populated
//!             │
//!             └──► import_render_targets (next frame)
//! ```
//!
//! # Persistent Resources
//!
//! | Resource   | Count | Reallocated | Per-frame role                      |
//! |------------|-------|-------------|-------------------------------------|
//! | Depth      | 2     | On resize   | Ping-pong: current (write) / previous (read) |
//! | HZB        | 1     | On resize   | Contents rebuilt from current depth |
//!
//! Color targets are transient: the graph provides fresh ones every frame.
//!
//! # Data Flow
//!
//! ```text
//! VisibilityOutput ──► GBuffer Geometry ──► color[0..4] + depth ──► lighting
//!                                            │
//!                                            └──► GBuffer HZB ──► next frame's culling
//! ```

pub mod debug;
pub mod draw;
pub mod hzb;
pub mod targets;
pub mod visibility;

use std::sync::Arc;

use smallvec::SmallVec;

use crate::errors::{FrameRenderError, InitError};
use crate::renderer::graph::builder::{
    FramebufferBinding, PassDesc, PassKind, RenderGraphBuilder, ResourceAllocator,
    TextureDependency, pass_callback,
};
use crate::renderer::graph::description::{PersistentTexture, RenderTargetDescription};
use crate::renderer::graph::resource::{
    BindGroupId, BufferHandle, PassId, RenderTargetHandle, ResourceAccess,
};
use crate::settings::GBufferSettings;

use self::debug::DebugRenderTarget;
use self::draw::{DrawRecorder, WorkerPool};
use self::hzb::{HzbBindings, hzb_dispatch_commands};
use self::targets::{GBUFFER_COLOR_TARGET_COUNT, GBufferTargetPlan};
use self::visibility::VisibilityOutput;

/// Name of the geometry pass in the render graph.
pub const GEOMETRY_PASS_NAME: &str = "GBuffer Geometry";
/// Name of the HZB generation pass in the render graph.
pub const HZB_PASS_NAME: &str = "GBuffer HZB";

// ─── Frame Inputs ─────────────────────────────────────────────────────────────

/// Per-frame inputs shared by `import_render_targets` and
/// `populate_render_graph`.
pub struct RenderingContext<'a> {
    /// The frame's render graph.
    pub graph: &'a mut dyn RenderGraphBuilder,
    /// Output of this frame's GPU culling.
    pub visibility: &'a VisibilityOutput,
    /// Frame-global bind group (camera + GPU scene).
    pub global_bind_group: BindGroupId,
    /// HZB reduction bindings, one set per depth texture: entry `i` reduces
    /// [`GBuffer::depth_textures`]`[i]` into the HZB.
    pub hzb: [HzbBindings; 2],
}

// ─── Stage State ──────────────────────────────────────────────────────────────

/// Where a [`GBuffer`] is within its frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Resources allocated, no frame started yet.
    Initialized,
    /// Persistent targets registered with this frame's graph.
    Imported,
    /// Geometry and HZB passes declared.
    Populated,
    /// Frame finished; outputs handed downstream.
    Consumed,
}

/// Handles of the current frame. Built fresh by `import_render_targets`,
/// dropped by `finish_frame`.
#[derive(Debug)]
struct RunContext {
    frame: u64,
    color_rts: [RenderTargetHandle; GBUFFER_COLOR_TARGET_COUNT],
    crnt_frame_depth_rt: RenderTargetHandle,
    prev_frame_depth_rt: RenderTargetHandle,
    hzb_rt: RenderTargetHandle,
    visible_aabbs_buffer: Option<BufferHandle>,
    /// Geometry and HZB pass, once declared.
    passes: Option<(PassId, PassId)>,
}

/// The deferred G-Buffer stage.
pub struct GBuffer {
    settings: GBufferSettings,
    plan: GBufferTargetPlan,
    allocator: Arc<dyn ResourceAllocator>,

    depth_rts: [PersistentTexture; 2],
    hzb_rt: PersistentTexture,

    /// Last access declared on each persistent texture.
    depth_access: [ResourceAccess; 2],
    hzb_access: ResourceAccess,

    /// Index into `depth_rts` written by the current frame.
    crnt_depth: usize,
    depth_history_valid: bool,
    hzb_valid: bool,

    recorder: DrawRecorder,
    phase: FramePhase,
    run_ctx: Option<RunContext>,
    frames_completed: u64,
}

impl GBuffer {
    /// Allocates the depth pair, the HZB texture and the recording workers.
    ///
    /// Failure is fatal: the stage cannot run without these resources.
    pub fn init(
        settings: GBufferSettings,
        allocator: Arc<dyn ResourceAllocator>,
    ) -> Result<Self, InitError> {
        settings.validate()?;

        let plan = GBufferTargetPlan::new(&settings);
        let (depth_rts, hzb_rt) = allocate_persistent(&plan, allocator.as_ref())?;
        let workers = WorkerPool::new(settings.resolved_worker_count())?;

        log::info!(
            "GBuffer initialized: {}x{}, {} HZB mips, {} recording workers",
            settings.width,
            settings.height,
            plan.hzb.mip_level_count,
            workers.size()
        );

        let draw_mode = settings.draw_mode;
        Ok(Self {
            settings,
            plan,
            allocator,
            depth_rts,
            hzb_rt,
            depth_access: [ResourceAccess::empty(); 2],
            hzb_access: ResourceAccess::empty(),
            crnt_depth: 0,
            depth_history_valid: false,
            hzb_valid: false,
            recorder: DrawRecorder::new(workers, draw_mode),
            phase: FramePhase::Initialized,
            run_ctx: None,
            frames_completed: 0,
        })
    }

    /// Reallocates every persistent target for a new extent.
    ///
    /// Only legal between frames. Depth history and HZB contents are lost. On
    /// failure the previous targets stay in place.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), InitError> {
        assert!(
            self.run_ctx.is_none(),
            "GBuffer::resize called in the middle of a frame ({:?})",
            self.phase
        );

        let settings = GBufferSettings {
            width,
            height,
            ..self.settings.clone()
        };
        settings.validate()?;

        let plan = GBufferTargetPlan::new(&settings);
        let (depth_rts, hzb_rt) = allocate_persistent(&plan, self.allocator.as_ref())?;

        self.release_persistent();
        self.settings = settings;
        self.plan = plan;
        self.depth_rts = depth_rts;
        self.hzb_rt = hzb_rt;
        self.depth_access = [ResourceAccess::empty(); 2];
        self.hzb_access = ResourceAccess::empty();
        self.crnt_depth = 0;
        self.depth_history_valid = false;
        self.hzb_valid = false;

        log::info!(
            "GBuffer resized to {width}x{height} ({} HZB mips)",
            self.plan.hzb.mip_level_count
        );
        Ok(())
    }

    // ── Frame protocol ─────────────────────────────────────────────────────

    /// Registers the depth pair and the HZB texture with this frame's graph,
    /// carrying over the access state each was left in.
    pub fn import_render_targets(&mut self, ctx: &mut RenderingContext<'_>) {
        assert!(
            matches!(self.phase, FramePhase::Initialized | FramePhase::Consumed),
            "GBuffer::import_render_targets called while the previous frame is still {:?}",
            self.phase
        );

        let frame = ctx.graph.frame_index();
        let crnt = self.crnt_depth;
        let prev = 1 - crnt;

        let crnt_frame_depth_rt = ctx
            .graph
            .import_texture(&self.depth_rts[crnt], self.depth_access[crnt]);
        let prev_frame_depth_rt = if self.depth_history_valid {
            ctx.graph
                .import_texture(&self.depth_rts[prev], self.depth_access[prev])
        } else {
            RenderTargetHandle::NONE
        };
        let hzb_rt = ctx.graph.import_texture(&self.hzb_rt, self.hzb_access);

        self.run_ctx = Some(RunContext {
            frame,
            color_rts: [RenderTargetHandle::NONE; GBUFFER_COLOR_TARGET_COUNT],
            crnt_frame_depth_rt,
            prev_frame_depth_rt,
            hzb_rt,
            visible_aabbs_buffer: None,
            passes: None,
        });
        self.phase = FramePhase::Imported;
    }

    /// Declares the geometry pass and the HZB pass.
    ///
    /// Must be called exactly once per frame, after
    /// [`import_render_targets`](Self::import_render_targets).
    pub fn populate_render_graph(&mut self, ctx: &mut RenderingContext<'_>) {
        assert!(
            self.phase != FramePhase::Populated,
            "GBuffer::populate_render_graph called twice in one frame"
        );
        let (FramePhase::Imported, Some(run)) = (self.phase, self.run_ctx.as_mut()) else {
            panic!("GBuffer::populate_render_graph called before import_render_targets");
        };
        assert!(
            ctx.visibility.is_well_formed(),
            "VisibilityOutput bucket table must be sorted and gap-free"
        );
        assert_eq!(
            run.frame,
            ctx.graph.frame_index(),
            "populate_render_graph received a different frame than import_render_targets"
        );

        let graph = &mut *ctx.graph;
        let visibility = ctx.visibility;

        // Fresh color targets for this frame.
        let color_rts: [RenderTargetHandle; GBUFFER_COLOR_TARGET_COUNT] =
            std::array::from_fn(|slot| graph.new_render_target(&self.plan.color[slot]));

        let index_buffer = graph.import_buffer(visibility.index_buffer, ResourceAccess::INDEX);
        let instance_indices =
            graph.import_buffer(visibility.instance_indices, ResourceAccess::VERTEX);
        let indirect_args = graph.import_buffer(visibility.indirect_args, ResourceAccess::INDIRECT);
        let draw_counts = self
            .settings
            .draw_mode
            .reads_draw_counts()
            .then(|| graph.import_buffer(visibility.draw_counts, ResourceAccess::STORAGE_READ));

        run.visible_aabbs_buffer = if self.settings.debug_visualization {
            match visibility.visible_aabbs {
                Some(range) => Some(graph.import_buffer(range, ResourceAccess::STORAGE_READ)),
                None => {
                    log::warn!(
                        "GBuffer: debug visualization is enabled but culling produced no AABB buffer"
                    );
                    None
                }
            }
        } else {
            None
        };

        // ── Geometry pass ──────────────────────────────────────────────────
        let recorder = self.recorder.clone();
        let vis = visibility.clone();
        let global_bind_group = ctx.global_bind_group;
        let mut geometry = PassDesc::new(
            GEOMETRY_PASS_NAME,
            PassKind::Graphics(FramebufferBinding {
                description: self.plan.framebuffer.clone(),
                color_targets: SmallVec::from_slice(&color_rts),
                depth_target: Some(run.crnt_frame_depth_rt),
            }),
            pass_callback(move |work| {
                recorder.record_into(&vis, global_bind_group, work.allocator, work.commands)
            }),
        );
        for rt in color_rts {
            geometry.texture(TextureDependency::new(rt, ResourceAccess::COLOR_WRITE));
        }
        geometry
            .texture(TextureDependency::new(
                run.crnt_frame_depth_rt,
                ResourceAccess::DEPTH_WRITE | ResourceAccess::DEPTH_READ,
            ))
            .buffer(index_buffer, ResourceAccess::INDEX)
            .buffer(instance_indices, ResourceAccess::VERTEX)
            .buffer(indirect_args, ResourceAccess::INDIRECT);
        if let Some(draw_counts) = draw_counts {
            geometry.buffer(draw_counts, ResourceAccess::STORAGE_READ);
        }
        let geometry_pass = graph.add_pass(geometry);

        // ── HZB pass ───────────────────────────────────────────────────────
        // Level 0 must read the depth texture written this frame.
        let hzb_commands = hzb_dispatch_commands(
            self.settings.width,
            self.settings.height,
            self.plan.hzb.mip_level_count,
            ctx.hzb[self.crnt_depth],
        );
        let mut hzb = PassDesc::new(
            HZB_PASS_NAME,
            PassKind::Compute,
            pass_callback(move |work| work.commands.append_all(hzb_commands.clone())),
        );
        hzb.texture(TextureDependency::new(
            run.crnt_frame_depth_rt,
            ResourceAccess::SAMPLED_COMPUTE,
        ))
        .texture(TextureDependency::new(
            run.hzb_rt,
            ResourceAccess::STORAGE_COMPUTE_WRITE,
        ));
        let hzb_pass = graph.add_pass(hzb);

        run.color_rts = color_rts;
        run.passes = Some((geometry_pass, hzb_pass));
        self.phase = FramePhase::Populated;

        log::debug!(
            "GBuffer frame {}: {} draw slots in {} buckets, {} workers",
            run.frame,
            visibility.slot_count(),
            visibility.buckets.len(),
            self.recorder.worker_count()
        );
    }

    /// Ends the frame with the executor's verdict and returns it.
    ///
    /// On success the depth pair swaps roles and the HZB becomes valid history
    /// for the next frame. On failure the frame is dropped: the targets it was
    /// writing are treated as undefined and no history is carried over.
    pub fn finish_frame(
        &mut self,
        status: Result<(), FrameRenderError>,
    ) -> Result<(), FrameRenderError> {
        let (FramePhase::Populated, Some(run)) = (self.phase, self.run_ctx.take()) else {
            panic!("GBuffer::finish_frame called while {:?}", self.phase);
        };

        match &status {
            Ok(()) => {
                self.depth_access[self.crnt_depth] = ResourceAccess::SAMPLED_COMPUTE;
                self.hzb_access = ResourceAccess::STORAGE_COMPUTE_WRITE;
                self.depth_history_valid = true;
                self.hzb_valid = true;
                self.frames_completed += 1;
            }
            Err(err) => {
                log::error!("GBuffer frame {} dropped: {err}", run.frame);
                self.depth_access[self.crnt_depth] = ResourceAccess::empty();
                self.hzb_access = ResourceAccess::empty();
                self.depth_history_valid = false;
                self.hzb_valid = false;
            }
        }

        self.crnt_depth = 1 - self.crnt_depth;
        self.phase = FramePhase::Consumed;
        status
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    /// Color target `index`. Valid after population, this frame only.
    #[must_use]
    pub fn color_rt(&self, index: usize) -> RenderTargetHandle {
        assert!(
            index < GBUFFER_COLOR_TARGET_COUNT,
            "G-Buffer color target index {index} out of range"
        );
        self.populated().color_rts[index]
    }

    /// Depth target written this frame.
    #[must_use]
    pub fn depth_rt(&self) -> RenderTargetHandle {
        self.imported().crnt_frame_depth_rt
    }

    /// Depth target written last frame, or [`RenderTargetHandle::NONE`] when
    /// there is no history (first frame, after a resize or a dropped frame).
    #[must_use]
    pub fn previous_frame_depth_rt(&self) -> RenderTargetHandle {
        self.imported().prev_frame_depth_rt
    }

    /// HZB texture of this frame. Until the HZB pass runs it holds the
    /// previous frame's pyramid; see [`hzb_is_valid`](Self::hzb_is_valid).
    #[must_use]
    pub fn hzb_rt(&self) -> RenderTargetHandle {
        self.imported().hzb_rt
    }

    /// Color target shown for a debug view.
    #[must_use]
    pub fn debug_render_target(&self, target: DebugRenderTarget) -> RenderTargetHandle {
        self.color_rt(target.color_slot())
    }

    /// Color target shown for a debug view, by registered name.
    ///
    /// # Panics
    ///
    /// When `name` is not one of [`DebugRenderTarget::ALL`]'s names.
    #[must_use]
    pub fn debug_render_target_by_name(&self, name: &str) -> RenderTargetHandle {
        match name.parse::<DebugRenderTarget>() {
            Ok(target) => self.debug_render_target(target),
            Err(err) => panic!("{err}"),
        }
    }

    /// Visible-AABB buffer for debug drawing. `None` unless debug
    /// visualization is enabled and culling produced the buffer.
    #[must_use]
    pub fn visible_aabbs_buffer(&self) -> Option<BufferHandle> {
        self.populated().visible_aabbs_buffer
    }

    /// Geometry and HZB pass ids, once declared this frame.
    #[must_use]
    pub fn pass_ids(&self) -> Option<(PassId, PassId)> {
        self.run_ctx.as_ref().and_then(|run| run.passes)
    }

    /// Whether the HZB holds the pyramid of the last completed frame.
    #[must_use]
    pub fn hzb_is_valid(&self) -> bool {
        self.hzb_valid
    }

    /// The persistent depth pair. Entry `i` pairs with
    /// [`RenderingContext::hzb`]`[i]`.
    #[must_use]
    pub fn depth_textures(&self) -> &[PersistentTexture; 2] {
        &self.depth_rts
    }

    #[must_use]
    pub fn hzb_texture(&self) -> &PersistentTexture {
        &self.hzb_rt
    }

    #[must_use]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[must_use]
    pub fn settings(&self) -> &GBufferSettings {
        &self.settings
    }

    #[must_use]
    pub fn target_plan(&self) -> &GBufferTargetPlan {
        &self.plan
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.recorder.worker_count()
    }

    #[must_use]
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    fn imported(&self) -> &RunContext {
        match (&self.run_ctx, self.phase) {
            (Some(run), FramePhase::Imported | FramePhase::Populated) => run,
            _ => panic!(
                "G-Buffer targets read outside a frame ({:?}); call import_render_targets first",
                self.phase
            ),
        }
    }

    fn populated(&self) -> &RunContext {
        match (&self.run_ctx, self.phase) {
            (Some(run), FramePhase::Populated) => run,
            _ => panic!(
                "G-Buffer color targets read while {:?}; call populate_render_graph first",
                self.phase
            ),
        }
    }

    fn release_persistent(&self) {
        for texture in self.depth_rts.iter().chain(std::iter::once(&self.hzb_rt)) {
            self.allocator.release_texture(texture);
        }
    }
}

impl Drop for GBuffer {
    fn drop(&mut self) {
        self.release_persistent();
    }
}

impl std::fmt::Debug for GBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GBuffer")
            .field("settings", &self.settings)
            .field("phase", &self.phase)
            .field("crnt_depth", &self.crnt_depth)
            .field("depth_history_valid", &self.depth_history_valid)
            .field("hzb_valid", &self.hzb_valid)
            .finish_non_exhaustive()
    }
}

fn allocate_persistent(
    plan: &GBufferTargetPlan,
    allocator: &dyn ResourceAllocator,
) -> Result<([PersistentTexture; 2], PersistentTexture), InitError> {
    let allocate = |desc: &RenderTargetDescription| {
        allocator
            .create_texture(desc)
            .map_err(|source| InitError::Allocation {
                label: desc.label,
                source,
            })
    };

    let depth0 = allocate(&plan.depth[0])?;
    let depth1 = match allocate(&plan.depth[1]) {
        Ok(t) => t,
        Err(err) => {
            allocator.release_texture(&depth0);
            return Err(err);
        }
    };
    let hzb = match allocate(&plan.hzb) {
        Ok(t) => t,
        Err(err) => {
            allocator.release_texture(&depth0);
            allocator.release_texture(&depth1);
            return Err(err);
        }
    };

    Ok(([depth0, depth1], hzb))
}
