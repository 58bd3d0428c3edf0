//! Command Replay
//!
//! Translates recorded [`Command`] streams into wgpu pass calls. Ids are
//! resolved through a [`WgpuBindingTable`] that the embedding renderer fills
//! with the objects it created.

use rustc_hash::FxHashMap;

use crate::errors::ReplayError;
use crate::renderer::backend::hzb_pipeline::HzbComputePipeline;
use crate::renderer::gbuffer::hzb::HzbBindings;
use crate::renderer::graph::command::Command;
use crate::renderer::graph::resource::{BindGroupId, BufferId, PipelineId};

/// Id → wgpu object lookup.
#[derive(Default)]
pub struct WgpuBindingTable {
    render_pipelines: FxHashMap<PipelineId, wgpu::RenderPipeline>,
    compute_pipelines: FxHashMap<PipelineId, wgpu::ComputePipeline>,
    bind_groups: FxHashMap<BindGroupId, wgpu::BindGroup>,
    buffers: FxHashMap<BufferId, wgpu::Buffer>,
    next_pipeline: u32,
    next_bind_group: u32,
    next_buffer: u32,
}

impl WgpuBindingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_render_pipeline(&mut self, pipeline: wgpu::RenderPipeline) -> PipelineId {
        let id = PipelineId(self.next_pipeline);
        self.next_pipeline += 1;
        self.render_pipelines.insert(id, pipeline);
        id
    }

    pub fn add_compute_pipeline(&mut self, pipeline: wgpu::ComputePipeline) -> PipelineId {
        let id = PipelineId(self.next_pipeline);
        self.next_pipeline += 1;
        self.compute_pipelines.insert(id, pipeline);
        id
    }

    pub fn add_bind_group(&mut self, group: wgpu::BindGroup) -> BindGroupId {
        let id = BindGroupId(self.next_bind_group);
        self.next_bind_group += 1;
        self.bind_groups.insert(id, group);
        id
    }

    pub fn add_buffer(&mut self, buffer: wgpu::Buffer) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, buffer);
        id
    }

    /// Registers the HZB pipeline once plus one level-group set per depth
    /// texture of the ping-pong pair.
    ///
    /// Each set gets consecutive ids, as [`HzbBindings::level_group`]
    /// expects.
    pub fn add_hzb_pair(
        &mut self,
        pipeline: &HzbComputePipeline,
        level_groups: [Vec<wgpu::BindGroup>; 2],
    ) -> [HzbBindings; 2] {
        let pipeline = self.add_compute_pipeline(pipeline.pipeline().clone());
        level_groups.map(|groups| {
            let first_level_group = BindGroupId(self.next_bind_group);
            for group in groups {
                self.add_bind_group(group);
            }
            HzbBindings {
                pipeline,
                first_level_group,
            }
        })
    }

    fn bind_group(&self, id: BindGroupId) -> Result<&wgpu::BindGroup, ReplayError> {
        self.bind_groups
            .get(&id)
            .ok_or(ReplayError::UnknownBindGroup(id.0))
    }

    fn buffer(&self, id: BufferId) -> Result<&wgpu::Buffer, ReplayError> {
        self.buffers.get(&id).ok_or(ReplayError::UnknownBuffer(id.0))
    }
}

/// Replays a graphics stream into `pass`.
pub fn replay_render_commands(
    pass: &mut wgpu::RenderPass<'_>,
    commands: &[Command],
    table: &WgpuBindingTable,
) -> Result<(), ReplayError> {
    for command in commands {
        match *command {
            Command::SetPipeline(id) => {
                let pipeline = table
                    .render_pipelines
                    .get(&id)
                    .ok_or(ReplayError::UnknownPipeline(id.0))?;
                pass.set_pipeline(pipeline);
            }
            Command::SetBindGroup { index, group } => {
                pass.set_bind_group(index, table.bind_group(group)?, &[]);
            }
            Command::SetVertexBuffer {
                slot,
                buffer,
                offset,
            } => {
                pass.set_vertex_buffer(slot, table.buffer(buffer)?.slice(offset..));
            }
            Command::SetIndexBuffer { buffer, offset } => {
                pass.set_index_buffer(
                    table.buffer(buffer)?.slice(offset..),
                    wgpu::IndexFormat::Uint32,
                );
            }
            Command::DrawIndexedIndirect { buffer, offset } => {
                pass.draw_indexed_indirect(table.buffer(buffer)?, offset);
            }
            Command::MultiDrawIndexedIndirectCount {
                buffer,
                offset,
                count_buffer,
                count_offset,
                max_count,
            } => {
                pass.multi_draw_indexed_indirect_count(
                    table.buffer(buffer)?,
                    offset,
                    table.buffer(count_buffer)?,
                    count_offset,
                    max_count,
                );
            }
            Command::Dispatch { .. } => {
                return Err(ReplayError::WrongPassKind("Dispatch", "render"));
            }
        }
    }
    Ok(())
}

/// Replays a compute stream into `pass`.
pub fn replay_compute_commands(
    pass: &mut wgpu::ComputePass<'_>,
    commands: &[Command],
    table: &WgpuBindingTable,
) -> Result<(), ReplayError> {
    for command in commands {
        match *command {
            Command::SetPipeline(id) => {
                let pipeline = table
                    .compute_pipelines
                    .get(&id)
                    .ok_or(ReplayError::UnknownPipeline(id.0))?;
                pass.set_pipeline(pipeline);
            }
            Command::SetBindGroup { index, group } => {
                pass.set_bind_group(index, table.bind_group(group)?, &[]);
            }
            Command::Dispatch { x, y, z } => pass.dispatch_workgroups(x, y, z),
            Command::SetVertexBuffer { .. } => {
                return Err(ReplayError::WrongPassKind("SetVertexBuffer", "compute"));
            }
            Command::SetIndexBuffer { .. } => {
                return Err(ReplayError::WrongPassKind("SetIndexBuffer", "compute"));
            }
            Command::DrawIndexedIndirect { .. } => {
                return Err(ReplayError::WrongPassKind("DrawIndexedIndirect", "compute"));
            }
            Command::MultiDrawIndexedIndirectCount { .. } => {
                return Err(ReplayError::WrongPassKind(
                    "MultiDrawIndexedIndirectCount",
                    "compute",
                ));
            }
        }
    }
    Ok(())
}
