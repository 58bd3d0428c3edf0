//! State-Tracked Command Stream
//!
//! Avoids redundant state changes when secondary command lists are merged into
//! a primary stream. Each worker has to bind its own pipeline and bind groups
//! because it starts from an empty state; after concatenation most of those
//! bindings repeat what the previous worker left bound and are dropped here.
//!
//! The filtering is what makes the merged stream independent of how many
//! workers recorded it.

use crate::renderer::graph::command::Command;
use crate::renderer::graph::resource::{BindGroupId, BufferId, PipelineId};

/// Maximum bind group slots tracked.
const MAX_BIND_GROUPS: usize = 4;
/// Maximum vertex buffer slots tracked.
const MAX_VERTEX_BUFFERS: usize = 8;

#[derive(Default)]
pub struct TrackedCommandStream {
    commands: Vec<Command>,
    current_pipeline: Option<PipelineId>,
    current_bind_groups: [Option<BindGroupId>; MAX_BIND_GROUPS],
    current_vertex_buffers: [Option<(BufferId, u64)>; MAX_VERTEX_BUFFERS],
    current_index_buffer: Option<(BufferId, u64)>,
}

impl TrackedCommandStream {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Appends `command` unless it re-binds state that is already bound.
    pub fn push(&mut self, command: Command) {
        let redundant = match command {
            Command::SetPipeline(id) => {
                let same = self.current_pipeline == Some(id);
                self.current_pipeline = Some(id);
                same
            }
            Command::SetBindGroup { index, group } => {
                let slot = &mut self.current_bind_groups[index as usize];
                let same = *slot == Some(group);
                *slot = Some(group);
                same
            }
            Command::SetVertexBuffer {
                slot,
                buffer,
                offset,
            } => {
                let slot = &mut self.current_vertex_buffers[slot as usize];
                let same = *slot == Some((buffer, offset));
                *slot = Some((buffer, offset));
                same
            }
            Command::SetIndexBuffer { buffer, offset } => {
                let same = self.current_index_buffer == Some((buffer, offset));
                self.current_index_buffer = Some((buffer, offset));
                same
            }
            Command::DrawIndexedIndirect { .. }
            | Command::MultiDrawIndexedIndirectCount { .. }
            | Command::Dispatch { .. } => false,
        };

        if !redundant {
            self.commands.push(command);
        }
    }

    pub fn extend<I: IntoIterator<Item = Command>>(&mut self, commands: I) {
        for command in commands {
            self.push(command);
        }
    }

    #[must_use]
    pub fn finish(self) -> Vec<Command> {
        self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_bindings_are_dropped() {
        let mut stream = TrackedCommandStream::default();
        stream.push(Command::SetPipeline(PipelineId(1)));
        stream.push(Command::SetBindGroup {
            index: 0,
            group: BindGroupId(7),
        });
        stream.push(Command::SetPipeline(PipelineId(1)));
        stream.push(Command::SetBindGroup {
            index: 0,
            group: BindGroupId(7),
        });
        stream.push(Command::SetBindGroup {
            index: 1,
            group: BindGroupId(7),
        });
        stream.push(Command::SetPipeline(PipelineId(2)));

        let out = stream.finish();
        assert_eq!(out.len(), 4);
        assert_eq!(out[3], Command::SetPipeline(PipelineId(2)));
    }

    #[test]
    fn draws_are_never_dropped() {
        let mut stream = TrackedCommandStream::default();
        let draw = Command::DrawIndexedIndirect {
            buffer: BufferId(0),
            offset: 0,
        };
        stream.push(draw);
        stream.push(draw);
        assert_eq!(stream.finish().len(), 2);
    }

    #[test]
    fn vertex_buffer_offset_change_is_kept() {
        let mut stream = TrackedCommandStream::default();
        for offset in [0, 0, 16] {
            stream.push(Command::SetVertexBuffer {
                slot: 0,
                buffer: BufferId(3),
                offset,
            });
        }
        assert_eq!(stream.finish().len(), 2);
    }
}
