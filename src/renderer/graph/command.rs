//! Recorded GPU Commands
//!
//! Passes record into [`CommandList`]s of plain-data [`Command`]s instead of
//! talking to the GPU directly. A backend replays the list (see
//! [`crate::renderer::backend`]); tests compare lists for equality.
//!
//! Lists have an optional capacity. Exceeding it is how command-memory
//! exhaustion surfaces: the push fails and the frame is dropped.

use crate::errors::FrameRenderError;
use crate::renderer::graph::resource::{BindGroupId, BufferId, PipelineId};

/// Byte stride of one `DrawIndexedIndirect` argument record
/// (`index_count, instance_count, first_index, base_vertex, first_instance`).
pub const DRAW_INDEXED_INDIRECT_STRIDE: u64 = 20;

/// Byte stride of one `u32` draw-count entry.
pub const DRAW_COUNT_STRIDE: u64 = 4;

/// A single recorded command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Command {
    SetPipeline(PipelineId),
    SetBindGroup {
        index: u32,
        group: BindGroupId,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: BufferId,
        offset: u64,
    },
    /// Binds `u32` indices starting at `offset`.
    SetIndexBuffer {
        buffer: BufferId,
        offset: u64,
    },
    /// Indexed draw whose arguments live in `buffer` at `offset`.
    DrawIndexedIndirect {
        buffer: BufferId,
        offset: u64,
    },
    /// Up to `max_count` indexed draws whose argument records start at
    /// `offset` in `buffer`. The GPU reads the actual count from the `u32` at
    /// `count_offset` in `count_buffer`.
    MultiDrawIndexedIndirectCount {
        buffer: BufferId,
        offset: u64,
        count_buffer: BufferId,
        count_offset: u64,
        max_count: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
}

/// Ordered command sequence with an optional capacity limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandList {
    commands: Vec<Command>,
    capacity: Option<usize>,
    worker: usize,
}

impl CommandList {
    /// Unbounded list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List that fails once it holds `capacity` commands.
    #[must_use]
    pub fn with_capacity_limit(worker: usize, capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity.min(4096)),
            capacity: Some(capacity),
            worker,
        }
    }

    /// Appends a command.
    pub fn push(&mut self, command: Command) -> Result<(), FrameRenderError> {
        if let Some(capacity) = self.capacity
            && self.commands.len() >= capacity
        {
            return Err(FrameRenderError::CommandBufferExhausted {
                worker: self.worker,
                capacity,
            });
        }
        self.commands.push(command);
        Ok(())
    }

    /// Appends every command of `other`, or nothing if they do not all fit.
    pub fn append_all(&mut self, other: Vec<Command>) -> Result<(), FrameRenderError> {
        let available = self.remaining();
        if other.len() > available {
            return Err(FrameRenderError::PrimaryCommandBufferExhausted {
                required: other.len(),
                available,
            });
        }
        self.commands.extend(other);
        Ok(())
    }

    /// Number of further commands the list accepts.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity
            .map_or(usize::MAX, |c| c.saturating_sub(self.commands.len()))
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of draw commands in the list. A count-driven multi-draw
    /// counts once.
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Command::DrawIndexedIndirect { .. }
                        | Command::MultiDrawIndexedIndirectCount { .. }
                )
            })
            .count()
    }
}

/// Source of per-worker secondary command lists.
///
/// Implementations must be shareable across the recording workers.
pub trait CommandAllocator: Send + Sync {
    /// Allocates a secondary list for `worker`, sized for roughly
    /// `estimated_commands` commands.
    fn allocate_secondary(
        &self,
        worker: usize,
        estimated_commands: usize,
    ) -> Result<CommandList, FrameRenderError>;
}

/// Heap-backed allocator with an optional per-list command limit.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapCommandAllocator {
    max_commands_per_list: Option<usize>,
}

impl HeapCommandAllocator {
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_commands_per_list: None,
        }
    }

    /// Every list handed out holds at most `max` commands.
    #[must_use]
    pub const fn with_limit(max: usize) -> Self {
        Self {
            max_commands_per_list: Some(max),
        }
    }
}

impl CommandAllocator for HeapCommandAllocator {
    fn allocate_secondary(
        &self,
        worker: usize,
        estimated_commands: usize,
    ) -> Result<CommandList, FrameRenderError> {
        Ok(match self.max_commands_per_list {
            Some(max) => CommandList::with_capacity_limit(worker, max),
            None => CommandList {
                commands: Vec::with_capacity(estimated_commands),
                capacity: None,
                worker,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_fails_at_capacity() {
        let mut list = CommandList::with_capacity_limit(3, 1);
        list.push(Command::Dispatch { x: 1, y: 1, z: 1 }).unwrap();
        let err = list.push(Command::Dispatch { x: 1, y: 1, z: 1 }).unwrap_err();
        assert_eq!(
            err,
            FrameRenderError::CommandBufferExhausted {
                worker: 3,
                capacity: 1
            }
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn append_all_is_all_or_nothing() {
        let mut list = CommandList::with_capacity_limit(0, 2);
        let batch = vec![Command::SetPipeline(PipelineId(0)); 3];
        assert!(list.append_all(batch).is_err());
        assert!(list.is_empty());

        list.append_all(vec![Command::SetPipeline(PipelineId(0)); 2])
            .unwrap();
        assert_eq!(list.remaining(), 0);
    }
}
