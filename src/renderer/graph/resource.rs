//! Graph Resource Identifiers
//!
//! Three levels of resource identity meet in the render graph:
//!
//! | Type                 | Lifetime       | Produced by                 |
//! |----------------------|----------------|-----------------------------|
//! | [`TextureId`]        | Until resize   | [`ResourceAllocator`]       |
//! | [`BufferId`]         | Upstream-owned | The culling stage           |
//! | [`RenderTargetHandle`] / [`BufferHandle`] | One frame | [`RenderGraphBuilder`] |
//!
//! Handles are *not* owning references. A handle from frame N must not be
//! used in frame N+1; graph implementations stamp each handle with the frame
//! it was issued in so misuse is detectable.
//!
//! [`ResourceAllocator`]: super::ResourceAllocator
//! [`RenderGraphBuilder`]: super::RenderGraphBuilder

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

// ─── Persistent identities ────────────────────────────────────────────────────

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a persistent GPU texture.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    /// Allocates a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Identity of a GPU buffer owned outside the G-Buffer stage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Byte range inside a [`BufferId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BufferRange {
    pub buffer: BufferId,
    pub offset: u64,
    pub size: u64,
}

impl BufferRange {
    #[must_use]
    pub const fn new(buffer: BufferId, offset: u64, size: u64) -> Self {
        Self {
            buffer,
            offset,
            size,
        }
    }
}

/// Identity of a render or compute pipeline known to the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct PipelineId(pub u32);

/// Identity of a bind group known to the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct BindGroupId(pub u32);

// ─── Frame-scoped handles ─────────────────────────────────────────────────────

/// Frame-scoped reference to a texture registered with the render graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RenderTargetHandle {
    frame: u64,
    index: u32,
}

impl RenderTargetHandle {
    /// "No resource" sentinel. Returned for the previous-frame depth target
    /// while no depth history exists.
    pub const NONE: Self = Self {
        frame: u64::MAX,
        index: u32::MAX,
    };

    #[inline]
    #[must_use]
    pub const fn new(frame: u64, index: u32) -> Self {
        Self { frame, index }
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.index != u32::MAX
    }

    /// Frame the handle was issued in.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> u64 {
        self.frame
    }

    /// Graph-local slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }
}

/// Frame-scoped reference to a buffer registered with the render graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BufferHandle {
    frame: u64,
    index: u32,
}

impl BufferHandle {
    #[inline]
    #[must_use]
    pub const fn new(frame: u64, index: u32) -> Self {
        Self { frame, index }
    }

    #[inline]
    #[must_use]
    pub const fn frame(self) -> u64 {
        self.frame
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }
}

/// Identifier of a declared pass, in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct PassId(pub u32);

// ─── Access ───────────────────────────────────────────────────────────────────

bitflags! {
    /// How a pass touches a resource. The executor derives barriers and pass
    /// ordering from these declarations alone.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct ResourceAccess: u32 {
        const COLOR_WRITE           = 1 << 0;
        const DEPTH_WRITE           = 1 << 1;
        const DEPTH_READ            = 1 << 2;
        const SAMPLED_FRAGMENT      = 1 << 3;
        const SAMPLED_COMPUTE       = 1 << 4;
        const STORAGE_COMPUTE_WRITE = 1 << 5;
        const STORAGE_READ          = 1 << 6;
        const INDIRECT              = 1 << 7;
        const VERTEX                = 1 << 8;
        const INDEX                 = 1 << 9;

        const ALL_WRITE = Self::COLOR_WRITE.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::STORAGE_COMPUTE_WRITE.bits();
    }
}

impl ResourceAccess {
    #[inline]
    #[must_use]
    pub fn is_write(self) -> bool {
        self.intersects(Self::ALL_WRITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_invalid() {
        assert!(!RenderTargetHandle::NONE.is_valid());
        assert!(RenderTargetHandle::new(0, 0).is_valid());
    }

    #[test]
    fn access_write_classification() {
        assert!(ResourceAccess::DEPTH_WRITE.is_write());
        assert!((ResourceAccess::DEPTH_WRITE | ResourceAccess::DEPTH_READ).is_write());
        assert!(!ResourceAccess::SAMPLED_COMPUTE.is_write());
        assert!(!(ResourceAccess::INDIRECT | ResourceAccess::STORAGE_READ).is_write());
        assert!(!ResourceAccess::empty().is_write());
    }

    #[test]
    fn texture_ids_are_unique() {
        assert_ne!(TextureId::next(), TextureId::next());
    }
}
