//! Debug Render Targets
//!
//! Visualization tooling picks G-Buffer targets by symbolic name. The set of
//! names is closed and fixed at build time; each maps to one color slot.

use std::str::FromStr;

use thiserror::Error;

use crate::renderer::gbuffer::targets::{ALBEDO_SLOT, NORMAL_SLOT, VELOCITY_SLOT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugRenderTarget {
    Albedo,
    Normals,
    Velocity,
}

impl DebugRenderTarget {
    pub const ALL: [Self; 3] = [Self::Albedo, Self::Normals, Self::Velocity];

    /// Name registered with the debug-view tooling.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Albedo => "GBufferAlbedo",
            Self::Normals => "GBufferNormals",
            Self::Velocity => "GBufferVelocity",
        }
    }

    /// Color slot the target shows.
    #[inline]
    #[must_use]
    pub const fn color_slot(self) -> usize {
        match self {
            Self::Albedo => ALBEDO_SLOT,
            Self::Normals => NORMAL_SLOT,
            Self::Velocity => VELOCITY_SLOT,
        }
    }
}

/// Returned by [`DebugRenderTarget::from_str`] for names outside the set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown G-Buffer debug render target '{0}'")]
pub struct UnknownDebugTarget(pub String);

impl FromStr for DebugRenderTarget {
    type Err = UnknownDebugTarget;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| UnknownDebugTarget(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for target in DebugRenderTarget::ALL {
            assert_eq!(target.name().parse::<DebugRenderTarget>(), Ok(target));
        }
    }

    #[test]
    fn slots_match_color_layout() {
        assert_eq!(DebugRenderTarget::Albedo.color_slot(), 0);
        assert_eq!(DebugRenderTarget::Normals.color_slot(), 2);
        assert_eq!(DebugRenderTarget::Velocity.color_slot(), 3);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("GBufferSpecular".parse::<DebugRenderTarget>().is_err());
    }
}
