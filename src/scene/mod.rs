//! Scene-side value types consumed by the renderer.

pub mod fog_volume;

pub use fog_volume::{FogDensityVolume, FogVolumeShape, MIN_FOG_SHAPE_SIZE};
