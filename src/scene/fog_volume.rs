//! Fog Density Volume
//!
//! Box or sphere regions of uniform fog density, uploaded to the GPU scene
//! whenever a setter marks them dirty.

use glam::Vec3;

/// Smallest box edge or sphere radius a fog volume may have (1 cm).
pub const MIN_FOG_SHAPE_SIZE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FogVolumeShape {
    /// Axis-aligned box centred on the volume's position. `extents` is the
    /// full edge length per axis.
    Box { extents: Vec3 },
    Sphere { radius: f32 },
}

/// A region of participating media with uniform density.
///
/// Setters mark the volume dirty; whoever uploads it to the GPU scene clears
/// the flag with [`take_dirty`](Self::take_dirty).
#[derive(Debug, Clone, PartialEq)]
pub struct FogDensityVolume {
    shape: FogVolumeShape,
    world_position: Vec3,
    density: f32,
    dirty: bool,
}

impl Default for FogDensityVolume {
    fn default() -> Self {
        Self {
            shape: FogVolumeShape::Box {
                extents: Vec3::ONE,
            },
            world_position: Vec3::ZERO,
            density: 1.0,
            dirty: true,
        }
    }
}

impl FogDensityVolume {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns the volume into a box. Each axis is clamped to
    /// [`MIN_FOG_SHAPE_SIZE`].
    pub fn set_box_volume_size(&mut self, extents: Vec3) {
        self.shape = FogVolumeShape::Box {
            extents: extents.max(Vec3::splat(MIN_FOG_SHAPE_SIZE)),
        };
        self.dirty = true;
    }

    /// Turns the volume into a sphere. The radius is clamped to
    /// [`MIN_FOG_SHAPE_SIZE`].
    pub fn set_sphere_volume_radius(&mut self, radius: f32) {
        self.shape = FogVolumeShape::Sphere {
            radius: radius.max(MIN_FOG_SHAPE_SIZE),
        };
        self.dirty = true;
    }

    /// # Panics
    ///
    /// When `density` is negative or NaN.
    pub fn set_density(&mut self, density: f32) {
        assert!(density >= 0.0, "fog density must be non-negative, got {density}");
        self.density = density;
        self.dirty = true;
    }

    pub fn set_world_position(&mut self, position: Vec3) {
        self.world_position = position;
        self.dirty = true;
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> FogVolumeShape {
        self.shape
    }

    #[inline]
    #[must_use]
    pub fn is_box(&self) -> bool {
        matches!(self.shape, FogVolumeShape::Box { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_sphere(&self) -> bool {
        matches!(self.shape, FogVolumeShape::Sphere { .. })
    }

    /// Box edge lengths, or `None` for a sphere.
    #[must_use]
    pub fn box_volume_size(&self) -> Option<Vec3> {
        match self.shape {
            FogVolumeShape::Box { extents } => Some(extents),
            FogVolumeShape::Sphere { .. } => None,
        }
    }

    /// Sphere radius, or `None` for a box.
    #[must_use]
    pub fn sphere_volume_radius(&self) -> Option<f32> {
        match self.shape {
            FogVolumeShape::Sphere { radius } => Some(radius),
            FogVolumeShape::Box { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn density(&self) -> f32 {
        self.density
    }

    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// World-space bounding box `(min, max)` of the volume.
    #[must_use]
    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        let half = match self.shape {
            FogVolumeShape::Box { extents } => extents * 0.5,
            FogVolumeShape::Sphere { radius } => Vec3::splat(radius),
        };
        (self.world_position - half, self.world_position + half)
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether the volume changed since the last call, clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_are_clamped_to_minimum_size() {
        let mut volume = FogDensityVolume::new();
        volume.set_box_volume_size(Vec3::new(0.0, 2.0, 0.001));
        assert_eq!(
            volume.box_volume_size(),
            Some(Vec3::new(MIN_FOG_SHAPE_SIZE, 2.0, MIN_FOG_SHAPE_SIZE))
        );

        volume.set_sphere_volume_radius(0.0);
        assert!(volume.is_sphere());
        assert_eq!(volume.sphere_volume_radius(), Some(MIN_FOG_SHAPE_SIZE));
        assert_eq!(volume.box_volume_size(), None);
    }

    #[test]
    fn setters_mark_dirty() {
        let mut volume = FogDensityVolume::new();
        assert!(volume.take_dirty());
        assert!(!volume.is_dirty());

        volume.set_density(0.25);
        assert!(volume.take_dirty());
        assert_eq!(volume.density(), 0.25);
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn negative_density_panics() {
        FogDensityVolume::new().set_density(-1.0);
    }

    #[test]
    fn world_bounds_follow_shape() {
        let mut volume = FogDensityVolume::new();
        volume.set_world_position(Vec3::new(10.0, 0.0, 0.0));
        volume.set_box_volume_size(Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(
            volume.world_bounds(),
            (Vec3::new(9.0, -2.0, -3.0), Vec3::new(11.0, 2.0, 3.0))
        );

        volume.set_sphere_volume_radius(1.5);
        assert_eq!(
            volume.world_bounds(),
            (Vec3::new(8.5, -1.5, -1.5), Vec3::new(11.5, 1.5, 1.5))
        );
    }
}
