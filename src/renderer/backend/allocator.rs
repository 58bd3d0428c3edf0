//! wgpu Texture Allocator
//!
//! Owns the persistent `wgpu::Texture`s behind [`PersistentTexture`] ids.
//! Requests are checked against the device limits before anything reaches the
//! device, so an impossible extent surfaces as an [`AllocationError`] instead
//! of a validation panic inside wgpu.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::errors::AllocationError;
use crate::renderer::graph::builder::ResourceAllocator;
use crate::renderer::graph::description::{PersistentTexture, RenderTargetDescription};
use crate::renderer::graph::resource::TextureId;

/// Checks `desc` against `limits`.
pub fn validate_texture_desc(
    desc: &RenderTargetDescription,
    limits: &wgpu::Limits,
) -> Result<(), AllocationError> {
    if desc.width == 0 || desc.height == 0 || desc.mip_level_count == 0 {
        return Err(AllocationError::ZeroExtent {
            width: desc.width,
            height: desc.height,
            mip_level_count: desc.mip_level_count,
        });
    }

    let requested = desc.width.max(desc.height);
    let limit = limits.max_texture_dimension_2d;
    if requested > limit {
        return Err(AllocationError::ExceedsDeviceLimit { requested, limit });
    }

    let max = requested.ilog2() + 1;
    if desc.mip_level_count > max {
        return Err(AllocationError::TooManyMips {
            requested: desc.mip_level_count,
            max,
        });
    }
    Ok(())
}

pub struct WgpuTextureAllocator {
    device: wgpu::Device,
    limits: wgpu::Limits,
    textures: Mutex<FxHashMap<TextureId, wgpu::Texture>>,
}

impl WgpuTextureAllocator {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            device: device.clone(),
            limits: device.limits(),
            textures: Mutex::new(FxHashMap::default()),
        }
    }

    /// The wgpu texture behind `id`, if it is still alive.
    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<wgpu::Texture> {
        self.textures.lock().get(&id).cloned()
    }
}

impl ResourceAllocator for WgpuTextureAllocator {
    fn create_texture(
        &self,
        desc: &RenderTargetDescription,
    ) -> Result<PersistentTexture, AllocationError> {
        validate_texture_desc(desc, &self.limits)?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });

        let id = TextureId::next();
        self.textures.lock().insert(id, texture);
        log::debug!(
            "Allocated '{}' ({}x{}, {} mips, {:?}) as texture {}",
            desc.label,
            desc.width,
            desc.height,
            desc.mip_level_count,
            desc.format,
            id.raw()
        );

        Ok(PersistentTexture {
            id,
            desc: desc.clone(),
        })
    }

    fn release_texture(&self, texture: &PersistentTexture) {
        if let Some(gpu) = self.textures.lock().remove(&texture.id) {
            gpu.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(width: u32, height: u32, mips: u32) -> RenderTargetDescription {
        RenderTargetDescription::new(
            "test",
            width,
            height,
            wgpu::TextureFormat::R32Float,
            wgpu::TextureUsages::STORAGE_BINDING,
        )
        .with_mip_level_count(mips)
    }

    #[test]
    fn zero_extent_is_rejected() {
        let limits = wgpu::Limits::default();
        assert!(matches!(
            validate_texture_desc(&desc(0, 720, 1), &limits),
            Err(AllocationError::ZeroExtent { width: 0, .. })
        ));
    }

    #[test]
    fn extent_above_limit_is_rejected() {
        let limits = wgpu::Limits::default();
        let too_big = limits.max_texture_dimension_2d + 1;
        assert_eq!(
            validate_texture_desc(&desc(too_big, 16, 1), &limits),
            Err(AllocationError::ExceedsDeviceLimit {
                requested: too_big,
                limit: limits.max_texture_dimension_2d,
            })
        );
    }

    #[test]
    fn mip_count_is_bounded_by_larger_axis() {
        let limits = wgpu::Limits::default();
        assert!(validate_texture_desc(&desc(1280, 720, 11), &limits).is_ok());
        assert_eq!(
            validate_texture_desc(&desc(1280, 720, 12), &limits),
            Err(AllocationError::TooManyMips {
                requested: 12,
                max: 11
            })
        );
    }
}
