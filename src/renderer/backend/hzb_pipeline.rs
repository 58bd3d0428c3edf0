//! HZB Compute Pipeline
//!
//! wgpu implementation of the reduction recorded by
//! [`hzb_dispatch_commands`](crate::renderer::gbuffer::hzb::hzb_dispatch_commands).
//! One bind group per pyramid level; level `k` reads mip `k - 1` (or the depth
//! target for level 0) and writes mip `k`.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::renderer::gbuffer::hzb::hzb_level_extent;
use crate::renderer::gbuffer::targets::HZB_FORMAT;
use crate::settings::GBufferSettings;

/// Uniform block of one reduction level. Mirrors `HzbParams` in
/// `hzb_reduce.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct HzbLevelParams {
    pub src_size: [u32; 2],
    pub dst_size: [u32; 2],
    pub op: u32,
    pub copy_level: u32,
    _pad: [u32; 2],
}

/// Uniform contents for `level` of a `width × height` pyramid.
#[must_use]
pub fn hzb_level_params(width: u32, height: u32, level: u32, op: u32) -> HzbLevelParams {
    let dst = hzb_level_extent(width, height, level);
    let src = if level == 0 {
        dst
    } else {
        hzb_level_extent(width, height, level - 1)
    };
    HzbLevelParams {
        src_size: src.to_array(),
        dst_size: dst.to_array(),
        op,
        copy_level: u32::from(level == 0),
        _pad: [0; 2],
    }
}

pub struct HzbComputePipeline {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
    operator: u32,
}

impl HzbComputePipeline {
    #[must_use]
    pub fn new(device: &wgpu::Device, settings: &GBufferSettings) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("HZB Reduce Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "shaders/hzb_reduce.wgsl"
            ))),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("HZB Reduce Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: HZB_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("HZB Reduce Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("HZB Reduce Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            layout,
            pipeline,
            operator: settings.hzb_reduction.shader_operator(settings.reverse_z),
        }
    }

    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    /// Level bind groups for both depth textures of the ping-pong pair.
    ///
    /// Entry `i` reduces `depth[i]`; pass the result to
    /// [`WgpuBindingTable::add_hzb_pair`](super::replay::WgpuBindingTable::add_hzb_pair).
    #[must_use]
    pub fn create_level_bind_group_pair(
        &self,
        device: &wgpu::Device,
        depth: [&wgpu::Texture; 2],
        hzb: &wgpu::Texture,
    ) -> [Vec<wgpu::BindGroup>; 2] {
        depth.map(|depth| self.create_level_bind_groups(device, depth, hzb))
    }

    /// One bind group per HZB level, in level order.
    ///
    /// Must be rebuilt whenever either texture is reallocated.
    #[must_use]
    pub fn create_level_bind_groups(
        &self,
        device: &wgpu::Device,
        depth: &wgpu::Texture,
        hzb: &wgpu::Texture,
    ) -> Vec<wgpu::BindGroup> {
        let (width, height) = (hzb.width(), hzb.height());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor {
            label: Some("HZB Source Depth"),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });
        let mip_views: Vec<wgpu::TextureView> = (0..hzb.mip_level_count())
            .map(|mip| {
                hzb.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("HZB Mip"),
                    base_mip_level: mip,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        (0..hzb.mip_level_count())
            .map(|level| {
                let params = hzb_level_params(width, height, level, self.operator);
                let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("HZB Level Params"),
                    contents: bytemuck::bytes_of(&params),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let source = if level == 0 {
                    &depth_view
                } else {
                    &mip_views[level as usize - 1]
                };

                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("HZB Level BindGroup"),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(source),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(
                                &mip_views[level as usize],
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: uniforms.as_entire_binding(),
                        },
                    ],
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_is_a_copy() {
        let params = hzb_level_params(1280, 720, 0, 1);
        assert_eq!(params.src_size, [1280, 720]);
        assert_eq!(params.dst_size, [1280, 720]);
        assert_eq!(params.copy_level, 1);
    }

    #[test]
    fn later_levels_read_previous_mip() {
        let params = hzb_level_params(1280, 720, 3, 0);
        assert_eq!(params.src_size, [320, 180]);
        assert_eq!(params.dst_size, [160, 90]);
        assert_eq!(params.copy_level, 0);
    }

    #[test]
    fn params_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<HzbLevelParams>(), 32);
    }
}
