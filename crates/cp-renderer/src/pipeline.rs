//! Render pipelines and uniform bindings shared by the scene and the viewer
//!
//! Every pipeline here uses one uniform buffer at group 0, binding 0, a
//! single vertex buffer and a WGSL module with `vs_main` / `fs_main`.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::mesh::DEPTH_FORMAT;

/// A uniform buffer with its layout and bind group
pub struct UniformSlot<T> {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformSlot<T> {
    /// Allocate a buffer sized for `T`, visible to both shader stages
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Uniform Layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniform Buffer")),
            size: std::mem::size_of::<T>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Uniform Bind Group")),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            layout,
            buffer,
            bind_group,
            _marker: PhantomData,
        }
    }

    /// Queue an update of the buffer content
    pub fn write(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }

    /// Layout to build pipelines against
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Bind group for group 0
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// The kinds of draw this crate issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePass {
    /// Translucent grid plane, no depth
    GridPlane,
    /// Grid lines drawn over the plane, no depth
    GridLines,
    /// Lit model triangles with depth testing
    Mesh,
}

impl SurfacePass {
    /// Primitive topology of the pass
    pub fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            SurfacePass::GridLines => wgpu::PrimitiveTopology::LineList,
            SurfacePass::GridPlane | SurfacePass::Mesh => wgpu::PrimitiveTopology::TriangleList,
        }
    }

    /// Depth state, `None` when the pass has no depth attachment
    pub fn depth_stencil(self) -> Option<wgpu::DepthStencilState> {
        match self {
            SurfacePass::Mesh => Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            SurfacePass::GridPlane | SurfacePass::GridLines => None,
        }
    }

    /// Build the pipeline for this pass.
    ///
    /// Output is alpha blended so the viewer can be composited over the scene.
    pub fn build(
        self,
        device: &wgpu::Device,
        label: &str,
        shader_source: &str,
        format: wgpu::TextureFormat,
        uniform_layout: &wgpu::BindGroupLayout,
        vertex_layout: wgpu::VertexBufferLayout<'_>,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} Shader")),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{label} Pipeline")),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: self.topology(),
                ..Default::default()
            },
            depth_stencil: self.depth_stencil(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}
