//! Model viewer mesh renderer

use bytemuck::{Pod, Zeroable};
use cp_kernel::TriangleMesh;
use wgpu::util::DeviceExt;

use crate::pipeline::{SurfacePass, UniformSlot};
use crate::vertex::MeshVertex;

/// Depth buffer format
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Mesh uniform buffer data
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshUniform {
    /// Combined view-projection matrix
    pub view_proj: [[f32; 4]; 4],
    /// Material base color (RGBA)
    pub base_color: [f32; 4],
    /// Direction toward the key light (w unused)
    pub light_dir: [f32; 4],
    /// x: exposure, y: shadow intensity, z: ambient, w unused
    pub params: [f32; 4],
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct DepthTarget {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Renders a single mesh with a headlight-style key light
pub struct MeshRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform: UniformSlot<MeshUniform>,
    mesh: Option<GpuMesh>,
    depth: Option<DepthTarget>,
}

impl MeshRenderer {
    /// Build the pipeline for `format`
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let uniform = UniformSlot::new(device, "Mesh");
        let pipeline = SurfacePass::Mesh.build(
            device,
            "Mesh",
            include_str!("shaders/mesh.wgsl"),
            format,
            uniform.layout(),
            MeshVertex::layout(),
        );

        Self {
            pipeline,
            uniform,
            mesh: None,
            depth: None,
        }
    }

    /// Replace the uploaded mesh
    pub fn upload(&mut self, device: &wgpu::Device, mesh: &TriangleMesh) {
        let vertices: Vec<MeshVertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(&position, &normal)| MeshVertex { position, normal })
            .collect();

        tracing::debug!(
            vertices = vertices.len(),
            triangles = mesh.triangle_count(),
            "Uploading mesh"
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.mesh = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        });
    }

    /// Drop the uploaded mesh
    pub fn clear(&mut self) {
        self.mesh = None;
    }

    /// Check if a mesh is uploaded
    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    fn ensure_depth(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let stale = self
            .depth
            .as_ref()
            .is_none_or(|depth| depth.width != width || depth.height != height);
        if stale {
            tracing::debug!(width, height, "Creating mesh depth texture");
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Mesh Depth Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.depth = Some(DepthTarget {
                view,
                width,
                height,
            });
        }
    }

    /// Clear `view` to transparent and draw the mesh, if any
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        uniform: &MeshUniform,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        self.uniform.write(queue, uniform);
        self.ensure_depth(device, width, height);
        let Some(depth) = self.depth.as_ref() else {
            return;
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(mesh) = &self.mesh {
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, self.uniform.bind_group(), &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
