//! Vertical grid plane of the decorative scene

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::camera::CameraUniform;
use crate::config::{GridConfig, LightConfig};
use crate::pipeline::{SurfacePass, UniformSlot};
use crate::vertex::ColorVertex;

/// Offset of the lines in front of the plane
const LINE_LIFT: f32 = 0.01;

/// Grid uniform buffer data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GridUniform {
    /// Combined view-projection matrix
    pub view_proj: [[f32; 4]; 4],
    /// Light direction (xyz) and intensity (w)
    pub light: [f32; 4],
}

impl GridUniform {
    /// Build from a camera and the scene light
    pub fn new(camera: &CameraUniform, light: &LightConfig) -> Self {
        let [x, y, z] = light.direction;
        Self {
            view_proj: camera.view_proj,
            light: [x, y, z, light.intensity],
        }
    }
}

/// CPU-side grid geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridGeometry {
    /// Two triangles covering the plane
    pub plane: Vec<ColorVertex>,
    /// Line list, two vertices per line
    pub lines: Vec<ColorVertex>,
}

impl GridGeometry {
    /// Number of lines in the grid
    pub fn line_count(&self) -> usize {
        self.lines.len() / 2
    }
}

/// Build the plane and its lines.
///
/// The plane lies in XY at `offset_z`, facing +Z. Lines are spaced by
/// `grid_ratio`; every `major_unit_frequency`-th line is drawn at full
/// opacity, the rest at `minor_unit_visibility`.
pub fn build_grid(config: &GridConfig) -> GridGeometry {
    let half_w = config.width * 0.5;
    let half_h = config.height * 0.5;
    let z = config.offset_z;
    let [r, g, b] = config.main_color;
    let plane_color = [r, g, b, config.opacity];

    let corners = [
        [-half_w, -half_h, z],
        [half_w, -half_h, z],
        [half_w, half_h, z],
        [-half_w, half_h, z],
    ];
    let plane = [0, 1, 2, 0, 2, 3]
        .into_iter()
        .map(|i| ColorVertex {
            position: corners[i],
            color: plane_color,
        })
        .collect();

    let mut lines = Vec::new();
    if config.grid_ratio > 0.0 {
        let [r, g, b] = config.line_color;
        let frequency = config.major_unit_frequency.max(1) as i64;
        let color_for = |i: i64| {
            let alpha = if i % frequency == 0 {
                config.opacity
            } else {
                config.opacity * config.minor_unit_visibility
            };
            [r, g, b, alpha]
        };
        let line_z = z + LINE_LIFT;

        let count_x = (half_w / config.grid_ratio).floor() as i64;
        for i in -count_x..=count_x {
            let x = i as f32 * config.grid_ratio;
            let color = color_for(i);
            lines.push(ColorVertex {
                position: [x, -half_h, line_z],
                color,
            });
            lines.push(ColorVertex {
                position: [x, half_h, line_z],
                color,
            });
        }

        let count_y = (half_h / config.grid_ratio).floor() as i64;
        for i in -count_y..=count_y {
            let y = i as f32 * config.grid_ratio;
            let color = color_for(i);
            lines.push(ColorVertex {
                position: [-half_w, y, line_z],
                color,
            });
            lines.push(ColorVertex {
                position: [half_w, y, line_z],
                color,
            });
        }
    }

    GridGeometry { plane, lines }
}

/// Grid renderer
pub struct GridRenderer {
    plane_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    plane_buffer: wgpu::Buffer,
    plane_count: u32,
    line_buffer: wgpu::Buffer,
    line_count: u32,
    uniform: UniformSlot<GridUniform>,
}

impl GridRenderer {
    /// Upload the grid geometry and build its pipelines
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, geometry: &GridGeometry) -> Self {
        let uniform = UniformSlot::new(device, "Grid");
        let shader = include_str!("shaders/grid.wgsl");
        let plane_pipeline = SurfacePass::GridPlane.build(
            device,
            "Grid Plane",
            shader,
            format,
            uniform.layout(),
            ColorVertex::layout(),
        );
        let line_pipeline = SurfacePass::GridLines.build(
            device,
            "Grid Lines",
            shader,
            format,
            uniform.layout(),
            ColorVertex::layout(),
        );

        let plane_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Plane Vertex Buffer"),
            contents: bytemuck::cast_slice(&geometry.plane),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let line_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Line Vertex Buffer"),
            contents: bytemuck::cast_slice(&geometry.lines),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            plane_pipeline,
            line_pipeline,
            plane_buffer,
            plane_count: geometry.plane.len() as u32,
            line_buffer,
            line_count: geometry.lines.len() as u32,
            uniform,
        }
    }

    /// Clear `view` and draw the plane and its lines
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        queue: &wgpu::Queue,
        uniform: &GridUniform,
        clear: wgpu::Color,
    ) {
        self.uniform.write(queue, uniform);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Grid Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, self.uniform.bind_group(), &[]);
        if self.plane_count > 0 {
            render_pass.set_pipeline(&self.plane_pipeline);
            render_pass.set_vertex_buffer(0, self.plane_buffer.slice(..));
            render_pass.draw(0..self.plane_count, 0..1);
        }
        if self.line_count > 0 {
            render_pass.set_pipeline(&self.line_pipeline);
            render_pass.set_vertex_buffer(0, self.line_buffer.slice(..));
            render_pass.draw(0..self.line_count, 0..1);
        }
    }
}
