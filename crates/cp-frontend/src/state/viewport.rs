//! Viewport rendering state
//!
//! Owns the two viewport surfaces (decorative scene and model viewer) and,
//! when a GPU is available, the offscreen textures they draw into.

use std::sync::Arc;

use cp_core::{ResourceUrl, SharedRegistry};
use cp_renderer::{
    DecorativeScene, MeshRenderer, ModelViewer, SceneConfig, ViewerError, ViewerOptions,
};
use parking_lot::Mutex;

/// Offscreen texture registered with egui
pub struct RenderTarget {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    egui_texture_id: egui::TextureId,
    width: u32,
    height: u32,
}

impl RenderTarget {
    fn create(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        egui_renderer: &mut egui_wgpu::Renderer,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let egui_texture_id =
            egui_renderer.register_native_texture(device, &view, wgpu::FilterMode::Linear);

        Self {
            texture,
            view,
            egui_texture_id,
            width,
            height,
        }
    }

    /// Make sure `slot` holds a target of the requested size
    pub fn ensure<'a>(
        slot: &'a mut Option<RenderTarget>,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        egui_renderer: &mut egui_wgpu::Renderer,
        label: &str,
    ) -> &'a RenderTarget {
        let width = width.max(1);
        let height = height.max(1);

        let stale = slot
            .as_ref()
            .is_some_and(|t| t.width != width || t.height != height);
        if stale {
            Self::release(slot, egui_renderer);
        }
        slot.get_or_insert_with(|| {
            Self::create(device, format, width, height, egui_renderer, label)
        })
    }

    /// Free the target in `slot`, if any
    pub fn release(slot: &mut Option<RenderTarget>, egui_renderer: &mut egui_wgpu::Renderer) {
        if let Some(old) = slot.take() {
            egui_renderer.free_texture(&old.egui_texture_id);
        }
    }

    /// Texture id for painting with egui
    pub fn texture_id(&self) -> egui::TextureId {
        self.egui_texture_id
    }
}

/// GPU side of the viewport
struct ViewportGpu {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    format: wgpu::TextureFormat,
    mesh_renderer: MeshRenderer,
    uploaded_generation: u64,
    scene_target: Option<RenderTarget>,
    viewer_target: Option<RenderTarget>,
}

/// Textures drawn this frame, bottom to top
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportTextures {
    pub scene: Option<egui::TextureId>,
    pub viewer: Option<egui::TextureId>,
}

/// Viewport rendering state
pub struct ViewportState {
    pub viewer: ModelViewer,
    scene: Option<DecorativeScene>,
    scene_config: SceneConfig,
    size: (u32, u32),
    gpu: Option<ViewportGpu>,
}

impl ViewportState {
    /// Create the viewport; GPU resources are only built with a render state
    pub fn new(
        viewer_options: ViewerOptions,
        scene_config: SceneConfig,
        registry: SharedRegistry,
        render_state: Option<&egui_wgpu::RenderState>,
    ) -> Self {
        let gpu = render_state.map(|render_state| {
            let device = render_state.device.clone();
            let queue = render_state.queue.clone();
            let format = render_state.target_format;
            ViewportGpu {
                mesh_renderer: MeshRenderer::new(&device, format),
                device,
                queue,
                format,
                uploaded_generation: 0,
                scene_target: None,
                viewer_target: None,
            }
        });
        if gpu.is_none() {
            tracing::warn!("No wgpu render state, viewport will not draw");
        }

        let size = (800, 600);
        let scene = scene_config
            .enabled
            .then(|| DecorativeScene::mount(&scene_config, size.0, size.1));

        Self {
            viewer: ModelViewer::new(viewer_options, registry),
            scene,
            scene_config,
            size,
            gpu,
        }
    }

    /// Mount or unmount the decorative scene
    pub fn set_scene_enabled(&mut self, enabled: bool) {
        match (enabled, self.scene.is_some()) {
            (true, false) => {
                self.scene = Some(DecorativeScene::mount(
                    &self.scene_config,
                    self.size.0,
                    self.size.1,
                ));
            }
            (false, true) => {
                if let Some(mut scene) = self.scene.take() {
                    scene.unmount();
                }
            }
            _ => {}
        }
    }

    /// Check if the decorative scene is mounted
    pub fn scene_mounted(&self) -> bool {
        self.scene.as_ref().is_some_and(DecorativeScene::is_mounted)
    }

    /// Show a freshly loaded resource in the viewer
    pub fn show_resource(&mut self, url: ResourceUrl) -> Result<(), ViewerError> {
        self.viewer.set_source(url)
    }

    /// Track the panel size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.viewer.resize(width, height);
        if let Some(scene) = self.scene.as_mut() {
            scene.resize(width, height);
        }
    }

    /// Advance viewer animation. Returns whether another frame is needed.
    pub fn advance(&mut self, dt: f32) -> bool {
        let rotated = self.viewer.advance(dt);
        rotated || self.scene_mounted()
    }

    /// Draw both surfaces into their textures
    pub fn render(&mut self, egui_renderer: &mut egui_wgpu::Renderer) -> ViewportTextures {
        let Some(gpu) = self.gpu.as_mut() else {
            return ViewportTextures::default();
        };
        let (width, height) = self.size;

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Viewport Render Encoder"),
            });

        let scene = match self.scene.as_mut() {
            Some(scene) => {
                let target = RenderTarget::ensure(
                    &mut gpu.scene_target,
                    &gpu.device,
                    gpu.format,
                    width,
                    height,
                    egui_renderer,
                    "Scene Render Texture",
                );
                scene.render(&gpu.device, &mut encoder, &target.view, &gpu.queue, gpu.format);
                Some(target.texture_id())
            }
            None => {
                RenderTarget::release(&mut gpu.scene_target, egui_renderer);
                None
            }
        };

        if gpu.uploaded_generation != self.viewer.generation() {
            match self.viewer.model() {
                Some(model) => gpu.mesh_renderer.upload(&gpu.device, &model.mesh),
                None => gpu.mesh_renderer.clear(),
            }
            gpu.uploaded_generation = self.viewer.generation();
        }

        let viewer = if gpu.mesh_renderer.has_mesh() {
            let target = RenderTarget::ensure(
                &mut gpu.viewer_target,
                &gpu.device,
                gpu.format,
                width,
                height,
                egui_renderer,
                "Viewer Render Texture",
            );
            gpu.mesh_renderer.render(
                &gpu.device,
                &mut encoder,
                &target.view,
                &gpu.queue,
                width,
                height,
                &self.viewer.mesh_uniform(),
            );
            Some(target.texture_id())
        } else {
            RenderTarget::release(&mut gpu.viewer_target, egui_renderer);
            None
        };

        gpu.queue.submit(std::iter::once(encoder.finish()));
        ViewportTextures { scene, viewer }
    }
}

/// Shared viewport state
pub type SharedViewportState = Arc<Mutex<ViewportState>>;
