//! Decorative grid scene
//!
//! A static arc-rotate camera looking at a vertical grid plane, redrawn every
//! frame while mounted. The scene knows nothing about loaded models; it is
//! composited underneath the model viewer by the frontend.

use crate::camera::OrbitCamera;
use crate::config::{LightConfig, SceneConfig};
use crate::grid::{GridGeometry, GridRenderer, GridUniform, build_grid};

/// Render loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Not started yet
    #[default]
    Idle,
    /// Drawing every frame
    Running,
    /// Stopped for good
    Stopped,
}

/// Continuous render loop.
///
/// Once stopped, the loop never runs a frame again.
#[derive(Debug, Default)]
pub struct RenderLoop {
    state: LoopState,
    frames: u64,
}

impl RenderLoop {
    /// Create an idle loop
    pub fn new() -> Self {
        Self::default()
    }

    /// Start drawing; has no effect on a stopped loop
    pub fn start(&mut self) {
        if self.state == LoopState::Idle {
            self.state = LoopState::Running;
        }
    }

    /// Run `draw` if the loop is running. Returns whether it ran.
    pub fn run_frame(&mut self, draw: impl FnOnce()) -> bool {
        if self.state != LoopState::Running {
            return false;
        }
        draw();
        self.frames += 1;
        true
    }

    /// Stop the loop
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    /// Current state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Check if frames are being drawn
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Number of frames drawn so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// The mounted decorative scene
pub struct DecorativeScene {
    config: SceneConfig,
    camera: OrbitCamera,
    grid: GridGeometry,
    size: (u32, u32),
    render_loop: RenderLoop,
    gpu: Option<GridRenderer>,
}

impl DecorativeScene {
    /// Apply `config` once and start the render loop
    pub fn mount(config: &SceneConfig, width: u32, height: u32) -> Self {
        let size = (width.max(1), height.max(1));
        let camera = OrbitCamera::from_config(&config.camera, size.0 as f32 / size.1 as f32);
        let grid = build_grid(&config.grid);
        let mut render_loop = RenderLoop::new();
        render_loop.start();

        tracing::info!(
            width = size.0,
            height = size.1,
            lines = grid.line_count(),
            "Decorative scene mounted"
        );

        Self {
            config: config.clone(),
            camera,
            grid,
            size,
            render_loop,
            gpu: None,
        }
    }

    /// Fit the camera aspect and target size to a new surface size.
    ///
    /// Zero sizes are ignored. Returns whether anything changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == self.size {
            return false;
        }
        self.size = (width, height);
        self.camera.update_aspect(width as f32 / height as f32);
        true
    }

    /// Render target size
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Scene camera
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Grid geometry
    pub fn grid(&self) -> &GridGeometry {
        &self.grid
    }

    /// Scene light
    pub fn light(&self) -> &LightConfig {
        &self.config.light
    }

    /// Clear color of the scene target
    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.config.clear_color;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }

    /// Uniform data for the current camera
    pub fn uniform(&self) -> GridUniform {
        GridUniform::new(&self.camera.uniform(), &self.config.light)
    }

    /// Run one frame of the loop with the current uniform
    pub fn frame(&mut self, draw: impl FnOnce(&GridUniform)) -> bool {
        let uniform = self.uniform();
        self.render_loop.run_frame(|| draw(&uniform))
    }

    /// Draw one frame into `view`, creating GPU resources on first use.
    ///
    /// Does nothing once unmounted.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> bool {
        if !self.render_loop.is_running() {
            return false;
        }
        let uniform = self.uniform();
        let clear = self.clear_color();
        let grid = &self.grid;
        let renderer = self
            .gpu
            .get_or_insert_with(|| GridRenderer::new(device, format, grid));
        self.render_loop
            .run_frame(|| renderer.render(encoder, view, queue, &uniform, clear))
    }

    /// Stop the loop and release GPU resources
    pub fn unmount(&mut self) {
        if self.render_loop.state() == LoopState::Stopped {
            return;
        }
        self.render_loop.stop();
        self.gpu = None;
        tracing::info!(frames = self.render_loop.frames(), "Decorative scene unmounted");
    }

    /// Check if the scene is still drawing
    pub fn is_mounted(&self) -> bool {
        self.render_loop.is_running()
    }

    /// Frames drawn since mount
    pub fn frames(&self) -> u64 {
        self.render_loop.frames()
    }
}

impl Drop for DecorativeScene {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_render_loop_lifecycle() {
        let mut render_loop = RenderLoop::new();
        assert!(!render_loop.run_frame(|| {}));

        render_loop.start();
        assert!(render_loop.run_frame(|| {}));
        assert_eq!(render_loop.frames(), 1);

        render_loop.stop();
        render_loop.start();
        let mut called = false;
        assert!(!render_loop.run_frame(|| called = true));
        assert!(!called);
        assert_eq!(render_loop.state(), LoopState::Stopped);
    }

    #[test]
    fn test_mount_applies_config() {
        let scene = DecorativeScene::mount(&SceneConfig::default(), 800, 400);
        assert!(scene.is_mounted());
        assert_eq!(scene.size(), (800, 400));
        assert_relative_eq!(scene.camera().aspect, 2.0);
        assert_eq!(scene.camera().radius, 30.0);
        assert_eq!(scene.light().direction, [0.0, 1.0, 0.0]);
        assert_eq!(scene.clear_color(), wgpu::Color::TRANSPARENT);
        assert_eq!(scene.grid().plane.len(), 6);
    }

    #[test]
    fn test_resize_only_changes_aspect_and_size() {
        let mut scene = DecorativeScene::mount(&SceneConfig::default(), 800, 400);
        let grid = scene.grid().clone();
        let position = scene.camera().position();

        assert!(scene.resize(400, 400));
        assert_eq!(scene.size(), (400, 400));
        assert_relative_eq!(scene.camera().aspect, 1.0);
        assert_eq!(scene.grid(), &grid);
        assert_eq!(scene.camera().position(), position);

        assert!(!scene.resize(0, 300));
        assert!(!scene.resize(400, 400));
        assert_eq!(scene.size(), (400, 400));
    }

    #[test]
    fn test_no_frames_after_unmount() {
        let mut scene = DecorativeScene::mount(&SceneConfig::default(), 100, 100);
        let mut draws = 0;
        assert!(scene.frame(|_| draws += 1));
        assert!(scene.frame(|_| draws += 1));

        scene.unmount();
        assert!(!scene.is_mounted());
        assert!(!scene.frame(|_| draws += 1));
        assert_eq!(draws, 2);
        assert_eq!(scene.frames(), 2);
    }

    #[test]
    fn test_frame_uniform_carries_light() {
        let mut scene = DecorativeScene::mount(&SceneConfig::default(), 100, 100);
        let mut light = [0.0; 4];
        scene.frame(|uniform| light = uniform.light);
        assert_eq!(light, [0.0, 1.0, 0.0, 1.0]);
    }
}
