//! Model viewer host
//!
//! Holds the currently displayed GLB resource and the interaction state
//! around it. GPU upload is left to the caller, which compares
//! [`ModelViewer::generation`] against what it last uploaded.

use std::f32::consts::FRAC_PI_2;

use cp_core::{ResourceUrl, SharedRegistry};
use cp_kernel::{GlbError, TriangleMesh, read_glb};
use glam::Vec3;
use thiserror::Error;

use crate::camera::OrbitCamera;
use crate::config::{ArcCameraConfig, InteractionPrompt, ViewerOptions};
use crate::mesh::MeshUniform;

/// Auto-rotation speed in radians per second (30°/s)
pub const AUTO_ROTATE_SPEED: f32 = std::f32::consts::PI / 6.0;

/// Seconds without interaction before auto-rotation resumes
pub const AUTO_ROTATE_DELAY: f32 = 3.0;

/// Radians of orbit per pixel of drag
const ORBIT_SENSITIVITY: f32 = 0.01;

/// Ambient share of the key light shading
const AMBIENT: f32 = 0.35;

/// Error type for viewer operations
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The URL is not (or no longer) registered
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// The resource is not a readable GLB
    #[error("Failed to decode model: {0}")]
    Decode(#[from] GlbError),

    /// The GLB decoded to an empty mesh
    #[error("Model has no triangles")]
    EmptyModel,
}

/// A decoded model ready for upload
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Model geometry
    pub mesh: TriangleMesh,
    /// Material base color (RGBA)
    pub base_color: [f32; 4],
    /// Center of the bounding box
    pub center: Vec3,
    /// Radius of the bounding sphere
    pub radius: f32,
}

fn initial_camera() -> OrbitCamera {
    OrbitCamera::from_config(
        &ArcCameraConfig {
            alpha: FRAC_PI_2,
            beta: 1.2,
            radius: 5.0,
            target: [0.0, 0.0, 0.0],
            lower_radius_limit: 0.5,
            upper_radius_limit: 100.0,
        },
        1.0,
    )
}

/// Interactive viewer for a single GLB resource
pub struct ModelViewer {
    options: ViewerOptions,
    registry: SharedRegistry,
    source: Option<ResourceUrl>,
    model: Option<LoadedModel>,
    generation: u64,
    camera: OrbitCamera,
    interacted: bool,
    idle_secs: f32,
    ar_reported: bool,
}

impl ModelViewer {
    /// Create an empty viewer
    pub fn new(options: ViewerOptions, registry: SharedRegistry) -> Self {
        Self {
            options,
            registry,
            source: None,
            model: None,
            generation: 0,
            camera: initial_camera(),
            interacted: false,
            idle_secs: AUTO_ROTATE_DELAY,
            ar_reported: false,
        }
    }

    /// Viewer options
    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// Display the resource at `url`.
    ///
    /// On failure the current model stays on screen. On success the previous
    /// URL is revoked and the camera is fitted to the new model.
    pub fn set_source(&mut self, url: ResourceUrl) -> Result<(), ViewerError> {
        let blob = self
            .registry
            .resolve(&url)
            .ok_or_else(|| ViewerError::UnknownResource(url.to_string()))?;
        let glb = read_glb(&blob.bytes)?;
        let bounds = glb.mesh.bounds().ok_or(ViewerError::EmptyModel)?;
        if glb.mesh.is_empty() {
            return Err(ViewerError::EmptyModel);
        }

        let center = bounds.center();
        let radius = bounds.radius();
        tracing::info!(
            %url,
            triangles = glb.mesh.triangle_count(),
            radius,
            "Model viewer source set"
        );

        match self.source.replace(url.clone()) {
            Some(previous) if previous != url => {
                self.registry.revoke(&previous);
            }
            _ => {}
        }
        self.model = Some(LoadedModel {
            mesh: glb.mesh,
            base_color: glb.material.base_color,
            center,
            radius,
        });
        self.generation += 1;
        self.camera.fit_all(center, radius);
        self.check_ar();
        Ok(())
    }

    /// Remove the current model and revoke its URL
    pub fn clear_source(&mut self) {
        if let Some(previous) = self.source.take() {
            self.registry.revoke(&previous);
        }
        if self.model.take().is_some() {
            self.generation += 1;
        }
    }

    /// Current source URL
    pub fn source(&self) -> Option<&ResourceUrl> {
        self.source.as_ref()
    }

    /// Current model
    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    /// Bumped whenever the model changes
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Viewer camera
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    fn touch(&mut self) {
        self.interacted = true;
        self.idle_secs = 0.0;
    }

    /// Orbit by a pointer drag in pixels. Returns whether it was applied.
    pub fn handle_drag(&mut self, dx: f32, dy: f32) -> bool {
        if !self.options.camera_controls || (dx == 0.0 && dy == 0.0) {
            return false;
        }
        self.camera.orbit(dx * ORBIT_SENSITIVITY, -dy * ORBIT_SENSITIVITY);
        self.touch();
        true
    }

    /// Zoom by a scroll amount. Returns whether it was applied.
    pub fn handle_scroll(&mut self, delta: f32) -> bool {
        if !self.options.camera_controls || delta == 0.0 {
            return false;
        }
        self.camera.zoom(delta);
        self.touch();
        true
    }

    /// Advance time by `dt` seconds. Returns whether the view changed.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        self.idle_secs += dt;
        if !self.options.auto_rotate || self.model.is_none() || self.idle_secs < AUTO_ROTATE_DELAY
        {
            return false;
        }
        self.camera.orbit(AUTO_ROTATE_SPEED * dt, 0.0);
        true
    }

    /// Check if the interaction hint should be shown
    pub fn show_interaction_prompt(&self) -> bool {
        match self.options.interaction_prompt {
            InteractionPrompt::Auto => self.model.is_some() && !self.interacted,
            InteractionPrompt::None => false,
        }
    }

    /// Report AR as unavailable, once
    pub fn check_ar(&mut self) -> bool {
        if self.options.ar && !self.ar_reported {
            self.ar_reported = true;
            tracing::info!("AR requested but no AR session is available on this platform");
        }
        false
    }

    /// Fit the camera to a new surface size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.camera.update_aspect(width as f32 / height as f32);
        }
    }

    /// Uniform data for the current model and camera
    pub fn mesh_uniform(&self) -> MeshUniform {
        let base_color = self
            .model
            .as_ref()
            .map_or([1.0, 1.0, 1.0, 1.0], |model| model.base_color);
        let to_eye = (self.camera.position() - self.camera.target).normalize_or_zero();
        let light = (to_eye + Vec3::Y * 0.5).normalize_or(Vec3::Y);
        MeshUniform {
            view_proj: self.camera.uniform().view_proj,
            base_color,
            light_dir: [light.x, light.y, light.z, 0.0],
            params: [
                self.options.exposure,
                self.options.shadow_intensity.clamp(0.0, 1.0),
                AMBIENT,
                0.0,
            ],
        }
    }
}

impl Drop for ModelViewer {
    fn drop(&mut self) {
        if let Some(url) = self.source.take() {
            self.registry.revoke(&url);
        }
    }
}
