//! Arc-rotate camera shared by the decorative scene and the model viewer

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::ArcCameraConfig;

/// Smallest polar angle distance from the poles
const BETA_EPSILON: f32 = 0.01;

/// Camera uniform buffer data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    /// Combined view-projection matrix
    pub view_proj: [[f32; 4]; 4],
    /// Camera position (w = 1)
    pub eye: [f32; 4],
}

/// Orbit camera with Y up.
///
/// Position is `target + radius * (sin β cos α, cos β, sin β sin α)`.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Orbit target
    pub target: Vec3,
    /// Azimuth in radians
    pub alpha: f32,
    /// Polar angle from +Y in radians
    pub beta: f32,
    /// Distance to the target
    pub radius: f32,
    /// Closest allowed distance
    pub lower_radius_limit: f32,
    /// Farthest allowed distance
    pub upper_radius_limit: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Width / height
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl OrbitCamera {
    /// Create a camera from its configuration
    pub fn from_config(config: &ArcCameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            target: Vec3::from(config.target),
            alpha: config.alpha,
            beta: config.beta,
            radius: config.radius,
            lower_radius_limit: config.lower_radius_limit,
            upper_radius_limit: config.upper_radius_limit.max(config.lower_radius_limit),
            fov: 45.0_f32.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
        };
        camera.update_aspect(aspect);
        camera.beta = camera.clamped_beta(camera.beta);
        camera.radius = camera.clamped_radius(camera.radius);
        camera
    }

    /// Update aspect ratio, ignoring degenerate sizes
    pub fn update_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        let (sin_b, cos_b) = self.beta.sin_cos();
        let (sin_a, cos_a) = self.alpha.sin_cos();
        self.target + self.radius * Vec3::new(sin_b * cos_a, cos_b, sin_b * sin_a)
    }

    /// Orbit around the target
    pub fn orbit(&mut self, delta_alpha: f32, delta_beta: f32) {
        self.alpha = (self.alpha + delta_alpha).rem_euclid(std::f32::consts::TAU);
        self.beta = self.clamped_beta(self.beta + delta_beta);
    }

    /// Zoom toward the target; positive `delta` moves closer
    pub fn zoom(&mut self, delta: f32) {
        self.radius = self.clamped_radius(self.radius * (1.0 - delta * 0.1));
    }

    /// Fit camera to show the given bounding sphere
    pub fn fit_all(&mut self, center: Vec3, radius: f32) {
        let radius = radius.max(1e-3);
        self.target = center;
        self.lower_radius_limit = radius * 1.2;
        self.upper_radius_limit = radius * 20.0;
        self.radius = radius * 2.5;
        self.near = radius * 0.01;
        self.far = radius * 100.0;
    }

    fn clamped_beta(&self, beta: f32) -> f32 {
        beta.clamp(BETA_EPSILON, std::f32::consts::PI - BETA_EPSILON)
    }

    fn clamped_radius(&self, radius: f32) -> f32 {
        radius.clamp(self.lower_radius_limit, self.upper_radius_limit)
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get camera uniform data
    pub fn uniform(&self) -> CameraUniform {
        let eye = self.position();
        CameraUniform {
            view_proj: (self.projection_matrix() * self.view_matrix()).to_cols_array_2d(),
            eye: [eye.x, eye.y, eye.z, 1.0],
        }
    }
}
