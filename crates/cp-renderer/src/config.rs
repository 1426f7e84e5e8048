//! Renderer configuration structures
//!
//! This module provides the settings for the decorative scene and the model
//! viewer. All of them can be serialized and loaded from configuration files.

use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

/// Arc-rotate camera configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArcCameraConfig {
    /// Azimuth angle in radians
    pub alpha: f32,
    /// Polar angle from +Y in radians
    pub beta: f32,
    /// Distance to the target
    pub radius: f32,
    /// Orbit target
    pub target: [f32; 3],
    /// Closest allowed distance
    pub lower_radius_limit: f32,
    /// Farthest allowed distance
    pub upper_radius_limit: f32,
}

impl Default for ArcCameraConfig {
    fn default() -> Self {
        Self {
            alpha: FRAC_PI_2,
            beta: FRAC_PI_2,
            radius: 30.0,
            target: [0.0, 0.0, 0.0],
            lower_radius_limit: 10.0,
            upper_radius_limit: 100.0,
        }
    }
}

/// Hemispheric light configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightConfig {
    /// Direction toward the sky
    pub direction: [f32; 3],
    /// Light intensity
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: [0.0, 1.0, 0.0],
            intensity: 1.0,
        }
    }
}

/// Grid plane configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Plane width along X
    pub width: f32,
    /// Plane height along Y
    pub height: f32,
    /// Plane offset along Z
    pub offset_z: f32,
    /// Distance between minor lines
    pub grid_ratio: f32,
    /// Every n-th line is a major line
    pub major_unit_frequency: u32,
    /// Opacity of minor lines relative to major lines
    pub minor_unit_visibility: f32,
    /// Plane color (RGB)
    pub main_color: [f32; 3],
    /// Line color (RGB)
    pub line_color: [f32; 3],
    /// Overall opacity
    pub opacity: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            offset_z: -5.0,
            grid_ratio: 1.0,
            major_unit_frequency: 5,
            minor_unit_visibility: 0.3,
            main_color: [0.1, 0.1, 0.1],
            line_color: [0.6, 0.6, 0.6],
            opacity: 0.7,
        }
    }
}

/// Decorative scene configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Whether the scene is mounted at startup
    pub enabled: bool,
    /// Camera setup
    pub camera: ArcCameraConfig,
    /// Light setup
    pub light: LightConfig,
    /// Grid setup
    pub grid: GridConfig,
    /// Clear color (RGBA), transparent by default
    pub clear_color: [f32; 4],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            camera: ArcCameraConfig::default(),
            light: LightConfig::default(),
            grid: GridConfig::default(),
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

/// When the viewer shows its interaction hint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InteractionPrompt {
    /// Show the hint until the user first interacts
    Auto,
    /// Never show the hint
    #[default]
    None,
}

/// Model viewer options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerOptions {
    /// Accessible description of the model
    pub alt: String,
    /// Request augmented reality when available
    pub ar: bool,
    /// Rotate the model while idle
    pub auto_rotate: bool,
    /// Allow orbit and zoom with the pointer
    pub camera_controls: bool,
    /// Strength of self-shadowing, 0 disables it
    pub shadow_intensity: f32,
    /// Final color multiplier
    pub exposure: f32,
    /// Interaction hint behavior
    pub interaction_prompt: InteractionPrompt,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            alt: "3D Model".into(),
            ar: true,
            auto_rotate: true,
            camera_controls: true,
            shadow_intensity: 1.0,
            exposure: 1.0,
            interaction_prompt: InteractionPrompt::None,
        }
    }
}
