//! CadPrompt Renderer
//!
//! WGPU-based rendering for the CadPrompt viewport.
//!
//! # Architecture
//!
//! The viewport is composed of two independent surfaces:
//!
//! - [`scene::DecorativeScene`] - Static grid scene with its own render loop
//! - [`viewer::ModelViewer`] - Interactive viewer for the current GLB resource
//!
//! Each surface draws into its own offscreen target; the frontend stacks the
//! viewer on top of the scene.
//!
//! # Module Structure
//!
//! ```text
//! cp-renderer/
//! ├── config.rs        # Scene and viewer settings
//! ├── camera.rs        # Arc-rotate camera
//! ├── grid.rs          # Grid geometry and renderer
//! ├── mesh.rs          # Model mesh renderer
//! ├── scene.rs         # Decorative scene and render loop
//! ├── viewer.rs        # Model viewer host
//! ├── pipeline.rs      # Pipelines and uniform slots
//! └── vertex.rs        # Vertex formats
//! ```

pub mod camera;
pub mod config;
pub mod grid;
pub mod mesh;
pub mod pipeline;
pub mod scene;
pub mod vertex;
pub mod viewer;

pub use camera::{CameraUniform, OrbitCamera};
pub use config::{
    ArcCameraConfig, GridConfig, InteractionPrompt, LightConfig, SceneConfig, ViewerOptions,
};
pub use grid::{GridGeometry, GridRenderer, GridUniform, build_grid};
pub use mesh::{MeshRenderer, MeshUniform};
pub use scene::{DecorativeScene, LoopState, RenderLoop};
pub use vertex::{ColorVertex, MeshVertex};
pub use viewer::{LoadedModel, ModelViewer, ViewerError};
