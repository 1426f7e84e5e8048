//! CadPrompt Frontend
//!
//! egui-based application: a prompt box that loads STEP models into a 3D
//! viewer drawn over a decorative grid scene.

pub mod actions;
pub mod app;
pub mod config;
pub mod panels;
pub mod state;

// Re-exports for convenience
pub use app::CadPromptApp;
pub use config::{AppConfig, ConfigError};
pub use state::{AppAction, AppState, SharedAppState};
