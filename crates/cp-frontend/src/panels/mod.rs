//! UI panels

mod viewport;

pub use viewport::ViewportPanel;
