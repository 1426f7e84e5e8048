//! Load failure taxonomy

use thiserror::Error;

/// Why a model load did not produce a viewer resource
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("Geometry kernel is not ready ({0})")]
    KernelNotReady(String),

    #[error("Failed to fetch {path}: HTTP {status}")]
    Fetch { path: String, status: u16 },

    #[error("Network error while fetching {path}: {message}")]
    Network { path: String, message: String },

    #[error("Failed to parse STEP data: {0}")]
    Parse(String),

    #[error("STEP file contains no valid shape")]
    InvalidGeometry,

    #[error("Mesh export failed: {0}")]
    Export(String),

    #[error("Load was cancelled")]
    Cancelled,

    #[error("Load timed out after {0} s")]
    TimedOut(u64),
}

impl LoadError {
    /// Short message suitable for a toast
    pub fn user_message(&self) -> String {
        match self {
            LoadError::KernelNotReady(_) => {
                "The geometry kernel is still starting. Try again in a moment.".into()
            }
            LoadError::Fetch { path, status } => format!("Could not download {path} ({status})"),
            LoadError::Network { path, .. } => format!("Network error while downloading {path}"),
            LoadError::Parse(_) => "The file is not a readable STEP file".into(),
            LoadError::InvalidGeometry => "The STEP file contains no usable shape".into(),
            LoadError::Export(_) => "Could not convert the model for display".into(),
            LoadError::Cancelled => "Load cancelled".into(),
            LoadError::TimedOut(secs) => format!("Loading took longer than {secs} s"),
        }
    }

    /// Cancellation of a superseded load is not a user-facing failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }
}
