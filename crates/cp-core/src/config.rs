//! Load and export settings

use std::time::Duration;

use cp_kernel::MeshTolerance;
use serde::{Deserialize, Serialize};

/// Path of the demo model served next to the application
pub const DEFAULT_DEMO_PATH: &str = "/Cross Helical Gear ZH1-10 Assy.STEP";

/// Where models come from and how long a load may take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Directory or `http(s)://` base that static paths resolve against (native only)
    pub asset_root: String,
    /// Static resource path loaded by the "load step file" command
    pub demo_path: String,
    /// RGB color applied to loaded models
    pub default_color: [f32; 3],
    /// Load deadline in seconds, 0 disables it
    pub timeout_secs: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".into(),
            demo_path: DEFAULT_DEMO_PATH.into(),
            default_color: [1.0, 1.0, 1.0],
            timeout_secs: 120,
        }
    }
}

impl LoadConfig {
    /// Load deadline, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Mesh export settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Tessellation tolerance passed to the kernel
    pub tolerance: MeshTolerance,
}
