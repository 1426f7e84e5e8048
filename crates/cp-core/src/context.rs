//! Geometry kernel lifecycle
//!
//! The kernel is created once, in the background, when the application
//! starts. Loads borrow it through a [`KernelContext`] and fail fast with
//! [`LoadError::KernelNotReady`] until it is available.

use std::fmt;
use std::sync::Arc;

use cp_kernel::{GeometryKernel, KernelResult};
use parking_lot::Mutex;

use crate::error::LoadError;

enum KernelState {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn GeometryKernel>),
    Failed(String),
}

/// Observable kernel state without the handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelStatus {
    Uninitialized,
    Initializing,
    Ready { name: String },
    Failed(String),
}

impl fmt::Display for KernelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelStatus::Uninitialized => write!(f, "uninitialized"),
            KernelStatus::Initializing => write!(f, "initializing"),
            KernelStatus::Ready { name } => write!(f, "ready ({name})"),
            KernelStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Shared handle to the kernel lifecycle
#[derive(Clone)]
pub struct KernelContext {
    state: Arc<Mutex<KernelState>>,
}

impl Default for KernelContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KernelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelContext")
            .field("status", &self.status())
            .finish()
    }
}

impl KernelContext {
    /// Create a context with no kernel yet
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(KernelState::Uninitialized)),
        }
    }

    /// Context that is already ready with the given kernel
    pub fn ready(kernel: Arc<dyn GeometryKernel>) -> Self {
        Self {
            state: Arc::new(Mutex::new(KernelState::Ready(kernel))),
        }
    }

    /// Current status
    pub fn status(&self) -> KernelStatus {
        match &*self.state.lock() {
            KernelState::Uninitialized => KernelStatus::Uninitialized,
            KernelState::Initializing => KernelStatus::Initializing,
            KernelState::Ready(kernel) => KernelStatus::Ready {
                name: kernel.name().to_string(),
            },
            KernelState::Failed(reason) => KernelStatus::Failed(reason.clone()),
        }
    }

    /// Check if the kernel can be used
    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.lock(), KernelState::Ready(_))
    }

    /// Create the kernel with `factory`.
    ///
    /// Runs only from the uninitialized state; later calls return `false`
    /// without touching the kernel. Call from a background task.
    pub fn initialize<F>(&self, factory: F) -> bool
    where
        F: FnOnce() -> KernelResult<Arc<dyn GeometryKernel>>,
    {
        {
            let mut state = self.state.lock();
            if !matches!(*state, KernelState::Uninitialized) {
                return false;
            }
            *state = KernelState::Initializing;
        }
        tracing::info!("Initializing geometry kernel");

        let next = match factory() {
            Ok(kernel) if kernel.is_available() => {
                tracing::info!(kernel = kernel.name(), "Geometry kernel ready");
                KernelState::Ready(kernel)
            }
            Ok(kernel) => {
                let reason = format!("kernel '{}' is not available", kernel.name());
                tracing::error!(%reason, "Geometry kernel initialization failed");
                KernelState::Failed(reason)
            }
            Err(e) => {
                tracing::error!(error = %e, "Geometry kernel initialization failed");
                KernelState::Failed(e.to_string())
            }
        };
        *self.state.lock() = next;
        true
    }

    /// The kernel handle, or `KernelNotReady` describing the current state
    pub fn kernel(&self) -> Result<Arc<dyn GeometryKernel>, LoadError> {
        match &*self.state.lock() {
            KernelState::Ready(kernel) => Ok(Arc::clone(kernel)),
            KernelState::Uninitialized => Err(LoadError::KernelNotReady("uninitialized".into())),
            KernelState::Initializing => Err(LoadError::KernelNotReady("initializing".into())),
            KernelState::Failed(reason) => {
                Err(LoadError::KernelNotReady(format!("failed: {reason}")))
            }
        }
    }
}
