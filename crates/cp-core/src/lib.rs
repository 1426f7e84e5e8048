//! CadPrompt core
//!
//! Everything between the prompt box and the viewer that does not touch the GPU:
//! command interpretation, the kernel lifecycle, the STEP-to-GLB pipeline,
//! object-URL style resource handles and load cancellation.

pub mod cancel;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod resource;

pub use cancel::{LoadController, LoadTicket, LoadToken};
pub use command::{Command, CommandRegistry, KeyIntent, PromptState, normalize, prompt_key_intent};
pub use config::{ExportConfig, LoadConfig};
pub use context::{KernelContext, KernelStatus};
pub use error::LoadError;
pub use fetch::ResourceFetcher;
#[cfg(not(target_arch = "wasm32"))]
pub use fetch::NativeFetcher;
#[cfg(target_arch = "wasm32")]
pub use fetch::WebFetcher;
pub use pipeline::{LoadRequest, MeshResource, load_model};
pub use resource::{Blob, GLB_MIME, ResourceRegistry, ResourceUrl, SharedRegistry};
