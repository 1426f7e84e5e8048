//! Object-URL style handles for in-memory resources
//!
//! Exported meshes are registered here and handed to the viewer as a
//! [`ResourceUrl`]. Whoever replaces a URL revokes the old one so its bytes
//! are released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

/// MIME type of binary glTF
pub const GLB_MIME: &str = "model/gltf-binary";

const URL_SCHEME: &str = "blob:cadprompt/";

/// Handle to a registered resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUrl(String);

impl ResourceUrl {
    /// The URL string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registered resource content
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub mime: String,
}

/// In-memory store of resources addressable by URL
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: Mutex<HashMap<ResourceUrl, Blob>>,
}

/// Registry shared between the load tasks and the viewer
pub type SharedRegistry = Arc<ResourceRegistry>;

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return a fresh URL for them
    pub fn create_object_url(&self, bytes: Vec<u8>, mime: &str) -> ResourceUrl {
        let url = ResourceUrl(format!("{URL_SCHEME}{}", Uuid::new_v4()));
        self.entries.lock().insert(
            url.clone(),
            Blob {
                bytes: bytes.into(),
                mime: mime.to_string(),
            },
        );
        tracing::debug!(%url, "Registered resource");
        url
    }

    /// Look up a URL's content
    pub fn resolve(&self, url: &ResourceUrl) -> Option<Blob> {
        self.entries.lock().get(url).cloned()
    }

    /// Release a URL. Returns whether it was registered.
    pub fn revoke(&self, url: &ResourceUrl) -> bool {
        let removed = self.entries.lock().remove(url).is_some();
        if removed {
            tracing::debug!(%url, "Revoked resource");
        }
        removed
    }

    /// Number of live URLs
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if no URL is live
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
