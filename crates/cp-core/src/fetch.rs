//! Fetching static resources
//!
//! Native builds read from an asset directory or an `http(s)://` base with
//! `ureq`; the browser build fetches relative to the page with `gloo-net`.

use crate::error::LoadError;

/// Source of raw file bytes for a static resource path
#[allow(async_fn_in_trait)]
pub trait ResourceFetcher {
    /// Fetch the full content at `path`
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io::ErrorKind;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{LoadError, ResourceFetcher};

    /// Largest response body accepted over HTTP
    const MAX_BODY_BYTES: u64 = 512 * 1024 * 1024;

    /// Fetches from a local directory or an HTTP base URL
    #[derive(Debug, Clone)]
    pub struct NativeFetcher {
        asset_root: String,
        timeout: Option<Duration>,
    }

    impl NativeFetcher {
        /// Create a fetcher resolving paths against `asset_root`
        pub fn new(asset_root: impl Into<String>, timeout: Option<Duration>) -> Self {
            Self {
                asset_root: asset_root.into(),
                timeout,
            }
        }

        fn is_http(location: &str) -> bool {
            location.starts_with("http://") || location.starts_with("https://")
        }

        fn fetch_http(&self, url: &str, path: &str) -> Result<Vec<u8>, LoadError> {
            let config = ureq::Agent::config_builder()
                .timeout_global(self.timeout)
                .build();
            let agent = ureq::Agent::new_with_config(config);
            let url = url.replace(' ', "%20");

            match agent.get(&url).call() {
                Ok(mut response) => response
                    .body_mut()
                    .with_config()
                    .limit(MAX_BODY_BYTES)
                    .read_to_vec()
                    .map_err(|e| LoadError::Network {
                        path: path.to_string(),
                        message: e.to_string(),
                    }),
                Err(ureq::Error::StatusCode(status)) => Err(LoadError::Fetch {
                    path: path.to_string(),
                    status,
                }),
                Err(e) => Err(LoadError::Network {
                    path: path.to_string(),
                    message: e.to_string(),
                }),
            }
        }

        fn fetch_file(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            let full = PathBuf::from(&self.asset_root).join(path.trim_start_matches('/'));
            std::fs::read(&full).map_err(|e| match e.kind() {
                ErrorKind::NotFound => LoadError::Fetch {
                    path: path.to_string(),
                    status: 404,
                },
                ErrorKind::PermissionDenied => LoadError::Fetch {
                    path: path.to_string(),
                    status: 403,
                },
                _ => LoadError::Network {
                    path: path.to_string(),
                    message: e.to_string(),
                },
            })
        }
    }

    impl ResourceFetcher for NativeFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            if Self::is_http(path) {
                return self.fetch_http(path, path);
            }
            if Self::is_http(&self.asset_root) {
                let url = format!(
                    "{}/{}",
                    self.asset_root.trim_end_matches('/'),
                    path.trim_start_matches('/')
                );
                return self.fetch_http(&url, path);
            }
            self.fetch_file(path)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeFetcher;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::{LoadError, ResourceFetcher};

    /// Fetches relative to the page origin
    #[derive(Debug, Clone, Default)]
    pub struct WebFetcher;

    impl ResourceFetcher for WebFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            let network = |e: gloo_net::Error| LoadError::Network {
                path: path.to_string(),
                message: e.to_string(),
            };
            let response = gloo_net::http::Request::get(path)
                .send()
                .await
                .map_err(network)?;
            if !response.ok() {
                return Err(LoadError::Fetch {
                    path: path.to_string(),
                    status: response.status(),
                });
            }
            response.binary().await.map_err(network)
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebFetcher;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn test_reads_from_asset_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gear.step"), b"ISO-10303-21;").unwrap();
        let fetcher = NativeFetcher::new(dir.path().to_string_lossy(), None);

        let bytes = pollster::block_on(fetcher.fetch("/gear.step")).unwrap();
        assert_eq!(bytes, b"ISO-10303-21;");
    }

    #[test]
    fn test_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = NativeFetcher::new(dir.path().to_string_lossy(), None);

        let err = pollster::block_on(fetcher.fetch("/missing.step")).unwrap_err();
        assert_eq!(
            err,
            LoadError::Fetch {
                path: "/missing.step".into(),
                status: 404,
            }
        );
    }

    #[test]
    fn test_path_with_spaces() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cross Helical Gear.STEP"), b"x").unwrap();
        let fetcher = NativeFetcher::new(dir.path().to_string_lossy(), None);
        assert!(pollster::block_on(fetcher.fetch("/Cross Helical Gear.STEP")).is_ok());
    }
}
