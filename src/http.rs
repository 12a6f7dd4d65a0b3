//! HTTP access for metadata lookups, redirect resolution and downloads
//!
//! The blocking `ureq` agent runs on tokio's blocking pool so callers stay
//! async like the rest of the pipeline.

use crate::error::{TlsetupError, TlsetupResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use ureq::ResponseExt;

/// Upper bound on a single HTTP exchange, including body transfer
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Network operations used by the pipeline
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch a small text document
    async fn get_text(&self, url: &str) -> TlsetupResult<String>;

    /// Download `url` into `dest`, returning the number of bytes written
    async fn download(&self, url: &str, dest: &Path) -> TlsetupResult<u64>;

    /// Follow redirects and return the final URL
    async fn resolve(&self, url: &str) -> TlsetupResult<String>;
}

/// `HttpClient` backed by a shared `ureq` agent
#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Create a client with the default timeout
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .user_agent(concat!("tlsetup/", env!("CARGO_PKG_VERSION")))
            .build()
            .into();
        Self { agent }
    }

    async fn blocking<T, F>(&self, url: &str, f: F) -> TlsetupResult<T>
    where
        T: Send + 'static,
        F: FnOnce(ureq::Agent) -> TlsetupResult<T> + Send + 'static,
    {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || f(agent))
            .await
            .map_err(|e| TlsetupError::http(url, format!("request task aborted: {}", e)))?
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for UreqClient {
    async fn get_text(&self, url: &str) -> TlsetupResult<String> {
        debug!("GET {}", url);
        let owned = url.to_string();
        self.blocking(url, move |agent| {
            let mut response = agent
                .get(&owned)
                .call()
                .map_err(|e| TlsetupError::http(&owned, e))?;
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| TlsetupError::http(&owned, e))
        })
        .await
    }

    async fn download(&self, url: &str, dest: &Path) -> TlsetupResult<u64> {
        debug!("Downloading {} to {}", url, dest.display());
        let owned = url.to_string();
        let dest: PathBuf = dest.to_path_buf();
        self.blocking(url, move |agent| {
            let response = agent
                .get(&owned)
                .call()
                .map_err(|e| TlsetupError::http(&owned, e))?;
            let mut reader = response.into_body().into_reader();
            let mut file = std::fs::File::create(&dest)
                .map_err(|e| TlsetupError::io(format!("creating {}", dest.display()), e))?;
            std::io::copy(&mut reader, &mut file).map_err(|e| TlsetupError::http(&owned, e))
        })
        .await
    }

    async fn resolve(&self, url: &str) -> TlsetupResult<String> {
        debug!("Resolving redirects for {}", url);
        let owned = url.to_string();
        self.blocking(url, move |agent| {
            let response = agent
                .head(&owned)
                .call()
                .map_err(|e| TlsetupError::http(&owned, e))?;
            Ok(response.get_uri().to_string())
        })
        .await
    }
}
