//! Release window discovery
//!
//! The newest release is baked into the binary. Once the next scheduled
//! release date has passed, CTAN is asked for the real latest release; the
//! answer can only ever widen the window. Lookup failures fall back to the
//! last known value.

use super::Version;
use crate::error::{TlsetupError, TlsetupResult};
use crate::http::HttpClient;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Latest release known when this binary was built
pub const BUNDLED_LATEST: u16 = 2026;

/// CTAN package metadata endpoint for TeX Live
pub const LOOKUP_URL: &str = "https://ctan.org/json/2.0/pkg/texlive";

/// The three reference points every component works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseWindow {
    pub previous: Version,
    pub latest: Version,
    pub next: Version,
}

impl ReleaseWindow {
    /// Window centered on `latest`
    pub fn new(latest: Version) -> Self {
        Self {
            previous: latest.prev(),
            latest,
            next: latest.next(),
        }
    }

    /// Window whose `latest` is the newer of the current one and `observed`
    pub fn widen(&self, observed: Version) -> Self {
        Self::new(self.latest.max(observed))
    }

    /// Whether a release is old enough that its repository no longer changes
    pub fn is_frozen(&self, version: Version) -> bool {
        version < self.previous
    }
}

/// Releases usually ship in spring; the window is refreshed from March 1st on
fn scheduled_release(version: Version) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::from(version.year()), 3, 1)
}

#[derive(Debug, Deserialize)]
struct PackageInfo {
    version: PackageVersion,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    number: String,
}

/// Last observed release, persisted between runs
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    latest: Version,
    checked_at: DateTime<Utc>,
}

/// Produces the [`ReleaseWindow`] for a run
pub struct VersionCatalog {
    http: Arc<dyn HttpClient>,
    bundled: Version,
    snapshot_path: Option<PathBuf>,
    offline: bool,
}

impl VersionCatalog {
    /// Catalog seeded from the bundled release
    pub fn new(http: Arc<dyn HttpClient>) -> TlsetupResult<Self> {
        Ok(Self {
            http,
            bundled: Version::new(BUNDLED_LATEST)?,
            snapshot_path: None,
            offline: false,
        })
    }

    /// Persist and reuse the widest observed release at `path`
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    /// Never contact the network
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Compute the window for today
    pub async fn resolve(&self) -> ReleaseWindow {
        self.resolve_at(Utc::now().date_naive()).await
    }

    /// Compute the window as of `today`
    pub async fn resolve_at(&self, today: NaiveDate) -> ReleaseWindow {
        let known = match self.load_snapshot().await {
            Some(snapshot) => self.bundled.max(snapshot),
            None => self.bundled,
        };
        let window = ReleaseWindow::new(known);

        let due = scheduled_release(window.next).is_some_and(|date| today >= date);
        if !due || self.offline {
            debug!("Using known TeX Live release {}", window.latest);
            return window;
        }

        match self.lookup().await {
            Ok(remote) => {
                let widened = window.widen(remote);
                if widened.latest > window.latest {
                    info!("Newer TeX Live release available: {}", widened.latest);
                    self.save_snapshot(widened.latest).await;
                }
                widened
            }
            Err(e) => {
                warn!("Failed to check for the latest TeX Live release: {}", e);
                window
            }
        }
    }

    /// Ask CTAN for the current release
    async fn lookup(&self) -> TlsetupResult<Version> {
        let body = self.http.get_text(LOOKUP_URL).await?;
        let info: PackageInfo = serde_json::from_str(&body)?;
        let number = info.version.number.trim();
        number
            .get(..4)
            .ok_or_else(|| TlsetupError::InvalidVersion(number.to_string()))?
            .parse()
    }

    async fn load_snapshot(&self) -> Option<Version> {
        let path = self.snapshot_path.as_ref()?;
        let content = fs::read_to_string(path).await.ok()?;
        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => Some(snapshot.latest),
            Err(e) => {
                debug!("Ignoring unreadable release snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn save_snapshot(&self, latest: Version) {
        let Some(path) = self.snapshot_path.as_ref() else {
            return;
        };
        let snapshot = Snapshot {
            latest,
            checked_at: Utc::now(),
        };
        let result = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| TlsetupError::io("creating state directory", e))?;
            }
            let content = serde_json::to_string_pretty(&snapshot)?;
            fs::write(path, content)
                .await
                .map_err(|e| TlsetupError::io(format!("writing {}", path.display()), e))
        }
        .await;
        if let Err(e) = result {
            warn!("Failed to persist release snapshot: {}", e);
        }
    }
}
