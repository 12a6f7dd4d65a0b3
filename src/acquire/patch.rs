//! Post-extraction fixes for old installer sources
//!
//! Old releases ship Perl that no longer runs on current CI images. Each
//! patch is a regex replacement applied to a file of the extracted tree when
//! the release and platform call for it.

use crate::error::{TlsetupError, TlsetupResult};
use crate::platform::Platform;
use crate::version::{Capability, Version};
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// A single find/replace on one file of the installer tree
#[derive(Debug, Clone)]
pub struct Patch {
    /// Path relative to the installer root
    pub file: &'static str,
    pub pattern: &'static str,
    pub replacement: &'static str,
}

/// `defined(@array)` is a compile error since Perl 5.22
const DEFINED_ARRAY: &str = r"defined\s*\(\s*(@[\w:]+)\s*\)";

/// Patches needed by a release on a platform
pub fn patches_for(platform: Platform, version: Version) -> Vec<Patch> {
    let mut patches = Vec::new();
    if version.supports(Capability::DefinedArrayPerl) {
        for file in [
            "install-tl",
            "tlpkg/TeXLive/TLUtils.pm",
            "tlpkg/TeXLive/TLPDB.pm",
        ] {
            patches.push(Patch {
                file,
                pattern: DEFINED_ARRAY,
                replacement: "($1)",
            });
        }
    }
    if platform == Platform::Windows && version.supports(Capability::DefinedArrayPerl) {
        patches.push(Patch {
            file: "tlpkg/TeXLive/TLWinGoo.pm",
            pattern: DEFINED_ARRAY,
            replacement: "($1)",
        });
    }
    patches
}

/// Apply `patches` under `root`; missing files are skipped
pub async fn apply(root: &Path, patches: &[Patch]) -> TlsetupResult<usize> {
    let mut applied = 0;
    for patch in patches {
        let path = root.join(patch.file);
        let Ok(content) = fs::read_to_string(&path).await else {
            debug!("Patch target {} not present, skipping", patch.file);
            continue;
        };
        let pattern = Regex::new(patch.pattern)
            .map_err(|e| TlsetupError::Internal(format!("invalid patch pattern: {}", e)))?;
        let patched = pattern.replace_all(&content, patch.replacement);
        if patched != content {
            fs::write(&path, patched.as_bytes())
                .await
                .map_err(|e| TlsetupError::io(format!("patching {}", path.display()), e))?;
            debug!("Patched {}", patch.file);
            applied += 1;
        }
    }
    Ok(applied)
}
