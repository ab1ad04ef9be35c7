//! Centralized installer settings.
//! These values are used by download helpers and installers; override them
//! via [`LauncherConfig`] rather than hardcoding new literals at call sites.

/// Request timeout for a single HTTP call (manifest/metadata fetches use a
/// much shorter timeout in practice; this is the ceiling for large bodies).
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Number of attempts (including the first) before a download gives up.
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Base delay for the linear retry backoff: `BACKOFF_BASE_MS * attempt`.
pub const BACKOFF_BASE_MS: u64 = 1000;

pub fn current_timeout() -> std::time::Duration {
    std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS)
}

pub fn retry_backoff(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_millis(BACKOFF_BASE_MS * attempt as u64)
}

/// User-overridable network settings, threaded through [`crate::Launcher::configure`].
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub request_timeout_secs: u64,
    pub max_download_retries: u32,
    pub backoff_base_ms: u64,
    pub download_concurrency: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            max_download_retries: MAX_DOWNLOAD_RETRIES,
            backoff_base_ms: BACKOFF_BASE_MS,
            download_concurrency: 8,
        }
    }
}

impl LauncherConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self, attempt: u32) -> std::time::Duration {
        std::time::Duration::from_millis(self.backoff_base_ms * attempt as u64)
    }
}
// URL Constants
pub const VANILLA_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const FABRIC_META_URL: &str = "https://meta.fabricmc.net/v2/versions/loader";
pub const FABRIC_MAVEN_URL: &str = "https://maven.fabricmc.net/";
pub const QUILT_META_URL: &str = "https://meta.quiltmc.org/v3/versions/loader";
pub const QUILT_MAVEN_URL: &str = "https://maven.quiltmc.org/repository/release/";
pub const NEOFORGE_MAVEN_URL: &str = "https://maven.neoforged.net/releases/";
pub const FORGE_MAVEN_URL: &str = "https://maven.minecraftforge.net/";
pub const ZULU_JRE_API_URL: &str = "https://api.azul.com/metadata/v1/zulu/packages";
