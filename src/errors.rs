//! Stable error taxonomy for the launcher's public seam.
//!
//! Internal call chains keep using `anyhow::Error` with `.context(...)`;
//! only the outward-facing `Launcher` methods classify failures into one
//! of these kinds before returning them to a caller.

use std::fmt;

/// The twelve stable error kinds exposed across the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    NotFound,
    Network,
    Timeout,
    HashMismatch,
    ArchiveInvalid,
    ProfileInvalid,
    PlatformUnsupported,
    JavaMissing,
    PatchFailed,
    LaunchFailed,
    AlreadyRunning,
    Aborted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::HashMismatch => "hash_mismatch",
            ErrorKind::ArchiveInvalid => "archive_invalid",
            ErrorKind::ProfileInvalid => "profile_invalid",
            ErrorKind::PlatformUnsupported => "platform_unsupported",
            ErrorKind::JavaMissing => "java_missing",
            ErrorKind::PatchFailed => "patch_failed",
            ErrorKind::LaunchFailed => "launch_failed",
            ErrorKind::AlreadyRunning => "already_running",
            ErrorKind::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// A classified failure returned from a public `Launcher` method.
///
/// Wraps the underlying `anyhow::Error` chain (full context preserved for
/// logging) behind a stable `kind` a caller can match on.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {source}")]
pub struct LauncherError {
    pub kind: ErrorKind,
    #[source]
    source: anyhow::Error,
}

impl LauncherError {
    pub fn new(kind: ErrorKind, source: anyhow::Error) -> Self {
        Self { kind, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Classify a generic error as `NotFound` unless it already carries a kind.
    pub fn not_found(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::NotFound, source)
    }

    pub fn network(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::Network, source)
    }

    pub fn timeout(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::Timeout, source)
    }

    pub fn hash_mismatch(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::HashMismatch, source)
    }

    pub fn archive_invalid(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::ArchiveInvalid, source)
    }

    pub fn profile_invalid(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::ProfileInvalid, source)
    }

    pub fn platform_unsupported(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::PlatformUnsupported, source)
    }

    pub fn java_missing(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::JavaMissing, source)
    }

    pub fn patch_failed(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::PatchFailed, source)
    }

    pub fn launch_failed(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::LaunchFailed, source)
    }

    pub fn already_running() -> Self {
        Self::new(
            ErrorKind::AlreadyRunning,
            anyhow::anyhow!("a process is already running for this launcher instance"),
        )
    }

    pub fn aborted() -> Self {
        Self::new(ErrorKind::Aborted, anyhow::anyhow!("operation cancelled"))
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_source() {
        let err = LauncherError::hash_mismatch(anyhow::anyhow!("sha1 mismatch for foo.jar"));
        let rendered = err.to_string();
        assert!(rendered.starts_with("hash_mismatch:"));
        assert!(rendered.contains("sha1 mismatch"));
    }

    #[test]
    fn already_running_has_stable_kind() {
        assert_eq!(LauncherError::already_running().kind(), ErrorKind::AlreadyRunning);
    }
}
