//! Platform-specific filesystem helpers: link creation and error
//! classification with user-facing guidance.

use std::{io, path::Path};

/// Coarse class of a filesystem failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsErrorKind {
    PermissionDenied,
    NotPermitted,
    ReadOnly,
    NoSpace,
    Busy,
    NotFound,
    NotADirectory,
    SymlinkLoop,
    CrossDevice,
    Other,
}

#[cfg(unix)]
const EPERM: i32 = 1;

#[cfg(any(target_os = "linux", target_os = "android"))]
const ELOOP: i32 = 40;

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
const ELOOP: i32 = 62;

impl FsErrorKind {
    pub fn classify(err: &io::Error) -> Self {
        #[cfg(unix)]
        match err.raw_os_error() {
            Some(EPERM) => return Self::NotPermitted,
            Some(ELOOP) => return Self::SymlinkLoop,
            _ => {},
        }
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::ReadOnlyFilesystem => Self::ReadOnly,
            io::ErrorKind::StorageFull => Self::NoSpace,
            io::ErrorKind::ResourceBusy => Self::Busy,
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::NotADirectory => Self::NotADirectory,
            io::ErrorKind::CrossesDevices => Self::CrossDevice,
            _ => Self::Other,
        }
    }

    /// Short hint telling the user what to do about it.
    pub fn guidance(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission denied; check ownership of the directory",
            Self::NotPermitted => {
                "operation not permitted; the file may be locked or protected by the system"
            },
            Self::ReadOnly => "the filesystem is read-only",
            Self::NoSpace => "no space left on device; free some disk space",
            Self::Busy => "resource busy; close programs using the file and retry",
            Self::NotFound => "file or directory not found; it may have been moved or deleted",
            Self::NotADirectory => "a path component is a file, expected a directory",
            Self::SymlinkLoop => "too many levels of symbolic links; check for a symlink cycle",
            Self::CrossDevice => "cannot link across filesystems; use copy mode instead",
            Self::Other => "unexpected filesystem error",
        }
    }
}

/// How a deployment link is realized on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Dir,
    File,
    /// Windows directory junction; realized as a directory symlink.
    Junction,
}

impl LinkKind {
    #[cfg(windows)]
    pub fn for_target(is_dir: bool) -> Self {
        if is_dir { Self::Junction } else { Self::File }
    }

    #[cfg(not(windows))]
    pub fn for_target(is_dir: bool) -> Self {
        if is_dir { Self::Dir } else { Self::File }
    }
}

/// Create `link` pointing at `original`.
#[cfg(unix)]
pub async fn create_link(original: &Path, link: &Path, _kind: LinkKind) -> io::Result<()> {
    tokio::fs::symlink(original, link).await
}

#[cfg(windows)]
pub async fn create_link(original: &Path, link: &Path, kind: LinkKind) -> io::Result<()> {
    match kind {
        LinkKind::File => tokio::fs::symlink_file(original, link).await,
        LinkKind::Dir | LinkKind::Junction => tokio::fs::symlink_dir(original, link).await,
    }
}

/// Remove a link itself, never its target.
#[cfg(not(windows))]
pub async fn remove_link(link: &Path) -> io::Result<()> {
    tokio::fs::remove_file(link).await
}

#[cfg(windows)]
pub async fn remove_link(link: &Path) -> io::Result<()> {
    // Directory links must be removed as directories.
    match tokio::fs::remove_file(link).await {
        Ok(()) => Ok(()),
        Err(_) => tokio::fs::remove_dir(link).await,
    }
}
