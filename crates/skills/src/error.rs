use std::{error::Error as StdError, path::PathBuf};

use skillet_common::{BoxError, FromMessage};

use crate::{platform::FsErrorKind, types::AssetKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("cannot resolve source '{input}': {reason}")]
    Resolution { input: String, reason: String },
    #[error("failed to fetch {url}: {message}")]
    Transfer { url: String, message: String },
    #[error("invalid manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },
    #[error("{path}: {message} ({})", .kind.guidance())]
    Filesystem {
        kind: FsErrorKind,
        path: PathBuf,
        message: String,
    },
    #[error("agent '{agent}' has no {kind} directory for this scope")]
    Unsupported { agent: String, kind: AssetKind },
    #[error("{message}")]
    Message { message: String },
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn resolution(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            input: input.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn transfer(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transfer {
            url: url.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classify a raw I/O failure on `path`.
    #[must_use]
    pub fn filesystem(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        Self::Filesystem {
            kind: FsErrorKind::classify(source),
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// The filesystem classification, when this is a filesystem error.
    pub fn fs_kind(&self) -> Option<FsErrorKind> {
        match self {
            Self::Filesystem { kind, .. } => Some(*kind),
            Self::Io(e) => Some(FsErrorKind::classify(e)),
            _ => None,
        }
    }

    /// A copy suitable for reporting the same failure against several targets.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Filesystem {
                kind,
                path,
                message,
            } => Self::Filesystem {
                kind: *kind,
                path: path.clone(),
                message: message.clone(),
            },
            Self::Transfer { url, message } => Self::transfer(url.clone(), message.clone()),
            other => Self::message(other.to_string()),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }

    fn from_source(context: String, source: BoxError) -> Self {
        Self::External { context, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

skillet_common::impl_context!(Error);
