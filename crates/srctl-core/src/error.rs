//! Error taxonomy for `srctl`.
//!
//! `spec.md` §9 flags substring matching on error messages ("already
//! exists", "status 422", ...) as fragile and suggests a tagged variant
//! instead. [`SrctlError`] is that tagged variant: HTTP status codes and
//! registry error bodies are classified into it once, at the
//! `srctl-registry` boundary, so the applier and retry harness never parse
//! an error message again.

use thiserror::Error;

/// Sub-classification of a 4xx response from the target or source registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// 409 — another writer raced us, or the subject already has this
    /// schema/version registered.
    Conflict,
    /// 400 — malformed request.
    BadRequest,
    /// 422 — schema rejected as invalid or incompatible.
    Unprocessable,
    /// 404 — subject, version, or schema not found.
    NotFound,
    /// 405 — the registry does not support the requested delete mode.
    MethodNotAllowed,
    Other,
}

#[derive(Debug, Error)]
pub enum SrctlError {
    /// Network failure, timeout, or connection reset — always worth a retry.
    #[error("transient error: {0}")]
    Transient(String),
    /// 5xx from the registry.
    #[error("server error (status {0}): {1}")]
    ServerError(u16, String),
    /// 4xx from the registry, classified by [`ClientErrorKind`].
    #[error("client error ({0:?}): {1}")]
    ClientError(ClientErrorKind, String),
    /// Malformed log record key or value.
    #[error("decode error: {0}")]
    Decode(String),
    /// The operation was aborted by cancellation, not by a fault.
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SrctlError {
    /// Total, non-fragile replacement for substring-matching on error
    /// messages: every variant has a defined retry disposition.
    pub fn is_retryable(&self) -> bool {
        match self {
            SrctlError::Transient(_) | SrctlError::ServerError(_, _) => true,
            SrctlError::ClientError(kind, _) => !matches!(
                kind,
                ClientErrorKind::BadRequest | ClientErrorKind::Unprocessable
            ),
            SrctlError::Decode(_) | SrctlError::Cancelled => false,
            SrctlError::Other(_) => true,
        }
    }

    /// A register call failed because the target already has this schema
    /// under this subject — re-applying a replayed event should count as
    /// success, not as a new registration.
    pub fn is_already_registered(&self) -> bool {
        matches!(self, SrctlError::ClientError(ClientErrorKind::Conflict, msg) if msg.to_lowercase().contains("already"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SrctlError::ClientError(ClientErrorKind::NotFound, _))
    }

    pub fn is_method_not_allowed(&self) -> bool {
        matches!(
            self,
            SrctlError::ClientError(ClientErrorKind::MethodNotAllowed, _)
        )
    }
}
