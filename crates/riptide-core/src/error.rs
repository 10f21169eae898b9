//! Error taxonomy for name resolution.
//!
//! Native resolver failures are translated into a small set of kinds; the raw
//! platform code is always preserved for diagnostics. Translation from
//! `EAI_*` codes happens in `riptide-io`, which owns the platform table.

use thiserror::Error;

/// Classified reason for a native resolver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// The host name is not known (`EAI_NONAME`).
    NameNotFound,
    /// The service name is not known for the socket type (`EAI_SERVICE`).
    ServiceNotFound,
    /// The requested address family is not supported (`EAI_FAMILY`).
    FamilyNotSupported,
    /// A transient resolver failure; the caller may retry (`EAI_AGAIN`).
    TemporaryFailure,
    /// Any other non-recoverable resolver or system failure.
    SystemFailure,
}

impl std::fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ResolutionKind::NameNotFound => "name or service not known",
            ResolutionKind::ServiceNotFound => "service not supported for socket type",
            ResolutionKind::FamilyNotSupported => "address family not supported",
            ResolutionKind::TemporaryFailure => "temporary failure in name resolution",
            ResolutionKind::SystemFailure => "non-recoverable failure in name resolution",
        };
        f.write_str(text)
    }
}

/// Failure of a forward or reverse resolution call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The native resolver reported a failure.
    #[error("{kind} (native code {code})")]
    Resolution {
        /// Translated failure classification.
        kind: ResolutionKind,
        /// Raw platform error code, kept for diagnostics.
        code: i32,
    },

    /// The native result buffer did not honor the resolver contract.
    ///
    /// Defensive: not expected once the resolver returns success.
    #[error("malformed native resolver result: {0}")]
    Encoding(String),

    /// Both the host and the service argument were empty.
    ///
    /// The native call's behavior is undefined for this input, so it is
    /// rejected before any native call is issued.
    #[error("host and service must not both be empty")]
    EmptyQuery,

    /// The blocking worker running the native call was lost.
    #[error("resolver worker failed: {0}")]
    Worker(String),
}

impl ResolveError {
    /// Builds the native-failure variant.
    pub fn resolution(kind: ResolutionKind, code: i32) -> Self {
        ResolveError::Resolution { kind, code }
    }

    /// Returns the raw native code for `Resolution` errors.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            ResolveError::Resolution { code, .. } => Some(*code),
            _ => None,
        }
    }
}
