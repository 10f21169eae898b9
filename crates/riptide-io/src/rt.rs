//! Bridge between blocking native calls and the cooperative scheduler.
//!
//! The resolver entry points (`getaddrinfo`, `getnameinfo`) may block on real
//! DNS traffic, so they are never run on a scheduler thread. Every blocking
//! native call in this crate goes through [`run_blocking`], which is the one
//! demarcated suspension point: the calling task parks at the `.await` and
//! resumes when the worker posts its result back.

use riptide_core::ResolveError;

/// Runs `f` on the bounded blocking worker pool and suspends the caller
/// until it finishes.
///
/// Cancellation semantics: once dispatched, the closure is not preemptible.
/// Dropping the returned future only abandons the wait; the worker still
/// runs `f` to completion and discards the result, so any native memory the
/// closure acquires must be released inside the closure itself.
///
/// A lost worker (panic or pool shutdown) surfaces as
/// [`ResolveError::Worker`] rather than being conflated with a native
/// resolver failure.
pub async fn run_blocking<T, F>(f: F) -> Result<T, ResolveError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ResolveError::Worker(e.to_string()))
}
