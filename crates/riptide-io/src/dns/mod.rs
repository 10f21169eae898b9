//! OS-backed name resolution.
//!
//! Forward (`resolve`) and reverse (`resolve_name`) lookups marshalled
//! through the platform's `getaddrinfo` / `getnameinfo`. This layer defers
//! all resolution policy to the operating system: no caching, no retries, no
//! reordering of results. The blocking native calls run on the worker pool
//! via [`crate::rt::run_blocking`]; the OS-allocated result list is walked
//! and released on the worker before anything is posted back to the
//! scheduler.

pub(crate) mod marshal;
pub(crate) mod walk;

use std::ffi::CString;
use std::net::SocketAddr;
use std::ptr;

use log::debug;
use riptide_core::{
    AddrInfo, AddrInfoFlag, AddrInfoHints, FlagMapping, NameInfoFlag, ResolutionKind, ResolveError,
};

use crate::rt;
use walk::AddrInfoList;

// ---------------------------------------------------------------------------
// Platform flag tables
// ---------------------------------------------------------------------------

// OpenBSD has no IPv4-mapped IPv6 addresses, so these two flags do not exist
// there; a zero bit makes them permanent no-ops.
#[cfg(not(target_os = "openbsd"))]
const AI_ALL_BITS: i32 = libc::AI_ALL;
#[cfg(target_os = "openbsd")]
const AI_ALL_BITS: i32 = 0;

#[cfg(not(target_os = "openbsd"))]
const AI_V4MAPPED_BITS: i32 = libc::AI_V4MAPPED;
#[cfg(target_os = "openbsd")]
const AI_V4MAPPED_BITS: i32 = 0;

/// Forward-resolution flag table for this platform.
pub const ADDR_INFO_FLAGS: FlagMapping<AddrInfoFlag> = FlagMapping::new(&[
    (AddrInfoFlag::Passive, libc::AI_PASSIVE),
    (AddrInfoFlag::CanonName, libc::AI_CANONNAME),
    (AddrInfoFlag::NumericHost, libc::AI_NUMERICHOST),
    (AddrInfoFlag::NumericServ, libc::AI_NUMERICSERV),
    (AddrInfoFlag::AddrConfig, libc::AI_ADDRCONFIG),
    (AddrInfoFlag::All, AI_ALL_BITS),
    (AddrInfoFlag::V4Mapped, AI_V4MAPPED_BITS),
]);

/// Reverse-resolution flag table for this platform.
pub const NAME_INFO_FLAGS: FlagMapping<NameInfoFlag> = FlagMapping::new(&[
    (NameInfoFlag::NoFqdn, libc::NI_NOFQDN),
    (NameInfoFlag::NumericHost, libc::NI_NUMERICHOST),
    (NameInfoFlag::NameReqd, libc::NI_NAMEREQD),
    (NameInfoFlag::NumericServ, libc::NI_NUMERICSERV),
    (NameInfoFlag::Dgram, libc::NI_DGRAM),
]);

/// Capacity of a reverse-lookup host buffer, terminating NUL included.
pub const NI_MAXHOST: usize = libc::NI_MAXHOST as usize;
/// Capacity of a reverse-lookup service buffer, terminating NUL included.
// The libc crate does not export NI_MAXSERV on the linux-gnu targets; glibc's
// <netdb.h> defines it as 32.
#[cfg(target_env = "gnu")]
pub const NI_MAXSERV: usize = 32;
#[cfg(not(target_env = "gnu"))]
pub const NI_MAXSERV: usize = libc::NI_MAXSERV as usize;

// ---------------------------------------------------------------------------
// Error translation
// ---------------------------------------------------------------------------

/// Native `EAI_*` codes with a dedicated classification; anything else is a
/// non-recoverable system failure.
const EAI_KINDS: &[(i32, ResolutionKind)] = &[
    (libc::EAI_NONAME, ResolutionKind::NameNotFound),
    (libc::EAI_SERVICE, ResolutionKind::ServiceNotFound),
    (libc::EAI_FAMILY, ResolutionKind::FamilyNotSupported),
    (libc::EAI_AGAIN, ResolutionKind::TemporaryFailure),
];

fn translate_eai(code: i32) -> ResolveError {
    let kind = EAI_KINDS
        .iter()
        .find(|(native, _)| *native == code)
        .map(|&(_, kind)| kind)
        .unwrap_or(ResolutionKind::SystemFailure);
    ResolveError::resolution(kind, code)
}

// ---------------------------------------------------------------------------
// Forward resolution
// ---------------------------------------------------------------------------

/// Resolves a host and/or service to an ordered list of socket addresses.
///
/// The order is the native resolver's preference order and is not touched
/// here. An empty `host` or `service` is passed to the resolver as a null
/// argument; both empty is rejected locally with
/// [`ResolveError::EmptyQuery`] because the native behavior for that input
/// is undefined.
///
/// The calling task suspends while `getaddrinfo` runs on a blocking worker.
/// Dropping the future abandons the wait only: the native call completes on
/// the worker and its result list is still released there.
pub async fn resolve(
    hints: Option<&AddrInfoHints>,
    host: &str,
    service: &str,
) -> Result<Vec<AddrInfo>, ResolveError> {
    if host.is_empty() && service.is_empty() {
        return Err(ResolveError::EmptyQuery);
    }
    let node = opt_cstring(host, "host")?;
    let serv = opt_cstring(service, "service")?;
    let hints = hints.cloned();
    let service_is_empty = service.is_empty();
    debug!("resolving host={host:?} service={service:?}");

    let addrs = rt::run_blocking(move || {
        let native_hints = hints.as_ref().map(|h| marshal::encode_hints(h, service_is_empty));
        let hints_ptr = native_hints
            .as_ref()
            .map_or(ptr::null(), |h| h as *const libc::addrinfo);
        let mut head: *mut libc::addrinfo = ptr::null_mut();
        // SAFETY: pointers are null or derive from live CStrings/structs
        // owned by this closure for the duration of the call.
        let rc = unsafe {
            libc::getaddrinfo(
                node.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
                serv.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
                hints_ptr,
                &mut head,
            )
        };
        // The guard releases the list on every exit path below, including
        // the error path where it is a no-op on a null head.
        // SAFETY: head is null or a list owned by this getaddrinfo call.
        let list = unsafe { AddrInfoList::new(head) };
        if rc != 0 {
            return Err(translate_eai(rc));
        }
        list.walk()
    })
    .await??;

    debug!("resolved {} address(es)", addrs.len());
    Ok(addrs)
}

/// Common-path lookup: all configured-family stream addresses for `host`.
pub async fn lookup_host(host: &str) -> Result<Vec<AddrInfo>, ResolveError> {
    let hints = AddrInfoHints::for_socket(libc::AF_UNSPEC, libc::SOCK_STREAM);
    resolve(Some(&hints), host, "").await
}

// ---------------------------------------------------------------------------
// Reverse resolution
// ---------------------------------------------------------------------------

/// Resolves a socket address back to a host and service name.
///
/// Each output buffer is allocated (at `NI_MAXHOST` / `NI_MAXSERV` capacity)
/// only when the corresponding output was requested; requesting neither
/// still issues the native call for its flag-validation side effects and
/// yields two empty strings.
pub async fn resolve_name(
    flags: &[NameInfoFlag],
    want_host: bool,
    want_service: bool,
    addr: SocketAddr,
) -> Result<(String, String), ResolveError> {
    let mask = NAME_INFO_FLAGS.pack(flags);
    let (storage, salen) = marshal::encode_sockaddr(addr);
    debug!("reverse-resolving {addr}");

    rt::run_blocking(move || {
        let mut host = vec![0u8; if want_host { NI_MAXHOST } else { 0 }];
        let mut serv = vec![0u8; if want_service { NI_MAXSERV } else { 0 }];
        // SAFETY: storage/salen describe a valid sockaddr; the output
        // pointers are null exactly when their lengths are zero.
        let rc = unsafe {
            libc::getnameinfo(
                (&storage as *const libc::sockaddr_storage).cast::<libc::sockaddr>(),
                salen,
                out_ptr(&mut host),
                host.len() as libc::socklen_t,
                out_ptr(&mut serv),
                serv.len() as libc::socklen_t,
                mask,
            )
        };
        if rc != 0 {
            return Err(translate_eai(rc));
        }
        Ok((marshal::decode_text(&host), marshal::decode_text(&serv)))
    })
    .await?
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Empty strings become null resolver arguments.
fn opt_cstring(text: &str, what: &str) -> Result<Option<CString>, ResolveError> {
    if text.is_empty() {
        return Ok(None);
    }
    CString::new(text)
        .map(Some)
        .map_err(|_| ResolveError::Encoding(format!("{what} contains an interior NUL byte")))
}

fn out_ptr(buf: &mut [u8]) -> *mut libc::c_char {
    if buf.is_empty() {
        ptr::null_mut()
    } else {
        buf.as_mut_ptr().cast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eai_codes_translate_to_kinds() {
        assert_eq!(
            translate_eai(libc::EAI_NONAME),
            ResolveError::resolution(ResolutionKind::NameNotFound, libc::EAI_NONAME)
        );
        assert_eq!(
            translate_eai(libc::EAI_AGAIN),
            ResolveError::resolution(ResolutionKind::TemporaryFailure, libc::EAI_AGAIN)
        );
    }

    #[test]
    fn unknown_eai_code_is_a_system_failure_with_code_kept() {
        let err = translate_eai(-9999);
        assert_eq!(
            err,
            ResolveError::resolution(ResolutionKind::SystemFailure, -9999)
        );
        assert_eq!(err.native_code(), Some(-9999));
    }

    #[test]
    fn core_query_flags_are_supported_here() {
        for flag in [
            AddrInfoFlag::Passive,
            AddrInfoFlag::CanonName,
            AddrInfoFlag::NumericHost,
            AddrInfoFlag::NumericServ,
        ] {
            assert!(ADDR_INFO_FLAGS.is_supported(flag), "{flag:?}");
        }
        assert!(NAME_INFO_FLAGS.is_supported(NameInfoFlag::NumericHost));
    }

    #[test]
    fn reverse_buffers_fit_maximum_names() {
        // A fully qualified domain name is at most 253 bytes plus the NUL.
        assert!(NI_MAXHOST > 253);
        assert!(NI_MAXSERV > 0);
    }

    #[test]
    fn empty_text_maps_to_null_argument() {
        assert!(opt_cstring("", "host").unwrap().is_none());
        assert!(opt_cstring("example.org", "host").unwrap().is_some());
    }

    #[test]
    fn interior_nul_is_rejected_before_the_native_call() {
        let err = opt_cstring("bad\0host", "host").unwrap_err();
        assert!(matches!(err, ResolveError::Encoding(_)));
    }
}
