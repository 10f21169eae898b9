//! Marshalling between managed records and native resolver structures.
//!
//! Encoding writes a hint into a `libc::addrinfo` whose output fields stay
//! null; a hint must never appear to already carry a result. Decoding reads
//! an OS-owned node fully by value: no native pointer survives past the
//! decode step.

use std::ffi::CStr;
use std::mem::size_of;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr;

use log::debug;
use riptide_core::{AddrInfo, AddrInfoFlag, AddrInfoHints, ResolveError};

use super::ADDR_INFO_FLAGS;

/// Windows `getaddrinfo` faults when `AI_NUMERICSERV` is set and the service
/// string is empty; the flag is dropped there before the native call rather
/// than surfacing the platform defect to the caller.
const NUMERIC_SERV_EMPTY_SERVICE_FAULT: bool = cfg!(windows);

// ---------------------------------------------------------------------------
// Hint encoding
// ---------------------------------------------------------------------------

/// Serializes a hint record into native layout.
///
/// Only flags, family, socket type and protocol are written; the address,
/// canonical-name and next pointers are the resolver's output fields and
/// stay null.
pub(crate) fn encode_hints(hints: &AddrInfoHints, service_is_empty: bool) -> libc::addrinfo {
    libc::addrinfo {
        ai_flags: hint_mask(&hints.flags, service_is_empty),
        ai_family: hints.family,
        ai_socktype: hints.socktype,
        ai_protocol: hints.protocol,
        ai_addrlen: 0,
        ai_addr: ptr::null_mut(),
        ai_canonname: ptr::null_mut(),
        ai_next: ptr::null_mut(),
    }
}

fn hint_mask(flags: &[AddrInfoFlag], service_is_empty: bool) -> i32 {
    sanitized_mask(flags, service_is_empty, NUMERIC_SERV_EMPTY_SERVICE_FAULT)
}

fn sanitized_mask(flags: &[AddrInfoFlag], service_is_empty: bool, faulty_platform: bool) -> i32 {
    let mask = ADDR_INFO_FLAGS.pack(flags);
    if !(faulty_platform && service_is_empty) {
        return mask;
    }
    let numeric_serv = ADDR_INFO_FLAGS.pack(&[AddrInfoFlag::NumericServ]);
    if mask & numeric_serv != 0 {
        debug!("dropping numeric-service flag: empty service on a faulting platform");
    }
    mask & !numeric_serv
}

// ---------------------------------------------------------------------------
// Node decoding
// ---------------------------------------------------------------------------

/// Decodes one native node into an owned, pointer-free record.
///
/// # Safety
///
/// `node` must be a live node of a list produced by the native resolver,
/// honoring the `addrinfo` contract (`ai_addr`/`ai_addrlen` describe a valid
/// socket address, `ai_canonname` is null or NUL-terminated).
pub(crate) unsafe fn decode_node(node: &libc::addrinfo) -> Result<AddrInfo, ResolveError> {
    // SAFETY: forwarded from the caller's contract.
    let addr = unsafe { decode_sockaddr(node.ai_addr, node.ai_addrlen) }?;
    let canon_name = if node.ai_canonname.is_null() {
        String::new()
    } else {
        // SAFETY: non-null ai_canonname is a NUL-terminated string owned by
        // the node; copied out before the list is released.
        unsafe { CStr::from_ptr(node.ai_canonname) }
            .to_string_lossy()
            .into_owned()
    };
    Ok(AddrInfo {
        flags: ADDR_INFO_FLAGS.unpack(node.ai_flags),
        family: node.ai_family,
        socktype: node.ai_socktype,
        protocol: node.ai_protocol,
        addr,
        canon_name,
    })
}

/// Decodes a native socket address by value.
///
/// # Safety
///
/// `sa` must be null or valid for reads of `salen` bytes.
pub(crate) unsafe fn decode_sockaddr(
    sa: *const libc::sockaddr,
    salen: libc::socklen_t,
) -> Result<SocketAddr, ResolveError> {
    if sa.is_null() {
        return Err(ResolveError::Encoding("null socket address".into()));
    }
    // SAFETY: sa is non-null and valid per the caller's contract.
    let family = i32::from(unsafe { (*sa).sa_family });
    match family {
        libc::AF_INET => {
            if (salen as usize) < size_of::<libc::sockaddr_in>() {
                return Err(ResolveError::Encoding(format!(
                    "IPv4 socket address truncated to {salen} bytes"
                )));
            }
            // SAFETY: length checked above.
            let sin = unsafe { &*sa.cast::<libc::sockaddr_in>() };
            let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
            Ok(SocketAddr::V4(SocketAddrV4::new(
                ip,
                u16::from_be(sin.sin_port),
            )))
        }
        libc::AF_INET6 => {
            if (salen as usize) < size_of::<libc::sockaddr_in6>() {
                return Err(ResolveError::Encoding(format!(
                    "IPv6 socket address truncated to {salen} bytes"
                )));
            }
            // SAFETY: length checked above.
            let sin6 = unsafe { &*sa.cast::<libc::sockaddr_in6>() };
            Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        other => Err(ResolveError::Encoding(format!(
            "unsupported address family {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Socket-address encoding (reverse direction)
// ---------------------------------------------------------------------------

/// Encodes a socket address into native storage for `getnameinfo`.
pub(crate) fn encode_sockaddr(addr: SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    // SAFETY: sockaddr_storage is plain old data; all-zero is valid.
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr {
                    s_addr: u32::from_be_bytes(v4.ip().octets()).to_be(),
                },
                // SAFETY: remaining fields (zero padding, BSD length byte)
                // are plain old data.
                ..unsafe { std::mem::zeroed() }
            };
            // SAFETY: storage is at least as large as sockaddr_in.
            unsafe {
                ptr::copy_nonoverlapping(
                    (&sin as *const libc::sockaddr_in).cast::<u8>(),
                    (&mut storage as *mut libc::sockaddr_storage).cast::<u8>(),
                    size_of::<libc::sockaddr_in>(),
                );
            }
            size_of::<libc::sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr {
                    s6_addr: v6.ip().octets(),
                },
                sin6_scope_id: v6.scope_id(),
                // SAFETY: remaining fields are plain old data.
                ..unsafe { std::mem::zeroed() }
            };
            // SAFETY: storage is at least as large as sockaddr_in6.
            unsafe {
                ptr::copy_nonoverlapping(
                    (&sin6 as *const libc::sockaddr_in6).cast::<u8>(),
                    (&mut storage as *mut libc::sockaddr_storage).cast::<u8>(),
                    size_of::<libc::sockaddr_in6>(),
                );
            }
            size_of::<libc::sockaddr_in6>()
        }
    };
    (storage, len as libc::socklen_t)
}

/// Decodes a NUL-terminated output buffer as text.
///
/// Bytes beyond the first NUL are untouched scratch space and ignored.
pub(crate) fn decode_text(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
