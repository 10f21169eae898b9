//! Hint and result records for name resolution.

use std::net::SocketAddr;

use serde::Serialize;

use crate::flags::AddrInfoFlag;

/// Caller-supplied preferences constraining a resolution query.
///
/// Only the flag, family, socket-type and protocol fields are serialized into
/// the native hint; a hint never carries an address or canonical name, so
/// those have no place here. Family, socket type and protocol use the
/// platform's `AF_*` / `SOCK_*` / `IPPROTO_*` values (zero means
/// unspecified).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddrInfoHints {
    /// Query flags; packed into the native bitmask at the call boundary.
    pub flags: Vec<AddrInfoFlag>,
    /// Requested address family, or `0` for any.
    pub family: i32,
    /// Requested socket type, or `0` for any.
    pub socktype: i32,
    /// Requested protocol number, or `0` for any.
    pub protocol: i32,
}

impl AddrInfoHints {
    /// Hints constrained to the given family and socket type.
    pub fn for_socket(family: i32, socktype: i32) -> Self {
        AddrInfoHints {
            family,
            socktype,
            ..AddrInfoHints::default()
        }
    }
}

/// One resolved address, fully copied out of the native result list.
///
/// Immutable once constructed and independent of the native memory it was
/// decoded from: the socket address is held by value and the canonical name
/// is an owned copy (empty when the resolver reported none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddrInfo {
    /// Flags echoed back by the resolver; unknown native bits are dropped.
    pub flags: Vec<AddrInfoFlag>,
    /// Address family of `addr`.
    pub family: i32,
    /// Socket type this entry is valid for.
    pub socktype: i32,
    /// Protocol number this entry is valid for.
    pub protocol: i32,
    /// The resolved socket address.
    pub addr: SocketAddr,
    /// Resolver-reported canonical host name, or empty.
    pub canon_name: String,
}
