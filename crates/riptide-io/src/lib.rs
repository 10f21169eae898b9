//! # riptide-io
//!
//! The native boundary of the riptide runtime.
//!
//! Two subsystems live here: OS-backed name resolution (forward and reverse,
//! marshalled through `struct addrinfo` and bridged onto the cooperative
//! scheduler), and child-process lifecycle management with redirected
//! standard streams. Pure logic (the flag codec, record types and error
//! taxonomy) lives in `riptide-core`; this crate owns every `unsafe` call
//! into the platform resolver.

pub mod dns;
pub mod process;
pub mod rt;

pub use riptide_core::{
    AddrInfo, AddrInfoFlag, AddrInfoHints, FlagMapping, NameInfoFlag, ResolutionKind, ResolveError,
};
