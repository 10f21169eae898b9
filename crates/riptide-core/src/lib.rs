//! # riptide-core
//!
//! Pure logic shared by the riptide I/O runtime.
//!
//! This crate holds everything that can be expressed without touching the
//! native boundary: the bitflag codec used to marshal resolver options, the
//! hint and result record types, and the unified error taxonomy. No `unsafe`
//! code is permitted at the crate level; the actual `getaddrinfo` /
//! `getnameinfo` calls live in `riptide-io`.

#![deny(unsafe_code)]

pub mod error;
pub mod flags;
pub mod types;

pub use error::{ResolutionKind, ResolveError};
pub use flags::{AddrInfoFlag, FlagMapping, NameInfoFlag};
pub use types::{AddrInfo, AddrInfoHints};
