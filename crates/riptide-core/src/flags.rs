//! Bitflag codec for resolver options.
//!
//! Logical query flags are translated to and from native bitmasks through an
//! ordered data table rather than conditionals scattered through the call
//! sites. A table entry with a zero native bit marks a flag the target
//! platform does not provide: it packs to nothing and never round-trips,
//! which makes it a permanent no-op there.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Logical flag domains
// ---------------------------------------------------------------------------

/// Options for a forward (name to address) resolution query.
///
/// Each variant corresponds to a POSIX `AI_*` flag; the platform bit values
/// live in the mapping tables built by `riptide-io`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddrInfoFlag {
    /// Only return families configured on this host (`AI_ADDRCONFIG`).
    AddrConfig,
    /// With `V4Mapped`, return both mapped and native addresses (`AI_ALL`).
    All,
    /// Request the canonical name of the host (`AI_CANONNAME`).
    CanonName,
    /// The host argument is a numeric address string (`AI_NUMERICHOST`).
    NumericHost,
    /// The service argument is a numeric port string (`AI_NUMERICSERV`).
    NumericServ,
    /// Resolve for a listening socket (`AI_PASSIVE`).
    Passive,
    /// Map IPv4 results to IPv6 when no IPv6 exists (`AI_V4MAPPED`).
    V4Mapped,
}

/// Options for a reverse (address to name) resolution query.
///
/// Each variant corresponds to a POSIX `NI_*` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameInfoFlag {
    /// The address refers to a datagram service (`NI_DGRAM`).
    Dgram,
    /// Fail instead of returning a numeric host string (`NI_NAMEREQD`).
    NameReqd,
    /// Return only the hostname part for local hosts (`NI_NOFQDN`).
    NoFqdn,
    /// Return the numeric form of the host (`NI_NUMERICHOST`).
    NumericHost,
    /// Return the numeric form of the service (`NI_NUMERICSERV`).
    NumericServ,
}

// ---------------------------------------------------------------------------
// Mapping table
// ---------------------------------------------------------------------------

/// Ordered mapping from logical flags to native bit values.
///
/// Invariant: each logical flag appears at most once, and no entry's bit
/// pattern may be a strict superset of another's: `unpack` clears matched
/// bits as it goes, so an overlapping table would decode ambiguously.
/// Violating this is a programming error in the table, not a runtime
/// condition.
#[derive(Debug, Clone, Copy)]
pub struct FlagMapping<F: 'static> {
    entries: &'static [(F, i32)],
}

impl<F: Copy + PartialEq> FlagMapping<F> {
    /// Wraps a static table of `(logical flag, native bits)` entries.
    pub const fn new(entries: &'static [(F, i32)]) -> Self {
        Self { entries }
    }

    /// Folds a flag set into a native bitmask.
    ///
    /// Flags without a table entry are ignored; duplicates are harmless
    /// because OR is idempotent. The result is independent of the order of
    /// `flags`.
    pub fn pack(&self, flags: &[F]) -> i32 {
        self.entries
            .iter()
            .filter(|(flag, _)| flags.contains(flag))
            .fold(0, |mask, &(_, bits)| mask | bits)
    }

    /// Recovers the flag set encoded in a native bitmask.
    ///
    /// Entries are consumed in table order; a flag is emitted when all of its
    /// (nonzero) bits remain set, and those bits are cleared before the next
    /// entry is considered. Residual bits with no table entry are silently
    /// dropped. The output never contains duplicates.
    pub fn unpack(&self, mask: i32) -> Vec<F> {
        let mut remaining = mask;
        let mut flags = Vec::new();
        for &(flag, bits) in self.entries {
            if bits != 0 && remaining & bits == bits {
                flags.push(flag);
                remaining &= !bits;
            }
        }
        flags
    }

    /// Returns `true` if the platform provides a nonzero bit for `flag`.
    pub fn is_supported(&self, flag: F) -> bool {
        self.pack(&[flag]) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Probe {
        A,
        B,
        C,
        Absent,
    }

    const TABLE: FlagMapping<Probe> = FlagMapping::new(&[
        (Probe::A, 0x1),
        (Probe::B, 0x4),
        (Probe::C, 0x10),
        (Probe::Absent, 0),
    ]);

    #[test]
    fn pack_empty_is_zero() {
        assert_eq!(TABLE.pack(&[]), 0);
    }

    #[test]
    fn unpack_zero_is_empty() {
        assert!(TABLE.unpack(0).is_empty());
    }

    #[test]
    fn pack_is_or_fold() {
        assert_eq!(TABLE.pack(&[Probe::A, Probe::C]), 0x11);
        assert_eq!(TABLE.pack(&[Probe::C, Probe::A]), 0x11);
    }

    #[test]
    fn pack_ignores_duplicates() {
        assert_eq!(TABLE.pack(&[Probe::B, Probe::B]), 0x4);
    }

    #[test]
    fn absent_flag_packs_to_zero() {
        assert_eq!(TABLE.pack(&[Probe::Absent]), 0);
        assert!(!TABLE.is_supported(Probe::Absent));
        assert!(TABLE.is_supported(Probe::A));
    }

    #[test]
    fn round_trip_covers_supported_flags() {
        let input = [Probe::A, Probe::B, Probe::Absent];
        let decoded = TABLE.unpack(TABLE.pack(&input));
        assert!(decoded.contains(&Probe::A));
        assert!(decoded.contains(&Probe::B));
        // Unsupported flags pack to zero bits and cannot round-trip.
        assert!(!decoded.contains(&Probe::Absent));
    }

    #[test]
    fn unpack_drops_unknown_bits() {
        assert_eq!(TABLE.unpack(0x4 | 0x8000), vec![Probe::B]);
    }

    #[test]
    fn unpack_never_emits_absent_flag() {
        // A zero entry would otherwise match any mask.
        assert_eq!(TABLE.unpack(0x15), vec![Probe::A, Probe::B, Probe::C]);
    }

    #[test]
    fn unpack_clears_matched_bits() {
        // Table order consumes bits left to right; each bit is reported once.
        let decoded = TABLE.unpack(0x5);
        assert_eq!(decoded, vec![Probe::A, Probe::B]);
    }
}
