//! Traversal and scoped release of the OS-owned `addrinfo` list.
//!
//! The native resolver hands back a singly linked list that it alone may
//! free, and must free exactly once. [`AddrInfoList`] owns that obligation:
//! walking copies every node out by value, and `Drop` releases the whole
//! chain on every exit path: success, decode failure, or a native error
//! where the head is null and release is a guarded no-op.

use riptide_core::{AddrInfo, ResolveError};

use super::marshal;

/// Upper bound on list traversal.
///
/// Real resolvers return at most a handful of entries; a longer chain can
/// only mean a corrupted or cyclic list from a misbehaving native layer, so
/// traversal stops there with an encoding error instead of looping.
const MAX_CHAIN: usize = 256;

type ReleaseFn = unsafe fn(*mut libc::addrinfo);

/// Scoped ownership of a native result list.
pub(crate) struct AddrInfoList {
    head: *mut libc::addrinfo,
    release: ReleaseFn,
}

impl AddrInfoList {
    /// Takes ownership of a list returned by `getaddrinfo`.
    ///
    /// A null head is allowed and makes release a no-op.
    ///
    /// # Safety
    ///
    /// `head` must be null or the head of a well-formed list allocated by
    /// the native resolver, not freed elsewhere.
    pub(crate) unsafe fn new(head: *mut libc::addrinfo) -> Self {
        AddrInfoList {
            head,
            release: native_release,
        }
    }

    #[cfg(test)]
    pub(crate) unsafe fn with_release(head: *mut libc::addrinfo, release: ReleaseFn) -> Self {
        AddrInfoList { head, release }
    }

    /// Copies every node out in native order.
    ///
    /// The resolver's preference order ("best" first) is preserved; nothing
    /// is reordered here. A null head yields an empty vector.
    pub(crate) fn walk(&self) -> Result<Vec<AddrInfo>, ResolveError> {
        let mut addrs = Vec::new();
        let mut node = self.head.cast_const();
        while !node.is_null() {
            if addrs.len() == MAX_CHAIN {
                return Err(ResolveError::Encoding(format!(
                    "addrinfo chain exceeds {MAX_CHAIN} nodes"
                )));
            }
            // SAFETY: node belongs to the list this guard owns; decode
            // copies everything out before the next link is followed.
            let info = unsafe { marshal::decode_node(&*node) }?;
            addrs.push(info);
            // SAFETY: node is valid; ai_next is null at the tail.
            node = unsafe { (*node).ai_next };
        }
        Ok(addrs)
    }
}

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.head.is_null() {
            // SAFETY: head came from the matching native allocator and this
            // guard is its only owner; released exactly once here.
            unsafe { (self.release)(self.head) };
        }
    }
}

unsafe fn native_release(head: *mut libc::addrinfo) {
    // SAFETY: forwarded from the guard's ownership contract.
    unsafe { libc::freeaddrinfo(head) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::net::SocketAddr;
    use std::ptr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // One counter per test: tests run in parallel and must not observe each
    // other's releases.
    macro_rules! counting_release_fn {
        ($name:ident, $counter:ident) => {
            static $counter: AtomicUsize = AtomicUsize::new(0);
            unsafe fn $name(head: *mut libc::addrinfo) {
                $counter.fetch_add(1, Ordering::SeqCst);
                unsafe { free_test_chain(head) };
            }
        };
    }

    /// Leaks one list node backed by Rust allocations; freed by
    /// `free_test_chain`, never by the real `freeaddrinfo`.
    fn leak_node(addr: SocketAddr, canon: Option<&str>, next: *mut libc::addrinfo) -> *mut libc::addrinfo {
        let (storage, salen) = marshal::encode_sockaddr(addr);
        let canonname = match canon {
            Some(text) => CString::new(text).unwrap().into_raw(),
            None => ptr::null_mut(),
        };
        Box::into_raw(Box::new(libc::addrinfo {
            ai_flags: libc::AI_NUMERICHOST,
            ai_family: match addr {
                SocketAddr::V4(_) => libc::AF_INET,
                SocketAddr::V6(_) => libc::AF_INET6,
            },
            ai_socktype: libc::SOCK_STREAM,
            ai_protocol: libc::IPPROTO_TCP,
            ai_addrlen: salen,
            ai_addr: Box::into_raw(Box::new(storage)).cast::<libc::sockaddr>(),
            ai_canonname: canonname,
            ai_next: next,
        }))
    }

    unsafe fn free_test_chain(mut node: *mut libc::addrinfo) {
        while !node.is_null() {
            let next = unsafe { (*node).ai_next };
            let addr = unsafe { (*node).ai_addr };
            if !addr.is_null() {
                drop(unsafe { Box::from_raw(addr.cast::<libc::sockaddr_storage>()) });
            }
            let canon = unsafe { (*node).ai_canonname };
            if !canon.is_null() {
                drop(unsafe { CString::from_raw(canon) });
            }
            drop(unsafe { Box::from_raw(node) });
            node = next;
        }
    }

    #[test]
    fn null_head_walks_empty_and_never_releases() {
        counting_release_fn!(release, NULL_RELEASES);
        {
            let list = unsafe { AddrInfoList::with_release(ptr::null_mut(), release) };
            assert!(list.walk().unwrap().is_empty());
        }
        assert_eq!(NULL_RELEASES.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn walk_preserves_native_order_and_copies_out() {
        let third = leak_node("127.0.0.3:3".parse().unwrap(), None, ptr::null_mut());
        let second = leak_node("127.0.0.2:2".parse().unwrap(), None, third);
        let first = leak_node("127.0.0.1:1".parse().unwrap(), Some("alpha.example"), second);

        counting_release_fn!(release, ORDER_RELEASES);
        let addrs = {
            let list = unsafe { AddrInfoList::with_release(first, release) };
            list.walk().unwrap()
        };
        // Records outlive the released list: fully independent copies.
        assert_eq!(addrs.len(), 3);
        assert_eq!(addrs[0].addr, "127.0.0.1:1".parse::<SocketAddr>().unwrap());
        assert_eq!(addrs[1].addr, "127.0.0.2:2".parse::<SocketAddr>().unwrap());
        assert_eq!(addrs[2].addr, "127.0.0.3:3".parse::<SocketAddr>().unwrap());
        assert_eq!(addrs[0].canon_name, "alpha.example");
        assert_eq!(addrs[1].canon_name, "");
        assert_eq!(
            addrs[0].flags,
            vec![riptide_core::AddrInfoFlag::NumericHost]
        );
        assert_eq!(addrs[0].socktype, libc::SOCK_STREAM);
    }

    #[test]
    fn each_chain_is_released_exactly_once() {
        counting_release_fn!(release, ONCE_RELEASES);
        let head = leak_node("127.0.0.1:80".parse().unwrap(), None, ptr::null_mut());
        {
            let list = unsafe { AddrInfoList::with_release(head, release) };
            let _ = list.walk();
        }
        assert_eq!(ONCE_RELEASES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decode_failure_still_releases_the_chain() {
        counting_release_fn!(release, FAIL_RELEASES);
        let head = leak_node("127.0.0.1:80".parse().unwrap(), None, ptr::null_mut());
        // Corrupt the node so decoding fails.
        unsafe { (*head).ai_addrlen = 1 };
        {
            let list = unsafe { AddrInfoList::with_release(head, release) };
            assert!(matches!(list.walk(), Err(ResolveError::Encoding(_))));
        }
        assert_eq!(FAIL_RELEASES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cyclic_chain_is_bounded_not_looped() {
        counting_release_fn!(release, CYCLE_RELEASES);
        let second = leak_node("127.0.0.2:2".parse().unwrap(), None, ptr::null_mut());
        let first = leak_node("127.0.0.1:1".parse().unwrap(), None, second);
        unsafe { (*second).ai_next = first };

        let list = unsafe { AddrInfoList::with_release(first, release) };
        assert!(matches!(list.walk(), Err(ResolveError::Encoding(_))));

        // Break the cycle so the release walk terminates.
        unsafe { (*second).ai_next = ptr::null_mut() };
        drop(list);
        assert_eq!(CYCLE_RELEASES.load(Ordering::SeqCst), 1);
    }
}
