//! IPv6 prefix arithmetic.
//!
//! Node prefixes are carved out of the configured base block by placing the
//! node's index directly above the node prefix length; link addresses are
//! the node prefix's network address plus a suffix in the low bits.

use ipnetwork::Ipv6Network;
use std::net::Ipv6Addr;

use crate::config::AddressingConfig;

/// Prefix for the node with the given index.
///
/// With the default `2a07:1500::/32` base and /48 node prefixes, index 1
/// yields `2a07:1500:1::/48` and index 0x2a yields `2a07:1500:2a::/48`.
/// Returns `None` when the index does not fit between the two lengths.
pub fn node_prefix(addressing: &AddressingConfig, index: u32) -> Option<Ipv6Network> {
    if index > addressing.max_index() {
        return None;
    }
    let base = u128::from(addressing.base_prefix.network());
    let shift = 128 - u32::from(addressing.prefix_len);
    let network = base | (u128::from(index) << shift);
    Ipv6Network::new(Ipv6Addr::from(network), addressing.prefix_len).ok()
}

/// Address `suffix` inside `prefix`
pub fn link_address(prefix: &Ipv6Network, suffix: u64) -> Ipv6Addr {
    Ipv6Addr::from(u128::from(prefix.network()) + u128::from(suffix))
}

/// Number of distinct suffixes available below a prefix of `prefix_len`,
/// capped to what a `u64` suffix counter can express.
pub fn suffix_capacity(prefix_len: u8) -> u64 {
    match 128u32.saturating_sub(u32::from(prefix_len)) {
        bits if bits >= 64 => u64::MAX,
        bits => 1u64 << bits,
    }
}
