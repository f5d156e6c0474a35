//! IP address and number allocation module.
//!
//! This module owns every sequence the compiler draws from: node prefixes
//! and ASNs, link address suffixes, and per-host UDP ports. Prefix
//! arithmetic lives in `prefix`.

pub mod allocator;
pub mod as_manager;
pub mod prefix;

// Re-export commonly used types
pub use allocator::{Counter, PortAllocator, SuffixAllocator};
pub use as_manager::AsnAllocator;
pub use prefix::{link_address, node_prefix, suffix_capacity};
