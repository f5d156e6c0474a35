//! Autonomous System (AS) number management.
//!
//! Each simulated router gets its own ASN. The same number doubles as the
//! index of the router's address prefix, so ASN N always announces the
//! N-th prefix out of the base block.

use super::allocator::Counter;

/// Hands out ASNs / prefix indices in strictly increasing order
#[derive(Debug, Clone)]
pub struct AsnAllocator {
    counter: Counter,
}

impl AsnAllocator {
    /// Allocator whose first ASN is 1 and last is `max`
    pub fn new(max: u32) -> Self {
        Self::starting_at(1, max)
    }

    pub fn starting_at(first: u32, max: u32) -> Self {
        Self {
            counter: Counter::new(u64::from(first), 1, u64::from(max) + 1),
        }
    }

    /// Next ASN, or `None` when the range is used up
    pub fn next_asn(&mut self) -> Option<u32> {
        self.counter.advance().and_then(|asn| u32::try_from(asn).ok())
    }

    /// Number the next call would return
    pub fn peek(&self) -> u64 {
        self.counter.peek()
    }
}
