//! Sequence allocators for link numbering.
//!
//! Every number the compiler hands out (address suffixes, UDP ports) comes
//! from one of these objects. They are plain values owned by the phase that
//! uses them, so tests can seed them at arbitrary starting points.

use std::collections::HashMap;
use std::net::IpAddr;

/// Monotonic counter with a fixed step and an exclusive upper bound
#[derive(Debug, Clone)]
pub struct Counter {
    next: u64,
    step: u64,
    limit: u64,
}

impl Counter {
    pub fn new(start: u64, step: u64, limit: u64) -> Self {
        Self { next: start, step, limit }
    }

    /// Value the next call to `advance` will return
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Take the current value and move forward one step.
    ///
    /// Returns `None` once the block `[value, value + step)` would cross
    /// the limit; the counter does not move in that case.
    pub fn advance(&mut self) -> Option<u64> {
        let value = self.next;
        let end = value.checked_add(self.step)?;
        if end > self.limit {
            return None;
        }
        self.next = end;
        Some(value)
    }
}

/// Hands out even/odd suffix pairs, one pair per link, never reused.
#[derive(Debug, Clone)]
pub struct SuffixAllocator {
    counter: Counter,
}

impl SuffixAllocator {
    /// `capacity` is the number of addresses available below a node prefix.
    pub fn new(capacity: u64) -> Self {
        Self::starting_at(0, capacity)
    }

    /// Allocator whose first pair starts at `start` (rounded down to even).
    pub fn starting_at(start: u64, capacity: u64) -> Self {
        Self {
            counter: Counter::new(start & !1, 2, capacity),
        }
    }

    /// Next `(even, odd)` pair
    pub fn next_pair(&mut self) -> Option<(u64, u64)> {
        self.counter.advance().map(|even| (even, even + 1))
    }

    pub fn allocated(&self) -> u64 {
        self.counter.peek()
    }
}

/// Per-host UDP port counters, each seeded at the same base
#[derive(Debug, Clone)]
pub struct PortAllocator {
    base: u16,
    counters: HashMap<IpAddr, Counter>,
}

impl PortAllocator {
    pub fn new(base: u16) -> Self {
        Self {
            base,
            counters: HashMap::new(),
        }
    }

    /// Next free port on `host`
    pub fn next_port(&mut self, host: IpAddr) -> Option<u16> {
        let base = self.base;
        let counter = self
            .counters
            .entry(host)
            .or_insert_with(|| Counter::new(u64::from(base), 1, u64::from(u16::MAX) + 1));
        counter.advance().and_then(|port| u16::try_from(port).ok())
    }

    /// Ports handed out so far on `host`
    pub fn used_on(&self, host: IpAddr) -> u64 {
        self.counters
            .get(&host)
            .map(|c| c.peek() - u64::from(self.base))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_respects_limit() {
        let mut counter = Counter::new(0, 2, 4);
        assert_eq!(counter.advance(), Some(0));
        assert_eq!(counter.advance(), Some(2));
        assert_eq!(counter.advance(), None);
        assert_eq!(counter.peek(), 4);
    }

    #[test]
    fn test_suffix_pairs_are_adjacent_and_unique() {
        let mut suffixes = SuffixAllocator::new(u64::MAX);
        assert_eq!(suffixes.next_pair(), Some((0, 1)));
        assert_eq!(suffixes.next_pair(), Some((2, 3)));
        assert_eq!(suffixes.next_pair(), Some((4, 5)));
        assert_eq!(suffixes.allocated(), 6);
    }

    #[test]
    fn test_seeded_suffix_allocator() {
        let mut suffixes = SuffixAllocator::starting_at(11, 16);
        assert_eq!(suffixes.next_pair(), Some((10, 11)));
        assert_eq!(suffixes.next_pair(), Some((12, 13)));
        assert_eq!(suffixes.next_pair(), Some((14, 15)));
        assert_eq!(suffixes.next_pair(), None);
    }

    #[test]
    fn test_ports_are_per_host() {
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        let mut ports = PortAllocator::new(5000);
        assert_eq!(ports.next_port(a), Some(5000));
        assert_eq!(ports.next_port(a), Some(5001));
        assert_eq!(ports.next_port(b), Some(5000));
        assert_eq!(ports.used_on(a), 2);
        assert_eq!(ports.used_on(b), 1);
    }

    #[test]
    fn test_port_exhaustion() {
        let host: IpAddr = "10.0.0.1".parse().unwrap();
        let mut ports = PortAllocator::new(65534);
        assert_eq!(ports.next_port(host), Some(65534));
        assert_eq!(ports.next_port(host), Some(65535));
        assert_eq!(ports.next_port(host), None);
    }
}
