//! Link allocation.
//!
//! Walks the canonical edge list and gives both sides of every link an
//! endpoint record. For a link declared as (A,B):
//!
//! - A numbers the link out of its own prefix and takes the odd suffix,
//! - B borrows A's prefix and takes the even suffix,
//! - A's port comes from A's host, B's port from B's host, and each side
//!   records the other's port as its peer port.
//!
//! Endpoints are appended in edge order, so an endpoint's position in its
//! node's list is the interface index every renderer uses.

use log::{debug, info};
use std::collections::BTreeSet;
use std::net::IpAddr;

use super::types::{Edge, Endpoint, NodeId, NodeTable};
use crate::ip::{PortAllocator, SuffixAllocator};

/// Errors raised while numbering links
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Edge {edge} references node {node} which is not in the node table")]
    UnknownNode { edge: Edge, node: NodeId },

    #[error("Node {0} has not been placed on a host")]
    Unplaced(NodeId),

    #[error("Host {host} ran out of UDP ports while numbering edge {edge}")]
    PortsExhausted { host: IpAddr, edge: Edge },

    #[error("Link address space exhausted at edge {edge}")]
    SuffixesExhausted { edge: Edge },
}

/// Owns the port and suffix sequences for one compilation run
#[derive(Debug, Clone)]
pub struct LinkAllocator {
    ports: PortAllocator,
    suffixes: SuffixAllocator,
}

impl LinkAllocator {
    pub fn new(port_base: u16, suffix_capacity: u64) -> Self {
        Self::with_allocators(PortAllocator::new(port_base), SuffixAllocator::new(suffix_capacity))
    }

    /// Build from pre-seeded sequences
    pub fn with_allocators(ports: PortAllocator, suffixes: SuffixAllocator) -> Self {
        Self { ports, suffixes }
    }

    /// Attach endpoints for every edge, in order. Returns the number of
    /// links numbered.
    pub fn allocate(&mut self, nodes: &mut NodeTable, edges: &[Edge]) -> Result<usize, LinkError> {
        for edge in edges {
            self.allocate_edge(nodes, edge)?;
        }
        info!(
            "Numbered {} links ({} endpoints, {} link addresses)",
            edges.len(),
            nodes.endpoint_count(),
            self.suffixes.allocated()
        );
        let hosts: BTreeSet<IpAddr> = nodes.iter().filter_map(|n| n.host).collect();
        for host in hosts {
            debug!("Host {} uses {} UDP ports", host, self.ports.used_on(host));
        }
        Ok(edges.len())
    }

    /// Ports handed out on `host` so far
    pub fn ports_used_on(&self, host: IpAddr) -> u64 {
        self.ports.used_on(host)
    }

    fn allocate_edge(&mut self, nodes: &mut NodeTable, edge: &Edge) -> Result<(), LinkError> {
        let host_a = host_of(nodes, edge, edge.from)?;
        let host_b = host_of(nodes, edge, edge.to)?;

        let port_a = self
            .ports
            .next_port(host_a)
            .ok_or(LinkError::PortsExhausted { host: host_a, edge: *edge })?;
        let port_b = self
            .ports
            .next_port(host_b)
            .ok_or(LinkError::PortsExhausted { host: host_b, edge: *edge })?;
        let (even, odd) = self
            .suffixes
            .next_pair()
            .ok_or(LinkError::SuffixesExhausted { edge: *edge })?;

        let on_a = Endpoint {
            local_port: port_a,
            peer_port: port_b,
            local_suffix: odd,
            uses_own_prefix: true,
            peer: edge.to,
        };
        let on_b = Endpoint {
            local_port: port_b,
            peer_port: port_a,
            local_suffix: even,
            uses_own_prefix: false,
            peer: edge.from,
        };

        debug!(
            "Link {}: {}:{} <-> {}:{}, suffixes {:x}/{:x}",
            edge, host_a, port_a, host_b, port_b, odd, even
        );

        push_endpoint(nodes, edge, edge.from, on_a)?;
        push_endpoint(nodes, edge, edge.to, on_b)?;
        Ok(())
    }
}

fn host_of(nodes: &NodeTable, edge: &Edge, id: NodeId) -> Result<IpAddr, LinkError> {
    let node = nodes
        .get(id)
        .ok_or(LinkError::UnknownNode { edge: *edge, node: id })?;
    node.host.ok_or(LinkError::Unplaced(id))
}

fn push_endpoint(
    nodes: &mut NodeTable,
    edge: &Edge,
    id: NodeId,
    endpoint: Endpoint,
) -> Result<(), LinkError> {
    let node = nodes
        .get_mut(id)
        .ok_or(LinkError::UnknownNode { edge: *edge, node: id })?;
    node.endpoints.push(endpoint);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::types::{Node, NodeRecord};
    use std::collections::HashSet;

    fn table(placements: &[(NodeId, &str)]) -> NodeTable {
        let mut nodes = NodeTable::new();
        for (i, (id, host)) in placements.iter().enumerate() {
            let record = NodeRecord {
                id: *id,
                name: format!("n{}", id),
                region: "r".to_string(),
                x: 0.0,
                y: 0.0,
                z: 0.0,
            };
            let prefix = format!("2a07:1500:{:x}::/48", i + 1).parse().unwrap();
            let mut node = Node::from_record(&record, prefix, i as u32 + 1);
            node.host = Some(host.parse().unwrap());
            nodes.insert(node).unwrap();
        }
        nodes
    }

    #[test]
    fn test_single_link_numbering() {
        let mut nodes = table(&[(1, "10.0.0.1"), (2, "10.0.0.2")]);
        let mut links = LinkAllocator::new(5000, u64::MAX);
        links.allocate(&mut nodes, &[Edge::new(1, 2)]).unwrap();

        let a = nodes.get(1).unwrap();
        let b = nodes.get(2).unwrap();
        assert_eq!(
            a.endpoints,
            vec![Endpoint { local_port: 5000, peer_port: 5000, local_suffix: 1, uses_own_prefix: true, peer: 2 }]
        );
        assert_eq!(
            b.endpoints,
            vec![Endpoint { local_port: 5000, peer_port: 5000, local_suffix: 0, uses_own_prefix: false, peer: 1 }]
        );
        assert_eq!(a.endpoints[0].local_address(a, b).to_string(), "2a07:1500:1::1");
        assert_eq!(b.endpoints[0].local_address(b, a).to_string(), "2a07:1500:1::");
    }

    #[test]
    fn test_same_host_ports_are_distinct_and_mirrored() {
        let mut nodes = table(&[(1, "127.0.0.1"), (2, "127.0.0.1"), (3, "127.0.0.1")]);
        let edges = [Edge::new(1, 2), Edge::new(2, 3), Edge::new(3, 1)];
        let mut links = LinkAllocator::new(5000, u64::MAX);
        assert_eq!(links.allocate(&mut nodes, &edges).unwrap(), 3);

        let mut seen = HashSet::new();
        for node in nodes.iter() {
            for ep in &node.endpoints {
                assert!(seen.insert((node.host, ep.local_port)));
                let peer = nodes.get(ep.peer).unwrap();
                let back = peer.endpoints.iter().find(|p| p.peer == node.id).unwrap();
                assert_eq!(ep.local_port, back.peer_port);
                assert_eq!(ep.peer_port, back.local_port);
                assert_ne!(ep.uses_own_prefix, back.uses_own_prefix);
            }
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_pairs_differ_in_last_bit_only() {
        let mut nodes = table(&[(1, "10.0.0.1"), (2, "10.0.0.1"), (3, "10.0.0.2"), (4, "10.0.0.2")]);
        let edges = [Edge::new(1, 2), Edge::new(1, 3), Edge::new(4, 1), Edge::new(3, 4)];
        LinkAllocator::new(5000, u64::MAX).allocate(&mut nodes, &edges).unwrap();

        let mut addresses = HashSet::new();
        for node in nodes.iter() {
            for ep in &node.endpoints {
                let peer = nodes.get(ep.peer).unwrap();
                let local = u128::from(ep.local_address(node, peer));
                let remote = u128::from(ep.peer_address(node, peer));
                assert_eq!(local ^ remote, 1);
                assert!(addresses.insert(local));
            }
        }
        assert_eq!(addresses.len(), 8);
    }

    #[test]
    fn test_interface_order_follows_edge_order() {
        let mut nodes = table(&[(1, "10.0.0.1"), (2, "10.0.0.1"), (3, "10.0.0.1")]);
        let edges = [Edge::new(2, 1), Edge::new(1, 3)];
        LinkAllocator::new(5000, u64::MAX).allocate(&mut nodes, &edges).unwrap();
        let peers: Vec<NodeId> = nodes.get(1).unwrap().endpoints.iter().map(|e| e.peer).collect();
        assert_eq!(peers, vec![2, 3]);
    }

    #[test]
    fn test_unplaced_node_is_an_error() {
        let mut nodes = table(&[(1, "10.0.0.1"), (2, "10.0.0.1")]);
        nodes.get_mut(2).unwrap().host = None;
        let err = LinkAllocator::new(5000, u64::MAX)
            .allocate(&mut nodes, &[Edge::new(1, 2)])
            .unwrap_err();
        assert!(matches!(err, LinkError::Unplaced(2)));
    }

    #[test]
    fn test_port_exhaustion_is_an_error() {
        let mut nodes = table(&[(1, "10.0.0.1"), (2, "10.0.0.1")]);
        let err = LinkAllocator::new(65535, u64::MAX)
            .allocate(&mut nodes, &[Edge::new(1, 2)])
            .unwrap_err();
        assert!(matches!(err, LinkError::PortsExhausted { .. }));
    }

    #[test]
    fn test_port_usage_per_host() {
        let mut nodes = table(&[(1, "10.0.0.1"), (2, "10.0.0.1"), (3, "10.0.0.2")]);
        let mut links = LinkAllocator::new(5000, u64::MAX);
        links.allocate(&mut nodes, &[Edge::new(1, 2), Edge::new(2, 3)]).unwrap();
        assert_eq!(links.ports_used_on("10.0.0.1".parse().unwrap()), 3);
        assert_eq!(links.ports_used_on("10.0.0.2".parse().unwrap()), 1);
    }

    #[test]
    fn test_seeded_allocators() {
        let mut nodes = table(&[(1, "10.0.0.1"), (2, "10.0.0.2")]);
        let mut links = LinkAllocator::with_allocators(
            PortAllocator::new(40000),
            SuffixAllocator::starting_at(0x100, u64::MAX),
        );
        links.allocate(&mut nodes, &[Edge::new(1, 2)]).unwrap();
        let a = nodes.get(1).unwrap();
        assert_eq!(a.endpoints[0].local_port, 40000);
        assert_eq!(a.endpoints[0].local_suffix, 0x101);
    }
}
