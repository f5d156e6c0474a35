//! Topology type definitions.
//!
//! This file contains the input document shape (as produced by the map
//! exporters), the compiled node table, and the per-link endpoint records
//! the link allocator attaches to every node.

use ipnetwork::Ipv6Network;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

use crate::ip::prefix::link_address;

/// Externally supplied node identifier
pub type NodeId = u32;

/// Parsed topology document.
///
/// Field names follow the universe dump (`solarSystems` / `jumps`); the
/// generic `nodes` / `edges` spellings are accepted as well.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TopologyDocument {
    #[serde(rename = "solarSystems", alias = "nodes")]
    pub nodes: Vec<NodeRecord>,
    #[serde(rename = "jumps", alias = "edges", default)]
    pub edges: Vec<Edge>,
}

/// A node as it appears in the input document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// An undirected physical link between two nodes
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }

    /// Direction-independent key: (A,B) and (B,A) map to the same value.
    pub fn key(&self) -> (NodeId, NodeId) {
        if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// One side's view of a link.
///
/// Both endpoints of a link derive their addresses from a single /48: the
/// side with `uses_own_prefix` set owns it, the other side borrows the
/// peer's. The two suffixes differ only in the lowest bit.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub local_port: u16,
    pub peer_port: u16,
    pub local_suffix: u64,
    pub uses_own_prefix: bool,
    pub peer: NodeId,
}

impl Endpoint {
    /// Suffix of the other half of the /127 pair
    pub fn peer_suffix(&self) -> u64 {
        self.local_suffix ^ 1
    }

    /// The prefix both ends of this link are numbered from
    pub fn link_prefix<'a>(&self, own: &'a Node, peer: &'a Node) -> &'a Ipv6Network {
        if self.uses_own_prefix {
            &own.prefix
        } else {
            &peer.prefix
        }
    }

    /// Address configured on this side of the link
    pub fn local_address(&self, own: &Node, peer: &Node) -> Ipv6Addr {
        link_address(self.link_prefix(own, peer), self.local_suffix)
    }

    /// Address of the neighbor as seen from this side
    pub fn peer_address(&self, own: &Node, peer: &Node) -> Ipv6Addr {
        link_address(self.link_prefix(own, peer), self.peer_suffix())
    }
}

/// A compiled node
#[derive(Debug, Serialize, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub region: String,
    pub position: [f64; 3],
    pub prefix: Ipv6Network,
    pub asn: u32,
    /// Address of the host this node runs on, set by the capacity planner
    pub host: Option<IpAddr>,
    pub endpoints: Vec<Endpoint>,
}

impl Node {
    pub fn from_record(record: &NodeRecord, prefix: Ipv6Network, asn: u32) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            region: record.region.clone(),
            position: [record.x, record.y, record.z],
            prefix,
            asn,
            host: None,
            endpoints: Vec::new(),
        }
    }
}

/// Nodes in processing order, addressable by id
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> Result<(), TopologyError> {
        if self.index.contains_key(&node.id) {
            return Err(TopologyError::DuplicateNode(node.id));
        }
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.index.get(&id).map(|&i| &mut self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of endpoints across all nodes
    pub fn endpoint_count(&self) -> usize {
        self.nodes.iter().map(|n| n.endpoints.len()).sum()
    }
}

/// Errors in the input topology
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Node {0} is declared more than once")]
    DuplicateNode(NodeId),

    #[error("Edge {edge} references unknown node {node}")]
    UnknownNode { edge: Edge, node: NodeId },

    #[error("Edge {0} connects a node to itself")]
    SelfLoop(Edge),

    #[error("Prefix space exhausted at node {node}: at most {max} nodes fit the base prefix")]
    PrefixSpaceExhausted { node: NodeId, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key_is_direction_independent() {
        assert_eq!(Edge::new(1, 2).key(), Edge::new(2, 1).key());
        assert_eq!(Edge::new(7, 3).key(), (3, 7));
        assert!(Edge::new(4, 4).is_self_loop());
    }

    #[test]
    fn test_parse_universe_document() {
        let json = r#"{
            "jumps": [{"from": 30000001, "to": 30000002}],
            "solarSystems": [
                {"id": 30000001, "name": "Tanoo", "region": "Derelik", "x": 1.5, "y": 2.0, "z": -3.0},
                {"id": 30000002, "name": "Lashesih", "region": "Derelik", "x": 0, "y": 0, "z": 0}
            ]
        }"#;
        let doc: TopologyDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[0].name, "Tanoo");
        assert_eq!(doc.nodes[0].z, -3.0);
        assert_eq!(doc.edges, vec![Edge::new(30000001, 30000002)]);
    }

    #[test]
    fn test_parse_generic_document_without_coordinates() {
        let json = r#"{
            "nodes": [{"id": 2, "name": "Bank", "region": "tfl"}],
            "edges": []
        }"#;
        let doc: TopologyDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.nodes[0].x, 0.0);
        assert!(doc.edges.is_empty());
    }

    #[test]
    fn test_node_table_rejects_duplicates() {
        let record = NodeRecord {
            id: 1,
            name: "a".to_string(),
            region: "r".to_string(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        let prefix: Ipv6Network = "2a07:1500:1::/48".parse().unwrap();
        let mut table = NodeTable::new();
        table.insert(Node::from_record(&record, prefix, 1)).unwrap();
        assert!(matches!(
            table.insert(Node::from_record(&record, prefix, 2)),
            Err(TopologyError::DuplicateNode(1))
        ));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(1).map(|n| n.asn), Some(1));
    }

    #[test]
    fn test_endpoint_addresses_share_link_prefix() {
        let a = NodeRecord { id: 1, name: "a".into(), region: "r".into(), x: 0.0, y: 0.0, z: 0.0 };
        let b = NodeRecord { id: 2, name: "b".into(), region: "r".into(), x: 0.0, y: 0.0, z: 0.0 };
        let node_a = Node::from_record(&a, "2a07:1500:1::/48".parse().unwrap(), 1);
        let node_b = Node::from_record(&b, "2a07:1500:2::/48".parse().unwrap(), 2);

        let on_a = Endpoint { local_port: 5000, peer_port: 5001, local_suffix: 1, uses_own_prefix: true, peer: 2 };
        let on_b = Endpoint { local_port: 5001, peer_port: 5000, local_suffix: 0, uses_own_prefix: false, peer: 1 };

        assert_eq!(on_a.local_address(&node_a, &node_b).to_string(), "2a07:1500:1::1");
        assert_eq!(on_b.local_address(&node_b, &node_a).to_string(), "2a07:1500:1::");
        assert_eq!(on_a.peer_address(&node_a, &node_b), on_b.local_address(&node_b, &node_a));
        assert_eq!(on_b.peer_address(&node_b, &node_a), on_a.local_address(&node_a, &node_b));
    }
}
