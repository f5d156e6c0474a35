//! Network topology module.
//!
//! This module contains the topology data model, the normalization pass
//! that numbers nodes and collapses duplicate edges, and the link allocator
//! that turns each edge into a pair of endpoints.

pub mod types;
pub mod normalize;
pub mod links;

// Re-export key types and functions for easier access
pub use types::{Edge, Endpoint, Node, NodeId, NodeRecord, NodeTable, TopologyDocument, TopologyError};
pub use normalize::{dedup_edges, normalize, NormalizedTopology};
pub use links::{LinkAllocator, LinkError};
