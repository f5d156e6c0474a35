//! Topology normalization.
//!
//! Turns the raw document into the node table the later phases work on:
//! placeholder nodes are dropped, every remaining node gets its prefix and
//! ASN, and edges declared in both directions collapse into one link.

use log::{debug, info, warn};
use std::collections::HashSet;

use super::types::{Edge, Node, NodeId, NodeTable, TopologyDocument, TopologyError};
use crate::config::AddressingConfig;
use crate::ip::{node_prefix, AsnAllocator};

/// Output of the normalization phase
#[derive(Debug, Clone)]
pub struct NormalizedTopology {
    pub nodes: NodeTable,
    /// Deduplicated links, in first-declaration order
    pub edges: Vec<Edge>,
    /// Nodes left out because their id is above the skip threshold
    pub skipped_nodes: Vec<NodeId>,
    /// Edges dropped because one side was a skipped node
    pub dropped_edges: usize,
}

/// Remove edges that describe an already seen link.
///
/// (A,B) and (B,A) are the same link; the first occurrence is kept with its
/// declared direction and later ones are dropped.
pub fn dedup_edges(edges: &[Edge]) -> Vec<Edge> {
    let mut seen = HashSet::with_capacity(edges.len());
    edges
        .iter()
        .filter(|edge| seen.insert(edge.key()))
        .copied()
        .collect()
}

/// Build the node table and canonical edge list.
///
/// Nodes are numbered in document order. `asns` supplies both the ASN and
/// the prefix index of each retained node.
pub fn normalize(
    document: &TopologyDocument,
    addressing: &AddressingConfig,
    asns: &mut AsnAllocator,
) -> Result<NormalizedTopology, TopologyError> {
    let mut nodes = NodeTable::new();
    let mut skipped_nodes = Vec::new();

    for record in &document.nodes {
        if record.id > addressing.skip_above {
            skipped_nodes.push(record.id);
            continue;
        }

        let max = addressing.max_index();
        let asn = asns
            .next_asn()
            .ok_or(TopologyError::PrefixSpaceExhausted { node: record.id, max })?;
        let prefix = node_prefix(addressing, asn)
            .ok_or(TopologyError::PrefixSpaceExhausted { node: record.id, max })?;

        debug!("Node {} ({}) gets AS{} and {}", record.id, record.name, asn, prefix);
        nodes.insert(Node::from_record(record, prefix, asn))?;
    }

    if !skipped_nodes.is_empty() {
        info!(
            "Skipped {} nodes with ids above {}",
            skipped_nodes.len(),
            addressing.skip_above
        );
    }

    let skipped: HashSet<NodeId> = skipped_nodes.iter().copied().collect();
    let mut retained = Vec::with_capacity(document.edges.len());
    let mut dropped_edges = 0;

    for edge in &document.edges {
        if edge.is_self_loop() {
            return Err(TopologyError::SelfLoop(*edge));
        }
        for node in [edge.from, edge.to] {
            if !nodes.contains(node) && !skipped.contains(&node) {
                return Err(TopologyError::UnknownNode { edge: *edge, node });
            }
        }
        if skipped.contains(&edge.from) || skipped.contains(&edge.to) {
            dropped_edges += 1;
            continue;
        }
        retained.push(*edge);
    }

    if dropped_edges > 0 {
        warn!("Dropped {} edges touching skipped nodes", dropped_edges);
    }

    let edges = dedup_edges(&retained);
    debug!(
        "Collapsed {} declared edges into {} links",
        retained.len(),
        edges.len()
    );

    info!(
        "Normalized topology: {} nodes, {} links, next ASN {}",
        nodes.len(),
        edges.len(),
        asns.peek()
    );

    Ok(NormalizedTopology {
        nodes,
        edges,
        skipped_nodes,
        dropped_edges,
    })
}
