//! # Per-node artifact rendering
//!
//! Turns a fully allocated node into the text files its VM boots with:
//!
//! - `interfaces`: one static IPv6 stanza per link (`interfaces.rs`)
//! - `bird.conf`: static announcement plus one BGP session per link (`bird.rs`)
//! - `qemu.sh`: the launch line with one socket NIC per link (`launch.rs`)
//! - `hostname`: the node's display name
//!
//! All three renderers walk the same [`LinkView`] list, so `eth3`,
//! `session3` and the fourth NIC always describe the same neighbor.
//!
//! Rendering only reads the node table. Random bytes (router id, MACs) come
//! from an RNG seeded per node, which makes output reproducible and lets the
//! nodes render in parallel.

pub mod bird;
pub mod interfaces;
pub mod launch;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::net::{IpAddr, Ipv6Addr};

use crate::config::LaunchConfig;
use crate::topology::{Endpoint, Node, NodeId, NodeTable};

pub use bird::{build_bird_config, BgpSession, BirdConfig};
pub use interfaces::{build_interfaces, InterfaceBlock, InterfacesFile};
pub use launch::{build_launch_line, LaunchLine, MacAddress, NicClause};

/// Rendering failures; these only occur on a node table that skipped a
/// pipeline phase.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Node {node} has an endpoint towards unknown node {peer}")]
    MissingPeer { node: NodeId, peer: NodeId },

    #[error("Node {0} has not been placed on a host")]
    Unplaced(NodeId),
}

/// An endpoint with everything the renderers need already looked up
#[derive(Debug, Clone)]
pub struct LinkView<'a> {
    /// Position in the node's endpoint list; the interface index
    pub index: usize,
    pub endpoint: &'a Endpoint,
    pub peer: &'a Node,
    pub local_address: Ipv6Addr,
    pub peer_address: Ipv6Addr,
    pub local_host: IpAddr,
    pub peer_host: IpAddr,
}

/// Resolve a node's endpoints against the node table
pub fn resolve_links<'a>(node: &'a Node, nodes: &'a NodeTable) -> Result<Vec<LinkView<'a>>, RenderError> {
    let local_host = node.host.ok_or(RenderError::Unplaced(node.id))?;
    node.endpoints
        .iter()
        .enumerate()
        .map(|(index, endpoint)| {
            let peer = nodes.get(endpoint.peer).ok_or(RenderError::MissingPeer {
                node: node.id,
                peer: endpoint.peer,
            })?;
            let peer_host = peer.host.ok_or(RenderError::Unplaced(peer.id))?;
            Ok(LinkView {
                index,
                endpoint,
                peer,
                local_address: endpoint.local_address(node, peer),
                peer_address: endpoint.peer_address(node, peer),
                local_host,
                peer_host,
            })
        })
        .collect()
}

/// Everything written for one node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeArtifacts {
    pub node: NodeId,
    pub host: IpAddr,
    pub hostname: String,
    pub interfaces: String,
    pub bird: String,
    pub launch: String,
}

/// RNG for one node's random bytes
pub fn node_rng(seed: u64, node: NodeId) -> StdRng {
    StdRng::seed_from_u64(seed ^ u64::from(node).rotate_left(32))
}

pub fn render_node(
    node: &Node,
    nodes: &NodeTable,
    launch: &LaunchConfig,
    seed: u64,
) -> Result<NodeArtifacts, RenderError> {
    let links = resolve_links(node, nodes)?;
    let host = node.host.ok_or(RenderError::Unplaced(node.id))?;
    let mut rng = node_rng(seed, node.id);

    let router_id = bird::random_router_id(&mut rng);
    let interfaces = build_interfaces(&links);
    let bird = build_bird_config(node, &links, router_id);
    let launch = build_launch_line(node, &links, launch, &mut rng);

    Ok(NodeArtifacts {
        node: node.id,
        host,
        hostname: node.name.clone(),
        interfaces: interfaces.to_string(),
        bird: bird.to_string(),
        launch: launch.to_string(),
    })
}

/// Render every node, in node table order
pub fn render_all(
    nodes: &NodeTable,
    launch: &LaunchConfig,
    seed: u64,
) -> Result<Vec<NodeArtifacts>, RenderError> {
    log::info!("Rendering artifacts for {} nodes in parallel...", nodes.len());
    nodes
        .as_slice()
        .par_iter()
        .map(|node| render_node(node, nodes, launch, seed))
        .collect()
}
