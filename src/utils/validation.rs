//! Consistency checks over a compiled topology.
//!
//! These re-derive the invariants the allocators are supposed to maintain
//! and are run once after allocation, before anything is rendered.

use crate::placement::Host;
use crate::topology::{NodeId, NodeTable};
use std::collections::{HashMap, HashSet};

/// Validate link numbering across the whole node table
///
/// Checks for:
/// - Duplicate link addresses anywhere in the topology
/// - Duplicate (host, port) bindings
/// - Endpoints whose peer does not point back with mirrored ports
/// - Link pairs that are not a /127 (differ in more than the last bit)
/// - Links where both or neither side owns the prefix
///
/// # Returns
/// * `Ok(())` if validation succeeds
/// * `Err(String)` with an error message if validation fails
pub fn validate_link_plan(nodes: &NodeTable) -> Result<(), String> {
    let mut addresses = HashMap::new();
    let mut bindings = HashMap::new();

    for node in nodes.iter() {
        let host = node
            .host
            .ok_or_else(|| format!("Node {} has no host", node.id))?;

        for (index, endpoint) in node.endpoints.iter().enumerate() {
            let peer = nodes
                .get(endpoint.peer)
                .ok_or_else(|| format!("Node {} eth{} points at unknown node {}", node.id, index, endpoint.peer))?;

            let local = endpoint.local_address(node, peer);
            if let Some((other, other_index)) = addresses.insert(local, (node.id, index)) {
                return Err(format!(
                    "Address {} assigned to both node {} eth{} and node {} eth{}",
                    local, other, other_index, node.id, index
                ));
            }

            if let Some((other, other_index)) = bindings.insert((host, endpoint.local_port), (node.id, index)) {
                return Err(format!(
                    "Port {}:{} bound by both node {} eth{} and node {} eth{}",
                    host, endpoint.local_port, other, other_index, node.id, index
                ));
            }

            let mirror = peer.endpoints.iter().find(|candidate| {
                candidate.peer == node.id
                    && candidate.local_port == endpoint.peer_port
                    && candidate.peer_port == endpoint.local_port
            });
            let mirror = mirror.ok_or_else(|| {
                format!(
                    "Node {} eth{} has no mirrored endpoint on node {}",
                    node.id, index, peer.id
                )
            })?;

            if mirror.uses_own_prefix == endpoint.uses_own_prefix {
                return Err(format!(
                    "Link between {} and {} does not have exactly one prefix owner",
                    node.id, peer.id
                ));
            }

            let remote = mirror.local_address(peer, node);
            if u128::from(local) ^ u128::from(remote) != 1 {
                return Err(format!(
                    "Link between {} ({}) and {} ({}) is not a /127 pair",
                    node.id, local, peer.id, remote
                ));
            }
            if endpoint.peer_address(node, peer) != remote {
                return Err(format!(
                    "Node {} eth{} expects neighbor {} but node {} uses {}",
                    node.id,
                    index,
                    endpoint.peer_address(node, peer),
                    peer.id,
                    remote
                ));
            }
        }
    }

    log::debug!(
        "Link plan verified: {} addresses, {} port bindings",
        addresses.len(),
        bindings.len()
    );
    Ok(())
}

/// Validate host placement against the node table
///
/// Checks that every node is on exactly one host, that the host lists agree
/// with the nodes' host fields, that no region spans two hosts, and that no
/// host holds more than its capacity.
pub fn validate_placement(nodes: &NodeTable, hosts: &[Host], unit_cost: u64) -> Result<(), String> {
    let mut owner: HashMap<NodeId, usize> = HashMap::new();
    for (i, host) in hosts.iter().enumerate() {
        for id in &host.nodes {
            if owner.insert(*id, i).is_some() {
                return Err(format!("Node {} is assigned to more than one host", id));
            }
        }
        let used = (host.nodes.len() as u64).saturating_mul(unit_cost);
        if used > host.capacity {
            return Err(format!(
                "Host {} holds {} units but has only {}",
                host.address, used, host.capacity
            ));
        }
    }

    let mut region_hosts: HashMap<&str, HashSet<usize>> = HashMap::new();
    for node in nodes.iter() {
        let i = *owner
            .get(&node.id)
            .ok_or_else(|| format!("Node {} is not assigned to any host", node.id))?;
        if node.host != Some(hosts[i].address) {
            return Err(format!(
                "Node {} records host {:?} but is listed on {}",
                node.id, node.host, hosts[i].address
            ));
        }
        region_hosts.entry(node.region.as_str()).or_default().insert(i);
    }

    if let Some((region, _)) = region_hosts.iter().find(|(_, set)| set.len() > 1) {
        return Err(format!("Region {} is split across hosts", region));
    }

    Ok(())
}
