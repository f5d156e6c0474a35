//! Capacity planning.
//!
//! Regions are kept together on one host. Each region needs
//! `node count × unit cost` resource units; regions are taken in sorted
//! order and each goes to the first host in the pool with enough memory
//! left. There is no backtracking: if a region fits nowhere the run fails.

use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::config::HostConfig;
use crate::topology::{NodeId, NodeTable};

/// A physical machine and the nodes placed on it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Host {
    pub address: IpAddr,
    pub capacity: u64,
    pub remaining: u64,
    pub nodes: Vec<NodeId>,
}

impl Host {
    pub fn new(address: IpAddr, capacity: u64) -> Self {
        Self {
            address,
            capacity,
            remaining: capacity,
            nodes: Vec::new(),
        }
    }

    pub fn fits(&self, requirement: u64) -> bool {
        self.remaining >= requirement
    }
}

impl From<&HostConfig> for Host {
    fn from(config: &HostConfig) -> Self {
        Host::new(config.address, config.capacity)
    }
}

/// All nodes of one region and what they cost together
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDemand {
    pub region: String,
    pub nodes: Vec<NodeId>,
    pub requirement: u64,
}

/// Placement failures
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("Ran out of capacity while assigning region '{region}': needs {required}, largest remaining is {largest_remaining}")]
    CapacityExhausted {
        region: String,
        required: u64,
        largest_remaining: u64,
    },
}

/// Group nodes by region, sorted by region name. Node order inside a
/// region follows the node table.
pub fn group_regions(nodes: &NodeTable, unit_cost: u64) -> Vec<RegionDemand> {
    let mut regions: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
    for node in nodes.iter() {
        regions.entry(node.region.as_str()).or_default().push(node.id);
    }

    regions
        .into_iter()
        .map(|(region, members)| RegionDemand {
            region: region.to_string(),
            requirement: (members.len() as u64).saturating_mul(unit_cost),
            nodes: members,
        })
        .collect()
}

/// Index of the first host that can take `requirement`
pub fn first_fit(hosts: &[Host], requirement: u64) -> Option<usize> {
    hosts.iter().position(|host| host.fits(requirement))
}

/// Place every region on a host and record the host address on each node.
///
/// Returns the host pool with its remaining capacity and node lists.
pub fn plan_capacity(
    nodes: &mut NodeTable,
    pool: &[HostConfig],
    unit_cost: u64,
) -> Result<Vec<Host>, PlacementError> {
    let mut hosts: Vec<Host> = pool.iter().map(Host::from).collect();
    let regions = group_regions(nodes, unit_cost);

    let total = regions
        .iter()
        .fold(0u64, |sum, r| sum.saturating_add(r.requirement));
    for demand in &regions {
        info!("Region {} will require {} units", demand.region, demand.requirement);
    }
    info!("Total capacity needed: {} units across {} regions", total, regions.len());

    for demand in regions {
        let chosen = first_fit(&hosts, demand.requirement).ok_or_else(|| {
            PlacementError::CapacityExhausted {
                region: demand.region.clone(),
                required: demand.requirement,
                largest_remaining: hosts.iter().map(|h| h.remaining).max().unwrap_or(0),
            }
        })?;

        let host = &mut hosts[chosen];
        host.remaining -= demand.requirement;
        for id in &demand.nodes {
            if let Some(node) = nodes.get_mut(*id) {
                node.host = Some(host.address);
            }
        }
        debug!(
            "Region {} ({} nodes) placed on {}, {} units left",
            demand.region,
            demand.nodes.len(),
            host.address,
            host.remaining
        );
        host.nodes.extend(demand.nodes);
    }

    for host in &hosts {
        info!(
            "Host {}: {} nodes, {}/{} units left",
            host.address,
            host.nodes.len(),
            host.remaining,
            host.capacity
        );
    }

    Ok(hosts)
}
