//! Compilation orchestrator.
//!
//! This module runs the pipeline end to end: normalize the topology, place
//! regions on hosts, number the links, verify the result, render every
//! node, and finally lay the artifacts out on disk.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use serde::Serialize;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::ip::{suffix_capacity, AsnAllocator};
use crate::placement::{plan_capacity, Host};
use crate::render::{render_all, NodeArtifacts};
use crate::topology::{normalize, Edge, LinkAllocator, NodeId, NodeTable, TopologyDocument};
use crate::utils::validation::{validate_link_plan, validate_placement};

/// File names inside each node directory
pub const INTERFACES_FILE: &str = "interfaces";
pub const BIRD_FILE: &str = "bird.conf";
pub const LAUNCH_FILE: &str = "qemu.sh";
pub const HOSTNAME_FILE: &str = "hostname";
pub const INVENTORY_FILE: &str = "inventory.json";

/// Result of a full compilation run
#[derive(Debug, Clone)]
pub struct CompiledTopology {
    pub nodes: NodeTable,
    pub edges: Vec<Edge>,
    pub hosts: Vec<Host>,
    pub skipped_nodes: Vec<NodeId>,
    pub artifacts: Vec<NodeArtifacts>,
}

/// Placement summary written next to the node directories
#[derive(Serialize, Debug)]
pub struct Inventory {
    pub hosts: Vec<Host>,
    pub nodes: Vec<InventoryNode>,
    pub links: usize,
    pub skipped_nodes: Vec<NodeId>,
}

#[derive(Serialize, Debug)]
pub struct InventoryNode {
    pub id: NodeId,
    pub name: String,
    pub region: String,
    pub asn: u32,
    pub prefix: String,
    pub host: Option<IpAddr>,
    pub interfaces: usize,
}

/// Compile a topology document into per-node artifacts.
///
/// Allocation runs serially; only rendering is parallel. Any error aborts
/// the whole run and nothing partial is returned.
pub fn compile(document: &TopologyDocument, config: &Config) -> Result<CompiledTopology> {
    config.validate()?;

    let mut asns = AsnAllocator::new(config.addressing.max_index());
    let normalized = normalize(document, &config.addressing, &mut asns)
        .wrap_err("Topology normalization failed")?;

    if !normalized.skipped_nodes.is_empty() {
        info!(
            "Saved {} units of capacity by skipping {} placeholder nodes",
            (normalized.skipped_nodes.len() as u64).saturating_mul(config.planner.unit_cost),
            normalized.skipped_nodes.len()
        );
    }

    let mut nodes = normalized.nodes;
    let hosts = plan_capacity(&mut nodes, &config.planner.hosts, config.planner.unit_cost)
        .wrap_err("Capacity planning failed")?;

    let mut links = LinkAllocator::new(
        config.links.port_base,
        suffix_capacity(config.addressing.prefix_len),
    );
    links
        .allocate(&mut nodes, &normalized.edges)
        .wrap_err("Link allocation failed")?;

    validate_placement(&nodes, &hosts, config.planner.unit_cost)
        .map_err(|e| eyre!("Placement verification failed: {}", e))?;
    validate_link_plan(&nodes).map_err(|e| eyre!("Link verification failed: {}", e))?;

    let artifacts = render_all(&nodes, &config.launch, config.general.seed)
        .wrap_err("Rendering failed")?;

    Ok(CompiledTopology {
        nodes,
        edges: normalized.edges,
        hosts,
        skipped_nodes: normalized.skipped_nodes,
        artifacts,
    })
}

/// Directory a node's files are written to
pub fn node_dir(output_dir: &Path, host: IpAddr, node: NodeId) -> PathBuf {
    output_dir.join(host.to_string()).join(node.to_string())
}

/// Build the placement inventory for a compiled topology
pub fn build_inventory(compiled: &CompiledTopology) -> Inventory {
    Inventory {
        hosts: compiled.hosts.clone(),
        nodes: compiled
            .nodes
            .iter()
            .map(|node| InventoryNode {
                id: node.id,
                name: node.name.clone(),
                region: node.region.clone(),
                asn: node.asn,
                prefix: node.prefix.to_string(),
                host: node.host,
                interfaces: node.endpoints.len(),
            })
            .collect(),
        links: compiled.edges.len(),
        skipped_nodes: compiled.skipped_nodes.clone(),
    }
}

/// Write every node's artifacts plus the inventory below `output_dir`.
///
/// Existing files are overwritten; a failed run can simply be repeated.
pub fn write_artifacts(compiled: &CompiledTopology, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", output_dir.display()))?;

    for artifacts in &compiled.artifacts {
        let dir = node_dir(output_dir, artifacts.host, artifacts.node);
        fs::create_dir_all(&dir)
            .wrap_err_with(|| format!("Failed to create node directory '{}'", dir.display()))?;

        for (name, contents) in [
            (INTERFACES_FILE, &artifacts.interfaces),
            (LAUNCH_FILE, &artifacts.launch),
            (HOSTNAME_FILE, &artifacts.hostname),
            (BIRD_FILE, &artifacts.bird),
        ] {
            let path = dir.join(name);
            fs::write(&path, contents)
                .wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
        }
        make_executable(&dir.join(LAUNCH_FILE))?;
    }

    let inventory = build_inventory(compiled);
    let inventory_path = output_dir.join(INVENTORY_FILE);
    let json = serde_json::to_string_pretty(&inventory)?;
    fs::write(&inventory_path, json)
        .wrap_err_with(|| format!("Failed to write '{}'", inventory_path.display()))?;

    info!(
        "Wrote artifacts for {} nodes to {:?}",
        compiled.artifacts.len(),
        output_dir
    );
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
        .wrap_err_with(|| format!("Failed to mark '{}' executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(path: &Path) -> Result<()> {
    log::warn!("Cannot mark {:?} executable on this platform", path);
    Ok(())
}
