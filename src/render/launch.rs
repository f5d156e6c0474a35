//! QEMU launch line rendering.
//!
//! Each link becomes an e1000 NIC backed by a UDP socket netdev, so two VMs
//! on different hosts talk to each other through the (host, port) pairs
//! handed out by the link allocator.

use rand::Rng;
use std::fmt;
use std::net::SocketAddr;

use super::interfaces::interface_name;
use super::LinkView;
use crate::config::LaunchConfig;
use crate::topology::Node;

/// Locally administered MAC in QEMU's 52:54:00 range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress([u8; 3]);

impl MacAddress {
    pub fn new(low: [u8; 3]) -> Self {
        Self(low)
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut low = [0u8; 3];
        rng.fill(&mut low[..]);
        Self(low)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "52:54:00:{:02x}:{:02x}:{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

/// `-device` plus `-netdev` arguments for one link
#[derive(Debug, Clone, PartialEq)]
pub struct NicClause {
    pub index: usize,
    pub mac: MacAddress,
    pub remote: SocketAddr,
    pub local: SocketAddr,
}

impl fmt::Display for NicClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = interface_name(self.index);
        write!(
            f,
            " -device e1000,netdev={name},mac={} -netdev socket,id={name},udp={},localaddr={}",
            self.mac,
            self.remote,
            self.local,
            name = name
        )
    }
}

/// A complete single-line VM invocation
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchLine {
    pub binary: String,
    pub kernel: String,
    pub disk_image: String,
    pub append: String,
    pub memory_mb: u32,
    /// Per-node writable overlay passed as the second disk
    pub overlay: String,
    pub nics: Vec<NicClause>,
}

impl fmt::Display for LaunchLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -kernel {} -hda {} -append \"{}\" -device VGA,vgamem_mb=2 -m {}",
            self.binary, self.kernel, self.disk_image, self.append, self.memory_mb
        )?;
        write!(f, " -hdb {}", self.overlay)?;
        for nic in &self.nics {
            write!(f, "{}", nic)?;
        }
        Ok(())
    }
}

/// Overlay directory for a node, relative to its output directory's parent
pub fn overlay_path(node: &Node) -> String {
    format!("fat:./{}/", node.id)
}

pub fn build_launch_line<R: Rng>(
    node: &Node,
    links: &[LinkView<'_>],
    launch: &LaunchConfig,
    rng: &mut R,
) -> LaunchLine {
    LaunchLine {
        binary: launch.binary.clone(),
        kernel: launch.kernel.clone(),
        disk_image: launch.disk_image.clone(),
        append: launch.append.clone(),
        memory_mb: launch.memory_mb,
        overlay: overlay_path(node),
        nics: links
            .iter()
            .map(|link| NicClause {
                index: link.index,
                mac: MacAddress::random(rng),
                remote: SocketAddr::new(link.peer_host, link.endpoint.peer_port),
                local: SocketAddr::new(link.local_host, link.endpoint.local_port),
            })
            .collect(),
    }
}
