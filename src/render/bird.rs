//! BIRD 2 configuration rendering.
//!
//! Every router announces its own prefix as an unreachable static route and
//! runs one eBGP session per link, named after the link's interface index.

use ipnetwork::Ipv6Network;
use rand::Rng;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::LinkView;
use crate::topology::Node;

/// Router ids live in 1.0.0.0/8; the low three octets are random.
pub fn random_router_id<R: Rng>(rng: &mut R) -> Ipv4Addr {
    let mut octets = [0u8; 3];
    rng.fill(&mut octets[..]);
    Ipv4Addr::new(1, octets[0], octets[1], octets[2])
}

/// One `protocol bgp` block
#[derive(Debug, Clone, PartialEq)]
pub struct BgpSession {
    pub index: usize,
    pub neighbor: Ipv6Addr,
    pub neighbor_as: u32,
    pub source: Ipv6Addr,
    pub local_as: u32,
}

impl fmt::Display for BgpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "protocol bgp session{} {{", self.index)?;
        write!(
            f,
            "\tneighbor {} as {};\n\tsource address {};\n\tlocal as {};\n\t",
            self.neighbor, self.neighbor_as, self.source, self.local_as
        )?;
        f.write_str(
            "\n\tenable extended messages;\n\tenable route refresh;\n\n\tipv6 {\n\t\timport all;\n\t\texport all;\n\t};\n}\n",
        )
    }
}

/// Complete `bird.conf`
#[derive(Debug, Clone, PartialEq)]
pub struct BirdConfig {
    pub router_id: Ipv4Addr,
    pub prefix: Ipv6Network,
    pub sessions: Vec<BgpSession>,
}

impl fmt::Display for BirdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ipv4 table master4;\nipv6 table master6;\n")?;
        write!(f, "\nrouter id {};\n", self.router_id)?;
        f.write_str("protocol device {\n}\n\nprotocol static announcements6{\n\tipv6;\n")?;
        write!(f, "\troute {} unreachable;\n}}\n\n", self.prefix)?;
        f.write_str("protocol kernel {\n\tscan time 25;\n\tipv6 {\n\t\timport none;\n\t\texport all;\n\t};\n}")?;
        for session in &self.sessions {
            write!(f, "\n\n{}", session)?;
        }
        Ok(())
    }
}

pub fn build_bird_config(node: &Node, links: &[LinkView<'_>], router_id: Ipv4Addr) -> BirdConfig {
    BirdConfig {
        router_id,
        prefix: node.prefix,
        sessions: links
            .iter()
            .map(|link| BgpSession {
                index: link.index,
                neighbor: link.peer_address,
                neighbor_as: link.peer.asn,
                source: link.local_address,
                local_as: node.asn,
            })
            .collect(),
    }
}
