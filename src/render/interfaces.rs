//! `/etc/network/interfaces` rendering.

use std::fmt;
use std::net::Ipv6Addr;

use super::LinkView;

/// Point-to-point links are numbered as /127 pairs
pub const LINK_NETMASK: u8 = 127;

/// Interface name for the endpoint at `index`
pub fn interface_name(index: usize) -> String {
    format!("eth{}", index)
}

/// One static IPv6 interface stanza
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBlock {
    pub name: String,
    pub address: Ipv6Addr,
    pub netmask: u8,
}

impl fmt::Display for InterfaceBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "auto {name}\niface {name} inet6 static\n\taddress {}\n\tnetmask {}\n\n",
            self.address,
            self.netmask,
            name = self.name
        )
    }
}

/// Whole interfaces file: loopback plus one block per link
#[derive(Debug, Clone, PartialEq)]
pub struct InterfacesFile {
    pub blocks: Vec<InterfaceBlock>,
}

impl fmt::Display for InterfacesFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("auto lo\niface lo inet loopback\n\n")?;
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}

pub fn build_interfaces(links: &[LinkView<'_>]) -> InterfacesFile {
    InterfacesFile {
        blocks: links
            .iter()
            .map(|link| InterfaceBlock {
                name: interface_name(link.index),
                address: link.local_address,
                netmask: LINK_NETMASK,
            })
            .collect(),
    }
}
