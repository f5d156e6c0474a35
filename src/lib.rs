//! # Bgpverse - Topology compiler for BGP-routed VM networks
//!
//! This library turns a map of nodes and links (for example the EVE Online
//! universe dump, or a metro map) into the files needed to boot one small
//! router VM per node and have them all speak BGP to their neighbors.
//!
//! ## Overview
//!
//! Every node becomes a VM with its own ASN and IPv6 /48. Every link becomes
//! a pair of virtual NICs connected through UDP sockets, numbered with a
//! /127 out of one side's prefix, and an eBGP session on top.
//!
//! ## Pipeline
//!
//! 1. **Normalize** (`topology::normalize`): drop placeholder nodes, number
//!    the rest, collapse edges declared in both directions.
//! 2. **Place** (`placement`): first-fit whole regions onto the host pool
//!    without exceeding host memory.
//! 3. **Allocate links** (`topology::links`): per-host UDP ports and global
//!    address suffixes for both ends of every link.
//! 4. **Render** (`render`): `interfaces`, `bird.conf` and the QEMU launch
//!    line for every node.
//!
//! The first three steps are strictly serial since their counters decide
//! the output. Rendering is pure and runs in parallel.
//!
//! ## Modules
//!
//! - `config`: YAML configuration structures and defaults
//! - `config_loader`: configuration and topology file loading
//! - `topology`: data model, normalization, link allocation
//! - `ip`: prefix arithmetic and sequence allocators
//! - `placement`: region grouping and first-fit host assignment
//! - `render`: artifact builders and their text serialization
//! - `utils`: post-allocation consistency checks
//! - `orchestrator`: the end-to-end pipeline and the artifact writer
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bgpverse::{config_loader, orchestrator};
//! use std::path::Path;
//!
//! let config = config_loader::load_config_or_default(None)?;
//! let topology = config_loader::load_topology(Path::new("universe-pretty.json"))?;
//!
//! let compiled = orchestrator::compile(&topology, &config)?;
//! orchestrator::write_artifacts(&compiled, Path::new("output"))?;
//!
//! // output/<host>/<node id>/ now contains:
//! // - interfaces
//! // - bird.conf
//! // - qemu.sh
//! // - hostname
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! Each phase has its own `thiserror` error type. The orchestrator wraps
//! them into `color_eyre` reports with context; every error is fatal and
//! a re-run with the same input reproduces the same output.

pub mod config;
pub mod config_loader;
pub mod ip;
pub mod topology;
pub mod placement;
pub mod render;
pub mod utils;
pub mod orchestrator;
