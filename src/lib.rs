//! wolpve — Wake-on-LAN listener for Proxmox VE hosts.
//!
//! Watches one or more network interfaces for Wake-on-LAN magic packets,
//! maps the target MAC address to a VM or container by scanning the
//! hypervisor's descriptor files, and starts the workload through `qm` or
//! `pct`.
//!
//! See `DESIGN.md` for the architecture.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod executor;
pub mod logging;
pub mod magic;
pub mod power;
pub mod resolver;
pub mod server;
pub mod session;
pub mod target;
