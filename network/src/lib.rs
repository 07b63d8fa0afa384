#![no_std]

//! Ethernet address bootstrap
//!
//! Configures IPv4 addressing for an embedded Ethernet interface: static
//! documentation-block addresses at boot, replaced by a DHCP lease once one
//! is obtained. Runs on a cooperative scheduler; see [`process`].

#[macro_use]
extern crate alloc;

pub mod bootstrap;
pub mod config;
pub mod dhcp;
pub mod drivers;
pub mod error;
pub mod iface;
pub mod link;
pub mod nameserver;
pub mod process;
pub mod stack;

// Re-export commonly used types
pub use bootstrap::{eth_init, on_lease_configured, on_lease_lost, Started};
pub use config::{AddressingMode, BootConfig, StaticAddressing};
pub use dhcp::{DhcpClient, DhcpTask, Lease, LeaseEvent, SmoltcpDhcp};
pub use drivers::NetworkDriver;
pub use error::NetError;
pub use iface::{InterfaceConfig, IpStack};
pub use link::LinkTask;
pub use nameserver::{Lifetime, NameserverPool};
pub use process::{Context, Event, Process, ProcessId, Scheduler, Spawner, Status};
pub use stack::NetworkStack;
