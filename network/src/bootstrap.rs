//! Ethernet interface bootstrap
//!
//! [`eth_init`] runs once at startup. In static IPv4 mode it installs the
//! documentation-block addresses and starts the DHCP task, whose lease
//! replaces them later. In IPv6 mode addressing is left to that mode's own
//! mechanism. The link task is started in both modes.

use crate::config::{AddressingMode, BootConfig};
use crate::dhcp::{DhcpClient, DhcpTask, Lease};
use crate::iface::IpStack;
use crate::link::LinkTask;
use crate::nameserver::Lifetime;
use crate::process::{ProcessId, Spawner};
use alloc::boxed::Box;
use core::fmt::Write;
use log::info;

/// Processes started by [`eth_init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    pub link: ProcessId,
    pub dhcp: Option<ProcessId>,
}

/// Configure the interface and start its tasks
///
/// Addresses are applied in the order host, netmask, gateway, nameserver.
/// `dhcp` and `console` are only used when the DHCP task is started.
pub fn eth_init<S, P, D, W>(
    config: &BootConfig,
    stack: &mut S,
    spawner: &mut P,
    dhcp: D,
    console: W,
) -> Started
where
    S: IpStack + ?Sized,
    P: Spawner<S> + ?Sized,
    D: DhcpClient<S> + 'static,
    W: Write + 'static,
{
    let static_mode = config.mode == AddressingMode::StaticIpv4;

    if static_mode {
        let addressing = &config.addressing;
        stack.set_host_addr(addressing.host);
        stack.set_netmask(addressing.netmask);
        stack.set_default_router(addressing.gateway);
        if config.with_dns {
            stack.update_nameserver(addressing.nameserver, Lifetime::Infinite);
        }
        info!(
            "eth: static {}/{} via {}",
            addressing.host, addressing.netmask, addressing.gateway
        );
    } else {
        info!("eth: {} mode, no static configuration", config.mode);
    }

    let link = spawner.start(Box::new(LinkTask::new()));

    let dhcp = if static_mode && config.start_dhcp {
        Some(spawner.start(Box::new(DhcpTask::new(dhcp, console))))
    } else {
        None
    };

    Started { link, dhcp }
}

/// Apply a confirmed lease and print it
pub fn on_lease_configured<S, W>(lease: &Lease, stack: &mut S, console: &mut W)
where
    S: IpStack + ?Sized,
    W: Write + ?Sized,
{
    stack.set_host_addr(lease.host);
    stack.set_netmask(lease.netmask);
    stack.set_default_router(lease.router);
    // A lease without a DNS option keeps the current nameservers
    if !lease.dns.is_unspecified() {
        stack.update_nameserver(lease.dns, Lifetime::Infinite);
    }

    info!("dhcp: configured {}", lease.host);
    let _ = writeln!(console, "DHCP configured:");
    let _ = writeln!(console, " - Host IP:        {}", lease.host);
    let _ = writeln!(console, " - Netmask:        {}", lease.netmask);
    let _ = writeln!(console, " - Default router: {}", lease.router);
    let _ = writeln!(console, " - DNS server:     {}", lease.dns);
}

/// Report a lost lease
///
/// The stack keeps whatever was configured last.
pub fn on_lease_lost<W>(_lease: &Lease, console: &mut W)
where
    W: Write + ?Sized,
{
    info!("dhcp: unconfigured");
    let _ = writeln!(console, "DHCP unconfigured.");
}
