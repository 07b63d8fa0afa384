//! Interface address configuration
//!
//! [`IpStack`] is everything the bootstrap needs from the IP stack.
//! [`InterfaceConfig`] is the plain owned record that backs it; the smoltcp
//! adapter in [`crate::stack`] keeps one as its mirror.

use crate::error::NetError;
use crate::nameserver::{Lifetime, NameserverPool};
use smoltcp::wire::Ipv4Address;

/// Address setters and accessors of an IPv4 stack
///
/// Setters never fail from the caller's point of view; implementations log
/// anything they cannot apply.
pub trait IpStack {
    fn set_host_addr(&mut self, addr: Ipv4Address);
    fn set_netmask(&mut self, mask: Ipv4Address);
    fn set_default_router(&mut self, addr: Ipv4Address);
    fn update_nameserver(&mut self, addr: Ipv4Address, lifetime: Lifetime);

    fn host_addr(&self) -> Ipv4Address;
    fn netmask(&self) -> Ipv4Address;
    fn default_router(&self) -> Ipv4Address;
    /// Primary nameserver, if any
    fn nameserver(&self) -> Option<Ipv4Address>;
    /// Link-layer (MAC) address of the interface
    fn link_addr(&self) -> [u8; 6];

    /// Process pending link traffic
    ///
    /// # Returns
    /// * `Ok(true)` - Packets were processed
    /// * `Ok(false)` - Nothing to do
    /// * `Err(NetError)` - The link could not be serviced
    fn poll(&mut self, timestamp_ms: i64) -> Result<bool, NetError>;
}

/// Owned address configuration of one interface
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    host: Ipv4Address,
    netmask: Ipv4Address,
    router: Ipv4Address,
    nameservers: NameserverPool,
    link_addr: [u8; 6],
    last_poll_ms: Option<i64>,
}

impl InterfaceConfig {
    /// Unconfigured interface (all addresses 0.0.0.0)
    pub fn new(link_addr: [u8; 6]) -> Self {
        Self {
            host: Ipv4Address::UNSPECIFIED,
            netmask: Ipv4Address::UNSPECIFIED,
            router: Ipv4Address::UNSPECIFIED,
            nameservers: NameserverPool::new(),
            link_addr,
            last_poll_ms: None,
        }
    }

    pub fn nameservers(&self) -> &NameserverPool {
        &self.nameservers
    }

    /// Age nameserver lifetimes by the time since the previous call
    pub(crate) fn advance_clock(&mut self, timestamp_ms: i64) {
        if let Some(last) = self.last_poll_ms {
            let elapsed_secs = (timestamp_ms - last).max(0) / 1000;
            if elapsed_secs == 0 {
                return;
            }
            self.nameservers
                .age(u32::try_from(elapsed_secs).unwrap_or(u32::MAX));
            self.last_poll_ms = Some(last + elapsed_secs * 1000);
        } else {
            self.last_poll_ms = Some(timestamp_ms);
        }
    }
}

impl IpStack for InterfaceConfig {
    fn set_host_addr(&mut self, addr: Ipv4Address) {
        self.host = addr;
    }

    fn set_netmask(&mut self, mask: Ipv4Address) {
        self.netmask = mask;
    }

    fn set_default_router(&mut self, addr: Ipv4Address) {
        self.router = addr;
    }

    fn update_nameserver(&mut self, addr: Ipv4Address, lifetime: Lifetime) {
        self.nameservers.update(addr, lifetime);
    }

    fn host_addr(&self) -> Ipv4Address {
        self.host
    }

    fn netmask(&self) -> Ipv4Address {
        self.netmask
    }

    fn default_router(&self) -> Ipv4Address {
        self.router
    }

    fn nameserver(&self) -> Option<Ipv4Address> {
        self.nameservers.primary().map(|ns| ns.addr)
    }

    fn link_addr(&self) -> [u8; 6] {
        self.link_addr
    }

    fn poll(&mut self, timestamp_ms: i64) -> Result<bool, NetError> {
        self.advance_clock(timestamp_ms);
        Ok(false)
    }
}

/// Convert a netmask to a prefix length
///
/// Counts leading one bits; anything after the first zero bit is ignored.
pub fn netmask_to_prefix(mask: Ipv4Address) -> u8 {
    u32::from_be_bytes(mask.0).leading_ones() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

    #[test]
    fn test_new_interface_is_unconfigured() {
        let iface = InterfaceConfig::new(MAC);

        assert_eq!(iface.host_addr(), Ipv4Address::UNSPECIFIED);
        assert_eq!(iface.netmask(), Ipv4Address::UNSPECIFIED);
        assert_eq!(iface.default_router(), Ipv4Address::UNSPECIFIED);
        assert_eq!(iface.nameserver(), None);
        assert_eq!(iface.link_addr(), MAC);
    }

    #[test]
    fn test_poll_ages_nameservers() {
        let mut iface = InterfaceConfig::new(MAC);
        iface.update_nameserver(Ipv4Address::new(10, 0, 0, 1), Lifetime::Seconds(2));

        assert!(!iface.poll(0).unwrap());
        iface.poll(1_500).unwrap();
        assert!(iface.nameserver().is_some());

        iface.poll(2_100).unwrap();
        assert_eq!(iface.nameserver(), None);
    }

    #[test]
    fn test_netmask_to_prefix() {
        assert_eq!(netmask_to_prefix(Ipv4Address::new(255, 255, 255, 0)), 24);
        assert_eq!(netmask_to_prefix(Ipv4Address::new(255, 255, 255, 255)), 32);
        assert_eq!(netmask_to_prefix(Ipv4Address::new(255, 255, 240, 0)), 20);
        assert_eq!(netmask_to_prefix(Ipv4Address::new(0, 0, 0, 0)), 0);
        assert_eq!(netmask_to_prefix(Ipv4Address::new(255, 0, 255, 0)), 8);
    }
}
