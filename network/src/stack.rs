// smoltcp network stack integration
// Mirrors the interface address configuration onto a smoltcp Interface

use crate::drivers::NetworkDriver;
use crate::error::NetError;
use crate::iface::{netmask_to_prefix, InterfaceConfig, IpStack};
use crate::nameserver::Lifetime;
use alloc::boxed::Box;
use alloc::vec::Vec;
use log::warn;
use smoltcp::iface::{Config, Interface, SocketSet};
use smoltcp::phy::{Device, DeviceCapabilities, Medium, RxToken, TxToken};
use smoltcp::time::Instant;
use smoltcp::wire::{EthernetAddress, HardwareAddress, IpAddress, IpCidr, Ipv4Address};

/// Device wrapper that adapts our NetworkDriver trait to smoltcp's Device trait
struct DeviceWrapper {
    driver: Box<dyn NetworkDriver>,
}

/// RX token implementation for smoltcp
struct RxTokenWrapper {
    buffer: Vec<u8>,
}

impl RxToken for RxTokenWrapper {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(&mut self.buffer)
    }
}

/// TX token implementation for smoltcp
struct TxTokenWrapper<'a> {
    driver: &'a mut Box<dyn NetworkDriver>,
}

impl<'a> TxToken for TxTokenWrapper<'a> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut buffer = vec![0u8; len];
        let result = f(&mut buffer);

        // smoltcp has no way to take the error back
        if let Err(e) = self.driver.send(&buffer) {
            warn!("eth: dropped outgoing frame: {}", e);
        }

        result
    }
}

impl Device for DeviceWrapper {
    type RxToken<'a> = RxTokenWrapper where Self: 'a;
    type TxToken<'a> = TxTokenWrapper<'a> where Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        match self.driver.receive() {
            Ok(Some(packet)) => Some((
                RxTokenWrapper { buffer: packet },
                TxTokenWrapper {
                    driver: &mut self.driver,
                },
            )),
            Ok(None) => None,
            Err(e) => {
                warn!("eth: receive failed: {}", e);
                None
            }
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        Some(TxTokenWrapper {
            driver: &mut self.driver,
        })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.max_transmission_unit = 1514; // Ethernet frame without FCS
        caps.max_burst_size = Some(1);
        caps.medium = Medium::Ethernet;
        caps
    }
}

/// Network stack using smoltcp
///
/// Owns the smoltcp interface and socket set for one Ethernet driver. The
/// address configuration lives in an [`InterfaceConfig`] and every change is
/// pushed down to the interface.
pub struct NetworkStack {
    iface: Interface,
    sockets: SocketSet<'static>,
    device: DeviceWrapper,
    config: InterfaceConfig,
}

impl NetworkStack {
    /// Create an unconfigured stack on top of `driver`
    pub fn new(driver: Box<dyn NetworkDriver>) -> Self {
        let mac = driver.mac_address();
        let mut device = DeviceWrapper { driver };

        let config = Config::new(HardwareAddress::Ethernet(EthernetAddress(mac)));
        let iface = Interface::new(config, &mut device, Instant::ZERO);

        NetworkStack {
            iface,
            sockets: SocketSet::new(Vec::new()),
            device,
            config: InterfaceConfig::new(mac),
        }
    }

    /// Get a reference to the interface
    pub fn interface(&self) -> &Interface {
        &self.iface
    }

    /// Get a reference to the socket set
    pub fn sockets(&self) -> &SocketSet<'static> {
        &self.sockets
    }

    /// Get a mutable reference to the socket set
    pub fn sockets_mut(&mut self) -> &mut SocketSet<'static> {
        &mut self.sockets
    }

    /// The address configuration currently applied
    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    /// Check if the network link is up
    pub fn is_link_up(&self) -> bool {
        self.device.driver.is_link_up()
    }

    /// Rewrite the interface's IPv4 CIDR from host address and netmask
    fn apply_cidr(&mut self) -> Result<(), NetError> {
        let host = self.config.host_addr();
        let prefix_len = netmask_to_prefix(self.config.netmask());
        let mut result = Ok(());

        self.iface.update_ip_addrs(|addrs| {
            addrs.clear();
            if host.is_unspecified() {
                return;
            }
            if addrs
                .push(IpCidr::new(IpAddress::Ipv4(host), prefix_len))
                .is_err()
            {
                result = Err(NetError::AddressTableFull);
            }
        });

        result
    }

    fn apply_router(&mut self, router: Ipv4Address) -> Result<(), NetError> {
        let routes = self.iface.routes_mut();
        if router.is_unspecified() {
            routes.remove_default_ipv4_route();
            return Ok(());
        }
        routes
            .add_default_ipv4_route(router)
            .map(|_| ())
            .map_err(|_| NetError::RouteTableFull)
    }
}

impl IpStack for NetworkStack {
    fn set_host_addr(&mut self, addr: Ipv4Address) {
        self.config.set_host_addr(addr);
        if let Err(e) = self.apply_cidr() {
            warn!("eth: host address {} not applied: {}", addr, e);
        }
    }

    fn set_netmask(&mut self, mask: Ipv4Address) {
        self.config.set_netmask(mask);
        if let Err(e) = self.apply_cidr() {
            warn!("eth: netmask {} not applied: {}", mask, e);
        }
    }

    fn set_default_router(&mut self, addr: Ipv4Address) {
        self.config.set_default_router(addr);
        if let Err(e) = self.apply_router(addr) {
            warn!("eth: default router {} not applied: {}", addr, e);
        }
    }

    fn update_nameserver(&mut self, addr: Ipv4Address, lifetime: Lifetime) {
        self.config.update_nameserver(addr, lifetime);
    }

    fn host_addr(&self) -> Ipv4Address {
        self.config.host_addr()
    }

    fn netmask(&self) -> Ipv4Address {
        self.config.netmask()
    }

    fn default_router(&self) -> Ipv4Address {
        self.config.default_router()
    }

    fn nameserver(&self) -> Option<Ipv4Address> {
        self.config.nameserver()
    }

    fn link_addr(&self) -> [u8; 6] {
        self.config.link_addr()
    }

    /// Poll the driver, then the smoltcp interface
    ///
    /// Should be called regularly (e.g. every 10ms) so that incoming frames
    /// are processed, sockets make progress and timers fire.
    fn poll(&mut self, timestamp_ms: i64) -> Result<bool, NetError> {
        self.device.driver.poll()?;
        if !self.device.driver.is_link_up() {
            return Err(NetError::LinkDown);
        }

        self.config.advance_clock(timestamp_ms);

        let timestamp = Instant::from_millis(timestamp_ms);
        Ok(self.iface.poll(timestamp, &mut self.device, &mut self.sockets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IdleDriver {
        link_up: bool,
    }

    impl NetworkDriver for IdleDriver {
        fn send(&mut self, _packet: &[u8]) -> Result<(), NetError> {
            Ok(())
        }

        fn receive(&mut self) -> Result<Option<Vec<u8>>, NetError> {
            Ok(None)
        }

        fn mac_address(&self) -> [u8; 6] {
            [0x02, 0x00, 0x00, 0x12, 0x34, 0x56]
        }

        fn is_link_up(&self) -> bool {
            self.link_up
        }

        fn poll(&mut self) -> Result<(), NetError> {
            Ok(())
        }
    }

    fn stack(link_up: bool) -> NetworkStack {
        NetworkStack::new(Box::new(IdleDriver { link_up }))
    }

    #[test]
    fn test_new_stack_has_no_addresses() {
        let stack = stack(true);

        assert!(stack.interface().ip_addrs().is_empty());
        assert_eq!(stack.link_addr(), [0x02, 0x00, 0x00, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_host_and_netmask_become_one_cidr() {
        let mut stack = stack(true);
        stack.set_host_addr(Ipv4Address::new(192, 0, 2, 2));
        stack.set_netmask(Ipv4Address::new(255, 255, 255, 0));

        let expected = IpCidr::new(IpAddress::Ipv4(Ipv4Address::new(192, 0, 2, 2)), 24);
        assert_eq!(stack.interface().ip_addrs(), &[expected]);
        assert_eq!(stack.host_addr(), Ipv4Address::new(192, 0, 2, 2));
        assert_eq!(stack.netmask(), Ipv4Address::new(255, 255, 255, 0));
    }

    #[test]
    fn test_router_and_nameserver_are_kept() {
        let mut stack = stack(true);
        stack.set_default_router(Ipv4Address::new(192, 0, 2, 1));
        stack.update_nameserver(Ipv4Address::new(192, 0, 2, 1), Lifetime::Infinite);

        assert_eq!(stack.default_router(), Ipv4Address::new(192, 0, 2, 1));
        assert_eq!(stack.nameserver(), Some(Ipv4Address::new(192, 0, 2, 1)));
    }

    #[test]
    fn test_poll_idle_link() {
        let mut stack = stack(true);

        assert!(matches!(stack.poll(0), Ok(false)));
    }

    #[test]
    fn test_poll_link_down() {
        let mut stack = stack(false);

        assert!(matches!(stack.poll(0), Err(NetError::LinkDown)));
    }
}
