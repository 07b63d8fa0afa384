//! Boot-time addressing configuration
//!
//! The defaults come from cargo features: `ipv6` selects the alternate
//! addressing mode and `dns` installs the static nameserver.

use smoltcp::wire::Ipv4Address;

/// 192.0.2.0/24 is reserved for documentation by RFC 5737.
pub const SUBNET: [u8; 3] = [192, 0, 2];

/// Netmask of the static subnet
pub const NETMASK: Ipv4Address = Ipv4Address([255, 255, 255, 0]);

/// Host part of the static address
pub const HOST_OCTET: u8 = 2;

/// Host part of the gateway, which also serves as nameserver
pub const GATEWAY_OCTET: u8 = 1;

/// How the interface gets its addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// Documentation-block addresses, later replaced by a DHCP lease
    StaticIpv4,
    /// IPv6 mode assigns addresses on its own; nothing is configured here
    Ipv6,
}

impl Default for AddressingMode {
    fn default() -> Self {
        if cfg!(feature = "ipv6") {
            AddressingMode::Ipv6
        } else {
            AddressingMode::StaticIpv4
        }
    }
}

impl core::fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AddressingMode::StaticIpv4 => write!(f, "static IPv4"),
            AddressingMode::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// The four addresses installed in static mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAddressing {
    pub host: Ipv4Address,
    pub netmask: Ipv4Address,
    pub gateway: Ipv4Address,
    pub nameserver: Ipv4Address,
}

impl StaticAddressing {
    /// Derive host (`.2`), gateway and nameserver (`.1`) from a /24 subnet
    pub fn from_subnet(subnet: [u8; 3], netmask: Ipv4Address) -> Self {
        let [a, b, c] = subnet;
        let gateway = Ipv4Address::new(a, b, c, GATEWAY_OCTET);
        Self {
            host: Ipv4Address::new(a, b, c, HOST_OCTET),
            netmask,
            gateway,
            nameserver: gateway,
        }
    }
}

impl Default for StaticAddressing {
    fn default() -> Self {
        Self::from_subnet(SUBNET, NETMASK)
    }
}

/// Configuration read once by [`crate::eth_init`]
#[derive(Debug, Clone)]
pub struct BootConfig {
    pub mode: AddressingMode,
    /// Install the static nameserver (name resolution compiled in)
    pub with_dns: bool,
    /// Start the DHCP task after the static setup. Clear it to keep only
    /// the static addresses.
    pub start_dhcp: bool,
    pub addressing: StaticAddressing,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            mode: AddressingMode::default(),
            with_dns: cfg!(feature = "dns"),
            start_dhcp: true,
            addressing: StaticAddressing::default(),
        }
    }
}

impl BootConfig {
    pub fn with_mode(mut self, mode: AddressingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_dns(mut self, enabled: bool) -> Self {
        self.with_dns = enabled;
        self
    }

    pub fn with_dhcp(mut self, enabled: bool) -> Self {
        self.start_dhcp = enabled;
        self
    }

    pub fn with_addressing(mut self, addressing: StaticAddressing) -> Self {
        self.addressing = addressing;
        self
    }
}
