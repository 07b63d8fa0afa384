//! DHCP negotiation task
//!
//! The lease protocol itself belongs to a [`DhcpClient`]. This module only
//! runs the task that feeds it events and applies what it reports:
//!
//! ```text
//! Starting --(any but Exit)--> WaitingForEvent --(Exit)--> Exited
//!    |                          ^    |
//!    +--(Exit)--> Exited        +----+ Tcpip / Timer: forward to client
//! ```
//!
//! [`SmoltcpDhcp`] is the client backed by smoltcp's DHCPv4 socket.

use crate::bootstrap::{on_lease_configured, on_lease_lost};
use crate::iface::IpStack;
use crate::process::{Context, Event, Process, Status};
use crate::stack::NetworkStack;
use core::fmt::Write;
use log::{debug, info};
use smoltcp::iface::SocketHandle;
use smoltcp::socket::dhcpv4;
use smoltcp::wire::Ipv4Address;

pub type DhcpSocket = dhcpv4::Socket<'static>;

/// Addresses handed out by a DHCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub host: Ipv4Address,
    pub netmask: Ipv4Address,
    pub router: Ipv4Address,
    pub dns: Ipv4Address,
    /// Server identifier of the offering server
    pub server: Option<Ipv4Address>,
}

impl Lease {
    pub fn new(host: Ipv4Address, netmask: Ipv4Address, router: Ipv4Address, dns: Ipv4Address) -> Self {
        Self {
            host,
            netmask,
            router,
            dns,
            server: None,
        }
    }

    fn from_smoltcp(config: &dhcpv4::Config<'_>) -> Self {
        Self {
            host: config.address.address(),
            netmask: config.address.netmask(),
            router: config.router.unwrap_or(Ipv4Address::UNSPECIFIED),
            dns: config
                .dns_servers
                .first()
                .copied()
                .unwrap_or(Ipv4Address::UNSPECIFIED),
            server: Some(config.server.identifier),
        }
    }
}

/// Lease changes reported by a [`DhcpClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseEvent {
    /// A lease was obtained or renewed
    Configured(Lease),
    /// The lease was lost; carries the last known lease
    Unconfigured(Lease),
}

/// The DHCP protocol implementation driven by [`DhcpTask`]
pub trait DhcpClient<S: ?Sized> {
    /// Prepare the client for the interface with link-layer address `lladdr`
    fn init(&mut self, lladdr: &[u8], stack: &mut S);

    /// Start (or restart) negotiation
    fn request(&mut self, stack: &mut S);

    /// Handle an I/O or timer event
    fn appcall(&mut self, event: Event, stack: &mut S) -> Option<LeaseEvent>;
}

/// States of [`DhcpTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Starting,
    WaitingForEvent,
    Exited,
}

impl core::fmt::Display for TaskState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TaskState::Starting => write!(f, "Starting"),
            TaskState::WaitingForEvent => write!(f, "WaitingForEvent"),
            TaskState::Exited => write!(f, "Exited"),
        }
    }
}

/// What the task does with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Initialize the client and request a lease
    Start,
    /// Hand the event to the client
    Forward,
    Exit,
    Ignore,
}

/// Transition table of the DHCP task
pub fn transition(state: TaskState, event: Event) -> (TaskState, Action) {
    match (state, event) {
        (TaskState::Starting, Event::Exit) => (TaskState::Exited, Action::Exit),
        (TaskState::Starting, _) => (TaskState::WaitingForEvent, Action::Start),
        (TaskState::WaitingForEvent, Event::Tcpip | Event::Timer) => {
            (TaskState::WaitingForEvent, Action::Forward)
        }
        (TaskState::WaitingForEvent, Event::Exit) => (TaskState::Exited, Action::Exit),
        (TaskState::WaitingForEvent, Event::Init | Event::Poll) => {
            (TaskState::WaitingForEvent, Action::Ignore)
        }
        (TaskState::Exited, _) => (TaskState::Exited, Action::Ignore),
    }
}

/// Long-lived task running DHCP negotiation
///
/// Status lines go to `console`.
pub struct DhcpTask<D, W> {
    client: D,
    console: W,
    state: TaskState,
}

impl<D, W: Write> DhcpTask<D, W> {
    pub fn new(client: D, console: W) -> Self {
        Self {
            client,
            console,
            state: TaskState::Starting,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    fn start<S>(&mut self, stack: &mut S)
    where
        S: IpStack + ?Sized,
        D: DhcpClient<S>,
    {
        let lladdr = stack.link_addr();
        self.client.init(&lladdr, stack);

        let _ = writeln!(self.console, "Requesting DHCP configuration...");
        self.client.request(stack);
    }

    fn dispatch<S: IpStack + ?Sized>(&mut self, event: LeaseEvent, stack: &mut S) {
        match event {
            LeaseEvent::Configured(lease) => on_lease_configured(&lease, stack, &mut self.console),
            LeaseEvent::Unconfigured(lease) => on_lease_lost(&lease, &mut self.console),
        }
    }
}

impl<S, D, W> Process<S> for DhcpTask<D, W>
where
    S: IpStack + ?Sized,
    D: DhcpClient<S>,
    W: Write,
{
    fn name(&self) -> &'static str {
        "DHCP"
    }

    fn handle(&mut self, event: Event, ctx: &mut Context<'_, S>) -> Status {
        let (next, action) = transition(self.state, event);
        if next != self.state {
            debug!("dhcp: {} -> {} on {}", self.state, next, event);
        }
        self.state = next;

        match action {
            Action::Start => self.start(&mut *ctx.stack),
            Action::Forward => {
                if let Some(lease_event) = self.client.appcall(event, &mut *ctx.stack) {
                    self.dispatch(lease_event, &mut *ctx.stack);
                }
            }
            Action::Exit | Action::Ignore => {}
        }

        if self.state == TaskState::Exited {
            Status::Exited
        } else {
            Status::Waiting
        }
    }
}

/// DHCP client on top of smoltcp's DHCPv4 socket
#[derive(Debug, Default)]
pub struct SmoltcpDhcp {
    handle: Option<SocketHandle>,
    last: Option<Lease>,
}

impl SmoltcpDhcp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Socket handle, once [`DhcpClient::init`] has run
    pub fn handle(&self) -> Option<SocketHandle> {
        self.handle
    }
}

impl DhcpClient<NetworkStack> for SmoltcpDhcp {
    fn init(&mut self, lladdr: &[u8], stack: &mut NetworkStack) {
        if self.handle.is_some() {
            return;
        }
        debug!("dhcp: client for {:02x?}", lladdr);
        self.handle = Some(stack.sockets_mut().add(DhcpSocket::new()));
    }

    fn request(&mut self, stack: &mut NetworkStack) {
        if let Some(handle) = self.handle {
            stack.sockets_mut().get_mut::<DhcpSocket>(handle).reset();
        }
    }

    fn appcall(&mut self, _event: Event, stack: &mut NetworkStack) -> Option<LeaseEvent> {
        let handle = self.handle?;
        let socket = stack.sockets_mut().get_mut::<DhcpSocket>(handle);

        match socket.poll()? {
            dhcpv4::Event::Configured(config) => {
                let lease = Lease::from_smoltcp(&config);
                info!("dhcp: lease {} from {:?}", lease.host, lease.server);
                self.last = Some(lease);
                Some(LeaseEvent::Configured(lease))
            }
            // The socket starts out deconfigured; only a held lease can be lost
            dhcpv4::Event::Deconfigured => {
                let lease = self.last.take()?;
                info!("dhcp: lease {} lost", lease.host);
                Some(LeaseEvent::Unconfigured(lease))
            }
        }
    }
}
