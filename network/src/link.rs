// Ethernet link task
// Polls the stack and raises Tcpip whenever traffic was processed

use crate::error::NetError;
use crate::iface::IpStack;
use crate::process::{Context, Event, Process, Status};
use log::{debug, info, warn};

/// Link-processing task for the Ethernet interface
#[derive(Debug)]
pub struct LinkTask {
    link_up: bool,
}

impl Default for LinkTask {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTask {
    pub fn new() -> Self {
        Self { link_up: true }
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    fn poll<S: IpStack + ?Sized>(&mut self, ctx: &mut Context<'_, S>) {
        match ctx.stack.poll(ctx.now_ms) {
            Ok(active) => {
                if !self.link_up {
                    info!("eth: link up");
                    self.link_up = true;
                }
                if active {
                    ctx.broadcast(Event::Tcpip);
                }
            }
            Err(NetError::LinkDown) => {
                if self.link_up {
                    info!("eth: link down");
                    self.link_up = false;
                }
            }
            Err(e) => warn!("eth: poll failed: {}", e),
        }
    }
}

impl<S: IpStack + ?Sized> Process<S> for LinkTask {
    fn name(&self) -> &'static str {
        "Ethernet"
    }

    fn handle(&mut self, event: Event, ctx: &mut Context<'_, S>) -> Status {
        match event {
            Event::Init => {
                debug!("eth: started on {:02x?}", ctx.stack.link_addr());
                Status::Waiting
            }
            Event::Poll | Event::Timer => {
                self.poll(ctx);
                Status::Waiting
            }
            Event::Tcpip => Status::Waiting,
            Event::Exit => Status::Exited,
        }
    }
}
