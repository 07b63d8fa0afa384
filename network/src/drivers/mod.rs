// Ethernet driver interface

use crate::error::NetError;
use alloc::vec::Vec;

/// Trait for Ethernet drivers
///
/// The link task drives a [`crate::NetworkStack`] built on top of one of these.
pub trait NetworkDriver: Send {
    /// Send a raw Ethernet frame
    ///
    /// # Arguments
    /// * `packet` - The Ethernet frame to send (including Ethernet header)
    ///
    /// # Returns
    /// * `Ok(())` if the frame was queued for transmission
    /// * `Err(NetError)` if transmission failed
    fn send(&mut self, packet: &[u8]) -> Result<(), NetError>;

    /// Receive a raw Ethernet frame (non-blocking)
    ///
    /// # Returns
    /// * `Ok(Some(packet))` if a frame was received
    /// * `Ok(None)` if no frame is available
    /// * `Err(NetError)` if an error occurred
    fn receive(&mut self) -> Result<Option<Vec<u8>>, NetError>;

    /// The 6-byte MAC address
    fn mac_address(&self) -> [u8; 6];

    /// Check if the link is up
    fn is_link_up(&self) -> bool;

    /// Service the hardware (interrupt status, link state, rings)
    fn poll(&mut self) -> Result<(), NetError>;
}
