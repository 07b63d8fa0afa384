// Error types for network operations

use alloc::string::String;
use thiserror::Error;

/// Network-related errors
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Driver error: {0}")]
    DriverError(String),

    #[error("Link down")]
    LinkDown,

    #[error("Address table full")]
    AddressTableFull,

    #[error("Route table full")]
    RouteTableFull,
}
