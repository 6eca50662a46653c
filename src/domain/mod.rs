//! Domain layer - Node request records and port definitions
//!
//! This module defines the request/response records of the node service and
//! the traits (ports) that the OS-backed adapters implement.

pub mod ports;

pub use ports::*;
