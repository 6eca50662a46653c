//! API Module
//!
//! Exposes the node service as JSON endpoints and runs the server.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
