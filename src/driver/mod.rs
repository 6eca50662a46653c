//! Driver Module
//!
//! Process-wide driver configuration and the identity/capability
//! responder that answers from it.

pub mod config;
pub mod identity;
pub mod version;

pub use config::*;
pub use identity::*;
pub use version::*;
