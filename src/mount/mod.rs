//! Mount Layer
//!
//! Mount point probing and directory preparation built over the
//! [`Mounter`](crate::domain::ports::Mounter) port, construction of the
//! mount tool invocation, and the OS-backed mounter.

pub mod prober;
pub mod spec;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;

pub use prober::*;
pub use spec::*;
pub use system::*;
