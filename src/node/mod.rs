//! Node Service Module
//!
//! Reconcilers that drive a target path to its desired mount state, the
//! default volume attribute resolver, and the node service that fronts them.

pub mod attributes;
pub mod publish;
pub mod service;
pub mod stage;
pub mod teardown;

pub use attributes::*;
pub use publish::*;
pub use service::*;
pub use stage::*;
pub use teardown::*;

use crate::domain::ports::VolumeCapability;
use crate::error::{Error, Result};
use std::path::Path;

/// Reject an empty required field
pub(crate) fn require<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(message.to_string()));
    }
    Ok(value)
}

/// Reject an empty or relative path
pub(crate) fn require_path<'a>(value: &'a str, message: &str) -> Result<&'a Path> {
    let path = Path::new(require(value, message)?);
    if !path.is_absolute() {
        return Err(Error::InvalidArgument(format!(
            "{}: path {:?} is not absolute",
            message, value
        )));
    }
    Ok(path)
}

/// Reject a missing capability
pub(crate) fn require_capability<'a>(
    capability: &'a Option<VolumeCapability>,
    message: &str,
) -> Result<&'a VolumeCapability> {
    capability
        .as_ref()
        .ok_or_else(|| Error::InvalidArgument(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_require_path() {
        assert_eq!(require_path("/stage/v1", "missing").unwrap(), Path::new("/stage/v1"));
        assert_matches!(require_path("", "missing"), Err(Error::InvalidArgument(m)) if m == "missing");
        assert_matches!(require_path("stage/v1", "missing"), Err(Error::InvalidArgument(_)));
    }

    #[test]
    fn test_require_capability() {
        assert!(require_capability(&Some(VolumeCapability::default()), "cap").is_ok());
        assert_matches!(require_capability(&None, "cap"), Err(Error::InvalidArgument(_)));
    }
}
