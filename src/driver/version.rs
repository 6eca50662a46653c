//! Version report printed by `--version`

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Build and runtime version details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub driver_name: String,
    pub driver_version: String,
    pub git_commit: String,
    pub build_date: String,
    pub compiler: String,
    pub platform: String,
}

impl VersionInfo {
    pub fn new(driver_name: &str) -> Self {
        Self {
            driver_name: driver_name.to_string(),
            driver_version: crate::VERSION.to_string(),
            git_commit: option_env!("GIT_COMMIT").unwrap_or("N/A").to_string(),
            build_date: option_env!("BUILD_DATE").unwrap_or("N/A").to_string(),
            compiler: "rustc".to_string(),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

/// Version report as YAML
pub fn version_yaml(driver_name: &str) -> Result<String> {
    Ok(serde_yaml::to_string(&VersionInfo::new(driver_name))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_yaml() {
        let yaml = version_yaml("goofys.csi.azure.com").unwrap();
        assert!(yaml.contains("driverName: goofys.csi.azure.com"));
        assert!(yaml.contains(&format!("driverVersion: {}", crate::VERSION)));

        let parsed: VersionInfo = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.platform, format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH));
    }
}
