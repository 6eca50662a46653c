//! Mount tool invocation
//!
//! Builds the goofys command line and credential environment for a stage call.

use crate::domain::ports::{MountSpec, StorageAccount, VolumeCapability};
use std::collections::BTreeMap;
use std::path::Path;

/// Blob service host suffix
pub const BLOB_ENDPOINT_SUFFIX: &str = "blob.core.windows.net";

/// Environment variable carrying the storage account name
pub const ENV_STORAGE_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";

/// Environment variable carrying the storage account key
pub const ENV_STORAGE_KEY: &str = "AZURE_STORAGE_KEY";

/// Remote endpoint for a container, `wasb://<container>@<account>.<suffix>`
pub fn remote_endpoint(account: &StorageAccount) -> String {
    format!(
        "wasb://{}@{}.{}",
        account.container_name, account.account_name, BLOB_ENDPOINT_SUFFIX
    )
}

/// Build the mount tool invocation for `target`.
///
/// Each capability mount flag is split on whitespace, so `"-o allow_other"`
/// becomes two arguments.
pub fn build_mount_spec(
    account: &StorageAccount,
    capability: &VolumeCapability,
    target: &Path,
) -> MountSpec {
    let mount_flags = capability
        .mount_flags
        .iter()
        .flat_map(|flag| flag.split_whitespace())
        .map(str::to_string)
        .collect();

    let mut env_overrides = BTreeMap::new();
    env_overrides.insert(ENV_STORAGE_ACCOUNT.to_string(), account.account_name.clone());
    env_overrides.insert(ENV_STORAGE_KEY.to_string(), account.account_key.clone());

    MountSpec {
        remote_endpoint: remote_endpoint(account),
        target: target.to_path_buf(),
        mount_flags,
        env_overrides,
    }
}
