//! Volume attribute resolution
//!
//! Resolves the storage account and container for a volume from the request's
//! secrets and volume context, falling back to the volume ID format
//! `<resource-group>#<account>#<container>`.

use crate::domain::ports::{AttributeResolver, StorageAccount};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

/// Secret keys holding the account name, first match wins
pub const ACCOUNT_NAME_KEYS: &[&str] = &["azurestorageaccountname", "accountname"];

/// Secret keys holding the account key, first match wins
pub const ACCOUNT_KEY_KEYS: &[&str] = &["azurestorageaccountkey", "accountkey"];

/// Volume context keys holding the container name, first match wins
pub const CONTAINER_NAME_KEYS: &[&str] = &["containerName", "containername"];

/// Separator in composite volume IDs
pub const VOLUME_ID_SEPARATOR: char = '#';

/// Parsed composite volume ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeIdParts<'a> {
    pub resource_group: &'a str,
    pub account_name: &'a str,
    pub container_name: &'a str,
}

/// Split `<resource-group>#<account>#<container>`
pub fn parse_volume_id(volume_id: &str) -> Option<VolumeIdParts<'_>> {
    let mut parts = volume_id.split(VOLUME_ID_SEPARATOR);
    let resource_group = parts.next()?;
    let account_name = parts.next()?;
    let container_name = parts.next()?;
    if parts.next().is_some() || account_name.is_empty() || container_name.is_empty() {
        return None;
    }
    Some(VolumeIdParts {
        resource_group,
        account_name,
        container_name,
    })
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

/// Resolver reading credentials from the request itself
#[derive(Debug, Clone, Default)]
pub struct SecretAttributeResolver;

impl SecretAttributeResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttributeResolver for SecretAttributeResolver {
    async fn resolve(
        &self,
        volume_id: &str,
        volume_context: &BTreeMap<String, String>,
        secrets: &BTreeMap<String, String>,
    ) -> Result<StorageAccount> {
        let failed = |reason: &str| Error::AttributeResolution {
            volume_id: volume_id.to_string(),
            reason: reason.to_string(),
        };
        let parsed = parse_volume_id(volume_id);

        let account_name = lookup(secrets, ACCOUNT_NAME_KEYS)
            .or(parsed.as_ref().map(|p| p.account_name))
            .ok_or_else(|| failed("storage account name not found in secrets or volume ID"))?;

        let account_key = lookup(secrets, ACCOUNT_KEY_KEYS)
            .ok_or_else(|| failed("storage account key not found in secrets"))?;

        let container_name = lookup(volume_context, CONTAINER_NAME_KEYS)
            .or(parsed.as_ref().map(|p| p.container_name))
            .ok_or_else(|| failed("container name not found in volume context or volume ID"))?;

        debug!(
            volume_id = volume_id,
            account = account_name,
            container = container_name,
            "Resolved volume attributes"
        );

        Ok(StorageAccount {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
            container_name: container_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_volume_id() {
        assert_eq!(
            parse_volume_id("rg#acct#data"),
            Some(VolumeIdParts {
                resource_group: "rg",
                account_name: "acct",
                container_name: "data",
            })
        );
        assert_eq!(parse_volume_id("v1"), None);
        assert_eq!(parse_volume_id("rg#acct"), None);
        assert_eq!(parse_volume_id("rg#acct#data#extra"), None);
        assert_eq!(parse_volume_id("rg##data"), None);
    }

    #[tokio::test]
    async fn test_resolve_from_secrets_and_context() {
        let resolver = SecretAttributeResolver::new();
        let account = resolver
            .resolve(
                "v1",
                &map(&[("containerName", "data")]),
                &map(&[("accountname", "acct"), ("accountkey", "a2V5")]),
            )
            .await
            .unwrap();

        assert_eq!(account.account_name, "acct");
        assert_eq!(account.account_key, "a2V5");
        assert_eq!(account.container_name, "data");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_volume_id() {
        let resolver = SecretAttributeResolver::new();
        let account = resolver
            .resolve(
                "rg#acct#data",
                &BTreeMap::new(),
                &map(&[("azurestorageaccountkey", "a2V5")]),
            )
            .await
            .unwrap();

        assert_eq!(account.account_name, "acct");
        assert_eq!(account.container_name, "data");
    }

    #[tokio::test]
    async fn test_resolve_without_key_fails() {
        let resolver = SecretAttributeResolver::new();
        let err = resolver
            .resolve("rg#acct#data", &BTreeMap::new(), &BTreeMap::new())
            .await
            .unwrap_err();

        assert_matches!(err, Error::AttributeResolution { ref volume_id, .. } if volume_id == "rg#acct#data");
    }
}
