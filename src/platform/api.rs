//! Remote command API port.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use async_trait::async_trait;
use serde_json::Value;

/// A command the remote API acknowledged, with its assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub id: String,
    pub name: String,
}

/// Surface of the remote command API consumed by registration and hot
/// reload. Descriptors are opaque JSON bodies; no retry or timeout policy
/// lives at this level.
#[async_trait]
pub trait CommandApi: Send + Sync {
    /// Replace the entire global command set, returning the authoritative
    /// list with assigned ids.
    async fn bulk_replace_global(&self, descriptors: Vec<Value>)
        -> anyhow::Result<Vec<RemoteCommand>>;

    /// Replace one guild's entire command set.
    async fn bulk_replace_guild(
        &self,
        guild_id: u64,
        descriptors: Vec<Value>,
    ) -> anyhow::Result<Vec<RemoteCommand>>;

    /// Patch a single global command's descriptor in place.
    async fn patch_global_command(&self, command_id: &str, descriptor: Value)
        -> anyhow::Result<()>;

    /// Patch a single guild command's descriptor in place.
    async fn patch_guild_command(
        &self,
        guild_id: u64,
        command_id: &str,
        descriptor: Value,
    ) -> anyhow::Result<()>;

    /// Apply per-command permissions within a guild.
    async fn set_permissions(
        &self,
        command_id: &str,
        guild_id: u64,
        permissions: Vec<Value>,
    ) -> anyhow::Result<()>;
}
