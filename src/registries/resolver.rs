//! Owner resolution for dynamically delegated components.

use crate::handlers::LoadedCommand;
use crate::registries::commands::CommandRegistry;

/// Resolve the owner token of a dynamic component custom id against the
/// command registry.
///
/// The token may be a remote command id or a declared name. Strategy
/// order: guild commands by id, global commands by id, guild commands by
/// name, global commands by name. Name lookups also cover commands loaded
/// but not yet bound to a remote id.
pub fn resolve_owner<'a, D>(
    registry: &'a CommandRegistry<D>,
    token: &str,
) -> Option<&'a LoadedCommand<D>> {
    registry
        .guild
        .get(token)
        .or_else(|| registry.global.get(token))
        .or_else(|| {
            by_name(
                registry.guild.values().chain(registry.pending_guild.iter()),
                token,
            )
        })
        .or_else(|| {
            by_name(
                registry
                    .global
                    .values()
                    .chain(registry.pending_global.iter()),
                token,
            )
        })
}

fn by_name<'a, D>(
    mut units: impl Iterator<Item = &'a LoadedCommand<D>>,
    name: &str,
) -> Option<&'a LoadedCommand<D>> {
    units.find(|unit| unit.handler.slash_data().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::response::ReplyPayload;
    use crate::handlers::command::{CommandHandler, CommandScope, SlashData};
    use crate::handlers::Loaded;
    use crate::platform::api::{CommandApi, RemoteCommand};
    use crate::platform::interaction::{CommandInvocation, Responder};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct NamedCommand {
        slash_data: SlashData,
        scope: CommandScope,
    }

    #[async_trait]
    impl CommandHandler<()> for NamedCommand {
        fn slash_data(&self) -> &SlashData {
            &self.slash_data
        }

        fn scope(&self) -> &CommandScope {
            &self.scope
        }

        async fn run(
            &self,
            _data: &(),
            _interaction: &CommandInvocation,
            _responder: &dyn Responder,
        ) -> anyhow::Result<Option<ReplyPayload>> {
            Ok(None)
        }
    }

    fn command(name: &str, scope: CommandScope) -> LoadedCommand<()> {
        Loaded::new(Arc::new(NamedCommand {
            slash_data: SlashData::new(name, format!("{name} command")),
            scope,
        }))
    }

    struct EchoApi;

    #[async_trait]
    impl CommandApi for EchoApi {
        async fn bulk_replace_global(
            &self,
            descriptors: Vec<Value>,
        ) -> anyhow::Result<Vec<RemoteCommand>> {
            Ok(descriptors
                .iter()
                .map(|d| RemoteCommand {
                    id: format!("g-{}", d["name"].as_str().unwrap_or_default()),
                    name: d["name"].as_str().unwrap_or_default().to_string(),
                })
                .collect())
        }

        async fn bulk_replace_guild(
            &self,
            guild_id: u64,
            descriptors: Vec<Value>,
        ) -> anyhow::Result<Vec<RemoteCommand>> {
            Ok(descriptors
                .iter()
                .map(|d| RemoteCommand {
                    id: format!("{guild_id}-{}", d["name"].as_str().unwrap_or_default()),
                    name: d["name"].as_str().unwrap_or_default().to_string(),
                })
                .collect())
        }

        async fn patch_global_command(
            &self,
            _command_id: &str,
            _descriptor: Value,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn patch_guild_command(
            &self,
            _guild_id: u64,
            _command_id: &str,
            _descriptor: Value,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn set_permissions(
            &self,
            _command_id: &str,
            _guild_id: u64,
            _permissions: Vec<Value>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    async fn registered_registry() -> CommandRegistry<()> {
        let mut registry = CommandRegistry::new();
        registry.populate(vec![
            command("ping", CommandScope::Global),
            command("admin", CommandScope::guild(1)),
        ]);
        registry.register(&EchoApi, None).await;
        registry
    }

    #[tokio::test]
    async fn test_resolves_by_remote_id() {
        let registry = registered_registry().await;

        let by_guild_id = resolve_owner(&registry, "1-admin").unwrap();
        assert_eq!(by_guild_id.handler.slash_data().name(), "admin");

        let by_global_id = resolve_owner(&registry, "g-ping").unwrap();
        assert_eq!(by_global_id.handler.slash_data().name(), "ping");
    }

    #[tokio::test]
    async fn test_resolves_by_declared_name() {
        let registry = registered_registry().await;

        let owner = resolve_owner(&registry, "ping").unwrap();
        assert_eq!(owner.handler.slash_data().name(), "ping");
    }

    #[tokio::test]
    async fn test_guild_commands_win_over_global_on_name() {
        let mut registry = CommandRegistry::new();
        registry.populate(vec![
            command("shared", CommandScope::Global),
            command("shared", CommandScope::guild(1)),
        ]);
        registry.register(&EchoApi, None).await;

        let owner = resolve_owner(&registry, "shared").unwrap();
        assert!(!owner.handler.scope().is_global());
    }

    #[test]
    fn test_resolves_pending_commands_by_name() {
        let mut registry = CommandRegistry::new();
        registry.populate(vec![command("ping", CommandScope::Global)]);

        // No registration has happened, so only the name is known.
        assert!(resolve_owner(&registry, "ping").is_some());
        assert!(resolve_owner(&registry, "g-ping").is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_resolves_to_none() {
        let registry = registered_registry().await;
        assert!(resolve_owner(&registry, "nonexistent").is_none());
    }
}
