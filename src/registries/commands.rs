//! Command handler registry and the remote registration protocol.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Commands live in two phases. After a directory load they sit in
//! per-scope pending buckets, keyed only by declared name. `register`
//! bulk-replaces the remote command sets and binds each handler under the
//! remote id the API assigned to its name; from then on dispatch resolves
//! by id. Hot reload replaces bound slots in place, debounced against the
//! replaced entry's creation stamp.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::core::error::Error;
use crate::handlers::command::{CommandPermission, CommandScope};
use crate::handlers::LoadedCommand;
use crate::platform::api::CommandApi;

/// Debounce window between hot-reload replacements of one slot. A single
/// file save can emit several change notifications in quick succession;
/// re-registering on each would race the remote API.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Global and guild command handlers, keyed by remote id once registered.
pub struct CommandRegistry<D> {
    pub(crate) pending_global: Vec<LoadedCommand<D>>,
    pub(crate) pending_guild: Vec<LoadedCommand<D>>,
    pub(crate) global: HashMap<String, LoadedCommand<D>>,
    pub(crate) guild: HashMap<String, LoadedCommand<D>>,
}

impl<D> Default for CommandRegistry<D> {
    fn default() -> Self {
        CommandRegistry {
            pending_global: Vec::new(),
            pending_guild: Vec::new(),
            global: HashMap::new(),
            guild: HashMap::new(),
        }
    }
}

impl<D> CommandRegistry<D> {
    pub fn new() -> Self {
        CommandRegistry::default()
    }

    /// Clear everything and bucket the incoming handlers by scope. Names
    /// must be unique within a scope; a duplicate replaces the earlier
    /// definition with a warning.
    pub fn populate(&mut self, units: Vec<LoadedCommand<D>>) {
        self.pending_global.clear();
        self.pending_guild.clear();
        self.global.clear();
        self.guild.clear();

        for unit in units {
            let bucket = if unit.handler.scope().is_global() {
                &mut self.pending_global
            } else {
                &mut self.pending_guild
            };
            let name = unit.handler.slash_data().name().to_string();
            if let Some(existing) = bucket
                .iter_mut()
                .find(|u| u.handler.slash_data().name() == name)
            {
                warn!("duplicate command name {name:?} in scope; keeping the later definition");
                *existing = unit;
            } else {
                bucket.push(unit);
            }
        }
    }

    /// Run the two registration phases against the remote API.
    ///
    /// The global phase bulk-replaces the global command set; the guild
    /// phase bulk-replaces each referenced guild's set with exactly the
    /// handlers covering that guild. The phases, and each guild within the
    /// guild phase, fail independently: an error is reported for its scope
    /// and the rest proceed. Permissions of global commands need a guild
    /// context, so they are applied against `home_guild_id` when one is
    /// configured.
    pub async fn register(&mut self, api: &dyn CommandApi, home_guild_id: Option<u64>) {
        self.global.clear();
        self.guild.clear();

        let descriptors: Vec<_> = self
            .pending_global
            .iter()
            .map(|unit| unit.handler.slash_data().to_json())
            .collect();
        match api.bulk_replace_global(descriptors).await {
            Ok(response) => {
                info!("{} global commands registered", response.len());
                for remote in response {
                    let Some(unit) = self
                        .pending_global
                        .iter()
                        .find(|u| u.handler.slash_data().name() == remote.name)
                    else {
                        warn!("remote returned unknown global command {:?}", remote.name);
                        continue;
                    };
                    let unit = unit.clone();
                    self.global.insert(remote.id.clone(), unit.clone());
                    if let Some(home_guild) = home_guild_id {
                        apply_permissions(
                            api,
                            &remote.id,
                            home_guild,
                            &remote.name,
                            unit.handler.permissions(),
                        )
                        .await;
                    }
                }
            }
            Err(e) => error!(
                "{}",
                Error::Registration {
                    scope: "global commands".to_string(),
                    source: e,
                }
            ),
        }

        for guild_id in self.referenced_guild_ids() {
            let covering: Vec<_> = self
                .pending_guild
                .iter()
                .filter(|u| u.handler.scope().covers(guild_id))
                .cloned()
                .collect();
            if covering.is_empty() {
                continue;
            }
            let descriptors: Vec<_> = covering
                .iter()
                .map(|unit| unit.handler.slash_data().to_json())
                .collect();
            match api.bulk_replace_guild(guild_id, descriptors).await {
                Ok(response) => {
                    info!(
                        "{} commands registered for guild {guild_id}",
                        response.len()
                    );
                    for remote in response {
                        let Some(unit) = covering
                            .iter()
                            .find(|u| u.handler.slash_data().name() == remote.name)
                        else {
                            warn!(
                                "remote returned unknown command {:?} for guild {guild_id}",
                                remote.name
                            );
                            continue;
                        };
                        self.guild.insert(remote.id.clone(), unit.clone());
                        apply_permissions(
                            api,
                            &remote.id,
                            guild_id,
                            &remote.name,
                            unit.handler.permissions(),
                        )
                        .await;
                    }
                }
                Err(e) => error!(
                    "{}",
                    Error::Registration {
                        scope: format!("guild {guild_id}"),
                        source: e,
                    }
                ),
            }
        }
    }

    /// Distinct guild ids referenced by any pending guild handler, in
    /// first-seen order.
    fn referenced_guild_ids(&self) -> Vec<u64> {
        let mut guild_ids = Vec::new();
        for unit in &self.pending_guild {
            for &guild_id in unit.handler.scope().guild_ids() {
                if !guild_ids.contains(&guild_id) {
                    guild_ids.push(guild_id);
                }
            }
        }
        guild_ids
    }

    /// Remote id of the bound command matching a reloaded handler's name,
    /// within its scope bucket.
    pub fn find_update_slot(&self, name: &str, scope: &CommandScope) -> Option<String> {
        let map = if scope.is_global() {
            &self.global
        } else {
            &self.guild
        };
        map.iter()
            .find(|(_, unit)| unit.handler.slash_data().name() == name)
            .map(|(remote_id, _)| remote_id.clone())
    }

    /// Hot-reload replacement of one bound slot. Returns false when the id
    /// is unknown or the previous entry is younger than
    /// [`RELOAD_DEBOUNCE`]; later duplicate notifications are plain no-ops.
    pub fn apply_update(&mut self, remote_id: &str, unit: LoadedCommand<D>) -> bool {
        let map = if unit.handler.scope().is_global() {
            &mut self.global
        } else {
            &mut self.guild
        };
        let Some(previous) = map.get(remote_id) else {
            return false;
        };
        if previous.created_at.elapsed() < RELOAD_DEBOUNCE {
            debug!("update for command id {remote_id} arrived inside the debounce window");
            return false;
        }
        map.insert(remote_id.to_string(), unit);
        true
    }

    /// Dispatch lookup by remote id: guild commands first, then global.
    pub fn resolve(&self, remote_id: &str) -> Option<&LoadedCommand<D>> {
        self.guild
            .get(remote_id)
            .or_else(|| self.global.get(remote_id))
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, age: Duration) {
        for unit in self.global.values_mut().chain(self.guild.values_mut()) {
            unit.created_at = std::time::Instant::now() - age;
        }
    }
}

/// Apply one command's permission rows within a guild. Empty rows are a
/// no-op; a failed call is reported and does not block siblings.
pub(crate) async fn apply_permissions(
    api: &dyn CommandApi,
    command_id: &str,
    guild_id: u64,
    name: &str,
    permissions: &[CommandPermission],
) {
    if permissions.is_empty() {
        return;
    }
    let rows = permissions.iter().map(CommandPermission::to_json).collect();
    match api.set_permissions(command_id, guild_id, rows).await {
        Ok(()) => info!("permissions for command {name} set in guild {guild_id}"),
        Err(e) => error!(
            "{}",
            Error::Registration {
                scope: format!("permissions for {name} in guild {guild_id}"),
                source: e,
            }
        ),
    }
}
