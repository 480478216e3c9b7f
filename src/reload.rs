//! Hot-reload coordination.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Change notifications from the watchers flow through one inbox into a
//! single task, which owns every registry mutation after startup. The
//! watch channel is at-least-once and unordered; the command registry's
//! debounce window is the only backpressure, so duplicate notifications
//! collapse into no-ops there.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::core::config::BotOptions;
use crate::core::error::Error;
use crate::handlers::command::{CommandHandler, CommandScope};
use crate::handlers::{Handler, HandlerVariant, Loaded};
use crate::loader::HandlerLoader;
use crate::platform::api::CommandApi;
use crate::platform::stream::GatewayEvents;
use crate::registries::commands::{apply_permissions, CommandRegistry};
use crate::registries::components::ComponentRegistry;
use crate::registries::events::EventRegistry;

/// A change notification for one handler unit.
#[derive(Debug, Clone)]
pub struct ReloadRequest {
    pub path: PathBuf,
    pub variant: HandlerVariant,
}

/// Single writer for all hot-reload registry mutations.
pub(crate) struct ReloadCoordinator<D> {
    pub loader: HandlerLoader<D>,
    pub options: BotOptions,
    pub commands: Arc<RwLock<CommandRegistry<D>>>,
    pub components: Arc<RwLock<ComponentRegistry<D>>>,
    pub events: Arc<RwLock<EventRegistry<D>>>,
    pub stream: Arc<GatewayEvents<D>>,
    pub api: Arc<RwLock<Option<Arc<dyn CommandApi>>>>,
}

impl<D: Send + Sync + 'static> ReloadCoordinator<D> {
    /// Drain the inbox until every sender is gone.
    pub fn spawn(self, mut rx: mpsc::UnboundedReceiver<ReloadRequest>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                self.handle(request).await;
            }
        })
    }

    async fn handle(&self, request: ReloadRequest) {
        debug!("change notification for {}", request.path.display());
        match request.variant {
            HandlerVariant::Command => self.reload_command(&request.path).await,
            HandlerVariant::Component => self.reload_component(&request.path).await,
            HandlerVariant::Event => self.reload_event(&request.path).await,
        }
    }

    async fn reload_command(&self, path: &Path) {
        let Some(Handler::Command(handler)) =
            self.loader.load_unit(path, HandlerVariant::Command)
        else {
            return;
        };
        let name = handler.slash_data().name().to_string();
        let scope = handler.scope().clone();
        let unit = Loaded::new(Arc::clone(&handler));

        let replaced = {
            let mut commands = self.commands.write().await;
            let Some(remote_id) = commands.find_update_slot(&name, &scope) else {
                debug!("reloaded command {name:?} has no bound remote id; skipping");
                return;
            };
            commands.apply_update(&remote_id, unit).then_some(remote_id)
        };
        let Some(remote_id) = replaced else {
            return;
        };

        info!("command {name} reloaded");
        self.push_command(&remote_id, handler.as_ref()).await;
    }

    /// Patch the reloaded command's descriptor remotely and re-apply its
    /// permissions, per covered guild.
    async fn push_command(&self, remote_id: &str, handler: &dyn CommandHandler<D>) {
        let api = self.api.read().await.clone();
        let Some(api) = api else {
            warn!(
                "command {} reloaded before registration; remote patch skipped",
                handler.slash_data().name()
            );
            return;
        };

        let name = handler.slash_data().name();
        let descriptor = handler.slash_data().to_json();
        match handler.scope() {
            CommandScope::Global => {
                if let Err(e) = api.patch_global_command(remote_id, descriptor).await {
                    error!(
                        "{}",
                        Error::Registration {
                            scope: format!("global command {name}"),
                            source: e,
                        }
                    );
                    return;
                }
                info!("global command {name} re-registered");
                if let Some(home_guild) = self.options.home_guild_id {
                    apply_permissions(
                        api.as_ref(),
                        remote_id,
                        home_guild,
                        name,
                        handler.permissions(),
                    )
                    .await;
                }
            }
            CommandScope::Guild(guild_ids) => {
                for &guild_id in guild_ids {
                    match api
                        .patch_guild_command(guild_id, remote_id, descriptor.clone())
                        .await
                    {
                        Ok(()) => {
                            info!("command {name} re-registered in guild {guild_id}");
                            apply_permissions(
                                api.as_ref(),
                                remote_id,
                                guild_id,
                                name,
                                handler.permissions(),
                            )
                            .await;
                        }
                        Err(e) => error!(
                            "{}",
                            Error::Registration {
                                scope: format!("command {name} in guild {guild_id}"),
                                source: e,
                            }
                        ),
                    }
                }
            }
        }
    }

    async fn reload_component(&self, path: &Path) {
        let Some(Handler::Component(handler)) =
            self.loader.load_unit(path, HandlerVariant::Component)
        else {
            return;
        };
        self.components.write().await.apply_update(Loaded::new(handler));
    }

    async fn reload_event(&self, path: &Path) {
        let Some(Handler::Event(handler)) = self.loader.load_unit(path, HandlerVariant::Event)
        else {
            return;
        };
        let mut events = self.events.write().await;
        events.apply_update(Loaded::new(handler), self.stream.as_ref());
    }
}
