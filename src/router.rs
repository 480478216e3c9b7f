//! Interaction routing.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Each incoming interaction runs through one pass of classify → resolve →
//! (defer?) → execute → respond. Failures are contained per interaction:
//! a failing handler gets the configured error payload sent in its place,
//! a failing send is reported, and nothing propagates far enough to take
//! the process down.

use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::RwLock;

use crate::core::config::BotOptions;
use crate::core::error::Error;
use crate::core::response::ReplyPayload;
use crate::handlers::command::{CommandHandler, ComponentEntry};
use crate::platform::interaction::{
    CommandInvocation, ComponentInvocation, Interaction, Responder,
};
use crate::registries::commands::CommandRegistry;
use crate::registries::components::ComponentRegistry;
use crate::registries::resolver::resolve_owner;

/// Routes classified interactions to their handlers.
///
/// Holds only read sides of the registries; distinct interactions dispatch
/// concurrently, and registry writes stay with the load and reload paths.
pub struct InteractionRouter<D> {
    data: Arc<D>,
    options: BotOptions,
    commands: Arc<RwLock<CommandRegistry<D>>>,
    components: Arc<RwLock<ComponentRegistry<D>>>,
}

impl<D: Send + Sync> InteractionRouter<D> {
    pub fn new(
        data: Arc<D>,
        options: BotOptions,
        commands: Arc<RwLock<CommandRegistry<D>>>,
        components: Arc<RwLock<ComponentRegistry<D>>>,
    ) -> Self {
        InteractionRouter {
            data,
            options,
            commands,
            components,
        }
    }

    /// Route one interaction to completion. Never fails; everything that
    /// can go wrong is reported here.
    pub async fn dispatch(&self, interaction: &Interaction, responder: &dyn Responder) {
        match interaction {
            Interaction::Command(int) => self.dispatch_command(int, responder).await,
            Interaction::Component(int) => self.dispatch_component(int, responder).await,
            Interaction::Other => {}
        }
    }

    async fn dispatch_command(&self, int: &CommandInvocation, responder: &dyn Responder) {
        debug!("command interaction: {} (id {})", int.name, int.command_id);

        let handler = {
            let commands = self.commands.read().await;
            commands
                .resolve(&int.command_id)
                .map(|unit| Arc::clone(&unit.handler))
        };
        let Some(handler) = handler else {
            // The platform has no record of this command on our side, so
            // there is nothing sensible to answer with.
            error!(
                "{}",
                Error::Resolution {
                    id: int.command_id.clone(),
                    name: int.name.clone(),
                }
            );
            return;
        };

        if handler.long_running() {
            if let Err(e) = responder.defer_reply().await {
                error!("deferring command {}: {}", int.name, Error::Delivery(e));
            }
        }

        let response = match handler.run(&self.data, int, responder).await {
            Ok(Some(payload)) => Some(payload),
            Ok(None) => self.options.default_response.clone(),
            Err(e) => {
                error!("command {}: {}", int.name, Error::Execution(e));
                self.options.error_response.clone()
            }
        };

        match response {
            Some(payload) if !responder.replied() => {
                if let Err(e) = responder.reply(&payload).await {
                    error!("replying to command {}: {}", int.name, Error::Delivery(e));
                }
            }
            Some(_) => {
                debug!("command {} already replied; no fallback needed", int.name);
            }
            None => {
                if !responder.replied() {
                    error!(
                        "command {} did not reply and no default response is configured",
                        int.name
                    );
                }
            }
        }
    }

    async fn dispatch_component(&self, int: &ComponentInvocation, responder: &dyn Responder) {
        debug!("component interaction: {}", int.custom_id);

        if let Some((token, suffix)) = split_custom_id(&int.custom_id, &self.options.custom_id_splitter)
        {
            let owner = {
                let commands = self.commands.read().await;
                resolve_owner(&commands, token).map(|unit| Arc::clone(&unit.handler))
            };
            if let Some(command) = owner {
                self.dispatch_delegated(command, suffix, int, responder).await;
                return;
            }
        }

        self.dispatch_flat(int, responder).await;
    }

    /// A command owns this component family; route through its delegation
    /// table. A missing entry means the component expired or belongs to
    /// nobody anymore, which is a deliberate no-op.
    async fn dispatch_delegated(
        &self,
        command: Arc<dyn CommandHandler<D>>,
        suffix: &str,
        int: &ComponentInvocation,
        responder: &dyn Responder,
    ) {
        let name = command.slash_data().name().to_string();
        let entry: Option<ComponentEntry<D>> = command
            .components()
            .and_then(|map| map.resolve(int.kind, suffix))
            .cloned();
        let Some(entry) = entry else {
            debug!(
                "command {name} has no {} handler for suffix {suffix:?}; dropping",
                int.kind
            );
            return;
        };

        debug!("component {} delegated to command {name}", int.custom_id);

        if entry.long_running {
            if let Err(e) = responder.defer_update().await {
                error!(
                    "deferring component {}: {}",
                    int.custom_id,
                    Error::Delivery(e)
                );
            }
        }

        let response = match entry.action.run(&self.data, int, responder).await {
            Ok(payload) => payload,
            Err(e) => {
                error!("component {}: {}", int.custom_id, Error::Execution(e));
                self.options.error_response.clone()
            }
        };

        self.finish_component(response, int, responder).await;
    }

    /// Flat registry path: the full custom id is the key. Unresolved
    /// components are dropped silently; expired or foreign components are
    /// an expected steady-state condition.
    async fn dispatch_flat(&self, int: &ComponentInvocation, responder: &dyn Responder) {
        let handler = {
            let components = self.components.read().await;
            components
                .resolve(int.kind, &int.custom_id)
                .map(|unit| Arc::clone(&unit.handler))
        };
        let Some(handler) = handler else {
            debug!("no handler for component {}; dropping", int.custom_id);
            return;
        };

        if handler.long_running() {
            if let Err(e) = responder.defer_update().await {
                error!(
                    "deferring component {}: {}",
                    int.custom_id,
                    Error::Delivery(e)
                );
            }
        }

        let response = match handler.run(&self.data, int, responder).await {
            Ok(Some(payload)) => Some(payload),
            Ok(None) => self.options.default_update.clone(),
            Err(e) => {
                error!("component {}: {}", int.custom_id, Error::Execution(e));
                self.options.error_response.clone()
            }
        };

        self.finish_component(response, int, responder).await;
    }

    async fn finish_component(
        &self,
        response: Option<ReplyPayload>,
        int: &ComponentInvocation,
        responder: &dyn Responder,
    ) {
        match response {
            Some(payload) => {
                if let Err(e) = responder.update(&payload).await {
                    error!(
                        "updating component {}: {}",
                        int.custom_id,
                        Error::Delivery(e)
                    );
                }
            }
            None => warn!(
                "component {} produced no update and no default update is configured; \
                 message updated in the handler?",
                int.custom_id
            ),
        }
    }
}

/// Split a custom id into owner token and suffix at the first splitter
/// occurrence.
fn split_custom_id<'a>(custom_id: &'a str, splitter: &str) -> Option<(&'a str, &'a str)> {
    if splitter.is_empty() {
        return None;
    }
    custom_id.split_once(splitter)
}
