//! Discord adapters for the platform ports.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Everything serenity-specific lives here: the REST-backed command API,
//! the gateway adapter that classifies incoming events, and the responders
//! that carry one interaction's acknowledgment state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use serde_json::{json, Value};
use serenity::builder::{
    CreateApplicationCommand, CreateInteractionResponseData, EditInteractionResponse,
};
use serenity::http::Http;
use serenity::model::application::command::Command;
use serenity::model::application::component::ComponentType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::{
    Interaction as SerenityInteraction, InteractionResponseType,
};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::{Guild, Member, UnavailableGuild};
use serenity::model::id::GuildId;
use serenity::model::user::User;
use serenity::prelude::{Context, EventHandler as SerenityEventHandler};

use crate::bot::Bot;
use crate::core::response::ReplyPayload;
use crate::handlers::command::SlashData;
use crate::handlers::component::ComponentKind;
use crate::handlers::event::GatewayEvent;
use crate::platform::api::{CommandApi, RemoteCommand};
use crate::platform::interaction::{
    CommandInvocation, ComponentInvocation, Interaction, Responder,
};

/// REST-backed implementation of the command API.
pub struct HttpCommandApi {
    http: Arc<Http>,
}

impl HttpCommandApi {
    pub fn new(http: Arc<Http>) -> Self {
        HttpCommandApi { http }
    }
}

fn remote_command(command: Command) -> RemoteCommand {
    RemoteCommand {
        id: command.id.0.to_string(),
        name: command.name,
    }
}

#[async_trait]
impl CommandApi for HttpCommandApi {
    async fn bulk_replace_global(
        &self,
        descriptors: Vec<Value>,
    ) -> anyhow::Result<Vec<RemoteCommand>> {
        let commands = self
            .http
            .create_global_application_commands(&Value::Array(descriptors))
            .await?;
        Ok(commands.into_iter().map(remote_command).collect())
    }

    async fn bulk_replace_guild(
        &self,
        guild_id: u64,
        descriptors: Vec<Value>,
    ) -> anyhow::Result<Vec<RemoteCommand>> {
        let commands = self
            .http
            .create_guild_application_commands(guild_id, &Value::Array(descriptors))
            .await?;
        Ok(commands.into_iter().map(remote_command).collect())
    }

    async fn patch_global_command(
        &self,
        command_id: &str,
        descriptor: Value,
    ) -> anyhow::Result<()> {
        let command_id: u64 = command_id.parse()?;
        self.http
            .edit_global_application_command(command_id, &descriptor)
            .await?;
        Ok(())
    }

    async fn patch_guild_command(
        &self,
        guild_id: u64,
        command_id: &str,
        descriptor: Value,
    ) -> anyhow::Result<()> {
        let command_id: u64 = command_id.parse()?;
        self.http
            .edit_guild_application_command(guild_id, command_id, &descriptor)
            .await?;
        Ok(())
    }

    async fn set_permissions(
        &self,
        command_id: &str,
        guild_id: u64,
        permissions: Vec<Value>,
    ) -> anyhow::Result<()> {
        let command_id: u64 = command_id.parse()?;
        self.http
            .edit_guild_application_command_permissions(
                guild_id,
                command_id,
                &json!({ "permissions": permissions }),
            )
            .await?;
        Ok(())
    }
}

/// Response body keys passed through to the platform from a JSON payload.
fn known_response_key(key: &str) -> Option<&'static str> {
    const KEYS: &[&str] = &[
        "content",
        "embeds",
        "components",
        "flags",
        "tts",
        "allowed_mentions",
    ];
    KEYS.iter().copied().find(|&known| known == key)
}

fn fill_response_map(map: &mut HashMap<&'static str, Value>, payload: &ReplyPayload) {
    match payload {
        ReplyPayload::Text(content) => {
            map.insert("content", Value::String(content.clone()));
        }
        ReplyPayload::Json(body) => {
            if let Some(object) = body.as_object() {
                for (key, value) in object {
                    if let Some(key) = known_response_key(key) {
                        map.insert(key, value.clone());
                    }
                }
            }
        }
    }
}

fn apply_data<'a, 'b>(
    data: &'a mut CreateInteractionResponseData<'b>,
    payload: &ReplyPayload,
) -> &'a mut CreateInteractionResponseData<'b> {
    fill_response_map(&mut data.0, payload);
    data
}

fn apply_edit<'a>(
    edit: &'a mut EditInteractionResponse,
    payload: &ReplyPayload,
) -> &'a mut EditInteractionResponse {
    fill_response_map(&mut edit.0, payload);
    edit
}

/// Responder for a slash-command interaction.
pub struct CommandResponder {
    http: Arc<Http>,
    interaction: ApplicationCommandInteraction,
    deferred: AtomicBool,
    replied: AtomicBool,
}

impl CommandResponder {
    pub fn new(http: Arc<Http>, interaction: ApplicationCommandInteraction) -> Self {
        CommandResponder {
            http,
            interaction,
            deferred: AtomicBool::new(false),
            replied: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Responder for CommandResponder {
    async fn defer_reply(&self) -> anyhow::Result<()> {
        self.interaction.defer(&self.http).await?;
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn defer_update(&self) -> anyhow::Result<()> {
        // Commands have no message to hold back; a plain deferral is the
        // only acknowledgment available.
        self.defer_reply().await
    }

    async fn reply(&self, payload: &ReplyPayload) -> anyhow::Result<()> {
        if self.deferred.load(Ordering::SeqCst) {
            self.interaction
                .edit_original_interaction_response(&self.http, |response| {
                    apply_edit(response, payload)
                })
                .await?;
        } else {
            self.interaction
                .create_interaction_response(&self.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|data| apply_data(data, payload))
                })
                .await?;
        }
        self.replied.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, payload: &ReplyPayload) -> anyhow::Result<()> {
        self.reply(payload).await
    }

    fn replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }
}

/// Responder for a message-component interaction.
pub struct ComponentResponder {
    http: Arc<Http>,
    interaction: MessageComponentInteraction,
    deferred: AtomicBool,
    replied: AtomicBool,
}

impl ComponentResponder {
    pub fn new(http: Arc<Http>, interaction: MessageComponentInteraction) -> Self {
        ComponentResponder {
            http,
            interaction,
            deferred: AtomicBool::new(false),
            replied: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Responder for ComponentResponder {
    async fn defer_reply(&self) -> anyhow::Result<()> {
        self.interaction.defer(&self.http).await?;
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn defer_update(&self) -> anyhow::Result<()> {
        self.interaction
            .create_interaction_response(&self.http, |response| {
                response.kind(InteractionResponseType::DeferredUpdateMessage)
            })
            .await?;
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn reply(&self, payload: &ReplyPayload) -> anyhow::Result<()> {
        self.interaction
            .create_interaction_response(&self.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|data| apply_data(data, payload))
            })
            .await?;
        self.replied.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, payload: &ReplyPayload) -> anyhow::Result<()> {
        if self.deferred.load(Ordering::SeqCst) {
            self.interaction
                .edit_original_interaction_response(&self.http, |response| {
                    apply_edit(response, payload)
                })
                .await?;
        } else {
            self.interaction
                .create_interaction_response(&self.http, |response| {
                    response
                        .kind(InteractionResponseType::UpdateMessage)
                        .interaction_response_data(|data| apply_data(data, payload))
                })
                .await?;
        }
        self.replied.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }
}

fn options_to_value(options: &[CommandDataOption]) -> Value {
    Value::Array(
        options
            .iter()
            .map(|option| {
                json!({
                    "name": option.name,
                    "value": option.value.clone().unwrap_or(Value::Null),
                })
            })
            .collect(),
    )
}

/// Gateway adapter: classifies serenity events into the framework's
/// interaction and event model and feeds them to the bot.
pub struct DiscordGateway<D> {
    bot: Bot<D>,
}

impl<D> DiscordGateway<D> {
    pub fn new(bot: Bot<D>) -> Self {
        DiscordGateway { bot }
    }
}

#[async_trait]
impl<D: Send + Sync + 'static> SerenityEventHandler for DiscordGateway<D> {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "{} is connected to {} guilds",
            ready.user.name,
            ready.guilds.len()
        );

        let api = Arc::new(HttpCommandApi::new(Arc::clone(&ctx.http)));
        self.bot.register(api).await;

        self.bot
            .dispatch_event(&GatewayEvent::Ready {
                user_id: ready.user.id.0,
                username: ready.user.name.clone(),
                guild_count: ready.guilds.len(),
            })
            .await;
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, is_new: bool) {
        self.bot
            .dispatch_event(&GatewayEvent::GuildCreate {
                guild_id: guild.id.0,
                name: guild.name.clone(),
                is_new,
            })
            .await;
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        self.bot
            .dispatch_event(&GatewayEvent::GuildDelete {
                guild_id: incomplete.id.0,
            })
            .await;
    }

    async fn message(&self, _ctx: Context, message: Message) {
        self.bot
            .dispatch_event(&GatewayEvent::MessageCreate {
                channel_id: message.channel_id.0,
                author_id: message.author.id.0,
                content: message.content.clone(),
                from_bot: message.author.bot,
            })
            .await;
    }

    async fn guild_member_addition(&self, _ctx: Context, member: Member) {
        self.bot
            .dispatch_event(&GatewayEvent::GuildMemberAdd {
                guild_id: member.guild_id.0,
                user_id: member.user.id.0,
            })
            .await;
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        _member: Option<Member>,
    ) {
        self.bot
            .dispatch_event(&GatewayEvent::GuildMemberRemove {
                guild_id: guild_id.0,
                user_id: user.id.0,
            })
            .await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: SerenityInteraction) {
        match interaction {
            SerenityInteraction::ApplicationCommand(command) => {
                let invocation = CommandInvocation {
                    command_id: command.data.id.0.to_string(),
                    name: command.data.name.clone(),
                    user_id: command.user.id.0,
                    guild_id: command.guild_id.map(|id| id.0),
                    channel_id: Some(command.channel_id.0),
                    options: options_to_value(&command.data.options),
                };
                let responder = CommandResponder::new(Arc::clone(&ctx.http), command);
                self.bot
                    .dispatch(&Interaction::Command(invocation), &responder)
                    .await;
            }
            SerenityInteraction::MessageComponent(component) => {
                let kind = match component.data.component_type {
                    ComponentType::Button => ComponentKind::Button,
                    ComponentType::SelectMenu => ComponentKind::SelectMenu,
                    _ => return,
                };
                let invocation = ComponentInvocation {
                    custom_id: component.data.custom_id.clone(),
                    kind,
                    user_id: component.user.id.0,
                    guild_id: component.guild_id.map(|id| id.0),
                    channel_id: Some(component.channel_id.0),
                    values: component.data.values.clone(),
                };
                let responder = ComponentResponder::new(Arc::clone(&ctx.http), component);
                self.bot
                    .dispatch(&Interaction::Component(invocation), &responder)
                    .await;
            }
            _ => {}
        }
    }
}

/// Build a [`SlashData`] descriptor from a serenity command builder, for
/// handlers that prefer the builder API over raw JSON.
pub fn slash_data_from_builder(builder: CreateApplicationCommand) -> SlashData {
    let map = builder.0;
    let name = map
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let description = map
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut data = SlashData::new(name, description);
    if let Some(options) = map.get("options").and_then(Value::as_array) {
        for option in options {
            data = data.option(option.clone());
        }
    }
    if let Some(allow) = map.get("default_permission").and_then(Value::as_bool) {
        data = data.default_permission(allow);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_data_from_builder() {
        let mut builder = CreateApplicationCommand::default();
        builder
            .name("ping")
            .description("Ping the bot")
            .default_permission(false);

        let data = slash_data_from_builder(builder);
        assert_eq!(data.name(), "ping");

        let body = data.to_json();
        assert_eq!(body["description"], "Ping the bot");
        assert_eq!(body["default_permission"], Value::Bool(false));
    }

    #[test]
    fn test_fill_response_map_filters_unknown_keys() {
        let mut map = HashMap::new();
        fill_response_map(
            &mut map,
            &ReplyPayload::Json(json!({
                "content": "hello",
                "embeds": [],
                "internal_note": "never sent",
            })),
        );

        assert!(map.contains_key("content"));
        assert!(map.contains_key("embeds"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_fill_response_map_text() {
        let mut map = HashMap::new();
        fill_response_map(&mut map, &ReplyPayload::text("pong!"));
        assert_eq!(map.get("content"), Some(&Value::String("pong!".to_string())));
    }
}
