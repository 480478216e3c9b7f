use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use dotenvy::dotenv;
use log::info;
use serde_json::json;
use serenity::prelude::GatewayIntents;

use switchboard::{
    Bot, BotOptions, CommandHandler, CommandInvocation, CommandPermission, CommandScope,
    ComponentAction, ComponentEntry, ComponentHandler, ComponentInvocation, ComponentKind,
    ComponentMap, DiscordGateway, EventHandler, EventType, FactoryContext, FactoryRegistry,
    GatewayEvent, Handler, ReplyPayload, Responder, SlashData,
};

/// Shared state handed to every handler.
struct AppData {
    started_at: Instant,
}

// ---------------------------------------------------------------------------
// /ping - global command with a permission row and a dynamic button
// ---------------------------------------------------------------------------

struct PingCommand {
    slash_data: SlashData,
    scope: CommandScope,
    permissions: Vec<CommandPermission>,
    components: ComponentMap<AppData>,
}

struct PingAgainButton;

#[async_trait]
impl ComponentAction<AppData> for PingAgainButton {
    async fn run(
        &self,
        data: &AppData,
        _interaction: &ComponentInvocation,
        _responder: &dyn Responder,
    ) -> Result<Option<ReplyPayload>> {
        let uptime = data.started_at.elapsed().as_secs();
        Ok(Some(ReplyPayload::text(format!(
            "pong again! (up {uptime}s)"
        ))))
    }
}

#[async_trait]
impl CommandHandler<AppData> for PingCommand {
    fn slash_data(&self) -> &SlashData {
        &self.slash_data
    }

    fn scope(&self) -> &CommandScope {
        &self.scope
    }

    fn permissions(&self) -> &[CommandPermission] {
        &self.permissions
    }

    async fn run(
        &self,
        _data: &AppData,
        _interaction: &CommandInvocation,
        _responder: &dyn Responder,
    ) -> Result<Option<ReplyPayload>> {
        Ok(Some(ReplyPayload::Json(json!({
            "content": "pong!",
            "components": [{
                "type": 1,
                "components": [{
                    "type": 2,
                    "style": 1,
                    "label": "Again",
                    "custom_id": "ping:Again",
                }],
            }],
        }))))
    }

    fn components(&self) -> Option<&ComponentMap<AppData>> {
        Some(&self.components)
    }
}

fn ping_factory(ctx: &FactoryContext<'_, AppData>) -> Result<Handler<AppData>> {
    let mut permissions = Vec::new();
    if let Some(user_id) = ctx
        .params
        .get("allow_user")
        .and_then(serde_yaml::Value::as_u64)
    {
        permissions.push(CommandPermission::user(user_id, true));
    }

    let slash_data = if permissions.is_empty() {
        SlashData::new("ping", "ping pong!")
    } else {
        SlashData::new("ping", "EXCLUSIVE ping pong!").default_permission(false)
    };

    Ok(Handler::Command(Arc::new(PingCommand {
        slash_data,
        scope: CommandScope::Global,
        permissions,
        components: ComponentMap::new()
            .on_button("Again", ComponentEntry::new(Arc::new(PingAgainButton), false)),
    })))
}

// ---------------------------------------------------------------------------
// /colour - global command with choice options
// ---------------------------------------------------------------------------

struct ColourCommand {
    slash_data: SlashData,
    scope: CommandScope,
}

#[async_trait]
impl CommandHandler<AppData> for ColourCommand {
    fn slash_data(&self) -> &SlashData {
        &self.slash_data
    }

    fn scope(&self) -> &CommandScope {
        &self.scope
    }

    async fn run(
        &self,
        _data: &AppData,
        interaction: &CommandInvocation,
        _responder: &dyn Responder,
    ) -> Result<Option<ReplyPayload>> {
        let colour = interaction
            .str_option("colour")
            .context("colour option is required")?;
        let reply = match interaction.int_option("index") {
            Some(index) => format!("Your number {index} favourite colour is {colour}!"),
            None => format!("You said your favourite colour is {colour}!"),
        };
        Ok(Some(ReplyPayload::text(reply)))
    }
}

fn colour_factory(_ctx: &FactoryContext<'_, AppData>) -> Result<Handler<AppData>> {
    let choices: Vec<_> = ["Red", "Yellow", "Green", "Blue"]
        .iter()
        .map(|name| json!({ "name": name, "value": name.to_uppercase() }))
        .collect();
    let slash_data = SlashData::new("colour", "Tell the bot your favourite colour!")
        .option(json!({
            "type": 3,
            "name": "colour",
            "description": "Your favourite colour",
            "required": true,
            "choices": choices,
        }))
        .option(json!({
            "type": 4,
            "name": "index",
            "description": "Which favourite colour it is",
            "required": false,
        }));

    Ok(Handler::Command(Arc::new(ColourCommand {
        slash_data,
        scope: CommandScope::Global,
    })))
}

// ---------------------------------------------------------------------------
// palette - standalone select menu component
// ---------------------------------------------------------------------------

struct PaletteSelect;

#[async_trait]
impl ComponentHandler<AppData> for PaletteSelect {
    fn custom_id(&self) -> &str {
        "palette"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::SelectMenu
    }

    async fn run(
        &self,
        _data: &AppData,
        interaction: &ComponentInvocation,
        _responder: &dyn Responder,
    ) -> Result<Option<ReplyPayload>> {
        let picked = interaction.values.join(", ");
        Ok(Some(ReplyPayload::text(format!("Palette set to {picked}"))))
    }
}

fn palette_factory(_ctx: &FactoryContext<'_, AppData>) -> Result<Handler<AppData>> {
    Ok(Handler::Component(Arc::new(PaletteSelect)))
}

// ---------------------------------------------------------------------------
// guild join greeting event
// ---------------------------------------------------------------------------

struct JoinGuildHandler;

#[async_trait]
impl EventHandler<AppData> for JoinGuildHandler {
    fn event_type(&self) -> EventType {
        EventType::GuildCreate
    }

    async fn handle(&self, _data: &AppData, event: &GatewayEvent) -> Result<()> {
        if let GatewayEvent::GuildCreate { name, is_new, .. } = event {
            if *is_new {
                info!("joined new guild {name}; hello world!");
            }
        }
        Ok(())
    }
}

fn join_guild_factory(_ctx: &FactoryContext<'_, AppData>) -> Result<Handler<AppData>> {
    Ok(Handler::Event(Arc::new(JoinGuildHandler)))
}

// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let token = std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;
    let options = BotOptions {
        error_response: Some(ReplyPayload::text(
            "Sorry, something went wrong handling that.",
        )),
        ..BotOptions::from_env()
    };

    let mut factories = FactoryRegistry::new();
    factories.register("ping", ping_factory);
    factories.register("colour", colour_factory);
    factories.register("palette", palette_factory);
    factories.register("join_guild", join_guild_factory);

    let data = Arc::new(AppData {
        started_at: Instant::now(),
    });
    let bot = Bot::new(options, data, factories);

    bot.load_commands("units/commands").await;
    bot.load_components("units/components").await;
    bot.load_events("units/events").await;
    bot.begin_dispatch();

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;
    let mut client = serenity::Client::builder(&token, intents)
        .event_handler(DiscordGateway::new(bot))
        .await
        .context("failed to build the gateway client")?;

    client.start().await.context("gateway connection failed")?;
    Ok(())
}
