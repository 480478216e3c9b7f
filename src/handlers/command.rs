//! Slash command handlers and dynamic component delegation.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::response::ReplyPayload;
use crate::handlers::component::ComponentKind;
use crate::platform::interaction::{CommandInvocation, ComponentInvocation, Responder};

/// Where a command is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandScope {
    /// Registered platform-wide.
    Global,
    /// Registered in each listed guild.
    Guild(Vec<u64>),
}

impl CommandScope {
    /// Scope covering a single guild.
    pub fn guild(guild_id: u64) -> Self {
        CommandScope::Guild(vec![guild_id])
    }

    pub fn is_global(&self) -> bool {
        matches!(self, CommandScope::Global)
    }

    /// Guild ids this scope covers; empty for global commands.
    pub fn guild_ids(&self) -> &[u64] {
        match self {
            CommandScope::Global => &[],
            CommandScope::Guild(ids) => ids,
        }
    }

    pub fn covers(&self, guild_id: u64) -> bool {
        self.guild_ids().contains(&guild_id)
    }
}

/// Principal a permission row applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionTarget {
    Role,
    User,
}

/// One principal/kind/allow permission row for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPermission {
    pub id: u64,
    pub kind: PermissionTarget,
    pub allow: bool,
}

impl CommandPermission {
    pub fn role(id: u64, allow: bool) -> Self {
        CommandPermission {
            id,
            kind: PermissionTarget::Role,
            allow,
        }
    }

    pub fn user(id: u64, allow: bool) -> Self {
        CommandPermission {
            id,
            kind: PermissionTarget::User,
            allow,
        }
    }

    /// Wire form of the row.
    pub fn to_json(&self) -> Value {
        let kind = match self.kind {
            PermissionTarget::Role => 1,
            PermissionTarget::User => 2,
        };
        json!({
            "id": self.id.to_string(),
            "type": kind,
            "permission": self.allow,
        })
    }
}

/// Immutable slash-command descriptor: a declared name plus the JSON body
/// sent to the remote API verbatim.
#[derive(Debug, Clone)]
pub struct SlashData {
    name: String,
    description: String,
    options: Vec<Value>,
    default_permission: Option<bool>,
}

impl SlashData {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        SlashData {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            default_permission: None,
        }
    }

    /// Append one raw option body.
    pub fn option(mut self, option: Value) -> Self {
        self.options.push(option);
        self
    }

    /// Whether the command is usable before explicit permissions are
    /// applied.
    pub fn default_permission(mut self, allow: bool) -> Self {
        self.default_permission = Some(allow);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialized descriptor for the remote API.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "description": self.description,
            "options": self.options,
        });
        if let Some(allow) = self.default_permission {
            body["default_permission"] = Value::Bool(allow);
        }
        body
    }
}

/// Callback a command registers for one family of its dynamic components.
#[async_trait]
pub trait ComponentAction<D>: Send + Sync {
    async fn run(
        &self,
        data: &D,
        interaction: &ComponentInvocation,
        responder: &dyn Responder,
    ) -> anyhow::Result<Option<ReplyPayload>>;
}

/// One delegated component binding: the callback plus its deferral policy.
pub struct ComponentEntry<D> {
    pub action: Arc<dyn ComponentAction<D>>,
    pub long_running: bool,
}

impl<D> ComponentEntry<D> {
    pub fn new(action: Arc<dyn ComponentAction<D>>, long_running: bool) -> Self {
        ComponentEntry {
            action,
            long_running,
        }
    }
}

impl<D> Clone for ComponentEntry<D> {
    fn clone(&self) -> Self {
        ComponentEntry {
            action: Arc::clone(&self.action),
            long_running: self.long_running,
        }
    }
}

/// Ordered table mapping custom-id suffixes to delegated callbacks.
///
/// Commands that own dynamically generated components fill one of these at
/// construction time: one entry per suffix, plus an optional per-kind
/// catch-all consulted when no suffix matches.
pub struct ComponentMap<D> {
    buttons: Vec<(String, ComponentEntry<D>)>,
    select_menus: Vec<(String, ComponentEntry<D>)>,
    any_button: Option<ComponentEntry<D>>,
    any_select_menu: Option<ComponentEntry<D>>,
}

impl<D> Default for ComponentMap<D> {
    fn default() -> Self {
        ComponentMap {
            buttons: Vec::new(),
            select_menus: Vec::new(),
            any_button: None,
            any_select_menu: None,
        }
    }
}

impl<D> ComponentMap<D> {
    pub fn new() -> Self {
        ComponentMap::default()
    }

    pub fn on_button(
        mut self,
        suffix: impl Into<String>,
        entry: ComponentEntry<D>,
    ) -> Self {
        self.buttons.push((suffix.into(), entry));
        self
    }

    pub fn on_select_menu(
        mut self,
        suffix: impl Into<String>,
        entry: ComponentEntry<D>,
    ) -> Self {
        self.select_menus.push((suffix.into(), entry));
        self
    }

    /// Catch-all for button suffixes without a dedicated entry.
    pub fn any_button(mut self, entry: ComponentEntry<D>) -> Self {
        self.any_button = Some(entry);
        self
    }

    /// Catch-all for select-menu suffixes without a dedicated entry.
    pub fn any_select_menu(mut self, entry: ComponentEntry<D>) -> Self {
        self.any_select_menu = Some(entry);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
            && self.select_menus.is_empty()
            && self.any_button.is_none()
            && self.any_select_menu.is_none()
    }

    /// Entry for a suffix: the exact match first, then the per-kind
    /// catch-all. `None` means this command does not own the component.
    pub fn resolve(&self, kind: ComponentKind, suffix: &str) -> Option<&ComponentEntry<D>> {
        let (entries, any) = match kind {
            ComponentKind::Button => (&self.buttons, &self.any_button),
            ComponentKind::SelectMenu => (&self.select_menus, &self.any_select_menu),
        };
        entries
            .iter()
            .find(|(known, _)| known == suffix)
            .map(|(_, entry)| entry)
            .or(any.as_ref())
    }
}

/// A slash-command handler.
#[async_trait]
pub trait CommandHandler<D>: Send + Sync {
    /// Immutable descriptor registered with the remote API.
    fn slash_data(&self) -> &SlashData;

    /// Registration scope.
    fn scope(&self) -> &CommandScope;

    /// Per-command access permissions, applied after registration. An
    /// empty set means no permission call is made.
    fn permissions(&self) -> &[CommandPermission] {
        &[]
    }

    /// Whether the router must acknowledge the interaction before running
    /// the body.
    fn long_running(&self) -> bool {
        false
    }

    /// Command body. Returning `None` asks the router to fall back to the
    /// configured default response; handlers may also reply on their own
    /// through `responder`.
    async fn run(
        &self,
        data: &D,
        interaction: &CommandInvocation,
        responder: &dyn Responder,
    ) -> anyhow::Result<Option<ReplyPayload>>;

    /// Delegation table for dynamic components this command owns, keyed by
    /// custom-id suffix.
    fn components(&self) -> Option<&ComponentMap<D>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopAction;

    #[async_trait]
    impl ComponentAction<()> for NoopAction {
        async fn run(
            &self,
            _data: &(),
            _interaction: &ComponentInvocation,
            _responder: &dyn Responder,
        ) -> anyhow::Result<Option<ReplyPayload>> {
            Ok(None)
        }
    }

    fn entry() -> ComponentEntry<()> {
        ComponentEntry::new(Arc::new(NoopAction), false)
    }

    #[test]
    fn test_component_map_prefers_exact_suffix() {
        let map = ComponentMap::new()
            .on_button("MyBtn", ComponentEntry::new(Arc::new(NoopAction), true))
            .any_button(entry());

        let exact = map.resolve(ComponentKind::Button, "MyBtn");
        assert!(exact.is_some_and(|e| e.long_running));

        let fallback = map.resolve(ComponentKind::Button, "Other");
        assert!(fallback.is_some_and(|e| !e.long_running));
    }

    #[test]
    fn test_component_map_kinds_are_separate() {
        let map = ComponentMap::new().on_button("Pick", entry());

        assert!(map.resolve(ComponentKind::Button, "Pick").is_some());
        assert!(map.resolve(ComponentKind::SelectMenu, "Pick").is_none());
    }

    #[test]
    fn test_component_map_unknown_suffix_without_catch_all() {
        let map = ComponentMap::new().on_button("Pick", entry());
        assert!(map.resolve(ComponentKind::Button, "Other").is_none());
    }

    #[test]
    fn test_slash_data_json_shape() {
        let data = SlashData::new("ping", "Ping the bot")
            .option(json!({ "name": "loud", "type": 5, "description": "Shout back" }))
            .default_permission(false);

        let body = data.to_json();
        assert_eq!(body["name"], "ping");
        assert_eq!(body["description"], "Ping the bot");
        assert_eq!(body["options"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["default_permission"], Value::Bool(false));
    }

    #[test]
    fn test_slash_data_omits_unset_default_permission() {
        let body = SlashData::new("ping", "Ping the bot").to_json();
        assert!(body.get("default_permission").is_none());
    }

    #[test]
    fn test_permission_wire_form() {
        let row = CommandPermission::user(369865089903230986, true).to_json();
        assert_eq!(row["id"], "369865089903230986");
        assert_eq!(row["type"], 2);
        assert_eq!(row["permission"], Value::Bool(true));

        let role = CommandPermission::role(4, false).to_json();
        assert_eq!(role["type"], 1);
    }

    #[test]
    fn test_scope_coverage() {
        let scope = CommandScope::Guild(vec![1, 2]);
        assert!(scope.covers(1));
        assert!(!scope.covers(3));
        assert!(!CommandScope::Global.covers(1));
        assert!(CommandScope::Global.guild_ids().is_empty());
    }
}
