//! Framework options.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::env;

use log::warn;

use crate::core::response::ReplyPayload;

/// Knobs the bootstrap collaborator can set: canned payloads, the dynamic
/// custom-id splitter, the home guild used for global command permissions,
/// and the development/watch switches.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Sent when a command handler succeeds without producing a payload.
    pub default_response: Option<ReplyPayload>,
    /// Sent in place of a payload when a handler fails. Users never see
    /// raw internal error text.
    pub error_response: Option<ReplyPayload>,
    /// Sent when a component handler succeeds without producing a payload.
    pub default_update: Option<ReplyPayload>,
    /// Separator between the owner token and the suffix inside a dynamic
    /// component custom id.
    pub custom_id_splitter: String,
    /// Guild used to apply permissions of global commands. Without one,
    /// global command permissions cannot be applied.
    pub home_guild_id: Option<u64>,
    /// Also load draft (`.yml`) unit definitions.
    pub dev_units: bool,
    /// Watch unit directories and hot-reload handlers on change.
    pub watch_units: bool,
}

impl Default for BotOptions {
    fn default() -> Self {
        BotOptions {
            default_response: None,
            error_response: None,
            default_update: None,
            custom_id_splitter: ":".to_string(),
            home_guild_id: None,
            dev_units: false,
            watch_units: true,
        }
    }
}

impl BotOptions {
    /// Read options from the environment, falling back to defaults.
    ///
    /// Recognized variables: `DEFAULT_RESPONSE`, `ERROR_RESPONSE`,
    /// `DEFAULT_UPDATE`, `CUSTOM_ID_SPLITTER`, `HOME_GUILD_ID`,
    /// `DEV_UNITS`, `WATCH_UNITS`.
    pub fn from_env() -> Self {
        let mut options = BotOptions::default();

        if let Ok(content) = env::var("DEFAULT_RESPONSE") {
            options.default_response = Some(ReplyPayload::text(content));
        }
        if let Ok(content) = env::var("ERROR_RESPONSE") {
            options.error_response = Some(ReplyPayload::text(content));
        }
        if let Ok(content) = env::var("DEFAULT_UPDATE") {
            options.default_update = Some(ReplyPayload::text(content));
        }
        if let Ok(splitter) = env::var("CUSTOM_ID_SPLITTER") {
            if !splitter.is_empty() {
                options.custom_id_splitter = splitter;
            }
        }
        if let Ok(raw) = env::var("HOME_GUILD_ID") {
            match raw.parse() {
                Ok(id) => options.home_guild_id = Some(id),
                Err(_) => warn!("HOME_GUILD_ID {raw:?} is not a valid guild id; ignoring"),
            }
        }
        if let Ok(raw) = env::var("DEV_UNITS") {
            options.dev_units = matches!(raw.as_str(), "1" | "true" | "yes");
        }
        if let Ok(raw) = env::var("WATCH_UNITS") {
            options.watch_units = !matches!(raw.as_str(), "0" | "false" | "no");
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BotOptions::default();
        assert_eq!(options.custom_id_splitter, ":");
        assert!(options.home_guild_id.is_none());
        assert!(!options.dev_units);
        assert!(options.watch_units);
    }
}
