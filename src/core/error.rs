//! Error taxonomy for loading, registration, and dispatch.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Every variant is reported where it occurs and contained there; none of
//! them is allowed to take the process down. Handler bodies and platform
//! adapters stay on `anyhow`, which these variants wrap as sources.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A handler unit is malformed: unreadable or unparsable definition,
    /// unknown constructor, failed constructor, wrong variant for the
    /// requested load, or an empty component custom id. Aborts only the
    /// affected unit.
    #[error("configuration error in {unit}: {reason}")]
    Configuration { unit: String, reason: String },

    /// A command interaction arrived with no matching registry entry. The
    /// interaction is left unanswered.
    #[error("received command {name:?} with id {id} could not be identified")]
    Resolution { id: String, name: String },

    /// A handler body failed. The router substitutes the configured error
    /// payload.
    #[error("handler execution failed: {0}")]
    Execution(#[source] anyhow::Error),

    /// Sending an acknowledgment or the final response failed.
    #[error("response delivery failed: {0}")]
    Delivery(#[source] anyhow::Error),

    /// A remote bulk-replace, patch, or permission call failed. Reported
    /// per scope or guild; siblings proceed.
    #[error("registration failed for {scope}: {source}")]
    Registration {
        scope: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_unit_path() {
        let err = Error::Configuration {
            unit: "units/commands/ping.yaml".to_string(),
            reason: "unknown constructor \"pong\"".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("units/commands/ping.yaml"));
        assert!(rendered.contains("unknown constructor"));
    }

    #[test]
    fn test_registration_keeps_source() {
        use std::error::Error as _;

        let err = Error::Registration {
            scope: "guild 42".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        assert!(err.source().is_some());
    }
}
