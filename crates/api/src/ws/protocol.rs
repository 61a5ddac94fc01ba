//! Inbound WebSocket messages.
//!
//! ```text
//! {"type":"run","script":"hello.sh","config":{"permissions":{..},"env":{..},"args":".."}}
//! {"type":"stop"}
//! ```
//!
//! `scriptName` is accepted in place of `script`. Env values that are not
//! strings are converted to their JSON text form. `null` in any config
//! field means "use the default".

use std::collections::BTreeMap;

use scriptsui_core::scripting::config::{Permissions, ScriptConfig};
use scriptsui_core::scripting::orchestrator::Invocation;
use serde::Deserialize;
use serde_json::Value;

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Run(Invocation),
    Stop,
    /// A well-formed message of a type this server does not handle.
    Unknown(Option<String>),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ProtocolError(#[from] serde_json::Error);

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct RunRequest {
    #[serde(default, alias = "scriptName")]
    script: Option<String>,
    #[serde(default)]
    config: Option<RunConfig>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RunConfig {
    source_id: Option<String>,
    permissions: Option<Permissions>,
    env: Option<BTreeMap<String, Value>>,
    args: Option<String>,
}

impl RunConfig {
    fn into_script_config(self, script_name: &str) -> ScriptConfig {
        ScriptConfig {
            script_name: script_name.to_string(),
            source_id: self.source_id.unwrap_or_default(),
            permissions: self.permissions.unwrap_or_default(),
            env: self
                .env
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, env_value(value)))
                .collect(),
            args: self.args.unwrap_or_default(),
        }
    }
}

fn env_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parse one text frame.
pub fn parse(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let envelope = Envelope::deserialize(&value)?;

    match envelope.kind.as_deref() {
        Some("run") => {
            let request = RunRequest::deserialize(&value)?;
            let script = request.script.unwrap_or_default();
            let config = request
                .config
                .unwrap_or_default()
                .into_script_config(&script);
            Ok(ClientMessage::Run(Invocation::new(script, config)))
        }
        Some("stop") => Ok(ClientMessage::Stop),
        _ => Ok(ClientMessage::Unknown(envelope.kind)),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn run_with_full_config() {
        let msg = parse(
            r#"{"type":"run","script":"fetch.ts","config":{
                "permissions":{"allowNet":true},
                "env":{"TOKEN":"abc"},
                "args":"--x 1"
            }}"#,
        )
        .expect("parse");

        let invocation = assert_matches!(msg, ClientMessage::Run(inv) => inv);
        assert_eq!(invocation.script_name, "fetch.ts");
        assert_eq!(invocation.config.script_name, "fetch.ts");
        assert!(invocation.config.permissions.allow_net);
        assert!(!invocation.config.permissions.allow_read);
        assert_eq!(invocation.config.env["TOKEN"], "abc");
        assert_eq!(invocation.config.args, "--x 1");
    }

    #[test]
    fn script_name_alias_and_missing_config() {
        let msg = parse(r#"{"type":"run","scriptName":"hello.sh"}"#).expect("parse");
        let invocation = assert_matches!(msg, ClientMessage::Run(inv) => inv);
        assert_eq!(invocation.script_name, "hello.sh");
        assert_eq!(invocation.config.args, "");
        assert!(invocation.config.env.is_empty());
    }

    #[test]
    fn non_string_env_values_are_stringified() {
        let msg = parse(
            r#"{"type":"run","script":"a.js","config":{"env":{"N":42,"B":true,"Z":null}}}"#,
        )
        .expect("parse");
        let invocation = assert_matches!(msg, ClientMessage::Run(inv) => inv);
        assert_eq!(invocation.config.env["N"], "42");
        assert_eq!(invocation.config.env["B"], "true");
        assert_eq!(invocation.config.env["Z"], "null");
    }

    #[test]
    fn null_config_fields_fall_back_to_defaults() {
        let msg = parse(
            r#"{"type":"run","script":"a.sh","config":{"args":null,"env":null,"permissions":null,"sourceId":null}}"#,
        )
        .expect("parse");
        let invocation = assert_matches!(msg, ClientMessage::Run(inv) => inv);
        assert_eq!(invocation.script_name, "a.sh");
        assert_eq!(invocation.config.args, "");
        assert!(invocation.config.env.is_empty());
        assert_eq!(invocation.config.permissions, Permissions::default());

        let msg = parse(r#"{"type":"run","script":"a.sh","config":null}"#).expect("parse");
        assert_matches!(msg, ClientMessage::Run(inv) if inv.config.args.is_empty());
    }

    #[test]
    fn stop_and_unknown_types() {
        assert_matches!(parse(r#"{"type":"stop"}"#), Ok(ClientMessage::Stop));
        assert_matches!(
            parse(r#"{"type":"subscribe"}"#),
            Ok(ClientMessage::Unknown(Some(kind))) if kind == "subscribe"
        );
        assert_matches!(parse(r#"{"hello":1}"#), Ok(ClientMessage::Unknown(None)));
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(parse("not json").is_err());
        assert!(parse(r#"{"type":"run","script":7}"#).is_err());
    }
}
