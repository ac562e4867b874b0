//! # Agent Tool Surface
//!
//! Tool calls an assistant agent may issue against the player. Both tools
//! take `{ seconds?: number >= 0, play?: boolean }` and go through the same
//! [`PlayerBridge::issue_seek`] path as a direct UI seek.

use crate::bridge::{PlayerBridge, SeekOutcome};
use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Tools exposed to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentTool {
    #[serde(rename = "setTime")]
    SetTime,
    #[serde(rename = "seekYoutube")]
    SeekYoutube,
}

impl AgentTool {
    pub const ALL: [AgentTool; 2] = [AgentTool::SetTime, AgentTool::SeekYoutube];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentTool::SetTime => "setTime",
            AgentTool::SeekYoutube => "seekYoutube",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentTool::SetTime => "Set the current playback time of the video in seconds.",
            AgentTool::SeekYoutube => {
                "Seek the YouTube player to a position in seconds, optionally starting playback."
            }
        }
    }

    /// JSON schema of the tool arguments.
    pub fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "seconds": {
                    "type": "number",
                    "minimum": 0,
                    "description": "Target position in seconds"
                },
                "play": {
                    "type": "boolean",
                    "description": "Start playback after seeking"
                }
            }
        })
    }

    /// Registration payload for agent frameworks.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.as_str(),
            "description": self.description(),
            "parameters": self.parameters(),
        })
    }
}

impl fmt::Display for AgentTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentTool {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "setTime" => Ok(AgentTool::SetTime),
            "seekYoutube" => Ok(AgentTool::SeekYoutube),
            other => Err(PlayerError::UnknownTool(other.to_string())),
        }
    }
}

/// Arguments shared by both tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeekToolArgs {
    #[serde(default)]
    pub seconds: Option<f64>,
    #[serde(default)]
    pub play: Option<bool>,
}

impl SeekToolArgs {
    fn parse(tool: AgentTool, args: Value) -> Result<Self> {
        if args.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(args).map_err(|e| PlayerError::InvalidArguments {
            tool: tool.as_str().to_string(),
            message: e.to_string(),
        })
    }
}

impl PlayerBridge {
    /// Dispatch an agent tool call.
    ///
    /// A call without `seconds` is accepted and does nothing.
    #[instrument(skip(self, args))]
    pub fn handle_tool_call(&self, name: &str, args: Value) -> Result<SeekOutcome> {
        let tool: AgentTool = name.parse()?;
        let args = SeekToolArgs::parse(tool, args)?;

        match args.seconds {
            Some(seconds) => self.issue_seek(seconds, args.play.unwrap_or(false)),
            None => {
                debug!(%tool, "Tool call without seconds, nothing to do");
                Ok(SeekOutcome::Ignored)
            }
        }
    }
}

/// Definitions of every player tool.
pub fn tool_definitions() -> Vec<Value> {
    AgentTool::ALL.iter().map(AgentTool::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::events::EventBus;

    #[test]
    fn test_tool_names() {
        assert_eq!("setTime".parse::<AgentTool>().unwrap(), AgentTool::SetTime);
        assert_eq!(
            "seekYoutube".parse::<AgentTool>().unwrap(),
            AgentTool::SeekYoutube
        );
        assert!(matches!(
            "rewind".parse::<AgentTool>(),
            Err(PlayerError::UnknownTool(name)) if name == "rewind"
        ));
    }

    #[test]
    fn test_definitions() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0]["name"], "setTime");
        assert_eq!(defs[1]["parameters"]["properties"]["play"]["type"], "boolean");
    }

    #[test]
    fn test_tool_call_defers_like_direct_seek() {
        let bridge = PlayerBridge::new(EventBus::new(8));

        let outcome = bridge
            .handle_tool_call("seekYoutube", json!({"seconds": 42, "play": true}))
            .unwrap();
        assert_eq!(outcome, SeekOutcome::Deferred);

        let pending = bridge.pending_seek().unwrap();
        assert_eq!(pending.seconds, 42.0);
        assert!(pending.play);
    }

    #[test]
    fn test_tool_call_validation() {
        let bridge = PlayerBridge::new(EventBus::new(8));

        assert_eq!(
            bridge.handle_tool_call("setTime", json!({})).unwrap(),
            SeekOutcome::Ignored
        );
        assert_eq!(
            bridge.handle_tool_call("setTime", Value::Null).unwrap(),
            SeekOutcome::Ignored
        );
        assert_eq!(
            bridge
                .handle_tool_call("setTime", json!({"seconds": -3}))
                .unwrap(),
            SeekOutcome::Ignored
        );
        assert!(matches!(
            bridge.handle_tool_call("setTime", json!({"seconds": "ten"})),
            Err(PlayerError::InvalidArguments { .. })
        ));
        assert!(matches!(
            bridge.handle_tool_call("volume", json!({"seconds": 1})),
            Err(PlayerError::UnknownTool(_))
        ));
        assert!(bridge.pending_seek().is_none());
    }
}
