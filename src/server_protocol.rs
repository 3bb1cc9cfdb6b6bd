use serde::Serialize;
use serde_json::Value;

use crate::types::{KeyIntent, Snapshot};

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedClientMessage {
    KeyEvent(KeyIntent),
}

/// Outbound envelope: `{"label": ..., "data": ...}`. Unit variants carry no
/// `data` field.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "label", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    Id(String),
    NumPlayers(usize),
    PlayerNumber(usize),
    Identity(usize),
    Ready,
    Go,
    GameState(Snapshot),
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let label = object.get("label")?.as_str()?;

    match label {
        "keyEvent" => {
            let data = object.get("data")?.as_object()?;
            Some(ParsedClientMessage::KeyEvent(KeyIntent {
                left: parse_key(data.get("left"))?,
                up: parse_key(data.get("up"))?,
                right: parse_key(data.get("right"))?,
                down: parse_key(data.get("down"))?,
            }))
        }
        _ => None,
    }
}

/// Missing and `null` both mean "not held". Anything else must be a bool.
fn parse_key(value: Option<&Value>) -> Option<bool> {
    match value {
        None | Some(Value::Null) => Some(false),
        Some(value) => value.as_bool(),
    }
}
