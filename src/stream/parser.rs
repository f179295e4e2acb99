use crate::models::chat::ConversationSnapshot;
use crate::models::stream::StreamEvent;
use log::{ trace, warn };
use serde::Deserialize;
use serde_json::Value;

use super::frame::data_payload;

pub const DONE_SENTINEL: &str = "[DONE]";
pub const LINE_BREAK_MARKER: &str = "<br/>";

const FINAL_TYPE: &str = "final";

#[derive(Deserialize)]
struct WireRecord {
    #[serde(rename = "type")]
    kind: Option<String>,
    token: Option<Value>,
}

/// Classifies a raw frame. Frames without the `data:` prefix are protocol comments
/// or heartbeats and produce no event.
pub fn parse_frame(frame: &str) -> Option<StreamEvent> {
    match data_payload(frame) {
        Some(payload) => Some(parse_payload(payload)),
        None => {
            trace!("Ignoring non-data frame: {:?}", frame);
            None
        }
    }
}

/// Precedence: the `[DONE]` sentinel, then an explicit `"type": "final"`, then a
/// non-empty string `token`. Anything else is malformed.
pub fn parse_payload(payload: &str) -> StreamEvent {
    if payload == DONE_SENTINEL {
        return StreamEvent::Done;
    }

    let record = match serde_json::from_str::<WireRecord>(payload) {
        Ok(record) => record,
        Err(e) => {
            warn!("Skipping unparseable stream frame: {} - data: {}", e, payload);
            return malformed(payload);
        }
    };

    if record.kind.as_deref() == Some(FINAL_TYPE) {
        return match record.token {
            Some(token @ Value::Object(_)) => {
                let reply = token
                    .pointer("/chats/0/message")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let snapshot = serde_json::from_value::<ConversationSnapshot>(token).unwrap_or_else(|e| {
                    warn!("Final frame carries an unreadable conversation: {}", e);
                    ConversationSnapshot::default()
                });
                StreamEvent::Final { reply, snapshot }
            }
            _ => {
                warn!("Final frame without a conversation object: {}", payload);
                malformed(payload)
            }
        };
    }

    match record.token {
        Some(Value::String(text)) if !text.is_empty() => StreamEvent::Token {
            text: normalize_newlines(&text),
        },
        _ => {
            warn!("Stream frame has no usable token: {}", payload);
            malformed(payload)
        }
    }
}

pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', LINE_BREAK_MARKER)
}

fn malformed(payload: &str) -> StreamEvent {
    StreamEvent::Malformed { raw: payload.to_string() }
}
