use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::{ Map, Value };
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Pending,
    Streaming,
    Complete,
    Failed,
}

impl TurnStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnStatus::Complete | TurnStatus::Failed)
    }
}

/// One prompt/reply pair. `reply` only grows while the turn is streaming and is
/// frozen once the turn reaches a terminal status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub prompt: String,
    pub reply: String,
    pub status: TurnStatus,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn streaming(prompt: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            prompt: prompt.into(),
            reply: String::new(),
            status: TurnStatus::Streaming,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
}

/// The conversation object carried in the `token` field of a final frame.
///
/// Every field is optional on the wire and read leniently: a value of the wrong
/// type is treated as absent instead of rejecting the whole record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub template_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub business_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_chats")]
    pub chats: Vec<ChatRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// The backend sends ids as either strings or numbers; anything else counts as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where D: Deserializer<'de>
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// `null` or a non-array is an empty list; entries that are not chat objects become empty records.
fn lenient_chats<'de, D>(deserializer: D) -> Result<Vec<ChatRecord>, D::Error>
    where D: Deserializer<'de>
{
    let entries = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => entries,
        _ => return Ok(Vec::new()),
    };
    Ok(
        entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry).unwrap_or_default())
            .collect()
    )
}
