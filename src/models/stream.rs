use super::chat::ConversationSnapshot;
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

/// A classified frame of the proposal stream. Built per frame and consumed
/// immediately; never stored.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Token {
        text: String,
    },
    Final {
        reply: String,
        snapshot: ConversationSnapshot,
    },
    Done,
    Malformed {
        raw: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PricingMode {
    Auto,
    Manual(String),
}

impl Default for PricingMode {
    fn default() -> Self {
        PricingMode::Auto
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsePricingModeError {
    message: String,
}

impl fmt::Display for ParsePricingModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParsePricingModeError {}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingMode::Auto => write!(f, "auto"),
            PricingMode::Manual(price) => write!(f, "manual:{}", price),
        }
    }
}

/// `auto` or `manual:<price>`.
impl FromStr for PricingMode {
    type Err = ParsePricingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(PricingMode::Auto);
        }
        match s.split_once(':') {
            Some((mode, price)) if mode.eq_ignore_ascii_case("manual") =>
                Ok(PricingMode::Manual(price.to_string())),
            _ =>
                Err(ParsePricingModeError {
                    message: format!("Invalid pricing mode: '{}'", s),
                }),
        }
    }
}

/// Body of the streaming proposal request, field names as the backend expects them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StreamRequest {
    pub is_new: u8,
    pub conversation_id: String,
    pub query: String,
    pub conversation_title: String,
    pub template_id: String,
    pub business_id: String,
    pub auto_price: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_price: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewriteKind {
    Expand,
    Shorten,
}

impl RewriteKind {
    pub fn verb(self) -> &'static str {
        match self {
            RewriteKind::Expand => "expand",
            RewriteKind::Shorten => "shorten",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            RewriteKind::Expand => "Expanded",
            RewriteKind::Shorten => "Shortened",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RewriteRequest {
    #[serde(rename = "previousProposal")]
    pub previous_proposal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RewriteResponse {
    #[serde(default)]
    pub data: Option<String>,
}
