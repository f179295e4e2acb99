use crate::models::stream::PricingMode;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the proposal API (e.g., https://api.example.com/api/v1/)
    #[arg(long, env = "API_BASE_URL", default_value = "http://127.0.0.1:5000/api/v1/")]
    pub api_base_url: String,

    /// Route of the streaming chat endpoint, relative to the base URL
    #[arg(long, env = "STREAM_ROUTE", default_value = "aichat/stream1")]
    pub stream_route: String,

    /// Route of the expand rewrite endpoint
    #[arg(long, env = "EXPAND_ROUTE", default_value = "aichat/expand")]
    pub expand_route: String,

    /// Route of the shorten rewrite endpoint
    #[arg(long, env = "SHORTEN_ROUTE", default_value = "aichat/shorten")]
    pub shorten_route: String,

    /// Access token sent as the x-access-token header. Empty means unauthenticated.
    #[arg(long, env = "ACCESS_TOKEN", default_value = "")]
    pub access_token: String,

    /// Seconds to wait for the TCP/TLS connection. The stream itself has no deadline.
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "30")]
    pub connect_timeout_secs: u64,

    // --- Rendering Args ---
    /// Milliseconds between typewriter flushes of streamed text
    #[arg(long, env = "FLUSH_INTERVAL_MS", default_value = "50")]
    pub flush_interval_ms: u64,

    // --- Proposal Args ---
    /// Business the proposal is written for
    #[arg(long, env = "BUSINESS_ID")]
    pub business_id: Option<String>,

    /// Proposal template to generate from
    #[arg(long, env = "TEMPLATE_ID")]
    pub template_id: Option<String>,

    /// Pricing mode: `auto`, or `manual:<price>` to quote a fixed price
    #[arg(long, env = "PRICING", default_value = "auto")]
    pub pricing: PricingMode,

    /// Continue an existing conversation instead of starting a new one
    #[arg(long, env = "CONVERSATION_ID")]
    pub conversation_id: Option<String>,

    /// Title of the existing conversation given by --conversation-id
    #[arg(long, env = "CONVERSATION_TITLE")]
    pub conversation_title: Option<String>,

    /// Send a single prompt and exit. Without it, prompts are read line by line from stdin.
    #[arg(long, env = "PROMPT")]
    pub prompt: Option<String>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
