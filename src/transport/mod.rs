pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

use crate::cli::Args;
use crate::error::TransportError;
use crate::models::stream::{ RewriteKind, RewriteRequest, StreamRequest };

pub use self::http::HttpTransport;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Network seam of the proposal chat: one streaming call per turn plus the
/// non-streaming expand/shorten rewrites.
#[async_trait]
pub trait ProposalTransport: Send + Sync {
    /// Resolves once response headers are in and a body is readable.
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, TransportError>;

    /// `None` when the backend had nothing to offer; the reply is left alone.
    async fn rewrite(
        &self,
        kind: RewriteKind,
        request: &RewriteRequest
    ) -> Result<Option<String>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub stream_route: String,
    pub expand_route: String,
    pub shorten_route: String,
    pub access_token: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api/v1/".to_string(),
            stream_route: "aichat/stream1".to_string(),
            expand_route: "aichat/expand".to_string(),
            shorten_route: "aichat/shorten".to_string(),
            access_token: None,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            base_url: args.api_base_url.clone(),
            stream_route: args.stream_route.clone(),
            expand_route: args.expand_route.clone(),
            shorten_route: args.shorten_route.clone(),
            access_token: Some(args.access_token.clone()).filter(|t| !t.is_empty()),
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
        }
    }
}
