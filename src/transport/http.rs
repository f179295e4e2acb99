use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, info };
use reqwest::{
    Client as HttpClient,
    StatusCode,
    header::{ HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE },
};
use url::Url;

use super::{ ByteStream, ProposalTransport, TransportConfig };
use crate::error::TransportError;
use crate::models::stream::{ RewriteKind, RewriteRequest, RewriteResponse, StreamRequest };

const ACCESS_TOKEN_HEADER: &str = "x-access-token";

pub struct HttpTransport {
    http: HttpClient,
    stream_url: Url,
    expand_url: Url,
    shorten_url: Url,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.access_token {
            headers.insert(
                HeaderName::from_static(ACCESS_TOKEN_HEADER),
                HeaderValue::from_str(token).map_err(|e|
                    TransportError::InvalidResponse(format!("Invalid access token format: {}", e))
                )?
            );
        } else {
            info!("No access token configured; requests will be sent unauthenticated");
        }

        // no overall timeout: a proposal stream may legitimately run for minutes
        let http = HttpClient::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            stream_url: endpoint(&config.base_url, &config.stream_route)?,
            expand_url: endpoint(&config.base_url, &config.expand_route)?,
            shorten_url: endpoint(&config.base_url, &config.shorten_route)?,
        })
    }

    #[cfg(test)]
    fn stream_url(&self) -> &Url {
        &self.stream_url
    }
}

#[async_trait]
impl ProposalTransport for HttpTransport {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, TransportError> {
        debug!("Opening proposal stream at {}", self.stream_url);
        let resp = self.http
            .post(self.stream_url.clone())
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send().await?;

        check_status(resp.status())?;

        let body: ByteStream = Box::pin(
            resp.bytes_stream().map(|chunk| chunk.map_err(TransportError::from))
        );
        Ok(body)
    }

    async fn rewrite(
        &self,
        kind: RewriteKind,
        request: &RewriteRequest
    ) -> Result<Option<String>, TransportError> {
        let url = match kind {
            RewriteKind::Expand => self.expand_url.clone(),
            RewriteKind::Shorten => self.shorten_url.clone(),
        };
        let resp = self.http.post(url).json(request).send().await?;
        check_status(resp.status())?;

        let body = resp.json::<RewriteResponse>().await?;
        Ok(body.data.filter(|text| !text.is_empty()))
    }
}

/// Joins `route` onto `base`, treating `base` as a directory even without a trailing slash.
pub fn endpoint(base: &str, route: &str) -> Result<Url, TransportError> {
    let base = if base.ends_with('/') { Url::parse(base)? } else { Url::parse(&format!("{}/", base))? };
    Ok(base.join(route.trim_start_matches('/'))?)
}

pub fn check_status(status: StatusCode) -> Result<(), TransportError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
            Err(TransportError::Unauthorized { status: status.as_u16() }),
        StatusCode::NO_CONTENT => Err(TransportError::MissingBody),
        s if !s.is_success() => Err(TransportError::Status { status: s.as_u16() }),
        _ => Ok(()),
    }
}
