//! Upstream module
//!
//! Owns the outbound HTTP client and the header policy applied to every
//! forwarded request.

mod template;

pub use template::{decode_segment, UrlTemplate};

use std::net::IpAddr;
use std::time::Duration;

use hyper::body::Bytes;
use hyper::StatusCode;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};

use crate::config::UpstreamConfig;
use crate::error::ProxyError;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Client-side facts needed to build the upstream request
#[derive(Debug, Default)]
pub struct OutletRequest<'a> {
    pub outlet_id: &'a str,
    pub accept: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    /// Incoming `X-Forwarded-For` chain, if any
    pub forwarded_for: Option<&'a str>,
    pub client_ip: Option<IpAddr>,
}

/// What gets relayed back to the client
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Raw header value, forwarded byte-for-byte
    pub content_type: HeaderValue,
    pub body: Bytes,
}

pub struct UpstreamClient {
    http: reqwest::Client,
    template: UrlTemplate,
    referer: Option<String>,
    user_agent: Option<String>,
    default_user_agent: String,
    default_accept: String,
    default_content_type: HeaderValue,
    forward_client_ip: bool,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let mut builder =
            reqwest::Client::builder().redirect(reqwest::redirect::Policy::limited(10));
        if let Some(secs) = config.timeout_secs.filter(|s| *s > 0) {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ProxyError::ClientInit(e.to_string()))?;
        let default_content_type = HeaderValue::from_str(&config.default_content_type)
            .map_err(|e| ProxyError::ClientInit(format!("invalid default content type: {e}")))?;

        Ok(Self {
            http,
            template: UrlTemplate::new(&config.template, &config.placeholder),
            referer: config.referer.clone().filter(|r| !r.is_empty()),
            user_agent: config.user_agent.clone().filter(|u| !u.is_empty()),
            default_user_agent: config.default_user_agent.clone(),
            default_accept: config.default_accept.clone(),
            default_content_type,
            forward_client_ip: config.forward_client_ip,
        })
    }

    pub const fn template(&self) -> &UrlTemplate {
        &self.template
    }

    pub fn url_for(&self, outlet_id: &str) -> String {
        self.template.render(outlet_id)
    }

    /// Issue the upstream GET and buffer the whole body
    ///
    /// Non-2xx statuses are returned as-is; only transport failures are errors.
    pub async fn fetch(&self, req: &OutletRequest<'_>) -> Result<UpstreamResponse, ProxyError> {
        let url = self.url_for(req.outlet_id);
        let url = reqwest::Url::parse(&url).map_err(|e| ProxyError::InvalidUpstreamUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = self
            .http
            .get(url)
            .header(ACCEPT, req.accept.unwrap_or(self.default_accept.as_str()))
            .header(USER_AGENT, self.effective_user_agent(req.user_agent));

        if let Some(referer) = &self.referer {
            builder = builder.header(REFERER, referer);
        }

        if self.forward_client_ip {
            if let Some(ip) = req.client_ip {
                builder = builder.header(X_FORWARDED_FOR, forwarded_for(req.forwarded_for, ip));
            }
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| self.default_content_type.clone());
        let body = resp.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    fn effective_user_agent<'a>(&'a self, client_ua: Option<&'a str>) -> &'a str {
        self.user_agent
            .as_deref()
            .or(client_ua)
            .unwrap_or(self.default_user_agent.as_str())
    }
}

/// Append the peer address to an existing `X-Forwarded-For` chain
pub fn forwarded_for(existing: Option<&str>, client_ip: IpAddr) -> String {
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        Some(chain) => format!("{chain}, {client_ip}"),
        None => client_ip.to_string(),
    }
}
