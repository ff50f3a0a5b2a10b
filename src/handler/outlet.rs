//! Outlet proxy handler
//!
//! `/api/outlet/:id`: validate the id, forward upstream, relay the answer.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use crate::error::ProxyError;
use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use crate::upstream::{decode_segment, OutletRequest};

/// Decode and trim the raw path segment
pub fn parse_outlet_id(raw: &str) -> Result<String, ProxyError> {
    let decoded = decode_segment(raw)?;
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        return Err(ProxyError::MissingOutletId);
    }
    Ok(trimmed.to_string())
}

/// Forward one outlet request
///
/// Returns the response and, when the request went upstream, the URL used.
pub async fn proxy_outlet(
    ctx: &RequestContext<'_>,
    raw_id: &str,
    state: &AppState,
) -> (Response<Full<Bytes>>, Option<String>) {
    let outlet_id = match parse_outlet_id(raw_id) {
        Ok(id) => id,
        Err(e) => return (http::build_error_response(&e), None),
    };

    let upstream_url = state.upstream.url_for(&outlet_id);
    logger::log_proxy(ctx.method, &ctx.original_uri, &upstream_url, ctx.origin);

    let request = OutletRequest {
        outlet_id: &outlet_id,
        accept: ctx.accept,
        user_agent: ctx.user_agent,
        forwarded_for: ctx.forwarded_for,
        client_ip: Some(ctx.peer_addr.ip()),
    };

    match state.upstream.fetch(&request).await {
        Ok(upstream) => (
            http::build_passthrough_response(upstream, ctx.is_head),
            Some(upstream_url),
        ),
        Err(e) => {
            logger::log_proxy_error(&upstream_url, &e);
            (http::build_error_response(&e), Some(upstream_url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outlet_id() {
        assert_eq!(parse_outlet_id("123").unwrap(), "123");
        assert_eq!(parse_outlet_id("%20abc%20").unwrap(), "abc");
        assert_eq!(parse_outlet_id("a%2Fb").unwrap(), "a/b");
    }

    #[test]
    fn test_parse_outlet_id_rejects_blank() {
        assert!(matches!(parse_outlet_id(""), Err(ProxyError::MissingOutletId)));
        assert!(matches!(parse_outlet_id("%20%09"), Err(ProxyError::MissingOutletId)));
        assert!(matches!(parse_outlet_id("%C3%28"), Err(ProxyError::MalformedOutletId)));
    }
}
