//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, route matching,
//! CORS decoration and access logging.

use crate::config::AppState;
use crate::handler::outlet;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderName, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const LIVENESS_TEXT: &str = "Livestream proxy is running.";
const OUTLET_ROUTE: &str = "/api/outlet";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Path plus query, as the client sent it
    pub original_uri: String,
    pub is_head: bool,
    pub accept: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub origin: Option<&'a str>,
    pub forwarded_for: Option<&'a str>,
    pub peer_addr: SocketAddr,
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method();
    let headers = req.headers();
    let origin = headers.get(ORIGIN);

    let ctx = RequestContext {
        method: method.as_str(),
        path: req.uri().path(),
        original_uri: req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path().to_string(), ToString::to_string),
        is_head: *method == Method::HEAD,
        accept: header_str(headers, &ACCEPT),
        user_agent: header_str(headers, &USER_AGENT),
        origin: origin.and_then(|v| v.to_str().ok()),
        forwarded_for: headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()),
        peer_addr,
    };

    let (mut response, upstream_url) = match *method {
        Method::OPTIONS => {
            let mut resp = http::build_options_response();
            http::apply_preflight(&mut resp, origin, &state.config.http);
            (resp, None)
        }
        Method::GET | Method::HEAD => {
            let (mut resp, upstream_url) = route_request(&ctx, &state).await;
            http::apply_cors(&mut resp, origin, &state.config.http);
            (resp, upstream_url)
        }
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            let mut resp = http::build_405_response();
            http::apply_cors(&mut resp, origin, &state.config.http);
            (resp, None)
        }
    };

    if state.access_log_enabled() {
        let entry = access_entry(&req, &ctx, &response, upstream_url, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    strip_body_for_head(&mut response, ctx.is_head);
    Ok(response)
}

/// Route request based on path
async fn route_request(
    ctx: &RequestContext<'_>,
    state: &AppState,
) -> (Response<Full<Bytes>>, Option<String>) {
    let health = &state.config.health;
    if health.enabled && (ctx.path == health.liveness_path || ctx.path == health.readiness_path) {
        return (http::build_health_response(), None);
    }

    if ctx.path == "/" {
        return (
            http::build_text_response(StatusCode::OK, LIVENESS_TEXT, ctx.is_head),
            None,
        );
    }

    if let Some(raw_id) = match_outlet_route(ctx.path) {
        return outlet::proxy_outlet(ctx, raw_id, state).await;
    }

    (http::build_404_response(), None)
}

/// Extract the raw `:id` segment from `/api/outlet/:id`
///
/// The prefix matches case-insensitively and one trailing slash is ignored.
/// `/api/outlet` and `/api/outlet/` yield an empty id; nested paths do not match.
fn match_outlet_route(path: &str) -> Option<&str> {
    if !path.get(..OUTLET_ROUTE.len())?.eq_ignore_ascii_case(OUTLET_ROUTE) {
        return None;
    }
    let rest = path.get(OUTLET_ROUTE.len()..)?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Some("");
    }
    let id = rest.strip_prefix('/')?;
    if id.contains('/') {
        return None;
    }
    Some(id)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// HEAD responses keep their headers but never carry a body
fn strip_body_for_head(response: &mut Response<Full<Bytes>>, is_head: bool) {
    if is_head {
        *response.body_mut() = Full::new(Bytes::new());
    }
}

fn access_entry<B>(
    req: &Request<B>,
    ctx: &RequestContext<'_>,
    response: &Response<Full<Bytes>>,
    upstream_url: Option<String>,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        ctx.peer_addr.ip().to_string(),
        ctx.method.to_string(),
        ctx.path.to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = if ctx.is_head {
        0
    } else {
        usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(usize::MAX)
    };
    entry.referer = header_str(req.headers(), &REFERER).map(ToString::to_string);
    entry.user_agent = ctx.user_agent.map(ToString::to_string);
    entry.upstream_url = upstream_url;
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}
