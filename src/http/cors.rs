//! CORS headers
//!
//! Every origin is allowed: the request `Origin` is echoed back, or `*` when absent.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, VARY};
use hyper::Response;

use crate::config::HttpConfig;

const ALLOW_ORIGIN: &str = "access-control-allow-origin";
const ALLOW_METHODS: &str = "access-control-allow-methods";
const ALLOW_HEADERS: &str = "access-control-allow-headers";

/// Attach the allow-origin header to any response
pub fn apply_cors(
    response: &mut Response<Full<Bytes>>,
    origin: Option<&HeaderValue>,
    config: &HttpConfig,
) {
    if !config.enable_cors {
        return;
    }
    let headers = response.headers_mut();
    match origin {
        Some(origin) => {
            headers.insert(ALLOW_ORIGIN, origin.clone());
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
        None => {
            headers.insert(ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
    }
}

/// Attach the preflight headers (methods and allowed request headers)
pub fn apply_preflight(
    response: &mut Response<Full<Bytes>>,
    origin: Option<&HeaderValue>,
    config: &HttpConfig,
) {
    if !config.enable_cors {
        return;
    }
    apply_cors(response, origin, config);

    let headers = response.headers_mut();
    if let Ok(methods) = HeaderValue::from_str(&config.cors_allowed_methods) {
        headers.insert(ALLOW_METHODS, methods);
    }
    if let Ok(allowed) = HeaderValue::from_str(&config.cors_allowed_headers) {
        headers.insert(ALLOW_HEADERS, allowed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::build_options_response;

    fn http_config(enable_cors: bool) -> HttpConfig {
        HttpConfig {
            enable_cors,
            cors_allowed_methods: "GET, OPTIONS".to_string(),
            cors_allowed_headers: "Content-Type, Accept, Origin, User-Agent".to_string(),
        }
    }

    #[test]
    fn test_origin_is_reflected() {
        let mut resp = build_options_response();
        let origin = HeaderValue::from_static("https://user.github.io");
        apply_cors(&mut resp, Some(&origin), &http_config(true));
        assert_eq!(resp.headers()[ALLOW_ORIGIN], "https://user.github.io");
        assert_eq!(resp.headers()[VARY], "Origin");
    }

    #[test]
    fn test_wildcard_without_origin() {
        let mut resp = build_options_response();
        apply_cors(&mut resp, None, &http_config(true));
        assert_eq!(resp.headers()[ALLOW_ORIGIN], "*");
        assert!(resp.headers().get(VARY).is_none());
    }

    #[test]
    fn test_preflight_headers() {
        let mut resp = build_options_response();
        apply_preflight(&mut resp, None, &http_config(true));
        assert_eq!(resp.headers()[ALLOW_METHODS], "GET, OPTIONS");
        assert_eq!(resp.headers()[ALLOW_HEADERS], "Content-Type, Accept, Origin, User-Agent");
        // No credentials are ever required
        assert!(resp.headers().get("access-control-allow-credentials").is_none());
    }

    #[test]
    fn test_disabled() {
        let mut resp = build_options_response();
        apply_preflight(&mut resp, None, &http_config(false));
        assert!(resp.headers().get(ALLOW_ORIGIN).is_none());
    }
}
