//! HTTP response building module
//!
//! Builders for every response the proxy sends, decoupled from request handling.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::{json, Value};

use crate::error::ProxyError;
use crate::upstream::UpstreamResponse;

pub const ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";

/// Build JSON response
pub fn build_json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build the status + JSON body for a failed request
pub fn build_error_response(err: &ProxyError) -> Response<Full<Bytes>> {
    build_json_response(err.status(), &err.body())
}

/// Relay the upstream status, content type and body unchanged
pub fn build_passthrough_response(upstream: UpstreamResponse, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = upstream.body.len();
    let body = if is_head { Bytes::new() } else { upstream.body };

    Response::builder()
        .status(upstream.status)
        .header("Content-Type", upstream.content_type)
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(upstream.status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build plain text response
pub fn build_text_response(status: StatusCode, text: &'static str, is_head: bool) -> Response<Full<Bytes>> {
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from_static(text.as_bytes())
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", text.len())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build health check response
pub fn build_health_response() -> Response<Full<Bytes>> {
    build_json_response(StatusCode::OK, &json!({ "status": "ok" }))
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found" }))
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain")
        .header("Allow", ALLOW_METHODS)
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build OPTIONS response; CORS headers are added by the caller
pub fn build_options_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", ALLOW_METHODS)
        .header("Content-Length", "0")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::header::HeaderValue;

    async fn body_bytes(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_passthrough_keeps_status_type_and_bytes() {
        let raw = Bytes::from_static(b"\x00\xffnot-json\r\n");
        let resp = build_passthrough_response(
            UpstreamResponse {
                status: StatusCode::FORBIDDEN,
                content_type: HeaderValue::from_static("application/octet-stream"),
                body: raw.clone(),
            },
            false,
        );
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.headers()["content-type"], "application/octet-stream");
        assert_eq!(body_bytes(resp).await, raw);
    }

    #[test]
    fn test_passthrough_keeps_non_ascii_content_type() {
        let content_type = HeaderValue::from_bytes(b"text/plain; name=caf\xe9").unwrap();
        assert!(content_type.to_str().is_err());
        let resp = build_passthrough_response(
            UpstreamResponse {
                status: StatusCode::OK,
                content_type: content_type.clone(),
                body: Bytes::from_static(b"x"),
            },
            false,
        );
        assert_eq!(resp.headers()["content-type"], content_type);
    }

    #[tokio::test]
    async fn test_passthrough_head_has_no_body() {
        let resp = build_passthrough_response(
            UpstreamResponse {
                status: StatusCode::OK,
                content_type: HeaderValue::from_static("application/json"),
                body: Bytes::from_static(b"{}"),
            },
            true,
        );
        assert_eq!(resp.headers()["content-length"], "2");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_error_response() {
        let resp = build_error_response(&ProxyError::MissingOutletId);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body["error"], "missing outlet id");
    }

    #[test]
    fn test_405_allow_header() {
        let resp = build_405_response();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["allow"], ALLOW_METHODS);
    }
}
