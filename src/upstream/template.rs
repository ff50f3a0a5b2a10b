//! Upstream URL template
//!
//! Substitutes a percent-encoded outlet id for the placeholder token.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::ProxyError;

/// Characters left as-is by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone)]
pub struct UrlTemplate {
    template: String,
    placeholder: String,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            placeholder: placeholder.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn has_placeholder(&self) -> bool {
        !self.placeholder.is_empty() && self.template.contains(&self.placeholder)
    }

    /// Replace the first placeholder occurrence with the encoded id
    ///
    /// Without a placeholder the template is returned unchanged.
    pub fn render(&self, outlet_id: &str) -> String {
        if self.placeholder.is_empty() {
            return self.template.clone();
        }
        self.template
            .replacen(&self.placeholder, &encode_component(outlet_id), 1)
    }
}

/// Percent-encode a single URL component
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Decode a raw path segment into the outlet id
pub fn decode_segment(segment: &str) -> Result<String, ProxyError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| ProxyError::MalformedOutletId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_id() {
        let tpl = UrlTemplate::new("https://api.example/livestream/OutletID_PASTE/?_fmt=json", "OutletID_PASTE");
        let url = tpl.render("123");
        assert_eq!(url, "https://api.example/livestream/123/?_fmt=json");
        assert!(!url.contains("OutletID_PASTE"));
    }

    #[test]
    fn test_render_replaces_first_occurrence_only() {
        let tpl = UrlTemplate::new("http://h/ID/ID", "ID");
        assert_eq!(tpl.render("x"), "http://h/x/ID");
    }

    #[test]
    fn test_render_encodes_reserved_characters() {
        let tpl = UrlTemplate::new("http://h/feed/{id}", "{id}");
        assert_eq!(tpl.render("a b/c?d&e"), "http://h/feed/a%20b%2Fc%3Fd%26e");
        assert_eq!(tpl.render("ok-_.!~*'()"), "http://h/feed/ok-_.!~*'()");
        assert_eq!(tpl.render("é"), "http://h/feed/%C3%A9");
    }

    #[test]
    fn test_missing_placeholder() {
        let tpl = UrlTemplate::new("http://h/static", "OutletID_PASTE");
        assert!(!tpl.has_placeholder());
        assert_eq!(tpl.render("123"), "http://h/static");

        let empty = UrlTemplate::new("http://h/static", "");
        assert!(!empty.has_placeholder());
        assert_eq!(empty.render("123"), "http://h/static");
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("abc").unwrap(), "abc");
        assert_eq!(decode_segment("a%20b").unwrap(), "a b");
        assert_eq!(decode_segment("%C3%A9").unwrap(), "é");
        assert!(matches!(
            decode_segment("%FF%FE"),
            Err(ProxyError::MalformedOutletId)
        ));
    }
}
