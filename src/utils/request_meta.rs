//! Per-request attribution extracted from headers.

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use std::net::SocketAddr;

/// Source tag recorded for requests arriving from the quote funnel page.
pub const QUOTE_PAGE_SOURCE: &str = "quote.html";

/// Identity attached to every usage log entry.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub ip: String,
    pub source: String,
}

impl RequestMeta {
    pub fn from_request(req: &HttpRequest) -> Self {
        let referer = header_str(req.headers(), "referer").unwrap_or("");
        let source = if referer.contains("quote.html") || referer.contains("/quote") {
            QUOTE_PAGE_SOURCE.to_string()
        } else {
            "other".to_string()
        };
        Self {
            ip: client_ip(req.headers(), req.peer_addr()),
            source,
        }
    }
}

/// Best-effort client address: proxy headers first, then the socket peer.
/// Requests with no identity at all share the "unknown" bucket, which keeps
/// them rate limited rather than unlimited.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = header_str(headers, "x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use pretty_assertions::assert_eq;

    #[test]
    fn forwarded_header_wins_over_peer() {
        let req = TestRequest::default()
            .insert_header(("x-forwarded-for", "203.0.113.7, 10.0.0.1"))
            .insert_header(("x-real-ip", "198.51.100.2"))
            .peer_addr("192.0.2.1:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(client_ip(req.headers(), req.peer_addr()), "203.0.113.7");
    }

    #[test]
    fn real_ip_used_when_no_forwarded_header() {
        let req = TestRequest::default()
            .insert_header(("x-real-ip", "198.51.100.2"))
            .to_http_request();
        assert_eq!(client_ip(req.headers(), req.peer_addr()), "198.51.100.2");
    }

    #[test]
    fn missing_identity_falls_back_to_unknown() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(client_ip(req.headers(), req.peer_addr()), "unknown");
    }

    #[test]
    fn quote_page_referer_sets_source_tag() {
        let req = TestRequest::default()
            .insert_header(("referer", "https://example.com/quote.html?step=2"))
            .to_http_request();
        assert_eq!(RequestMeta::from_request(&req).source, "quote.html");

        let req = TestRequest::default()
            .insert_header(("referer", "https://example.com/pricing"))
            .to_http_request();
        assert_eq!(RequestMeta::from_request(&req).source, "other");

        let req = TestRequest::default().to_http_request();
        assert_eq!(RequestMeta::from_request(&req).source, "other");
    }
}
