use async_trait::async_trait;

use crate::error::AcmeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

/// One outgoing request. Headers are an ordered list, not a map,
/// matching spec §4.2's "order-preserving" requirement on the
/// response side; we keep requests in the same shape for symmetry.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::Get, url: url.into(), headers: Vec::new(), body: Vec::new() }
    }

    #[must_use]
    pub fn head(url: impl Into<String>) -> Self {
        Self { method: Method::Head, url: url.into(), headers: Vec::new(), body: Vec::new() }
    }

    #[must_use]
    pub fn post_jose(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/jose+json".to_string())],
            body,
        }
    }
}

/// One complete response. `header` does order-preserving,
/// case-insensitive lookup, returning the first match — `Replay-Nonce`
/// and `Location` are both single-valued headers in practice.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Host-owned HTTP transport. Initiates one request, resolves when the
/// response is fully available (spec §4.2). The core never constructs
/// a concrete transport itself — it only holds `Arc<dyn HttpClient>`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> AcmeResult<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("Replay-Nonce".to_string(), "abc".to_string())],
            body: Vec::new(),
        };
        assert_eq!(response.header("replay-nonce"), Some("abc"));
        assert_eq!(response.header("REPLAY-NONCE"), Some("abc"));
    }

    #[test]
    fn success_range_is_2xx() {
        let mut response = HttpResponse { status: 204, ..Default::default() };
        assert!(response.is_success());
        response.status = 400;
        assert!(!response.is_success());
    }
}
