//! Default `HttpClient` adapter, translating the engine's
//! method/header/body value types to and from `reqwest` (spec §11).
//! The core never imports `reqwest` itself — only this adapter does.

use async_trait::async_trait;
use reqwest::Method as ReqwestMethod;

use crate::collaborators::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::error::{AcmeError, AcmeResult};

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

fn to_reqwest_method(method: Method) -> ReqwestMethod {
    match method {
        Method::Get => ReqwestMethod::GET,
        Method::Head => ReqwestMethod::HEAD,
        Method::Post => ReqwestMethod::POST,
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> AcmeResult<HttpResponse> {
        let mut builder = self.client.request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AcmeError::Http(format!("request to {} failed: {e}", request.url)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| AcmeError::Http(format!("reading response body failed: {e}")))?
            .to_vec();

        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    use super::*;

    #[test]
    fn method_mapping_covers_all_variants() {
        assert_eq!(to_reqwest_method(Method::Get), ReqwestMethod::GET);
        assert_eq!(to_reqwest_method(Method::Head), ReqwestMethod::HEAD);
        assert_eq!(to_reqwest_method(Method::Post), ReqwestMethod::POST);
    }

    #[tokio::test]
    async fn get_reads_status_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directory"))
            .respond_with(ResponseTemplate::new(200).insert_header("replay-nonce", "nonce-abc").set_body_string("{\"ok\":true}"))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::default();
        let response = client.execute(HttpRequest::get(format!("{}/directory", server.uri()))).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.header("replay-nonce"), Some("nonce-abc"));
        assert_eq!(response.body_str(), "{\"ok\":true}");
    }

    #[tokio::test]
    async fn head_surfaces_replay_nonce_with_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/new-nonce"))
            .respond_with(ResponseTemplate::new(200).insert_header("replay-nonce", "nonce-1"))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::default();
        let response = client.execute(HttpRequest::head(format!("{}/new-nonce", server.uri()))).await.unwrap();

        assert_eq!(response.header("replay-nonce"), Some("nonce-1"));
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn post_sends_jose_content_type_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/new-order"))
            .and(header("content-type", "application/jose+json"))
            .respond_with(ResponseTemplate::new(201).insert_header("location", "https://x/order/1").set_body_string("{}"))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::default();
        let response = client
            .execute(HttpRequest::post_jose(format!("{}/new-order", server.uri()), b"{\"protected\":\"x\"}".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.header("location"), Some("https://x/order/1"));
    }

    /// Mirrors the teacher's `DirectoryResponder` in
    /// `src/acme/client.rs`'s tests: 500s twice, then succeeds.
    struct FlakyThenOkResponder {
        calls: Arc<AtomicUsize>,
    }

    impl Respond for FlakyThenOkResponder {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 {
                ResponseTemplate::new(500).set_body_string("server error")
            } else {
                ResponseTemplate::new(200).set_body_string("{\"ok\":true}")
            }
        }
    }

    #[tokio::test]
    async fn transient_5xx_passes_through_as_an_ok_response_for_the_driver_to_classify() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(FlakyThenOkResponder { calls: Arc::clone(&calls) })
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::default();
        let first = client.execute(HttpRequest::get(format!("{}/flaky", server.uri()))).await.unwrap();
        assert_eq!(first.status, 500);
        assert!(!first.is_success());

        let second = client.execute(HttpRequest::get(format!("{}/flaky", server.uri()))).await.unwrap();
        assert_eq!(second.status, 500);

        let third = client.execute(HttpRequest::get(format!("{}/flaky", server.uri()))).await.unwrap();
        assert!(third.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
