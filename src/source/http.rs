//! `reqwest`-backed content source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::{debug, instrument};

use super::{ContentSource, FetchError, FetchRequest, FetchResponse};
use crate::address;
use crate::user_agent;

/// Connect timeout applied to every client.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP content source.
///
/// A pooled client is reused for plain requests. Requests that carry a proxy
/// or a cookie store get a dedicated client, because both are client-level
/// settings in `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSource {
    /// Creates a new HTTP source with the default client configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    /// This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = base_client_builder(None, None)
            .and_then(ClientBuilder::build)
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    fn client_for(&self, request: &FetchRequest) -> Result<Client, FetchError> {
        if request.proxy.is_none() && request.cookies.is_none() {
            return Ok(self.client.clone());
        }
        debug!(proxy = ?request.proxy, cookies = request.cookies.is_some(), "building dedicated client");
        base_client_builder(request.proxy.as_deref(), request.cookies.clone())
            .and_then(ClientBuilder::build)
            .map_err(|e| FetchError::network(&request.url, e))
    }
}

fn base_client_builder(
    proxy: Option<&str>,
    cookie_jar: Option<Arc<Jar>>,
) -> Result<ClientBuilder, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .gzip(true)
        .user_agent(user_agent::default_user_agent());
    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }
    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(jar);
    }
    Ok(builder)
}

#[async_trait]
impl ContentSource for HttpSource {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = address::normalize(&request.url)?;
        let client = self.client_for(&request)?;

        let mut builder = match &request.body {
            Some(body) => {
                let (bytes, content_type) = body.encode();
                let mut builder = client.post(url.clone()).headers(request.headers.clone());
                if !request.headers.contains_key(CONTENT_TYPE) {
                    builder = builder.header(CONTENT_TYPE, content_type);
                }
                builder.body(bytes)
            }
            None => client.get(url.clone()).headers(request.headers.clone()),
        };
        builder = builder.timeout(request.timeout);

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(&request.url)
            } else {
                FetchError::network(&request.url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(&request.url, status.as_u16()));
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(&request.url)
            } else {
                FetchError::network(&request.url, e)
            }
        })?;
        debug!(bytes = body.len(), status = status.as_u16(), "fetch complete");

        Ok(FetchResponse {
            body: body.to_vec(),
            headers,
            cookies: request.cookies,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::RequestBody;
    use reqwest::header::{HeaderValue, USER_AGENT};
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_source_returns_body_and_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Test", "Value")
                    .set_body_bytes(b"Hello from URL".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let source = HttpSource::new();
        let response = source
            .fetch(FetchRequest::get(format!("{}/page", mock_server.uri())))
            .await
            .unwrap();

        assert_eq!(response.body, b"Hello from URL");
        assert_eq!(response.headers.get("x-test").unwrap(), "Value");
    }

    #[tokio::test]
    async fn test_http_source_maps_404_to_http_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let source = HttpSource::new();
        let result = source
            .fetch(FetchRequest::get(format!("{}/missing", mock_server.uri())))
            .await;

        match result {
            Err(FetchError::HttpStatus { status, url }) => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/missing"));
            }
            other => panic!("Expected HttpStatus(404), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_source_invalid_url() {
        let source = HttpSource::new();
        let result = source.fetch(FetchRequest::get("not a url")).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_http_source_sends_custom_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agent"))
            .and(header("user-agent", "CustomAgent/2.0"))
            .and(header("x-api-key", "12345"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let mut request = FetchRequest::get(format!("{}/agent", mock_server.uri()));
        request
            .headers
            .insert(USER_AGENT, HeaderValue::from_static("CustomAgent/2.0"));
        request
            .headers
            .insert("x-api-key", HeaderValue::from_static("12345"));

        let response = HttpSource::new().fetch(request).await.unwrap();
        assert_eq!(response.body, b"ok");
    }

    #[tokio::test]
    async fn test_http_source_posts_form_and_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/form"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("key=value"))
            .respond_with(ResponseTemplate::new(200).set_body_string("form"))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/json"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"key":"value"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("json"))
            .mount(&mock_server)
            .await;

        let source = HttpSource::new();

        let mut form = FetchRequest::get(format!("{}/form", mock_server.uri()));
        form.body = Some(RequestBody::Form(vec![(
            "key".to_string(),
            "value".to_string(),
        )]));
        assert_eq!(source.fetch(form).await.unwrap().body, b"form");

        let mut json = FetchRequest::get(format!("{}/json", mock_server.uri()));
        json.body = Some(RequestBody::Json(serde_json::json!({"key": "value"})));
        assert_eq!(source.fetch(json).await.unwrap().body, b"json");
    }

    #[tokio::test]
    async fn test_http_source_keeps_cookie_store() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "session=abc123; Path=/")
                    .set_body_string("welcome"),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/private"))
            .and(header("cookie", "session=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
            .mount(&mock_server)
            .await;

        let source = HttpSource::new();
        let jar = Arc::new(Jar::default());

        let mut login = FetchRequest::get(format!("{}/login", mock_server.uri()));
        login.cookies = Some(Arc::clone(&jar));
        let response = source.fetch(login).await.unwrap();
        assert!(response.cookies.is_some());

        let mut private = FetchRequest::get(format!("{}/private", mock_server.uri()));
        private.cookies = response.cookies;
        assert_eq!(source.fetch(private).await.unwrap().body, b"secret");
    }
}
