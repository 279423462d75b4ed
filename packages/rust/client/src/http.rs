//! `reqwest`-backed [`JobApi`] implementation.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use alignwatch_shared::{AlignwatchError, ClientConfig, Result};

use crate::api::{ApiRequest, JobApi};

/// Maximum number of redirects to follow (presigned links may redirect once).
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept (64 MB; frame bundles can be large).
const MAX_RESPONSE_SIZE: u64 = 64 * 1024 * 1024;

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("alignwatch/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the results server.
#[derive(Debug, Clone)]
pub struct HttpJobApi {
    config: ClientConfig,
    client: Client,
    max_response_size: u64,
}

impl HttpJobApi {
    /// Build a client with the configured timeout and redirect policy.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .build()
            .map_err(|e| AlignwatchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Override the response body cap (bytes).
    pub fn with_max_response_size(mut self, bytes: u64) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Resolve a request to its URL. The second value is `true` when the URL
    /// points at our own server (as opposed to a presigned artifact link).
    pub fn resolve(&self, request: &ApiRequest<'_>) -> Result<(Url, bool)> {
        let endpoints = &self.config.endpoints;
        match *request {
            ApiRequest::Status { job_id } => Ok((
                self.expand(&endpoints.status, &[("job_id", job_id.as_str())])?,
                true,
            )),
            ApiRequest::Artifact { job_id, key } => {
                if let Some(direct) = absolute_http_url(key.as_str()) {
                    return Ok((direct, false));
                }
                Ok((
                    self.expand(
                        &endpoints.artifact,
                        &[("job_id", job_id.as_str()), ("key", key.as_str())],
                    )?,
                    true,
                ))
            }
            ApiRequest::Hits { job_id, target } => Ok((
                self.expand(
                    &endpoints.hits,
                    &[("job_id", job_id.as_str()), ("target", target)],
                )?,
                true,
            )),
            ApiRequest::Frames { job_id, input } => Ok((
                self.expand(
                    &endpoints.frames,
                    &[("job_id", job_id.as_str()), ("input", input)],
                )?,
                true,
            )),
        }
    }

    /// Expand a `path/{var}?q={var}` template against the base URL.
    ///
    /// Path values are pushed as single percent-encoded segments, so a `/` in
    /// an input name cannot escape its segment.
    fn expand(&self, template: &str, vars: &[(&str, &str)]) -> Result<Url> {
        let (path_tpl, query_tpl) = match template.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (template, None),
        };

        let mut url = self.config.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AlignwatchError::config(format!(
                    "base_url '{}' cannot be a base",
                    self.config.base_url
                ))
            })?;
            segments.pop_if_empty();
            for segment in path_tpl.split('/').filter(|s| !s.is_empty()) {
                segments.push(&substitute(segment, vars));
            }
        }

        if let Some(query) = query_tpl {
            let mut pairs = url.query_pairs_mut();
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                pairs.append_pair(name, &substitute(value, vars));
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    #[instrument(skip_all, fields(kind = request.kind(), job_id = %request.job_id()))]
    async fn get_json(&self, request: ApiRequest<'_>) -> Result<serde_json::Value> {
        let (url, own_server) = self.resolve(&request)?;
        let shown = redacted(&url);
        debug!(url = %shown, "GET");

        let mut builder = self.client.get(url);
        // Presigned links carry their own signature and reject extra auth
        if own_server {
            if let Some(token) = &self.config.token {
                builder = builder.bearer_auth(token);
            }
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| AlignwatchError::Network(format!("{shown}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlignwatchError::Network(format!("{shown}: HTTP {status}")));
        }

        let max = self.max_response_size;
        let too_large = |len: u64| {
            AlignwatchError::malformed(format!(
                "{shown}: response too large ({len} bytes, max {max})"
            ))
        };
        if let Some(len) = response.content_length() {
            if len > max {
                return Err(too_large(len));
            }
        }

        // Chunked bodies carry no length up front; count as they arrive.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AlignwatchError::Network(format!("{shown}: failed to read body: {e}")))?
        {
            if !append_capped(&mut body, &chunk, max) {
                return Err(too_large((body.len() + chunk.len()) as u64));
            }
        }

        serde_json::from_slice(&body)
            .map_err(|e| AlignwatchError::malformed(format!("{shown}: body is not JSON: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append `chunk` unless that would take `body` past `max` bytes.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], max: u64) -> bool {
    if (body.len() + chunk.len()) as u64 > max {
        return false;
    }
    body.extend_from_slice(chunk);
    true
}

fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

fn absolute_http_url(key: &str) -> Option<Url> {
    Url::parse(key)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// URL without its query string (presigned signatures stay out of logs).
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignwatch_shared::{ArtifactKey, JobId};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(base: &str) -> HttpJobApi {
        HttpJobApi::new(ClientConfig::new(base).expect("config")).expect("client")
    }

    fn job() -> JobId {
        "job-1".parse().unwrap()
    }

    #[test]
    fn resolves_default_templates() {
        let api = api_for("https://align.example.org/api");
        let job = job();

        let (url, own) = api.resolve(&ApiRequest::Status { job_id: &job }).unwrap();
        assert_eq!(url.as_str(), "https://align.example.org/api/status/job-1");
        assert!(own);

        let key = ArtifactKey("tmp/job-1/alignment_res.json".into());
        let (url, own) = api
            .resolve(&ApiRequest::Artifact { job_id: &job, key: &key })
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://align.example.org/api/retrieveArtifact?key=tmp%2Fjob-1%2Falignment_res.json"
        );
        assert!(own);
    }

    #[test]
    fn path_values_are_single_encoded_segments() {
        let api = api_for("http://localhost:8000");
        let job = job();
        let (url, _) = api
            .resolve(&ApiRequest::Frames { job_id: &job, input: "seq 1/a" })
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/frames/job-1/seq%201%2Fa");
    }

    #[test]
    fn absolute_keys_are_fetched_directly() {
        let api = api_for("http://localhost:8000");
        let job = job();
        let key = ArtifactKey("https://bucket.s3.amazonaws.com/tmp/f.json?X-Amz-Signature=abc".into());
        let (url, own) = api
            .resolve(&ApiRequest::Artifact { job_id: &job, key: &key })
            .unwrap();
        assert_eq!(url.host_str(), Some("bucket.s3.amazonaws.com"));
        assert!(!own);
        assert_eq!(redacted(&url), "https://bucket.s3.amazonaws.com/tmp/f.json");
    }

    #[test]
    fn custom_templates_are_honoured() {
        let mut config = ClientConfig::new("http://localhost:8000").unwrap();
        config.endpoints.hits = "results/{job_id}/tophits/{target}".into();
        let api = HttpJobApi::new(config).unwrap();
        let job = job();
        let (url, _) = api
            .resolve(&ApiRequest::Hits { job_id: &job, target: "GFP" })
            .unwrap();
        assert_eq!(url.path(), "/results/job-1/tophits/GFP");
    }

    #[tokio::test]
    async fn status_body_is_returned_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"job_id": "job-1", "status": "PENDING"}"#),
            )
            .mount(&server)
            .await;

        let api = api_for(&server.uri());
        let job = job();
        let body = api.get_json(ApiRequest::Status { job_id: &job }).await.unwrap();
        assert_eq!(body["status"], "PENDING");
    }

    #[tokio::test]
    async fn non_2xx_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let api = api_for(&server.uri());
        let job = job();
        let err = api
            .get_json(ApiRequest::Status { job_id: &job })
            .await
            .unwrap_err();
        assert!(matches!(err, AlignwatchError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let api = api_for(&server.uri());
        let job = job();
        let err = api
            .get_json(ApiRequest::Status { job_id: &job })
            .await
            .unwrap_err();
        assert!(matches!(err, AlignwatchError::MalformedPayload { .. }));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start().await;
        let padding = "A".repeat(64);
        Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"{{"status": "PENDING", "pad": "{padding}"}}"#)),
            )
            .mount(&server)
            .await;

        let api = api_for(&server.uri()).with_max_response_size(16);
        let job = job();
        let err = api
            .get_json(ApiRequest::Status { job_id: &job })
            .await
            .unwrap_err();
        assert!(matches!(err, AlignwatchError::MalformedPayload { .. }));
        assert!(err.to_string().contains("too large"));
        assert!(err.to_string().contains("max 16"));
    }

    #[tokio::test]
    async fn body_within_the_cap_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status": "PENDING"}"#))
            .mount(&server)
            .await;

        let api = api_for(&server.uri()).with_max_response_size(64);
        let job = job();
        let body = api.get_json(ApiRequest::Status { job_id: &job }).await.unwrap();
        assert_eq!(body["status"], "PENDING");
    }

    #[test]
    fn streamed_chunks_stop_at_the_cap() {
        let mut body = Vec::new();
        assert!(append_capped(&mut body, b"{\"a\":", 10));
        assert!(append_capped(&mut body, b"1}", 10));
        assert!(!append_capped(&mut body, b"    ", 10));
        assert_eq!(body, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn artifact_key_goes_in_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/retrieveArtifact"))
            .and(query_param("key", "tmp/job-1/top_hits.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"GFP": []}"#))
            .mount(&server)
            .await;

        let api = api_for(&server.uri());
        let job = job();
        let key = ArtifactKey("tmp/job-1/top_hits.json".into());
        let body = api
            .get_json(ApiRequest::Artifact { job_id: &job, key: &key })
            .await
            .unwrap();
        assert!(body["GFP"].is_array());
    }

    #[tokio::test]
    async fn token_sent_to_server_but_not_to_presigned_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status": "PENDING"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presigned/frames.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let mut config = ClientConfig::new(&server.uri()).unwrap();
        config.token = Some("s3cret".into());
        let api = HttpJobApi::new(config).unwrap();
        let job = job();

        api.get_json(ApiRequest::Status { job_id: &job }).await.unwrap();

        let key = ArtifactKey(format!("{}/presigned/frames.json?sig=1", server.uri()));
        api.get_json(ApiRequest::Artifact { job_id: &job, key: &key })
            .await
            .unwrap();

        let requests = server.received_requests().await.expect("recording enabled");
        let presigned = requests
            .iter()
            .find(|r| r.url.path() == "/presigned/frames.json")
            .expect("presigned request");
        assert!(!presigned.headers.contains_key("authorization"));
    }
}
