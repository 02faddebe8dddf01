//! REST client and the trait the backend selector talks to

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::instrument;
use vaultlink_core::{ApiConfig, Error, NotePath, Result, SearchHit};

/// Remote vault operations.
///
/// Implementations report every transport or protocol failure as
/// [`Error::BackendUnavailable`].
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Every note path in the vault
    async fn list_notes(&self) -> Result<Vec<String>>;

    async fn read_note(&self, path: &NotePath) -> Result<String>;

    async fn create_note(&self, path: &NotePath, content: &str) -> Result<()>;

    async fn update_note(&self, path: &NotePath, content: &str) -> Result<()>;

    async fn delete_note(&self, path: &NotePath) -> Result<()>;

    async fn move_note(&self, source: &NotePath, destination: &NotePath) -> Result<()>;

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    async fn create_folder(&self, path: &NotePath) -> Result<()>;

    /// Rename or move a folder
    async fn rename_folder(&self, source: &NotePath, destination: &NotePath) -> Result<()>;

    async fn delete_folder(&self, path: &NotePath) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct FilesResponse {
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// `/vault/{path}` with the whole path percent-encoded as one segment
pub fn note_url(base_url: &str, path: &NotePath) -> String {
    format!("{}/vault/{}", base_url, urlencoding::encode(path.as_str()))
}

/// `/folders/{path}` with the whole path percent-encoded as one segment
pub fn folder_url(base_url: &str, path: &NotePath) -> String {
    format!("{}/folders/{}", base_url, urlencoding::encode(path.as_str()))
}

/// HTTP implementation of [`VaultApi`]
#[derive(Debug, Clone)]
pub struct HttpVaultApi {
    client: Client,
    base_url: String,
}

impl HttpVaultApi {
    /// Build a client with bearer auth, JSON content type and request timeout
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !config.token.is_empty() {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|e| Error::config_error(format!("Invalid API token: {}", e)))?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::backend_unavailable(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::backend_unavailable(
                operation,
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        log::debug!("{}: HTTP {}", operation, status);
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::backend_unavailable(operation, format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl VaultApi for HttpVaultApi {
    #[instrument(skip(self), name = "api_list_notes")]
    async fn list_notes(&self) -> Result<Vec<String>> {
        let url = format!("{}/vault", self.base_url);
        let body: FilesResponse = self.send_json("list_notes", self.client.get(url)).await?;
        Ok(body.files)
    }

    #[instrument(skip(self), fields(note = %path), name = "api_read_note")]
    async fn read_note(&self, path: &NotePath) -> Result<String> {
        let url = note_url(&self.base_url, path);
        let body: ContentResponse = self.send_json("read_note", self.client.get(url)).await?;
        Ok(body.content)
    }

    #[instrument(skip(self, content), fields(note = %path), name = "api_create_note")]
    async fn create_note(&self, path: &NotePath, content: &str) -> Result<()> {
        let request = self
            .client
            .post(note_url(&self.base_url, path))
            .json(&json!({ "content": content }));
        self.send("create_note", request).await.map(drop)
    }

    #[instrument(skip(self, content), fields(note = %path), name = "api_update_note")]
    async fn update_note(&self, path: &NotePath, content: &str) -> Result<()> {
        let request = self
            .client
            .put(note_url(&self.base_url, path))
            .json(&json!({ "content": content }));
        self.send("update_note", request).await.map(drop)
    }

    #[instrument(skip(self), fields(note = %path), name = "api_delete_note")]
    async fn delete_note(&self, path: &NotePath) -> Result<()> {
        let request = self.client.delete(note_url(&self.base_url, path));
        self.send("delete_note", request).await.map(drop)
    }

    #[instrument(skip(self), fields(from = %source, to = %destination), name = "api_move_note")]
    async fn move_note(&self, source: &NotePath, destination: &NotePath) -> Result<()> {
        let request = self
            .client
            .put(format!("{}/move", note_url(&self.base_url, source)))
            .json(&json!({ "newPath": destination.as_str() }));
        self.send("move_note", request).await.map(drop)
    }

    #[instrument(skip(self), name = "api_search")]
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/search?query={}",
            self.base_url,
            urlencoding::encode(query)
        );
        let body: SearchResponse = self.send_json("search_vault", self.client.get(url)).await?;
        Ok(body.results)
    }

    #[instrument(skip(self), fields(folder = %path), name = "api_create_folder")]
    async fn create_folder(&self, path: &NotePath) -> Result<()> {
        let request = self.client.post(folder_url(&self.base_url, path));
        self.send("create_folder", request).await.map(drop)
    }

    #[instrument(skip(self), fields(from = %source, to = %destination), name = "api_rename_folder")]
    async fn rename_folder(&self, source: &NotePath, destination: &NotePath) -> Result<()> {
        let request = self
            .client
            .put(folder_url(&self.base_url, source))
            .json(&json!({ "newPath": destination.as_str() }));
        self.send("rename_folder", request).await.map(drop)
    }

    #[instrument(skip(self), fields(folder = %path), name = "api_delete_folder")]
    async fn delete_folder(&self, path: &NotePath) -> Result<()> {
        let request = self.client.delete(folder_url(&self.base_url, path));
        self.send("delete_folder", request).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn note(raw: &str) -> NotePath {
        NotePath::parse(raw).unwrap()
    }

    fn config_for(port: u16) -> ApiConfig {
        ApiConfig {
            port,
            token: "secret".to_string(),
            timeout_ms: 2_000,
            ..ApiConfig::default()
        }
    }

    /// Serve a single canned HTTP response; resolves to the raw request text
    async fn serve_once(status: &'static str, body: &'static str) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (port, handle)
    }

    #[test]
    fn test_note_url_encodes_whole_path() {
        let url = note_url("http://127.0.0.1:27123", &note("My Notes/a b.md"));
        assert_eq!(url, "http://127.0.0.1:27123/vault/My%20Notes%2Fa%20b.md");
    }

    #[test]
    fn test_folder_url() {
        let url = folder_url("http://h:1", &note("x/y"));
        assert_eq!(url, "http://h:1/folders/x%2Fy");
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let config = ApiConfig {
            token: "bad\ntoken".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            HttpVaultApi::new(&config),
            Err(Error::ConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_backend_unavailable() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let api = HttpVaultApi::new(&config_for(port)).unwrap();

        let err = api.read_note(&note("a.md")).await.unwrap_err();
        assert!(err.is_backend_unavailable());
    }

    #[tokio::test]
    async fn test_silent_api_times_out_as_backend_unavailable() {
        // Accepts the connection and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            drop(socket);
        });

        let api = HttpVaultApi::new(&ApiConfig {
            timeout_ms: 200,
            ..config_for(port)
        })
        .unwrap();

        let started = std::time::Instant::now();
        let err = api.read_note(&note("slow.md")).await.unwrap_err();
        assert!(err.is_backend_unavailable());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        server.abort();
    }

    #[tokio::test]
    async fn test_read_note_sends_auth_and_parses_content() {
        let (port, server) = serve_once("200 OK", r##"{"content":"# Hello"}"##).await;
        let api = HttpVaultApi::new(&config_for(port)).unwrap();

        let content = api.read_note(&note("dir/a.md")).await.unwrap();
        assert_eq!(content, "# Hello");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /vault/dir%2Fa.md HTTP/1.1\r\n"));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_missing_fields_default_to_empty() {
        let (port, server) = serve_once("200 OK", "{}").await;
        let api = HttpVaultApi::new(&config_for(port)).unwrap();

        assert!(api.list_notes().await.unwrap().is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_update_note_sends_json_body() {
        let (port, server) = serve_once("200 OK", "{}").await;
        let api = HttpVaultApi::new(&config_for(port)).unwrap();

        api.update_note(&note("n.md"), "body text").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /vault/n.md HTTP/1.1\r\n"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"content":"body text"}"#));
    }

    #[tokio::test]
    async fn test_error_status_is_backend_unavailable() {
        let (port, server) = serve_once("404 Not Found", r#"{"error":"missing"}"#).await;
        let api = HttpVaultApi::new(&config_for(port)).unwrap();

        let err = api.delete_note(&note("gone.md")).await.unwrap_err();
        match err {
            Error::BackendUnavailable { operation, reason } => {
                assert_eq!(operation, "delete_note");
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_search_parses_results() {
        let (port, server) = serve_once(
            "200 OK",
            r#"{"results":[{"filename":"a.md","score":0.5,"matches":[{"line":3}]}]}"#,
        )
        .await;
        let api = HttpVaultApi::new(&config_for(port)).unwrap();

        let hits = api.search("two words").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "a.md");
        assert_eq!(hits[0].matches[0].line, 3);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /search?query=two%20words HTTP/1.1\r\n"));
    }
}
