//! HTTP client for the Rally Lookback API snapshot query service.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use url::Url;

use crate::{
    query::{Query, QueryDocument},
    transport::{HttpRequest, Method, ReqwestTransport, Transport},
    types::{LookbackResult, Snapshot},
    Error,
};

const DEFAULT_BASE_URL: &str = "https://rally1.rallydev.com";
const DEFAULT_VERSION_MAJOR: &str = "2";
const DEFAULT_VERSION_MINOR: &str = "0";

/// Connection settings for a [`Client`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Server base URL, including the scheme. Defaults to `https://rally1.rallydev.com`.
    pub base_url: String,
    pub version_major: String,
    pub version_minor: String,
    pub workspace: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version_major: DEFAULT_VERSION_MAJOR.to_string(),
            version_minor: DEFAULT_VERSION_MINOR.to_string(),
            workspace: None,
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("version_major", &self.version_major)
            .field("version_minor", &self.version_minor)
            .field("workspace", &self.workspace)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ClientConfig {
    /// The snapshot query URL for the configured server, version and workspace.
    pub fn query_url(&self) -> Result<Url, Error> {
        let workspace = self.workspace.as_deref().ok_or(Error::MissingWorkspace)?;
        let url = format!(
            "{}/analytics/v{}.{}/service/rally/workspace/{}/artifact/snapshot/query.js",
            self.base_url.trim_end_matches('/'),
            self.version_major,
            self.version_minor,
            workspace
        );
        Url::parse(&url).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidEndpoint(e)
        })
    }

    /// The `Authorization` header value: `Basic base64(username:password)`.
    pub fn basic_auth_header(&self) -> Result<String, Error> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                let token = STANDARD.encode(format!("{}:{}", username, password));
                Ok(format!("Basic {}", token))
            }
            _ => Err(Error::MissingCredentials),
        }
    }
}

/// Client for the Lookback API.
///
/// Configure it with chained calls, then create queries from it:
///
/// ```no_run
/// # use lookback_api::{Client, Query};
/// # async fn run() -> Result<(), lookback_api::Error> {
/// let client = Client::new()
///     .with_credentials("user@example.com", "secret")
///     .with_workspace("41529001");
///
/// let mut result = client
///     .new_query()
///     .add_find_clause("_TypeHierarchy", -51038)
///     .with_page_size(200)
///     .execute()
///     .await?;
///
/// while result.has_more_pages() {
///     result = client.query_for_next_page(&result)?.execute().await?;
/// }
/// # Ok(())
/// # }
/// ```
///
/// Configuration is read each time a query executes. Changing it while a
/// query is in flight is the caller's responsibility; no locking is done.
pub struct Client<T = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client pointing at the production Rally server, API v2.0.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: ReqwestTransport::new(),
        }
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client that sends requests through `transport`.
    pub fn with_transport(transport: T) -> Self {
        Self {
            config: ClientConfig::default(),
            transport,
        }
    }

    /// Sets the server base URL, including the scheme. Point it at an on-premise
    /// Rally server or a mock server; the query path is appended to it.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    /// Sets the username and password sent with every query as Basic auth.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.config.username = Some(username.to_string());
        self.config.password = Some(password.to_string());
        self
    }

    /// Sets the workspace queries run against. Must be readable by the user.
    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.config.workspace = Some(workspace.to_string());
        self
    }

    /// Sets the API version. Defaults to 2.0.
    pub fn with_version(mut self, major: &str, minor: &str) -> Self {
        self.config.version_major = major.to_string();
        self.config.version_minor = minor.to_string();
        self
    }

    /// The current connection settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Mutable access to the connection settings. Changes apply to the next
    /// query executed.
    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts a new, empty snapshot query.
    pub fn new_query(&self) -> LookbackQuery<'_, T> {
        LookbackQuery {
            client: self,
            document: QueryDocument::new(),
        }
    }

    /// Builds the query for the page after `result`.
    ///
    /// The new query is an independent copy of the one that produced
    /// `result`, with its start index advanced by the requested page size.
    pub fn query_for_next_page(
        &self,
        result: &LookbackResult,
    ) -> Result<LookbackQuery<'_, T>, Error> {
        let source = result.source_query().ok_or(Error::MissingSourceQuery)?;
        Ok(LookbackQuery {
            client: self,
            document: source.next_page(),
        })
    }

    /// Validates and sends `document`, returning the page the service answered with.
    pub async fn execute(&self, document: QueryDocument) -> Result<LookbackResult, Error> {
        document.validate()?;
        let body = document.to_request_body();
        let url = self.config.query_url()?;
        let auth = self.config.basic_auth_header()?;

        tracing::debug!(
            "Executing snapshot query at {} (start {}, pagesize {})",
            url,
            document.start_index(),
            document.page_size()
        );

        let request = HttpRequest {
            method: Method::POST,
            url,
            headers: vec![
                ("Authorization".to_string(), auth),
                ("Content-Type".to_string(), "application/json; charset=utf-8".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body,
        };

        let resp = self.transport.send(request).await.map_err(|e| {
            tracing::error!("Transport failed: {}", e);
            Error::TransportFailure(e)
        })?;

        let result = parse_response(resp.status, &resp.body)?;
        let result = result.validate(document).map_err(|e| {
            tracing::error!("Service reported errors: {}", e);
            e
        })?;
        if result.has_warnings() {
            tracing::warn!("Service reported warnings: {}", result.warnings.join(", "));
        }
        Ok(result)
    }

    /// Runs `document` and follows continuation queries until the last page,
    /// returning every snapshot in order. Pages are fetched one at a time.
    ///
    /// Fails with [`Error::InvalidArgument`] when the page size is zero, since
    /// the continuation would never advance. The walk also ends early if the
    /// service returns an empty page.
    pub async fn fetch_all_pages(&self, document: QueryDocument) -> Result<Vec<Snapshot>, Error> {
        if document.page_size() == 0 {
            tracing::error!("Cannot page through results with a page size of 0");
            return Err(Error::InvalidArgument(
                "page size must be greater than 0 to fetch all pages".to_string(),
            ));
        }

        let mut result = self.execute(document).await?;
        let mut snapshots = Vec::new();
        let mut pages = 1;
        while result.has_more_pages() {
            if result.results.is_empty() {
                tracing::warn!(
                    "Empty page at start {} of {}, stopping",
                    result.start_index,
                    result.total_result_count
                );
                break;
            }
            let next = self.query_for_next_page(&result)?.document;
            snapshots.append(&mut result.results);
            result = self.execute(next).await?;
            pages += 1;
        }
        snapshots.append(&mut result.results);
        tracing::debug!("Fetched {} snapshots in {} pages", snapshots.len(), pages);
        Ok(snapshots)
    }
}

/// A query under construction, bound to the [`Client`] that will run it.
pub struct LookbackQuery<'a, T = ReqwestTransport> {
    client: &'a Client<T>,
    document: QueryDocument,
}

impl<T> Query for LookbackQuery<'_, T> {
    fn document_mut(&mut self) -> &mut QueryDocument {
        &mut self.document
    }
}

impl<'a, T: Transport> LookbackQuery<'a, T> {
    /// The document built so far.
    pub fn document(&self) -> &QueryDocument {
        &self.document
    }

    /// Detaches the document from the client, e.g. to run it later with
    /// [`Client::execute`].
    pub fn into_document(self) -> QueryDocument {
        self.document
    }

    /// The request JSON this query would send.
    pub fn to_request_json(&self) -> serde_json::Value {
        self.document.to_request_json()
    }

    /// Validates and sends the query. See [`Client::execute`].
    pub async fn execute(self) -> Result<LookbackResult, Error> {
        self.client.execute(self.document).await
    }

    /// See [`Client::fetch_all_pages`].
    pub async fn fetch_all_pages(self) -> Result<Vec<Snapshot>, Error> {
        self.client.fetch_all_pages(self.document).await
    }
}

fn parse_response(status: u16, body: &[u8]) -> Result<LookbackResult, Error> {
    if status == 401 {
        tracing::error!("Authorization failed (status 401)");
        return Err(Error::AuthenticationFailed);
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        tracing::error!("No data received from server (status {})", status);
        return Err(Error::EmptyResponse { status });
    }

    // Any status other than 401 may carry an envelope; its errors are
    // checked by `LookbackResult::validate`.
    let success = (200..300).contains(&status);
    match serde_json::from_slice::<LookbackResult>(body) {
        Ok(result) => Ok(result),
        Err(e) if success => {
            let snippet = truncate_body(body);
            tracing::error!("Failed to parse resource: {} | body: {}", e, snippet);
            Err(Error::MalformedResponse(e))
        }
        Err(_) => {
            let snippet = truncate_body(body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            Err(Error::HttpStatus {
                status,
                body: snippet,
            })
        }
    }
}

fn truncate_body(body: &[u8]) -> String {
    const MAX: usize = 2000;
    let body = String::from_utf8_lossy(body);
    if body.chars().count() <= MAX {
        body.into_owned()
    } else {
        let cut: String = body.chars().take(MAX).collect();
        format!("{}...[truncated]", cut)
    }
}
