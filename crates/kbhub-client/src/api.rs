//! Typed access to the KBHub folder REST API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kbhub_core::error::{AppError, ErrorKind};
use kbhub_core::result::AppResult;
use kbhub_core::types::FolderId;
use kbhub_entity::folder::{
    DeleteFolderOutcome, FolderChanges, FolderContents, FolderTree, FolderView,
};
use kbhub_entity::source::SourceMoveResult;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /api/folders`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FolderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Body of `PUT /api/folders/{id}`. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateFolderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    /// Moves the folder under this parent when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FolderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl UpdateFolderRequest {
    /// The attribute part of the update, without the reparent.
    pub fn changes(&self) -> FolderChanges {
        FolderChanges {
            name: self.name.as_ref().map(|n| n.trim().to_string()),
            description: self.description.clone(),
            color: self.color.clone(),
            icon: self.icon.clone(),
            position: self.position,
            metadata: self.metadata.clone(),
        }
    }
}

/// Every folder and source-placement endpoint.
#[async_trait]
pub trait FolderTransport: Send + Sync + fmt::Debug + 'static {
    /// Children of `parent_id` (roots when `None`).
    async fn list_folders(
        &self,
        parent_id: Option<FolderId>,
        include_counts: bool,
    ) -> AppResult<Vec<FolderView>>;

    /// The full folder tree.
    async fn get_tree(&self, include_sources: bool) -> AppResult<FolderTree>;

    /// One folder with its counts.
    async fn get_folder(&self, id: FolderId) -> AppResult<FolderView>;

    /// A folder with its subfolders, sources, and path.
    async fn get_folder_contents(
        &self,
        id: FolderId,
        include_sources: bool,
        include_subfolders: bool,
    ) -> AppResult<FolderContents>;

    /// Folder names from the root to `id`.
    async fn get_folder_path(&self, id: FolderId) -> AppResult<Vec<String>>;

    /// Create a folder.
    async fn create_folder(&self, request: &CreateFolderRequest) -> AppResult<FolderView>;

    /// Update a folder's attributes and optionally its parent.
    async fn update_folder(
        &self,
        id: FolderId,
        request: &UpdateFolderRequest,
    ) -> AppResult<FolderView>;

    /// Move a folder (`None` moves it to the root).
    async fn move_folder(
        &self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
    ) -> AppResult<FolderView>;

    /// Delete a folder.
    async fn delete_folder(
        &self,
        id: FolderId,
        move_contents_to_parent: bool,
    ) -> AppResult<DeleteFolderOutcome>;

    /// Place one source in a folder (`None` for the root).
    async fn move_source(
        &self,
        source_id: &str,
        folder_id: Option<FolderId>,
    ) -> AppResult<SourceMoveResult>;

    /// Place many sources in a folder.
    async fn batch_move_sources(
        &self,
        source_ids: &[String],
        folder_id: Option<FolderId>,
    ) -> AppResult<SourceMoveResult>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Serialize)]
struct MoveFolderBody {
    new_parent_id: Option<FolderId>,
}

#[derive(Serialize)]
struct MoveSourceBody {
    folder_id: Option<FolderId>,
}

#[derive(Serialize)]
struct BatchMoveBody<'a> {
    source_ids: &'a [String],
    folder_id: Option<FolderId>,
}

/// [`FolderTransport`] over HTTP.
#[derive(Clone)]
pub struct HttpFolderClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for HttpFolderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFolderClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpFolderClient {
    /// Client for the server at `base_url`, e.g. `http://localhost:8181`.
    pub fn new(base_url: &str) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;
        Self::with_client(http, base_url)
    }

    /// Client reusing an existing `reqwest::Client`.
    pub fn with_client(http: Client, base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid server URL '{base_url}'"),
                e,
            )
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::configuration(format!(
                "Server URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self { http, base_url })
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/{segments...}?{query}` with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::configuration("Server URL cannot carry a path"))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "KBHub API request");
        self.http.request(method, url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = request.send().await.map_err(|e| {
            AppError::with_source(ErrorKind::ServiceUnavailable, "KBHub server unreachable", e)
        })?;
        handle_response(response).await
    }
}

/// Unwrap a success envelope or turn an error body into an `AppError`.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
    let status = response.status();
    let text = response.text().await.map_err(|e| {
        AppError::with_source(ErrorKind::ExternalService, "Failed to read response body", e)
    })?;

    if status.is_success() {
        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Unexpected response shape", e)
        })?;
        return Ok(envelope.data);
    }

    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(AppError::new(ErrorKind::from_code(&body.error), body.message)),
        Err(_) => Err(AppError::external(format!("{status}: {text}"))),
    }
}

fn flag(value: bool) -> String {
    value.to_string()
}

#[async_trait]
impl FolderTransport for HttpFolderClient {
    async fn list_folders(
        &self,
        parent_id: Option<FolderId>,
        include_counts: bool,
    ) -> AppResult<Vec<FolderView>> {
        let mut query = vec![("include_counts", flag(include_counts))];
        if let Some(parent_id) = parent_id {
            query.push(("parent_id", parent_id.to_string()));
        }
        let url = self.endpoint(&["folders"], &query)?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn get_tree(&self, include_sources: bool) -> AppResult<FolderTree> {
        let url = self.endpoint(
            &["folders", "tree"],
            &[("include_sources", flag(include_sources))],
        )?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn get_folder(&self, id: FolderId) -> AppResult<FolderView> {
        let url = self.endpoint(&["folders", &id.to_string()], &[])?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn get_folder_contents(
        &self,
        id: FolderId,
        include_sources: bool,
        include_subfolders: bool,
    ) -> AppResult<FolderContents> {
        let url = self.endpoint(
            &["folders", &id.to_string(), "contents"],
            &[
                ("include_sources", flag(include_sources)),
                ("include_subfolders", flag(include_subfolders)),
            ],
        )?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn get_folder_path(&self, id: FolderId) -> AppResult<Vec<String>> {
        let url = self.endpoint(&["folders", &id.to_string(), "path"], &[])?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> AppResult<FolderView> {
        let url = self.endpoint(&["folders"], &[])?;
        self.send(self.request(Method::POST, url).json(request)).await
    }

    async fn update_folder(
        &self,
        id: FolderId,
        request: &UpdateFolderRequest,
    ) -> AppResult<FolderView> {
        let url = self.endpoint(&["folders", &id.to_string()], &[])?;
        self.send(self.request(Method::PUT, url).json(request)).await
    }

    async fn move_folder(
        &self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
    ) -> AppResult<FolderView> {
        let url = self.endpoint(&["folders", &id.to_string(), "move"], &[])?;
        let body = MoveFolderBody { new_parent_id };
        self.send(self.request(Method::PUT, url).json(&body)).await
    }

    async fn delete_folder(
        &self,
        id: FolderId,
        move_contents_to_parent: bool,
    ) -> AppResult<DeleteFolderOutcome> {
        let url = self.endpoint(
            &["folders", &id.to_string()],
            &[("move_contents_to_parent", flag(move_contents_to_parent))],
        )?;
        self.send(self.request(Method::DELETE, url)).await
    }

    async fn move_source(
        &self,
        source_id: &str,
        folder_id: Option<FolderId>,
    ) -> AppResult<SourceMoveResult> {
        let url = self.endpoint(&["sources", source_id, "folder"], &[])?;
        let body = MoveSourceBody { folder_id };
        self.send(self.request(Method::PUT, url).json(&body)).await
    }

    async fn batch_move_sources(
        &self,
        source_ids: &[String],
        folder_id: Option<FolderId>,
    ) -> AppResult<SourceMoveResult> {
        let url = self.endpoint(&["sources", "move"], &[])?;
        let body = BatchMoveBody {
            source_ids,
            folder_id,
        };
        self.send(self.request(Method::POST, url).json(&body)).await
    }
}
