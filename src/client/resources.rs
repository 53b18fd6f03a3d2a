//! Typed ClickUp operations

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::config::TASK_PAGE_SIZE;
use super::envelope::RequestEnvelope;
use super::http::RetryingTransport;
use super::parser::{self, TaskPage};
use super::payload::{NewTask, TaskQuery, TaskUpdate};
use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;
use super::transport::{Credentials, ReqwestTransport};
use super::{ApiError, ApiResult};
use crate::config::Settings;
use crate::{Comment, Entity, Folder, Member, RemoteId, Space, Task, TaskList, Workspace};

/// Identity behind the configured credentials
#[derive(Debug, Clone, PartialEq)]
pub struct AuthReport {
    /// Authenticated user
    pub user: Member,
    /// Workspaces the credentials can access
    pub workspaces: Vec<Workspace>,
}

/// Member entries come either wrapped (`{"user": {...}}`) or flat
#[derive(Deserialize)]
#[serde(untagged)]
enum MemberEntry {
    Wrapped { user: Member },
    Flat(Member),
}

impl MemberEntry {
    fn into_member(self) -> Member {
        match self {
            MemberEntry::Wrapped { user } | MemberEntry::Flat(user) => user,
        }
    }
}

impl Entity for MemberEntry {
    const KIND: &'static str = "member";

    fn validate(&self) -> Result<(), String> {
        match self {
            MemberEntry::Wrapped { user } | MemberEntry::Flat(user) => user.validate(),
        }
    }
}

/// Typed operations over the retrying transport.
///
/// Each operation checks its identifiers before building an envelope and
/// decodes the response with field validation. Nothing is cached, so a failed
/// call leaves no state behind.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    transport: RetryingTransport,
}

impl ResourceClient {
    /// Client over an already configured transport
    pub fn new(transport: RetryingTransport) -> Self {
        Self { transport }
    }

    /// Production client: reqwest transport, per-minute limiter and retry policy from `settings`
    pub fn from_settings(settings: &Settings, credentials: Credentials) -> ApiResult<Self> {
        let inner = ReqwestTransport::new(
            settings.base_url.clone(),
            credentials,
            Duration::from_secs(settings.timeout_secs),
            Duration::from_secs(settings.connect_timeout_secs),
        )?;
        let limiter = Arc::new(RateLimiter::per_minute(settings.requests_per_minute));
        let transport = RetryingTransport::new(Arc::new(inner), limiter)
            .with_policy(RetryPolicy::default().with_max_retries(settings.max_retries));
        Ok(Self::new(transport))
    }

    /// Underlying transport
    pub fn transport(&self) -> &RetryingTransport {
        &self.transport
    }

    async fn call(&self, envelope: RequestEnvelope) -> ApiResult<String> {
        let response = self.transport.execute(&envelope).await?;
        Ok(response.body)
    }

    // Workspaces and users

    /// Workspaces visible to the credentials
    pub async fn list_workspaces(&self) -> ApiResult<Vec<Workspace>> {
        let body = self.call(RequestEnvelope::get("/team")).await?;
        parser::decode_list(&body, "teams")
    }

    /// One workspace
    pub async fn get_workspace(&self, workspace_id: &str) -> ApiResult<Workspace> {
        require_id("workspace", workspace_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/team/{workspace_id}")))
            .await?;
        parser::decode_field(&body, "team")
    }

    /// Members of a workspace
    pub async fn list_members(&self, workspace_id: &str) -> ApiResult<Vec<Member>> {
        require_id("workspace", workspace_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/team/{workspace_id}/member")))
            .await?;
        let entries: Vec<MemberEntry> = parser::decode_list(&body, "members")?;
        Ok(entries.into_iter().map(MemberEntry::into_member).collect())
    }

    /// User owning the credentials
    pub async fn current_user(&self) -> ApiResult<Member> {
        let body = self.call(RequestEnvelope::get("/user")).await?;
        parser::decode_field(&body, "user")
    }

    /// Check the credentials and report who they belong to
    pub async fn validate_auth(&self) -> ApiResult<AuthReport> {
        let user = self.current_user().await?;
        let workspaces = self.list_workspaces().await?;
        info!(
            user_id = %user.id,
            workspaces = workspaces.len(),
            "Credentials validated"
        );
        Ok(AuthReport { user, workspaces })
    }

    // Spaces, folders, lists

    /// Spaces in a workspace
    pub async fn list_spaces(&self, workspace_id: &str) -> ApiResult<Vec<Space>> {
        require_id("workspace", workspace_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/team/{workspace_id}/space")))
            .await?;
        parser::decode_list(&body, "spaces")
    }

    /// One space
    pub async fn get_space(&self, space_id: &str) -> ApiResult<Space> {
        require_id("space", space_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/space/{space_id}")))
            .await?;
        parser::decode(&body)
    }

    /// Folders in a space
    pub async fn list_folders(&self, space_id: &str) -> ApiResult<Vec<Folder>> {
        require_id("space", space_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/space/{space_id}/folder")))
            .await?;
        parser::decode_list(&body, "folders")
    }

    /// One folder
    pub async fn get_folder(&self, folder_id: &str) -> ApiResult<Folder> {
        require_id("folder", folder_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/folder/{folder_id}")))
            .await?;
        parser::decode(&body)
    }

    /// Lists in a folder
    pub async fn list_lists(&self, folder_id: &str) -> ApiResult<Vec<TaskList>> {
        require_id("folder", folder_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/folder/{folder_id}/list")))
            .await?;
        parser::decode_list(&body, "lists")
    }

    /// Lists placed directly in a space
    pub async fn list_folderless_lists(&self, space_id: &str) -> ApiResult<Vec<TaskList>> {
        require_id("space", space_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/space/{space_id}/list")))
            .await?;
        parser::decode_list(&body, "lists")
    }

    /// One list
    pub async fn get_list(&self, list_id: &str) -> ApiResult<TaskList> {
        require_id("list", list_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/list/{list_id}")))
            .await?;
        parser::decode(&body)
    }

    /// Create a list in a folder
    pub async fn create_list(
        &self,
        folder_id: &str,
        name: &str,
        content: Option<&str>,
    ) -> ApiResult<TaskList> {
        require_id("folder", folder_id)?;
        if name.trim().is_empty() {
            return Err(ApiError::Validation("list name cannot be empty".to_string()));
        }
        let mut payload = json!({ "name": name });
        if let Some(content) = content {
            payload["content"] = Value::String(content.to_string());
        }
        let body = self
            .call(RequestEnvelope::post(format!("/folder/{folder_id}/list"), payload))
            .await?;
        parser::decode(&body)
    }

    // Tasks

    /// One page of tasks in a list
    pub async fn list_tasks(&self, list_id: &str, query: &TaskQuery) -> ApiResult<TaskPage> {
        require_id("list", list_id)?;
        let envelope =
            RequestEnvelope::get(format!("/list/{list_id}/task")).with_query(query.to_params());
        let body = self.call(envelope).await?;
        parser::decode_task_page(&body)
    }

    /// Every task in a list, following pages until the last one
    pub async fn list_all_tasks(&self, list_id: &str, query: &TaskQuery) -> ApiResult<Vec<Task>> {
        let mut tasks = Vec::new();
        let mut page = query.page.unwrap_or(0);

        loop {
            let TaskPage {
                tasks: batch,
                last_page,
            } = self.list_tasks(list_id, &query.with_page(page)).await?;
            let fetched = batch.len();
            tasks.extend(batch);
            debug!(list_id = %list_id, page = page, fetched = fetched, "Fetched task page");

            if last_page || fetched < TASK_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(tasks)
    }

    /// One task
    pub async fn get_task(&self, task_id: &str) -> ApiResult<Task> {
        require_id("task", task_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/task/{task_id}")))
            .await?;
        parser::decode(&body)
    }

    /// Create a task. Not retried once the request may have been sent.
    pub async fn create_task(&self, list_id: &str, task: &NewTask) -> ApiResult<Task> {
        let body = self.call(create_task_envelope(list_id, task)?).await?;
        parser::decode(&body)
    }

    /// Apply an update to a task
    pub async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> ApiResult<Task> {
        let body = self.call(update_task_envelope(task_id, update)?).await?;
        parser::decode(&body)
    }

    /// Delete a task
    pub async fn delete_task(&self, task_id: &str) -> ApiResult<()> {
        require_id("task", task_id)?;
        self.call(RequestEnvelope::delete(format!("/task/{task_id}")))
            .await?;
        Ok(())
    }

    /// Tasks in a workspace whose name or description contains `text`.
    ///
    /// The team task endpoint has no free-text filter, so the server-side
    /// `query` filters are applied remotely and `text` is matched locally on
    /// the returned page.
    pub async fn search_tasks(
        &self,
        workspace_id: &str,
        text: &str,
        query: &TaskQuery,
    ) -> ApiResult<Vec<Task>> {
        require_id("workspace", workspace_id)?;
        let envelope = RequestEnvelope::get(format!("/team/{workspace_id}/task"))
            .with_query(query.to_params());
        let body = self.call(envelope).await?;
        let page = parser::decode_task_page(&body)?;

        let needle = text.trim().to_lowercase();
        Ok(page
            .tasks
            .into_iter()
            .filter(|task| {
                needle.is_empty()
                    || task.name.to_lowercase().contains(&needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect())
    }

    // Comments

    /// Comments on a task
    pub async fn list_comments(&self, task_id: &str) -> ApiResult<Vec<Comment>> {
        require_id("task", task_id)?;
        let body = self
            .call(RequestEnvelope::get(format!("/task/{task_id}/comment")))
            .await?;
        parser::decode_list(&body, "comments")
    }

    /// Add a comment to a task and return the new comment id
    pub async fn create_comment(&self, task_id: &str, text: &str) -> ApiResult<RemoteId> {
        require_id("task", task_id)?;
        if text.trim().is_empty() {
            return Err(ApiError::Validation("comment text cannot be empty".to_string()));
        }
        let envelope = RequestEnvelope::post(
            format!("/task/{task_id}/comment"),
            json!({ "comment_text": text }),
        );
        let body = self.call(envelope).await?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("malformed JSON: {e}")))?;
        let id = value
            .get("id")
            .cloned()
            .ok_or_else(|| ApiError::Decode("missing `id` field".to_string()))?;
        let id: RemoteId = serde_json::from_value(id)
            .map_err(|e| ApiError::Decode(format!("invalid comment id: {e}")))?;
        if id.is_empty() {
            return Err(ApiError::Decode("comment id cannot be empty".to_string()));
        }
        Ok(id)
    }
}

/// Envelope creating `task` in `list_id`, validated but not sent
pub fn create_task_envelope(list_id: &str, task: &NewTask) -> ApiResult<RequestEnvelope> {
    require_id("list", list_id)?;
    task.validate().map_err(ApiError::Validation)?;
    let payload = serde_json::to_value(task)
        .map_err(|e| ApiError::Validation(format!("unserializable task: {e}")))?;
    Ok(RequestEnvelope::post(format!("/list/{list_id}/task"), payload))
}

/// Envelope applying `update` to `task_id`, validated but not sent
pub fn update_task_envelope(task_id: &str, update: &TaskUpdate) -> ApiResult<RequestEnvelope> {
    require_id("task", task_id)?;
    update.validate().map_err(ApiError::Validation)?;
    let payload = serde_json::to_value(update)
        .map_err(|e| ApiError::Validation(format!("unserializable update: {e}")))?;
    Ok(RequestEnvelope::put(format!("/task/{task_id}"), payload))
}

fn require_id(kind: &str, id: &str) -> ApiResult<()> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{kind} id cannot be empty")));
    }
    if trimmed.contains(['/', '?', '#']) || trimmed.chars().any(char::is_whitespace) {
        return Err(ApiError::Validation(format!("invalid {kind} id: {id:?}")));
    }
    Ok(())
}
