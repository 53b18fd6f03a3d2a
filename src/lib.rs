//! # ClickUp Toolkit Library
//!
//! A resilient client for the ClickUp v2 REST API with bulk import, export and
//! mass-update support. Built for scripting and agent tooling where hundreds of
//! remote calls must be paced, retried and reported record by record.
//!
//! ## Features
//!
//! - **Shared Rate Limiting**: one process-wide budget fed by the service's own
//!   `X-RateLimit-*` headers, with a conservative local fallback
//! - **Retry Policy**: exponential backoff with jitter, idempotency aware, as a pure
//!   decision function that tests can drive without timers
//! - **Typed Entities**: tasks, lists, folders, spaces, workspaces, members and
//!   comments decoded with required-field validation at the boundary
//! - **List Aliases**: short names for list ids, persisted atomically
//! - **Bulk Engine**: batched CSV/JSON import, export and filtered updates with
//!   per-record outcomes, dry-run previews and cancellation between batches
//!
//! ## Quick Start
//!
//! ```no_run
//! use clickup_toolkit::client::{Credentials, ResourceClient};
//! use clickup_toolkit::config::Settings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let client = ResourceClient::from_settings(&settings, Credentials::api_token("pk_123"))?;
//!
//! for workspace in client.list_workspaces().await? {
//!     println!("{} {}", workspace.id, workspace.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - rate limiter, retrying transport and the typed resource client
//! - [`alias`] - list alias table and resolution
//! - [`bulk`] - job planning, batched execution and export
//! - [`output`] - CSV and JSON record codecs
//! - [`config`] - settings file and credential discovery
//! - [`cancel`] - cooperative cancellation between batches
//! - [`metrics`] - request and bulk outcome metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// List alias table and resolution
pub mod alias;

/// Bulk import, export and mass update
pub mod bulk;

/// Cooperative cancellation shared across tasks
pub mod cancel;

/// CLI command implementations
pub mod cli;

/// Rate limiting, retrying transport and typed API operations
pub mod client;

/// Settings file and credential discovery
pub mod config;

/// Metrics for requests, retries and bulk outcomes
pub mod metrics;

/// CSV and JSON record codecs
pub mod output;

pub use alias::{AliasCategory, AliasResolver};
pub use client::{ApiError, ApiResult, ResourceClient};

/// Opaque identifier of a ClickUp entity.
///
/// ClickUp returns some ids as JSON strings and others (users, teams in older
/// payloads) as numbers. Both decode into the same string-backed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Wrap an identifier string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Whether `reference` already has the shape of a raw list id.
    ///
    /// ClickUp list, folder and space ids are purely numeric, so anything made
    /// only of ASCII digits is treated as an id and never looked up as an alias.
    pub fn is_raw_reference(reference: &str) -> bool {
        !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RemoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => RemoteId(s),
            RawId::Unsigned(n) => RemoteId(n.to_string()),
            RawId::Signed(n) => RemoteId(n.to_string()),
        })
    }
}

/// Entity decoded from an API payload that must pass field validation
pub trait Entity: serde::de::DeserializeOwned {
    /// Human-readable entity name used in decode errors
    const KIND: &'static str;

    /// Check required-field invariants after decoding
    fn validate(&self) -> Result<(), String>;
}

fn require_id(kind: &str, id: &RemoteId) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{kind} id cannot be empty"));
    }
    Ok(())
}

fn require_text(kind: &str, field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{kind} {field} cannot be empty"));
    }
    Ok(())
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Priority 1
    Urgent,
    /// Priority 2
    High,
    /// Priority 3
    Normal,
    /// Priority 4
    Low,
}

impl Priority {
    /// Numeric level used by the API (1 = urgent .. 4 = low)
    pub fn level(&self) -> u8 {
        match self {
            Priority::Urgent => 1,
            Priority::High => 2,
            Priority::Normal => 3,
            Priority::Low => 4,
        }
    }

    /// Map an API level back to a priority
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Priority::Urgent),
            2 => Some(Priority::High),
            3 => Some(Priority::Normal),
            4 => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(level) = trimmed.parse::<u8>() {
            return Priority::from_level(level)
                .ok_or_else(|| format!("Invalid priority level: {level} (expected 1-4)"));
        }
        match trimmed.to_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Invalid priority: {s}")),
        }
    }
}

/// Status attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Status name (e.g. "to do", "in progress")
    pub status: String,
    /// Display color
    #[serde(default)]
    pub color: Option<String>,
    /// Status type ("open", "custom", "closed", ...)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Priority object as returned on tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityInfo {
    /// Level as a string ("1".."4")
    #[serde(default)]
    pub id: Option<String>,
    /// Label ("urgent", "high", ...)
    pub priority: String,
    /// Display color
    #[serde(default)]
    pub color: Option<String>,
}

/// A workspace member, assignee, watcher or comment author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// User id
    pub id: RemoteId,
    /// Username (ClickUp may send null for invited users)
    #[serde(default)]
    pub username: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Profile color
    #[serde(default)]
    pub color: Option<String>,
}

impl Entity for Member {
    const KIND: &'static str = "member";

    fn validate(&self) -> Result<(), String> {
        require_id(Self::KIND, &self.id)
    }
}

/// Task tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub name: String,
}

/// Reference to a parent container embedded in another entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Container id
    pub id: RemoteId,
    /// Container name
    #[serde(default)]
    pub name: Option<String>,
}

/// A ClickUp task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task id
    pub id: RemoteId,
    /// Custom task id, when the workspace enables them
    #[serde(default)]
    pub custom_id: Option<String>,
    /// Task name
    pub name: String,
    /// Markdown description
    #[serde(default)]
    pub description: Option<String>,
    /// Plain-text description
    #[serde(default)]
    pub text_content: Option<String>,
    /// Current status
    pub status: TaskStatus,
    /// Priority, if set
    #[serde(default)]
    pub priority: Option<PriorityInfo>,
    /// Assigned members
    #[serde(default)]
    pub assignees: Vec<Member>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Due date (Unix milliseconds, as sent by the API)
    #[serde(default)]
    pub due_date: Option<String>,
    /// Start date (Unix milliseconds, as sent by the API)
    #[serde(default)]
    pub start_date: Option<String>,
    /// Creation time (Unix milliseconds)
    #[serde(default)]
    pub date_created: Option<String>,
    /// Last update time (Unix milliseconds)
    #[serde(default)]
    pub date_updated: Option<String>,
    /// Parent task id for subtasks
    #[serde(default)]
    pub parent: Option<String>,
    /// Web URL
    #[serde(default)]
    pub url: Option<String>,
    /// Owning list
    #[serde(default)]
    pub list: Option<EntityRef>,
}

impl Task {
    /// Parsed priority, if the task has a recognizable one
    pub fn priority_level(&self) -> Option<Priority> {
        let info = self.priority.as_ref()?;
        info.priority
            .parse()
            .ok()
            .or_else(|| info.id.as_deref().and_then(|id| id.parse().ok()))
    }

    /// Whether `member_id` is among the assignees
    pub fn is_assigned_to(&self, member_id: &str) -> bool {
        self.assignees.iter().any(|a| a.id.as_str() == member_id)
    }
}

impl Entity for Task {
    const KIND: &'static str = "task";

    fn validate(&self) -> Result<(), String> {
        require_id(Self::KIND, &self.id)?;
        require_text(Self::KIND, "name", &self.name)?;
        require_text(Self::KIND, "status", &self.status.status)
    }
}

/// A list (the container tasks live in)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    /// List id
    pub id: RemoteId,
    /// List name
    pub name: String,
    /// List description
    #[serde(default)]
    pub content: Option<String>,
    /// Number of tasks (sent as number or string)
    #[serde(default, deserialize_with = "client::parser::lenient_count")]
    pub task_count: Option<u64>,
    /// Due date (Unix milliseconds)
    #[serde(default)]
    pub due_date: Option<String>,
    /// Archived flag
    #[serde(default, deserialize_with = "client::parser::null_as_false")]
    pub archived: bool,
    /// Owning folder
    #[serde(default)]
    pub folder: Option<EntityRef>,
    /// Owning space
    #[serde(default)]
    pub space: Option<EntityRef>,
}

impl Entity for TaskList {
    const KIND: &'static str = "list";

    fn validate(&self) -> Result<(), String> {
        require_id(Self::KIND, &self.id)?;
        require_text(Self::KIND, "name", &self.name)
    }
}

/// A folder grouping lists inside a space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder id
    pub id: RemoteId,
    /// Folder name
    pub name: String,
    /// Hidden flag
    #[serde(default, deserialize_with = "client::parser::null_as_false")]
    pub hidden: bool,
    /// Archived flag
    #[serde(default, deserialize_with = "client::parser::null_as_false")]
    pub archived: bool,
    /// Number of tasks (sent as number or string)
    #[serde(default, deserialize_with = "client::parser::lenient_count")]
    pub task_count: Option<u64>,
    /// Lists inside the folder
    #[serde(default)]
    pub lists: Vec<TaskList>,
    /// Owning space
    #[serde(default)]
    pub space: Option<EntityRef>,
}

impl Entity for Folder {
    const KIND: &'static str = "folder";

    fn validate(&self) -> Result<(), String> {
        require_id(Self::KIND, &self.id)?;
        require_text(Self::KIND, "name", &self.name)?;
        self.lists.iter().try_for_each(Entity::validate)
    }
}

/// Status definition configured on a space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDefinition {
    /// Status name
    pub status: String,
    /// Status type
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Display color
    #[serde(default)]
    pub color: Option<String>,
}

/// A space inside a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Space id
    pub id: RemoteId,
    /// Space name
    pub name: String,
    /// Private flag
    #[serde(default, deserialize_with = "client::parser::null_as_false")]
    pub private: bool,
    /// Archived flag
    #[serde(default, deserialize_with = "client::parser::null_as_false")]
    pub archived: bool,
    /// Statuses available to tasks in this space
    #[serde(default)]
    pub statuses: Vec<StatusDefinition>,
    /// Whether tasks may have several assignees
    #[serde(default, deserialize_with = "client::parser::null_as_false")]
    pub multiple_assignees: bool,
}

impl Entity for Space {
    const KIND: &'static str = "space";

    fn validate(&self) -> Result<(), String> {
        require_id(Self::KIND, &self.id)?;
        require_text(Self::KIND, "name", &self.name)
    }
}

/// Membership wrapper used in workspace payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMember {
    /// The member
    pub user: Member,
}

/// A workspace (called "team" by the v2 API)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace id
    pub id: RemoteId,
    /// Workspace name
    pub name: String,
    /// Display color
    #[serde(default)]
    pub color: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
    /// Members, when included in the payload
    #[serde(default)]
    pub members: Vec<WorkspaceMember>,
}

impl Entity for Workspace {
    const KIND: &'static str = "workspace";

    fn validate(&self) -> Result<(), String> {
        require_id(Self::KIND, &self.id)?;
        require_text(Self::KIND, "name", &self.name)?;
        self.members.iter().try_for_each(|m| m.user.validate())
    }
}

/// A comment on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id
    pub id: RemoteId,
    /// Plain-text body
    pub comment_text: String,
    /// Author
    pub user: Member,
    /// Creation time (Unix milliseconds)
    #[serde(default)]
    pub date: Option<String>,
    /// Resolved flag
    #[serde(default, deserialize_with = "client::parser::null_as_false")]
    pub resolved: bool,
}

impl Entity for Comment {
    const KIND: &'static str = "comment";

    fn validate(&self) -> Result<(), String> {
        require_id(Self::KIND, &self.id)?;
        self.user.validate()
    }
}
