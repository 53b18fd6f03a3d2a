//! Request payloads for task writes and task queries

use serde::Serialize;

/// Body of a task creation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewTask {
    /// Task name
    pub name: String,
    /// Markdown description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Initial status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Priority level 1-4
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Due date, Unix milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    /// Start date, Unix milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i64>,
    /// Assignee user ids
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<u64>,
    /// Tag names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewTask {
    /// Task with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Validate before sending
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("task name cannot be empty".to_string());
        }
        validate_priority(self.priority)
    }
}

/// Assignee additions and removals of a task update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssigneeChanges {
    /// User ids to add
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<u64>,
    /// User ids to remove
    #[serde(rename = "rem", skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<u64>,
}

impl AssigneeChanges {
    /// No changes
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Body of a task update. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    /// New name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// New priority level 1-4
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// New due date, Unix milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    /// New start date, Unix milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i64>,
    /// Assignee changes
    #[serde(skip_serializing_if = "AssigneeChanges::is_empty")]
    pub assignees: AssigneeChanges,
}

impl TaskUpdate {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.start_date.is_none()
            && self.assignees.is_empty()
    }

    /// Validate before sending
    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("update has no fields to change".to_string());
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err("task name cannot be empty".to_string());
        }
        if matches!(&self.status, Some(status) if status.trim().is_empty()) {
            return Err("status cannot be empty".to_string());
        }
        validate_priority(self.priority)
    }
}

fn validate_priority(priority: Option<u8>) -> Result<(), String> {
    match priority {
        Some(level) if !(1..=4).contains(&level) => {
            Err(format!("priority must be between 1 and 4, got {level}"))
        }
        _ => Ok(()),
    }
}

/// Server-side filters for task listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Zero-based page
    pub page: Option<u32>,
    /// Only tasks in these statuses
    pub statuses: Vec<String>,
    /// Only tasks assigned to these user ids
    pub assignees: Vec<String>,
    /// Include tasks in closed statuses
    pub include_closed: bool,
    /// Include subtasks
    pub subtasks: bool,
}

impl TaskQuery {
    /// Copy of the query targeting `page`
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    /// Query parameters in ClickUp's array notation
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        for status in &self.statuses {
            params.push(("statuses[]".to_string(), status.clone()));
        }
        for assignee in &self.assignees {
            params.push(("assignees[]".to_string(), assignee.clone()));
        }
        if self.include_closed {
            params.push(("include_closed".to_string(), "true".to_string()));
        }
        if self.subtasks {
            params.push(("subtasks".to_string(), "true".to_string()));
        }
        params
    }
}
