use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Keyed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Draft,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Designer,
    Developer,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Public,
    Private,
}

/// One task row as the backend stores it. Identifiers are opaque strings
/// minted by the backend; the client never fabricates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub client_name: Option<String>,
    pub budget: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
    pub progress: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub department: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub content: String,
    pub reply_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Keyed for Task {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for Project {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for Profile {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for Channel {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for Message {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Field-wise partial update: every populated field replaces the stored one,
/// everything else is carried over unchanged.
pub trait Delta<R> {
    fn merged(&self, record: &R) -> R;
}

/// Partial task update sent to the backend as a JSON object containing only
/// the populated fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskDelta {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Delta<Task> for TaskDelta {
    fn merged(&self, record: &Task) -> Task {
        let mut merged = record.clone();
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(priority) = self.priority {
            merged.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            merged.assigned_to = Some(assigned_to.clone());
        }
        if let Some(due_date) = self.due_date {
            merged.due_date = Some(due_date);
        }
        merged
    }
}

/// Outgoing message row; the backend fills in id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDraft {
    pub channel_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl MessageDraft {
    pub fn text(
        channel_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
        reply_to: Option<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            sender_id: sender_id.into(),
            content: content.into(),
            message_type: "text",
            reply_to,
        }
    }
}
