//! Domain entities and their persisted schemas

use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub sha: String,
    pub short_sha: String,
    pub date: String,
    pub message: String,
    pub author: String,
    pub email: String,
}

/// A git branch as reported by the backend
///
/// `deleted_at` and `is_reachable` are only set on entries of the deleted
/// branches log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    pub current: bool,
    pub last_commit: Commit,
    pub fully_merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reachable: Option<bool>,
    /// Fields this crate does not model, kept so they survive a round trip
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Branch {
    pub fn new(name: impl Into<String>, last_commit: Commit) -> Self {
        Self {
            name: name.into(),
            current: false,
            last_commit,
            fully_merged: false,
            deleted_at: None,
            is_reachable: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeletedBranchesState {
    pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub path: String,
    pub current_branch: String,
    pub branches_count: f64,
    pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Success,
    Danger,
    Warning,
    #[default]
    Default,
}

/// A notification as stored in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub feedback: Feedback,
    /// Milliseconds since the Unix epoch
    pub date: i64,
}

impl Notification {
    /// True for a JSON object carrying a string `message`
    pub fn is_notification(value: &Value) -> bool {
        value
            .as_object()
            .and_then(|object| object.get("message"))
            .map(Value::is_string)
            .unwrap_or(false)
    }
}

/// A notification as supplied by callers; missing fields are filled on push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub date: Option<i64>,
}

impl NotificationInput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

pub fn commit_schema() -> Schema {
    Schema::object([
        ("sha", Schema::string()),
        ("shortSha", Schema::string()),
        ("date", Schema::string()),
        ("message", Schema::string()),
        ("author", Schema::string()),
        ("email", Schema::string()),
    ])
}

/// Unknown branch fields are accepted
pub fn branch_schema() -> Schema {
    Schema::object([
        ("name", Schema::string()),
        ("current", Schema::boolean()),
        ("lastCommit", commit_schema()),
        ("fullyMerged", Schema::boolean()),
        ("deletedAt", Schema::string().optional()),
        ("isReachable", Schema::boolean().optional()),
    ])
    .passthrough()
}

pub fn repository_schema() -> Schema {
    Schema::object([
        ("branches", Schema::array(branch_schema())),
        ("path", Schema::string()),
        ("name", Schema::string()),
        ("currentBranch", Schema::string()),
        ("branchesCount", Schema::number()),
        ("id", Schema::string()),
    ])
}

pub fn deleted_branches_state_schema() -> Schema {
    Schema::object([("branches", Schema::array(branch_schema()))])
}

pub fn feedback_schema() -> Schema {
    Schema::enumeration(["success", "danger", "warning", "default"])
}

pub fn notification_schema() -> Schema {
    Schema::object([
        ("id", Schema::string()),
        ("title", Schema::string().optional()),
        ("message", Schema::string().optional()),
        ("feedback", feedback_schema()),
        ("date", Schema::integer()),
    ])
}
