use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type ProjectId = i64;
pub type TaskId = i64;

/// The four fixed board columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnId {
    Todo,
    InProgress,
    Review,
    Done,
}

impl ColumnId {
    pub const ALL: [ColumnId; 4] = [
        ColumnId::Todo,
        ColumnId::InProgress,
        ColumnId::Review,
        ColumnId::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Review => "In Review",
            Self::Done => "Done",
        }
    }

    /// Position of this column within [`ColumnId::ALL`].
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Review => 2,
            Self::Done => 3,
        }
    }

    /// `done` is the only terminal column.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in-progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Aggregate task counters for one project. `completed <= total` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: u32,
    pub completed: u32,
}

impl TaskStats {
    pub fn pending(&self) -> u32 {
        self.total.saturating_sub(self.completed)
    }

    /// Completion percentage, rounded to the nearest integer. 0 for an empty project.
    pub fn progress(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (f64::from(self.completed) * 100.0 / f64::from(self.total)).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

/// A persisted task as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub column_id: ColumnId,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn card(&self) -> TaskCard {
        TaskCard {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            completed: self.completed,
        }
    }
}

/// A task as it appears inside a board column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCard {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnView {
    pub id: ColumnId,
    pub name: String,
    pub tasks: Vec<TaskCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the server on every mutation of the project or its tasks.
    pub version: u64,
    #[serde(rename = "tasks")]
    pub task_stats: TaskStats,
    #[serde(default)]
    pub progress: u8,
}

/// Full board snapshot for one project, as served by `GET /api/projects/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBoard {
    #[serde(flatten)]
    pub summary: ProjectSummary,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: u32,
    pub completed_tasks: u32,
    pub pending_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ── Request bodies (client side, typed) ───────────────────────────────

/// Body of `POST /api/projects/{id}/tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub column_id: ColumnId,
    #[serde(default)]
    pub priority: Priority,
}

impl NewTask {
    pub fn new(title: impl Into<String>, column_id: ColumnId) -> Self {
        Self {
            title: title.into(),
            description: None,
            column_id,
            priority: Priority::default(),
        }
    }
}

/// Body of `PATCH /api/projects/{id}/tasks/{taskId}`. Absent fields are left alone;
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<ColumnId>,
}

/// Distinguishes an explicit JSON `null` (`Some(None)`) from an absent field (`None`).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ── Response envelopes ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEnvelope<T> {
    pub project: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProject {
    pub message: String,
    pub project: ProjectSummary,
}

/// Acknowledgement of a task create or update, carrying the project's new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAck {
    pub message: String,
    pub task: Task,
    pub version: u64,
}

/// Acknowledgement of a task deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAck {
    pub message: String,
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_id_round_trips_through_wire_names() {
        for column in ColumnId::ALL {
            assert_eq!(ColumnId::from_str(column.as_str()).unwrap(), column);
            let json = serde_json::to_string(&column).unwrap();
            assert_eq!(json, format!("\"{}\"", column.as_str()));
        }
        assert!(ColumnId::from_str("backlog").is_err());
    }

    #[test]
    fn test_only_done_is_terminal() {
        let terminal: Vec<_> = ColumnId::ALL.iter().filter(|c| c.is_done()).collect();
        assert_eq!(terminal, vec![&ColumnId::Done]);
    }

    #[test]
    fn test_column_ordinals_follow_display_order() {
        for (i, column) in ColumnId::ALL.iter().enumerate() {
            assert_eq!(column.ordinal(), i);
        }
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
        let err = Priority::from_str("urgent").unwrap_err();
        assert!(err.contains("urgent"));
    }

    #[test]
    fn test_progress_rounds_and_handles_empty() {
        assert_eq!(TaskStats::default().progress(), 0);
        assert_eq!(TaskStats { total: 3, completed: 1 }.progress(), 33);
        assert_eq!(TaskStats { total: 3, completed: 2 }.progress(), 67);
        assert_eq!(TaskStats { total: 4, completed: 4 }.progress(), 100);
        assert_eq!(TaskStats { total: 5, completed: 2 }.pending(), 3);
    }

    #[test]
    fn test_task_patch_distinguishes_null_from_absent() {
        let patch: TaskPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(patch.description, Some(None));

        let patch: TaskPatch = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(patch.description, None);

        let json = serde_json::to_value(TaskPatch {
            description: Some(None),
            column_id: Some(ColumnId::Review),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"description": null, "columnId": "review"}));
    }

    #[test]
    fn test_project_summary_serializes_stats_as_tasks() {
        let now = Utc::now();
        let summary = ProjectSummary {
            id: 7,
            name: "Website".into(),
            description: None,
            created_at: now,
            updated_at: now,
            version: 3,
            task_stats: TaskStats { total: 2, completed: 1 },
            progress: 50,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["tasks"]["total"], 2);
        assert_eq!(json["tasks"]["completed"], 1);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("taskStats").is_none());
    }
}
