use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::models::{
    ColumnId, ColumnView, DashboardStats, NewTask, Priority, ProjectBoard, ProjectId,
    ProjectSummary, Task, TaskId, TaskPatch, TaskStats,
};

/// Async-safe handle to the board database.
///
/// Constructed once at process start and shared through axum state. All
/// access runs on tokio's blocking pool via `spawn_blocking` so synchronous
/// SQLite I/O never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct BoardDb {
    conn: Connection,
}

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.version, p.created_at, p.updated_at,
     COUNT(t.id), COALESCE(SUM(t.completed), 0)";

const TASK_COLUMNS: &str =
    "id, project_id, title, description, priority, column_id, completed, created_at, updated_at";

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT,
                    version INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT,
                    priority TEXT NOT NULL DEFAULT 'medium',
                    column_id TEXT NOT NULL DEFAULT 'todo',
                    completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id, updated_at);
                CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, column_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Projects ──────────────────────────────────────────────────────

    pub fn create_project(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<ProjectSummary> {
        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO projects (user_id, name, description, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?4)",
                params![user_id, name, description, now],
            )
            .context("Failed to insert project")?;
        let id = self.conn.last_insert_rowid();
        self.get_project(user_id, id)?
            .context("Project not found after insert")
    }

    /// The caller's projects, most recently updated first.
    pub fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectSummary>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PROJECT_COLUMNS}
                 FROM projects p LEFT JOIN tasks t ON t.project_id = p.id
                 WHERE p.user_id = ?1
                 GROUP BY p.id
                 ORDER BY p.updated_at DESC, p.id DESC"
            ))
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map(params![user_id], ProjectRow::from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            let r = row.context("Failed to read project row")?;
            projects.push(r.into_summary());
        }
        Ok(projects)
    }

    /// A project owned by `user_id`. Absent and not-owned look the same.
    pub fn get_project(&self, user_id: &str, id: ProjectId) -> Result<Option<ProjectSummary>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROJECT_COLUMNS}
                     FROM projects p LEFT JOIN tasks t ON t.project_id = p.id
                     WHERE p.id = ?1 AND p.user_id = ?2
                     GROUP BY p.id"
                ),
                params![id, user_id],
                ProjectRow::from_row,
            )
            .optional()
            .context("Failed to query project")?;
        Ok(row.map(ProjectRow::into_summary))
    }

    /// Full board snapshot: the four columns in display order, tasks by creation.
    pub fn get_board(&self, user_id: &str, id: ProjectId) -> Result<Option<ProjectBoard>> {
        let Some(summary) = self.get_project(user_id, id)? else {
            return Ok(None);
        };
        let tasks = self.list_tasks(id)?;

        let columns = ColumnId::ALL
            .iter()
            .map(|column| ColumnView {
                id: *column,
                name: column.display_name().to_string(),
                tasks: tasks
                    .iter()
                    .filter(|t| t.column_id == *column)
                    .map(Task::card)
                    .collect(),
            })
            .collect();

        Ok(Some(ProjectBoard { summary, columns }))
    }

    /// Delete a project and, by cascade, its tasks. Returns false when nothing was deleted.
    pub fn delete_project(&self, user_id: &str, id: ProjectId) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "DELETE FROM projects WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .context("Failed to delete project")?;
        Ok(count > 0)
    }

    /// Bump the project's version and touch `updated_at`. Returns the new version.
    fn touch_project(conn: &Connection, id: ProjectId, now: DateTime<Utc>) -> Result<u64> {
        conn.execute(
            "UPDATE projects SET version = version + 1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )
        .context("Failed to bump project version")?;
        let version: i64 = conn
            .query_row(
                "SELECT version FROM projects WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .context("Failed to read project version")?;
        Ok(version.max(0) as u64)
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    pub fn list_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY id"
            ))
            .context("Failed to prepare list_tasks")?;
        let rows = stmt
            .query_map(params![project_id], TaskRow::from_row)
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            let r = row.context("Failed to read task row")?;
            tasks.push(r.into_task()?);
        }
        Ok(tasks)
    }

    pub fn get_task(&self, project_id: ProjectId, task_id: TaskId) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND project_id = ?2"),
                params![task_id, project_id],
                TaskRow::from_row,
            )
            .optional()
            .context("Failed to query task")?;
        row.map(TaskRow::into_task).transpose()
    }

    /// Insert a task; `completed` follows the target column. Returns the task
    /// and the project's new version.
    pub fn create_task(&self, project_id: ProjectId, task: &NewTask) -> Result<(Task, u64)> {
        let now = Utc::now();
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute(
            "INSERT INTO tasks (project_id, title, description, priority, column_id, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                project_id,
                task.title,
                task.description,
                task.priority.as_str(),
                task.column_id.as_str(),
                task.column_id.is_done(),
                now
            ],
        )
        .context("Failed to insert task")?;
        let id = tx.last_insert_rowid();
        let version = Self::touch_project(&tx, project_id, now)?;
        tx.commit().context("Failed to commit task insert")?;

        let task = self
            .get_task(project_id, id)?
            .context("Task not found after insert")?;
        Ok((task, version))
    }

    /// Apply a partial update. Returns `None` when the task does not exist in
    /// this project.
    pub fn update_task(
        &self,
        project_id: ProjectId,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Option<(Task, u64)>> {
        let Some(current) = self.get_task(project_id, task_id)? else {
            return Ok(None);
        };
        let column = resolve_target_column(current.column_id, patch.column_id, patch.completed);
        let title = patch.title.as_deref().unwrap_or(&current.title);
        let description = match &patch.description {
            Some(description) => description.as_deref(),
            None => current.description.as_deref(),
        };
        let priority = patch.priority.unwrap_or(current.priority);

        let now = Utc::now();
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, priority = ?3, column_id = ?4, completed = ?5, updated_at = ?6
             WHERE id = ?7 AND project_id = ?8",
            params![
                title,
                description,
                priority.as_str(),
                column.as_str(),
                column.is_done(),
                now,
                task_id,
                project_id
            ],
        )
        .context("Failed to update task")?;
        let version = Self::touch_project(&tx, project_id, now)?;
        tx.commit().context("Failed to commit task update")?;

        let task = self
            .get_task(project_id, task_id)?
            .context("Task not found after update")?;
        Ok(Some((task, version)))
    }

    /// Delete a task. Returns the project's new version, or `None` when the
    /// task does not exist in this project.
    pub fn delete_task(&self, project_id: ProjectId, task_id: TaskId) -> Result<Option<u64>> {
        let now = Utc::now();
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let count = tx
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND project_id = ?2",
                params![task_id, project_id],
            )
            .context("Failed to delete task")?;
        if count == 0 {
            return Ok(None);
        }
        let version = Self::touch_project(&tx, project_id, now)?;
        tx.commit().context("Failed to commit task delete")?;
        Ok(Some(version))
    }

    // ── Dashboard ─────────────────────────────────────────────────────

    pub fn dashboard_stats(&self, user_id: &str) -> Result<DashboardStats> {
        let total_projects: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM projects WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .context("Failed to count projects")?;
        let (total, completed): (i64, i64) = self
            .conn
            .query_row(
                "SELECT COUNT(t.id), COALESCE(SUM(t.completed), 0)
                 FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to count tasks")?;

        let stats = TaskStats {
            total: count(total),
            completed: count(completed),
        };
        Ok(DashboardStats {
            total_projects: count(total_projects),
            completed_tasks: stats.completed,
            pending_tasks: stats.pending(),
        })
    }
}

/// Where a patched task ends up. An explicit column wins; otherwise
/// `completed: true` sends it to done and `completed: false` reopens a done
/// task into todo while leaving open tasks where they are.
pub fn resolve_target_column(
    current: ColumnId,
    column: Option<ColumnId>,
    completed: Option<bool>,
) -> ColumnId {
    match (column, completed) {
        (Some(column), _) => column,
        (None, Some(true)) => ColumnId::Done,
        (None, Some(false)) if current.is_done() => ColumnId::Todo,
        _ => current,
    }
}

fn count(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

// ── Row types ─────────────────────────────────────────────────────────

struct ProjectRow {
    id: i64,
    name: String,
    description: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    total: i64,
    completed: i64,
}

impl ProjectRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            version: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            total: row.get(6)?,
            completed: row.get(7)?,
        })
    }

    fn into_summary(self) -> ProjectSummary {
        let task_stats = TaskStats {
            total: count(self.total),
            completed: count(self.completed),
        };
        ProjectSummary {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version.max(0) as u64,
            task_stats,
            progress: task_stats.progress(),
        }
    }
}

struct TaskRow {
    id: i64,
    project_id: i64,
    title: String,
    description: Option<String>,
    priority: String,
    column_id: String,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            priority: row.get(4)?,
            column_id: row.get(5)?,
            completed: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_task(self) -> Result<Task> {
        let column_id = ColumnId::from_str(&self.column_id)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse task column")?;
        let priority = Priority::from_str(&self.priority)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse task priority")?;

        Ok(Task {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            priority,
            column_id,
            completed: self.completed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "alice";
    const BOB: &str = "bob";

    fn new_task(title: &str, column: ColumnId) -> NewTask {
        NewTask::new(title, column)
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let table_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('projects', 'tasks')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(table_count, 2);

        // Re-running is harmless.
        db.run_migrations()?;
        Ok(())
    }

    #[test]
    fn test_open_creates_parent_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("board.db");
        BoardDb::new(&path)?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_create_and_get_project() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "Website", Some("Landing page"))?;
        assert!(project.id > 0);
        assert_eq!(project.version, 1);
        assert_eq!(project.task_stats, TaskStats::default());

        let fetched = db.get_project(ALICE, project.id)?.expect("project should exist");
        assert_eq!(fetched.name, "Website");
        assert_eq!(fetched.description.as_deref(), Some("Landing page"));
        Ok(())
    }

    #[test]
    fn test_projects_are_scoped_to_owner() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "Private", None)?;

        assert!(db.get_project(BOB, project.id)?.is_none());
        assert!(db.get_board(BOB, project.id)?.is_none());
        assert!(db.list_projects(BOB)?.is_empty());
        assert!(!db.delete_project(BOB, project.id)?);
        assert!(db.get_project(ALICE, project.id)?.is_some());
        Ok(())
    }

    #[test]
    fn test_list_projects_most_recently_updated_first() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let first = db.create_project(ALICE, "First", None)?;
        let second = db.create_project(ALICE, "Second", None)?;
        let ids: Vec<_> = db.list_projects(ALICE)?.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        db.create_task(first.id, &new_task("touch", ColumnId::Todo))?;
        let ids: Vec<_> = db.list_projects(ALICE)?.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        Ok(())
    }

    #[test]
    fn test_create_task_derives_completed_and_bumps_version() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "p", None)?;

        let (open, v1) = db.create_task(project.id, &new_task("open", ColumnId::Review))?;
        let (done, v2) = db.create_task(project.id, &new_task("done", ColumnId::Done))?;
        assert!(!open.completed);
        assert!(done.completed);
        assert_eq!(done.column_id, ColumnId::Done);
        assert!(v2 > v1 && v1 > project.version);

        let summary = db.get_project(ALICE, project.id)?.unwrap();
        assert_eq!(summary.task_stats, TaskStats { total: 2, completed: 1 });
        assert_eq!(summary.progress, 50);
        assert_eq!(summary.version, v2);
        Ok(())
    }

    #[test]
    fn test_board_has_four_columns_in_order() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "p", None)?;
        db.create_task(project.id, &new_task("a", ColumnId::InProgress))?;
        db.create_task(project.id, &new_task("b", ColumnId::Done))?;
        db.create_task(project.id, &new_task("c", ColumnId::InProgress))?;

        let board = db.get_board(ALICE, project.id)?.unwrap();
        let ids: Vec<_> = board.columns.iter().map(|c| c.id).collect();
        assert_eq!(ids, ColumnId::ALL.to_vec());
        assert_eq!(board.columns[0].name, "To Do");
        let titles: Vec<_> = board.columns[1].tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
        assert!(board.columns[3].tasks[0].completed);
        Ok(())
    }

    #[test]
    fn test_update_task_fields_and_column() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "p", None)?;
        let (task, _) = db.create_task(project.id, &new_task("old", ColumnId::Todo))?;

        let patch = TaskPatch {
            title: Some("new".into()),
            description: Some(Some("notes".into())),
            priority: Some(Priority::High),
            column_id: Some(ColumnId::Done),
            ..Default::default()
        };
        let (updated, version) = db.update_task(project.id, task.id, &patch)?.unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.description.as_deref(), Some("notes"));
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.column_id, ColumnId::Done);
        assert!(updated.completed);
        assert_eq!(db.get_project(ALICE, project.id)?.unwrap().version, version);

        let clear = TaskPatch {
            description: Some(None),
            ..Default::default()
        };
        let (cleared, _) = db.update_task(project.id, task.id, &clear)?.unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.title, "new");
        Ok(())
    }

    #[test]
    fn test_update_missing_task_returns_none() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "p", None)?;
        let other = db.create_project(ALICE, "q", None)?;
        let (task, _) = db.create_task(other.id, &new_task("elsewhere", ColumnId::Todo))?;

        assert!(db.update_task(project.id, 999, &TaskPatch::default())?.is_none());
        // A task id from another project is not found in this one.
        assert!(db.update_task(project.id, task.id, &TaskPatch::default())?.is_none());
        Ok(())
    }

    #[test]
    fn test_delete_task_returns_new_version() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "p", None)?;
        let (task, created) = db.create_task(project.id, &new_task("x", ColumnId::Done))?;

        let version = db.delete_task(project.id, task.id)?.unwrap();
        assert!(version > created);
        assert!(db.delete_task(project.id, task.id)?.is_none());

        let summary = db.get_project(ALICE, project.id)?.unwrap();
        assert_eq!(summary.task_stats, TaskStats::default());
        Ok(())
    }

    #[test]
    fn test_delete_project_cascades_to_tasks() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project(ALICE, "p", None)?;
        db.create_task(project.id, &new_task("x", ColumnId::Todo))?;

        assert!(db.delete_project(ALICE, project.id)?);
        let remaining: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        assert_eq!(remaining, 0);
        assert!(db.get_project(ALICE, project.id)?.is_none());
        Ok(())
    }

    #[test]
    fn test_dashboard_stats_aggregate_owned_projects() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let a = db.create_project(ALICE, "a", None)?;
        let b = db.create_project(ALICE, "b", None)?;
        let theirs = db.create_project(BOB, "c", None)?;
        db.create_task(a.id, &new_task("1", ColumnId::Done))?;
        db.create_task(a.id, &new_task("2", ColumnId::Todo))?;
        db.create_task(b.id, &new_task("3", ColumnId::Review))?;
        db.create_task(theirs.id, &new_task("4", ColumnId::Done))?;

        let stats = db.dashboard_stats(ALICE)?;
        assert_eq!(
            stats,
            DashboardStats {
                total_projects: 2,
                completed_tasks: 1,
                pending_tasks: 2,
            }
        );
        assert_eq!(db.dashboard_stats("nobody")?, DashboardStats::default());
        Ok(())
    }

    #[test]
    fn test_resolve_target_column() {
        use ColumnId::*;
        assert_eq!(resolve_target_column(Todo, Some(Review), Some(true)), Review);
        assert_eq!(resolve_target_column(Review, None, Some(true)), Done);
        assert_eq!(resolve_target_column(Done, None, Some(false)), Todo);
        assert_eq!(resolve_target_column(InProgress, None, Some(false)), InProgress);
        assert_eq!(resolve_target_column(Review, None, None), Review);
    }

    #[tokio::test]
    async fn test_handle_runs_on_blocking_pool() -> Result<()> {
        let handle = DbHandle::new(BoardDb::new_in_memory()?);
        let project = handle
            .call(|db| db.create_project(ALICE, "async", None))
            .await?;
        let fetched = handle
            .call(move |db| db.get_project(ALICE, project.id))
            .await?;
        assert_eq!(fetched.map(|p| p.name), Some("async".to_string()));
        Ok(())
    }
}
